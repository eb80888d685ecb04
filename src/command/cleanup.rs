use std::io;
use tracing::{debug, info};

use crate::cleanup::{self, CleanupOptions, RepositoryFilter, Reporter};
use crate::command;
use crate::configuration::Configuration;
use crate::registry_client::RegistryClient;
use crate::storage::build_storage_backend;

/// Command line overrides of the `[cleanup]` section.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Options {
    pub dry_run: bool,
    pub repository: Option<String>,
}

pub struct Command<'a> {
    config: &'a Configuration,
    options: CleanupOptions,
}

impl<'a> Command<'a> {
    pub fn new(config: &'a Configuration, options: &Options) -> Self {
        let repository = options
            .repository
            .clone()
            .or_else(|| config.cleanup.repository.clone());

        Self {
            config,
            options: CleanupOptions {
                dry_run: options.dry_run || config.cleanup.dry_run,
                filter: RepositoryFilter::new(repository),
            },
        }
    }

    pub async fn run(&self) -> Result<(), command::Error> {
        let mut reporter = Reporter::new(io::stdout());

        if self.options.dry_run {
            reporter.dry_run_mode();
        }
        reporter.storage_kind(self.config.storage.kind());
        if let Some(repository) = self.options.filter.repository() {
            reporter.repository_filter(repository);
        }

        let storage = build_storage_backend(&self.config.storage)?;
        let registry = RegistryClient::connect(&self.config.registry).await?;
        debug!("Registry authentication: {:?}", registry.auth_context());

        let summary = cleanup::run(storage.as_ref(), &registry, &self.options, &mut reporter).await?;
        info!(
            "Cleanup finished: {} cleaned, {} failed, {} total",
            summary.cleaned, summary.failed, summary.total
        );

        Ok(())
    }
}
