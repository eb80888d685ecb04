use hyper::StatusCode;
use std::io::Write;
use tracing::{info, instrument, warn};

use crate::cleanup::garbage::GarbageSet;
use crate::cleanup::manifest_reader::ManifestReader;
use crate::cleanup::report::Reporter;
use crate::cleanup::Error;
use crate::oci::Digest;
use crate::registry_client::ManifestRegistry;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// Dry-run, nothing was sent.
    Planned,
    Deleted,
    /// The registry answered with a status other than 202.
    Rejected(StatusCode),
    Failed(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeletionSummary {
    pub cleaned: usize,
    pub failed: usize,
    pub total: usize,
}

pub struct DeletionExecutor<'a> {
    registry: &'a dyn ManifestRegistry,
    dry_run: bool,
}

impl<'a> DeletionExecutor<'a> {
    pub fn new(registry: &'a dyn ManifestRegistry, dry_run: bool) -> Self {
        Self { registry, dry_run }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, namespace: &str, digest: &Digest) -> Result<DeletionOutcome, Error> {
        if self.dry_run {
            return Ok(DeletionOutcome::Planned);
        }

        match self.registry.delete_manifest(namespace, digest).await {
            Ok(StatusCode::ACCEPTED) => {
                info!("Deleted manifest {digest} from {namespace}");
                Ok(DeletionOutcome::Deleted)
            }
            Ok(status) => {
                warn!("Registry answered {status} deleting {digest} from {namespace}");
                Ok(DeletionOutcome::Rejected(status))
            }
            Err(err) if err.is_fatal() => Err(err.into()),
            Err(err) => {
                warn!("Failed to delete {digest} from {namespace}: {err}");
                Ok(DeletionOutcome::Failed(err.to_string()))
            }
        }
    }

    pub async fn execute<W: Write>(
        &self,
        garbage: &GarbageSet,
        reader: &ManifestReader<'_>,
        reporter: &mut Reporter<W>,
    ) -> Result<DeletionSummary, Error> {
        let mut summary = DeletionSummary {
            total: garbage.deletion_count(),
            ..DeletionSummary::default()
        };

        for (position, (digest, repositories)) in garbage.iter().enumerate() {
            let detail = reader.detail(digest).await;
            reporter.progress(position + 1, garbage.len(), self.dry_run);

            for repository in repositories {
                let outcome = self.delete(repository, digest).await?;
                match outcome {
                    DeletionOutcome::Deleted => summary.cleaned += 1,
                    DeletionOutcome::Rejected(_) | DeletionOutcome::Failed(_) => {
                        summary.failed += 1;
                    }
                    DeletionOutcome::Planned => {}
                }
                reporter.deletion(&outcome, digest, repository, detail.as_ref());
            }
        }

        Ok(summary)
    }
}
