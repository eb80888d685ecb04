//! Mark-and-sweep over the manifest graph of a registry storage.
//!
//! Every digest with a revision link is a candidate. Tag links mark their
//! manifest reachable, and image indexes also mark their direct children.
//! Candidates left unmarked are deleted through the registry API from each
//! repository that references them.

use std::io::Write;
use tracing::{info, instrument};

mod deletion;
mod error;
mod garbage;
mod link_index;
mod manifest_reader;
mod reachability;
mod report;

pub use deletion::DeletionSummary;
pub use error::Error;
pub use link_index::RepositoryFilter;
pub use report::Reporter;

use crate::registry_client::ManifestRegistry;
use crate::storage::StorageBackend;
use deletion::DeletionExecutor;
use garbage::GarbageSet;
use link_index::LinkIndex;
use manifest_reader::ManifestReader;
use reachability::ReachabilityResolver;

#[derive(Clone, Debug, Default)]
pub struct CleanupOptions {
    pub dry_run: bool,
    pub filter: RepositoryFilter,
}

#[instrument(skip_all, fields(dry_run = options.dry_run, repository = options.filter.repository()))]
pub async fn run<W: Write>(
    storage: &dyn StorageBackend,
    registry: &dyn ManifestRegistry,
    options: &CleanupOptions,
    reporter: &mut Reporter<W>,
) -> Result<DeletionSummary, Error> {
    let index = LinkIndex::build(storage, &options.filter).await?;

    let reader = ManifestReader::new(storage);
    let reachability = ReachabilityResolver::new(&reader)
        .resolve(&index.tags)
        .await;
    reporter.reachability(&reachability);

    let garbage = GarbageSet::compute(&index, &reachability.reachable, &options.filter);
    if garbage.is_empty() {
        reporter.nothing_to_do(index.stored_bytes);
        return Ok(DeletionSummary::default());
    }

    info!(
        "{} unreachable manifests, {} deletions",
        garbage.len(),
        garbage.deletion_count()
    );
    reporter.found(garbage.len());

    let summary = DeletionExecutor::new(registry, options.dry_run)
        .execute(&garbage, &reader, reporter)
        .await?;
    reporter.summary(&summary, index.stored_bytes);

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oci::Digest;
    use crate::registry_client::{self, MockManifestRegistry};
    use crate::storage::memory::{self, digest};
    use hyper::StatusCode;
    use std::sync::{Arc, Mutex};

    fn options(dry_run: bool, repository: Option<&str>) -> CleanupOptions {
        CleanupOptions {
            dry_run,
            filter: RepositoryFilter::new(repository.map(ToString::to_string)),
        }
    }

    fn recording_registry(status: StatusCode) -> (MockManifestRegistry, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();

        let mut registry = MockManifestRegistry::new();
        registry
            .expect_delete_manifest()
            .returning(move |namespace: &str, digest: &Digest| {
                recorded
                    .lock()
                    .unwrap()
                    .push(format!("{namespace}@{digest}"));
                Ok(status)
            });

        (registry, calls)
    }

    async fn run_with(
        storage: &memory::Backend,
        registry: &MockManifestRegistry,
        options: &CleanupOptions,
    ) -> (Result<DeletionSummary, Error>, String) {
        let mut reporter = Reporter::new(Vec::new());
        let result = run(storage, registry, options, &mut reporter).await;
        let output = String::from_utf8(reporter.into_inner()).unwrap();
        (result, output)
    }

    #[tokio::test]
    async fn test_dry_run_lists_orphans_without_deleting() {
        let mut storage = memory::Backend::new();
        storage.put_image("app", &digest('a'), None);
        storage.put_image("app", &digest('b'), None);
        storage.put_image("app", &digest('c'), None);
        storage.put_tag("app", "latest", &digest('a'));

        let mut registry = MockManifestRegistry::new();
        registry.expect_delete_manifest().never();

        let (result, output) = run_with(&storage, &registry, &options(true, None)).await;

        assert_eq!(
            result.unwrap(),
            DeletionSummary {
                cleaned: 0,
                failed: 0,
                total: 2
            }
        );
        assert!(output.contains("Found 2 manifests without tags. Deleting"));
        let dry_run_lines = output
            .lines()
            .filter(|line| line.starts_with("  DRY_RUN:"))
            .collect::<Vec<_>>();
        assert_eq!(dry_run_lines.len(), 2);
        assert!(dry_run_lines[0].contains("sha256:bbbbbbbbbbbb"));
        assert!(dry_run_lines[1].contains("sha256:cccccccccccc"));
    }

    #[tokio::test]
    async fn test_index_children_are_protected() {
        let mut storage = memory::Backend::new();
        storage.put_image("app", &digest('1'), None);
        storage.put_image("app", &digest('2'), None);
        storage.put_index(
            "app",
            &digest('e'),
            &[
                (&digest('1'), "linux", "amd64"),
                (&digest('2'), "linux", "arm64"),
            ],
        );
        storage.put_image("app", &digest('f'), None);
        storage.put_tag("app", "v1", &digest('e'));

        let (registry, calls) = recording_registry(StatusCode::ACCEPTED);
        let (result, output) = run_with(&storage, &registry, &options(false, None)).await;

        assert_eq!(
            result.unwrap(),
            DeletionSummary {
                cleaned: 1,
                failed: 0,
                total: 1
            }
        );
        assert_eq!(*calls.lock().unwrap(), vec![format!("app@{}", digest('f'))]);
        assert!(output.contains("Job done, Cleaned 1 of 1 manifests."));
        assert!(output.contains("Please run a garbage-collect"));
    }

    #[tokio::test]
    async fn test_shared_digest_deleted_from_every_owner() {
        let mut storage = memory::Backend::new();
        storage.put_image("app", &digest('b'), None);
        storage.put_revision("team/app", &digest('b'));

        let (registry, calls) = recording_registry(StatusCode::ACCEPTED);
        let (result, _) = run_with(&storage, &registry, &options(false, None)).await;

        assert_eq!(result.unwrap().cleaned, 2);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                format!("app@{}", digest('b')),
                format!("team/app@{}", digest('b')),
            ]
        );
    }

    #[tokio::test]
    async fn test_filter_outside_repositories_is_nothing_to_do() {
        let mut storage = memory::Backend::new();
        storage.put_image("app", &digest('a'), None);
        storage.put_image("app", &digest('b'), None);

        let mut registry = MockManifestRegistry::new();
        registry.expect_delete_manifest().never();

        let (result, output) = run_with(&storage, &registry, &options(false, Some("app2"))).await;

        assert_eq!(result.unwrap(), DeletionSummary::default());
        assert!(output.contains("No manifests without tags found. Nothing to do."));
    }

    #[tokio::test]
    async fn test_filter_keeps_digest_tagged_elsewhere() {
        let mut storage = memory::Backend::new();
        storage.put_image("app", &digest('a'), None);
        storage.put_image("app", &digest('b'), None);
        storage.put_revision("other", &digest('a'));
        storage.put_tag("other", "latest", &digest('a'));

        let (registry, calls) = recording_registry(StatusCode::ACCEPTED);
        let (result, _) = run_with(&storage, &registry, &options(false, Some("app"))).await;

        assert_eq!(result.unwrap().total, 1);
        assert_eq!(*calls.lock().unwrap(), vec![format!("app@{}", digest('b'))]);
    }

    #[tokio::test]
    async fn test_failed_deletions_are_counted() {
        let mut storage = memory::Backend::new();
        storage.put_image("app", &digest('a'), None);
        storage.put_image("app", &digest('b'), None);

        let (registry, _) = recording_registry(StatusCode::NOT_FOUND);
        let (result, output) = run_with(&storage, &registry, &options(false, None)).await;

        let summary = result.unwrap();
        assert_eq!(summary.cleaned + summary.failed, summary.total);
        assert_eq!(summary.failed, 2);
        assert!(output.contains("from repo app with response code 404"));
    }

    #[tokio::test]
    async fn test_fatal_registry_error_aborts() {
        let mut storage = memory::Backend::new();
        storage.put_image("app", &digest('a'), None);
        storage.put_image("app", &digest('b'), None);

        let mut registry = MockManifestRegistry::new();
        registry.expect_delete_manifest().times(1).returning(|_, _| {
            Err(registry_client::Error::Unauthorized(
                "scoped token rejected".to_string(),
            ))
        });

        let (result, output) = run_with(&storage, &registry, &options(false, None)).await;

        assert!(matches!(result, Err(Error::Registry(_))));
        assert!(!output.contains("Job done"));
    }
}
