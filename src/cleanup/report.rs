use bytesize::ByteSize;
use std::fmt::Display;
use std::io::Write;
use tracing::warn;

use crate::cleanup::deletion::{DeletionOutcome, DeletionSummary};
use crate::cleanup::manifest_reader::ManifestDetail;
use crate::cleanup::reachability::Reachability;
use crate::oci::Digest;

/// Console output of a cleanup run, kept apart from the tracing diagnostics.
pub struct Reporter<W> {
    out: W,
}

/// Trailing detail of a deletion line.
pub fn describe(detail: Option<&ManifestDetail>) -> String {
    match detail {
        None => String::new(),
        Some(ManifestDetail::Image {
            created,
            os,
            architecture,
        }) => format!(
            "  created={:<19}  {}/{}",
            created.as_deref().unwrap_or("?"),
            os.as_deref().unwrap_or("?"),
            architecture.as_deref().unwrap_or("?")
        ),
        Some(ManifestDetail::Index { created, platforms }) => {
            let created = created
                .as_deref()
                .map(|created| format!("  created={created:<19}"))
                .unwrap_or_default();
            format!("{created}  index [{}]", platforms.join(", "))
        }
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, line: impl Display) {
        if let Err(err) = writeln!(self.out, "{line}") {
            warn!("Failed to write report line: {err}");
        }
    }

    pub fn dry_run_mode(&mut self) {
        self.line("Running in dry-run mode. No changes will be made.");
        self.line("");
    }

    pub fn storage_kind(&mut self, kind: &str) {
        self.line(format!("Running against {kind} storage"));
    }

    pub fn repository_filter(&mut self, repository: &str) {
        self.line(format!("Filtering to repository: {repository}"));
    }

    pub fn reachability(&mut self, reachability: &Reachability) {
        if reachability.unresolved > 0 {
            self.line(format!(
                "Kept {} tagged manifests that could not be read",
                reachability.unresolved
            ));
        }
        if reachability.broken_links > 0 {
            self.line(format!(
                "Ignored {} unreadable tag links",
                reachability.broken_links
            ));
        }
    }

    pub fn nothing_to_do(&mut self, stored_bytes: u64) {
        self.line("No manifests without tags found. Nothing to do.");
        self.line(format!(
            "For reference, the size of the storage is currently: {}",
            ByteSize::b(stored_bytes)
        ));
    }

    pub fn found(&mut self, count: usize) {
        self.line(format!("Found {count} manifests without tags. Deleting"));
    }

    pub fn progress(&mut self, current: usize, total: usize, dry_run: bool) {
        let suffix = if dry_run {
            " ..not really, due to dry-run mode"
        } else {
            ""
        };
        self.line(format!("Cleaning {current} of {total}{suffix}"));
    }

    pub fn deletion(
        &mut self,
        outcome: &DeletionOutcome,
        digest: &Digest,
        repository: &str,
        detail: Option<&ManifestDetail>,
    ) {
        let detail = describe(detail);
        let short_hash = digest.short_hash();

        match outcome {
            DeletionOutcome::Planned => self.line(format!(
                "  DRY_RUN: sha256:{short_hash}  repo={repository:<30}{detail}"
            )),
            DeletionOutcome::Deleted => self.line(format!(
                "  Deleted: sha256:{short_hash}  repo={repository:<30}{detail}"
            )),
            DeletionOutcome::Rejected(status) => self.line(format!(
                "Failed to clean manifest {digest} from repo {repository} with response code {}",
                status.as_u16()
            )),
            DeletionOutcome::Failed(cause) => self.line(format!(
                "Failed to clean manifest {digest} from repo {repository}: {cause}"
            )),
        }
    }

    pub fn summary(&mut self, summary: &DeletionSummary, stored_bytes: u64) {
        self.line(format!(
            "Job done, Cleaned {} of {} manifests.",
            summary.cleaned, summary.total
        ));
        if summary.failed > 0 {
            self.line(format!("{} deletions failed.", summary.failed));
        }
        self.line("");
        self.line(format!(
            "For reference, the size of the storage before this run was: {}",
            ByteSize::b(stored_bytes)
        ));
        self.line("");
        self.line("Please run a garbage-collect on the registry now to free up disk space.");
    }
}
