use futures_util::TryStreamExt;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::{debug, info, instrument};

use crate::oci::Digest;
use crate::storage::path_builder::REGISTRY_ROOT;
use crate::storage::{self, StorageBackend, StoredObject};

static REVISION_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^{REGISTRY_ROOT}/repositories/(?P<repository>.+?)/_manifests/revisions/sha256/(?P<hash>[a-f0-9]{{64}})/link$"
    ))
    .unwrap()
});

static TAG_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^{REGISTRY_ROOT}/repositories/(?P<repository>.+?)/_manifests/tags/(?P<tag>[^/]+)/current/link$"
    ))
    .unwrap()
});

/// Restricts revision links, and therefore deletions, to a single repository.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepositoryFilter(Option<String>);

impl RepositoryFilter {
    pub fn new(repository: Option<String>) -> Self {
        Self(repository.filter(|repository| !repository.is_empty()))
    }

    pub fn repository(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn matches(&self, repository: &str) -> bool {
        self.0.as_deref().is_none_or(|filter| filter == repository)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RevisionLink {
    pub repository: String,
    pub digest: Digest,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TagLink {
    pub repository: String,
    pub tag: String,
    pub path: String,
}

#[derive(Debug, PartialEq)]
pub enum LinkPath {
    Revision(RevisionLink),
    Tag(TagLink),
}

impl LinkPath {
    pub fn classify(path: &str) -> Option<Self> {
        if !path.ends_with("/link") {
            return None;
        }

        if let Some(captures) = REVISION_LINK_RE.captures(path) {
            let digest = Digest::from_sha256_hash(&captures["hash"]).ok()?;
            return Some(LinkPath::Revision(RevisionLink {
                repository: captures["repository"].to_string(),
                digest,
            }));
        }

        TAG_LINK_RE.captures(path).map(|captures| {
            LinkPath::Tag(TagLink {
                repository: captures["repository"].to_string(),
                tag: captures["tag"].to_string(),
                path: path.to_string(),
            })
        })
    }
}

/// Revision and tag links found in the storage.
///
/// Revision links are filtered by repository; tag links never are, so that a
/// digest shared with a repository outside the filter stays protected by that
/// repository's tags.
#[derive(Debug, Default)]
pub struct LinkIndex {
    pub revisions: Vec<RevisionLink>,
    pub tags: Vec<TagLink>,
    pub object_count: u64,
    pub stored_bytes: u64,
}

impl LinkIndex {
    #[instrument(skip(storage))]
    pub async fn build(
        storage: &dyn StorageBackend,
        filter: &RepositoryFilter,
    ) -> Result<Self, storage::Error> {
        let mut index = Self::default();

        let mut objects = storage.list_paths();
        while let Some(object) = objects.try_next().await? {
            index.insert(&object, filter);
        }

        info!(
            "Indexed {} objects: {} revision links, {} tag links",
            index.object_count,
            index.revisions.len(),
            index.tags.len()
        );
        Ok(index)
    }

    pub fn insert(&mut self, object: &StoredObject, filter: &RepositoryFilter) {
        self.object_count += 1;
        self.stored_bytes += object.size;

        match LinkPath::classify(&object.path) {
            Some(LinkPath::Revision(revision)) => {
                if filter.matches(&revision.repository) {
                    self.revisions.push(revision);
                } else {
                    debug!("Skipping revision outside filter: {}", object.path);
                }
            }
            Some(LinkPath::Tag(tag)) => self.tags.push(tag),
            None => {}
        }
    }

    pub fn all_digests(&self) -> BTreeSet<Digest> {
        self.revisions
            .iter()
            .map(|revision| revision.digest.clone())
            .collect()
    }
}
