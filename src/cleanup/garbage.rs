use std::collections::{BTreeMap, BTreeSet};

use crate::cleanup::link_index::{LinkIndex, RepositoryFilter};
use crate::oci::Digest;

/// Unreachable digests with the repositories they must be deleted from.
#[derive(Debug, Default, PartialEq)]
pub struct GarbageSet {
    owners: BTreeMap<Digest, BTreeSet<String>>,
}

impl GarbageSet {
    pub fn compute(
        index: &LinkIndex,
        reachable: &BTreeSet<Digest>,
        filter: &RepositoryFilter,
    ) -> Self {
        let mut owners = index
            .all_digests()
            .into_iter()
            .filter(|digest| !reachable.contains(digest))
            .map(|digest| (digest, BTreeSet::new()))
            .collect::<BTreeMap<_, _>>();

        for revision in &index.revisions {
            if !filter.matches(&revision.repository) {
                continue;
            }

            if let Some(repositories) = owners.get_mut(&revision.digest) {
                repositories.insert(revision.repository.clone());
            }
        }

        Self { owners }
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Number of unreachable digests.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Number of (digest, repository) pairs to delete.
    pub fn deletion_count(&self) -> usize {
        self.owners.values().map(BTreeSet::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Digest, &BTreeSet<String>)> {
        self.owners.iter()
    }
}
