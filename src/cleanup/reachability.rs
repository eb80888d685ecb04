use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

use crate::cleanup::link_index::TagLink;
use crate::cleanup::manifest_reader::{ManifestReader, ManifestRecord};
use crate::oci::Digest;

/// What a single tag link contributed to the reachable set.
#[derive(Clone, Debug, PartialEq)]
pub enum TagResolution {
    Image(Digest),
    Index { digest: Digest, children: Vec<Digest> },
    /// The manifest could not be read or parsed; the digest is kept anyway.
    Unresolved(Digest),
    /// The link itself is unreadable, nothing can be marked.
    BrokenLink,
}

impl TagResolution {
    fn mark(self, reachable: &mut BTreeSet<Digest>) {
        match self {
            TagResolution::Image(digest) | TagResolution::Unresolved(digest) => {
                reachable.insert(digest);
            }
            TagResolution::Index { digest, children } => {
                reachable.insert(digest);
                reachable.extend(children);
            }
            TagResolution::BrokenLink => {}
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Reachability {
    pub reachable: BTreeSet<Digest>,
    pub unresolved: usize,
    pub broken_links: usize,
}

pub struct ReachabilityResolver<'a> {
    reader: &'a ManifestReader<'a>,
}

impl<'a> ReachabilityResolver<'a> {
    pub fn new(reader: &'a ManifestReader<'a>) -> Self {
        Self { reader }
    }

    pub async fn resolve_tag(&self, tag: &TagLink) -> TagResolution {
        let digest = match self.reader.read_link(&tag.path).await {
            Ok(digest) => digest,
            Err(err) => {
                warn!("Failed to read tag link {}:{}: {err}", tag.repository, tag.tag);
                return TagResolution::BrokenLink;
            }
        };

        match self.reader.resolve(&digest).await {
            Ok(ManifestRecord::Image { .. }) => TagResolution::Image(digest),
            // Only direct children are marked, nested indexes are not expanded.
            Ok(ManifestRecord::Index { children }) => TagResolution::Index {
                digest,
                children: children.into_iter().map(|child| child.digest).collect(),
            },
            Err(err) => {
                warn!(
                    "Failed to read manifest {digest} of {}:{}, keeping it: {err}",
                    tag.repository, tag.tag
                );
                TagResolution::Unresolved(digest)
            }
        }
    }

    #[instrument(skip(self, tags), fields(tags = tags.len()))]
    pub async fn resolve(&self, tags: &[TagLink]) -> Reachability {
        let mut reachability = Reachability::default();

        for tag in tags {
            let resolution = self.resolve_tag(tag).await;
            debug!("{}:{} -> {resolution:?}", tag.repository, tag.tag);

            match resolution {
                TagResolution::Unresolved(_) => reachability.unresolved += 1,
                TagResolution::BrokenLink => reachability.broken_links += 1,
                _ => {}
            }
            resolution.mark(&mut reachability.reachable);
        }

        info!("{} reachable manifests", reachability.reachable.len());
        reachability
    }
}
