use chrono::DateTime;
use futures_util::future::BoxFuture;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::cleanup::Error;
use crate::oci::{platform_label, Digest, ImageConfig, Manifest, Platform};
use crate::storage::{path_builder, StorageBackend};

/// Nested indexes deeper than this are not explored for detail.
pub const MAX_DETAIL_DEPTH: usize = 8;

#[derive(Clone, Debug, PartialEq)]
pub struct ChildManifest {
    pub digest: Digest,
    pub platform: Option<Platform>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ManifestRecord {
    Image { config: Option<Digest> },
    Index { children: Vec<ChildManifest> },
}

impl From<Manifest> for ManifestRecord {
    fn from(manifest: Manifest) -> Self {
        if manifest.is_index() {
            let children = manifest
                .manifests
                .unwrap_or_default()
                .into_iter()
                .filter_map(|descriptor| {
                    let raw = descriptor.digest.unwrap_or_default();
                    match Digest::try_from(raw.as_str()) {
                        Ok(digest) => Some(ChildManifest {
                            digest,
                            platform: descriptor.platform,
                        }),
                        Err(err) => {
                            warn!("Skipping index child with invalid digest '{raw}': {err}");
                            None
                        }
                    }
                })
                .collect();

            return ManifestRecord::Index { children };
        }

        let config = manifest
            .config
            .and_then(|config| config.digest)
            .and_then(|digest| Digest::try_from(digest.as_str()).ok());
        ManifestRecord::Image { config }
    }
}

/// Display-only summary of a manifest.
#[derive(Clone, Debug, PartialEq)]
pub enum ManifestDetail {
    Image {
        created: Option<String>,
        os: Option<String>,
        architecture: Option<String>,
    },
    Index {
        created: Option<String>,
        platforms: Vec<String>,
    },
}

impl ManifestDetail {
    pub fn created(&self) -> Option<&str> {
        match self {
            ManifestDetail::Image { created, .. } | ManifestDetail::Index { created, .. } => {
                created.as_deref()
            }
        }
    }
}

/// Renders a config `created` timestamp as `YYYY-MM-DD HH:MM:SS`, keeping the
/// wall-clock time as written.
pub fn format_created(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match DateTime::parse_from_rfc3339(raw) {
        Ok(created) => Some(created.naive_local().format("%Y-%m-%d %H:%M:%S").to_string()),
        Err(_) => Some(raw.chars().take(19).collect::<String>().replace('T', " ")),
    }
}

/// Children ordered linux/amd64 first, then other linux, then the rest.
fn by_platform_priority(children: &[ChildManifest]) -> Vec<&ChildManifest> {
    let mut ordered = children.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|child| match &child.platform {
        Some(platform) if platform.is_linux_amd64() => 0,
        Some(platform) if platform.is_linux() => 1,
        _ => 2,
    });
    ordered
}

pub struct ManifestReader<'a> {
    storage: &'a dyn StorageBackend,
}

impl<'a> ManifestReader<'a> {
    pub fn new(storage: &'a dyn StorageBackend) -> Self {
        Self { storage }
    }

    pub async fn read_link(&self, path: &str) -> Result<Digest, Error> {
        let content = self.storage.read_object(path).await?;
        let content = String::from_utf8_lossy(&content);
        Ok(Digest::try_from(content.as_ref())?)
    }

    pub async fn resolve(&self, digest: &Digest) -> Result<ManifestRecord, Error> {
        let content = self
            .storage
            .read_object(&path_builder::blob_path(digest))
            .await?;
        let manifest = Manifest::from_slice(&content)?;
        Ok(manifest.into())
    }

    pub async fn detail(&self, digest: &Digest) -> Option<ManifestDetail> {
        let mut visited = HashSet::new();
        self.walk_detail(digest, &mut visited, 0).await
    }

    fn walk_detail<'b>(
        &'b self,
        digest: &'b Digest,
        visited: &'b mut HashSet<Digest>,
        depth: usize,
    ) -> BoxFuture<'b, Option<ManifestDetail>> {
        Box::pin(async move {
            if depth > MAX_DETAIL_DEPTH || !visited.insert(digest.clone()) {
                debug!("Stopping detail walk at {digest} (depth {depth})");
                return None;
            }

            match self.resolve(digest).await.ok()? {
                ManifestRecord::Image { config } => self.image_detail(&config?).await,
                ManifestRecord::Index { children } => {
                    let platforms = children
                        .iter()
                        .map(|child| platform_label(child.platform.as_ref()))
                        .collect();

                    let mut created = None;
                    for child in by_platform_priority(&children) {
                        let child_created = self
                            .walk_detail(&child.digest, visited, depth + 1)
                            .await
                            .and_then(|detail| detail.created().map(ToString::to_string));

                        if child_created.is_some() {
                            created = child_created;
                            break;
                        }
                    }

                    Some(ManifestDetail::Index { created, platforms })
                }
            }
        })
    }

    async fn image_detail(&self, config: &Digest) -> Option<ManifestDetail> {
        let content = self
            .storage
            .read_object(&path_builder::blob_path(config))
            .await
            .ok()?;
        let config = ImageConfig::from_slice(&content).ok()?;

        Some(ManifestDetail::Image {
            created: config.created.as_deref().and_then(format_created),
            os: config.os,
            architecture: config.architecture,
        })
    }
}
