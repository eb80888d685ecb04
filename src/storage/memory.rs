use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use serde_json::json;
use std::collections::BTreeMap;

use crate::oci::Digest;
use crate::storage::path_builder;
use crate::storage::{Error, StorageBackend, StoredObject};

pub const IMAGE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const IMAGE_INDEX: &str = "application/vnd.oci.image.index.v1+json";

/// A registry storage held in memory, with helpers laying out the docker
/// distribution structure.
#[derive(Debug, Default)]
pub struct Backend {
    objects: BTreeMap<String, Vec<u8>>,
}

pub fn digest(seed: char) -> Digest {
    Digest::Sha256(seed.to_string().repeat(64))
}

impl Backend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, path: &str, content: &[u8]) {
        self.objects.insert(path.to_string(), content.to_vec());
    }

    pub fn put_blob(&mut self, digest: &Digest, content: &[u8]) {
        self.put(&path_builder::blob_path(digest), content);
    }

    pub fn put_revision(&mut self, namespace: &str, digest: &Digest) {
        self.put(
            &path_builder::manifest_revisions_link_path(namespace, digest),
            digest.to_string().as_bytes(),
        );
    }

    pub fn put_tag(&mut self, namespace: &str, tag: &str, digest: &Digest) {
        self.put(
            &path_builder::manifest_tag_link_path(namespace, tag),
            digest.to_string().as_bytes(),
        );
    }

    pub fn put_config(&mut self, digest: &Digest, created: &str, os: &str, architecture: &str) {
        let config = json!({
            "created": created,
            "os": os,
            "architecture": architecture,
        });
        self.put_blob(digest, config.to_string().as_bytes());
    }

    /// Stores an image manifest and its revision link.
    pub fn put_image(&mut self, namespace: &str, digest: &Digest, config: Option<&Digest>) {
        let mut manifest = json!({
            "schemaVersion": 2,
            "mediaType": IMAGE_MANIFEST,
            "layers": [],
        });
        if let Some(config) = config {
            manifest["config"] = json!({
                "mediaType": "application/vnd.oci.image.config.v1+json",
                "digest": config.to_string(),
                "size": 0,
            });
        }

        self.put_blob(digest, manifest.to_string().as_bytes());
        self.put_revision(namespace, digest);
    }

    /// Stores an image index and its revision link.
    pub fn put_index(&mut self, namespace: &str, digest: &Digest, children: &[(&Digest, &str, &str)]) {
        let manifests = children
            .iter()
            .map(|(child, os, architecture)| {
                json!({
                    "mediaType": IMAGE_MANIFEST,
                    "digest": child.to_string(),
                    "size": 0,
                    "platform": { "os": os, "architecture": architecture },
                })
            })
            .collect::<Vec<_>>();

        let index = json!({
            "schemaVersion": 2,
            "mediaType": IMAGE_INDEX,
            "manifests": manifests,
        });

        self.put_blob(digest, index.to_string().as_bytes());
        self.put_revision(namespace, digest);
    }
}

#[async_trait]
impl StorageBackend for Backend {
    fn list_paths(&self) -> BoxStream<'_, Result<StoredObject, Error>> {
        stream::iter(self.objects.iter().map(|(path, content)| {
            Ok(StoredObject {
                path: path.clone(),
                size: content.len() as u64,
            })
        }))
        .boxed()
    }

    async fn read_object(&self, path: &str) -> Result<Vec<u8>, Error> {
        self.objects
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }
}
