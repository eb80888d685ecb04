use serde::Deserialize;

use crate::oci::{lenient, Descriptor, Error};

pub const DOCKER_MANIFEST_LIST_V2: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";
pub const OCI_IMAGE_INDEX_V1: &str = "application/vnd.oci.image.index.v1+json";

/// The subset of an image manifest or image index needed to walk references.
/// Any JSON object parses; fields of the wrong shape read as absent.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, deserialize_with = "lenient::optional")]
    pub media_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub config: Option<Descriptor>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub manifests: Option<Vec<Descriptor>>,
}

impl Manifest {
    pub fn from_slice(s: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(s)?)
    }

    /// Manifest lists and image indexes, including untyped documents that carry
    /// a `manifests` field.
    pub fn is_index(&self) -> bool {
        match self.media_type.as_deref() {
            Some(DOCKER_MANIFEST_LIST_V2 | OCI_IMAGE_INDEX_V1) => true,
            None | Some("") => self.manifests.is_some(),
            Some(_) => false,
        }
    }
}

/// Image configuration blob, reduced to what is displayed.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct ImageConfig {
    #[serde(default, deserialize_with = "lenient::optional")]
    pub created: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub os: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub architecture: Option<String>,
}

impl ImageConfig {
    pub fn from_slice(s: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(s)?)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_docker_manifest_list_is_index() {
        let manifest = Manifest::from_slice(
            br#"{
                "schemaVersion": 2,
                "mediaType": "application/vnd.docker.distribution.manifest.list.v2+json",
                "manifests": []
            }"#,
        )
        .unwrap();
        assert!(manifest.is_index());
    }

    #[test]
    fn test_oci_index_is_index() {
        let manifest = Manifest::from_slice(
            br#"{"schemaVersion": 2, "mediaType": "application/vnd.oci.image.index.v1+json"}"#,
        )
        .unwrap();
        assert!(manifest.is_index());
    }

    #[test]
    fn test_untyped_with_manifests_is_index() {
        let manifest =
            Manifest::from_slice(br#"{"schemaVersion": 2, "manifests": []}"#).unwrap();
        assert!(manifest.is_index());

        let manifest =
            Manifest::from_slice(br#"{"mediaType": "", "manifests": []}"#).unwrap();
        assert!(manifest.is_index());
    }

    #[test]
    fn test_image_manifest_is_not_index() {
        let manifest = Manifest::from_slice(
            br#"{
                "schemaVersion": 2,
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "config": {
                    "mediaType": "application/vnd.oci.image.config.v1+json",
                    "digest": "sha256:99c9d5e2bdc7ef0223f56c845a695ea0f8f11f5b55ea6f74e1f7df0d4f90026c",
                    "size": 1234
                },
                "layers": []
            }"#,
        )
        .unwrap();
        assert!(!manifest.is_index());
        assert!(manifest.config.is_some());

        // a typed image manifest stays an image even with a stray `manifests` field
        let manifest = Manifest::from_slice(
            br#"{"mediaType": "application/vnd.docker.distribution.manifest.v2+json", "manifests": []}"#,
        )
        .unwrap();
        assert!(!manifest.is_index());
    }

    #[test]
    fn test_schema1_manifest() {
        let manifest =
            Manifest::from_slice(br#"{"schemaVersion": 1, "name": "app", "fsLayers": []}"#)
                .unwrap();
        assert!(!manifest.is_index());
        assert!(manifest.config.is_none());
    }

    #[test]
    fn test_index_with_malformed_fields() {
        let manifest = Manifest::from_slice(
            br#"{
                "schemaVersion": "2",
                "mediaType": "application/vnd.oci.image.index.v1+json",
                "manifests": [
                    {"mediaType": null, "digest": "sha256:aaaa", "size": null},
                    null,
                    {"digest": "sha256:bbbb", "platform": "linux"}
                ]
            }"#,
        )
        .unwrap();

        assert!(manifest.is_index());
        let digests = manifest
            .manifests
            .unwrap()
            .into_iter()
            .map(|descriptor| descriptor.digest)
            .collect::<Vec<_>>();
        assert_eq!(
            digests,
            vec![Some("sha256:aaaa".to_string()), Some("sha256:bbbb".to_string())]
        );
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Manifest::from_slice(b"not json"),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_image_config() {
        let config = ImageConfig::from_slice(
            br#"{"created": "2024-03-01T10:20:30.123456789Z", "os": "linux", "architecture": "amd64", "rootfs": {}}"#,
        )
        .unwrap();
        assert_eq!(config.os.as_deref(), Some("linux"));
        assert_eq!(config.architecture.as_deref(), Some("amd64"));
        assert_eq!(
            config.created.as_deref(),
            Some("2024-03-01T10:20:30.123456789Z")
        );
    }
}
