use crate::oci::Digest;

/// Root of the docker distribution layout, relative to the storage root.
pub const REGISTRY_ROOT: &str = "docker/registry/v2";

pub fn blobs_root_dir() -> String {
    format!("{REGISTRY_ROOT}/blobs")
}

pub fn blob_container_dir(digest: &Digest) -> String {
    format!(
        "{}/{}/{}/{}",
        blobs_root_dir(),
        digest.algorithm(),
        digest.hash_prefix(),
        digest.hash()
    )
}

pub fn blob_path(digest: &Digest) -> String {
    format!("{}/data", blob_container_dir(digest))
}

pub fn repository_dir() -> String {
    format!("{REGISTRY_ROOT}/repositories")
}

pub fn manifests_root_dir(namespace: &str) -> String {
    format!("{}/{namespace}/_manifests", repository_dir())
}

pub fn manifest_revisions_link_path(namespace: &str, digest: &Digest) -> String {
    format!(
        "{}/revisions/{}/{}/link",
        manifests_root_dir(namespace),
        digest.algorithm(),
        digest.hash()
    )
}

pub fn manifest_tag_link_path(namespace: &str, tag: &str) -> String {
    format!("{}/tags/{tag}/current/link", manifests_root_dir(namespace))
}
