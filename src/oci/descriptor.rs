use serde::Deserialize;

use crate::oci::lenient;

/// A reference to another manifest or blob. Only the fields the walk needs are
/// kept; malformed values read as absent.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Descriptor {
    #[serde(default, deserialize_with = "lenient::optional")]
    pub digest: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub platform: Option<Platform>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Platform {
    #[serde(default, deserialize_with = "lenient::optional")]
    pub os: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub architecture: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub variant: Option<String>,
}

impl Platform {
    pub fn is_linux(&self) -> bool {
        self.os.as_deref() == Some("linux")
    }

    pub fn is_linux_amd64(&self) -> bool {
        self.is_linux() && self.architecture.as_deref() == Some("amd64")
    }
}

/// `os/architecture`, with `?` standing in for unknown parts.
pub fn platform_label(platform: Option<&Platform>) -> String {
    let os = platform.and_then(|p| p.os.as_deref()).unwrap_or("?");
    let architecture = platform
        .and_then(|p| p.architecture.as_deref())
        .unwrap_or("?");
    format!("{os}/{architecture}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_label() {
        let platform = Platform {
            os: Some("linux".to_string()),
            architecture: Some("arm64".to_string()),
            variant: Some("v8".to_string()),
        };
        assert_eq!(platform_label(Some(&platform)), "linux/arm64");

        let partial = Platform {
            os: Some("windows".to_string()),
            ..Platform::default()
        };
        assert_eq!(platform_label(Some(&partial)), "windows/?");
        assert_eq!(platform_label(None), "?/?");
    }

    #[test]
    fn test_platform_classes() {
        let amd64: Platform =
            serde_json::from_str(r#"{"os":"linux","architecture":"amd64"}"#).unwrap();
        let arm64: Platform =
            serde_json::from_str(r#"{"os":"linux","architecture":"arm64"}"#).unwrap();
        let windows: Platform =
            serde_json::from_str(r#"{"os":"windows","architecture":"amd64"}"#).unwrap();

        assert!(amd64.is_linux_amd64());
        assert!(arm64.is_linux() && !arm64.is_linux_amd64());
        assert!(!windows.is_linux());
    }

    #[test]
    fn test_descriptor_with_malformed_fields() {
        let descriptor: Descriptor = serde_json::from_str(
            r#"{
                "mediaType": null,
                "digest": "sha256:abc",
                "size": "12",
                "platform": {"os": "linux", "architecture": 64}
            }"#,
        )
        .unwrap();

        assert_eq!(descriptor.digest.as_deref(), Some("sha256:abc"));
        assert_eq!(
            descriptor.platform,
            Some(Platform {
                os: Some("linux".to_string()),
                ..Platform::default()
            })
        );

        let descriptor: Descriptor = serde_json::from_str(r#"{"digest": null}"#).unwrap();
        assert_eq!(descriptor, Descriptor::default());
    }
}
