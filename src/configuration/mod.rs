use serde::Deserialize;
use std::fs;
use std::path::Path;

mod error;

use crate::registry_client::RegistryConfig;
use crate::storage::StorageConfig;
pub use error::Error;

#[derive(Clone, Debug, Deserialize)]
pub struct Configuration {
    pub registry: RegistryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct CleanupConfig {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub repository: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub tracing: Option<TracingConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TracingConfig {
    pub endpoint: String,
    #[serde(default = "TracingConfig::default_sampling_rate")]
    pub sampling_rate: f64,
}

impl TracingConfig {
    fn default_sampling_rate() -> f64 {
        1.0
    }
}

impl Configuration {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let config_str = fs::read_to_string(path)?;
        Self::load_from_str(&config_str)
    }

    pub fn load_from_str(slice: &str) -> Result<Self, Error> {
        let config: Configuration = toml::from_str(slice)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        let url = &self.registry.url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::InvalidSetting(format!(
                "registry.url must be an http:// or https:// URL, got '{url}'"
            )));
        }

        if self.registry.username.is_some() != self.registry.password.is_some() {
            return Err(Error::InvalidSetting(
                "registry.username and registry.password must be set together".to_string(),
            ));
        }

        if self.registry.client_certificate.is_some()
            != self.registry.client_private_key.is_some()
        {
            return Err(Error::InvalidSetting(
                "registry.client_certificate and registry.client_private_key must be set together"
                    .to_string(),
            ));
        }

        if let StorageConfig::S3(s3) = &self.storage {
            if s3.bucket.is_empty() || s3.region.is_empty() {
                return Err(Error::InvalidSetting(
                    "storage.s3 requires bucket and region".to_string(),
                ));
            }
        }

        if let Some(ObservabilityConfig {
            tracing: Some(tracing),
        }) = &self.observability
        {
            if !(0.0..=1.0).contains(&tracing.sampling_rate) {
                return Err(Error::InvalidSetting(
                    "observability.tracing.sampling_rate must be between 0 and 1".to_string(),
                ));
            }
        }

        Ok(())
    }
}
