use async_trait::async_trait;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{timeout::TimeoutConfig, BehaviorVersion, Credentials, Region};
use aws_sdk_s3::{Client as S3Client, Config as S3Config};
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

use crate::storage::{Error, StorageBackend, StoredObject};

const LIST_PAGE_SIZE: i32 = 1000;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub access_key_id: String,
    pub secret_key: String,
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub key_prefix: String,
    pub operation_timeout_secs: u64,
    pub operation_attempt_timeout_secs: u64,
    pub max_attempts: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            secret_key: String::new(),
            endpoint: String::new(),
            bucket: String::new(),
            region: String::new(),
            key_prefix: String::new(),
            operation_timeout_secs: 900,
            operation_attempt_timeout_secs: 300,
            max_attempts: 3,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Backend {
    s3_client: S3Client,
    bucket: String,
    key_prefix: String,
}

impl Backend {
    pub fn new(config: &BackendConfig) -> Result<Self, Error> {
        if config.bucket.is_empty() {
            return Err(Error::Configuration("S3 bucket must be set".to_string()));
        }

        if config.region.is_empty() {
            return Err(Error::Configuration("S3 region must be set".to_string()));
        }

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_key,
            None,
            None,
            "custom",
        );

        let timeout = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(config.operation_timeout_secs))
            .operation_attempt_timeout(Duration::from_secs(config.operation_attempt_timeout_secs))
            .build();

        let retry = RetryConfig::standard().with_max_attempts(config.max_attempts);

        let mut client_config = S3Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .timeout_config(timeout)
            .retry_config(retry)
            .force_path_style(true);

        if !config.endpoint.is_empty() {
            client_config = client_config.endpoint_url(&config.endpoint);
        }

        let s3_client = S3Client::from_conf(client_config.build());

        Ok(Self {
            s3_client,
            bucket: config.bucket.clone(),
            key_prefix: config.key_prefix.trim_matches('/').to_string(),
        })
    }

    fn full_key(&self, path: &str) -> String {
        if self.key_prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.key_prefix, path)
        }
    }

    fn list_prefix(&self) -> String {
        if self.key_prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.key_prefix)
        }
    }

    async fn fetch_page(&self, listing: &mut Listing) -> Result<(), Error> {
        let prefix = self.list_prefix();

        let res = self
            .s3_client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&prefix)
            .max_keys(LIST_PAGE_SIZE)
            .set_continuation_token(listing.continuation_token.take())
            .send()
            .await
            .map_err(|e| Error::Io(e.into_service_error().to_string()))?;

        for object in res.contents.unwrap_or_default() {
            let Some(key) = object.key else {
                continue;
            };

            let path = key.strip_prefix(&prefix).unwrap_or(&key).to_string();
            let size = object.size.unwrap_or_default().try_into().unwrap_or(0);
            listing.objects.push_back(StoredObject { path, size });
        }

        if res.is_truncated.unwrap_or(false) {
            listing.continuation_token = res.next_continuation_token;
        }
        listing.exhausted = listing.continuation_token.is_none();

        debug!(
            "Fetched listing page from bucket '{}' ({} objects buffered)",
            self.bucket,
            listing.objects.len()
        );
        Ok(())
    }
}

/// Pagination state of a bucket listing; holds at most one page.
#[derive(Default)]
struct Listing {
    continuation_token: Option<String>,
    objects: VecDeque<StoredObject>,
    exhausted: bool,
}

#[async_trait]
impl StorageBackend for Backend {
    fn list_paths(&self) -> BoxStream<'_, Result<StoredObject, Error>> {
        stream::try_unfold(Listing::default(), move |mut listing| async move {
            loop {
                if let Some(object) = listing.objects.pop_front() {
                    return Ok::<_, Error>(Some((object, listing)));
                }

                if listing.exhausted {
                    return Ok(None);
                }

                self.fetch_page(&mut listing).await?;
            }
        })
        .boxed()
    }

    async fn read_object(&self, path: &str) -> Result<Vec<u8>, Error> {
        let key = self.full_key(path);

        let result = self
            .s3_client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    Error::NotFound(key.clone())
                } else {
                    Error::Io(service_error.to_string())
                }
            })?;

        let body = result
            .body
            .collect()
            .await
            .map_err(|e| Error::Io(e.to_string()))?;

        Ok(body.into_bytes().to_vec())
    }
}
