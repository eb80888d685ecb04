mod authentication_scheme;
mod bearer_token;
mod error;
mod tls;

use async_trait::async_trait;
use authentication_scheme::AuthenticationScheme;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use bearer_token::BearerToken;
use http_body_util::{BodyExt, Empty};
use hyper::body::{Bytes, Incoming};
use hyper::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use hyper::{Method, Request, Response, StatusCode};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::Deserialize;
use tracing::{debug, info, instrument};

pub use error::Error;

use crate::oci::Digest;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegistryConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub server_ca_bundle: Option<String>,
    pub client_certificate: Option<String>,
    pub client_private_key: Option<String>,
    #[serde(default)]
    pub accept_invalid_certificates: bool,
}

/// How requests to the registry are authenticated, as negotiated at startup.
#[derive(Clone, Debug, PartialEq)]
pub enum AuthContext {
    Anonymous,
    Basic,
    Bearer {
        realm: String,
        service: Option<String>,
    },
}

/// The deletion side of the registry API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ManifestRegistry: Send + Sync {
    /// Sends the deletion and returns the registry's status code; only
    /// failures to talk to the registry or to authenticate are errors.
    async fn delete_manifest(&self, namespace: &str, digest: &Digest)
        -> Result<StatusCode, Error>;
}

#[derive(Debug)]
pub struct RegistryClient {
    client: Client<HttpsConnector<HttpConnector>, Empty<Bytes>>,
    url: String,
    basic_auth: Option<String>,
    auth: AuthContext,
}

fn token_request_uri(realm: &str, service: Option<&str>, scope: &str) -> Result<String, Error> {
    let mut parameters = Vec::new();
    if let Some(service) = service {
        parameters.push(("service", service));
    }
    parameters.push(("scope", scope));

    let query = serde_urlencoded::to_string(parameters)
        .map_err(|e| Error::Configuration(format!("Unable to encode token request: {e}")))?;
    let separator = if realm.contains('?') { '&' } else { '?' };

    Ok(format!("{realm}{separator}{query}"))
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig) -> Result<Self, Error> {
        let url = config.url.trim_end_matches('/').to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Configuration(format!(
                "Registry URL must start with http:// or https://: '{}'",
                config.url
            )));
        }

        let tls_config = tls::build_tls_config(config)?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);

        let basic_auth = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                let encoded = BASE64_STANDARD.encode(format!("{username}:{password}"));
                Some(format!("Basic {encoded}"))
            }
            (None, None) => None,
            _ => {
                return Err(Error::Configuration(
                    "Username and password must be both provided".to_string(),
                ))
            }
        };

        let auth = if basic_auth.is_some() {
            AuthContext::Basic
        } else {
            AuthContext::Anonymous
        };

        Ok(Self {
            client,
            url,
            basic_auth,
            auth,
        })
    }

    /// Builds the client and negotiates authentication against `GET /v2/`.
    pub async fn connect(config: &RegistryConfig) -> Result<Self, Error> {
        let mut client = Self::new(config)?;
        client.probe().await?;
        Ok(client)
    }

    pub fn auth_context(&self) -> &AuthContext {
        &self.auth
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn probe(&mut self) -> Result<(), Error> {
        let location = format!("{}/v2/", self.url);
        let response = self
            .send(Method::GET, &location, self.basic_auth.as_deref())
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("Connected to registry, authentication: {:?}", self.auth);
            return Ok(());
        }

        if status != StatusCode::UNAUTHORIZED {
            return Err(Error::UnexpectedStatus(status));
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|header| header.to_str().ok())
            .ok_or_else(|| {
                Error::Unauthorized("Registry refused access, check credentials".to_string())
            })?;

        match AuthenticationScheme::from_www_authenticate_header(challenge)? {
            AuthenticationScheme::Bearer(realm, mut parameters) => {
                self.auth = AuthContext::Bearer {
                    realm,
                    service: parameters.remove("service"),
                };
                self.fetch_token("").await?;
                info!("Connected to registry, authentication: {:?}", self.auth);
                Ok(())
            }
            AuthenticationScheme::Basic => Err(Error::Unauthorized(
                "Registry refused access, check credentials".to_string(),
            )),
        }
    }

    async fn fetch_token(&self, scope: &str) -> Result<String, Error> {
        let AuthContext::Bearer { realm, service } = &self.auth else {
            return Err(Error::Unauthorized(
                "Registry did not offer token authentication".to_string(),
            ));
        };

        let location = token_request_uri(realm, service.as_deref(), scope)?;
        let response = self
            .send(Method::GET, &location, self.basic_auth.as_deref())
            .await
            .map_err(|e| Error::Unauthorized(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Unauthorized(format!(
                "Token acquisition failed for scope '{scope}': {}",
                response.status()
            )));
        }

        let body = response.into_body().collect().await?.to_bytes();
        let token = BearerToken::from_slice(&body)?;
        debug!(
            "Obtained token for scope '{scope}', expires in {}s",
            token.ttl()
        );

        token.token()
    }

    async fn send(
        &self,
        method: Method,
        location: &str,
        authorization: Option<&str>,
    ) -> Result<Response<Incoming>, Error> {
        let mut request = Request::builder().method(method).uri(location);
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }

        let request = request.body(Empty::new())?;
        self.client
            .request(request)
            .await
            .map_err(|e| Error::Connection(format!("{location}: {e}")))
    }
}

#[async_trait]
impl ManifestRegistry for RegistryClient {
    #[instrument(skip(self))]
    async fn delete_manifest(
        &self,
        namespace: &str,
        digest: &Digest,
    ) -> Result<StatusCode, Error> {
        let authorization = match &self.auth {
            AuthContext::Anonymous => None,
            AuthContext::Basic => self.basic_auth.clone(),
            AuthContext::Bearer { .. } => {
                let token = self
                    .fetch_token(&format!("repository:{namespace}:*"))
                    .await?;
                Some(format!("Bearer {token}"))
            }
        };

        let location = format!("{}/v2/{namespace}/manifests/{digest}", self.url);
        let response = self
            .send(Method::DELETE, &location, authorization.as_deref())
            .await?;

        Ok(response.status())
    }
}
