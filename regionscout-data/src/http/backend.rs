//! `reqwest`-backed implementation of the collaborator traits.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use regionscout_core::PlaceResult;
use regionscout_core::backend::{
    ArtifactConverter, Estimate, EstimateRequest, ExcelRequest, KmzRequest, PlaceSearch,
    TransportError,
};
use regionscout_core::query::QueryRequest;
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use super::reply::{EstimateReply, SearchReply, error_message};

/// Default base URL of the backend services.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default user agent for backend requests.
pub const DEFAULT_USER_AGENT: &str = "regionscout/0.1";

/// Errors raised while constructing an [`HttpBackend`].
#[derive(Debug, Error)]
pub enum BackendBuildError {
    /// The base URL could not be parsed or cannot carry paths.
    #[error("invalid base URL `{url}`: {message}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Configuration for [`HttpBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpBackendConfig {
    /// Base URL of the services, e.g. `"http://127.0.0.1:8000"`.
    pub base_url: String,
    /// Whole-request timeout. Searches with enrichment tiers can take
    /// minutes, so none is applied unless configured.
    pub timeout: Option<Duration>,
    /// User agent string for requests.
    pub user_agent: String,
    /// Honour proxy settings from the environment.
    pub use_system_proxy: bool,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            use_system_proxy: true,
        }
    }
}

impl HttpBackendConfig {
    /// Create a configuration for the services at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Connect directly, ignoring proxy environment variables.
    #[must_use]
    pub fn without_system_proxy(mut self) -> Self {
        self.use_system_proxy = false;
        self
    }
}

/// Service endpoints below the base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Primary place search.
    Search,
    /// Pre-flight time and cost estimate.
    Estimate,
    /// KMZ archive conversion.
    Kmz,
    /// XLSX spreadsheet conversion.
    Excel,
}

impl Endpoint {
    /// Path relative to the base URL.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Search => "search_nearby",
            Self::Estimate => "estimator",
            Self::Kmz => "get_kmz",
            Self::Excel => "get_excel",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.path())
    }
}

/// Backend reaching the RegionScout services over HTTP.
///
/// Every call is a JSON `POST`. Request bodies are never logged because they
/// carry API keys.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
    config: HttpBackendConfig,
}

impl HttpBackend {
    /// Create a backend for `base_url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client fails to
    /// build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendBuildError> {
        Self::with_config(HttpBackendConfig::new(base_url))
    }

    /// Create a backend with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client fails to
    /// build.
    pub fn with_config(config: HttpBackendConfig) -> Result<Self, BackendBuildError> {
        let base = parse_base_url(&config.base_url)?;
        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.connect_timeout(timeout).timeout(timeout);
        }
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(BackendBuildError::HttpClient)?;
        Ok(Self {
            client,
            base,
            config,
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    /// Absolute URL of `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Network`] if the path cannot be joined to
    /// the base URL.
    pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url, TransportError> {
        self.base
            .join(endpoint.path())
            .map_err(|err| TransportError::Network {
                url: format!("{}{}", self.base, endpoint.path()),
                message: err.to_string(),
            })
    }

    async fn post<B>(&self, endpoint: Endpoint, body: &B) -> Result<(Url, Response), TransportError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint_url(endpoint)?;
        debug!("POST {url}");
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|err| convert_reqwest_error(&err, url.as_str()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(status, &text);
            warn!("{endpoint} answered {status}: {message}");
            return Err(TransportError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                message,
            });
        }
        Ok((url, response))
    }

    async fn post_for_bytes<B>(&self, endpoint: Endpoint, body: &B) -> Result<Vec<u8>, TransportError>
    where
        B: Serialize + ?Sized,
    {
        let (url, response) = self.post(endpoint, body).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| convert_reqwest_error(&err, url.as_str()))?;
        debug!("{endpoint} returned {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    async fn post_for_json<B, T>(&self, endpoint: Endpoint, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint_url(endpoint)?;
        let bytes = self.post_for_bytes(endpoint, body).await?;
        serde_json::from_slice(&bytes).map_err(|err| TransportError::Parse {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, BackendBuildError> {
    let invalid = |message: String| BackendBuildError::InvalidBaseUrl {
        url: raw.to_owned(),
        message,
    };
    let mut url = Url::parse(raw.trim()).map_err(|err| invalid(err.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot carry paths".to_owned()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Convert a reqwest error to a [`TransportError`].
fn convert_reqwest_error(error: &reqwest::Error, url: &str) -> TransportError {
    if error.is_timeout() {
        return TransportError::Timeout {
            url: url.to_owned(),
        };
    }

    if error.is_decode() {
        return TransportError::Parse {
            url: url.to_owned(),
            message: error.to_string(),
        };
    }

    if let Some(status) = error.status() {
        return TransportError::Http {
            url: url.to_owned(),
            status: status.as_u16(),
            message: error.to_string(),
        };
    }

    TransportError::Network {
        url: url.to_owned(),
        message: error.to_string(),
    }
}

#[async_trait(?Send)]
impl PlaceSearch for HttpBackend {
    async fn search(&self, request: &QueryRequest) -> Result<Vec<PlaceResult>, TransportError> {
        let reply: SearchReply = self.post_for_json(Endpoint::Search, request).await?;
        match reply {
            SearchReply::Places(places) => Ok(places),
            SearchReply::Failure { error } => Err(TransportError::Service { message: error }),
        }
    }

    async fn estimate(&self, request: &EstimateRequest) -> Result<Estimate, TransportError> {
        let reply: EstimateReply = self.post_for_json(Endpoint::Estimate, request).await?;
        match reply {
            EstimateReply::Estimate(estimate) => Ok(estimate),
            EstimateReply::Failure { error } => Err(TransportError::Service { message: error }),
        }
    }
}

#[async_trait(?Send)]
impl ArtifactConverter for HttpBackend {
    async fn convert_kmz(&self, request: &KmzRequest<'_>) -> Result<Vec<u8>, TransportError> {
        self.post_for_bytes(Endpoint::Kmz, request).await
    }

    async fn convert_excel(&self, request: &ExcelRequest<'_>) -> Result<Vec<u8>, TransportError> {
        self.post_for_bytes(Endpoint::Excel, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::bare("http://127.0.0.1:8000", "http://127.0.0.1:8000/search_nearby")]
    #[case::trailing_slash("http://127.0.0.1:8000/", "http://127.0.0.1:8000/search_nearby")]
    #[case::prefix("https://example.com/api", "https://example.com/api/search_nearby")]
    #[case::prefix_slash("https://example.com/api/", "https://example.com/api/search_nearby")]
    fn endpoint_urls_keep_the_base_path(#[case] base: &str, #[case] expected: &str) {
        let backend = HttpBackend::new(base).expect("backend should build");
        let url = backend
            .endpoint_url(Endpoint::Search)
            .expect("endpoint should join");
        assert_eq!(url.as_str(), expected);
    }

    #[rstest]
    #[case(Endpoint::Search, "/search_nearby")]
    #[case(Endpoint::Estimate, "/estimator")]
    #[case(Endpoint::Kmz, "/get_kmz")]
    #[case(Endpoint::Excel, "/get_excel")]
    fn endpoints_display_their_paths(#[case] endpoint: Endpoint, #[case] expected: &str) {
        assert_eq!(endpoint.to_string(), expected);
    }

    #[rstest]
    #[case::garbage("not a url")]
    #[case::opaque("mailto:someone@example.com")]
    fn invalid_base_urls_are_rejected(#[case] base: &str) {
        let err = HttpBackend::new(base).expect_err("base should be rejected");
        assert!(matches!(err, BackendBuildError::InvalidBaseUrl { ref url, .. } if url == base));
    }

    #[rstest]
    fn default_config_targets_local_services() {
        let config = HttpBackendConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, None);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert!(config.use_system_proxy);
    }

    #[rstest]
    fn config_builder_pattern() {
        let config = HttpBackendConfig::new("http://example.com")
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("test-agent/1.0")
            .without_system_proxy();

        assert_eq!(config.base_url, "http://example.com");
        assert_eq!(config.timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.user_agent, "test-agent/1.0");
        assert!(!config.use_system_proxy);
    }
}
