//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::trace;
use url::Url;

use crate::api::{ProfileApi, SettingsApi};
use crate::error::{Error, ErrorResponse, Result};

/// Default timeout for requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for the profile verification request.
pub const DEFAULT_PROFILE_TIMEOUT: Duration = Duration::from_secs(10);

/// examdesk API client.
///
/// Cheap to clone; clones share one connection pool.
///
/// # Example
///
/// ```no_run
/// use examdesk_client::ExamdeskClient;
///
/// # async fn example() -> examdesk_client::Result<()> {
/// let client = ExamdeskClient::builder()
///     .base_url("http://localhost:5000/api")
///     .build()?;
///
/// let settings = client.settings().public().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ExamdeskClient {
    /// Inner shared state.
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    /// HTTP client.
    pub(crate) http: reqwest::Client,
    /// Base URL for API requests.
    pub(crate) base_url: Url,
    /// Request timeout.
    pub(crate) timeout: Duration,
    /// Profile verification timeout.
    pub(crate) profile_timeout: Duration,
}

impl std::fmt::Debug for ExamdeskClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExamdeskClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .field("profile_timeout", &self.inner.profile_timeout)
            .finish()
    }
}

impl ExamdeskClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Timeout applied to the profile verification request.
    pub fn profile_timeout(&self) -> Duration {
        self.inner.profile_timeout
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the profile API.
    pub fn profile(&self) -> ProfileApi {
        ProfileApi::new(self.clone())
    }

    /// Access the settings API.
    pub fn settings(&self) -> SettingsApi {
        SettingsApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner.base_url.join(path).map_err(Error::from)
    }

    /// Make a GET request.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        trace!(url = %url, "GET");
        let response = self
            .inner
            .http
            .get(url)
            .timeout(self.inner.timeout)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Make a bearer-authenticated GET request with an explicit timeout.
    pub(crate) async fn get_authorized<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<T> {
        let url = self.url(path)?;
        trace!(url = %url, "GET (authorized)");
        let response = self
            .inner
            .http
            .get(url)
            .bearer_auth(token)
            .timeout(timeout)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Handle a response, extracting the body or error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status().is_success() {
            let bytes = response.bytes().await?;
            Ok(serde_json::from_slice(&bytes)?)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Extract an error from a failed response.
    async fn extract_error(&self, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();

        // Error bodies are best effort; fall back to the status line.
        let body = response.json::<ErrorResponse>().await.unwrap_or_default();
        let message = body
            .message
            .unwrap_or_else(|| format!("HTTP {}", status));

        match status {
            401 | 403 => Error::Auth { status, message },
            404 => Error::NotFound(message),
            _ => Error::Api {
                status,
                code: body.code.unwrap_or_else(|| "unknown".to_string()),
                message,
            },
        }
    }
}

/// Builder for creating an ExamdeskClient.
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    profile_timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            profile_timeout: DEFAULT_PROFILE_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the base URL for the API.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the general request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the profile verification timeout.
    pub fn profile_timeout(mut self, timeout: Duration) -> Self {
        self.profile_timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ExamdeskClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        // Parse and normalize base URL so relative joins keep the prefix
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("examdesk-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(ExamdeskClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                profile_timeout: self.profile_timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let result = ClientBuilder::new().build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_with_base_url() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:5000")
            .build()
            .unwrap();

        assert_eq!(client.base_url().as_str(), "http://localhost:5000/");
        assert_eq!(client.profile_timeout(), DEFAULT_PROFILE_TIMEOUT);
    }

    #[test]
    fn test_builder_normalizes_trailing_slash() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:5000/api")
            .build()
            .unwrap();

        assert_eq!(client.base_url().as_str(), "http://localhost:5000/api/");
    }

    #[test]
    fn test_builder_rejects_garbage_url() {
        let result = ClientBuilder::new().base_url("not a url").build();
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_url_building_keeps_prefix() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:5000/api")
            .build()
            .unwrap();

        let url = client.url("profile").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/profile");

        let url = client.url("/settings/public").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/settings/public");
    }
}
