//! HTTP client for the collection API
//!
//! Provides the single-request transport that every operation goes through:
//! - URL construction against the versioned service root
//! - Authentication, including security tokens for writes
//! - Response envelope unwrapping and server error extraction
//!
//! No retry, backoff, or rate limiting: a failed request fails the
//! operation that issued it.

use crate::auth::{AuthConfig, Authenticator, SecurityToken};
use crate::error::{Error, Result};
use crate::types::{JsonValue, Method, StringMap};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Server root, e.g. `https://rally1.rallydev.com`
    pub server: String,
    /// Service path under the server root
    pub api_path: String,
    /// API version segment
    pub api_version: String,
    /// Request timeout
    pub timeout: Duration,
    /// Default headers for all requests
    pub default_headers: StringMap,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            server: "https://rally1.rallydev.com".to_string(),
            api_path: "slm/webservice".to_string(),
            api_version: "v2.0".to_string(),
            timeout: Duration::from_secs(30),
            default_headers: StringMap::new(),
            user_agent: format!("collection-pager/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }

    /// Versioned service root, e.g. `https://host/slm/webservice/v2.0`
    pub fn api_base(&self) -> String {
        format!(
            "{}/{}/{}",
            self.server.trim_end_matches('/'),
            self.api_path.trim_matches('/'),
            self.api_version.trim_matches('/')
        )
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the server root
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.config.server = server.into();
        self
    }

    /// Set the service path
    pub fn api_path(mut self, api_path: impl Into<String>) -> Self {
        self.config.api_path = api_path.into();
        self
    }

    /// Set the API version
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters, sent in order
    pub query: Vec<(String, String)>,
    /// Request headers
    pub headers: StringMap,
    /// Request body (JSON)
    pub body: Option<JsonValue>,
    /// Override timeout for this request
    pub timeout: Option<Duration>,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add several query parameters
    #[must_use]
    pub fn queries<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// HTTP client bound to one server and one set of credentials
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Authenticator,
}

impl HttpClient {
    /// Create an unauthenticated client
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        Self::with_auth(config, AuthConfig::None)
    }

    /// Create a client with authentication
    pub fn with_auth(config: HttpClientConfig, auth_config: AuthConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(Error::Http)?;
        let authenticator = Authenticator::with_client(auth_config, client.clone());

        Ok(Self {
            client,
            config,
            authenticator,
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Make a GET request
    pub async fn get(&self, path: &str, config: RequestConfig) -> Result<JsonValue> {
        self.request(Method::GET, path, config).await
    }

    /// Make a POST request with a JSON body
    pub async fn post(
        &self,
        path: &str,
        body: JsonValue,
        config: RequestConfig,
    ) -> Result<JsonValue> {
        self.request(Method::POST, path, config.json(body)).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put(
        &self,
        path: &str,
        body: JsonValue,
        config: RequestConfig,
    ) -> Result<JsonValue> {
        self.request(Method::PUT, path, config.json(body)).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str, config: RequestConfig) -> Result<JsonValue> {
        self.request(Method::DELETE, path, config).await
    }

    /// Make a request and return the unwrapped response envelope
    ///
    /// Writes under basic auth carry a security token. When the server
    /// rejects the token it is renewed and the write reissued once.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        config: RequestConfig,
    ) -> Result<JsonValue> {
        if !method.is_write() {
            return self.send(method, path, &config, None).await;
        }

        let authorize_url = self.authorize_url();
        let token = self.authenticator.security_token(&authorize_url).await?;
        match self.send(method, path, &config, token.as_ref()).await {
            Err(e) if token.is_some() && e.is_invalid_key() => {
                debug!("Security token rejected, requesting a new one");
                self.authenticator.clear_cache().await;
                let token = self.authenticator.security_token(&authorize_url).await?;
                self.send(method, path, &config, token.as_ref()).await
            }
            other => other,
        }
    }

    /// Issue exactly one HTTP request
    async fn send(
        &self,
        method: Method,
        path: &str,
        config: &RequestConfig,
        token: Option<&SecurityToken>,
    ) -> Result<JsonValue> {
        let url = self.build_url(path);
        let timeout = config.timeout.unwrap_or(self.config.timeout);

        let mut req = self.client.request(method.into(), &url);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        for (key, value) in &config.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if !config.query.is_empty() {
            req = req.query(&config.query);
        }

        if let Some(token) = token {
            req = req.query(&[("key", token.as_str())]);
        }

        if let Some(ref body) = config.body {
            req = req.json(body);
        }

        req = self.authenticator.apply(req.timeout(timeout));

        debug!("{method} {url}");
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                }
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http_status(status.as_u16(), body));
        }

        let body: JsonValue = response.json().await.map_err(Error::Http)?;
        unwrap_envelope(body)
    }

    /// URL of the security token endpoint
    pub fn authorize_url(&self) -> String {
        format!("{}/security/authorize", self.config.api_base())
    }

    /// Build full URL from a path or ref
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let prefix = format!(
            "{}/{}/",
            self.config.api_path.trim_matches('/'),
            self.config.api_version.trim_matches('/')
        );
        let path = path.trim_start_matches('/');
        let path = path.strip_prefix(prefix.as_str()).unwrap_or(path);
        format!("{}/{}", self.config.api_base(), path)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("authenticator", &self.authenticator)
            .finish_non_exhaustive()
    }
}

/// Result wrappers the server puts around every response body
pub const RESULT_WRAPPERS: [&str; 3] = ["QueryResult", "CreateResult", "OperationResult"];

/// Strip the result wrapper and surface server errors
///
/// `{"QueryResult": {...}}` becomes `{...}`; other bodies pass through
/// unchanged. A non-empty `Errors` array turns into [`Error::Server`].
pub fn unwrap_envelope(body: JsonValue) -> Result<JsonValue> {
    let inner = match body {
        JsonValue::Object(mut map)
            if map.len() == 1 && RESULT_WRAPPERS.iter().any(|key| map.contains_key(*key)) =>
        {
            let key = map.keys().next().cloned().unwrap_or_default();
            map.remove(&key).unwrap_or_default()
        }
        other => other,
    };

    if let Some(errors) = inner.get("Errors").and_then(JsonValue::as_array) {
        if !errors.is_empty() {
            return Err(Error::server(errors.iter().map(message_text)));
        }
    }

    Ok(inner)
}

fn message_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
