//! Authenticator implementation
//!
//! Handles applying credentials to requests and managing the security token.

use super::types::{AuthConfig, SecurityToken};
use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Authenticator handles applying authentication to HTTP requests
pub struct Authenticator {
    /// Auth configuration
    config: AuthConfig,
    /// Cached security token for basic-auth writes
    security_token: Arc<RwLock<Option<SecurityToken>>>,
    /// HTTP client for token requests
    http_client: Client,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: AuthConfig, http_client: Client) -> Self {
        Self {
            config,
            security_token: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    /// Apply credentials to a request builder
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.config {
            AuthConfig::None => req,
            AuthConfig::ApiKey { header_name, value } => req.header(header_name.as_str(), value),
            AuthConfig::Basic { username, password } => req.basic_auth(username, Some(password)),
        }
    }

    /// Security token for a write request, fetching one if none is cached
    ///
    /// Returns `None` when the auth type does not use security tokens.
    pub async fn security_token(&self, authorize_url: &str) -> Result<Option<SecurityToken>> {
        if !self.config.needs_security_token() {
            return Ok(None);
        }

        {
            let cached = self.security_token.read().await;
            if let Some(token) = cached.as_ref() {
                return Ok(Some(token.clone()));
            }
        }

        let mut cached = self.security_token.write().await;

        // Another task may have fetched it while we waited for the lock
        if let Some(token) = cached.as_ref() {
            return Ok(Some(token.clone()));
        }

        let token = self.fetch_security_token(authorize_url).await?;
        *cached = Some(token.clone());
        Ok(Some(token))
    }

    /// Fetch a fresh security token from the authorize endpoint
    async fn fetch_security_token(&self, authorize_url: &str) -> Result<SecurityToken> {
        debug!("Requesting security token from {authorize_url}");
        let response = self
            .apply(self.http_client.get(authorize_url))
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::security_token(format!(
                "Authorize request failed with status {status}: {body}"
            )));
        }

        let body: AuthorizeResponse = response.json().await.map_err(Error::Http)?;
        let result = body.operation_result;
        if !result.errors.is_empty() {
            return Err(Error::security_token(result.errors.join("; ")));
        }
        result
            .security_token
            .filter(|t| !t.is_empty())
            .map(SecurityToken::new)
            .ok_or_else(|| Error::security_token("Response did not include a SecurityToken"))
    }

    /// Clear the cached token so the next write fetches a new one
    pub async fn clear_cache(&self) {
        let mut cached = self.security_token.write().await;
        *cached = None;
    }

    /// Get the current auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.config {
            AuthConfig::None => "none",
            AuthConfig::ApiKey { .. } => "api_key",
            AuthConfig::Basic { .. } => "basic",
        };
        f.debug_struct("Authenticator")
            .field("kind", &kind)
            .finish_non_exhaustive()
    }
}

/// Authorize endpoint response
#[derive(Debug, Deserialize)]
struct AuthorizeResponse {
    #[serde(rename = "OperationResult")]
    operation_result: AuthorizeResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthorizeResult {
    #[serde(default)]
    security_token: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}
