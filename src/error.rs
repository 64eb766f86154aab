//! Error types for the collection pager
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for the collection pager
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Security token request failed: {message}")]
    SecurityToken { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Server Errors
    // ============================================================================
    #[error("Server returned errors: {}", errors.join("; "))]
    Server { errors: Vec<String> },

    // ============================================================================
    // Reference Errors
    // ============================================================================
    #[error("Invalid object reference: {value}")]
    InvalidRef { value: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a security token error
    pub fn security_token(message: impl Into<String>) -> Self {
        Self::SecurityToken {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a server error from the envelope's error list
    pub fn server<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Server {
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an invalid reference error
    pub fn invalid_ref(value: impl Into<String>) -> Self {
        Self::InvalidRef {
            value: value.into(),
        }
    }

    /// The list of error strings carried by this failure
    ///
    /// Server failures surface the envelope's `Errors` array as-is; every
    /// other failure is reported as a single message.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Error::Server { errors } => errors.clone(),
            other => vec![other.to_string()],
        }
    }

    /// Check if the server rejected the request's security token
    pub fn is_invalid_key(&self) -> bool {
        match self {
            Error::Server { errors } => errors.iter().any(|e| e.contains("Invalid key")),
            _ => false,
        }
    }
}

/// Result type alias for the collection pager
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("server");
        assert_eq!(err.to_string(), "Missing required config field: server");

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::server(["Could not parse query", "Bad field"]);
        assert_eq!(
            err.to_string(),
            "Server returned errors: Could not parse query; Bad field"
        );
    }

    #[test]
    fn test_messages() {
        let err = Error::server(["first", "second"]);
        assert_eq!(err.messages(), vec!["first", "second"]);

        let err = Error::invalid_ref("nope");
        assert_eq!(err.messages(), vec!["Invalid object reference: nope"]);
    }

    #[test]
    fn test_is_invalid_key() {
        assert!(Error::server(["Not authorized to perform action: Invalid key"]).is_invalid_key());
        assert!(!Error::server(["Something else"]).is_invalid_key());
        assert!(!Error::http_status(401, "Invalid key").is_invalid_key());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
