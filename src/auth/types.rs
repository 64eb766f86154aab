//! Auth configuration types

use std::fmt;

/// Header carrying an API key
pub const API_KEY_HEADER: &str = "ZSESSIONID";

/// Authentication configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// API key sent in a header
    ApiKey {
        /// Header name (default: `ZSESSIONID`)
        header_name: String,
        /// The API key value
        value: String,
    },

    /// HTTP Basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },
}

impl AuthConfig {
    /// API key auth using the standard header
    pub fn api_key(value: impl Into<String>) -> Self {
        Self::ApiKey {
            header_name: API_KEY_HEADER.to_string(),
            value: value.into(),
        }
    }

    /// Basic auth
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Whether write requests must carry a security token
    ///
    /// API keys authorize writes on their own.
    pub fn needs_security_token(&self) -> bool {
        matches!(self, Self::Basic { .. })
    }
}

/// Token authorizing write requests for a basic-auth session
#[derive(Clone, PartialEq, Eq)]
pub struct SecurityToken(String);

impl SecurityToken {
    /// Wrap a token value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecurityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecurityToken(***)")
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert!(matches!(config, AuthConfig::None));
        assert!(!config.needs_security_token());
    }

    #[test]
    fn test_needs_security_token() {
        assert!(AuthConfig::basic("u", "p").needs_security_token());
        assert!(!AuthConfig::api_key("_abc").needs_security_token());
    }

    #[test]
    fn test_security_token_debug_is_masked() {
        let token = SecurityToken::new("secret");
        assert_eq!(format!("{token:?}"), "SecurityToken(***)");
        assert_eq!(token.as_str(), "secret");
    }
}
