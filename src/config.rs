//! Client configuration
//!
//! Connection settings, credentials, and query defaults, loadable from YAML
//! or the environment.

use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::http::HttpClientConfig;
use crate::pagination::QueryDefaults;
use crate::types::StringMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding the server root
pub const ENV_SERVER: &str = "PAGER_SERVER";
/// Environment variable carrying an API key
pub const ENV_API_KEY: &str = "PAGER_API_KEY";
/// Environment variable carrying a basic-auth username
pub const ENV_USERNAME: &str = "PAGER_USERNAME";
/// Environment variable carrying a basic-auth password
pub const ENV_PASSWORD: &str = "PAGER_PASSWORD";
/// Environment variable overriding the API version
pub const ENV_API_VERSION: &str = "PAGER_API_VERSION";

// ============================================================================
// Client Config
// ============================================================================

/// Complete client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server root
    #[serde(default = "default_server")]
    pub server: String,

    /// Service path under the server root
    #[serde(default = "default_api_path")]
    pub api_path: String,

    /// API version segment
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// API key (takes precedence over username/password)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Basic-auth username
    #[serde(default)]
    pub username: Option<String>,

    /// Basic-auth password
    #[serde(default)]
    pub password: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: StringMap,

    /// Query defaults merged into every paged query
    #[serde(default)]
    pub defaults: QueryDefaults,
}

fn default_server() -> String {
    "https://rally1.rallydev.com".to_string()
}

fn default_api_path() -> String {
    "slm/webservice".to_string()
}

fn default_api_version() -> String {
    "v2.0".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            api_path: default_api_path(),
            api_version: default_api_version(),
            api_key: None,
            username: None,
            password: None,
            timeout_secs: default_timeout(),
            user_agent: None,
            headers: StringMap::new(),
            defaults: QueryDefaults::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a config from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a config from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }

    /// Config built from defaults plus the process environment
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `PAGER_*` environment variables on top of this config
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(server) = lookup(ENV_SERVER) {
            self.server = server;
        }
        if let Some(version) = lookup(ENV_API_VERSION) {
            self.api_version = version;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            self.username = Some(username);
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.password = Some(password);
        }
        self
    }

    /// Check the config for values that cannot produce a working client
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.server)
            .map_err(|e| Error::invalid_value("server", e.to_string()))?;

        if self.api_version.trim().is_empty() {
            return Err(Error::missing_field("api_version"));
        }

        if self.timeout_secs == 0 {
            return Err(Error::invalid_value("timeout_secs", "must be greater than 0"));
        }

        if self.username.is_some() != self.password.is_some() && self.api_key.is_none() {
            return Err(Error::invalid_value(
                "username",
                "username and password must be set together",
            ));
        }

        Ok(())
    }

    /// Authentication derived from the credentials present
    pub fn auth(&self) -> AuthConfig {
        match (&self.api_key, &self.username, &self.password) {
            (Some(key), _, _) => AuthConfig::api_key(key.clone()),
            (None, Some(user), Some(pass)) => AuthConfig::basic(user.clone(), pass.clone()),
            _ => AuthConfig::None,
        }
    }

    /// Transport settings for the HTTP client
    pub fn http_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .server(&self.server)
            .api_path(&self.api_path)
            .api_version(&self.api_version)
            .timeout(Duration::from_secs(self.timeout_secs));

        if let Some(ref agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.server, "https://rally1.rallydev.com");
        assert_eq!(config.api_version, "v2.0");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.defaults.page_size, 200);
        assert_eq!(config.auth(), AuthConfig::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = ClientConfig::from_yaml_str("api_key: _abc\n").unwrap();
        assert_eq!(config.api_key, Some("_abc".to_string()));
        assert_eq!(config.api_path, "slm/webservice");
        assert_eq!(config.defaults.start, 1);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
server: "https://example.com"
api_version: "v3"
username: "user@example.com"
password: "secret"
timeout_secs: 10
user_agent: "pager-test"
headers:
  X-Integration: "nightly"
defaults:
  page_size: 50
"#;

        let config = ClientConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.defaults.page_size, 50);
        assert_eq!(config.defaults.start, 1);
        assert_eq!(config.auth(), AuthConfig::basic("user@example.com", "secret"));

        let http = config.http_config();
        assert_eq!(http.api_base(), "https://example.com/slm/webservice/v3");
        assert_eq!(http.timeout, Duration::from_secs(10));
        assert_eq!(http.user_agent, "pager-test");
        assert_eq!(
            http.default_headers.get("X-Integration"),
            Some(&"nightly".to_string())
        );
    }

    #[test]
    fn test_invalid_yaml() {
        let err = ClientConfig::from_yaml_str("timeout_secs: [1, 2]").unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server: https://files.example.com").unwrap();
        writeln!(file, "api_key: _from_file").unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server, "https://files.example.com");
        assert_eq!(config.auth(), AuthConfig::api_key("_from_file"));
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::from_file(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::default().with_overrides(|key| match key {
            ENV_SERVER => Some("https://env.example.com".to_string()),
            ENV_API_KEY => Some("_env".to_string()),
            ENV_API_VERSION => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.server, "https://env.example.com");
        assert_eq!(config.api_key, Some("_env".to_string()));
        // Empty values are ignored
        assert_eq!(config.api_version, "v2.0");
    }

    #[test]
    fn test_api_key_wins_over_basic() {
        let config = ClientConfig {
            api_key: Some("_key".to_string()),
            username: Some("u".to_string()),
            password: Some("p".to_string()),
            ..Default::default()
        };
        assert_eq!(config.auth(), AuthConfig::api_key("_key"));
    }

    #[test]
    fn test_validate() {
        let bad_server = ClientConfig {
            server: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            bad_server.validate(),
            Err(Error::InvalidConfigValue { .. })
        ));

        let no_version = ClientConfig {
            api_version: " ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            no_version.validate(),
            Err(Error::MissingConfigField { .. })
        ));

        let zero_timeout = ClientConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(zero_timeout.validate().is_err());

        let half_basic = ClientConfig {
            username: Some("u".to_string()),
            ..Default::default()
        };
        assert!(half_basic.validate().is_err());
    }
}
