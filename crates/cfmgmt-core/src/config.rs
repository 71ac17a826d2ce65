//! Configuration structures for the Cloud Controller client.
//!
//! Connection parameters are passed explicitly to the client that uses them; nothing here
//! is global.

use crate::Error;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Connection configuration for a Cloud Controller endpoint.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CloudControllerConfig {
    /// Cloud Controller base URL (e.g. `https://api.sys.example.com`)
    #[validate(url)]
    pub host: String,

    /// Bearer token sent with every request
    #[serde(skip_serializing, deserialize_with = "deserialize_secret")]
    pub token: SecretString,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_request_timeout_secs() -> u64 {
    30
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl CloudControllerConfig {
    /// Create a new configuration for the given host and bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] if the host is not a valid URL.
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            host: host.into(),
            token: SecretString::from(token.into()),
            tls_verify: default_tls_verify(),
            request_timeout_secs: default_request_timeout_secs(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Load and validate a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the file cannot be read or parsed, or
    /// [`Error::ValidationError`] if a field is out of range.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_yaml::from_str(&contents)?;

        config.validate()?;

        Ok(config)
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse the host URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_host(&self) -> Result<Url, Error> {
        Url::parse(&self.host)
            .map_err(|e| Error::ConfigError(format!("Invalid Cloud Controller URL: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn test_config_new() {
        let config = CloudControllerConfig::new("https://api.example.com", "token").unwrap();
        assert_eq!(config.host, "https://api.example.com");
        assert_eq!(config.token.expose_secret(), "token");
        assert!(config.tls_verify);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_config_invalid_url() {
        let result = CloudControllerConfig::new("not-a-url", "token");
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_config_builder() {
        let config = CloudControllerConfig::new("https://api.example.com", "token")
            .unwrap()
            .with_tls_verify(false)
            .with_timeout(45);

        assert!(!config.tls_verify);
        assert_eq!(config.timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_config_parse_host() {
        let config = CloudControllerConfig::new("https://api.example.com:8443", "t").unwrap();
        let url = config.parse_host().unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("api.example.com"));
        assert_eq!(url.port(), Some(8443));
    }

    #[test]
    fn test_config_validation_timeout_range() {
        let mut config = CloudControllerConfig::new("https://api.example.com", "t").unwrap();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.request_timeout_secs = 301;
        assert!(config.validate().is_err());

        config.request_timeout_secs = 30;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_token_not_serialized() {
        let config = CloudControllerConfig::new("https://api.example.com", "s3cret").unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(!format!("{config:?}").contains("s3cret"));
    }

    #[test]
    fn test_config_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host: https://api.sys.example.com").unwrap();
        writeln!(file, "token: abc123").unwrap();
        writeln!(file, "tls_verify: false").unwrap();

        let config = CloudControllerConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.host, "https://api.sys.example.com");
        assert_eq!(config.token.expose_secret(), "abc123");
        assert!(!config.tls_verify);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_config_from_yaml_file_rejects_out_of_range_timeout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host: https://api.sys.example.com").unwrap();
        writeln!(file, "token: abc123").unwrap();
        writeln!(file, "request_timeout_secs: 0").unwrap();

        let result = CloudControllerConfig::from_yaml_file(file.path());
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_config_from_missing_file() {
        let result = CloudControllerConfig::from_yaml_file("/nonexistent/cf.yml");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}
