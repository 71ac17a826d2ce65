//! LDAP directory configuration loaded from `ldap.yml`.

use crate::{dn::DistinguishedName, Result};
use cfmgmt_core::Error;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use validator::Validate;

/// Name of the configuration file inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "ldap.yml";
/// Default LDAP port.
pub const DEFAULT_LDAP_PORT: u16 = 389;
/// Default connection timeout (seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
/// Default operation timeout (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LdapConfigFile {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    ldap_host: String,
    #[serde(default)]
    ldap_port: Option<u16>,
    #[serde(rename = "bindDN", default)]
    bind_dn: String,
    #[serde(rename = "bindPwd", default)]
    bind_password: String,
    #[serde(default)]
    user_search_base: String,
    #[serde(default)]
    user_name_attribute: Option<String>,
    #[serde(default)]
    user_mail_attribute: Option<String>,
    #[serde(default)]
    group_search_base: String,
    #[serde(default)]
    group_attribute: Option<String>,
    #[serde(default)]
    origin: String,
}

/// Connection and schema settings for the LDAP directory.
#[derive(Debug, Validate)]
pub struct LdapConfig {
    enabled: bool,
    #[validate(length(min = 1, message = "ldapHost is required"))]
    host: String,
    #[validate(range(min = 1, message = "ldapPort must be positive"))]
    port: u16,
    #[validate(length(min = 1, message = "bindDN is required"))]
    bind_dn: String,
    bind_password: SecretString,
    #[validate(length(min = 1, message = "userSearchBase is required"))]
    user_search_base: String,
    #[validate(length(min = 1))]
    user_name_attribute: String,
    #[validate(length(min = 1))]
    user_mail_attribute: String,
    #[validate(length(min = 1, message = "groupSearchBase is required"))]
    group_search_base: String,
    #[validate(length(min = 1))]
    group_attribute: String,
    origin: String,
    connection_timeout_secs: u64,
    operation_timeout_secs: u64,
}

impl LdapConfig {
    /// Loads `<config_dir>/ldap.yml`.
    ///
    /// A non-empty `bind_password_override` replaces the password stored in the file.
    /// Enabled configurations are validated before being returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the file is missing, unreadable, malformed or
    /// fails validation.
    pub fn load(config_dir: impl AsRef<Path>, bind_password_override: &str) -> Result<Self> {
        let path = config_dir.as_ref().join(CONFIG_FILE_NAME);
        let contents = std::fs::read_to_string(&path).map_err(|err| {
            Error::ConfigError(format!("Failed to read {}: {err}", path.display()))
        })?;
        debug!(path = %path.display(), "Loaded LDAP configuration");

        let config = Self::from_yaml_str(&contents)?;
        if bind_password_override.is_empty() {
            Ok(config)
        } else {
            Ok(config.with_bind_password(bind_password_override))
        }
    }

    /// Parses the `ldap.yml` document format.
    ///
    /// Missing attribute names fall back to `uid`, `mail` and `member`; a missing port
    /// falls back to 389.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the document is malformed or an enabled
    /// configuration fails validation.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: LdapConfigFile = serde_yaml::from_str(yaml)?;
        let config = Self {
            enabled: file.enabled,
            host: file.ldap_host,
            port: file
                .ldap_port
                .filter(|port| *port != 0)
                .unwrap_or(DEFAULT_LDAP_PORT),
            bind_dn: file.bind_dn,
            bind_password: SecretString::from(file.bind_password),
            user_search_base: file.user_search_base,
            user_name_attribute: non_empty_or(file.user_name_attribute, "uid"),
            user_mail_attribute: non_empty_or(file.user_mail_attribute, "mail"),
            group_search_base: file.group_search_base,
            group_attribute: non_empty_or(file.group_attribute, "member"),
            origin: file.origin,
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        };

        if config.enabled {
            config.check()?;
        }
        Ok(config)
    }

    /// Validates field presence and the search base syntax.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the first problem found.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid LDAP configuration: {e}")))?;

        for base in [&self.user_search_base, &self.group_search_base] {
            DistinguishedName::parse(base).map_err(|e| {
                Error::ConfigError(format!("Invalid LDAP search base `{base}`: {e}"))
            })?;
        }
        Ok(())
    }

    /// Returns true if LDAP integration is switched on.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the directory host name.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the directory port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the connection URL, `ldap://host:port`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("ldap://{}:{}", self.host, self.port)
    }

    /// Returns the DN used for the service bind.
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        &self.bind_dn
    }

    /// Returns the password used for the service bind.
    #[must_use]
    pub const fn bind_password(&self) -> &SecretString {
        &self.bind_password
    }

    /// Returns the base under which users are searched.
    #[must_use]
    pub fn user_search_base(&self) -> &str {
        &self.user_search_base
    }

    /// Returns the attribute holding a user's login.
    #[must_use]
    pub fn user_name_attribute(&self) -> &str {
        &self.user_name_attribute
    }

    /// Returns the attribute holding a user's mail address.
    #[must_use]
    pub fn user_mail_attribute(&self) -> &str {
        &self.user_mail_attribute
    }

    /// Returns the base under which groups are searched.
    #[must_use]
    pub fn group_search_base(&self) -> &str {
        &self.group_search_base
    }

    /// Returns the group attribute listing member DNs.
    #[must_use]
    pub fn group_attribute(&self) -> &str {
        &self.group_attribute
    }

    /// Returns the identity provider origin name users are created with.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the connection timeout duration.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Returns the operation timeout duration.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Replaces the bind password.
    #[must_use]
    pub fn with_bind_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = SecretString::from(password.into());
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }

    /// Overrides the operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const SAMPLE: &str = r"
enabled: true
ldapHost: 127.0.0.1
ldapPort: 389
bindDN: cn=admin,dc=pivotal,dc=org
bindPwd: password
userSearchBase: ou=users,dc=pivotal,dc=org
userNameAttribute: uid
userMailAttribute: mail
groupSearchBase: ou=groups,dc=pivotal,dc=org
groupAttribute: member
";

    #[test]
    fn parses_all_keys() {
        let config = LdapConfig::from_yaml_str(SAMPLE).unwrap();
        assert!(config.enabled());
        assert_eq!(config.url(), "ldap://127.0.0.1:389");
        assert_eq!(config.bind_dn(), "cn=admin,dc=pivotal,dc=org");
        assert_eq!(config.bind_password().expose_secret(), "password");
        assert_eq!(config.user_search_base(), "ou=users,dc=pivotal,dc=org");
        assert_eq!(config.group_search_base(), "ou=groups,dc=pivotal,dc=org");
        assert_eq!(config.group_attribute(), "member");
        assert_eq!(config.operation_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn applies_defaults() {
        let config = LdapConfig::from_yaml_str(
            "enabled: true\nldapHost: ldap.example.com\nbindDN: cn=admin,dc=example,dc=com\n\
             userSearchBase: ou=people,dc=example,dc=com\ngroupSearchBase: ou=groups,dc=example,dc=com\n",
        )
        .unwrap();
        assert_eq!(config.port(), DEFAULT_LDAP_PORT);
        assert_eq!(config.user_name_attribute(), "uid");
        assert_eq!(config.user_mail_attribute(), "mail");
        assert_eq!(config.group_attribute(), "member");
        assert_eq!(config.origin(), "");
    }

    #[test]
    fn disabled_config_skips_validation() {
        let config = LdapConfig::from_yaml_str("enabled: false\n").unwrap();
        assert!(!config.enabled());
        assert!(config.check().is_err());
    }

    #[test]
    fn enabled_config_requires_host() {
        let yaml = SAMPLE.replace("ldapHost: 127.0.0.1", "ldapHost: \"\"");
        let err = LdapConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn enabled_config_rejects_malformed_search_base() {
        let yaml = SAMPLE.replace("ou=groups,dc=pivotal,dc=org", "groups,");
        let err = LdapConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, Error::ConfigError(msg) if msg.contains("search base")));
    }

    #[test]
    fn malformed_yaml_is_config_error() {
        let err = LdapConfig::from_yaml_str("enabled: [").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn password_is_redacted_in_debug() {
        let config = LdapConfig::from_yaml_str(SAMPLE)
            .unwrap()
            .with_bind_password("hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
