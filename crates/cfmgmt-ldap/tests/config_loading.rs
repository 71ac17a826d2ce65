//! Integration tests for loading `ldap.yml` from a configuration directory.

use cfmgmt_core::Error;
use cfmgmt_ldap::{LdapConfig, DEFAULT_LDAP_PORT};
use secrecy::ExposeSecret;
use std::path::PathBuf;

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

#[test]
fn test_valid_config_is_enabled() {
    let config = LdapConfig::load(fixtures_dir().join("config"), "")
        .unwrap_or_else(|e| panic!("Failed to load fixture config: {e}"));

    assert!(config.enabled());
    assert_eq!(config.host(), "127.0.0.1");
    assert_eq!(config.port(), DEFAULT_LDAP_PORT);
    assert_eq!(config.url(), "ldap://127.0.0.1:389");
    assert_eq!(config.bind_dn(), "cn=admin,dc=pivotal,dc=org");
    assert_eq!(config.bind_password().expose_secret(), "password");
    assert_eq!(config.user_search_base(), "ou=users,dc=pivotal,dc=org");
    assert_eq!(config.user_name_attribute(), "uid");
    assert_eq!(config.user_mail_attribute(), "mail");
    assert_eq!(config.group_search_base(), "ou=groups,dc=pivotal,dc=org");
    assert_eq!(config.group_attribute(), "member");
    assert_eq!(config.origin(), "ldap");
}

#[test]
fn test_bind_password_override() {
    let config = LdapConfig::load(fixtures_dir().join("config"), "test").unwrap();
    assert_eq!(config.bind_password().expose_secret(), "test");
}

#[test]
fn test_missing_config_dir_is_error() {
    let result = LdapConfig::load(fixtures_dir().join("blah"), "test");
    assert!(matches!(result, Err(Error::ConfigError(_))));
}

#[test]
fn test_disabled_config_loads_without_settings() {
    let config = LdapConfig::load(fixtures_dir().join("disabled"), "").unwrap();
    assert!(!config.enabled());
    assert_eq!(config.host(), "");
}
