//! LDAP directory client for Cloud Foundry management.
//!
//! This crate resolves users and group memberships against an LDAP directory so they
//! can be mapped onto Cloud Foundry org and space roles.

#![deny(missing_docs)]

mod client;
mod config;
mod dn;
mod user;

pub use client::{escape_filter_value, LdapClient};
pub use config::{
    LdapConfig, CONFIG_FILE_NAME, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_LDAP_PORT,
    DEFAULT_OPERATION_TIMEOUT_SECS,
};
pub use dn::{leading_rdn, DistinguishedName, DistinguishedNameError, RelativeDistinguishedName};
pub use user::DirectoryUser;

/// Convenient result alias that reuses the core error type.
pub type Result<T> = cfmgmt_core::Result<T>;
