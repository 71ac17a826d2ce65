//! # cfmgmt-core
//!
//! Core types and utilities shared by the Cloud Foundry management clients.
//!
//! This crate provides the error type, HTTP client settings and strongly-typed
//! identifiers used by the Cloud Controller and LDAP directory clients.
//!
//! ## Modules
//!
//! - [`error`] - Error type and HTTP status code mapping
//! - [`guid`] - Strongly-typed GUID wrappers for Cloud Controller resources
//! - [`config`] - Connection configuration for the Cloud Controller
//! - [`client`] - HTTP client settings and timeouts
//! - [`query`] - Query parameter builder

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod guid;
pub mod query;

// Re-export commonly used types
pub use error::{Error, Result};
