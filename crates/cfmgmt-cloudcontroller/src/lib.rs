//! Cloud Controller v2 client for Cloud Foundry management.
//!
//! This crate provides typed models and an asynchronous client for the organization,
//! space, quota, security group and role endpoints of the Cloud Controller API.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{CloudControllerClient, CloudControllerClientBuilder};
pub use models::{
    Metadata, Named, Org, OrgEntity, OrgRole, Quota, QuotaEntity, QuotaSpec, Resource,
    ResourceList, SecurityGroup, SecurityGroupEntity, Space, SpaceEntity, SpaceQuota, SpaceRole,
};

/// Convenient result alias that reuses the shared management error type.
pub type Result<T> = cfmgmt_core::Result<T>;
