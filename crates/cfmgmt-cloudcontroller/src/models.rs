//! Cloud Controller v2 models and request payloads.
//!
//! Responses share a `{ "metadata": {...}, "entity": {...} }` resource shape wrapped in a
//! paged list envelope. Request bodies are plain structs serialized with `serde_json`, so
//! names containing quotes or backslashes always produce valid JSON.

use cfmgmt_core::guid::{OrgGuid, QuotaGuid, SecurityGroupGuid, SpaceGuid, SpaceQuotaGuid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resource metadata common to every Cloud Controller entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata<G> {
    /// Resource GUID.
    pub guid: G,
    /// Relative API URL of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A single Cloud Controller resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource<G, E> {
    /// Resource metadata.
    pub metadata: Metadata<G>,
    /// Resource body.
    pub entity: E,
}

impl<G: Copy, E> Resource<G, E> {
    /// Returns the resource GUID.
    #[must_use]
    pub fn guid(&self) -> G {
        self.metadata.guid
    }
}

/// Envelope returned by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceList<T> {
    /// Total number of results across all pages.
    #[serde(default)]
    pub total_results: u64,
    /// Total number of pages.
    #[serde(default)]
    pub total_pages: u64,
    /// URL of the next page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_url: Option<String>,
    /// Resources on this page.
    #[serde(default = "Vec::new")]
    pub resources: Vec<T>,
}

/// Response to a create call; only the metadata is of interest.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Created<G> {
    pub(crate) metadata: Metadata<G>,
}

/// Entities that carry a unique-ish display name.
pub trait Named {
    /// Returns the entity name.
    fn name(&self) -> &str;
}

/// Organization body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrgEntity {
    /// Organization name.
    pub name: String,
    /// Organization status (`active`, `suspended`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Assigned quota definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_definition_guid: Option<QuotaGuid>,
    /// Whether billing is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_enabled: Option<bool>,
}

/// Space body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpaceEntity {
    /// Space name.
    pub name: String,
    /// Owning organization.
    pub organization_guid: OrgGuid,
    /// Whether SSH access to applications is allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_ssh: Option<bool>,
    /// Assigned space quota definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_quota_definition_guid: Option<SpaceQuotaGuid>,
}

/// Quota definition body, shared by org-level and space-level quotas.
///
/// Limits of `-1` mean unlimited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotaEntity {
    /// Quota name.
    pub name: String,
    /// Total memory limit (MB).
    #[serde(default)]
    pub memory_limit: i64,
    /// Per-instance memory limit (MB).
    #[serde(default)]
    pub instance_memory_limit: i64,
    /// Maximum routes.
    #[serde(default)]
    pub total_routes: i64,
    /// Maximum service instances.
    #[serde(default)]
    pub total_services: i64,
    /// Whether paid service plans may be used.
    #[serde(default)]
    pub non_basic_services_allowed: bool,
    /// Owning organization (space quotas only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_guid: Option<OrgGuid>,
}

/// Security group body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityGroupEntity {
    /// Security group name.
    pub name: String,
    /// Egress rules, kept as opaque JSON.
    #[serde(default)]
    pub rules: serde_json::Value,
    /// Applied to all running applications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_default: Option<bool>,
    /// Applied to all staging applications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_default: Option<bool>,
}

impl Named for OrgEntity {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for SpaceEntity {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for QuotaEntity {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for SecurityGroupEntity {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Organization resource.
pub type Org = Resource<OrgGuid, OrgEntity>;
/// Space resource.
pub type Space = Resource<SpaceGuid, SpaceEntity>;
/// Organization quota definition resource.
pub type Quota = Resource<QuotaGuid, QuotaEntity>;
/// Space quota definition resource.
pub type SpaceQuota = Resource<SpaceQuotaGuid, QuotaEntity>;
/// Security group resource.
pub type SecurityGroup = Resource<SecurityGroupGuid, SecurityGroupEntity>;

impl<G, E: Named> Resource<G, E> {
    /// Returns the resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.entity.name()
    }
}

impl Space {
    /// Returns the owning organization GUID.
    #[must_use]
    pub fn organization_guid(&self) -> OrgGuid {
        self.entity.organization_guid
    }
}

/// Well-known organization role path segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrgRole {
    /// Org users.
    Users,
    /// Org managers.
    Managers,
    /// Org billing managers.
    BillingManagers,
    /// Org auditors.
    Auditors,
}

impl OrgRole {
    /// Returns the path segment for this role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Managers => "managers",
            Self::BillingManagers => "billing_managers",
            Self::Auditors => "auditors",
        }
    }
}

impl AsRef<str> for OrgRole {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Well-known space role path segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpaceRole {
    /// Space developers.
    Developers,
    /// Space managers.
    Managers,
    /// Space auditors.
    Auditors,
}

impl SpaceRole {
    /// Returns the path segment for this role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Developers => "developers",
            Self::Managers => "managers",
            Self::Auditors => "auditors",
        }
    }
}

impl AsRef<str> for SpaceRole {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Limits used to create or update a quota definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaSpec {
    /// Quota name.
    pub name: String,
    /// Total memory limit (MB).
    pub memory_limit: i64,
    /// Per-instance memory limit (MB), `-1` for unlimited.
    pub instance_memory_limit: i64,
    /// Maximum routes, `-1` for unlimited.
    pub total_routes: i64,
    /// Maximum service instances, `-1` for unlimited.
    pub total_services: i64,
    /// Whether paid service plans may be used.
    pub paid_service_plans_allowed: bool,
}

impl QuotaSpec {
    /// Creates quota limits using the Cloud Controller defaults.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            memory_limit: 10_240,
            instance_memory_limit: -1,
            total_routes: 1000,
            total_services: -1,
            paid_service_plans_allowed: true,
        }
    }

    /// Sets the total memory limit.
    #[must_use]
    pub const fn with_memory_limit(mut self, mb: i64) -> Self {
        self.memory_limit = mb;
        self
    }

    /// Sets the per-instance memory limit.
    #[must_use]
    pub const fn with_instance_memory_limit(mut self, mb: i64) -> Self {
        self.instance_memory_limit = mb;
        self
    }

    /// Sets the route limit.
    #[must_use]
    pub const fn with_total_routes(mut self, routes: i64) -> Self {
        self.total_routes = routes;
        self
    }

    /// Sets the service instance limit.
    #[must_use]
    pub const fn with_total_services(mut self, services: i64) -> Self {
        self.total_services = services;
        self
    }

    /// Allows or forbids paid service plans.
    #[must_use]
    pub const fn with_paid_service_plans(mut self, allowed: bool) -> Self {
        self.paid_service_plans_allowed = allowed;
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NameRequest<'a> {
    pub(crate) name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateSpaceRequest<'a> {
    pub(crate) name: &'a str,
    pub(crate) organization_guid: OrgGuid,
}

#[derive(Debug, Serialize)]
pub(crate) struct UsernameRequest<'a> {
    pub(crate) username: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct AllowSshRequest {
    pub(crate) allow_ssh: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignOrgQuotaRequest {
    pub(crate) quota_definition_guid: QuotaGuid,
}

#[derive(Debug, Serialize)]
pub(crate) struct SecurityGroupRequest<'a> {
    pub(crate) name: &'a str,
    pub(crate) rules: &'a serde_json::Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuotaRequest<'a, G> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) guid: Option<G>,
    pub(crate) name: &'a str,
    pub(crate) memory_limit: i64,
    pub(crate) instance_memory_limit: i64,
    pub(crate) total_routes: i64,
    pub(crate) total_services: i64,
    pub(crate) non_basic_services_allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) organization_guid: Option<OrgGuid>,
}

impl<'a, G> QuotaRequest<'a, G> {
    pub(crate) fn new(spec: &'a QuotaSpec) -> Self {
        Self {
            guid: None,
            name: &spec.name,
            memory_limit: spec.memory_limit,
            instance_memory_limit: spec.instance_memory_limit,
            total_routes: spec.total_routes,
            total_services: spec.total_services,
            non_basic_services_allowed: spec.paid_service_plans_allowed,
            organization_guid: None,
        }
    }

    pub(crate) fn with_guid(mut self, guid: G) -> Self {
        self.guid = Some(guid);
        self
    }

    pub(crate) fn with_organization(mut self, org: OrgGuid) -> Self {
        self.organization_guid = Some(org);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ORG: &str = "7a1f3b72-6d29-4a4e-9d1c-5f0a2b8c9e11";

    #[test]
    fn deserialize_space_list() {
        let body = json!({
            "total_results": 1,
            "total_pages": 1,
            "next_url": null,
            "resources": [{
                "metadata": {
                    "guid": "3c0f1a8e-2b4d-4f6a-8c9e-1d2f3a4b5c6d",
                    "url": "/v2/spaces/3c0f1a8e-2b4d-4f6a-8c9e-1d2f3a4b5c6d",
                    "created_at": "2016-06-08T16:41:33Z",
                    "updated_at": null
                },
                "entity": {
                    "name": "dev",
                    "organization_guid": ORG,
                    "allow_ssh": true,
                    "space_quota_definition_guid": null
                }
            }]
        });

        let list: ResourceList<Space> = serde_json::from_value(body).unwrap();
        assert_eq!(list.total_results, 1);
        assert!(list.next_url.is_none());
        let space = &list.resources[0];
        assert_eq!(space.name(), "dev");
        assert_eq!(space.organization_guid().to_string(), ORG);
        assert_eq!(space.entity.allow_ssh, Some(true));
        assert!(space.metadata.created_at.is_some());
    }

    #[test]
    fn deserialize_empty_list_without_resources_key() {
        let list: ResourceList<Org> = serde_json::from_value(json!({})).unwrap();
        assert!(list.resources.is_empty());
    }

    #[test]
    fn quota_request_carries_exact_fields() {
        let spec = QuotaSpec::new("small")
            .with_memory_limit(2048)
            .with_instance_memory_limit(512)
            .with_total_routes(10)
            .with_total_services(-1)
            .with_paid_service_plans(false);
        let org = OrgGuid::parse_str(ORG).unwrap();
        let guid = SpaceQuotaGuid::parse_str("0d5c0a6e-57a3-4c8b-b2f1-7e6d5c4b3a29").unwrap();

        let body = serde_json::to_value(
            QuotaRequest::new(&spec)
                .with_guid(guid)
                .with_organization(org),
        )
        .unwrap();

        assert_eq!(
            body,
            json!({
                "guid": "0d5c0a6e-57a3-4c8b-b2f1-7e6d5c4b3a29",
                "name": "small",
                "memory_limit": 2048,
                "instance_memory_limit": 512,
                "total_routes": 10,
                "total_services": -1,
                "non_basic_services_allowed": false,
                "organization_guid": ORG
            })
        );
    }

    #[test]
    fn create_request_escapes_names() {
        let body = serde_json::to_string(&NameRequest {
            name: r#"my "quoted" \ org"#,
        })
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed, json!({ "name": "my \"quoted\" \\ org" }));
    }

    #[test]
    fn role_segments() {
        assert_eq!(OrgRole::BillingManagers.as_str(), "billing_managers");
        assert_eq!(OrgRole::Users.as_ref(), "users");
        assert_eq!(SpaceRole::Developers.as_str(), "developers");
    }
}
