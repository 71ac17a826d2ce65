//! Asynchronous Cloud Controller v2 client implementation.

use crate::models::{
    AllowSshRequest, AssignOrgQuotaRequest, CreateSpaceRequest, Created, NameRequest, Named,
    Org, QuotaRequest, QuotaSpec, Resource, ResourceList, SecurityGroup, SecurityGroupRequest,
    Space, SpaceQuota, Quota, UsernameRequest,
};
use crate::Result;
use cfmgmt_core::client::ClientConfig;
use cfmgmt_core::config::CloudControllerConfig;
use cfmgmt_core::guid::{OrgGuid, QuotaGuid, SecurityGroupGuid, SpaceGuid, SpaceQuotaGuid};
use cfmgmt_core::query::QueryParams;
use cfmgmt_core::Error;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, ClientBuilder, Method, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("cfmgmt-cloudcontroller/", env!("CARGO_PKG_VERSION"));
const SERVICE_NAME: &str = "Cloud Controller";

/// Builder for [`CloudControllerClient`].
#[derive(Debug)]
pub struct CloudControllerClientBuilder {
    base_url: Url,
    token: Option<SecretString>,
    http_config: ClientConfig,
    tls_verify: bool,
}

impl CloudControllerClientBuilder {
    /// Create a builder for the specified Cloud Controller host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if `host` is not a valid URL.
    pub fn new(host: impl AsRef<str>) -> Result<Self> {
        let mut base_url = Url::parse(host.as_ref())?;
        // Url::join drops the last path segment unless the base ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            token: None,
            http_config: ClientConfig::new(),
            tls_verify: true,
        })
    }

    /// Create a builder from a [`CloudControllerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configured host is not a valid URL.
    pub fn from_config(config: CloudControllerConfig) -> Result<Self> {
        let http_config = ClientConfig::new().with_timeout(config.timeout());
        Ok(Self::new(&config.host)?
            .with_token(config.token)
            .with_http_config(http_config)
            .with_tls_verify(config.tls_verify))
    }

    /// Configure the bearer token sent as the `Authorization` header.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<SecretString>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Enable or disable TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the token is not a valid header value or the
    /// HTTP client cannot be constructed.
    pub fn build(self) -> Result<CloudControllerClient> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&format!("bearer {}", token.expose_secret()))
                .map_err(|err| Error::ConfigError(format!("Invalid bearer token: {err}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(self.http_config.timeout)
            .connect_timeout(self.http_config.connect_timeout)
            .pool_idle_timeout(self.http_config.pool_idle_timeout)
            .pool_max_idle_per_host(self.http_config.pool_max_idle_per_host);

        if !self.tls_verify {
            warn!("TLS verification disabled for Cloud Controller client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(|err| {
            Error::ConfigError(format!("Failed to build Cloud Controller HTTP client: {err}"))
        })?;

        Ok(CloudControllerClient {
            http,
            base_url: self.base_url,
            log_requests: self.http_config.enable_logging,
        })
    }
}

/// Asynchronous Cloud Controller client.
///
/// Every method issues exactly one HTTP request and keeps no state between calls.
#[derive(Debug, Clone)]
pub struct CloudControllerClient {
    http: Client,
    base_url: Url,
    log_requests: bool,
}

impl CloudControllerClient {
    /// Construct a client for `host` authenticating with `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not a valid URL or the token is not a valid
    /// header value.
    pub fn new(host: impl AsRef<str>, token: impl Into<String>) -> Result<Self> {
        CloudControllerClientBuilder::new(host)?
            .with_token(SecretString::from(token.into()))
            .build()
    }

    /// Construct a client from a [`CloudControllerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot produce a working client.
    pub fn from_config(config: CloudControllerConfig) -> Result<Self> {
        CloudControllerClientBuilder::from_config(config)?.build()
    }

    /// Start a builder for `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not a valid URL.
    pub fn builder(host: impl AsRef<str>) -> Result<CloudControllerClientBuilder> {
        CloudControllerClientBuilder::new(host)
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // Organizations

    /// Create an organization and return its GUID.
    pub async fn create_org(&self, name: &str) -> Result<OrgGuid> {
        let created: Created<OrgGuid> = self
            .send_json(Method::POST, "v2/organizations", Some(&NameRequest { name }), &[])
            .await?;
        Ok(created.metadata.guid)
    }

    /// List organizations (first page only).
    pub async fn list_orgs(&self) -> Result<Vec<Org>> {
        let list: ResourceList<Org> = self
            .send_json::<(), _>(Method::GET, "v2/organizations", None, &[])
            .await?;
        Ok(list.resources)
    }

    /// Assign an organization quota definition to an organization.
    pub async fn assign_quota_to_org(&self, org: OrgGuid, quota: QuotaGuid) -> Result<()> {
        let path = format!("v2/organizations/{org}");
        let body = AssignOrgQuotaRequest {
            quota_definition_guid: quota,
        };
        self.send(Method::PUT, &path, Some(&body)).await
    }

    /// Add a user to an organization's user list.
    pub async fn add_user_to_org(&self, username: &str, org: OrgGuid) -> Result<()> {
        let path = format!("v2/organizations/{org}/users");
        self.send(Method::PUT, &path, Some(&UsernameRequest { username }))
            .await
    }

    /// Grant an organization role to a user.
    ///
    /// `role` is used as the final path segment without validation; see
    /// [`OrgRole`](crate::models::OrgRole) for the well-known values.
    pub async fn add_user_to_org_role(
        &self,
        username: &str,
        role: impl AsRef<str>,
        org: OrgGuid,
    ) -> Result<()> {
        let path = format!("v2/organizations/{org}/{}", role.as_ref());
        self.send(Method::PUT, &path, Some(&UsernameRequest { username }))
            .await
    }

    // Spaces

    /// Create a space inside an organization and return its GUID.
    pub async fn create_space(&self, name: &str, org: OrgGuid) -> Result<SpaceGuid> {
        let body = CreateSpaceRequest {
            name,
            organization_guid: org,
        };
        let created: Created<SpaceGuid> = self
            .send_json(Method::POST, "v2/spaces", Some(&body), &[])
            .await?;
        Ok(created.metadata.guid)
    }

    /// List the spaces of an organization (first page only).
    pub async fn list_spaces(&self, org: OrgGuid) -> Result<Vec<Space>> {
        let path = format!("v2/organizations/{org}/spaces");
        let mut params = QueryParams::new();
        params.push("inline-relations-depth", 1);
        let list: ResourceList<Space> = self
            .send_json::<(), _>(Method::GET, &path, None, &params.into_pairs())
            .await?;
        Ok(list.resources)
    }

    /// Enable or disable SSH access for a space.
    pub async fn update_space_ssh(&self, allowed: bool, space: SpaceGuid) -> Result<()> {
        let path = format!("v2/spaces/{space}");
        self.send(Method::PUT, &path, Some(&AllowSshRequest { allow_ssh: allowed }))
            .await
    }

    /// Grant a space role to a user.
    ///
    /// `role` is used as the final path segment without validation; see
    /// [`SpaceRole`](crate::models::SpaceRole) for the well-known values.
    pub async fn add_user_to_space_role(
        &self,
        username: &str,
        role: impl AsRef<str>,
        space: SpaceGuid,
    ) -> Result<()> {
        let path = format!("v2/spaces/{space}/{}", role.as_ref());
        self.send(Method::PUT, &path, Some(&UsernameRequest { username }))
            .await
    }

    // Security groups

    /// List security groups as a name to GUID map.
    ///
    /// When two groups share a name the later one wins.
    pub async fn list_security_groups(&self) -> Result<HashMap<String, SecurityGroupGuid>> {
        let list: ResourceList<SecurityGroup> = self
            .send_json::<(), _>(Method::GET, "v2/security_groups", None, &[])
            .await?;
        Ok(index_by_name(list.resources, "security group"))
    }

    /// Create a security group and return its GUID.
    pub async fn create_security_group(
        &self,
        name: &str,
        rules: &serde_json::Value,
    ) -> Result<SecurityGroupGuid> {
        let body = SecurityGroupRequest { name, rules };
        let created: Created<SecurityGroupGuid> = self
            .send_json(Method::POST, "v2/security_groups", Some(&body), &[])
            .await?;
        Ok(created.metadata.guid)
    }

    /// Create a security group from a raw JSON rules document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeError`] without contacting the server if `rules` is not
    /// valid JSON.
    pub async fn create_security_group_from_str(
        &self,
        name: &str,
        rules: &str,
    ) -> Result<SecurityGroupGuid> {
        let rules: serde_json::Value = serde_json::from_str(rules)?;
        self.create_security_group(name, &rules).await
    }

    /// Replace the name and rules of a security group.
    pub async fn update_security_group(
        &self,
        guid: SecurityGroupGuid,
        name: &str,
        rules: &serde_json::Value,
    ) -> Result<()> {
        let path = format!("v2/security_groups/{guid}");
        self.send(Method::PUT, &path, Some(&SecurityGroupRequest { name, rules }))
            .await
    }

    /// Replace a security group from a raw JSON rules document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeError`] without contacting the server if `rules` is not
    /// valid JSON.
    pub async fn update_security_group_from_str(
        &self,
        guid: SecurityGroupGuid,
        name: &str,
        rules: &str,
    ) -> Result<()> {
        let rules: serde_json::Value = serde_json::from_str(rules)?;
        self.update_security_group(guid, name, &rules).await
    }

    /// Bind a security group to a space.
    pub async fn assign_security_group_to_space(
        &self,
        space: SpaceGuid,
        security_group: SecurityGroupGuid,
    ) -> Result<()> {
        let path = format!("v2/security_groups/{security_group}/spaces/{space}");
        self.send::<()>(Method::PUT, &path, None).await
    }

    // Organization quotas

    /// List organization quota definitions as a name to GUID map.
    ///
    /// When two quotas share a name the later one wins.
    pub async fn list_quotas(&self) -> Result<HashMap<String, QuotaGuid>> {
        let list: ResourceList<Quota> = self
            .send_json::<(), _>(Method::GET, "v2/quota_definitions", None, &[])
            .await?;
        Ok(index_by_name(list.resources, "quota"))
    }

    /// Create an organization quota definition and return its GUID.
    pub async fn create_quota(&self, spec: &QuotaSpec) -> Result<QuotaGuid> {
        let body = QuotaRequest::<QuotaGuid>::new(spec);
        let created: Created<QuotaGuid> = self
            .send_json(Method::POST, "v2/quota_definitions", Some(&body), &[])
            .await?;
        Ok(created.metadata.guid)
    }

    /// Update an organization quota definition.
    pub async fn update_quota(&self, guid: QuotaGuid, spec: &QuotaSpec) -> Result<()> {
        let path = format!("v2/quota_definitions/{guid}");
        let body = QuotaRequest::new(spec).with_guid(guid);
        self.send(Method::PUT, &path, Some(&body)).await
    }

    // Space quotas

    /// List the space quota definitions of an organization as a name to GUID map.
    ///
    /// When two quotas share a name the later one wins.
    pub async fn list_space_quotas(&self, org: OrgGuid) -> Result<HashMap<String, SpaceQuotaGuid>> {
        let path = format!("v2/organizations/{org}/space_quota_definitions");
        let list: ResourceList<SpaceQuota> = self
            .send_json::<(), _>(Method::GET, &path, None, &[])
            .await?;
        Ok(index_by_name(list.resources, "space quota"))
    }

    /// Create a space quota definition owned by `org` and return its GUID.
    pub async fn create_space_quota(&self, org: OrgGuid, spec: &QuotaSpec) -> Result<SpaceQuotaGuid> {
        let body = QuotaRequest::<SpaceQuotaGuid>::new(spec).with_organization(org);
        let created: Created<SpaceQuotaGuid> = self
            .send_json(Method::POST, "v2/space_quota_definitions", Some(&body), &[])
            .await?;
        Ok(created.metadata.guid)
    }

    /// Update a space quota definition owned by `org`.
    pub async fn update_space_quota(
        &self,
        org: OrgGuid,
        guid: SpaceQuotaGuid,
        spec: &QuotaSpec,
    ) -> Result<()> {
        let path = format!("v2/space_quota_definitions/{guid}");
        let body = QuotaRequest::new(spec)
            .with_guid(guid)
            .with_organization(org);
        self.send(Method::PUT, &path, Some(&body)).await
    }

    /// Assign a space quota definition to a space.
    pub async fn assign_quota_to_space(&self, space: SpaceGuid, quota: SpaceQuotaGuid) -> Result<()> {
        let path = format!("v2/space_quota_definitions/{quota}/spaces/{space}");
        self.send::<()>(Method::PUT, &path, None).await
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|err| {
            Error::InvalidEndpoint(format!("Invalid Cloud Controller path `{path}`: {err}"))
        })
    }

    async fn execute<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        params: &[(&'static str, String)],
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.build_url(path)?;
        if self.log_requests {
            debug!(%method, path = %path, ?params, "Sending Cloud Controller request");
        }

        let mut request = self.http.request(method, url);
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(payload) = body {
            request = request.json(payload);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let err = Error::from_status(SERVICE_NAME, status, message);
        if err.should_log() {
            warn!(%status, code = err.error_code(), path = %path, "Cloud Controller request failed");
        }
        Err(err)
    }

    async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.execute(method, path, body, &[]).await.map(|_| ())
    }

    async fn send_json<B, R>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        params: &[(&'static str, String)],
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.execute(method, path, body, params).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| {
            Error::DecodeError(format!(
                "Failed to decode Cloud Controller response for `{path}`: {err}"
            ))
        })
    }
}

fn index_by_name<G, E>(resources: Vec<Resource<G, E>>, kind: &str) -> HashMap<String, G>
where
    G: Copy + Display,
    E: Named,
{
    let mut index = HashMap::with_capacity(resources.len());
    for resource in resources {
        let guid = resource.guid();
        if let Some(previous) = index.insert(resource.name().to_string(), guid) {
            warn!(
                name = %resource.name(),
                %previous,
                current = %guid,
                "duplicate {kind} name; keeping the later GUID"
            );
        }
    }
    index
}
