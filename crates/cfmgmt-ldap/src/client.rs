//! LDAP directory client implementation.

use crate::{config::LdapConfig, dn::leading_rdn, user::DirectoryUser, Result};
use async_trait::async_trait;
use cfmgmt_core::error::Error;
use ldap3::{LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, warn};

const SERVICE: &str = "ldap";

/// LDAP entry representation used by the client.
#[derive(Debug, Clone, Default)]
pub struct LdapEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map (values preserved order from server).
    pub attributes: HashMap<String, Vec<String>>,
}

impl LdapEntry {
    /// Returns the first value of the attribute if present.
    ///
    /// Attribute names are matched case-insensitively.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.values(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns all values for the attribute.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
            .map(|(_, values)| values.as_slice())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapSession: Send {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;
    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: Vec<String>,
    ) -> Result<Vec<LdapEntry>>;
    async fn unbind(&mut self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LdapSession>>;
}

/// Directory client with pluggable LDAP backend.
///
/// Each public call opens its own connection, binds with the configured service
/// account, runs its searches and unbinds. Nothing is cached between calls.
pub struct LdapClient {
    config: Arc<LdapConfig>,
    connector: Box<dyn LdapConnector>,
}

impl LdapClient {
    /// Creates a directory client that uses the real LDAP connector.
    #[must_use]
    pub fn new(config: LdapConfig) -> Self {
        let config = Arc::new(config);
        let connector: Box<dyn LdapConnector> = Box::new(RealLdapConnector::new(config.clone()));
        Self { config, connector }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_connector(config: LdapConfig, connector: Box<dyn LdapConnector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
        }
    }

    /// Returns the configuration the client was built with.
    #[must_use]
    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    /// Looks up a person entry by login.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] unless exactly one entry matches.
    pub async fn resolve_user(&self, user_id: &str) -> Result<DirectoryUser> {
        let mut session = self.service_session().await?;
        let result = self.lookup_user(&mut *session, user_id).await;
        self.close_session(session).await;
        result
    }

    /// Looks up a user by distinguished name.
    ///
    /// The leading RDN is split off the user search base and searched for as a single
    /// `attr=value` filter, so DNs whose value holds an unescaped comma still resolve.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] unless exactly one entry matches, or
    /// [`Error::InvalidRequest`] if the DN is malformed.
    pub async fn resolve_user_by_dn(&self, user_dn: &str) -> Result<DirectoryUser> {
        let mut session = self.service_session().await?;
        let result = self.lookup_user_by_dn(&mut *session, user_dn).await;
        self.close_session(session).await;
        result
    }

    /// Resolves the members of every group named `group_name`.
    ///
    /// Members that cannot be resolved are logged and skipped. A group that does not
    /// exist yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, bind or a search fails.
    pub async fn resolve_group_members(&self, group_name: &str) -> Result<Vec<DirectoryUser>> {
        let mut session = self.service_session().await?;
        let result = self.lookup_group_members(&mut *session, group_name).await;
        self.close_session(session).await;
        result
    }

    async fn service_session(&self) -> Result<Box<dyn LdapSession>> {
        let mut session = self.connector.connect().await?;
        self.execute_with_timeout(session.simple_bind(
            self.config.bind_dn(),
            self.config.bind_password().expose_secret(),
        ))
        .await?;
        Ok(session)
    }

    async fn close_session(&self, mut session: Box<dyn LdapSession>) {
        if let Err(err) = self.execute_with_timeout(session.unbind()).await {
            warn!(code = err.error_code(), "LDAP unbind failed: {err}");
        }
    }

    async fn lookup_user(
        &self,
        session: &mut dyn LdapSession,
        user_id: &str,
    ) -> Result<DirectoryUser> {
        let filter = format!(
            "(&(objectclass=person)({}={}))",
            self.config.user_name_attribute(),
            escape_filter_value(user_id)
        );
        let entries = self.search_users(session, &filter).await?;
        self.single_user(entries, || format!("user `{user_id}`"))
    }

    async fn lookup_user_by_dn(
        &self,
        session: &mut dyn LdapSession,
        user_dn: &str,
    ) -> Result<DirectoryUser> {
        let rdn = leading_rdn(user_dn, self.config.user_search_base())?;
        let filter = format!("({}={})", rdn.attribute(), escape_filter_value(rdn.value()));
        let entries = self.search_users(session, &filter).await?;
        self.single_user(entries, || format!("user DN `{user_dn}`"))
    }

    async fn lookup_group_members(
        &self,
        session: &mut dyn LdapSession,
        group_name: &str,
    ) -> Result<Vec<DirectoryUser>> {
        let filter = format!("(cn={})", escape_filter_value(group_name));
        debug!(filter = %filter, "Searching LDAP groups");
        let groups = self
            .execute_with_timeout(session.search(
                self.config.group_search_base(),
                &filter,
                vec![self.config.group_attribute().to_string()],
            ))
            .await?;

        let mut users = Vec::new();
        for group in &groups {
            let members = group
                .values(self.config.group_attribute())
                .unwrap_or_default();
            for member_dn in members {
                match self.lookup_user_by_dn(session, member_dn).await {
                    Ok(user) => users.push(user),
                    Err(err @ (Error::NotFound(_) | Error::InvalidRequest(_))) => {
                        warn!(group = %group_name, member = %member_dn, "Skipping group member: {err}");
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Ok(users)
    }

    async fn search_users(
        &self,
        session: &mut dyn LdapSession,
        filter: &str,
    ) -> Result<Vec<LdapEntry>> {
        debug!(filter = %filter, "Searching LDAP users");
        self.execute_with_timeout(session.search(
            self.config.user_search_base(),
            filter,
            vec![
                self.config.user_name_attribute().to_string(),
                self.config.user_mail_attribute().to_string(),
            ],
        ))
        .await
    }

    fn single_user(
        &self,
        entries: Vec<LdapEntry>,
        describe: impl FnOnce() -> String,
    ) -> Result<DirectoryUser> {
        match entries.as_slice() {
            [entry] => parse_user_entry(entry, &self.config),
            [] => Err(Error::NotFound(format!("{} not found in LDAP", describe()))),
            many => Err(Error::NotFound(format!(
                "{} matched {} LDAP entries",
                describe(),
                many.len()
            ))),
        }
    }

    async fn execute_with_timeout<F, T>(&self, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        timeout(self.config.operation_timeout(), fut)
            .await
            .map_err(|_| Error::Timeout("LDAP operation timed out".to_string()))?
    }
}

/// Real LDAP connector backed by `ldap3`.
pub struct RealLdapConnector {
    config: Arc<LdapConfig>,
}

impl RealLdapConnector {
    /// Creates a new connector instance.
    #[must_use]
    pub fn new(config: Arc<LdapConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.config.connection_timeout());
        let url = self.config.url();
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(map_ldap_error)?;
        ldap3::drive!(conn);
        Ok(Box::new(RealLdapSession { inner: ldap }))
    }
}

struct RealLdapSession {
    inner: ldap3::Ldap,
}

#[async_trait]
impl LdapSession for RealLdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        self.inner
            .simple_bind(dn, password)
            .await
            .map_err(map_ldap_error)?
            .success()
            .map_err(map_ldap_error)?;
        Ok(())
    }

    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: Vec<String>,
    ) -> Result<Vec<LdapEntry>> {
        let result = self
            .inner
            .search(base_dn, Scope::Subtree, filter, attributes)
            .await
            .map_err(map_ldap_error)?;
        let (entries, _) = result.success().map_err(map_ldap_error)?;
        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| LdapEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }

    async fn unbind(&mut self) -> Result<()> {
        self.inner.unbind().await.map_err(map_ldap_error)
    }
}

fn map_ldap_error(err: ldap3::LdapError) -> Error {
    Error::ExternalServiceError {
        service: SERVICE.to_string(),
        message: err.to_string(),
    }
}

fn parse_user_entry(entry: &LdapEntry, config: &LdapConfig) -> Result<DirectoryUser> {
    let user_id = entry
        .first(config.user_name_attribute())
        .ok_or_else(|| missing_attribute(&entry.dn, config.user_name_attribute()))?;

    let mut user = DirectoryUser::new(user_id, entry.dn.clone());
    if let Some(email) = entry.first(config.user_mail_attribute()) {
        user = user.with_email(email);
    }
    Ok(user)
}

fn missing_attribute(dn: &str, attribute: &str) -> Error {
    Error::InvalidRequest(format!("LDAP entry `{dn}` missing attribute `{attribute}`"))
}

/// Escapes a value for use inside an LDAP search filter.
///
/// `\`, `*`, `(`, `)`, `,` and NUL are replaced by their `\xx` hex forms.
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\5c"),
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            ',' => escaped.push_str("\\2c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
