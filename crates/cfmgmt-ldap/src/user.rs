//! Directory user record.

use serde::{Deserialize, Serialize};

/// A user resolved from the directory.
///
/// Records are plain values; the directory is queried again on every lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// Login identifier, read from the configured user name attribute.
    pub user_id: String,
    /// Distinguished name of the user entry.
    pub user_dn: String,
    /// Mail address, read from the configured mail attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl DirectoryUser {
    /// Creates a user record without a mail address.
    #[must_use]
    pub fn new(user_id: impl Into<String>, user_dn: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_dn: user_dn.into(),
            email: None,
        }
    }

    /// Sets the mail address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Returns the mail address if the entry carried one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_email() {
        let user = DirectoryUser::new("cwashburn", "cn=cwashburn,ou=users,dc=pivotal,dc=org")
            .with_email("cwashburn+cfmt@testdomain.com");
        assert_eq!(user.user_id, "cwashburn");
        assert_eq!(user.email(), Some("cwashburn+cfmt@testdomain.com"));
    }

    #[test]
    fn missing_email_is_none() {
        let user = DirectoryUser::new("jdoe", "cn=jdoe,ou=users,dc=pivotal,dc=org");
        assert!(user.email().is_none());
    }
}
