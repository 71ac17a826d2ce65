//! Strongly-typed GUID wrappers for Cloud Controller resources.
//!
//! Every resource created through the Cloud Controller is identified by a GUID. Wrapping
//! each kind in its own type keeps an org GUID from being passed where a space GUID is
//! expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Macro to generate strongly-typed GUID wrapper types.
macro_rules! guid_type {
    ($(#[$meta:meta])* $name:ident, $doc:expr) => {
        $(#[$meta])*
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new GUID wrapper from a [`Uuid`].
            #[must_use]
            pub const fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Creates a new random GUID (v4).
            #[must_use]
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the inner [`Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parses a GUID from a string.
            ///
            /// # Errors
            ///
            /// Returns an error if the string is not a valid GUID.
            pub fn parse_str(input: &str) -> Result<Self> {
                Uuid::parse_str(input)
                    .map(Self)
                    .map_err(|_| Error::InvalidGuid(input.to_string()))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(wrapper: $name) -> Self {
                wrapper.0
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse_str(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

guid_type!(OrgGuid, "Organization GUID");
guid_type!(SpaceGuid, "Space GUID");
guid_type!(QuotaGuid, "Organization quota definition GUID");
guid_type!(SpaceQuotaGuid, "Space quota definition GUID");
guid_type!(SecurityGroupGuid, "Security group GUID");
