pub mod error;

pub use error::{ErrorCategory, NetworkError, ReadinessError, Result};

// =============================================================================
// Domain Newtypes
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Type-safe wrapper for user IDs
    UserId
);

string_id!(
    /// Type-safe wrapper for team IDs
    TeamId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct_types() {
        let user = UserId::new("u-1");
        let team = TeamId::from("t-1");
        assert_eq!(user.as_str(), "u-1");
        assert_eq!(team.to_string(), "t-1");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = UserId::new("u-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"u-42\"");
    }
}
