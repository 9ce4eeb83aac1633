//! User roles assigned by the backend.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Role of an authenticated user.
///
/// Unknown role strings are preserved rather than rejected, so a backend that
/// introduces a new role does not break sign-in. A missing or null role is
/// never promoted to a known one; it becomes an empty [`Role::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// Regular customer.
    User,
    /// Store administrator.
    Admin,
    /// Any role this storefront does not know about.
    Other(String),
}

impl Role {
    /// Parse a backend role string. Never fails.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "user" => Self::User,
            "admin" => Self::Admin,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Role of a user the backend sent without one.
    #[must_use]
    pub const fn unassigned() -> Self {
        Self::Other(String::new())
    }

    /// The backend's string for this role.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Other(other) => other,
        }
    }

    /// Whether this role may manage products.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.map_or_else(Self::unassigned, |value| Self::parse(&value)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_roles() {
        assert_eq!(Role::parse("user"), Role::User);
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert!(Role::Admin.is_admin());
        assert!(!Role::User.is_admin());
    }

    #[test]
    fn test_unknown_role_is_kept() {
        let role: Role = serde_json::from_str("\"vendor\"").unwrap();
        assert_eq!(role, Role::Other("vendor".to_string()));
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"vendor\"");
    }

    #[test]
    fn test_null_role_is_unassigned() {
        let role: Role = serde_json::from_str("null").unwrap();
        assert_eq!(role, Role::unassigned());
        assert!(!role.is_admin());
        assert_ne!(role, Role::User);
    }
}
