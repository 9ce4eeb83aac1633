//! Session-related types.
//!
//! Types stored in the session for authentication state and notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use samaan_kinam_core::{Email, Role, UserId};

/// Session-stored user identity.
///
/// Written only by a successful login; cleared on logout or when the backend
/// rejects the stored token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Backend user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email the user signed in with.
    pub email: Email,
    /// Role assigned by the backend.
    pub role: Role,
    /// When the login completed.
    pub signed_in_at: DateTime<Utc>,
}

impl CurrentUser {
    /// Name for greetings, falling back to the email's local part.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.email.local_part()
        } else {
            &self.name
        }
    }

    /// Whether the user may use the product-management pages.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Severity of a [`Flash`] notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    /// CSS class suffix for templates.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

/// A one-shot notification shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Bearer token issued by the backend. The only persisted credential.
    pub const TOKEN: &str = "token";

    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the purchase cart.
    pub const CART: &str = "purchase_cart";

    /// Order snapshot taken when the payment widget was opened.
    pub const PENDING_ORDER: &str = "pending_order";

    /// Key for the pending notification.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(name: &str) -> CurrentUser {
        CurrentUser {
            id: UserId::new("u1"),
            name: name.to_string(),
            email: Email::parse("sita@example.com").unwrap(),
            role: Role::User,
            signed_in_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        assert_eq!(user("Sita").display_name(), "Sita");
        assert_eq!(user("  ").display_name(), "sita");
    }

    #[test]
    fn test_flash_round_trips_through_json() {
        let flash = Flash::error("Payment failed!");
        let json = serde_json::to_value(&flash).unwrap();
        assert_eq!(json["level"], "error");
        let back: Flash = serde_json::from_value(json).unwrap();
        assert_eq!(back, flash);
    }
}
