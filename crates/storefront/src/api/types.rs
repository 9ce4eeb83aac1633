//! Request and response bodies exchanged with the backend.
//!
//! Response types are lenient: optional fields default, and document ids are
//! accepted as either `id` or `_id`.

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use samaan_kinam_core::{PaymentStatus, Price, ProductId, ReviewId, Role, UserId};
use serde::{Deserialize, Serialize};

use super::ApiError;

// =============================================================================
// Users
// =============================================================================

/// Body of `POST /users/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(rename = "recaptchaToken")]
    pub recaptcha_token: &'a str,
}

/// Successful login: a bearer token and the signed-in user.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: ApiUser,
}

/// Body of `POST /users/register`.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// A user as the backend describes it.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    #[serde(alias = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "Role::unassigned")]
    pub role: Role,
    /// Uploaded profile picture file name.
    #[serde(default, alias = "photo")]
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PasswordChangeCheck {
    #[serde(default)]
    pub message: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct ChangeNameRequest<'a> {
    #[serde(rename = "newName")]
    pub new_name: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct ChangePasswordRequest<'a> {
    #[serde(rename = "newPassword")]
    pub new_password: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct LockAccountRequest<'a> {
    pub email: &'a str,
}

/// A past purchase returned by `GET /purchase`.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRecord {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub items: Vec<PurchasedItem>,
    #[serde(default)]
    pub payment: PaymentStatus,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One line of a past purchase.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchasedItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub quantity: u32,
}

impl PurchasedItem {
    /// Unit price × quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        Price::new(self.price.amount() * rust_decimal::Decimal::from(self.quantity))
    }
}

// =============================================================================
// Products
// =============================================================================

/// A catalogue product.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiProduct {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub category: Option<String>,
    /// Units in stock, when the backend tracks them.
    #[serde(default, alias = "quantity")]
    pub stock: Option<u32>,
    /// Uploaded picture file name.
    #[serde(default)]
    pub picture: Option<String>,
}

/// Body of the admin product create/edit calls.
#[derive(Debug, Clone, Serialize)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category: String,
    pub quantity: u32,
}

/// A product review.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiReview {
    #[serde(alias = "_id")]
    pub id: ReviewId,
    /// Reviewer display name.
    #[serde(default, alias = "userName")]
    pub name: Option<String>,
    #[serde(default, alias = "userId")]
    pub user: Option<UserId>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub comment: String,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of the review create/update calls.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewInput {
    pub rating: u8,
    pub comment: String,
}

// =============================================================================
// Uploads
// =============================================================================

/// An image file to upload as the multipart field `photo`.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub(super) fn into_form(self) -> Result<Form, ApiError> {
        let mut part = Part::bytes(self.bytes).file_name(self.file_name);
        if let Some(content_type) = self.content_type {
            part = part.mime_str(&content_type)?;
        }
        Ok(Form::new().part("photo", part))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::auth::Destination;

    #[test]
    fn test_login_request_field_names() {
        let body = serde_json::to_value(LoginRequest {
            email: "a@b.co",
            password: "pw",
            recaptcha_token: "tok",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"email": "a@b.co", "password": "pw", "recaptchaToken": "tok"})
        );
    }

    #[test]
    fn test_user_accepts_document_id() {
        let user: ApiUser =
            serde_json::from_str(r#"{"_id":"u1","name":"Sita","email":"s@x.np","role":"admin"}"#)
                .unwrap();
        assert_eq!(user.id.as_str(), "u1");
        assert!(user.role.is_admin());
        assert!(user.picture.is_none());
    }

    #[test]
    fn test_user_without_role_lands_on_landing_page() {
        let user: ApiUser = serde_json::from_str(r#"{"id":"u2"}"#).unwrap();
        assert_eq!(user.role, Role::unassigned());
        assert!(user.name.is_empty());
        assert_eq!(
            Destination::after_login(&user.role, false),
            Destination::Landing
        );
    }

    #[test]
    fn test_user_with_null_role_lands_on_landing_page() {
        let user: ApiUser = serde_json::from_str(r#"{"id":"u3","role":null}"#).unwrap();
        assert_eq!(user.role, Role::unassigned());
        assert_eq!(
            Destination::after_login(&user.role, false),
            Destination::Landing
        );
    }

    #[test]
    fn test_product_with_minimal_fields() {
        let product: ApiProduct =
            serde_json::from_str(r#"{"_id":"p1","name":"Tea","price":120}"#).unwrap();
        assert_eq!(product.price, Price::from_rupees(120));
        assert!(product.description.is_empty());
        assert!(product.stock.is_none());
    }

    #[test]
    fn test_purchase_record_line_total() {
        let record: PurchaseRecord = serde_json::from_str(
            r#"{"_id":"o1","items":[{"id":"p1","name":"Tea","price":100,"quantity":2}],"payment":"success"}"#,
        )
        .unwrap();
        assert_eq!(record.payment, PaymentStatus::Success);
        assert_eq!(record.items.first().unwrap().line_total(), Price::from_rupees(200));
    }

    #[test]
    fn test_password_change_check_defaults_false() {
        let check: PasswordChangeCheck = serde_json::from_str("{}").unwrap();
        assert!(!check.message);
    }
}
