//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Landing page
//! GET  /home                   - Product listing for signed-in users
//! GET  /health                 - Health check
//! GET  /static/checkout.js     - Payment widget glue script
//!
//! # Products
//! GET  /products               - Product listing
//! GET  /products/{id}          - Product detail with reviews
//! POST /products/{id}/reviews  - Add review
//! POST /products/{id}/reviews/{review_id}        - Update review
//! POST /products/{id}/reviews/{review_id}/delete - Delete review
//!
//! # Cart
//! GET  /cart                   - Cart page with summary
//! POST /cart/add               - Add product
//! POST /cart/update            - Change quantity
//! POST /cart/remove            - Remove product
//!
//! # Checkout (requires auth)
//! POST /checkout               - Open the payment widget
//! POST /checkout/payment       - Widget outcome callback
//!
//! # Auth (rate limited)
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! POST /auth/logout            - Logout action
//! POST /auth/lock-account      - Lock an account by email
//!
//! # Account (requires auth)
//! GET  /account                - Account overview
//! POST /account/name           - Change display name
//! GET  /account/change-password
//! POST /account/change-password
//! POST /account/photo          - Upload profile picture
//! GET  /account/purchases      - Purchase history
//! POST /account/delete         - Delete account and sign out
//!
//! # Admin (requires admin role)
//! GET  /admin/products         - Product management
//! POST /admin/products         - Create product
//! POST /admin/products/{id}    - Edit product
//! POST /admin/products/{id}/delete
//! POST /admin/products/{id}/image
//! POST /admin/users/unlock     - Unlock by user id from a form
//! POST /admin/users/{id}/unlock
//! ```

pub mod account;
pub mod admin;
pub mod assets;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod products;

use axum::{
    Router,
    extract::{Multipart, multipart::MultipartError},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::api::{ApiError, ImageUpload};
use crate::error::clear_sentry_user;
use crate::middleware::{RateLimiterLayer, clear_current_user};
use crate::models::{CurrentUser, Flash, session_keys};
use crate::services::cart as cart_service;
use crate::state::AppState;

/// Shown after the backend rejects the stored token.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

// =============================================================================
// Page Context
// =============================================================================

/// What every page layout needs: who is signed in, the pending notification,
/// and the cart badge.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub flash: Option<Flash>,
    pub cart_count: u64,
}

impl PageContext {
    /// Read the context for the page about to render.
    ///
    /// Takes the pending notification out of the session, so it shows once.
    pub async fn load(session: &Session) -> Self {
        let user = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();
        let flash = session
            .remove::<Flash>(session_keys::FLASH)
            .await
            .ok()
            .flatten();
        let cart_count = cart_service::load(session)
            .await
            .map(|cart| cart.item_count())
            .unwrap_or(0);

        Self {
            user,
            flash,
            cart_count,
        }
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_admin)
    }
}

/// Queue a notification for the next rendered page.
pub async fn flash(session: &Session, flash: Flash) {
    if let Err(e) = session.insert(session_keys::FLASH, &flash).await {
        tracing::error!(error = %e, "Failed to store notification");
    }
}

/// Redirect after a failed backend call.
///
/// A rejected token signs the visitor out and sends them to the login page;
/// anything else shows the backend's message (or `fallback`) on `back_to`.
pub async fn api_failure(
    session: &Session,
    err: &ApiError,
    fallback: &str,
    back_to: &str,
) -> Response {
    if err.is_auth() {
        tracing::warn!(error = %err, "Backend rejected the session token");
        if let Err(e) = clear_current_user(session).await {
            tracing::error!(error = %e, "Failed to clear session");
        }
        clear_sentry_user();
        flash(session, Flash::error(SESSION_EXPIRED_MESSAGE)).await;
        return Redirect::to("/auth/login").into_response();
    }

    tracing::warn!(error = %err, "Backend request failed");
    flash(session, Flash::error(err.user_message(fallback))).await;
    Redirect::to(back_to).into_response()
}

/// Form field carrying an uploaded image.
pub const PHOTO_FIELD: &str = "photo";

/// Read the `photo` file from a multipart form. `None` if no file was chosen.
///
/// # Errors
///
/// Returns an error if the multipart body is malformed.
pub async fn read_photo(multipart: &mut Multipart) -> Result<Option<ImageUpload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_owned();
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await?;
        if file_name.is_empty() || bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(ImageUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/lock-account", post(auth::lock_account))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/reviews", post(products::add_review))
        .route(
            "/{id}/reviews/{review_id}",
            post(products::update_review),
        )
        .route(
            "/{id}/reviews/{review_id}/delete",
            post(products::delete_review),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::initiate))
        .route("/payment", post(checkout::payment))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/name", post(account::change_name))
        .route(
            "/change-password",
            get(account::change_password_page).post(account::change_password),
        )
        .route("/photo", post(account::upload_photo))
        .route("/purchases", get(account::purchases))
        .route("/delete", post(account::delete))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(admin::products).post(admin::create_product),
        )
        .route("/products/{id}", post(admin::edit_product))
        .route("/products/{id}/delete", post(admin::delete_product))
        .route("/products/{id}/image", post(admin::upload_product_image))
        .route("/users/unlock", post(admin::unlock_user_form))
        .route("/users/{id}/unlock", post(admin::unlock_user))
}

/// Every route except `/auth`.
fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::landing))
        .route("/home", get(home::home))
        .route("/health", get(health))
        .route("/static/checkout.js", get(assets::checkout_script))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/account", account_routes())
        .nest("/admin", admin_routes())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    page_routes().nest("/auth", auth_routes())
}

/// Create all routes, with `limiter` in front of `/auth`.
pub fn rate_limited_routes(limiter: RateLimiterLayer) -> Router<AppState> {
    page_routes().nest("/auth", auth_routes().layer(limiter))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the backend.
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use samaan_kinam_core::{Email, Role, UserId};
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::middleware::set_current_user;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn admin() -> CurrentUser {
        CurrentUser {
            id: UserId::new("u1"),
            name: "Asha".to_string(),
            email: Email::parse("asha@example.com").unwrap(),
            role: Role::Admin,
            signed_in_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_flash_shows_once() {
        let session = session();
        flash(&session, Flash::success("Saved")).await;

        let first = PageContext::load(&session).await;
        assert_eq!(first.flash, Some(Flash::success("Saved")));

        let second = PageContext::load(&session).await;
        assert!(second.flash.is_none());
    }

    #[tokio::test]
    async fn test_context_reads_user() {
        let session = session();
        assert!(!PageContext::load(&session).await.is_signed_in());

        set_current_user(&session, &admin(), "tok").await.unwrap();
        let page = PageContext::load(&session).await;
        assert!(page.is_signed_in());
        assert!(page.is_admin());
        assert_eq!(page.cart_count, 0);
    }

    #[tokio::test]
    async fn test_auth_failure_signs_out() {
        let session = session();
        set_current_user(&session, &admin(), "tok").await.unwrap();

        let err = ApiError::Status {
            status: axum::http::StatusCode::UNAUTHORIZED,
            message: None,
        };
        let response = api_failure(&session, &err, "fallback", "/account").await;

        assert_eq!(response.headers()["location"], "/auth/login");
        let page = PageContext::load(&session).await;
        assert!(page.user.is_none());
        assert_eq!(page.flash, Some(Flash::error(SESSION_EXPIRED_MESSAGE)));
    }

    #[tokio::test]
    async fn test_other_failure_keeps_session() {
        let session = session();
        set_current_user(&session, &admin(), "tok").await.unwrap();

        let err = ApiError::Status {
            status: axum::http::StatusCode::BAD_REQUEST,
            message: Some("Name taken".to_string()),
        };
        let response = api_failure(&session, &err, "fallback", "/account").await;

        assert_eq!(response.headers()["location"], "/account");
        let page = PageContext::load(&session).await;
        assert!(page.user.is_some());
        assert_eq!(page.flash, Some(Flash::error("Name taken")));
    }
}
