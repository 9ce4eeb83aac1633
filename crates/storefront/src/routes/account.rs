//! Account route handlers.
//!
//! These routes require authentication. Every backend call runs with the
//! session's token; a rejected token signs the visitor out.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, State},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use samaan_kinam_core::{PaymentStatus, Price};

use crate::api::{ApiClient, ApiUser, PurchaseRecord, PurchasedItem};
use crate::error::{AppError, clear_sentry_user};
use crate::filters;
use crate::middleware::{RequireAuth, clear_current_user};
use crate::models::{CurrentUser, Flash, session_keys};
use crate::routes::{PageContext, api_failure, flash, read_photo};
use crate::services::auth::{Destination, PasswordChangeForm};
use crate::state::AppState;

/// Profile display data for templates.
#[derive(Clone)]
pub struct ProfileView {
    pub name: String,
    pub email: String,
    pub role: String,
    pub picture_url: Option<String>,
}

impl ProfileView {
    fn from_api(user: &ApiUser, api: &ApiClient) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.to_string(),
            picture_url: user
                .picture
                .as_deref()
                .filter(|p| !p.is_empty())
                .and_then(|p| api.asset_url(&["user", p])),
        }
    }

    fn from_session(user: &CurrentUser) -> Self {
        Self {
            name: user.display_name().to_owned(),
            email: user.email.to_string(),
            role: user.role.to_string(),
            picture_url: None,
        }
    }
}

/// Purchased item display data for templates.
#[derive(Clone)]
pub struct PurchasedItemView {
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

/// Purchase display data for templates.
#[derive(Clone)]
pub struct PurchaseView {
    pub date: String,
    pub payment: &'static str,
    pub items: Vec<PurchasedItemView>,
    pub total: String,
}

impl From<PurchaseRecord> for PurchaseView {
    fn from(record: PurchaseRecord) -> Self {
        let total: Price = record.items.iter().map(PurchasedItem::line_total).sum();
        Self {
            date: record
                .created_at
                .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string()),
            payment: match record.payment {
                PaymentStatus::Pending => "pending",
                PaymentStatus::Success => "paid",
                PaymentStatus::Failed => "failed",
            },
            items: record
                .items
                .into_iter()
                .map(|item| PurchasedItemView {
                    line_price: item.line_total().to_string(),
                    price: item.price.to_string(),
                    name: item.name,
                    quantity: item.quantity,
                })
                .collect(),
            total: total.to_string(),
        }
    }
}

/// Change name form data.
#[derive(Debug, Deserialize)]
pub struct ChangeNameForm {
    #[serde(default)]
    pub name: String,
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub page: PageContext,
    pub profile: ProfileView,
}

/// Change password page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/change_password.html")]
pub struct ChangePasswordTemplate {
    pub page: PageContext,
    pub error: Option<String>,
}

/// Purchase history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/purchases.html")]
pub struct PurchasesTemplate {
    pub page: PageContext,
    pub purchases: Vec<PurchaseView>,
}

/// Display account overview page.
///
/// Falls back to the session snapshot when the profile cannot be fetched.
#[instrument(skip(state, session, auth))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
) -> Response {
    let profile = match state.api().get_user(&auth.token).await {
        Ok(user) => ProfileView::from_api(&user, state.api()),
        Err(e) if e.is_auth() => return api_failure(&session, &e, "", "/").await,
        Err(e) => {
            warn!(error = %e, "Failed to fetch profile");
            ProfileView::from_session(&auth.user)
        }
    };

    AccountIndexTemplate {
        page: PageContext::load(&session).await,
        profile,
    }
    .into_response()
}

/// Change the display name.
#[instrument(skip(state, session, auth))]
pub async fn change_name(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<ChangeNameForm>,
) -> Result<Response, AppError> {
    let name = form.name.trim();
    if name.is_empty() {
        flash(&session, Flash::error("Please, enter a name.")).await;
        return Ok(Redirect::to("/account").into_response());
    }

    if let Err(e) = state.api().change_name(&auth.token, name).await {
        return Ok(api_failure(&session, &e, "The name could not be changed.", "/account").await);
    }

    let user = CurrentUser {
        name: name.to_owned(),
        ..auth.user
    };
    session.insert(session_keys::CURRENT_USER, &user).await?;
    flash(&session, Flash::success("Name updated.")).await;
    Ok(Redirect::to("/account").into_response())
}

/// Display the change password page.
#[instrument(skip(session, _auth))]
pub async fn change_password_page(
    session: Session,
    RequireAuth(_auth): RequireAuth,
) -> impl IntoResponse {
    ChangePasswordTemplate {
        page: PageContext::load(&session).await,
        error: None,
    }
}

/// Set a new password, then continue to the user's home page.
#[instrument(skip(state, session, auth, form))]
pub async fn change_password(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<PasswordChangeForm>,
) -> Response {
    let password: SecretString = match form.validate() {
        Ok(password) => password,
        Err(e) => {
            return ChangePasswordTemplate {
                page: PageContext::load(&session).await,
                error: Some(e.to_string()),
            }
            .into_response();
        }
    };

    match state.api().change_password(&auth.token, &password).await {
        Ok(()) => {
            info!(user_id = %auth.user.id, "Password changed");
            flash(&session, Flash::success("Password changed.")).await;
            let destination = Destination::after_login(&auth.user.role, false);
            Redirect::to(destination.path()).into_response()
        }
        Err(e) => {
            api_failure(
                &session,
                &e,
                "The password could not be changed.",
                "/account/change-password",
            )
            .await
        }
    }
}

/// Upload a profile picture.
#[instrument(skip_all)]
pub async fn upload_photo(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let upload = read_photo(&mut multipart)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    let Some(upload) = upload else {
        flash(&session, Flash::error("Please, choose an image.")).await;
        return Ok(Redirect::to("/account").into_response());
    };

    match state.api().upload_profile_image(&auth.token, upload).await {
        Ok(()) => {
            flash(&session, Flash::success("Profile picture updated.")).await;
            Ok(Redirect::to("/account").into_response())
        }
        Err(e) => Ok(api_failure(&session, &e, "The picture could not be uploaded.", "/account").await),
    }
}

/// Display purchase history.
#[instrument(skip(state, session, auth))]
pub async fn purchases(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
) -> Response {
    match state.api().get_all_purchases(&auth.token).await {
        Ok(records) => PurchasesTemplate {
            page: PageContext::load(&session).await,
            purchases: records.into_iter().map(PurchaseView::from).collect(),
        }
        .into_response(),
        Err(e) => api_failure(&session, &e, "Purchases could not be loaded.", "/account").await,
    }
}

/// Delete the account and sign out.
#[instrument(skip(state, session, auth))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
) -> Result<Response, AppError> {
    if let Err(e) = state.api().delete_account(&auth.token).await {
        return Ok(api_failure(&session, &e, "The account could not be deleted.", "/account").await);
    }

    info!(user_id = %auth.user.id, "Account deleted");
    clear_current_user(&session).await?;
    session.flush().await?;
    clear_sentry_user();
    Ok(Redirect::to("/").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_view_totals_items() {
        let record = PurchaseRecord {
            id: Some("o1".to_string()),
            items: vec![
                PurchasedItem {
                    name: "Tea".to_string(),
                    price: Price::from_rupees(100),
                    quantity: 2,
                },
                PurchasedItem {
                    name: "Rice".to_string(),
                    price: Price::from_rupees(50),
                    quantity: 1,
                },
            ],
            payment: PaymentStatus::Success,
            created_at: None,
        };

        let view = PurchaseView::from(record);
        assert_eq!(view.total, "Rs 250");
        assert_eq!(view.payment, "paid");
        assert_eq!(view.date, "-");
        assert_eq!(view.items.first().unwrap().line_price, "Rs 200");
    }
}
