//! Authentication route handlers.
//!
//! Handles login, registration, logout, and account locking against the
//! backend's `/users` endpoints. Forms are validated before anything is sent.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use samaan_kinam_core::Email;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{debug, instrument, warn};

use crate::error::{AppError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::Flash;
use crate::routes::{PageContext, flash};
use crate::services::auth::{
    self as auth_service, Field, LOGIN_FALLBACK_MESSAGE, LoginForm, LoginPhase,
    REGISTER_FALLBACK_MESSAGE, RegisterForm, ValidationError,
};
use crate::state::AppState;

/// Shown after a successful registration.
pub const REGISTERED_MESSAGE: &str = "Registration successful. Please, log in.";

/// Shown after a lock request, whatever the backend answered.
pub const LOCK_REQUESTED_MESSAGE: &str =
    "If an account exists for that email, it has been locked.";

// =============================================================================
// Form Types
// =============================================================================

/// Lock account form data.
#[derive(Debug, Deserialize)]
pub struct LockAccountForm {
    #[serde(default)]
    pub email: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    /// What the user typed, kept across failed attempts.
    pub email: String,
    pub error: Option<String>,
    /// Input to highlight: `email`, `password`, or none.
    pub error_field: Option<&'static str>,
    pub recaptcha_site_key: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub name: String,
    pub email: String,
    pub error: Option<String>,
}

const fn field_name(field: Option<Field>) -> Option<&'static str> {
    match field {
        Some(Field::Email) => Some("email"),
        Some(Field::Password) => Some("password"),
        None => None,
    }
}

fn login_template(
    state: &AppState,
    page: PageContext,
    email: String,
    error: Option<String>,
    error_field: Option<&'static str>,
) -> LoginTemplate {
    LoginTemplate {
        page,
        email,
        error,
        error_field,
        recaptcha_site_key: state.config().recaptcha_site_key.clone(),
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip(state, session))]
pub async fn login_page(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let page = PageContext::load(&session).await;
    login_template(&state, page, String::new(), None, None)
}

/// Handle login form submission.
///
/// Invalid input re-renders the form without contacting the backend. A
/// rejected login leaves the session untouched and re-renders the form with
/// a fresh verification widget.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    debug!(phase = %LoginPhase::Validating, "Checking login form");

    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(e) => {
            debug!(phase = %LoginPhase::Editing, reason = %e, "Login form rejected");
            let page = PageContext::load(&session).await;
            return login_template(
                &state,
                page,
                form.email,
                Some(e.to_string()),
                field_name(e.field()),
            )
            .into_response();
        }
    };

    match auth_service::login(state.api(), credentials).await {
        Ok(signed_in) => {
            if let Err(e) = set_current_user(
                &session,
                &signed_in.user,
                signed_in.token.expose_secret(),
            )
            .await
            {
                tracing::error!(error = %e, "Failed to store signed-in user");
                return AppError::Session(e).into_response();
            }

            set_sentry_user(&signed_in.user.id, Some(signed_in.user.email.as_str()));
            add_breadcrumb("auth", "Signed in", Some(&[("role", signed_in.user.role.as_str())]));

            Redirect::to(signed_in.destination.path()).into_response()
        }
        Err(e) => {
            let message = e.user_message(LOGIN_FALLBACK_MESSAGE);
            warn!(phase = %LoginPhase::Failed, error = %e, "Login failed");

            let mut page = PageContext::load(&session).await;
            page.flash = Some(Flash::error(message.clone()));
            login_template(&state, page, form.email, Some(message), None).into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip(session))]
pub async fn register_page(session: Session) -> impl IntoResponse {
    RegisterTemplate {
        page: PageContext::load(&session).await,
        name: String::new(),
        email: String::new(),
        error: None,
    }
}

/// Handle registration form submission.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let result = match form.validate() {
        Ok(registration) => auth_service::register(state.api(), &registration).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => {
            flash(&session, Flash::success(REGISTERED_MESSAGE)).await;
            Redirect::to("/auth/login").into_response()
        }
        Err(e) => {
            debug!(error = %e, "Registration rejected");
            RegisterTemplate {
                page: PageContext::load(&session).await,
                name: form.name,
                email: form.email,
                error: Some(e.user_message(REGISTER_FALLBACK_MESSAGE)),
            }
            .into_response()
        }
    }
}

// =============================================================================
// Logout / Lock
// =============================================================================

/// Handle logout.
///
/// Drops the whole session, cart included.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear signed-in user");
    }
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "Failed to flush session");
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}

/// Lock an account by email.
///
/// The notification is the same whether or not the backend found the account.
#[instrument(skip(state, session, form))]
pub async fn lock_account(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LockAccountForm>,
) -> Response {
    let Ok(email) = Email::parse(form.email.trim()) else {
        flash(&session, Flash::error(ValidationError::InvalidEmail.to_string())).await;
        return Redirect::to("/auth/login").into_response();
    };

    if let Err(e) = state.api().lock_account(email.as_str()).await {
        warn!(error = %e, "Lock account request failed");
    }

    flash(&session, Flash::info(LOCK_REQUESTED_MESSAGE)).await;
    Redirect::to("/auth/login").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_name() {
        assert_eq!(field_name(ValidationError::InvalidEmail.field()), Some("email"));
        assert_eq!(
            field_name(ValidationError::EmptyPassword.field()),
            Some("password")
        );
        assert_eq!(field_name(ValidationError::MissingFields.field()), None);
    }
}
