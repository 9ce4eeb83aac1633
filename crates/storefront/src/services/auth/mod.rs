//! Authentication service.
//!
//! Login runs as an explicit sequence of phases:
//!
//! ```text
//! Editing -> Validating -> Submitting -> Authenticated
//!                |              |
//!                v              v
//!             Editing         Failed
//! ```
//!
//! Validation happens entirely in-process, so an invalid form never reaches
//! the backend. The session is written by the route handler only after
//! [`login`] returns `Ok`.

mod error;

pub use error::{AuthError, Field, ValidationError};

use core::fmt;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use samaan_kinam_core::{Email, Role};

use crate::api::{ApiClient, LoginRequest, RegisterRequest};
use crate::models::CurrentUser;

/// Minimum password length for registration and password changes.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Shown when a login fails without a backend message.
pub const LOGIN_FALLBACK_MESSAGE: &str = "An error occurred during login.";

/// Shown when a registration fails without a backend message.
pub const REGISTER_FALLBACK_MESSAGE: &str = "An error occurred during registration.";

// =============================================================================
// Login
// =============================================================================

/// Where a login attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPhase {
    Editing,
    Validating,
    Submitting,
    Authenticated,
    Failed,
}

impl LoginPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Editing => "editing",
            Self::Validating => "validating",
            Self::Submitting => "submitting",
            Self::Authenticated => "authenticated",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LoginPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login form as submitted by the browser.
///
/// The reCAPTCHA widget posts its token as `g-recaptcha-response`.
#[derive(Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "g-recaptcha-response")]
    pub recaptcha_token: String,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("has_recaptcha_token", &!self.recaptcha_token.is_empty())
            .finish()
    }
}

/// Credentials that passed validation.
pub struct LoginCredentials {
    pub email: Email,
    pub password: SecretString,
    pub recaptcha_token: String,
}

impl LoginForm {
    /// Check the form before anything is sent.
    ///
    /// Rules, in order: either credential empty, email syntax, blank password,
    /// missing verification token.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] the form breaks.
    pub fn validate(&self) -> Result<LoginCredentials, ValidationError> {
        let email = self.email.trim();

        if email.is_empty() || self.password.is_empty() {
            return Err(ValidationError::MissingFields);
        }

        let email = Email::parse(email).map_err(|_| ValidationError::InvalidEmail)?;

        if self.password.trim().is_empty() {
            return Err(ValidationError::EmptyPassword);
        }

        if self.recaptcha_token.trim().is_empty() {
            return Err(ValidationError::MissingVerification);
        }

        Ok(LoginCredentials {
            email,
            password: SecretString::from(self.password.clone()),
            recaptcha_token: self.recaptcha_token.trim().to_owned(),
        })
    }
}

/// Page a user lands on after signing in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// The backend demands a new password first.
    ChangePassword,
    /// Customer home.
    Home,
    /// Admin product management.
    ProductManagement,
    /// Landing page, for roles this storefront does not know.
    Landing,
}

impl Destination {
    /// A required password change takes precedence over any role.
    #[must_use]
    pub const fn after_login(role: &Role, password_change_required: bool) -> Self {
        if password_change_required {
            return Self::ChangePassword;
        }
        match role {
            Role::User => Self::Home,
            Role::Admin => Self::ProductManagement,
            Role::Other(_) => Self::Landing,
        }
    }

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::ChangePassword => "/account/change-password",
            Self::Home => "/home",
            Self::ProductManagement => "/admin/products",
            Self::Landing => "/",
        }
    }
}

/// A completed login, ready to be written to the session.
pub struct SignedIn {
    pub user: CurrentUser,
    pub token: SecretString,
    pub destination: Destination,
}

impl fmt::Debug for SignedIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedIn")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .field("destination", &self.destination)
            .finish()
    }
}

/// Submit validated credentials and decide where the user goes next.
///
/// A failing password-change check does not fail the login; the user is
/// routed by role instead.
///
/// # Errors
///
/// Returns [`AuthError::Api`] if the backend rejects the credentials or
/// cannot be reached.
#[instrument(skip_all, fields(phase = %LoginPhase::Submitting))]
pub async fn login(api: &ApiClient, credentials: LoginCredentials) -> Result<SignedIn, AuthError> {
    let response = api
        .login(&LoginRequest {
            email: credentials.email.as_str(),
            password: credentials.password.expose_secret(),
            recaptcha_token: &credentials.recaptcha_token,
        })
        .await
        .inspect_err(|e| {
            debug!(phase = %LoginPhase::Failed, error = %e, "Login rejected");
        })?;

    let token = SecretString::from(response.token);

    let password_change_required = match api.password_need_change(&token).await {
        Ok(required) => required,
        Err(e) => {
            warn!(error = %e, "Password-change check failed, routing by role");
            false
        }
    };

    let user = CurrentUser {
        id: response.user.id,
        name: response.user.name,
        email: credentials.email,
        role: response.user.role,
        signed_in_at: Utc::now(),
    };
    let destination = Destination::after_login(&user.role, password_change_required);

    info!(
        phase = %LoginPhase::Authenticated,
        user_id = %user.id,
        role = %user.role,
        destination = destination.path(),
        "User signed in"
    );

    Ok(SignedIn {
        user,
        token,
        destination,
    })
}

// =============================================================================
// Registration
// =============================================================================

/// Registration form as submitted by the browser.
#[derive(Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

impl fmt::Debug for RegisterForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// A registration that passed validation.
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: SecretString,
}

impl RegisterForm {
    /// Check the form before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] the form breaks.
    pub fn validate(&self) -> Result<Registration, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() || self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ValidationError::MissingFields);
        }

        let email = Email::parse(&self.email).map_err(|_| ValidationError::InvalidEmail)?;
        let password = validate_new_password(&self.password, &self.password_confirm)?;

        Ok(Registration {
            name: name.to_owned(),
            email,
            password,
        })
    }
}

/// Create the account.
///
/// # Errors
///
/// Returns [`AuthError::Api`] if the backend rejects the registration.
#[instrument(skip_all)]
pub async fn register(api: &ApiClient, registration: &Registration) -> Result<(), AuthError> {
    api.register(&RegisterRequest {
        name: &registration.name,
        email: registration.email.as_str(),
        password: registration.password.expose_secret(),
    })
    .await?;
    info!("Account registered");
    Ok(())
}

// =============================================================================
// Password change
// =============================================================================

/// New-password form.
#[derive(Default, Deserialize)]
pub struct PasswordChangeForm {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

impl fmt::Debug for PasswordChangeForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordChangeForm").finish_non_exhaustive()
    }
}

impl PasswordChangeForm {
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] the form breaks.
    pub fn validate(&self) -> Result<SecretString, ValidationError> {
        if self.password.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        validate_new_password(&self.password, &self.password_confirm)
    }
}

fn validate_new_password(password: &str, confirm: &str) -> Result<SecretString, ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(SecretString::from(password.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::BackendConfig;

    fn form(email: &str, password: &str, token: &str) -> LoginForm {
        LoginForm {
            email: email.to_string(),
            password: password.to_string(),
            recaptcha_token: token.to_string(),
        }
    }

    async fn setup() -> (MockServer, ApiClient) {
        let server = MockServer::start().await;
        let api = ApiClient::new(&BackendConfig {
            url: Url::parse(&server.uri()).unwrap(),
            accept_invalid_certs: false,
        })
        .unwrap();
        (server, api)
    }

    fn credentials() -> LoginCredentials {
        form("sita@example.com", "secret", "captcha").validate().unwrap()
    }

    async fn mount_login(server: &MockServer, role: &str) {
        Mock::given(method("POST"))
            .and(path("/users/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "tok",
                "user": {"_id": "u1", "name": "Sita", "email": "sita@example.com", "role": role}
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_validate_login_rules() {
        assert_eq!(
            form("", "", "t").validate().err(),
            Some(ValidationError::MissingFields)
        );
        assert_eq!(
            form("abc", "pw", "t").validate().err(),
            Some(ValidationError::InvalidEmail)
        );
        assert_eq!(
            form("", "pw", "t").validate().err(),
            Some(ValidationError::MissingFields)
        );
        assert_eq!(
            form("  ", "pw", "t").validate().err(),
            Some(ValidationError::MissingFields)
        );
        assert_eq!(
            form("a@b.co", "", "t").validate().err(),
            Some(ValidationError::MissingFields)
        );
        assert_eq!(
            form("abc", "", "t").validate().err(),
            Some(ValidationError::MissingFields)
        );
        assert_eq!(
            form("a@b.co", "   ", "t").validate().err(),
            Some(ValidationError::EmptyPassword)
        );
        assert_eq!(
            form("a@b.co", "pw", " ").validate().err(),
            Some(ValidationError::MissingVerification)
        );
        assert!(form(" a@b.co ", "pw", "t").validate().is_ok());
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::InvalidEmail.to_string(),
            "Please, enter a valid email address."
        );
        assert_eq!(
            ValidationError::MissingVerification.to_string(),
            "Please complete the reCAPTCHA."
        );
        assert_eq!(
            ValidationError::MissingFields.to_string(),
            "Please, enter all the fields."
        );
        assert_eq!(ValidationError::InvalidEmail.field(), Some(Field::Email));
    }

    #[test]
    fn test_destination_after_login() {
        assert_eq!(Destination::after_login(&Role::User, false), Destination::Home);
        assert_eq!(
            Destination::after_login(&Role::Admin, false),
            Destination::ProductManagement
        );
        assert_eq!(
            Destination::after_login(&Role::parse("seller"), false),
            Destination::Landing
        );
        assert_eq!(
            Destination::after_login(&Role::Admin, true),
            Destination::ChangePassword
        );
        assert_eq!(Destination::ChangePassword.path(), "/account/change-password");
    }

    #[test]
    fn test_register_form_validation() {
        let mut form = RegisterForm {
            name: "Sita".to_string(),
            email: "sita@example.com".to_string(),
            password: "short".to_string(),
            password_confirm: "short".to_string(),
        };
        assert_eq!(
            form.validate().err(),
            Some(ValidationError::PasswordTooShort { min: 8 })
        );

        form.password = "long-enough".to_string();
        assert_eq!(form.validate().err(), Some(ValidationError::PasswordMismatch));

        form.password_confirm = "long-enough".to_string();
        let registration = form.validate().unwrap();
        assert_eq!(registration.email.as_str(), "sita@example.com");
    }

    #[test]
    fn test_password_change_form() {
        let form = PasswordChangeForm {
            password: "new-password".to_string(),
            password_confirm: "new-password".to_string(),
        };
        assert_eq!(form.validate().unwrap().expose_secret(), "new-password");
        assert_eq!(
            PasswordChangeForm::default().validate().err(),
            Some(ValidationError::MissingFields)
        );
    }

    #[test]
    fn test_login_form_debug_hides_password() {
        let debug_output = format!("{:?}", form("a@b.co", "hunter22", "t"));
        assert!(!debug_output.contains("hunter22"));
    }

    #[tokio::test]
    async fn test_login_routes_admin_to_product_management() {
        let (server, api) = setup().await;
        mount_login(&server, "admin").await;
        Mock::given(method("GET"))
            .and(path("/users/passwordNeedChange"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": false})),
            )
            .mount(&server)
            .await;

        let signed_in = login(&api, credentials()).await.unwrap();
        assert_eq!(signed_in.destination, Destination::ProductManagement);
        assert_eq!(signed_in.token.expose_secret(), "tok");
        assert_eq!(signed_in.user.email.as_str(), "sita@example.com");
    }

    #[tokio::test]
    async fn test_password_change_takes_precedence() {
        let (server, api) = setup().await;
        mount_login(&server, "user").await;
        Mock::given(method("GET"))
            .and(path("/users/passwordNeedChange"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": true})),
            )
            .mount(&server)
            .await;

        let signed_in = login(&api, credentials()).await.unwrap();
        assert_eq!(signed_in.destination, Destination::ChangePassword);
    }

    #[tokio::test]
    async fn test_failed_password_check_routes_by_role() {
        let (server, api) = setup().await;
        mount_login(&server, "user").await;
        Mock::given(method("GET"))
            .and(path("/users/passwordNeedChange"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let signed_in = login(&api, credentials()).await.unwrap();
        assert_eq!(signed_in.destination, Destination::Home);
    }

    #[tokio::test]
    async fn test_rejected_login_skips_password_check() {
        let (server, api) = setup().await;
        Mock::given(method("POST"))
            .and(path("/users/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/passwordNeedChange"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = login(&api, credentials()).await.unwrap_err();
        assert_eq!(
            err.user_message(LOGIN_FALLBACK_MESSAGE),
            "An error occurred during login."
        );
    }
}
