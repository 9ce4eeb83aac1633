//! Authentication middleware and extractors.
//!
//! The session holds two keys for a signed-in visitor: the backend bearer
//! token and the [`CurrentUser`] snapshot. Both are written together by a
//! successful login and removed together on logout or token rejection.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// A signed-in visitor: who they are and the token to act as them.
pub struct Authenticated {
    pub user: CurrentUser,
    pub token: SecretString,
}

impl std::fmt::Debug for Authenticated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticated")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Extractor that requires a signed-in user.
///
/// If the user is not logged in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(auth): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", auth.user.display_name())
/// }
/// ```
#[derive(Debug)]
pub struct RequireAuth(pub Authenticated);

/// Extractor that requires a signed-in administrator.
#[derive(Debug)]
pub struct RequireAdmin(pub Authenticated);

/// Error returned when authentication is required but missing or insufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Signed in, but the role does not allow this page.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => {
                (StatusCode::FORBIDDEN, "You do not have access to this page").into_response()
            }
        }
    }
}

/// Read the token and user from the session. Both must be present.
async fn load_authenticated(session: &Session) -> Option<Authenticated> {
    let token: String = session.get(session_keys::TOKEN).await.ok().flatten()?;
    let user: CurrentUser = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()?;
    Some(Authenticated {
        user,
        token: SecretString::from(token),
    })
}

fn missing_auth(parts: &Parts) -> AuthRejection {
    if parts.uri.path().starts_with("/api/") {
        AuthRejection::Unauthorized
    } else {
        AuthRejection::RedirectToLogin
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        load_authenticated(session)
            .await
            .map(Self)
            .ok_or_else(|| missing_auth(parts))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(auth) = RequireAuth::from_request_parts(parts, state).await?;

        if !auth.user.is_admin() {
            tracing::warn!(user_id = %auth.user.id, role = %auth.user.role, "Non-admin denied");
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self(auth))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if the user is not logged in.
#[derive(Debug)]
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Store the signed-in user and their token in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
    token: &str,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::TOKEN, token).await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove the user and token from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<String>(session_keys::TOKEN).await?;
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;
    use chrono::Utc;
    use samaan_kinam_core::{Email, Role, UserId};
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new("u1"),
            name: "Sita".to_string(),
            email: Email::parse("sita@example.com").unwrap(),
            role,
            signed_in_at: Utc::now(),
        }
    }

    fn parts_with(session: Option<Session>, uri: &str) -> Parts {
        let (mut parts, ()) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        if let Some(session) = session {
            parts.extensions.insert(session);
        }
        parts
    }

    #[tokio::test]
    async fn test_require_auth_redirects_when_signed_out() {
        let mut parts = parts_with(Some(session()), "/home");
        let result = RequireAuth::from_request_parts(&mut parts, &()).await;
        assert_eq!(result.unwrap_err(), AuthRejection::RedirectToLogin);
    }

    #[tokio::test]
    async fn test_require_auth_unauthorized_for_api_paths() {
        let mut parts = parts_with(Some(session()), "/api/cart");
        let result = RequireAuth::from_request_parts(&mut parts, &()).await;
        assert_eq!(result.unwrap_err(), AuthRejection::Unauthorized);
    }

    #[tokio::test]
    async fn test_user_without_token_is_not_authenticated() {
        let session = session();
        session
            .insert(session_keys::CURRENT_USER, user(Role::User))
            .await
            .unwrap();

        let mut parts = parts_with(Some(session), "/home");
        assert!(RequireAuth::from_request_parts(&mut parts, &()).await.is_err());
    }

    #[tokio::test]
    async fn test_set_and_clear_current_user() {
        let session = session();
        set_current_user(&session, &user(Role::User), "tok").await.unwrap();

        let mut parts = parts_with(Some(session.clone()), "/home");
        let RequireAuth(auth) = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(auth.user.id.as_str(), "u1");

        clear_current_user(&session).await.unwrap();
        let token: Option<String> = session.get(session_keys::TOKEN).await.unwrap();
        assert!(token.is_none());
        let mut parts = parts_with(Some(session), "/home");
        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_require_admin_rejects_customers() {
        let session = session();
        set_current_user(&session, &user(Role::User), "tok").await.unwrap();
        let mut parts = parts_with(Some(session), "/admin/products");
        let result = RequireAdmin::from_request_parts(&mut parts, &()).await;
        assert_eq!(result.unwrap_err(), AuthRejection::Forbidden);
    }

    #[tokio::test]
    async fn test_require_admin_accepts_admins() {
        let session = session();
        set_current_user(&session, &user(Role::Admin), "tok").await.unwrap();
        let mut parts = parts_with(Some(session), "/admin/products");
        assert!(RequireAdmin::from_request_parts(&mut parts, &()).await.is_ok());
    }

    #[tokio::test]
    async fn test_debug_redacts_token() {
        let auth = Authenticated {
            user: user(Role::User),
            token: SecretString::from("very-secret-token"),
        };
        let debug_output = format!("{auth:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("very-secret-token"));
    }
}
