//! REST backend client.
//!
//! A single [`ApiClient`] wraps a pooled `reqwest::Client` and the backend
//! base URL. Operations are grouped by resource (`users`, `products`); each
//! one is a plain request/response mapping with no retry and no caching.
//!
//! Authenticated calls take the bearer token explicitly. The client never
//! reads the session itself, so the session stays the single owner of the
//! credential.

mod products;
pub mod types;
mod users;

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::BackendConfig;

pub use types::{
    ApiProduct, ApiReview, ApiUser, ImageUpload, LoginRequest, LoginResponse, ProductInput,
    PurchaseRecord, PurchasedItem, RegisterRequest, ReviewInput,
};

/// Largest slice of a response body copied into logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed (connection, TLS, body read).
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error: {status} - {}", .message.as_deref().unwrap_or("no message"))]
    Status {
        status: StatusCode,
        /// The `error` field of the response body, when present.
        message: Option<String>,
    },

    /// The response body was not the expected JSON.
    #[error("Parse error: {0}")]
    Decode(String),

    /// The configured backend URL cannot carry a path.
    #[error("Backend URL cannot be used as a base: {0}")]
    InvalidBaseUrl(String),

    /// The bearer token contains characters not allowed in a header.
    #[error("Bearer token is not a valid header value")]
    InvalidToken,
}

impl ApiError {
    /// HTTP status returned by the backend, if the request got that far.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Authorization failure (401/403): the stored token is no longer usable.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        )
    }

    /// The backend reported the resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// The message the backend sent with a failure, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text to show a visitor: the backend's message, or `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message()
            .map_or_else(|| fallback.to_owned(), str::to_owned)
    }

    fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("error")
                    .and_then(serde_json::Value::as_str)
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_owned)
            });
        Self::Status { status, message }
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Samaan Kinam REST backend.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL cannot carry a path or the HTTP client
    /// fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        if config.url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(config.url.to_string()));
        }

        if config.accept_invalid_certs {
            tracing::warn!(
                backend = %config.url,
                "Accepting invalid TLS certificates from the backend"
            );
        }

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.url.clone(),
            }),
        })
    }

    /// The backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Public URL of a file the backend serves (product pictures, avatars).
    #[must_use]
    pub fn asset_url(&self, segments: &[&str]) -> Option<String> {
        self.url(segments).ok().map(String::from)
    }

    /// Resolve path segments against the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        Ok(self.inner.client.request(method, self.url(segments)?))
    }

    /// Build a request carrying `Authorization: bearer <token>`.
    fn authorized(
        &self,
        method: Method,
        segments: &[&str],
        token: &SecretString,
    ) -> Result<RequestBuilder, ApiError> {
        let mut value = HeaderValue::from_str(&format!("bearer {}", token.expose_secret()))
            .map_err(|_| ApiError::InvalidToken)?;
        value.set_sensitive(true);
        Ok(self.request(method, segments)?.header(AUTHORIZATION, value))
    }

    /// Send a request and return the raw body of a successful response.
    async fn send(request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(
                status = %status,
                body = %truncate(&body),
                "Backend returned non-success status"
            );
            return Err(ApiError::from_response(status, &body));
        }

        Ok(body)
    }

    /// Send a request and decode the JSON body of a successful response.
    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let body = Self::send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&body),
                "Failed to parse backend response"
            );
            ApiError::Decode(e.to_string())
        })
    }

    /// Send a request whose response body carries nothing the caller needs.
    async fn send_unit(request: RequestBuilder) -> Result<(), ApiError> {
        Self::send(request).await.map(drop)
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}
