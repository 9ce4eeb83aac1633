//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::{ApiClient, ApiError};
use crate::config::StorefrontConfig;
use crate::middleware::ContentSecurityPolicy;
use crate::services::payment::PaymentGateway;

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    gateway: PaymentGateway,
    csp: ContentSecurityPolicy,
}

impl AppState {
    /// Create the application state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.backend)?;
        let gateway = PaymentGateway::new(&config.payment, config.base_url.clone());
        let csp = ContentSecurityPolicy::new(&config.backend.url, config.is_https());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                gateway,
                csp,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the payment gateway.
    #[must_use]
    pub fn gateway(&self) -> &PaymentGateway {
        &self.inner.gateway
    }

    /// Get the Content-Security-Policy sent with every response.
    #[must_use]
    pub fn csp(&self) -> &ContentSecurityPolicy {
        &self.inner.csp
    }
}
