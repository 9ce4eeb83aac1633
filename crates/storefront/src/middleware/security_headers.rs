//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Adds restrictive security headers to all responses. The only third-party
//! origins allowed are the reCAPTCHA widget on the login page, the Khalti
//! payment widget on checkout, and the backend (which serves uploaded images).

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};
use url::Url;

const RECAPTCHA_SCRIPTS: &str = "https://www.google.com/recaptcha/ https://www.gstatic.com/recaptcha/";
const RECAPTCHA_FRAMES: &str = "https://www.google.com/recaptcha/ https://recaptcha.google.com/recaptcha/";
const KHALTI_SCRIPTS: &str = "https://khalti.s3.ap-south-1.amazonaws.com";
const KHALTI_ORIGINS: &str = "https://khalti.com https://*.khalti.com";

/// A prebuilt `Content-Security-Policy` header value.
#[derive(Debug, Clone)]
pub struct ContentSecurityPolicy(HeaderValue);

impl ContentSecurityPolicy {
    /// Build the policy for a storefront talking to `backend`.
    ///
    /// `https` adds `upgrade-insecure-requests`; plain-HTTP development
    /// servers would otherwise break their own subresources.
    #[must_use]
    pub fn new(backend: &Url, https: bool) -> Self {
        let backend_origin = backend.origin().ascii_serialization();
        let mut policy = format!(
            "default-src 'none'; \
             script-src 'self' {RECAPTCHA_SCRIPTS} {KHALTI_SCRIPTS}; \
             style-src 'self'; \
             font-src 'self'; \
             img-src 'self' data: {backend_origin}; \
             connect-src 'self' {KHALTI_ORIGINS}; \
             frame-src {RECAPTCHA_FRAMES} {KHALTI_ORIGINS}; \
             object-src 'none'; \
             base-uri 'self'; \
             form-action 'self'; \
             frame-ancestors 'none'"
        );
        if https {
            policy.push_str("; upgrade-insecure-requests");
        }

        // Origins come from a parsed URL, so the value is always visible ASCII.
        let value = HeaderValue::from_str(&policy)
            .unwrap_or_else(|_| HeaderValue::from_static("default-src 'self'"));
        Self(value)
    }

    /// The header value.
    #[must_use]
    pub const fn header_value(&self) -> &HeaderValue {
        &self.0
    }
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY` - Prevent clickjacking
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
/// - `Referrer-Policy: no-referrer`
/// - `Content-Security-Policy` - see [`ContentSecurityPolicy::new`]
/// - `Permissions-Policy` - Deny sensitive features except payment
/// - `Cache-Control: no-store, max-age=0` - Pages carry per-user data
/// - `Cross-Origin-Opener-Policy: same-origin-allow-popups` - Khalti opens a popup
/// - `X-DNS-Prefetch-Control: off`
pub async fn security_headers_middleware(
    State(csp): State<ContentSecurityPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(CONTENT_SECURITY_POLICY, csp.0);

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             magnetometer=(), \
             microphone=(), \
             payment=(self), \
             usb=()",
        ),
    );

    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin-allow-popups"),
    );

    headers.insert(
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn policy(backend: &str, https: bool) -> String {
        ContentSecurityPolicy::new(&Url::parse(backend).unwrap(), https)
            .header_value()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_policy_allows_backend_images() {
        let csp = policy("https://localhost:4000/api/", false);
        assert!(csp.contains("img-src 'self' data: https://localhost:4000;"));
        assert!(!csp.contains("upgrade-insecure-requests"));
    }

    #[test]
    fn test_policy_allows_widgets() {
        let csp = policy("https://api.example.com", true);
        assert!(csp.contains("https://www.gstatic.com/recaptcha/"));
        assert!(csp.contains("https://khalti.s3.ap-south-1.amazonaws.com"));
        assert!(csp.ends_with("upgrade-insecure-requests"));
    }
}
