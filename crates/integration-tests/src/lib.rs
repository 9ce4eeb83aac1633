//! End-to-end harness for the Samaan Kinam storefront.
//!
//! Each [`TestStorefront`] runs the full router (sessions, security headers,
//! request ids) in-process against a `wiremock` backend. Requests go through
//! `tower::ServiceExt::oneshot`, and the session cookie is carried between
//! them like a browser would.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p samaan-kinam-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use samaan_kinam_storefront::config::{
    BackendConfig, PaymentConfig, SentryConfig, StorefrontConfig,
};
use samaan_kinam_storefront::middleware::session::SESSION_COOKIE_NAME;
use samaan_kinam_storefront::{app, routes, state::AppState};
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Public key configured for the payment widget in tests.
pub const TEST_KHALTI_KEY: &str = "test_public_key_integration";

/// A response, read to completion.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Target of a redirect response.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// A storefront wired to a mock backend, with one browser session.
pub struct TestStorefront {
    pub backend: MockServer,
    app: Router,
    cookie: Option<String>,
}

impl TestStorefront {
    /// Storefront with the payment gateway configured.
    pub async fn start() -> Self {
        Self::with_payment(PaymentConfig {
            khalti_public_key: Some(TEST_KHALTI_KEY.to_string()),
            ..PaymentConfig::default()
        })
        .await
    }

    /// Storefront with a specific payment configuration.
    pub async fn with_payment(payment: PaymentConfig) -> Self {
        let backend = MockServer::start().await;
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            backend: BackendConfig {
                url: Url::parse(&backend.uri()).unwrap(),
                accept_invalid_certs: false,
            },
            recaptcha_site_key: "test-site-key".to_string(),
            payment,
            sentry: SentryConfig::default(),
        };
        let state = AppState::new(config).unwrap();

        Self {
            backend,
            app: app(state, routes::routes()),
            cookie: None,
        }
    }

    /// Send a request with the current session cookie and remember any new one.
    pub async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let mut request = request;
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();

        for value in headers.get_all(header::SET_COOKIE) {
            let value = value.to_str().unwrap();
            if let Some(pair) = value.split(';').next()
                && pair.starts_with(SESSION_COOKIE_NAME)
            {
                self.cookie = Some(pair.to_string());
            }
        }

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// POST an already url-encoded form body.
    pub async fn post_form(&mut self, uri: &str, body: &str) -> TestResponse {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_owned()))
            .unwrap();
        self.send(request).await
    }

    /// Mock a successful login for a user with `role`.
    pub async fn mock_login(&self, role: &str, password_change: bool) {
        self.mock_login_as(
            json!({ "_id": "u1", "name": "Asha", "email": "asha@example.com", "role": role }),
            password_change,
        )
        .await;
    }

    /// Mock a successful login returning `user` exactly as given.
    pub async fn mock_login_as(&self, user: Value, password_change: bool) {
        Mock::given(method("POST"))
            .and(path("/users/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "token-1",
                "user": user
            })))
            .mount(&self.backend)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/passwordNeedChange"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "message": password_change })),
            )
            .mount(&self.backend)
            .await;
    }

    /// Sign in through the login form.
    pub async fn sign_in(&mut self, role: &str) -> TestResponse {
        self.mock_login(role, false).await;
        self.post_form("/auth/login", LOGIN_FORM).await
    }

    /// Mock the catalogue with `products`, each also served at `/products/{id}`.
    pub async fn mock_products(&self, products: &[Value]) {
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::from(products.to_vec())))
            .mount(&self.backend)
            .await;
        for product in products {
            let id = product["_id"].as_str().unwrap();
            Mock::given(method("GET"))
                .and(path(format!("/products/{id}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(product))
                .mount(&self.backend)
                .await;
        }
    }
}

/// A well-formed login submission.
pub const LOGIN_FORM: &str =
    "email=asha%40example.com&password=secret-pass&g-recaptcha-response=captcha-token";

/// Catalogue entry as the backend sends it.
#[must_use]
pub fn product(id: &str, name: &str, price: i64) -> Value {
    json!({
        "_id": id,
        "name": name,
        "description": format!("{name} from the hills"),
        "price": price,
        "category": "Groceries",
        "quantity": 10
    })
}
