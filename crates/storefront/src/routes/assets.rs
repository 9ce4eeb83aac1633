//! Scripts compiled into the binary.

use axum::{http::header::CONTENT_TYPE, response::IntoResponse};

const CHECKOUT_SCRIPT: &str = include_str!("../../static/checkout.js");

/// Serve the payment widget glue script.
pub async fn checkout_script() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/javascript; charset=utf-8")],
        CHECKOUT_SCRIPT,
    )
}
