//! Cart route handlers.
//!
//! The cart lives in the session; anyone may fill it, paying needs a login.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use samaan_kinam_core::{CartError, ProductId, Quantity};

use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::models::Flash;
use crate::routes::{PageContext, flash};
use crate::services::cart::{self as cart_service, CartServiceError};
use crate::services::checkout::CheckoutSummary;
use crate::state::AppState;

/// Cart row display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub item_count: u64,
    pub checkout_enabled: bool,
    pub disclaimer: Option<String>,
}

impl From<CheckoutSummary> for CartView {
    fn from(summary: CheckoutSummary) -> Self {
        Self {
            items: summary
                .rows
                .into_iter()
                .map(|row| CartItemView {
                    product_id: row.product_id.to_string(),
                    name: row.name,
                    quantity: row.quantity,
                    price: row.unit_price.to_string(),
                    line_price: row.line_price.to_string(),
                })
                .collect(),
            total: summary.total.to_string(),
            item_count: summary.item_count,
            checkout_enabled: summary.checkout_enabled,
            disclaimer: summary.disclaimer,
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Display cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let cart = cart_service::load(&session).await?;
    let summary = CheckoutSummary::new(&cart, state.gateway());

    Ok(CartShowTemplate {
        page: PageContext::load(&session).await,
        cart: summary.into(),
    }
    .into_response())
}

/// Notification for a cart change the visitor can fix.
fn rejection_message(err: &CartServiceError) -> Option<String> {
    match err {
        CartServiceError::Cart(CartError::ZeroQuantity) => {
            Some("Quantity must be at least 1.".to_string())
        }
        CartServiceError::Cart(e) => Some(e.to_string()),
        CartServiceError::Api(e) if e.is_not_found() => {
            Some("That product is no longer available.".to_string())
        }
        CartServiceError::Api(_) | CartServiceError::Session(_) => None,
    }
}

async fn after_change(
    session: &Session,
    result: Result<(), CartServiceError>,
    success: Option<&str>,
) -> Result<Response, AppError> {
    match result {
        Ok(()) => {
            if let Some(message) = success {
                flash(session, Flash::success(message)).await;
            }
            Ok(Redirect::to("/cart").into_response())
        }
        Err(e) => match rejection_message(&e) {
            Some(message) => {
                flash(session, Flash::error(message)).await;
                Ok(Redirect::to("/cart").into_response())
            }
            None => Err(e.into()),
        },
    }
}

/// Add a product to the cart.
///
/// Name and price are looked up in the catalogue; the form only names the
/// product and quantity.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let result = match Quantity::new(form.quantity.unwrap_or(1)) {
        Ok(quantity) => {
            cart_service::add_product(state.api(), &session, &form.product_id, quantity).await
        }
        Err(e) => Err(e.into()),
    };

    if result.is_ok() {
        add_breadcrumb(
            "cart",
            "Added product",
            Some(&[("product_id", form.product_id.as_str())]),
        );
    }
    after_change(&session, result.map(drop), Some("Added to the purchase cart.")).await
}

/// Change the quantity of a cart line.
#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> Result<Response, AppError> {
    let result = match Quantity::new(form.quantity) {
        Ok(quantity) => cart_service::update_quantity(&session, &form.product_id, quantity).await,
        Err(e) => Err(e.into()),
    };
    after_change(&session, result.map(drop), None).await
}

/// Remove a cart line.
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response, AppError> {
    let result = cart_service::remove_product(&session, &form.product_id).await;
    after_change(&session, result.map(drop), None).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use samaan_kinam_core::{Cart, CartLineItem, Price};

    use super::*;
    use crate::config::PaymentConfig;
    use crate::services::payment::PaymentGateway;

    #[test]
    fn test_cart_view_formats_prices() {
        let cart = Cart::from_items(vec![CartLineItem {
            product_id: ProductId::new("a"),
            name: "Tea".to_string(),
            unit_price: Price::from_rupees(125),
            quantity: Quantity::new(2).unwrap(),
        }]);
        let gateway = PaymentGateway::new(
            &PaymentConfig {
                khalti_public_key: Some("pk".to_string()),
                ..PaymentConfig::default()
            },
            "http://localhost:3000",
        );

        let view = CartView::from(CheckoutSummary::new(&cart, &gateway));
        assert_eq!(view.total, "Rs 250");
        assert_eq!(view.item_count, 2);
        assert!(view.checkout_enabled);
        assert!(view.disclaimer.is_some());
        let row = view.items.first().unwrap();
        assert_eq!(row.price, "Rs 125");
        assert_eq!(row.line_price, "Rs 250");
    }

    #[test]
    fn test_rejection_messages() {
        let zero = CartServiceError::Cart(CartError::ZeroQuantity);
        assert_eq!(
            rejection_message(&zero).as_deref(),
            Some("Quantity must be at least 1.")
        );

        let missing = CartServiceError::Api(crate::api::ApiError::Status {
            status: axum::http::StatusCode::NOT_FOUND,
            message: None,
        });
        assert!(rejection_message(&missing).is_some());

        let down = CartServiceError::Api(crate::api::ApiError::Status {
            status: axum::http::StatusCode::BAD_GATEWAY,
            message: None,
        });
        assert!(rejection_message(&down).is_none());
    }
}
