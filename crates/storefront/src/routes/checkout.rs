//! Checkout route handlers.
//!
//! `POST /checkout` renders the Khalti widget for the current cart and
//! remembers that cart as the pending order. The widget script reports back
//! through `POST /checkout/payment` with the outcome it saw, which is only
//! acted on for the order that was opened.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::routes::cart::CartView;
use crate::routes::{PageContext, api_failure, flash};
use crate::services::cart as cart_service;
use crate::services::checkout::{
    self as checkout_service, CART_CHANGED_MESSAGE, CheckoutError, CheckoutSummary,
    EMPTY_CART_MESSAGE, GATEWAY_UNAVAILABLE_MESSAGE, Initiation, PAYMENT_FAILED_MESSAGE, PURCHASE_FALLBACK_MESSAGE,
    PURCHASE_SUCCESS_MESSAGE, Resolution,
};
use crate::services::payment::PaymentOutcome;
use crate::state::AppState;

/// Widget callback form data.
#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub outcome: PaymentOutcome,
}

/// Payment page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/checkout.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub cart: CartView,
    /// Amount the widget will charge.
    pub charge: String,
    /// Widget configuration as JSON, read by `/static/checkout.js`.
    pub widget_json: String,
}

/// Start payment for the current cart.
#[instrument(skip(state, session, auth))]
pub async fn initiate(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
) -> Result<Response, AppError> {
    let cart = cart_service::load(&session).await?;

    match checkout_service::initiate(&cart, state.gateway()) {
        Initiation::EmptyCart => {
            flash(&session, Flash::error(EMPTY_CART_MESSAGE)).await;
            Ok(Redirect::to("/cart").into_response())
        }
        Initiation::GatewayUnavailable => {
            warn!("Checkout attempted without a payment gateway");
            flash(&session, Flash::info(GATEWAY_UNAVAILABLE_MESSAGE)).await;
            Ok(Redirect::to("/cart").into_response())
        }
        Initiation::Ready(widget) => {
            let widget_json = serde_json::to_string(&widget)
                .map_err(|e| AppError::Internal(format!("widget config: {e}")))?;
            let charge = state.gateway().charge_amount(cart.total()).to_string();
            checkout_service::begin(&session, &cart).await?;
            info!(user_id = %auth.user.id, total = %cart.total(), %charge, "Payment started");

            Ok(CheckoutTemplate {
                page: PageContext::load(&session).await,
                cart: CheckoutSummary::new(&cart, state.gateway()).into(),
                charge,
                widget_json,
            }
            .into_response())
        }
    }
}

/// Act on the outcome the payment widget reported.
#[instrument(skip(state, session, auth))]
pub async fn payment(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<PaymentForm>,
) -> Result<Response, AppError> {
    let cart = cart_service::load(&session).await?;
    // A closed widget can be reopened for the same order.
    let pending = if form.outcome == PaymentOutcome::Close {
        checkout_service::pending(&session).await?
    } else {
        checkout_service::take_pending(&session).await?
    };

    match checkout_service::resolve(pending, &cart, form.outcome) {
        Resolution::EmptyCart => {
            flash(&session, Flash::error(EMPTY_CART_MESSAGE)).await;
            Ok(Redirect::to("/cart").into_response())
        }
        Resolution::CartChanged => {
            warn!(
                user_id = %auth.user.id,
                outcome = ?form.outcome,
                "Payment callback for a different cart"
            );
            flash(&session, Flash::error(CART_CHANGED_MESSAGE)).await;
            Ok(Redirect::to("/cart").into_response())
        }
        Resolution::Submit(order) => {
            match checkout_service::submit(state.api(), &auth.token, &session, &order).await {
                Ok(()) => {
                    add_breadcrumb("checkout", "Purchase recorded", None);
                    flash(&session, Flash::success(PURCHASE_SUCCESS_MESSAGE)).await;
                    Ok(Redirect::to("/home").into_response())
                }
                Err(CheckoutError::Api(e)) => {
                    Ok(api_failure(&session, &e, PURCHASE_FALLBACK_MESSAGE, "/cart").await)
                }
                Err(e) => Err(e.into()),
            }
        }
        Resolution::Failed(order) => {
            warn!(user_id = %auth.user.id, total = %order.total(), "Payment failed");
            flash(&session, Flash::error(PAYMENT_FAILED_MESSAGE)).await;
            Ok(Redirect::to("/cart").into_response())
        }
        Resolution::Pending(_) => {
            info!("Payment widget closed");
            Ok(Redirect::to("/cart").into_response())
        }
    }
}
