//! Checkout: the cart summary, starting payment, and acting on its outcome.
//!
//! An order moves `pending -> success | failed`; closing the widget leaves it
//! pending. Opening the widget snapshots the cart as the pending order, and
//! the widget's callback only acts while the cart still matches that
//! snapshot. Only a successful payment reaches the backend, and only a
//! confirmed purchase empties the cart.

use secrecy::SecretString;
use thiserror::Error;
use tower_sessions::Session;
use tracing::{info, instrument};

use samaan_kinam_core::{Cart, Price, ProductId, PurchaseOrder};

use crate::api::{ApiClient, ApiError};
use crate::models::session_keys;
use crate::services::cart;
use crate::services::payment::{PaymentGateway, PaymentOutcome, WidgetConfig};

pub const PURCHASE_SUCCESS_MESSAGE: &str = "Purchase successfully!";
pub const PAYMENT_FAILED_MESSAGE: &str = "Payment failed!";
pub const EMPTY_CART_MESSAGE: &str = "No product in the purchase cart";
pub const GATEWAY_UNAVAILABLE_MESSAGE: &str = "Online payment is currently unavailable.";
pub const PURCHASE_FALLBACK_MESSAGE: &str = "The purchase could not be completed.";
pub const CART_CHANGED_MESSAGE: &str =
    "Your cart changed since the payment started. Please, start the payment again.";

/// Errors while recording a paid order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("purchase failed: {0}")]
    Api(#[from] ApiError),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

// =============================================================================
// Summary
// =============================================================================

/// One line of the cart table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Price,
    pub line_price: Price,
}

/// Everything the cart page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub rows: Vec<SummaryRow>,
    pub total: Price,
    pub item_count: u64,
    /// The pay button is only offered for a non-empty cart.
    pub checkout_enabled: bool,
    pub disclaimer: Option<String>,
}

impl CheckoutSummary {
    #[must_use]
    pub fn new(cart: &Cart, gateway: &PaymentGateway) -> Self {
        let rows = cart
            .items()
            .iter()
            .map(|line| SummaryRow {
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                quantity: line.quantity.get(),
                unit_price: line.unit_price,
                line_price: line.line_total(),
            })
            .collect();
        let total = cart.total();
        let checkout_enabled = cart.can_checkout();

        Self {
            rows,
            total,
            item_count: cart.item_count(),
            checkout_enabled,
            disclaimer: checkout_enabled
                .then(|| gateway.disclaimer(total))
                .flatten(),
        }
    }
}

// =============================================================================
// Initiation
// =============================================================================

/// Result of pressing "Pay and Purchase Now".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Initiation {
    /// Nothing to pay for.
    EmptyCart,
    /// No gateway configured; nothing else happens.
    GatewayUnavailable,
    /// Open the widget with this configuration.
    Ready(WidgetConfig),
}

#[must_use]
pub fn initiate(cart: &Cart, gateway: &PaymentGateway) -> Initiation {
    if !cart.can_checkout() {
        return Initiation::EmptyCart;
    }
    gateway
        .widget(cart.total())
        .map_or(Initiation::GatewayUnavailable, Initiation::Ready)
}

/// Remember the order the widget is about to charge for.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn begin(
    session: &Session,
    cart: &Cart,
) -> Result<PurchaseOrder, tower_sessions::session::Error> {
    let order = PurchaseOrder::from_cart(cart);
    session.insert(session_keys::PENDING_ORDER, &order).await?;
    Ok(order)
}

/// The order opened by [`begin`], left in place.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn pending(
    session: &Session,
) -> Result<Option<PurchaseOrder>, tower_sessions::session::Error> {
    session.get(session_keys::PENDING_ORDER).await
}

/// The order opened by [`begin`], removed so no later callback can reuse it.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn take_pending(
    session: &Session,
) -> Result<Option<PurchaseOrder>, tower_sessions::session::Error> {
    session.remove(session_keys::PENDING_ORDER).await
}

// =============================================================================
// Outcome
// =============================================================================

/// What to do with the order once the widget reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The cart emptied while the widget was open.
    EmptyCart,
    /// No payment was started, or the cart changed after it was.
    CartChanged,
    /// Paid: send the order to the backend.
    Submit(PurchaseOrder),
    /// Payment failed: tell the user, keep the cart.
    Failed(PurchaseOrder),
    /// Widget closed: order stays pending, nothing happens.
    Pending(PurchaseOrder),
}

/// Decide what the widget's `outcome` means for the `pending` order.
///
/// The order is taken from the snapshot made when payment started, and is
/// only honoured while `cart` holds exactly the same lines.
#[must_use]
pub fn resolve(
    pending: Option<PurchaseOrder>,
    cart: &Cart,
    outcome: PaymentOutcome,
) -> Resolution {
    if !cart.can_checkout() {
        return Resolution::EmptyCart;
    }

    let Some(mut order) = pending.filter(|order| order.items == cart.items()) else {
        return Resolution::CartChanged;
    };
    match outcome {
        PaymentOutcome::Success => {
            order.mark_success();
            Resolution::Submit(order)
        }
        PaymentOutcome::Error => {
            order.mark_failed();
            Resolution::Failed(order)
        }
        PaymentOutcome::Close => Resolution::Pending(order),
    }
}

/// Record a paid order and empty the cart.
///
/// The cart is cleared only after the backend confirms the purchase.
///
/// # Errors
///
/// Returns [`CheckoutError::Api`] if the backend rejects the order; the cart
/// is untouched in that case.
#[instrument(skip_all, fields(lines = order.items.len(), total = %order.total()))]
pub async fn submit(
    api: &ApiClient,
    token: &SecretString,
    session: &Session,
    order: &PurchaseOrder,
) -> Result<(), CheckoutError> {
    api.purchase(token, order).await?;
    cart::clear(session).await?;
    info!("Purchase recorded");
    Ok(())
}
