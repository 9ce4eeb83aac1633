//! Purchase orders built at checkout.

use serde::{Deserialize, Serialize};

use super::cart::{Cart, CartLineItem};
use super::price::Price;

/// Payment state of a purchase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Payment not attempted yet, or the payment widget was closed.
    #[default]
    Pending,
    /// The gateway reported a successful payment.
    Success,
    /// The gateway reported an error.
    Failed,
}

/// The order submitted to the backend once payment succeeds.
///
/// Built from a snapshot of the cart at checkout time and kept in the session
/// only until the payment widget reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    /// Snapshot of the cart lines.
    pub items: Vec<CartLineItem>,
    /// Payment state.
    pub payment: PaymentStatus,
}

impl PurchaseOrder {
    /// Start a pending order from the current cart.
    #[must_use]
    pub fn from_cart(cart: &Cart) -> Self {
        Self {
            items: cart.items().to_vec(),
            payment: PaymentStatus::Pending,
        }
    }

    /// Total price of the order.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Record a successful payment.
    pub fn mark_success(&mut self) {
        self.payment = PaymentStatus::Success;
    }

    /// Record a failed payment.
    pub fn mark_failed(&mut self) {
        self.payment = PaymentStatus::Failed;
    }

    /// Only paid orders are sent to the backend.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment == PaymentStatus::Success
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{Price, ProductId, Quantity};

    fn cart() -> Cart {
        Cart::from_items(vec![CartLineItem {
            product_id: ProductId::new("p1"),
            name: "Dhaka topi".to_string(),
            unit_price: Price::from_rupees(100),
            quantity: Quantity::new(2).unwrap(),
        }])
    }

    #[test]
    fn test_new_order_is_pending() {
        let order = PurchaseOrder::from_cart(&cart());
        assert_eq!(order.payment, PaymentStatus::Pending);
        assert!(!order.is_paid());
        assert_eq!(order.total(), Price::from_rupees(200));
    }

    #[test]
    fn test_status_transitions() {
        let mut order = PurchaseOrder::from_cart(&cart());
        order.mark_failed();
        assert_eq!(order.payment, PaymentStatus::Failed);
        order.mark_success();
        assert!(order.is_paid());
    }

    #[test]
    fn test_serialized_payload_shape() {
        let mut order = PurchaseOrder::from_cart(&cart());
        order.mark_success();
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["payment"], "success");
        assert_eq!(json["items"][0]["id"], "p1");
        assert_eq!(json["items"][0]["quantity"], 2);
    }
}
