//! Khalti payment widget configuration.
//!
//! The storefront never talks to Khalti itself. It renders the widget with a
//! configuration and receives the widget's outcome (`success`, `error`,
//! `close`) back as a form post. Verifying the payment is the backend's job.

use serde::{Deserialize, Serialize};

use samaan_kinam_core::Price;

use crate::config::PaymentConfig;

/// Merchant product identity sent to the widget.
pub const PRODUCT_IDENTITY: &str = "1234567890";

/// Merchant product name sent to the widget.
pub const PRODUCT_NAME: &str = "Samaan Kinam E-commerce";

/// Payment methods offered in the widget, in display order.
pub const PAYMENT_PREFERENCE: &[&str] = &["KHALTI", "EBANKING", "MOBILE_BANKING", "CONNECT_IPS", "SCT"];

/// Configured payment gateway.
#[derive(Debug, Clone)]
pub struct PaymentGateway {
    public_key: Option<String>,
    test_mode: bool,
    test_ceiling: Price,
    product_url: String,
}

impl PaymentGateway {
    /// Build the gateway from configuration. `product_url` is the storefront's
    /// public URL.
    #[must_use]
    pub fn new(config: &PaymentConfig, product_url: impl Into<String>) -> Self {
        Self {
            public_key: config.khalti_public_key.clone(),
            test_mode: config.test_mode,
            test_ceiling: config.test_ceiling,
            product_url: product_url.into(),
        }
    }

    /// Online payment needs a configured public key.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.public_key.is_some()
    }

    /// Whether the sandbox ceiling reduces what is charged for `total`.
    #[must_use]
    pub fn caps(&self, total: Price) -> bool {
        self.test_mode && self.test_ceiling < total
    }

    /// Amount actually charged for a cart `total`.
    #[must_use]
    pub fn charge_amount(&self, total: Price) -> Price {
        if self.caps(total) {
            self.test_ceiling
        } else {
            total
        }
    }

    /// Note shown under the cart when the charged amount differs from the total.
    #[must_use]
    pub fn disclaimer(&self, total: Price) -> Option<String> {
        self.caps(total).then(|| {
            format!(
                "Note: {total}/- is equivalent to {} because of Khalti test-mode payment limitation.",
                self.test_ceiling
            )
        })
    }

    /// Widget configuration for a cart `total`, or `None` when disabled.
    #[must_use]
    pub fn widget(&self, total: Price) -> Option<WidgetConfig> {
        let public_key = self.public_key.clone()?;
        Some(WidgetConfig {
            public_key,
            product_identity: PRODUCT_IDENTITY,
            product_name: PRODUCT_NAME,
            product_url: self.product_url.clone(),
            payment_preference: PAYMENT_PREFERENCE,
            amount: self.charge_amount(total).to_paisa(),
        })
    }
}

/// Configuration handed to the Khalti checkout script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    pub public_key: String,
    pub product_identity: &'static str,
    pub product_name: &'static str,
    pub product_url: String,
    pub payment_preference: &'static [&'static str],
    /// Amount in paisa.
    pub amount: i64,
}

/// What the widget reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Success,
    Error,
    Close,
}
