//! The purchase cart.
//!
//! A cart is an ordered list of line items. Totals are always computed from
//! the current lines; nothing derived is stored, so a total can never go
//! stale after the cart changes.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// Errors from cart mutations and quantity parsing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Quantity must be a positive integer.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// The product is not in the cart.
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),

    /// Adding would overflow the line quantity.
    #[error("quantity is too large")]
    QuantityOverflow,
}

/// A positive number of units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// One unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ZeroQuantity`] for zero.
    pub fn new(value: u32) -> Result<Self, CartError> {
        NonZeroU32::new(value)
            .map(Self)
            .ok_or(CartError::ZeroQuantity)
    }

    /// The number of units.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    fn checked_add(self, other: Self) -> Result<Self, CartError> {
        self.0
            .checked_add(other.get())
            .map(Self)
            .ok_or(CartError::QuantityOverflow)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One product selected for purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Backend product id. Serialized as `id` to match the purchase payload.
    #[serde(rename = "id")]
    pub product_id: ProductId,
    /// Product name at the time it was added.
    pub name: String,
    /// Unit price at the time it was added.
    #[serde(rename = "price")]
    pub unit_price: Price,
    /// Number of units.
    pub quantity: Quantity,
}

impl CartLineItem {
    /// Price of this line (unit price × quantity).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// Ordered sequence of line items pending purchase.
///
/// ```
/// use samaan_kinam_core::{Cart, CartLineItem, Price, ProductId, Quantity};
///
/// let mut cart = Cart::default();
/// assert!(!cart.can_checkout());
///
/// cart.add(CartLineItem {
///     product_id: ProductId::new("a"),
///     name: "Tea".into(),
///     unit_price: Price::from_rupees(100),
///     quantity: Quantity::new(2).unwrap(),
/// }).unwrap();
/// cart.add(CartLineItem {
///     product_id: ProductId::new("b"),
///     name: "Honey".into(),
///     unit_price: Price::from_rupees(50),
///     quantity: Quantity::ONE,
/// }).unwrap();
///
/// assert_eq!(cart.total(), Price::from_rupees(250));
/// assert!(cart.can_checkout());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    /// Create a cart from existing lines.
    #[must_use]
    pub const fn from_items(items: Vec<CartLineItem>) -> Self {
        Self { items }
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Add a line.
    ///
    /// If the product is already in the cart its quantity grows and the line
    /// keeps its position; otherwise the line is appended.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityOverflow`] if the merged quantity does not
    /// fit. The cart is left unchanged in that case.
    pub fn add(&mut self, item: CartLineItem) -> Result<(), CartError> {
        if let Some(line) = self.line_mut(&item.product_id) {
            line.quantity = line.quantity.checked_add(item.quantity)?;
        } else {
            self.items.push(item);
        }
        Ok(())
    }

    /// Replace the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if no line has this product.
    pub fn set_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<(), CartError> {
        let line = self
            .line_mut(product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.clone()))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove the line for a product and return it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if no line has this product.
    pub fn remove(&mut self, product_id: &ProductId) -> Result<CartLineItem, CartError> {
        let index = self
            .position(product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.clone()))?;
        Ok(self.items.remove(index))
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total price: Σ unit price × quantity over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    /// Checkout is only possible with at least one line.
    #[must_use]
    pub fn can_checkout(&self) -> bool {
        !self.is_empty()
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLineItem> {
        self.items
            .iter_mut()
            .find(|line| &line.product_id == product_id)
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|line| &line.product_id == product_id)
    }
}
