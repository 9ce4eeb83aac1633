//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are Nepalese rupees. The backend exchanges them as JSON numbers, so
//! serialization writes a number while deserialization accepts either a number
//! or a decimal string.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::Quantity;

/// A rupee amount.
///
/// ```
/// use rust_decimal::Decimal;
/// use samaan_kinam_core::{Price, Quantity};
///
/// let unit = Price::from_rupees(100);
/// let line = unit.times(Quantity::new(2).unwrap());
/// assert_eq!(line, Price::from_rupees(200));
/// assert_eq!(line.to_string(), "Rs 200");
/// assert_eq!(line.to_paisa(), 20_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(serialize_with = "rust_decimal::serde::float::serialize")] Decimal);

impl Price {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price from a decimal rupee amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole number of rupees.
    #[must_use]
    pub fn from_rupees(rupees: i64) -> Self {
        Self(Decimal::from(rupees))
    }

    /// The decimal rupee amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        Self(self.0 * Decimal::from(quantity.get()))
    }

    /// Amount in paisa (1/100 rupee), rounded half away from zero.
    ///
    /// Payment gateways take amounts in minor units. Returns `i64::MAX` for
    /// amounts that do not fit, which no real cart reaches.
    #[must_use]
    pub fn to_paisa(&self) -> i64 {
        use rust_decimal::RoundingStrategy;
        use rust_decimal::prelude::ToPrimitive;

        (self.0 * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(i64::MAX)
    }

    /// Whether the amount is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rs {}", self.0.round_dp(2).normalize())
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_display_drops_trailing_zeros() {
        assert_eq!(Price::from_rupees(250).to_string(), "Rs 250");
        let price = Price::new(Decimal::from_str("99.50").unwrap());
        assert_eq!(price.to_string(), "Rs 99.5");
    }

    #[test]
    fn test_to_paisa_rounds() {
        let price = Price::new(Decimal::from_str("10.005").unwrap());
        assert_eq!(price.to_paisa(), 1001);
    }

    #[test]
    fn test_sum() {
        let total: Price = [Price::from_rupees(200), Price::from_rupees(50)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_rupees(250));
    }

    #[test]
    fn test_serializes_as_json_number() {
        let json = serde_json::to_string(&Price::from_rupees(100)).unwrap();
        assert_eq!(json, "100.0");
    }

    #[test]
    fn test_deserializes_number_or_string() {
        let from_number: Price = serde_json::from_str("49.99").unwrap();
        let from_string: Price = serde_json::from_str("\"49.99\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_number.amount(), Decimal::from_str("49.99").unwrap());
    }
}
