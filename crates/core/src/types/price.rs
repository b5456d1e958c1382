//! Type-safe price representation using decimal arithmetic.
//!
//! Amounts are Mongolian tögrög. The backend serializes prices as plain
//! JSON numbers, so the wrapper is `#[serde(transparent)]` over a
//! [`Decimal`].

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount in tögrög.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole tögrög amount.
    #[must_use]
    pub fn from_tugrik(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Line total: this unit price multiplied by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Price {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}₮", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let unit = Price::from_tugrik(5000);
        assert_eq!(unit.times(3), Price::from_tugrik(15_000));
    }

    #[test]
    fn test_sum() {
        let total: Price = [Price::from_tugrik(5000), Price::from_tugrik(2500)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_tugrik(7500));
    }

    #[test]
    fn test_wire_form_is_a_number() {
        let json = serde_json::to_string(&Price::from_tugrik(5000)).unwrap();
        assert_eq!(json, "5000.0");

        let parsed: Price = serde_json::from_str("15000").unwrap();
        assert_eq!(parsed, Price::from_tugrik(15_000));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_tugrik(5000).to_string(), "5000₮");
    }
}
