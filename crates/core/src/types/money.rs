//! Decimal money amounts.
//!
//! The marketplace API prices everything in a single currency and serializes
//! amounts as decimal strings (`"19.99"`). [`Money`] keeps them as
//! [`Decimal`] so nothing is lost to floating point on the client.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount in the marketplace currency.
///
/// Deserializes from either a decimal string or a JSON number and always
/// serializes back as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero amount, used when no snapshot is available.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from a number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true for a zero amount.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0.round_dp(2))
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl std::str::FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str_exact(s.trim()).map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimal_places() {
        assert_eq!(Money::from_cents(1999).to_string(), "$19.99");
        assert_eq!("5".parse::<Money>().unwrap().to_string(), "$5.00");
    }

    #[test]
    fn test_deserialize_from_string_and_number() {
        let from_str: Money = serde_json::from_str("\"149.50\"").unwrap();
        let from_num: Money = serde_json::from_str("149.5").unwrap();
        assert_eq!(from_str, from_num);
    }

    #[test]
    fn test_default_is_zero() {
        assert!(Money::default().is_zero());
        assert_eq!(Money::default(), Money::ZERO);
    }
}
