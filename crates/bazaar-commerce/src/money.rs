//! Money type for representing rupee amounts.
//!
//! Amounts are held as integer paise to avoid floating-point drift in
//! totals. On the wire they are plain decimal numbers (`499.5`), which is
//! what API clients send and expect.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Paise per rupee.
const MINOR_PER_MAJOR: i64 = 100;

/// A monetary value in paise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Create a Money value from paise.
    pub const fn from_paise(paise: i64) -> Self {
        Self(paise)
    }

    /// Create a Money value from a decimal rupee amount, rounding to the
    /// nearest paisa.
    ///
    /// ```
    /// use bazaar_commerce::money::Money;
    /// let price = Money::from_decimal(49.99);
    /// assert_eq!(price.paise(), 4999);
    /// ```
    pub fn from_decimal(amount: f64) -> Self {
        Self((amount * MINOR_PER_MAJOR as f64).round() as i64)
    }

    /// Zero rupees.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Amount in paise.
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Amount as a decimal rupee value.
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / MINOR_PER_MAJOR as f64
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Add, returning `None` on overflow.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Subtract, returning `None` on overflow.
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Multiply by a quantity, returning `None` on overflow.
    pub fn checked_mul(self, factor: i64) -> Option<Money> {
        self.0.checked_mul(factor).map(Money)
    }

    /// Calculate a percentage of this amount, rounded to the nearest paisa.
    pub fn percentage(&self, percent: f64) -> Money {
        Money((self.0 as f64 * percent / 100.0).round() as i64)
    }

    /// The smaller of two amounts.
    pub fn min(self, other: Money) -> Money {
        Money(self.0.min(other.0))
    }

    /// Sum amounts, returning `None` on overflow.
    pub fn checked_sum(iter: impl IntoIterator<Item = Money>) -> Option<Money> {
        iter.into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Format as a display string (e.g., "₹49.99").
    pub fn display(&self) -> String {
        format!("\u{20b9}{:.2}", self.to_decimal())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        if !amount.is_finite() {
            return Err(serde::de::Error::custom("amount must be a finite number"));
        }
        Ok(Money::from_decimal(amount))
    }
}
