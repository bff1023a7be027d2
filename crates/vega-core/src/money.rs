//! # Money Module
//!
//! Provides the `Money` type used by every amount in the engine.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE DRIFT PROBLEM                                                      │
//! │                                                                         │
//! │  Layaway paid in floats:                                                │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │    ten installments later the balance is 0.0000000001, never 0         │
//! │    and the layaway never transitions to PAID.                          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every amount is an i64 count of cents. Rounding happens once,       │
//! │    where a percentage is applied (tax, discount), never afterwards.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use vega_core::money::Money;
//!
//! let price = Money::from_cents(10_000); // 100.00
//! let line = price.multiply_quantity(2); // 200.00
//! assert_eq!(line.percentage(1000).cents(), 2_000); // 10% of 200.00
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

/// Basis points in 100%.
const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: cash differences can be negative (drawer short)
/// - **Single field tuple struct**: zero-cost wrapper over i64
///
/// ## Where Money Flows
/// ```text
/// CartLine.unit_price ──► line subtotal ──► Totals.subtotal
///                                               │
///                     Totals.tax ◄── TaxRate ───┤
///                Totals.discount ◄── Promotion ─┘
///                                               │
///                Totals.total ──► Payment.amount ──► CashSession.expected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use vega_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole units and cents.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    ///
    /// This is the `max(0, ...)` in `total = max(0, subtotal + tax - discount)`.
    #[inline]
    pub const fn floor_zero(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Returns `bps` basis points of this amount, rounded half up to the cent.
    ///
    /// Uses i128 so large totals cannot overflow mid-computation.
    ///
    /// ```rust
    /// use vega_core::money::Money;
    ///
    /// // 10% of 200.00
    /// assert_eq!(Money::from_cents(20_000).percentage(1000).cents(), 2_000);
    /// // 8.25% of 10.00 = 0.825 → 0.83
    /// assert_eq!(Money::from_cents(1_000).percentage(825).cents(), 83);
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        let raw = self.0 as i128 * bps as i128;
        let half = BPS_SCALE / 2;
        let rounded = if raw >= 0 {
            (raw + half) / BPS_SCALE
        } else {
            (raw - half) / BPS_SCALE
        };
        Money(rounded as i64)
    }

    /// Calculates tax on this amount at the given rate.
    ///
    /// ```rust
    /// use vega_core::money::Money;
    /// use vega_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(20_000);
    /// assert_eq!(subtotal.calculate_tax(TaxRate::from_bps(1600)).cents(), 3_200);
    /// ```
    #[inline]
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.percentage(rate.bps())
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented rendering ("232.00", "-5.50"). The register UI formats
/// with its own currency settings.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Money(cents)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(23_200).to_string(), "232.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(15_000);
        let b = Money::from_cents(7_500);

        assert_eq!((a + b).cents(), 22_500);
        assert_eq!((a - b).cents(), 7_500);
        assert_eq!((b * 2).cents(), 15_000);

        let total: Money = vec![a, b, Money::from_cents(50_000)].into_iter().sum();
        assert_eq!(total.cents(), 72_500);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 16% of 200.00
        assert_eq!(Money::from_cents(20_000).percentage(1600).cents(), 3_200);
        // 8.25% of 10.00 = 82.5 cents → 83
        assert_eq!(Money::from_cents(1_000).percentage(825).cents(), 83);
        // 10% of 0.04 = 0.4 cents → 0
        assert_eq!(Money::from_cents(4).percentage(1000).cents(), 0);
        // Symmetric for negatives
        assert_eq!(Money::from_cents(-1_000).percentage(825).cents(), -83);
    }

    #[test]
    fn test_floor_zero() {
        assert_eq!(Money::from_cents(-1).floor_zero(), Money::zero());
        assert_eq!(Money::from_cents(12).floor_zero().cents(), 12);
    }

    /// Repeated partial payments never drift.
    #[test]
    fn test_installments_reach_exact_zero() {
        let total = Money::from_cents(100_000);
        let mut balance = total;
        for _ in 0..10 {
            balance -= Money::from_cents(10_000);
        }
        assert!(balance.is_zero());
    }
}
