//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Split tender in floating point:                                        │
//! │    30.60 - 20.00 = 10.600000000000001  ❌ WRONG!                        │
//! │                                                                         │
//! │  The ERP then rejects the payment entry because the allocated amount    │
//! │  exceeds the invoice outstanding by a fraction of a cent.               │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    3060 - 2000 = 1060 cents, exactly                                    │
//! │    Conversion to decimal happens once, at the wire boundary            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kopi_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(1099); // $10.99
//!
//! // Arithmetic operations
//! let doubled = price * 2;            // $21.98
//! let total = price + Money::from_cents(500); // $15.99
//! assert_eq!(total.cents(), 1599);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::DiscountRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: change can be negative (underpayment)
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: serde support, serialized as cents
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  OrderLine.rate × qty ──► Order.net_total ──► discounted total          │
/// │                                                  │                      │
/// │  Tender.amount ──► total received ──► change ◄───┤                      │
/// │                                                  ▼                      │
/// │                                     Allocation plan ──► Payment Entry   │
/// │                                                                         │
/// │  EVERY monetary value in the checkout flows through this type          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use kopi_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a decimal currency amount into cents, rounding to the
    /// nearest cent: `round(amount * 100)`.
    ///
    /// This is the ONLY place a float becomes Money. It exists because the
    /// ERP reports amounts as JSON decimals and operators type them in;
    /// everything downstream stays integral.
    ///
    /// ## Example
    /// ```rust
    /// use kopi_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_units(30.6).cents(), 3060);
    /// assert_eq!(Money::from_major_units(10.005).cents(), 1001);
    /// assert_eq!(Money::from_major_units(f64::NAN).cents(), 0);
    /// ```
    pub fn from_major_units(amount: f64) -> Self {
        if !amount.is_finite() {
            return Money::zero();
        }
        // Nudge by a tiny epsilon so that 10.005 (stored as 10.00499…) rounds up.
        let scaled = amount * 100.0;
        let nudged = scaled + scaled.signum() * 1e-7;
        Money(nudged.round() as i64)
    }

    /// Returns the value as decimal currency units (for the ERP wire format).
    ///
    /// ## Example
    /// ```rust
    /// use kopi_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(3060).to_major_units(), 30.6);
    /// ```
    #[inline]
    pub fn to_major_units(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
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

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use kopi_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(450); // $4.50 kopi
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 1350);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns the discount amount for a percentage rate, rounded half-up
    /// to the nearest cent.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`
    pub fn discount_amount(&self, rate: DiscountRate) -> Money {
        let bps = rate.bps() as i128;
        let amount = self.0 as i128;
        let discount = if amount >= 0 {
            (amount * bps + 5000) / 10000
        } else {
            -((-amount * bps + 5000) / 10000)
        };
        Money(discount as i64)
    }

    /// Applies a percentage discount and returns the discounted total.
    ///
    /// `discounted = net - net * d / 100`
    ///
    /// ## Example
    /// ```rust
    /// use kopi_core::money::Money;
    /// use kopi_core::types::DiscountRate;
    ///
    /// let net = Money::from_cents(3400); // $34.00
    /// let due = net.apply_discount(DiscountRate::from_percentage(10.0));
    /// assert_eq!(due.cents(), 3060); // $30.60
    /// ```
    ///
    /// ## User Workflow
    /// ```text
    /// Order net total: $34.00
    ///      │
    ///      ▼
    /// Cashier enables discount, types 10
    ///      │
    ///      ▼
    /// apply_discount(10%) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Amount due: $30.60 (authoritative for change + allocation)
    /// ```
    pub fn apply_discount(&self, rate: DiscountRate) -> Money {
        *self - self.discount_amount(rate)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
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

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
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
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(3060)), "$30.60");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_major_units_round_trip_boundary() {
        assert_eq!(Money::from_major_units(34.0).cents(), 3400);
        assert_eq!(Money::from_major_units(10.6).cents(), 1060);
        assert_eq!(Money::from_major_units(0.1 + 0.2).cents(), 30);
        assert_eq!(Money::from_major_units(-5.5).cents(), -550);
        assert_eq!(Money::from_major_units(f64::INFINITY).cents(), 0);
        assert_eq!(Money::from_cents(1060).to_major_units(), 10.6);
    }

    #[test]
    fn test_discount_zero_is_identity() {
        let net = Money::from_cents(3400);
        assert_eq!(net.apply_discount(DiscountRate::zero()), net);
    }

    #[test]
    fn test_discount_full_is_zero() {
        let net = Money::from_cents(3400);
        assert!(net.apply_discount(DiscountRate::from_percentage(100.0)).is_zero());
    }

    #[test]
    fn test_discount_matches_formula_across_rates() {
        // discounted(T, d) = T - T*d/100, to the cent
        for net_cents in [0_i64, 1, 99, 3400, 12345, 999_999] {
            for pct in [0.0, 2.5, 10.0, 33.33, 50.0, 99.99, 100.0] {
                let net = Money::from_cents(net_cents);
                let got = net.apply_discount(DiscountRate::from_percentage(pct));
                let expected = net_cents as f64 - net_cents as f64 * pct / 100.0;
                assert!(
                    (got.cents() as f64 - expected).abs() <= 0.5 + 1e-9,
                    "net={net_cents} pct={pct} got={} expected={expected}",
                    got.cents()
                );
            }
        }
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::from_cents(2000), Money::from_cents(1060)]
            .iter()
            .sum();
        assert_eq!(total.cents(), 3060);
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
        assert_eq!(Money::from_cents(-100).abs().cents(), 100);
    }
}
