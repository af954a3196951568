//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A 40-line invoice accumulates that error 40 times, and the GST         │
//! │  back-out (final / 1.18) amplifies it further.                          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    ₹118.00 = 11800 paise. All arithmetic is exact integer math with     │
//! │    i128 intermediates; rounding happens in exactly one place per        │
//! │    operation (half-up), never silently.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use meridian_core::money::Money;
//! use meridian_core::types::Rate;
//!
//! // Create from paise (preferred)
//! let price = Money::from_cents(11800); // ₹118.00, tax inclusive
//!
//! // A 10% portion of it
//! let promo = price.portion(Rate::from_bps(1000));
//! assert_eq!(promo.cents(), 1180);
//!
//! // Back out the 18% tax baked into the price
//! let base = price.excluding(Rate::from_bps(1800));
//! assert_eq!(base.cents(), 10000); // ₹100.00
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::Rate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (paise).
///
/// ## Design Decisions
/// - **i64 (signed)**: discounts and tax back-outs subtract, refunds negate
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Derives**: full serde support, ordering for totals comparisons
///
/// Unit prices in this system are *tax inclusive*: the slab rate is backed
/// out of the final amount, never added on top. See [`Money::excluding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Takes a percentage portion of this amount, rounding half-up.
    ///
    /// This is the single primitive behind item discounts and promo
    /// discounts: `₹1180.00.portion(10%) = ₹118.00`.
    ///
    /// ## Implementation
    /// Integer math with an i128 intermediate to prevent overflow:
    /// `(cents × bps + 5000) / 10000`. The +5000 provides half-up rounding.
    pub fn portion(&self, rate: Rate) -> Money {
        let cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(cents as i64)
    }

    /// Subtracts a percentage portion, rounding the portion half-up.
    ///
    /// `less(rate)` and `portion(rate)` always reconcile:
    /// `amount == amount.less(r) + amount.portion(r)` for any rate.
    pub fn less(&self, rate: Rate) -> Money {
        *self - self.portion(rate)
    }

    /// Backs the given rate out of a tax-inclusive amount.
    ///
    /// Prices carry their slab rate baked in, so the taxable base is
    /// `final / (1 + rate)`, computed as `cents × 10000 / (10000 + bps)`
    /// with half-up rounding. The tax itself is `amount - base`.
    ///
    /// ## Example
    /// ```rust
    /// use meridian_core::money::Money;
    /// use meridian_core::types::Rate;
    ///
    /// let line_final = Money::from_cents(118000); // ₹1180.00 incl. 18%
    /// let base = line_final.excluding(Rate::from_bps(1800));
    /// assert_eq!(base.cents(), 100000);           // ₹1000.00
    /// assert_eq!((line_final - base).cents(), 18000); // ₹180.00 tax
    /// ```
    pub fn excluding(&self, rate: Rate) -> Money {
        let divisor = 10000 + rate.bps() as i128;
        let cents = (self.0 as i128 * 10000 + divisor / 2) / divisor;
        Money::from_cents(cents as i64)
    }

    /// Multiplies by a quantity (line gross = unit price × quantity).
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Splits the amount into two halves whose sum is exact.
    ///
    /// Used for the CGST/SGST twin components of a single-rate tax:
    /// the first half is floored, the second absorbs the odd paisa.
    pub const fn split_halves(&self) -> (Money, Money) {
        let first = self.0 / 2;
        (Money(first), Money(self.0 - first))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// For debugging and log lines. Receipt rendering is an external
/// collaborator concern and does its own localized formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.cents_part())
    }
}

/// Default money is zero.
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
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Summation over line amounts without intermediate rounding.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
