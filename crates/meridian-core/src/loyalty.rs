//! # Loyalty Accrual
//!
//! Reward coins earned per invoice, derived from the taxable base.
//!
//! One coin per whole ₹100 of post-discount, pre-tax value, capped per
//! invoice. A pure function of the aggregate base; crediting the coins to
//! the customer's ledger is a collaborator concern.

use crate::money::Money;

/// One coin per this much taxable base (₹100).
pub const COIN_DIVISOR: Money = Money::from_rupees(100);

/// Most coins a single invoice can earn.
pub const MAX_COINS_PER_INVOICE: i64 = 50;

/// Coins earned from the aggregate taxable base.
///
/// `coins = min(floor(base / ₹100), 50)`. Negative or sub-₹100 bases earn
/// nothing.
///
/// ## Example
/// ```rust
/// use meridian_core::loyalty::coins_earned;
/// use meridian_core::money::Money;
///
/// assert_eq!(coins_earned(Money::from_cents(73400)), 7);   // ₹734.00
/// assert_eq!(coins_earned(Money::from_cents(543210)), 50); // ₹5432.10, capped
/// ```
pub fn coins_earned(base_value: Money) -> i64 {
    if !base_value.is_positive() {
        return 0;
    }

    (base_value.cents() / COIN_DIVISOR.cents()).min(MAX_COINS_PER_INVOICE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_per_hundred_rupees() {
        assert_eq!(coins_earned(Money::from_cents(73400)), 7); // ₹734
        assert_eq!(coins_earned(Money::from_cents(79999)), 7); // ₹799.99 still 7
        assert_eq!(coins_earned(Money::from_cents(10000)), 1); // exactly ₹100
        assert_eq!(coins_earned(Money::from_cents(9999)), 0);  // ₹99.99
    }

    #[test]
    fn test_cap_at_fifty() {
        assert_eq!(coins_earned(Money::from_cents(543210)), 50); // ₹5432.10
        assert_eq!(coins_earned(Money::from_cents(500000)), 50); // exactly at cap
        assert_eq!(coins_earned(Money::from_cents(499999)), 49); // just under
        assert_eq!(coins_earned(Money::from_rupees(1_000_000)), 50);
    }

    #[test]
    fn test_zero_and_negative_earn_nothing() {
        assert_eq!(coins_earned(Money::zero()), 0);
        assert_eq!(coins_earned(Money::from_cents(-100)), 0);
    }
}
