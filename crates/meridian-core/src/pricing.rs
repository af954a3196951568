//! # Discount / Promo / Tax Pricing
//!
//! The invoice pricing pipeline: a pure function from cart lines and an
//! optional promo to a fully decomposed set of totals. No hidden state,
//! no I/O, deterministic for any input.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pricing Pipeline                                 │
//! │                                                                         │
//! │  per line    gross = unit_price × qty        (unit price tax-inclusive) │
//! │              discount = gross × discount%                               │
//! │              net = gross − discount                                     │
//! │                                                                         │
//! │  aggregate   subtotal = Σ gross                                         │
//! │              after = Σ net                                              │
//! │              promo = after × promo%          (applied exactly once)     │
//! │              grand_total = after − promo                                │
//! │                                                                         │
//! │  allocate    line_final ∝ net / after        (Σ final == grand, exact)  │
//! │                                                                         │
//! │  back out    base = final / (1 + slab%)                                 │
//! │              tax = final − base                                         │
//! │                                                                         │
//! │  decompose   one slab  → cgst = sgst = tax / 2                          │
//! │              2+ slabs  → cgst = sgst = 0, aggregate tax only            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Numeric Policy
//! Everything is integer paise. Sums accumulate without intermediate
//! rounding; divisions round half-up in exactly one place each. The promo
//! allocation uses cumulative flooring so the line finals always sum to
//! the grand total exactly, with no stray paisa.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{CartLine, PromoCode, Rate, TaxBreakdown};

// =============================================================================
// Priced Line
// =============================================================================

/// One cart line with every computed amount of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    /// The cart snapshot this was computed from.
    #[serde(flatten)]
    pub line: CartLine,

    /// unit_price × quantity, tax inclusive.
    pub gross: Money,
    /// Item discount taken off the gross.
    pub discount_amount: Money,
    /// Gross less the item discount.
    pub net: Money,
    /// Net with the promo allocated proportionally; what the line
    /// contributes to the grand total.
    pub final_amount: Money,
    /// Taxable base backed out of the final amount.
    pub base_value: Money,
    /// Tax backed out of the final amount.
    pub tax_amount: Money,
    /// CGST half of the line tax (zero under mixed rates).
    pub cgst_amount: Money,
    /// SGST half of the line tax (zero under mixed rates).
    pub sgst_amount: Money,
}

// =============================================================================
// Cart Totals
// =============================================================================

/// The decomposed totals of a priced cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    /// Σ line gross.
    pub subtotal: Money,
    /// Σ per-item discounts.
    pub item_discount: Money,
    /// subtotal − item_discount.
    pub after_item_discounts: Money,
    /// Promo taken off the post-item-discount amount (0 without a promo).
    pub promo_discount: Money,
    /// after_item_discounts − promo_discount; what the customer pays.
    pub grand_total: Money,
    /// Σ taxable bases.
    pub base_value: Money,
    /// Σ per-line tax.
    pub tax: Money,
    /// Uniform twins or aggregate-only, depending on the slabs seen.
    pub tax_breakdown: TaxBreakdown,
    /// Distinct tax slabs across lines, in bps.
    pub distinct_tax_rates: BTreeSet<u32>,
    /// Per-line decomposition, in cart order.
    pub lines: Vec<PricedLine>,
}

impl CartTotals {
    /// True iff the lines carried two or more distinct tax slabs.
    pub fn has_mixed_tax_rates(&self) -> bool {
        self.tax_breakdown.is_mixed()
    }

    /// The CGST component (zero under mixed rates).
    pub fn cgst(&self) -> Money {
        self.tax_breakdown.cgst()
    }

    /// The SGST component (zero under mixed rates).
    pub fn sgst(&self) -> Money {
        self.tax_breakdown.sgst()
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// Prices a cart: `(lines, promo) → totals`.
///
/// The only entry point of the pipeline. Stateless by design so the
/// conservation laws can be property-tested directly.
///
/// ## Discount Stacking Order
/// Item discounts first, then the promo on what remains. The promo is
/// applied exactly once, never compounded with itself.
///
/// ## Edge Cases
/// - Empty cart: every total is zero, breakdown is uniform at rate 0.
/// - `after_item_discounts == 0` (fully discounted cart): every
///   `final_amount` is defined as 0 rather than dividing by zero.
pub fn price_cart(lines: &[CartLine], promo: Option<&PromoCode>) -> CartTotals {
    // Per-line gross / discount / net, accumulated without rounding
    let gross: Vec<Money> = lines.iter().map(CartLine::gross).collect();
    let discount: Vec<Money> = lines
        .iter()
        .zip(&gross)
        .map(|(line, g)| g.portion(line.discount))
        .collect();
    let net: Vec<Money> = gross.iter().zip(&discount).map(|(g, d)| *g - *d).collect();

    let subtotal: Money = gross.iter().copied().sum();
    let item_discount: Money = discount.iter().copied().sum();
    let after_item_discounts: Money = net.iter().copied().sum();

    // Promo applies once, to the post-item-discount amount
    let promo_discount = match promo {
        Some(p) => after_item_discounts.portion(p.discount),
        None => Money::zero(),
    };
    let grand_total = after_item_discounts - promo_discount;

    let finals = allocate_proportionally(&net, after_item_discounts, grand_total);

    let distinct_tax_rates: BTreeSet<u32> =
        lines.iter().map(|l| l.tax_slab.bps()).collect();
    let uniform = distinct_tax_rates.len() <= 1;

    // Back tax out of each tax-inclusive final amount
    let mut priced = Vec::with_capacity(lines.len());
    let mut base_value = Money::zero();
    let mut tax = Money::zero();

    for (i, line) in lines.iter().enumerate() {
        let final_amount = finals[i];
        let line_base = final_amount.excluding(line.tax_slab);
        let line_tax = final_amount - line_base;

        let (cgst_amount, sgst_amount) = if uniform {
            line_tax.split_halves()
        } else {
            (Money::zero(), Money::zero())
        };

        base_value += line_base;
        tax += line_tax;

        priced.push(PricedLine {
            line: line.clone(),
            gross: gross[i],
            discount_amount: discount[i],
            net: net[i],
            final_amount,
            base_value: line_base,
            tax_amount: line_tax,
            cgst_amount,
            sgst_amount,
        });
    }

    let tax_breakdown = if uniform {
        let rate = distinct_tax_rates
            .iter()
            .next()
            .map(|bps| Rate::from_bps(*bps))
            .unwrap_or_default();
        let (cgst, sgst) = tax.split_halves();
        TaxBreakdown::Uniform { rate, cgst, sgst }
    } else {
        TaxBreakdown::Mixed { tax }
    };

    CartTotals {
        subtotal,
        item_discount,
        after_item_discounts,
        promo_discount,
        grand_total,
        base_value,
        tax,
        tax_breakdown,
        distinct_tax_rates,
        lines: priced,
    }
}

/// Distributes `target` across lines in proportion to their net amounts.
///
/// Cumulative flooring: line i receives
/// `floor(target × cum_net(i) / total_net) − floor(target × cum_net(i-1) / total_net)`,
/// so the allocations sum to `target` exactly and each line is within one
/// paisa of its exact proportional share. All-zero when `total_net` is 0.
fn allocate_proportionally(net: &[Money], total_net: Money, target: Money) -> Vec<Money> {
    if total_net.is_zero() {
        return vec![Money::zero(); net.len()];
    }

    let total = total_net.cents() as i128;
    let target = target.cents() as i128;

    let mut allocations = Vec::with_capacity(net.len());
    let mut cum_net: i128 = 0;
    let mut allocated: i128 = 0;

    for n in net {
        cum_net += n.cents() as i128;
        let cum_alloc = target * cum_net / total;
        allocations.push(Money::from_cents((cum_alloc - allocated) as i64));
        allocated = cum_alloc;
    }

    allocations
}

// =============================================================================
// Unit Tests
// =============================================================================
