//! # Domain Types
//!
//! Core domain types used throughout Meridian POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │ InventoryBatch  │   │    CartLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  product_id     │   │  product_id     │       │
//! │  │  hsn_code       │   │  batch_number   │   │  batch_number   │       │
//! │  │  price (incl.)  │   │  quantity       │   │  frozen snapshot│       │
//! │  │  tax_slab       │   │  expiry_date    │   │  quantity       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Rate       │   │   PromoCode     │   │    Invoice      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  code           │   │  header         │       │
//! │  │  1800 = 18%     │   │  discount       │   │  totals + lines │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A [`CartLine`] freezes the product fields it was created from. Catalog
//! edits after the line exists never change what the customer is billed.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Rate
// =============================================================================

/// A percentage rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1800 bps = 18% (the default GST slab), 1000 bps = a 10% promo.
///
/// One type covers tax slabs, item discounts, and promo discounts; the
/// arithmetic in [`Money`](crate::money::Money) is identical for all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rate(u32);

impl Rate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        Rate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

/// The tax slab applied when the catalog leaves one unset: 18%.
pub const DEFAULT_TAX_SLAB: Rate = Rate::from_bps(1800);

fn default_tax_slab() -> Rate {
    DEFAULT_TAX_SLAB
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product.
///
/// `price` is **tax inclusive**: the slab rate is backed out when the
/// invoice is priced, never added on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to the operator and on the invoice.
    pub name: String,

    /// HSN classification code printed on tax invoices.
    pub hsn_code: String,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Tax-inclusive unit price.
    pub price: Money,

    /// Default item discount applied when the product is added to a cart.
    #[serde(default)]
    pub discount: Rate,

    /// Tax slab; defaults to 18% when the catalog leaves it unset.
    #[serde(default = "default_tax_slab")]
    pub tax_slab: Rate,

    /// Category label (analgesics, beverages, ...).
    pub category: String,
}

// =============================================================================
// Inventory
// =============================================================================

/// A lot of one product sharing a batch number and expiry date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryBatch {
    pub product_id: String,
    pub batch_number: String,
    /// On-hand quantity, never negative.
    pub quantity: i64,
    pub expiry_date: NaiveDate,
}

impl InventoryBatch {
    /// Whether the batch can be issued against on the given day.
    ///
    /// Eligible = something left on the shelf and not past expiry.
    pub fn is_eligible(&self, as_of: NaiveDate) -> bool {
        self.quantity > 0 && self.expiry_date >= as_of
    }
}

/// All batches of one product, as reported by the inventory source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub product_id: String,
    pub batches: Vec<InventoryBatch>,
}

// =============================================================================
// Cart Line
// =============================================================================

/// An item in the cart, bound to a specific stock batch.
///
/// ## Identity
/// Uniquely keyed by `(product_id, batch_number)`: selecting the same
/// batch again increments the existing line instead of duplicating it.
///
/// ## Snapshot Fields
/// Everything except `quantity` is frozen at selection time and is never
/// re-fetched from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub batch_number: String,

    /// Product name at selection time (frozen).
    pub product_name: String,
    /// Category at selection time (frozen).
    pub category: String,
    /// HSN code at selection time (frozen).
    pub hsn_code: String,
    /// Barcode at selection time (frozen).
    pub barcode: Option<String>,
    /// Tax-inclusive unit price at selection time (frozen).
    pub unit_price: Money,
    /// Item discount at selection time (frozen).
    pub discount: Rate,
    /// Tax slab at selection time (frozen).
    pub tax_slab: Rate,

    /// Quantity issued from the bound batch.
    pub quantity: i64,
    /// Expiry date of the bound batch.
    pub expiry_date: NaiveDate,
}

impl CartLine {
    /// Creates a line with quantity 1 from a product and its bound batch.
    pub fn bind(product: &Product, batch: &InventoryBatch) -> Self {
        CartLine {
            product_id: product.id.clone(),
            batch_number: batch.batch_number.clone(),
            product_name: product.name.clone(),
            category: product.category.clone(),
            hsn_code: product.hsn_code.clone(),
            barcode: product.barcode.clone(),
            unit_price: product.price,
            discount: product.discount,
            tax_slab: product.tax_slab,
            quantity: 1,
            expiry_date: batch.expiry_date,
        }
    }

    /// Whether this line is bound to the given (product, batch) pair.
    pub fn is_for(&self, product_id: &str, batch_number: &str) -> bool {
        self.product_id == product_id && self.batch_number == batch_number
    }

    /// Line gross: tax-inclusive unit price × quantity.
    pub fn gross(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Promo Code
// =============================================================================

/// An externally-validated discount token.
///
/// Validity (active/expired/inactive/not-found) is resolved only by the
/// promo directory collaborator, never locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub code: String,
    pub discount: Rate,
    pub description: String,
}

// =============================================================================
// Payment Type
// =============================================================================

/// How the customer settled the invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Cash,
    Card,
    Upi,
}

impl Default for PaymentType {
    fn default() -> Self {
        PaymentType::Cash
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentType::Cash => write!(f, "Cash"),
            PaymentType::Card => write!(f, "Card"),
            PaymentType::Upi => write!(f, "UPI"),
        }
    }
}

// =============================================================================
// Tax Breakdown
// =============================================================================

/// How the aggregate tax decomposes across the invoice.
///
/// Modelled as a tagged variant instead of nullable cgst/sgst fields:
/// with one distinct slab the tax splits into intra-state twins, with
/// mixed slabs only the aggregate is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TaxBreakdown {
    /// Every line carries the same slab; tax splits into equal halves.
    Uniform { rate: Rate, cgst: Money, sgst: Money },
    /// Two or more distinct slabs; only the aggregate tax is reported.
    Mixed { tax: Money },
}

impl TaxBreakdown {
    /// True iff the lines carried two or more distinct tax slabs.
    pub const fn is_mixed(&self) -> bool {
        matches!(self, TaxBreakdown::Mixed { .. })
    }

    /// The CGST component (zero under mixed rates).
    pub const fn cgst(&self) -> Money {
        match self {
            TaxBreakdown::Uniform { cgst, .. } => *cgst,
            TaxBreakdown::Mixed { .. } => Money::zero(),
        }
    }

    /// The SGST component (zero under mixed rates).
    pub const fn sgst(&self) -> Money {
        match self {
            TaxBreakdown::Uniform { sgst, .. } => *sgst,
            TaxBreakdown::Mixed { .. } => Money::zero(),
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// Customer reference carried on the invoice header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRef {
    /// Stable id assigned by the customer directory.
    pub id: String,
    pub name: String,
    /// 10-digit mobile number, the directory's lookup key.
    pub mobile: String,
    pub email: Option<String>,
}

/// A line on a finalized invoice: the cart snapshot plus computed amounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    #[serde(flatten)]
    pub line: CartLine,

    /// Item discount taken off the gross.
    pub discount_amount: Money,
    /// Taxable base backed out of the final amount.
    pub base_value: Money,
    /// Tax backed out of the final amount.
    pub tax_amount: Money,
    /// CGST half (zero under mixed rates).
    pub cgst_amount: Money,
    /// SGST half (zero under mixed rates).
    pub sgst_amount: Money,
    /// Tax-inclusive amount the line contributes to the grand total.
    pub final_amount: Money,
}

/// Aggregate totals of one invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    /// Σ line gross (tax inclusive, before any discount).
    pub subtotal: Money,
    /// Σ per-item discounts.
    pub discount: Money,
    /// Promo discount taken off the post-item-discount amount.
    pub promo_discount: Money,
    /// Σ taxable bases.
    pub base_value: Money,
    /// Σ per-line tax.
    pub tax: Money,
    /// How the tax decomposes (uniform twins or aggregate-only).
    pub tax_breakdown: TaxBreakdown,
    /// The distinct tax slabs seen across lines, in bps.
    pub distinct_tax_rates: BTreeSet<u32>,
    /// What the customer pays.
    pub grand_total: Money,
    /// Loyalty coins accrued from the taxable base, capped per invoice.
    pub loyalty_coins: i64,
}

impl InvoiceTotals {
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

/// The finalized invoice aggregate.
///
/// ## Lifecycle
/// Created once at submission. Lines and totals are immutable afterwards;
/// only header fields (customer contact, payment type, remarks) may be
/// edited, through the invoice store's header patch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Invoice number, assigned by the persistence collaborator.
    pub number: String,
    pub date: DateTime<Utc>,
    pub customer: CustomerRef,
    pub payment_type: PaymentType,
    pub remarks: Option<String>,
    pub totals: InvoiceTotals,
    pub lines: Vec<InvoiceLine>,
}

// =============================================================================
// Unit Tests
// =============================================================================
