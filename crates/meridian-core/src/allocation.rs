//! # Inventory Batch Allocation
//!
//! FEFO (First-Expire-First-Out) batch selection and the cart that issues
//! against it.
//!
//! ## Allocation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Batch Allocation Flow                               │
//! │                                                                         │
//! │  Operator picks product                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  select_product(product, snapshot, today)                               │
//! │       │                                                                 │
//! │       ├── 0 eligible batches ──► NoStock { AllExpired | Exhausted }     │
//! │       │                                                                 │
//! │       ├── 1 eligible batch ───► Selection::AutoBind(batch)              │
//! │       │                                                                 │
//! │       └── 2+ eligible ────────► Selection::Choice(batches, FEFO order)  │
//! │                                  (which batch is a UI-local decision)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cart.select_batch(product, batch)                                      │
//! │       ├── line exists ──► quantity += 1 (bounded by availability)       │
//! │       └── new line ─────► snapshot of product fields, quantity 1        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariant
//! A cart line's quantity never exceeds the available (quantity > 0,
//! non-expired) quantity of its bound batch. Every mutation here either
//! upholds that or fails leaving the cart unchanged.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult, StockOutReason};
use crate::types::{CartLine, InventoryBatch, InventoryItem, Product};
use crate::validation::{validate_quantity, validate_rate_bps};

// =============================================================================
// Inventory Snapshot
// =============================================================================

/// A point-in-time view of on-hand stock, keyed by product.
///
/// The engine never mutates inventory; it only reads a snapshot handed in
/// by the inventory source. Depletion by another terminal shows up as a
/// *fresh* snapshot at submission time, which is why quantities are
/// re-validated there.
#[derive(Debug, Clone, Default)]
pub struct InventorySnapshot {
    items: HashMap<String, Vec<InventoryBatch>>,
}

impl InventorySnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from per-product inventory items.
    pub fn from_items(items: impl IntoIterator<Item = InventoryItem>) -> Self {
        let mut snapshot = Self::new();
        for item in items {
            snapshot.insert(item);
        }
        snapshot
    }

    /// Inserts (or replaces) the batches of one product.
    pub fn insert(&mut self, item: InventoryItem) {
        self.items.insert(item.product_id, item.batches);
    }

    /// Eligible batches of a product in FEFO order.
    ///
    /// Filters to quantity > 0 and expiry ≥ `as_of`, sorted ascending by
    /// expiry date (earliest-expiring first), ties broken by batch number
    /// for determinism. Empty for an unknown product or when everything
    /// is exhausted or expired.
    pub fn available_batches(&self, product_id: &str, as_of: NaiveDate) -> Vec<InventoryBatch> {
        let mut eligible: Vec<InventoryBatch> = self
            .items
            .get(product_id)
            .map(|batches| {
                batches
                    .iter()
                    .filter(|b| b.is_eligible(as_of))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        eligible.sort_by(|a, b| {
            a.expiry_date
                .cmp(&b.expiry_date)
                .then_with(|| a.batch_number.cmp(&b.batch_number))
        });
        eligible
    }

    /// On-hand quantity of a specific batch, or 0 if absent.
    pub fn available_quantity(&self, product_id: &str, batch_number: &str) -> i64 {
        self.items
            .get(product_id)
            .and_then(|batches| batches.iter().find(|b| b.batch_number == batch_number))
            .map(|b| b.quantity)
            .unwrap_or(0)
    }
}

// =============================================================================
// Product Selection
// =============================================================================

/// Outcome of picking a product for the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Exactly one eligible batch: bind it without asking.
    AutoBind(InventoryBatch),
    /// Several eligible batches, FEFO-ordered: the caller chooses.
    Choice(Vec<InventoryBatch>),
}

/// Resolves which batch(es) a product can be issued from.
///
/// Zero eligible batches is an error, and the reason matters: stock that
/// exists but is entirely past expiry is reported as `AllExpired`, an
/// unknown product or all-zero quantities as `Exhausted`.
pub fn select_product(
    product: &Product,
    snapshot: &InventorySnapshot,
    as_of: NaiveDate,
) -> CoreResult<Selection> {
    let mut eligible = snapshot.available_batches(&product.id, as_of);

    match eligible.len() {
        0 => {
            let has_stock_on_hand = snapshot
                .items
                .get(&product.id)
                .map(|batches| batches.iter().any(|b| b.quantity > 0))
                .unwrap_or(false);

            let reason = if has_stock_on_hand {
                // Quantity exists somewhere, so the filter dropped it on expiry
                StockOutReason::AllExpired
            } else {
                StockOutReason::Exhausted
            };

            Err(CoreError::NoStock {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                reason,
            })
        }
        1 => Ok(Selection::AutoBind(eligible.remove(0))),
        _ => Ok(Selection::Choice(eligible)),
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The in-progress cart.
///
/// ## Invariants
/// - Lines are unique by (product_id, batch_number); re-selecting the same
///   batch increments the existing line.
/// - Every quantity satisfies `1 ≤ qty ≤ available_quantity(batch)` against
///   the snapshot the mutation was validated with.
/// - A failed mutation leaves the cart exactly as it was.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// The lines, in the order they were first added.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct (product, batch) lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Issues one unit from the given batch.
    ///
    /// ## Behavior
    /// - Line for (product, batch) exists: quantity += 1, failing with
    ///   `InsufficientStock` if that would exceed the batch's availability.
    /// - Otherwise: a new line with quantity 1 and a frozen snapshot of the
    ///   product fields.
    pub fn select_batch(
        &mut self,
        product: &Product,
        batch: &InventoryBatch,
        snapshot: &InventorySnapshot,
    ) -> CoreResult<()> {
        // The rates about to be frozen into the line must be sane; a
        // discount above 100% would price the cart negative downstream
        validate_rate_bps(product.discount.bps())?;
        validate_rate_bps(product.tax_slab.bps())?;

        let available = snapshot.available_quantity(&product.id, &batch.batch_number);

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.is_for(&product.id, &batch.batch_number))
        {
            let requested = line.quantity + 1;
            if requested > available {
                return Err(CoreError::InsufficientStock {
                    product_id: product.id.clone(),
                    batch_number: batch.batch_number.clone(),
                    available,
                    requested,
                });
            }
            line.quantity = requested;
            return Ok(());
        }

        if available < 1 {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                batch_number: batch.batch_number.clone(),
                available,
                requested: 1,
            });
        }

        self.lines.push(CartLine::bind(product, batch));
        Ok(())
    }

    /// Sets the quantity of an existing line.
    ///
    /// Requires `1 ≤ new_quantity ≤ available_quantity(batch)`. On any
    /// violation the line is left unchanged.
    pub fn update_quantity(
        &mut self,
        product_id: &str,
        batch_number: &str,
        new_quantity: i64,
        snapshot: &InventorySnapshot,
    ) -> CoreResult<()> {
        validate_quantity(new_quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.is_for(product_id, batch_number))
            .ok_or_else(|| CoreError::LineNotFound {
                product_id: product_id.to_string(),
                batch_number: batch_number.to_string(),
            })?;

        let available = snapshot.available_quantity(product_id, batch_number);
        if new_quantity > available {
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                batch_number: batch_number.to_string(),
                available,
                requested: new_quantity,
            });
        }

        line.quantity = new_quantity;
        Ok(())
    }

    /// Removes the line for the given (product, batch) pair.
    pub fn remove_line(&mut self, product_id: &str, batch_number: &str) -> CoreResult<()> {
        let initial_len = self.lines.len();
        self.lines.retain(|l| !l.is_for(product_id, batch_number));

        if self.lines.len() == initial_len {
            Err(CoreError::LineNotFound {
                product_id: product_id.to_string(),
                batch_number: batch_number.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Clears all lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
