//! # Invoice Assembler
//!
//! The submission state machine: validates preconditions, resolves the
//! customer, computes totals, persists, then runs post-commit effects.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Submission State Machine                           │
//! │                                                                         │
//! │  Idle ──► Validating ──► ResolvingCustomer ──► Computing ──► Persisting │
//! │               │                  │                               │      │
//! │               ▼                  ▼                               ▼      │
//! │           Rejected           Rejected                        Completed  │
//! │        (bad input,       (directory down,                        │      │
//! │         stale stock)      duplicate email)                       ▼      │
//! │                                                           post-commit   │
//! │                                                           hooks (never  │
//! │                                                           block, never  │
//! │                                                           roll back)    │
//! │                                                                         │
//! │  No automatic retry anywhere. A Persisting failure aborts with no       │
//! │  partial state retained and the machine returns to Idle.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why Re-Validate Stock Here
//! No reservation is held on a batch between cart-edit and submission.
//! Another terminal may deplete the batch in the meantime, so quantities
//! are checked again against a *fresh* inventory snapshot before any
//! external side effect. This is the only optimistic re-validation in the
//! system.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use meridian_core::{
    loyalty::coins_earned,
    price_cart, select_product,
    validation::{validate_customer_name, validate_entity_id, validate_mobile, validate_quantity},
    Cart, CartTotals, CoreError, CustomerRef, InventoryItem, InventorySnapshot, Invoice,
    InvoiceLine, InvoiceTotals, PaymentType, Product, PromoCode, Selection, ValidationError,
};

use crate::collaborators::{
    CatalogSource, CustomerDirectory, InventorySource, InvoiceHeaderPatch, InvoiceStore,
    LoyaltyLedger, NewCustomer, PostCommitHook,
};
use crate::error::{CheckoutError, CheckoutResult};

// =============================================================================
// Inputs & Outputs
// =============================================================================

/// Customer fields as typed by the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub name: String,
    pub mobile: String,
    pub email: Option<String>,
}

/// Everything the operator supplies at submission besides the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub customer: CustomerDetails,
    pub payment_type: PaymentType,
    pub remarks: Option<String>,
}

/// What a successful submission hands back.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    /// The persisted invoice, number assigned by the store.
    pub invoice: Invoice,
    /// Non-fatal post-commit failures (hook name + message). The invoice
    /// above is committed regardless of anything in here.
    pub warnings: Vec<String>,
}

/// Where the assembler currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    Validating,
    ResolvingCustomer,
    Computing,
    Persisting,
    Completed,
    Rejected,
}

/// The collaborator set a shell wires the assembler with.
#[derive(Clone)]
pub struct Collaborators {
    pub inventory: Arc<dyn InventorySource>,
    pub catalog: Arc<dyn CatalogSource>,
    pub customers: Arc<dyn CustomerDirectory>,
    pub invoices: Arc<dyn InvoiceStore>,
    pub loyalty: Arc<dyn LoyaltyLedger>,
    pub post_commit: Vec<Arc<dyn PostCommitHook>>,
}

// =============================================================================
// Assembler
// =============================================================================

/// Composes and persists one invoice at a time.
///
/// Single-threaded, synchronous-per-invoice: the cart is not mutated
/// elsewhere while a submission runs.
pub struct Assembler {
    collaborators: Collaborators,
    state: CheckoutState,
}

impl Assembler {
    pub fn new(collaborators: Collaborators) -> Self {
        Assembler {
            collaborators,
            state: CheckoutState::Idle,
        }
    }

    /// Current position in the state machine.
    pub fn state(&self) -> CheckoutState {
        self.state
    }

    /// Resolves an operator's product pick into a FEFO batch selection.
    ///
    /// Looks the product up in the catalog, fetches its current batches,
    /// and returns either an auto-bound batch or a FEFO-ordered choice for
    /// the shell to present. Binding the chosen batch into the cart is a
    /// [`Cart::select_batch`] call on the caller's side.
    pub async fn pick_product(
        &self,
        product_id: &str,
        as_of: NaiveDate,
    ) -> CheckoutResult<(Product, Selection, InventorySnapshot)> {
        validate_entity_id("product id", product_id)?;

        let product = self
            .collaborators
            .catalog
            .product(product_id)
            .await?
            .ok_or_else(|| CheckoutError::UnknownProduct {
                product_id: product_id.to_string(),
            })?;

        let batches = self.collaborators.inventory.batches(product_id).await?;
        let snapshot = InventorySnapshot::from_items([InventoryItem {
            product_id: product_id.to_string(),
            batches,
        }]);

        let selection = select_product(&product, &snapshot, as_of)?;
        debug!(product = %product.id, "product pick resolved");
        Ok((product, selection, snapshot))
    }

    /// Submits the cart as an invoice.
    ///
    /// Preconditions (checked before any external side effect): at least
    /// one line; every line quantity ≥ 1 and within its batch's *current*
    /// availability; customer name non-empty; 10-digit mobile.
    ///
    /// On success the cart is cleared and the persisted invoice returned.
    /// On rejection nothing external has been touched.
    pub async fn submit(
        &mut self,
        draft: InvoiceDraft,
        cart: &mut Cart,
        promo: Option<&PromoCode>,
    ) -> CheckoutResult<CheckoutReceipt> {
        debug!(
            lines = cart.line_count(),
            promo = promo.map(|p| p.code.as_str()),
            "submitting invoice"
        );

        // --- Validating ------------------------------------------------------
        self.state = CheckoutState::Validating;
        if let Err(e) = self.validate(&draft, cart).await {
            self.state = CheckoutState::Rejected;
            return Err(e);
        }

        // --- ResolvingCustomer ----------------------------------------------
        self.state = CheckoutState::ResolvingCustomer;
        let customer = match self.resolve_customer(&draft.customer).await {
            Ok(c) => c,
            Err(e) => {
                self.state = CheckoutState::Rejected;
                return Err(e);
            }
        };

        // --- Computing -------------------------------------------------------
        self.state = CheckoutState::Computing;
        let totals = price_cart(cart.lines(), promo);
        let invoice = compose_invoice(&draft, customer, totals);

        // --- Persisting ------------------------------------------------------
        self.state = CheckoutState::Persisting;
        let invoice = match self.collaborators.invoices.create(invoice).await {
            Ok(stored) => stored,
            Err(e) => {
                // No partial state retained; the machine is reusable
                error!(error = %e, "invoice persistence failed");
                self.state = CheckoutState::Idle;
                return Err(e.into());
            }
        };

        info!(
            invoice = %invoice.number,
            grand_total = %invoice.totals.grand_total,
            coins = invoice.totals.loyalty_coins,
            "invoice created"
        );

        // --- Post-commit -----------------------------------------------------
        // Nothing past this point can fail the submission: the invoice is
        // already persisted.
        let mut warnings = Vec::new();

        if invoice.totals.loyalty_coins > 0 {
            if let Err(e) = self
                .collaborators
                .loyalty
                .credit(&invoice.customer.id, invoice.totals.loyalty_coins)
                .await
            {
                warn!(error = %e, customer = %invoice.customer.id, "loyalty credit failed");
                warnings.push(format!("loyalty credit failed: {}", e));
            }
        }

        for hook in &self.collaborators.post_commit {
            if let Err(e) = hook.run(&invoice).await {
                warn!(hook = hook.name(), error = %e, "post-commit hook failed");
                warnings.push(format!("{} failed: {}", hook.name(), e));
            }
        }

        cart.clear();
        self.state = CheckoutState::Completed;

        Ok(CheckoutReceipt { invoice, warnings })
    }

    /// Applies a header-only edit to an already-created invoice.
    pub async fn update_header(
        &self,
        invoice_number: &str,
        patch: InvoiceHeaderPatch,
    ) -> CheckoutResult<()> {
        debug!(invoice = invoice_number, "updating invoice header");
        self.collaborators
            .invoices
            .update(invoice_number, patch)
            .await?;
        Ok(())
    }

    /// Deletes an invoice by number.
    pub async fn delete_invoice(&self, invoice_number: &str) -> CheckoutResult<()> {
        debug!(invoice = invoice_number, "deleting invoice");
        self.collaborators.invoices.delete(invoice_number).await?;
        Ok(())
    }

    /// All submission preconditions, including stock re-validation against
    /// a fresh snapshot.
    async fn validate(&self, draft: &InvoiceDraft, cart: &Cart) -> CheckoutResult<()> {
        validate_customer_name(&draft.customer.name)?;
        validate_mobile(&draft.customer.mobile)?;

        if cart.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }

        let snapshot = self.fresh_snapshot(cart).await?;
        for line in cart.lines() {
            validate_quantity(line.quantity)?;

            let available = snapshot.available_quantity(&line.product_id, &line.batch_number);
            if line.quantity > available {
                debug!(
                    product = %line.product_id,
                    batch = %line.batch_number,
                    available,
                    requested = line.quantity,
                    "stale stock caught at submission"
                );
                return Err(CoreError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    batch_number: line.batch_number.clone(),
                    available,
                    requested: line.quantity,
                }
                .into());
            }
        }

        Ok(())
    }

    /// Re-fetches batches for every product in the cart.
    async fn fresh_snapshot(&self, cart: &Cart) -> CheckoutResult<InventorySnapshot> {
        let product_ids: BTreeSet<&str> =
            cart.lines().iter().map(|l| l.product_id.as_str()).collect();

        let mut snapshot = InventorySnapshot::new();
        for product_id in product_ids {
            let batches = self.collaborators.inventory.batches(product_id).await?;
            snapshot.insert(InventoryItem {
                product_id: product_id.to_string(),
                batches,
            });
        }
        Ok(snapshot)
    }

    /// Lookup-by-mobile, create-if-absent.
    async fn resolve_customer(&self, details: &CustomerDetails) -> CheckoutResult<CustomerRef> {
        if let Some(existing) = self
            .collaborators
            .customers
            .find_by_mobile(details.mobile.trim())
            .await?
        {
            debug!(customer = %existing.id, "reusing existing customer");
            return Ok(existing);
        }

        let created = self
            .collaborators
            .customers
            .create(NewCustomer {
                name: details.name.trim().to_string(),
                mobile: details.mobile.trim().to_string(),
                email: details.email.clone(),
            })
            .await?;
        debug!(customer = %created.id, "created new customer");
        Ok(created)
    }
}

// =============================================================================
// Invoice Composition
// =============================================================================

/// Builds the invoice aggregate from the priced totals and header fields.
///
/// The invoice number stays empty here; the store assigns it at create.
fn compose_invoice(draft: &InvoiceDraft, customer: CustomerRef, totals: CartTotals) -> Invoice {
    let loyalty_coins = coins_earned(totals.base_value);

    let lines: Vec<InvoiceLine> = totals
        .lines
        .into_iter()
        .map(|p| InvoiceLine {
            line: p.line,
            discount_amount: p.discount_amount,
            base_value: p.base_value,
            tax_amount: p.tax_amount,
            cgst_amount: p.cgst_amount,
            sgst_amount: p.sgst_amount,
            final_amount: p.final_amount,
        })
        .collect();

    Invoice {
        number: String::new(),
        date: Utc::now(),
        customer,
        payment_type: draft.payment_type,
        remarks: draft.remarks.clone(),
        totals: InvoiceTotals {
            subtotal: totals.subtotal,
            discount: totals.item_discount,
            promo_discount: totals.promo_discount,
            base_value: totals.base_value,
            tax: totals.tax,
            tax_breakdown: totals.tax_breakdown,
            distinct_tax_rates: totals.distinct_tax_rates,
            grand_total: totals.grand_total,
            loyalty_coins,
        },
        lines,
    }
}
