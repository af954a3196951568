//! # Collaborator Contracts
//!
//! The traits through which the engine talks to the outside world. The
//! engine owns the math and the invariants; everything that touches a
//! network, a disk, or another terminal lives behind one of these.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Collaborators at a Glance                           │
//! │                                                                         │
//! │  InventorySource ──── fresh per-product batch lists (re-validation)     │
//! │  CatalogSource ────── product lookups for line binding                  │
//! │  CustomerDirectory ── lookup-by-mobile, create-if-absent                │
//! │  PromoDirectory ───── the ONLY authority on promo validity              │
//! │  InvoiceStore ─────── create / header-only update / delete             │
//! │  LoyaltyLedger ────── credit coins after commit                         │
//! │  PostCommitHook ───── receipts, outbound messages; never blocks        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All traits are `async` and object-safe so shells can hand in gRPC,
//! SQL, or in-memory fakes interchangeably.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use meridian_core::{
    CustomerRef, InventoryBatch, Invoice, PaymentType, Product, PromoCode,
};

use crate::error::ExternalError;

// =============================================================================
// Inventory & Catalog
// =============================================================================

/// Per-product batch lists, fetched fresh on demand.
///
/// No reservation is held between cart-edit and submission; the assembler
/// re-fetches through this trait at submit time to catch depletion by
/// another terminal.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// All batches of the product, including exhausted and expired ones.
    async fn batches(&self, product_id: &str) -> Result<Vec<InventoryBatch>, ExternalError>;
}

/// Catalog lookups for binding products into cart lines.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn product(&self, product_id: &str) -> Result<Option<Product>, ExternalError>;
}

// =============================================================================
// Customer Directory
// =============================================================================

/// A customer to be created in the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub mobile: String,
    pub email: Option<String>,
}

/// Lookup-by-mobile, create-if-absent; returns a stable customer id.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn find_by_mobile(&self, mobile: &str) -> Result<Option<CustomerRef>, ExternalError>;

    /// Creates the customer. A taken email fails with
    /// [`ExternalError::DuplicateEmail`].
    async fn create(&self, customer: NewCustomer) -> Result<CustomerRef, ExternalError>;
}

// =============================================================================
// Promo Directory
// =============================================================================

/// What the promo directory said about a code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "isValid")]
pub enum PromoValidation {
    /// The code is live; here is its discount.
    #[serde(rename = "true", rename_all = "camelCase")]
    Valid { promo_code: PromoCode },
    /// The code was refused; the message explains why in the directory's
    /// own words (classified locally into a stable category).
    #[serde(rename = "false")]
    Invalid { message: String },
}

/// The only authority on promo validity. Never consulted locally-cached.
#[async_trait]
pub trait PromoDirectory: Send + Sync {
    async fn validate(&self, code: &str) -> Result<PromoValidation, ExternalError>;
}

// =============================================================================
// Invoice Store
// =============================================================================

/// Header-only fields that may change after an invoice is created.
///
/// Line composition and totals are immutable post-creation; the store's
/// update surface is deliberately this narrow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceHeaderPatch {
    pub customer_mobile: Option<String>,
    pub customer_email: Option<String>,
    pub payment_type: Option<PaymentType>,
    pub remarks: Option<String>,
}

/// Invoice persistence.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Persists the invoice and assigns its invoice number.
    async fn create(&self, invoice: Invoice) -> Result<Invoice, ExternalError>;

    /// Applies a header-only patch to an existing invoice.
    async fn update(
        &self,
        invoice_number: &str,
        patch: InvoiceHeaderPatch,
    ) -> Result<(), ExternalError>;

    /// Removes an invoice by number.
    async fn delete(&self, invoice_number: &str) -> Result<(), ExternalError>;
}

// =============================================================================
// Loyalty & Post-Commit
// =============================================================================

/// Credits accrued coins to the customer's ledger.
#[async_trait]
pub trait LoyaltyLedger: Send + Sync {
    async fn credit(&self, customer_id: &str, coins: i64) -> Result<(), ExternalError>;
}

/// A side effect to run after successful persistence: document
/// generation, outbound messaging. Failure is reported on the receipt and
/// never rolls back the committed invoice.
#[async_trait]
pub trait PostCommitHook: Send + Sync {
    /// Short name used in log lines and warnings ("receipt-pdf", "sms").
    fn name(&self) -> &str;

    async fn run(&self, invoice: &Invoice) -> Result<(), ExternalError>;
}

// =============================================================================
// Unit Tests
// =============================================================================
