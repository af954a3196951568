//! # Meridian Checkout
//!
//! Orchestration layer of the Meridian POS engine: wires the pure pricing
//! and allocation core to the outside world and drives an invoice from
//! cart to committed record.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        meridian-checkout                                │
//! │                                                                         │
//! │   ┌──────────────┐      ┌──────────────┐      ┌──────────────┐         │
//! │   │  PromoSlot   │      │  Assembler   │      │ export/import│         │
//! │   │ (validation  │      │ (submission  │      │  (tabular    │         │
//! │   │  lifecycle)  │      │state machine)│      │  round-trip) │         │
//! │   └──────┬───────┘      └──────┬───────┘      └──────────────┘         │
//! │          │                     │                                        │
//! │          ▼                     ▼                                        │
//! │   ┌─────────────────────────────────────────────────────────┐          │
//! │   │            collaborator traits (async)                  │          │
//! │   │  InventorySource · CatalogSource · CustomerDirectory    │          │
//! │   │  PromoDirectory · InvoiceStore · LoyaltyLedger          │          │
//! │   │  PostCommitHook                                         │          │
//! │   └─────────────────────────────────────────────────────────┘          │
//! │                                                                         │
//! │   All math lives in meridian-core; nothing here rounds money.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod assembler;
pub mod collaborators;
pub mod error;
pub mod export;
pub mod promo;

pub use assembler::{
    Assembler, CheckoutReceipt, CheckoutState, Collaborators, CustomerDetails, InvoiceDraft,
};
pub use collaborators::{
    CatalogSource, CustomerDirectory, InventorySource, InvoiceHeaderPatch, InvoiceStore,
    LoyaltyLedger, NewCustomer, PostCommitHook, PromoDirectory, PromoValidation,
};
pub use error::{CheckoutError, CheckoutResult, ExternalError};
pub use export::{export_invoices, import_invoices, ExportError, ImportResult};
pub use promo::{classify_rejection, PromoRejection, PromoResolution, PromoSlot, ValidationTicket};
