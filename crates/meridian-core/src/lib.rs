//! # meridian-core: Pure Business Logic for Meridian POS
//!
//! This crate is the **heart** of Meridian POS. It contains the invoice
//! pricing and inventory-allocation engine as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Meridian POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │         Shell (UI forms, invoice screens, print layout)         │   │
//! │  │                        — external —                             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                meridian-checkout (orchestration)                │   │
//! │  │   collaborator traits • assembler state machine • CSV I/O       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ meridian-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ allocation │  │  pricing  │  │   │
//! │  │   │  Product  │  │   Money   │  │ FEFO, Cart │  │ price_cart│  │   │
//! │  │   │  Invoice  │  │   Rate    │  │ Selection  │  │ TaxSplit  │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, InventoryBatch, CartLine, Invoice)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`allocation`] - FEFO batch selection and the cart
//! - [`pricing`] - The discount/promo/tax decomposition pipeline
//! - [`loyalty`] - Reward-coin accrual
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same cart in, same invoice out — always
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are in paise (i64), rates in bps
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use meridian_core::money::Money;
//! use meridian_core::types::Rate;
//!
//! // Tax-inclusive price: back the 18% slab out of it
//! let price = Money::from_cents(11800); // ₹118.00
//! let base = price.excluding(Rate::from_bps(1800));
//! assert_eq!(base.cents(), 10000); // ₹100.00
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod error;
pub mod loyalty;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use meridian_core::Money` instead of
// `use meridian_core::money::Money`

pub use allocation::{select_product, Cart, InventorySnapshot, Selection};
pub use error::{CoreError, CoreResult, StockOutReason, ValidationError};
pub use money::Money;
pub use pricing::{price_cart, CartTotals, PricedLine};
pub use types::*;
