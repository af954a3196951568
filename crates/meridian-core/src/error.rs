//! # Error Types
//!
//! Domain-specific error types for meridian-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  meridian-core errors (this file)                                       │
//! │  ├── CoreError        - Stock and cart rule violations                  │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  meridian-checkout errors (separate crate)                              │
//! │  ├── ExternalError    - Collaborator (network/storage) failures         │
//! │  └── CheckoutError    - Submission failures, wraps the above            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product, batch, quantities)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Stock-Out Reason
// =============================================================================

/// Why a product has no eligible batch to issue from.
///
/// "Everything expired" and "nothing on the shelf" are reported
/// distinctly; the operator reacts differently to each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOutReason {
    /// Stock exists but every batch is past its expiry date.
    AllExpired,
    /// Every batch has zero quantity (or the product is unknown).
    Exhausted,
}

impl std::fmt::Display for StockOutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockOutReason::AllExpired => write!(f, "all batches expired"),
            StockOutReason::Exhausted => write!(f, "no stock on hand"),
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations. The cart is left unchanged
/// whenever one of these is returned.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No batch of the product can be issued against.
    #[error("No sellable stock for {product_name}: {reason}")]
    NoStock {
        product_id: String,
        product_name: String,
        reason: StockOutReason,
    },

    /// Requested quantity exceeds what the bound batch has on hand.
    ///
    /// Raised both at add-time and at submit-time re-validation; the line
    /// (if any) is left unmodified.
    #[error(
        "Insufficient stock for {product_id} batch {batch_number}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        batch_number: String,
        available: i64,
        requested: i64,
    },

    /// No cart line exists for the (product, batch) pair.
    #[error("No cart line for {product_id} batch {batch_number}")]
    LineNotFound {
        product_id: String,
        batch_number: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when operator input doesn't meet requirements. Used for
/// early validation before business logic runs, and again at submission.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Invalid format (e.g., non-numeric mobile number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// The cart has no lines to invoice.
    #[error("Cart is empty")]
    EmptyCart,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
