//! # Checkout Error Types
//!
//! Errors raised while orchestrating a submission.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow at Submission                             │
//! │                                                                         │
//! │  Validating ── bad input ────────► CheckoutError::Validation            │
//! │             ── stale quantities ──► CheckoutError::Stock                │
//! │                                                                         │
//! │  ResolvingCustomer / Persisting                                         │
//! │             ── collaborator down ─► CheckoutError::External(Network)    │
//! │             ── duplicate email ───► CheckoutError::External(Duplicate…) │
//! │                                                                         │
//! │  Promo validation is NEVER here: a rejected promo is informational      │
//! │  (PromoRejection) and submission proceeds with no promo applied.        │
//! │                                                                         │
//! │  Post-commit hooks NEVER produce a CheckoutError: their failures are    │
//! │  warnings on the receipt, the persisted invoice stands.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use meridian_core::{CoreError, ValidationError};

// =============================================================================
// External Error
// =============================================================================

/// A collaborator (network/storage) failure.
///
/// Any of these during submission aborts creation with no partial state
/// retained on our side.
#[derive(Debug, Error)]
pub enum ExternalError {
    /// The collaborator could not be reached.
    #[error("Collaborator unreachable: {0}")]
    Network(String),

    /// The collaborator reached storage but the operation failed.
    #[error("Storage operation failed: {0}")]
    Storage(String),

    /// Distinguished sub-case: the customer directory refused a create
    /// because the email is already taken.
    #[error("A customer with email '{email}' already exists")]
    DuplicateEmail { email: String },
}

// =============================================================================
// Checkout Error
// =============================================================================

/// Why a submission was rejected.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Operator input failed validation; nothing external was touched.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A stock rule was violated (typically stale quantities found by the
    /// submit-time re-validation); nothing external was touched.
    #[error("Stock error: {0}")]
    Stock(#[from] CoreError),

    /// The catalog has no product with the given id.
    #[error("Unknown product: {product_id}")]
    UnknownProduct { product_id: String },

    /// A collaborator failed; creation aborted.
    #[error("External failure: {0}")]
    External(#[from] ExternalError),
}

/// Convenience type alias for Results with CheckoutError.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Unit Tests
// =============================================================================
