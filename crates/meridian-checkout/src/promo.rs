//! # Promo Application
//!
//! Local state for an externally-validated promo code.
//!
//! ## Rules
//! - The promo directory is the only authority on validity; nothing is
//!   decided locally.
//! - At most one validation is in flight at a time: starting a new one
//!   supersedes the old, and a superseded resolution is discarded when it
//!   lands. The last successful resolution wins.
//! - The slot transitions Applied/Cleared only *after* a validation
//!   resolves — never while one is pending.
//! - A rejected code is informational, never fatal: the cart simply prices
//!   with no promo.
//! - Clearing an applied promo drops its discount to zero; totals are
//!   recomputed by pricing the cart again.

use tracing::debug;

use meridian_core::PromoCode;

use crate::collaborators::{PromoDirectory, PromoValidation};
use crate::error::ExternalError;

// =============================================================================
// Rejection Classification
// =============================================================================

/// Stable categories distilled from the directory's free-text refusal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoRejection {
    /// No such code exists.
    NotFound,
    /// The code existed but its validity window has passed.
    Expired,
    /// The code exists but has been switched off.
    Inactive,
    /// The code itself is malformed.
    Malformed,
    /// Anything the directory said that fits no known category.
    Other(String),
}

impl std::fmt::Display for PromoRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromoRejection::NotFound => write!(f, "promo code not found"),
            PromoRejection::Expired => write!(f, "promo code expired"),
            PromoRejection::Inactive => write!(f, "promo code inactive"),
            PromoRejection::Malformed => write!(f, "promo code malformed"),
            PromoRejection::Other(msg) => write!(f, "promo rejected: {}", msg),
        }
    }
}

/// Maps the directory's message onto a stable category.
///
/// The directory speaks free text; downstream code should branch on a
/// category, not on substrings. Matching is case-insensitive and ordered
/// from most to least specific.
pub fn classify_rejection(message: &str) -> PromoRejection {
    let lower = message.to_lowercase();

    if lower.contains("not found") || lower.contains("no such") || lower.contains("unknown") {
        PromoRejection::NotFound
    } else if lower.contains("expired") {
        PromoRejection::Expired
    } else if lower.contains("inactive") || lower.contains("disabled") {
        PromoRejection::Inactive
    } else if lower.contains("malformed") || lower.contains("invalid") {
        PromoRejection::Malformed
    } else {
        PromoRejection::Other(message.to_string())
    }
}

// =============================================================================
// Promo Slot
// =============================================================================

/// A ticket identifying one in-flight validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationTicket(u64);

/// Outcome of resolving a validation against the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoResolution {
    /// The code was valid and is now the applied promo.
    Applied(PromoCode),
    /// The code was refused; no promo is applied.
    Rejected(PromoRejection),
    /// A newer validation superseded this one; nothing changed.
    Stale,
}

/// The at-most-one promo applied to the in-progress invoice.
#[derive(Debug, Default)]
pub struct PromoSlot {
    applied: Option<PromoCode>,
    generation: u64,
}

impl PromoSlot {
    /// An empty slot with no promo applied.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently applied promo, if any.
    pub fn applied(&self) -> Option<&PromoCode> {
        self.applied.as_ref()
    }

    /// Starts a validation, superseding any still in flight.
    ///
    /// The returned ticket must be handed back to [`PromoSlot::resolve`];
    /// only the ticket from the most recent `begin_validation` call can
    /// still change the slot.
    pub fn begin_validation(&mut self) -> ValidationTicket {
        self.generation += 1;
        ValidationTicket(self.generation)
    }

    /// Applies the directory's answer, unless a newer validation has
    /// superseded this ticket.
    pub fn resolve(
        &mut self,
        ticket: ValidationTicket,
        validation: PromoValidation,
    ) -> PromoResolution {
        if ticket.0 != self.generation {
            debug!(ticket = ticket.0, current = self.generation, "stale promo resolution dropped");
            return PromoResolution::Stale;
        }

        match validation {
            PromoValidation::Valid { promo_code } => {
                self.applied = Some(promo_code.clone());
                PromoResolution::Applied(promo_code)
            }
            PromoValidation::Invalid { message } => {
                let rejection = classify_rejection(&message);
                debug!(%rejection, "promo rejected by directory");
                PromoResolution::Rejected(rejection)
            }
        }
    }

    /// Validates a code against the directory and applies the outcome.
    ///
    /// Convenience wrapper over begin/resolve for callers that await the
    /// directory inline. A directory transport failure is an
    /// [`ExternalError`]; a *refusal* is a normal [`PromoResolution`].
    pub async fn validate_and_apply(
        &mut self,
        code: &str,
        directory: &dyn PromoDirectory,
    ) -> Result<PromoResolution, ExternalError> {
        let ticket = self.begin_validation();
        let validation = directory.validate(code).await?;
        Ok(self.resolve(ticket, validation))
    }

    /// Removes the applied promo; the promo discount drops to zero.
    pub fn clear(&mut self) {
        self.applied = None;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::types::Rate;

    fn festive() -> PromoCode {
        PromoCode {
            code: "FESTIVE10".to_string(),
            discount: Rate::from_bps(1000),
            description: "Festive season offer".to_string(),
        }
    }

    #[test]
    fn test_classification_categories() {
        assert_eq!(classify_rejection("Promo code not found"), PromoRejection::NotFound);
        assert_eq!(classify_rejection("No such code"), PromoRejection::NotFound);
        assert_eq!(classify_rejection("This code has EXPIRED"), PromoRejection::Expired);
        assert_eq!(classify_rejection("Code is inactive"), PromoRejection::Inactive);
        assert_eq!(classify_rejection("code disabled by admin"), PromoRejection::Inactive);
        assert_eq!(classify_rejection("Invalid promo code format"), PromoRejection::Malformed);
        assert_eq!(
            classify_rejection("quota exceeded for today"),
            PromoRejection::Other("quota exceeded for today".to_string())
        );
    }

    #[test]
    fn test_resolve_applies_valid_code() {
        let mut slot = PromoSlot::new();
        let ticket = slot.begin_validation();

        let outcome = slot.resolve(ticket, PromoValidation::Valid { promo_code: festive() });
        assert_eq!(outcome, PromoResolution::Applied(festive()));
        assert_eq!(slot.applied(), Some(&festive()));
    }

    #[test]
    fn test_rejection_leaves_slot_empty() {
        let mut slot = PromoSlot::new();
        let ticket = slot.begin_validation();

        let outcome = slot.resolve(
            ticket,
            PromoValidation::Invalid { message: "code expired last week".into() },
        );
        assert_eq!(outcome, PromoResolution::Rejected(PromoRejection::Expired));
        assert!(slot.applied().is_none());
    }

    #[test]
    fn test_stale_resolution_is_discarded() {
        let mut slot = PromoSlot::new();

        let first = slot.begin_validation();
        let second = slot.begin_validation(); // supersedes `first`

        // The superseded validation lands late with a valid code: dropped
        let outcome = slot.resolve(first, PromoValidation::Valid { promo_code: festive() });
        assert_eq!(outcome, PromoResolution::Stale);
        assert!(slot.applied().is_none());

        // The current one wins
        let outcome = slot.resolve(second, PromoValidation::Valid { promo_code: festive() });
        assert!(matches!(outcome, PromoResolution::Applied(_)));
        assert!(slot.applied().is_some());
    }

    #[test]
    fn test_last_successful_resolution_wins() {
        let mut slot = PromoSlot::new();

        let t1 = slot.begin_validation();
        slot.resolve(t1, PromoValidation::Valid { promo_code: festive() });

        let other = PromoCode {
            code: "WELCOME5".to_string(),
            discount: Rate::from_bps(500),
            description: "Welcome offer".to_string(),
        };
        let t2 = slot.begin_validation();
        slot.resolve(t2, PromoValidation::Valid { promo_code: other.clone() });

        assert_eq!(slot.applied(), Some(&other));
    }

    #[test]
    fn test_clear_resets_slot() {
        let mut slot = PromoSlot::new();
        let t = slot.begin_validation();
        slot.resolve(t, PromoValidation::Valid { promo_code: festive() });

        slot.clear();
        assert!(slot.applied().is_none());
    }
}
