//! Error taxonomy for the routing core.
//!
//! Every fallible boundary in this crate returns `CoreError`, distinguishable
//! by kind (not just message), matching the teacher's pattern of a single
//! `thiserror`-derived enum per crate (`orderbook::OrderbookError`).

use crate::guards::SearchGuardReport;
use std::fmt;

/// The crate-wide error type.
///
/// Invariant violations (`InvalidInput`, `PrecisionViolation`) surface
/// immediately at the construction boundary of the value object that
/// detected them; callers never observe half-built value objects.
#[derive(Clone, Debug, thiserror::Error)]
pub enum CoreError {
    /// Bad currency, negative money, out-of-range tolerance, `min > max`,
    /// scale out of `[0, 50]`, non-numeric decimal, empty signature segment,
    /// empty fee-policy fingerprint, currency mismatch, division by zero.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Arithmetic could not meet the requested scale without corrupting the
    /// value, e.g. an internal scale derived from an operation exceeds the
    /// representable working width.
    #[error("precision violation performing {operation} at scale {scale}")]
    PrecisionViolation {
        /// Name of the operation that could not be carried out precisely.
        operation: String,
        /// The scale that was requested.
        scale: u32,
    },

    /// A guard was breached and `throw_on_limit` was configured.
    #[error("guard limit exceeded: {report}")]
    GuardLimitExceeded {
        /// The final guard report at the moment of the breach.
        report: Box<SearchGuardReport>,
    },

    /// A candidate path could not be materialized: a leg fell outside its
    /// order's bounds, or the final leg did not land on the target currency.
    #[error("infeasible path: {0}")]
    InfeasiblePath(String),
}

impl CoreError {
    pub fn invalid_input(message: impl fmt::Display) -> Self {
        CoreError::InvalidInput(message.to_string())
    }

    pub fn guard_limit_exceeded(report: SearchGuardReport) -> Self {
        CoreError::GuardLimitExceeded {
            report: Box::new(report),
        }
    }

    pub fn infeasible_path(message: impl fmt::Display) -> Self {
        CoreError::InfeasiblePath(message.to_string())
    }
}

impl fmt::Display for SearchGuardReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expansions={}/{} visited_states={}/{} breached.any={}",
            self.metrics.expansions,
            self.limits
                .expansions
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.metrics.visited_states,
            self.limits
                .visited_states
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.breached.any,
        )
    }
}
