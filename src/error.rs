//! Error handling for the ledger
//!
//! `LedgerError` is the engine's error taxonomy. Storage and CLI plumbing
//! use the anyhow-based `Result` alias and carry `LedgerError` values inside
//! it, so callers can still recover the kind with `downcast_ref`.

use rust_decimal::Decimal;
use thiserror::Error;

/// Core error kinds raised while validating and applying trades
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid quantity: {0} (must be greater than zero)")]
    InvalidQuantity(Decimal),

    #[error("invalid price: {0} (must not be negative)")]
    InvalidPrice(Decimal),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("insufficient holdings: selling {requested} units but only {held} held")]
    InsufficientHoldings { requested: Decimal, held: Decimal },

    #[error("amount out of range: {0}")]
    Overflow(&'static str),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type alias for storage and application operations
pub type Result<T> = anyhow::Result<T>;

/// Recover the ledger error kind from an application error, if there is one.
pub fn ledger_error(err: &anyhow::Error) -> Option<&LedgerError> {
    err.downcast_ref::<LedgerError>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_formatting_is_readable() {
        let err = LedgerError::InsufficientHoldings {
            requested: dec!(999),
            held: dec!(15),
        };
        assert_eq!(
            err.to_string(),
            "insufficient holdings: selling 999 units but only 15 held"
        );

        let err = LedgerError::not_found("portfolio", "abc");
        assert_eq!(err.to_string(), "portfolio not found: abc");

        let err = LedgerError::Overflow("trade value");
        assert_eq!(err.to_string(), "amount out of range: trade value");
    }

    #[test]
    fn test_anyhow_context_keeps_ledger_error() {
        use anyhow::Context;
        let result: Result<()> =
            Err(LedgerError::InvalidQuantity(dec!(0))).context("failed to record trade");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to record trade"));
        assert_eq!(
            ledger_error(&err),
            Some(&LedgerError::InvalidQuantity(dec!(0)))
        );
    }

    #[test]
    fn test_plain_anyhow_has_no_ledger_kind() {
        let err = anyhow::anyhow!("disk full");
        assert!(ledger_error(&err).is_none());
    }
}
