//! Gate that rejects malformed trades before they reach the aggregator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::models::{NewTransaction, OrderType};
use crate::error::LedgerError;

/// What to do with a MARKET order that arrives carrying a limit price
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LimitPricePolicy {
    /// Reject the trade as inconsistent input
    #[default]
    Reject,
    /// Accept the trade and drop the stray limit price
    Ignore,
}

/// Check quantity and price. Also used by the aggregator on every call.
pub fn check_amounts(quantity: Decimal, price: Decimal) -> Result<(), LedgerError> {
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::InvalidQuantity(quantity));
    }
    if price < Decimal::ZERO {
        return Err(LedgerError::InvalidPrice(price));
    }
    Ok(())
}

/// Validate a submitted trade and return it normalized under `policy`.
///
/// Referential checks (portfolio and asset existence) belong to the
/// repository and are not performed here.
pub fn validate_transaction(
    mut tx: NewTransaction,
    policy: LimitPricePolicy,
) -> Result<NewTransaction, LedgerError> {
    check_amounts(tx.quantity, tx.price)?;

    match (tx.order_type, tx.limit_price) {
        (OrderType::Limit, None) => {
            return Err(LedgerError::InvalidOrder(
                "LIMIT order requires a limit price".to_string(),
            ));
        }
        (OrderType::Limit, Some(limit)) if limit < Decimal::ZERO => {
            return Err(LedgerError::InvalidPrice(limit));
        }
        (OrderType::Market, Some(_)) => match policy {
            LimitPricePolicy::Reject => {
                return Err(LedgerError::InvalidOrder(
                    "MARKET order must not carry a limit price".to_string(),
                ));
            }
            LimitPricePolicy::Ignore => {
                tracing::debug!("dropping limit price from MARKET order");
                tx.limit_price = None;
            }
        },
        _ => {}
    }

    Ok(tx)
}
