use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::models::{NewTransaction, Position, TransactionType};
use crate::error::LedgerError;
use crate::ledger::realized::realized_pl;
use crate::ledger::validation::check_amounts;

/// Outcome of applying one trade to a position
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTrade {
    pub position: Position,
    /// Set for sells only
    pub realized_pl: Option<Decimal>,
}

/// Produce the position that results from applying `tx` to `current`.
///
/// `current` is `None` for the first trade of an asset in a portfolio. The
/// input position is never modified; on error nothing has changed.
///
/// Buys recompute the weighted average cost. Sells keep the unit cost of the
/// remaining shares, and a sell that closes the position clears it so the
/// next buy starts fresh.
pub fn apply_transaction(
    current: Option<&Position>,
    tx: &NewTransaction,
) -> Result<AppliedTrade, LedgerError> {
    check_amounts(tx.quantity, tx.price)?;

    let mut position = match current {
        Some(existing) => {
            if existing.portfolio_id != tx.portfolio_id || existing.asset_id != tx.asset_id {
                return Err(LedgerError::InvalidOrder(format!(
                    "trade for asset {} in portfolio {} applied to position of asset {} in portfolio {}",
                    tx.asset_id, tx.portfolio_id, existing.asset_id, existing.portfolio_id
                )));
            }
            existing.clone()
        }
        None => Position::empty(tx.portfolio_id, tx.asset_id),
    };

    match tx.transaction_type {
        TransactionType::Buy => {
            let value = tx.value()?;
            let new_quantity = position
                .quantity
                .checked_add(tx.quantity)
                .ok_or(LedgerError::Overflow("position quantity"))?;
            if position.is_open() {
                let total_investment = position
                    .total_investment
                    .checked_add(value)
                    .ok_or(LedgerError::Overflow("total investment"))?;
                position.average_purchase_price = total_investment
                    .checked_div(new_quantity)
                    .ok_or(LedgerError::Overflow("average purchase price"))?;
                position.total_investment = total_investment;
            } else {
                position.average_purchase_price = tx.price;
                position.total_investment = value;
            }
            position.quantity = new_quantity;

            Ok(AppliedTrade {
                position,
                realized_pl: None,
            })
        }
        TransactionType::Sell => {
            if tx.quantity > position.quantity {
                return Err(LedgerError::InsufficientHoldings {
                    requested: tx.quantity,
                    held: position.quantity,
                });
            }

            // must use the cost basis from before the sale
            let pl = realized_pl(tx.quantity, tx.price, position.average_purchase_price)?;

            position.quantity -= tx.quantity;
            if position.is_open() {
                position.total_investment = position
                    .quantity
                    .checked_mul(position.average_purchase_price)
                    .ok_or(LedgerError::Overflow("total investment"))?;
            } else {
                position.quantity = Decimal::ZERO;
                position.average_purchase_price = Decimal::ZERO;
                position.total_investment = Decimal::ZERO;
            }

            Ok(AppliedTrade {
                position,
                realized_pl: Some(pl),
            })
        }
    }
}

/// Result of folding a full trade history into a position
#[derive(Debug, Clone, PartialEq)]
pub struct RebuiltPosition {
    pub position: Position,
    /// One entry per history item: the realized P&L of fulfilled sells,
    /// `None` for buys and for trades that do not move the position.
    pub realized_pl: Vec<Option<Decimal>>,
}

/// Replay an ordered history for one (portfolio, asset) pair from nothing.
///
/// Trades that are not fulfilled are skipped. Fails on the first trade that
/// would be rejected by [`apply_transaction`], e.g. a sell that exceeds the
/// quantity held at that point in the history.
pub fn rebuild_position(
    portfolio_id: Uuid,
    asset_id: Uuid,
    history: &[NewTransaction],
) -> Result<RebuiltPosition, LedgerError> {
    let mut position = Position::empty(portfolio_id, asset_id);
    let mut realized = Vec::with_capacity(history.len());

    for tx in history {
        if !tx.moves_position() {
            realized.push(None);
            continue;
        }
        let applied = apply_transaction(Some(&position), tx)?;
        position = applied.position;
        realized.push(applied.realized_pl);
    }

    Ok(RebuiltPosition {
        position,
        realized_pl: realized,
    })
}

/// Collapse the stored lot rows of one (portfolio, asset) pair into the
/// logical position they represent. The first lot keeps its identity.
///
/// Returns `None` when there are no lots.
pub fn consolidate_lots(lots: &[Position]) -> Result<Option<Position>, LedgerError> {
    let Some((first, rest)) = lots.split_first() else {
        return Ok(None);
    };
    let mut merged = first.clone();
    for lot in rest {
        merged.quantity = merged
            .quantity
            .checked_add(lot.quantity)
            .ok_or(LedgerError::Overflow("position quantity"))?;
        merged.total_investment = merged
            .total_investment
            .checked_add(lot.total_investment)
            .ok_or(LedgerError::Overflow("total investment"))?;
    }
    merged.average_purchase_price = if merged.is_open() {
        merged
            .total_investment
            .checked_div(merged.quantity)
            .ok_or(LedgerError::Overflow("average purchase price"))?
    } else {
        Decimal::ZERO
    };
    Ok(Some(merged))
}
