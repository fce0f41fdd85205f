use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::{LedgerRepository, Portfolio, PositionRow, Transaction, TransactionRow};
use crate::error::LedgerError;

/// Portfolio header with its merged positions
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioView {
    pub portfolio: Portfolio,
    pub positions: Vec<PositionRow>,
    pub total_investment: Decimal,
}

/// Collapse raw lot rows into one row per asset.
///
/// Rows are grouped by asset in first-occurrence order. Quantities and
/// investments are summed and the average becomes `total / quantity`
/// (absent when the summed quantity is zero). Descriptive fields come from
/// the first row seen for the asset. Single rows pass through unchanged, so
/// merging an already merged list is a no-op.
pub fn merge_positions(rows: Vec<PositionRow>) -> Result<Vec<PositionRow>, LedgerError> {
    let mut merged: Vec<PositionRow> = Vec::with_capacity(rows.len());
    let mut index_by_asset: HashMap<Uuid, usize> = HashMap::new();
    let mut lot_counts: Vec<usize> = Vec::with_capacity(rows.len());

    for row in rows {
        match index_by_asset.get(&row.asset_id) {
            Some(&idx) => {
                let target = &mut merged[idx];
                target.quantity = target
                    .quantity
                    .checked_add(row.quantity)
                    .ok_or(LedgerError::Overflow("position quantity"))?;
                target.total_investment = target
                    .total_investment
                    .checked_add(row.total_investment)
                    .ok_or(LedgerError::Overflow("total investment"))?;
                lot_counts[idx] += 1;
            }
            None => {
                index_by_asset.insert(row.asset_id, merged.len());
                merged.push(row);
                lot_counts.push(1);
            }
        }
    }

    for (row, lots) in merged.iter_mut().zip(lot_counts) {
        if lots > 1 {
            row.average_purchase_price = if row.quantity.is_zero() {
                None
            } else {
                Some(
                    row.total_investment
                        .checked_div(row.quantity)
                        .ok_or(LedgerError::Overflow("average purchase price"))?,
                )
            };
        }
    }

    Ok(merged)
}

/// Attach the portfolio name and asset names to transactions for display.
///
/// `asset_name` is asked once per distinct asset; when it has no answer the
/// row keeps the transaction and omits the name.
pub fn merge_transactions_for_display<F>(
    transactions: Vec<Transaction>,
    portfolio_name: &str,
    mut asset_name: F,
) -> Vec<TransactionRow>
where
    F: FnMut(Uuid) -> Option<String>,
{
    let mut names: HashMap<Uuid, Option<String>> = HashMap::new();
    transactions
        .into_iter()
        .map(|transaction| {
            let name = names
                .entry(transaction.asset_id)
                .or_insert_with(|| asset_name(transaction.asset_id))
                .clone();
            TransactionRow {
                transaction,
                portfolio_name: Some(portfolio_name.to_string()),
                asset_name: name,
            }
        })
        .collect()
}

fn build_view<R: LedgerRepository>(repo: &R, portfolio: Portfolio) -> Result<PortfolioView> {
    let positions = merge_positions(repo.get_position_rows(portfolio.id)?)?;
    let total_investment = positions
        .iter()
        .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(p.total_investment))
        .ok_or(LedgerError::Overflow("portfolio investment"))?;
    Ok(PortfolioView {
        portfolio,
        positions,
        total_investment,
    })
}

/// One portfolio with merged positions
pub fn portfolio_view<R: LedgerRepository>(repo: &R, portfolio_id: Uuid) -> Result<PortfolioView> {
    let portfolio = repo
        .get_portfolio(portfolio_id)?
        .ok_or_else(|| LedgerError::not_found("portfolio", portfolio_id))?;
    build_view(repo, portfolio)
}

/// Every active portfolio of a user with merged positions
pub fn user_view<R: LedgerRepository>(repo: &R, user_id: Uuid) -> Result<Vec<PortfolioView>> {
    repo.get_portfolios_by_user(user_id)?
        .into_iter()
        .map(|portfolio| build_view(repo, portfolio))
        .collect()
}

/// All active transactions across a user's portfolios, with names attached
pub fn user_transactions<R: LedgerRepository>(
    repo: &R,
    user_id: Uuid,
) -> Result<Vec<TransactionRow>> {
    let asset_names: HashMap<Uuid, String> = repo
        .list_assets()?
        .into_iter()
        .map(|asset| (asset.id, asset.name))
        .collect();

    let mut rows = Vec::new();
    for portfolio in repo.get_portfolios_by_user(user_id)? {
        let transactions = repo.get_transactions_by_portfolio(portfolio.id)?;
        rows.extend(merge_transactions_for_display(
            transactions,
            &portfolio.name,
            |asset_id| asset_names.get(&asset_id).cloned(),
        ));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{OrderType, TransactionStatus, TransactionType};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn row(asset_id: Uuid, name: &str, qty: Decimal, invested: Decimal) -> PositionRow {
        PositionRow {
            position_id: Uuid::new_v4(),
            portfolio_id: Uuid::nil(),
            asset_id,
            asset_name: Some(name.to_string()),
            quantity: qty,
            average_purchase_price: if qty.is_zero() {
                None
            } else {
                Some(invested / qty)
            },
            total_investment: invested,
        }
    }

    fn transaction(asset_id: Uuid) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Uuid::new_v4(),
            portfolio_id: Uuid::nil(),
            asset_id,
            transaction_type: TransactionType::Buy,
            status: TransactionStatus::Fulfilled,
            order_type: OrderType::Market,
            limit_price: None,
            quantity: dec!(1),
            price: dec!(10),
            value: dec!(10),
            realized_pl: None,
            transaction_date: now,
            created_at: now,
        }
    }

    #[test]
    fn test_merge_two_lots_of_same_asset() {
        let asset = Uuid::new_v4();
        let first = row(asset, "Apple", dec!(5), dec!(50));
        let first_id = first.position_id;
        let merged =
            merge_positions(vec![first, row(asset, "Apple", dec!(3), dec!(21))]).unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].quantity, dec!(8));
        assert_eq!(merged[0].total_investment, dec!(71));
        assert_eq!(merged[0].average_purchase_price, Some(dec!(8.875)));
        assert_eq!(merged[0].position_id, first_id);
    }

    #[test]
    fn test_merge_keeps_first_occurrence_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let merged = merge_positions(vec![
            row(b, "B", dec!(1), dec!(1)),
            row(a, "A", dec!(2), dec!(4)),
            row(b, "B", dec!(1), dec!(3)),
        ])
        .unwrap();
        let order: Vec<Uuid> = merged.iter().map(|r| r.asset_id).collect();
        assert_eq!(order, vec![b, a]);
        assert_eq!(merged[0].average_purchase_price, Some(dec!(2)));
    }

    #[test]
    fn test_merge_zero_quantity_has_no_average() {
        let asset = Uuid::new_v4();
        let merged = merge_positions(vec![
            row(asset, "Closed", dec!(0), dec!(0)),
            row(asset, "Closed", dec!(0), dec!(0)),
        ])
        .unwrap();
        assert_eq!(merged[0].average_purchase_price, None);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let asset = Uuid::new_v4();
        let other = Uuid::new_v4();
        let once = merge_positions(vec![
            row(asset, "X", dec!(5), dec!(50)),
            row(other, "Y", dec!(1), dec!(9)),
            row(asset, "X", dec!(3), dec!(21)),
        ])
        .unwrap();
        let twice = merge_positions(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_out_of_range_is_an_error() {
        let asset = Uuid::new_v4();
        let err = merge_positions(vec![
            row(asset, "X", Decimal::MAX, dec!(0)),
            row(asset, "X", Decimal::MAX, dec!(0)),
        ])
        .unwrap_err();
        assert_eq!(err, LedgerError::Overflow("position quantity"));
    }

    #[test]
    fn test_transaction_display_names() {
        let known = Uuid::new_v4();
        let gone = Uuid::new_v4();
        let mut lookups = 0;
        let rows = merge_transactions_for_display(
            vec![transaction(known), transaction(gone), transaction(known)],
            "Practice",
            |id| {
                lookups += 1;
                (id == known).then(|| "Apple".to_string())
            },
        );

        assert_eq!(lookups, 2);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.portfolio_name.as_deref() == Some("Practice")));
        assert_eq!(rows[0].asset_name.as_deref(), Some("Apple"));
        assert_eq!(rows[1].asset_name, None);

        let json = serde_json::to_value(&rows[1]).unwrap();
        assert!(json.get("asset_name").is_none());
        assert_eq!(json["portfolio_name"], "Practice");
    }
}
