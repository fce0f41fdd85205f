//! Ledger repository: durable storage of portfolios, assets, positions and
//! transactions.
//!
//! Every read excludes soft-deleted rows, so callers never filter on
//! `deleted_at` themselves. Deletes only stamp `deleted_at`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::models::{
    Asset, Portfolio, PortfolioUpdate, Position, PositionRow, Transaction,
};
use super::{get_decimal_value, get_enum_value, get_optional_decimal_value, get_uuid_value};
use crate::ledger::consolidate_lots;

/// Storage operations the ledger service depends on
pub trait LedgerRepository {
    fn insert_portfolio(&self, portfolio: &Portfolio) -> Result<()>;
    fn get_portfolio(&self, id: Uuid) -> Result<Option<Portfolio>>;
    fn get_portfolios_by_user(&self, user_id: Uuid) -> Result<Vec<Portfolio>>;
    /// Returns the updated portfolio, or `None` if it does not exist
    fn update_portfolio(&self, id: Uuid, update: &PortfolioUpdate) -> Result<Option<Portfolio>>;
    /// Soft-deletes the portfolio and its position rows
    fn soft_delete_portfolio(&self, id: Uuid) -> Result<bool>;

    fn insert_asset(&self, asset: &Asset) -> Result<()>;
    fn get_asset(&self, id: Uuid) -> Result<Option<Asset>>;
    fn get_asset_by_symbol(&self, symbol: &str) -> Result<Option<Asset>>;
    fn list_assets(&self) -> Result<Vec<Asset>>;

    /// Logical position for a pair: all active lot rows consolidated
    fn get_position(&self, portfolio_id: Uuid, asset_id: Uuid) -> Result<Option<Position>>;
    /// Persist a position and retire any other lot rows of the same pair.
    /// Returns the position with its stored id.
    fn save_position(&self, position: &Position) -> Result<Position>;
    /// Raw lot rows of a portfolio, in insertion order
    fn get_position_rows(&self, portfolio_id: Uuid) -> Result<Vec<PositionRow>>;
    /// Store an additional lot row without touching existing ones
    fn insert_position_row(&self, position: &Position) -> Result<Uuid>;

    fn insert_transaction(&self, tx: &Transaction) -> Result<()>;
    fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>>;
    /// Active transactions of a portfolio, ordered by trade time then insertion
    fn get_transactions_by_portfolio(&self, portfolio_id: Uuid) -> Result<Vec<Transaction>>;
    /// Active transactions of one pair, ordered by trade time then insertion
    fn get_transactions_by_pair(&self, portfolio_id: Uuid, asset_id: Uuid)
        -> Result<Vec<Transaction>>;
    fn update_transaction(&self, tx: &Transaction) -> Result<bool>;
    fn soft_delete_transaction(&self, id: Uuid) -> Result<bool>;
}

/// SQLite-backed repository. Works on a plain connection or on an open
/// `rusqlite::Transaction` (which derefs to `Connection`).
pub struct SqliteLedger<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteLedger<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

const TRANSACTION_COLUMNS: &str = "id, portfolio_id, asset_id, transaction_type, status, order_type,
     limit_price, quantity, price, value, realized_pl, transaction_date, created_at";

fn row_to_portfolio(row: &rusqlite::Row) -> rusqlite::Result<Portfolio> {
    Ok(Portfolio {
        id: get_uuid_value(row, 0)?,
        user_id: get_uuid_value(row, 1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn row_to_asset(row: &rusqlite::Row) -> rusqlite::Result<Asset> {
    Ok(Asset {
        id: get_uuid_value(row, 0)?,
        symbol: row.get(1)?,
        name: row.get(2)?,
        exchange: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn row_to_position(row: &rusqlite::Row) -> rusqlite::Result<Position> {
    Ok(Position {
        id: Some(get_uuid_value(row, 0)?),
        portfolio_id: get_uuid_value(row, 1)?,
        asset_id: get_uuid_value(row, 2)?,
        quantity: get_decimal_value(row, 3)?,
        average_purchase_price: get_decimal_value(row, 4)?,
        total_investment: get_decimal_value(row, 5)?,
    })
}

fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: get_uuid_value(row, 0)?,
        portfolio_id: get_uuid_value(row, 1)?,
        asset_id: get_uuid_value(row, 2)?,
        transaction_type: get_enum_value(row, 3)?,
        status: get_enum_value(row, 4)?,
        order_type: get_enum_value(row, 5)?,
        limit_price: get_optional_decimal_value(row, 6)?,
        quantity: get_decimal_value(row, 7)?,
        price: get_decimal_value(row, 8)?,
        value: get_decimal_value(row, 9)?,
        realized_pl: get_optional_decimal_value(row, 10)?,
        transaction_date: row.get(11)?,
        created_at: row.get(12)?,
    })
}

/// SQL returns rows in insertion order; this makes trade time the primary key
/// while keeping insertion order for trades with the same timestamp.
fn order_by_trade_time(mut transactions: Vec<Transaction>) -> Vec<Transaction> {
    transactions.sort_by_key(|tx| tx.transaction_date);
    transactions
}

impl SqliteLedger<'_> {
    fn query_transactions(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Transaction>> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE deleted_at IS NULL AND {} ORDER BY seq ASC",
            TRANSACTION_COLUMNS, filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params, row_to_transaction)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read transactions")?;
        Ok(order_by_trade_time(transactions))
    }

    fn lots_for_pair(&self, portfolio_id: Uuid, asset_id: Uuid) -> Result<Vec<Position>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, portfolio_id, asset_id, quantity, average_purchase_price, total_investment
             FROM positions
             WHERE deleted_at IS NULL AND portfolio_id = ?1 AND asset_id = ?2
             ORDER BY seq ASC",
        )?;
        let lots = stmt
            .query_map(
                params![portfolio_id.to_string(), asset_id.to_string()],
                row_to_position,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lots)
    }
}

impl LedgerRepository for SqliteLedger<'_> {
    fn insert_portfolio(&self, portfolio: &Portfolio) -> Result<()> {
        self.conn.execute(
            "INSERT INTO portfolios (id, user_id, name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                portfolio.id.to_string(),
                portfolio.user_id.to_string(),
                portfolio.name,
                portfolio.created_at,
                portfolio.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_portfolio(&self, id: Uuid) -> Result<Option<Portfolio>> {
        let portfolio = self
            .conn
            .query_row(
                "SELECT id, user_id, name, created_at, updated_at
                 FROM portfolios WHERE id = ?1 AND deleted_at IS NULL",
                [id.to_string()],
                row_to_portfolio,
            )
            .optional()?;
        Ok(portfolio)
    }

    fn get_portfolios_by_user(&self, user_id: Uuid) -> Result<Vec<Portfolio>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, created_at, updated_at
             FROM portfolios
             WHERE user_id = ?1 AND deleted_at IS NULL
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let portfolios = stmt
            .query_map([user_id.to_string()], row_to_portfolio)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(portfolios)
    }

    fn update_portfolio(&self, id: Uuid, update: &PortfolioUpdate) -> Result<Option<Portfolio>> {
        let Some(mut portfolio) = self.get_portfolio(id)? else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            portfolio.name = name.clone();
        }
        portfolio.updated_at = Utc::now();

        self.conn.execute(
            "UPDATE portfolios SET name = ?1, updated_at = ?2 WHERE id = ?3 AND deleted_at IS NULL",
            params![portfolio.name, portfolio.updated_at, id.to_string()],
        )?;
        Ok(Some(portfolio))
    }

    fn soft_delete_portfolio(&self, id: Uuid) -> Result<bool> {
        let now = Utc::now();
        let changed = self.conn.execute(
            "UPDATE portfolios SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![now, id.to_string()],
        )?;
        if changed > 0 {
            self.conn.execute(
                "UPDATE positions SET deleted_at = ?1 WHERE portfolio_id = ?2 AND deleted_at IS NULL",
                params![now, id.to_string()],
            )?;
        }
        Ok(changed > 0)
    }

    fn insert_asset(&self, asset: &Asset) -> Result<()> {
        self.conn.execute(
            "INSERT INTO assets (id, symbol, name, exchange, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                asset.id.to_string(),
                asset.symbol,
                asset.name,
                asset.exchange,
                asset.created_at,
            ],
        )?;
        Ok(())
    }

    fn get_asset(&self, id: Uuid) -> Result<Option<Asset>> {
        let asset = self
            .conn
            .query_row(
                "SELECT id, symbol, name, exchange, created_at
                 FROM assets WHERE id = ?1 AND deleted_at IS NULL",
                [id.to_string()],
                row_to_asset,
            )
            .optional()?;
        Ok(asset)
    }

    fn get_asset_by_symbol(&self, symbol: &str) -> Result<Option<Asset>> {
        let asset = self
            .conn
            .query_row(
                "SELECT id, symbol, name, exchange, created_at
                 FROM assets WHERE symbol = ?1 COLLATE NOCASE AND deleted_at IS NULL
                 ORDER BY rowid ASC LIMIT 1",
                [symbol],
                row_to_asset,
            )
            .optional()?;
        Ok(asset)
    }

    fn list_assets(&self) -> Result<Vec<Asset>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, symbol, name, exchange, created_at
             FROM assets WHERE deleted_at IS NULL ORDER BY symbol",
        )?;
        let assets = stmt
            .query_map([], row_to_asset)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(assets)
    }

    fn get_position(&self, portfolio_id: Uuid, asset_id: Uuid) -> Result<Option<Position>> {
        let lots = self.lots_for_pair(portfolio_id, asset_id)?;
        if lots.len() > 1 {
            tracing::debug!(
                "consolidating {} lot rows for asset {} in portfolio {}",
                lots.len(),
                asset_id,
                portfolio_id
            );
        }
        Ok(consolidate_lots(&lots)?)
    }

    fn save_position(&self, position: &Position) -> Result<Position> {
        let now = Utc::now();
        let mut saved = position.clone();

        let id = match position.id {
            Some(id) => {
                let changed = self.conn.execute(
                    "UPDATE positions
                     SET quantity = ?1, average_purchase_price = ?2, total_investment = ?3, updated_at = ?4
                     WHERE id = ?5 AND deleted_at IS NULL",
                    params![
                        position.quantity.to_string(),
                        position.average_purchase_price.to_string(),
                        position.total_investment.to_string(),
                        now,
                        id.to_string(),
                    ],
                )?;
                if changed == 0 {
                    anyhow::bail!("position {} no longer exists", id);
                }
                id
            }
            None => {
                let id = self.insert_position_row(position)?;
                saved.id = Some(id);
                id
            }
        };

        self.conn.execute(
            "UPDATE positions SET deleted_at = ?1
             WHERE portfolio_id = ?2 AND asset_id = ?3 AND id != ?4 AND deleted_at IS NULL",
            params![
                now,
                position.portfolio_id.to_string(),
                position.asset_id.to_string(),
                id.to_string(),
            ],
        )?;

        Ok(saved)
    }

    fn get_position_rows(&self, portfolio_id: Uuid) -> Result<Vec<PositionRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.portfolio_id, p.asset_id, a.name,
                    p.quantity, p.average_purchase_price, p.total_investment
             FROM positions p
             LEFT JOIN assets a ON a.id = p.asset_id AND a.deleted_at IS NULL
             WHERE p.portfolio_id = ?1 AND p.deleted_at IS NULL
             ORDER BY p.seq ASC",
        )?;
        let rows = stmt
            .query_map([portfolio_id.to_string()], |row| {
                let quantity = get_decimal_value(row, 4)?;
                let average = get_decimal_value(row, 5)?;
                Ok(PositionRow {
                    position_id: get_uuid_value(row, 0)?,
                    portfolio_id: get_uuid_value(row, 1)?,
                    asset_id: get_uuid_value(row, 2)?,
                    asset_name: row.get(3)?,
                    quantity,
                    average_purchase_price: (quantity > rust_decimal::Decimal::ZERO)
                        .then_some(average),
                    total_investment: get_decimal_value(row, 6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert_position_row(&self, position: &Position) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO positions (
                id, portfolio_id, asset_id, quantity, average_purchase_price, total_investment, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                position.portfolio_id.to_string(),
                position.asset_id.to_string(),
                position.quantity.to_string(),
                position.average_purchase_price.to_string(),
                position.total_investment.to_string(),
                Utc::now(),
            ],
        )?;
        Ok(id)
    }

    fn insert_transaction(&self, tx: &Transaction) -> Result<()> {
        self.conn.execute(
            "INSERT INTO transactions (
                id, portfolio_id, asset_id, transaction_type, status, order_type,
                limit_price, quantity, price, value, realized_pl, transaction_date, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                tx.id.to_string(),
                tx.portfolio_id.to_string(),
                tx.asset_id.to_string(),
                tx.transaction_type.as_str(),
                tx.status.as_str(),
                tx.order_type.as_str(),
                tx.limit_price.map(|d| d.to_string()),
                tx.quantity.to_string(),
                tx.price.to_string(),
                tx.value.to_string(),
                tx.realized_pl.map(|d| d.to_string()),
                tx.transaction_date,
                tx.created_at,
            ],
        )?;
        Ok(())
    }

    fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE id = ?1 AND deleted_at IS NULL",
            TRANSACTION_COLUMNS
        );
        let tx = self
            .conn
            .query_row(&sql, [id.to_string()], row_to_transaction)
            .optional()?;
        Ok(tx)
    }

    fn get_transactions_by_portfolio(&self, portfolio_id: Uuid) -> Result<Vec<Transaction>> {
        self.query_transactions("portfolio_id = ?1", [portfolio_id.to_string()])
    }

    fn get_transactions_by_pair(
        &self,
        portfolio_id: Uuid,
        asset_id: Uuid,
    ) -> Result<Vec<Transaction>> {
        self.query_transactions(
            "portfolio_id = ?1 AND asset_id = ?2",
            [portfolio_id.to_string(), asset_id.to_string()],
        )
    }

    fn update_transaction(&self, tx: &Transaction) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE transactions
             SET transaction_type = ?1, status = ?2, order_type = ?3, limit_price = ?4,
                 quantity = ?5, price = ?6, value = ?7, realized_pl = ?8, transaction_date = ?9
             WHERE id = ?10 AND deleted_at IS NULL",
            params![
                tx.transaction_type.as_str(),
                tx.status.as_str(),
                tx.order_type.as_str(),
                tx.limit_price.map(|d| d.to_string()),
                tx.quantity.to_string(),
                tx.price.to_string(),
                tx.value.to_string(),
                tx.realized_pl.map(|d| d.to_string()),
                tx.transaction_date,
                tx.id.to_string(),
            ],
        )?;
        Ok(changed > 0)
    }

    fn soft_delete_transaction(&self, id: Uuid) -> Result<bool> {
        let deleted_at: DateTime<Utc> = Utc::now();
        let changed = self.conn.execute(
            "UPDATE transactions SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![deleted_at, id.to_string()],
        )?;
        Ok(changed > 0)
    }
}
