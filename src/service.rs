//! Ledger service: the read-modify-write cycle around the accounting engine.
//!
//! The free functions are generic over [`LedgerRepository`] and assume the
//! caller already holds whatever isolation the storage needs. [`LedgerService`]
//! provides that for SQLite by running each write inside an `IMMEDIATE`
//! transaction, which serializes concurrent writers to the same database.

use anyhow::{bail, Result};
use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Settings;
use crate::db::models::{
    Asset, NewTransaction, Portfolio, PortfolioUpdate, Position, Transaction, TransactionStatus,
    TransactionUpdate,
};
use crate::db::{self, LedgerRepository, SqliteLedger};
use crate::error::LedgerError;
use crate::ledger::{apply_transaction, rebuild_position, validate_transaction, LimitPricePolicy};

const MAX_PORTFOLIO_NAME_LEN: usize = 50;

fn require_portfolio<R: LedgerRepository>(repo: &R, id: Uuid) -> Result<Portfolio> {
    Ok(repo
        .get_portfolio(id)?
        .ok_or_else(|| LedgerError::not_found("portfolio", id))?)
}

fn require_asset<R: LedgerRepository>(repo: &R, id: Uuid) -> Result<Asset> {
    Ok(repo
        .get_asset(id)?
        .ok_or_else(|| LedgerError::not_found("asset", id))?)
}

fn require_transaction<R: LedgerRepository>(repo: &R, id: Uuid) -> Result<Transaction> {
    Ok(repo
        .get_transaction(id)?
        .ok_or_else(|| LedgerError::not_found("transaction", id))?)
}

fn check_portfolio_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        bail!("portfolio name must not be empty");
    }
    if name.chars().count() > MAX_PORTFOLIO_NAME_LEN {
        bail!(
            "portfolio name must be at most {} characters",
            MAX_PORTFOLIO_NAME_LEN
        );
    }
    Ok(name.to_string())
}

/// Validate, apply and store a new trade together with the updated position.
///
/// A trade dated before the latest fulfilled trade of its pair is placed in
/// date order and the pair's history is replayed, so it must be covered by
/// the holdings at its own date. Sells recorded after it keep their stored
/// P&L.
pub fn record_transaction<R: LedgerRepository>(
    repo: &R,
    new: NewTransaction,
    policy: LimitPricePolicy,
) -> Result<Transaction> {
    let new = validate_transaction(new, policy)?;
    require_portfolio(repo, new.portfolio_id)?;
    require_asset(repo, new.asset_id)?;

    let mut transaction = Transaction {
        id: Uuid::new_v4(),
        portfolio_id: new.portfolio_id,
        asset_id: new.asset_id,
        transaction_type: new.transaction_type,
        status: new.status,
        order_type: new.order_type,
        limit_price: new.limit_price,
        quantity: new.quantity,
        price: new.price,
        value: new.value()?,
        realized_pl: None,
        transaction_date: new.transaction_date,
        created_at: Utc::now(),
    };

    if new.moves_position() {
        let history = repo.get_transactions_by_pair(new.portfolio_id, new.asset_id)?;
        let backdated = history.iter().any(|tx| {
            tx.status == TransactionStatus::Fulfilled
                && tx.transaction_date > new.transaction_date
        });
        if backdated {
            debug!(
                "backdated {} on {}, replaying history",
                new.transaction_type.as_str(),
                new.transaction_date
            );
            transaction.realized_pl = replay_with(repo, history, &transaction)?;
        } else {
            let current = repo.get_position(new.portfolio_id, new.asset_id)?;
            let applied = apply_transaction(current.as_ref(), &new)?;
            repo.save_position(&applied.position)?;
            transaction.realized_pl = applied.realized_pl;
        }
    } else {
        debug!(
            "{} transaction stored without moving the position",
            new.status.as_str()
        );
    }

    repo.insert_transaction(&transaction)?;
    Ok(transaction)
}

/// Replace the stored position of a pair with `rebuilt`, keeping the
/// identity of the current position row when there is one.
fn store_rebuilt_position<R: LedgerRepository>(repo: &R, mut rebuilt: Position) -> Result<()> {
    let current = repo.get_position(rebuilt.portfolio_id, rebuilt.asset_id)?;
    if current.is_none() && !rebuilt.is_open() {
        return Ok(());
    }
    rebuilt.id = current.and_then(|p| p.id);
    repo.save_position(&rebuilt)?;
    Ok(())
}

/// Put `changed` into the pair's active history (replacing the row with the
/// same id, or adding it), replay in date order and store the rebuilt
/// position. Returns the realized P&L of `changed` in that replay.
///
/// Nothing is written when the replay fails.
fn replay_with<R: LedgerRepository>(
    repo: &R,
    mut history: Vec<Transaction>,
    changed: &Transaction,
) -> Result<Option<Decimal>> {
    match history.iter_mut().find(|tx| tx.id == changed.id) {
        Some(slot) => *slot = changed.clone(),
        None => history.push(changed.clone()),
    }
    // stable: same-time trades keep insertion order
    history.sort_by_key(|tx| tx.transaction_date);

    let drafts: Vec<NewTransaction> = history.iter().map(Transaction::to_new).collect();
    let rebuilt = rebuild_position(changed.portfolio_id, changed.asset_id, &drafts)?;
    let realized_pl = history
        .iter()
        .position(|tx| tx.id == changed.id)
        .and_then(|idx| rebuilt.realized_pl[idx]);

    store_rebuilt_position(repo, rebuilt.position)?;
    Ok(realized_pl)
}

/// Apply a partial update to a stored trade and rebuild the pair's position
/// from its full active history.
///
/// Realized P&L is recomputed for the amended trade only. Other sells keep
/// the P&L they were stored with, so amending a buy leaves later sells
/// measured against the old cost basis. If the amended history would sell
/// more than was held at any point, nothing is written.
pub fn amend_transaction<R: LedgerRepository>(
    repo: &R,
    id: Uuid,
    update: &TransactionUpdate,
    policy: LimitPricePolicy,
) -> Result<Transaction> {
    let existing = require_transaction(repo, id)?;
    require_portfolio(repo, existing.portfolio_id)?;
    require_asset(repo, existing.asset_id)?;
    if update.is_empty() {
        return Ok(existing);
    }

    let merged = validate_transaction(update.apply_to(&existing), policy)?;
    let mut amended = Transaction {
        status: merged.status,
        order_type: merged.order_type,
        limit_price: merged.limit_price,
        quantity: merged.quantity,
        price: merged.price,
        value: merged.value()?,
        transaction_date: merged.transaction_date,
        realized_pl: None,
        ..existing.clone()
    };

    let history = repo.get_transactions_by_pair(existing.portfolio_id, existing.asset_id)?;
    amended.realized_pl = replay_with(repo, history, &amended)?;

    if !repo.update_transaction(&amended)? {
        return Err(LedgerError::not_found("transaction", id).into());
    }

    Ok(amended)
}

/// Soft-delete a trade and rebuild the pair's position without it.
///
/// Rejected with `InsufficientHoldings` when removing the trade would leave
/// a later sell uncovered.
pub fn delete_transaction<R: LedgerRepository>(repo: &R, id: Uuid) -> Result<Transaction> {
    let existing = require_transaction(repo, id)?;
    require_portfolio(repo, existing.portfolio_id)?;
    require_asset(repo, existing.asset_id)?;

    let remaining: Vec<NewTransaction> = repo
        .get_transactions_by_pair(existing.portfolio_id, existing.asset_id)?
        .iter()
        .filter(|tx| tx.id != id)
        .map(Transaction::to_new)
        .collect();
    let rebuilt = rebuild_position(existing.portfolio_id, existing.asset_id, &remaining)?;

    repo.soft_delete_transaction(id)?;
    store_rebuilt_position(repo, rebuilt.position)?;

    Ok(existing)
}

pub fn create_portfolio<R: LedgerRepository>(repo: &R, user_id: Uuid, name: &str) -> Result<Portfolio> {
    let now = Utc::now();
    let portfolio = Portfolio {
        id: Uuid::new_v4(),
        user_id,
        name: check_portfolio_name(name)?,
        created_at: now,
        updated_at: now,
    };
    repo.insert_portfolio(&portfolio)?;
    Ok(portfolio)
}

pub fn rename_portfolio<R: LedgerRepository>(
    repo: &R,
    id: Uuid,
    update: &PortfolioUpdate,
) -> Result<Portfolio> {
    let update = PortfolioUpdate {
        name: update.name.as_deref().map(check_portfolio_name).transpose()?,
    };
    Ok(repo
        .update_portfolio(id, &update)?
        .ok_or_else(|| LedgerError::not_found("portfolio", id))?)
}

/// Soft-delete a portfolio and its positions. Transactions are kept for audit.
pub fn delete_portfolio<R: LedgerRepository>(repo: &R, id: Uuid) -> Result<()> {
    if !repo.soft_delete_portfolio(id)? {
        return Err(LedgerError::not_found("portfolio", id).into());
    }
    Ok(())
}

pub fn add_asset<R: LedgerRepository>(
    repo: &R,
    symbol: &str,
    name: &str,
    exchange: &str,
) -> Result<Asset> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        bail!("asset symbol must not be empty");
    }
    if repo.get_asset_by_symbol(&symbol)?.is_some() {
        bail!("asset {} already exists", symbol);
    }
    let asset = Asset {
        id: Uuid::new_v4(),
        symbol,
        name: name.trim().to_string(),
        exchange: exchange.trim().to_uppercase(),
        created_at: Utc::now(),
    };
    repo.insert_asset(&asset)?;
    Ok(asset)
}

/// SQLite-backed ledger with the configured validation policy
pub struct LedgerService {
    conn: Connection,
    policy: LimitPricePolicy,
}

impl LedgerService {
    pub fn new(conn: Connection, policy: LimitPricePolicy) -> Self {
        Self { conn, policy }
    }

    /// Open (and initialize if needed) the database at `path`
    pub fn open(path: &Path, policy: LimitPricePolicy) -> Result<Self> {
        Ok(Self::new(db::init_database(path)?, policy))
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::open(&settings.resolved_database_path()?, settings.market_limit_price)
    }

    /// Read-only access; reads need no lock and may be momentarily stale
    pub fn repository(&self) -> SqliteLedger<'_> {
        SqliteLedger::new(&self.conn)
    }

    fn write<T>(&mut self, op: impl FnOnce(&SqliteLedger<'_>) -> Result<T>) -> Result<T> {
        let db_tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = {
            let repo = SqliteLedger::new(&db_tx);
            op(&repo)?
        };
        db_tx.commit()?;
        Ok(out)
    }

    pub fn record_transaction(&mut self, new: NewTransaction) -> Result<Transaction> {
        let policy = self.policy;
        let tx = self.write(|repo| record_transaction(repo, new, policy))?;
        info!(
            "recorded {} {} x {} @ {} (realized P&L: {:?})",
            tx.transaction_type.as_str(),
            tx.asset_id,
            tx.quantity,
            tx.price,
            tx.realized_pl
        );
        Ok(tx)
    }

    pub fn amend_transaction(&mut self, id: Uuid, update: &TransactionUpdate) -> Result<Transaction> {
        let policy = self.policy;
        let tx = self.write(|repo| amend_transaction(repo, id, update, policy))?;
        info!("amended transaction {}", id);
        Ok(tx)
    }

    pub fn delete_transaction(&mut self, id: Uuid) -> Result<Transaction> {
        let tx = self.write(|repo| delete_transaction(repo, id))?;
        info!("deleted transaction {}", id);
        Ok(tx)
    }

    pub fn create_portfolio(&mut self, user_id: Uuid, name: &str) -> Result<Portfolio> {
        self.write(|repo| create_portfolio(repo, user_id, name))
    }

    pub fn rename_portfolio(&mut self, id: Uuid, update: &PortfolioUpdate) -> Result<Portfolio> {
        self.write(|repo| rename_portfolio(repo, id, update))
    }

    pub fn delete_portfolio(&mut self, id: Uuid) -> Result<()> {
        self.write(|repo| delete_portfolio(repo, id))?;
        info!("deleted portfolio {}", id);
        Ok(())
    }

    pub fn add_asset(&mut self, symbol: &str, name: &str, exchange: &str) -> Result<Asset> {
        self.write(|repo| add_asset(repo, symbol, name, exchange))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{OrderType, TransactionType};
    use crate::error::ledger_error;
    use rust_decimal_macros::dec;

    struct Fixture {
        service: LedgerService,
        portfolio: Portfolio,
        asset: Asset,
    }

    fn fixture() -> Result<Fixture> {
        let conn = Connection::open_in_memory()?;
        db::apply_schema(&conn)?;
        let mut service = LedgerService::new(conn, LimitPricePolicy::Reject);
        let portfolio = service.create_portfolio(Uuid::new_v4(), "Practice 01")?;
        let asset = service.add_asset("aapl", "Apple Inc.", "nasdaq")?;
        Ok(Fixture {
            service,
            portfolio,
            asset,
        })
    }

    impl Fixture {
        fn trade(&self, side: TransactionType, qty: Decimal, price: Decimal) -> NewTransaction {
            NewTransaction::market(self.portfolio.id, self.asset.id, side, qty, price, Utc::now())
        }

        fn position(&self) -> Result<Option<Position>> {
            self.service
                .repository()
                .get_position(self.portfolio.id, self.asset.id)
        }
    }

    #[test]
    fn test_record_buy_then_sell() -> Result<()> {
        let mut f = fixture()?;
        f.service
            .record_transaction(f.trade(TransactionType::Buy, dec!(10), dec!(5)))?;
        f.service
            .record_transaction(f.trade(TransactionType::Buy, dec!(10), dec!(7)))?;
        let sell = f
            .service
            .record_transaction(f.trade(TransactionType::Sell, dec!(5), dec!(9)))?;

        assert_eq!(sell.realized_pl, Some(dec!(15)));
        assert_eq!(sell.value, dec!(45));
        let position = f.position()?.unwrap();
        assert_eq!(position.quantity, dec!(15));
        assert_eq!(position.average_purchase_price, dec!(6));
        assert_eq!(position.total_investment, dec!(90));
        Ok(())
    }

    #[test]
    fn test_oversell_writes_nothing() -> Result<()> {
        let mut f = fixture()?;
        f.service
            .record_transaction(f.trade(TransactionType::Buy, dec!(15), dec!(6)))?;
        let err = f
            .service
            .record_transaction(f.trade(TransactionType::Sell, dec!(999), dec!(6)))
            .unwrap_err();
        assert!(matches!(
            ledger_error(&err),
            Some(LedgerError::InsufficientHoldings { .. })
        ));
        assert_eq!(f.position()?.unwrap().quantity, dec!(15));
        assert_eq!(
            f.service
                .repository()
                .get_transactions_by_portfolio(f.portfolio.id)?
                .len(),
            1
        );
        Ok(())
    }

    #[test]
    fn test_unknown_portfolio_or_asset_is_not_found() -> Result<()> {
        let mut f = fixture()?;
        let mut trade = f.trade(TransactionType::Buy, dec!(1), dec!(1));
        trade.asset_id = Uuid::new_v4();
        let err = f.service.record_transaction(trade).unwrap_err();
        assert!(matches!(
            ledger_error(&err),
            Some(LedgerError::NotFound { entity: "asset", .. })
        ));

        let mut trade = f.trade(TransactionType::Buy, dec!(1), dec!(1));
        trade.portfolio_id = Uuid::new_v4();
        let err = f.service.record_transaction(trade).unwrap_err();
        assert!(matches!(
            ledger_error(&err),
            Some(LedgerError::NotFound { entity: "portfolio", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_pending_trade_does_not_move_position() -> Result<()> {
        let mut f = fixture()?;
        let mut pending = f.trade(TransactionType::Buy, dec!(3), dec!(2));
        pending.status = TransactionStatus::Pending;
        let stored = f.service.record_transaction(pending)?;
        assert_eq!(stored.value, dec!(6));
        assert!(f.position()?.is_none());
        Ok(())
    }

    #[test]
    fn test_amend_rebuilds_position_and_own_realized_pl() -> Result<()> {
        let mut f = fixture()?;
        let buy = f
            .service
            .record_transaction(f.trade(TransactionType::Buy, dec!(10), dec!(5)))?;
        let sell = f
            .service
            .record_transaction(f.trade(TransactionType::Sell, dec!(4), dec!(8)))?;
        assert_eq!(sell.realized_pl, Some(dec!(12)));

        // raise the buy price: sell P&L stays as recorded
        f.service.amend_transaction(
            buy.id,
            &TransactionUpdate {
                price: Some(dec!(6)),
                ..Default::default()
            },
        )?;
        let position = f.position()?.unwrap();
        assert_eq!(position.quantity, dec!(6));
        assert_eq!(position.average_purchase_price, dec!(6));
        let stored_sell = f.service.repository().get_transaction(sell.id)?.unwrap();
        assert_eq!(stored_sell.realized_pl, Some(dec!(12)));

        // amending the sell itself recomputes its P&L against the new basis
        let amended = f.service.amend_transaction(
            sell.id,
            &TransactionUpdate {
                quantity: Some(dec!(5)),
                ..Default::default()
            },
        )?;
        assert_eq!(amended.realized_pl, Some(dec!(10)));
        assert_eq!(amended.value, dec!(40));
        assert_eq!(f.position()?.unwrap().quantity, dec!(5));
        Ok(())
    }

    #[test]
    fn test_amend_that_oversells_is_rejected() -> Result<()> {
        let mut f = fixture()?;
        let buy = f
            .service
            .record_transaction(f.trade(TransactionType::Buy, dec!(10), dec!(5)))?;
        f.service
            .record_transaction(f.trade(TransactionType::Sell, dec!(8), dec!(5)))?;

        let err = f
            .service
            .amend_transaction(
                buy.id,
                &TransactionUpdate {
                    quantity: Some(dec!(2)),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            ledger_error(&err),
            Some(LedgerError::InsufficientHoldings { .. })
        ));
        let stored = f.service.repository().get_transaction(buy.id)?.unwrap();
        assert_eq!(stored.quantity, dec!(10));
        assert_eq!(f.position()?.unwrap().quantity, dec!(2));
        Ok(())
    }

    #[test]
    fn test_amend_validates_merged_order() -> Result<()> {
        let mut f = fixture()?;
        let buy = f
            .service
            .record_transaction(f.trade(TransactionType::Buy, dec!(1), dec!(5)))?;
        let err = f
            .service
            .amend_transaction(
                buy.id,
                &TransactionUpdate {
                    order_type: Some(OrderType::Limit),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(ledger_error(&err), Some(LedgerError::InvalidOrder(_))));
        Ok(())
    }

    #[test]
    fn test_delete_transaction_rebuilds_position() -> Result<()> {
        let mut f = fixture()?;
        f.service
            .record_transaction(f.trade(TransactionType::Buy, dec!(10), dec!(5)))?;
        let second = f
            .service
            .record_transaction(f.trade(TransactionType::Buy, dec!(10), dec!(7)))?;

        f.service.delete_transaction(second.id)?;
        let position = f.position()?.unwrap();
        assert_eq!(position.quantity, dec!(10));
        assert_eq!(position.average_purchase_price, dec!(5));

        let err = f.service.delete_transaction(second.id).unwrap_err();
        assert!(matches!(
            ledger_error(&err),
            Some(LedgerError::NotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_delete_buy_backing_a_sell_is_rejected() -> Result<()> {
        let mut f = fixture()?;
        let buy = f
            .service
            .record_transaction(f.trade(TransactionType::Buy, dec!(10), dec!(5)))?;
        f.service
            .record_transaction(f.trade(TransactionType::Sell, dec!(4), dec!(5)))?;

        let err = f.service.delete_transaction(buy.id).unwrap_err();
        assert!(matches!(
            ledger_error(&err),
            Some(LedgerError::InsufficientHoldings { .. })
        ));
        assert!(f.service.repository().get_transaction(buy.id)?.is_some());
        Ok(())
    }

    #[test]
    fn test_portfolio_name_rules() -> Result<()> {
        let mut f = fixture()?;
        assert!(f.service.create_portfolio(Uuid::new_v4(), "   ").is_err());
        assert!(f
            .service
            .create_portfolio(Uuid::new_v4(), &"x".repeat(51))
            .is_err());

        let renamed = f.service.rename_portfolio(
            f.portfolio.id,
            &PortfolioUpdate {
                name: Some("  Growth ".to_string()),
            },
        )?;
        assert_eq!(renamed.name, "Growth");

        f.service.delete_portfolio(f.portfolio.id)?;
        let err = f.service.delete_portfolio(f.portfolio.id).unwrap_err();
        assert!(matches!(
            ledger_error(&err),
            Some(LedgerError::NotFound { entity: "portfolio", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_duplicate_asset_symbol_rejected() -> Result<()> {
        let mut f = fixture()?;
        assert_eq!(f.asset.symbol, "AAPL");
        assert_eq!(f.asset.exchange, "NASDAQ");
        assert!(f.service.add_asset("AAPL", "Apple", "NASDAQ").is_err());
        Ok(())
    }

    #[test]
    fn test_amend_keeps_the_recorded_side() -> Result<()> {
        let mut f = fixture()?;
        f.service
            .record_transaction(f.trade(TransactionType::Buy, dec!(10), dec!(5)))?;
        let sell = f
            .service
            .record_transaction(f.trade(TransactionType::Sell, dec!(4), dec!(5)))?;

        let amended = f.service.amend_transaction(
            sell.id,
            &TransactionUpdate {
                price: Some(dec!(7)),
                ..Default::default()
            },
        )?;
        assert_eq!(amended.transaction_type, TransactionType::Sell);
        assert_eq!(amended.realized_pl, Some(dec!(8)));
        let stored = f.service.repository().get_transaction(sell.id)?.unwrap();
        assert_eq!(stored.transaction_type, TransactionType::Sell);
        assert_eq!(f.position()?.unwrap().quantity, dec!(6));
        Ok(())
    }

    #[test]
    fn test_trades_of_deleted_portfolio_cannot_be_changed() -> Result<()> {
        let mut f = fixture()?;
        let buy = f
            .service
            .record_transaction(f.trade(TransactionType::Buy, dec!(10), dec!(5)))?;
        f.service.delete_portfolio(f.portfolio.id)?;

        let err = f
            .service
            .amend_transaction(
                buy.id,
                &TransactionUpdate {
                    quantity: Some(dec!(7)),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            ledger_error(&err),
            Some(LedgerError::NotFound { entity: "portfolio", .. })
        ));

        let err = f.service.delete_transaction(buy.id).unwrap_err();
        assert!(matches!(
            ledger_error(&err),
            Some(LedgerError::NotFound { entity: "portfolio", .. })
        ));

        assert!(f.position()?.is_none());
        let stored = f.service.repository().get_transaction(buy.id)?.unwrap();
        assert_eq!(stored.quantity, dec!(10));
        Ok(())
    }

    #[test]
    fn test_out_of_range_trade_writes_nothing() -> Result<()> {
        let mut f = fixture()?;
        let err = f
            .service
            .record_transaction(f.trade(TransactionType::Buy, Decimal::MAX, dec!(2)))
            .unwrap_err();
        assert!(matches!(ledger_error(&err), Some(LedgerError::Overflow(_))));
        assert!(f.position()?.is_none());
        assert!(f
            .service
            .repository()
            .get_transactions_by_portfolio(f.portfolio.id)?
            .is_empty());
        Ok(())
    }

    #[test]
    fn test_backdated_trade_takes_its_place_in_history() -> Result<()> {
        let mut f = fixture()?;
        let now = Utc::now();
        let mut buy = f.trade(TransactionType::Buy, dec!(10), dec!(5));
        buy.transaction_date = now;
        f.service.record_transaction(buy)?;

        // nothing was held yet on the earlier date
        let mut early_sell = f.trade(TransactionType::Sell, dec!(5), dec!(9));
        early_sell.transaction_date = now - chrono::Duration::days(4);
        let err = f.service.record_transaction(early_sell).unwrap_err();
        assert!(matches!(
            ledger_error(&err),
            Some(LedgerError::InsufficientHoldings { .. })
        ));
        assert_eq!(f.position()?.unwrap().quantity, dec!(10));
        assert_eq!(
            f.service
                .repository()
                .get_transactions_by_portfolio(f.portfolio.id)?
                .len(),
            1
        );

        // an earlier buy is folded in before the existing one
        let mut early_buy = f.trade(TransactionType::Buy, dec!(10), dec!(7));
        early_buy.transaction_date = now - chrono::Duration::days(2);
        let stored = f.service.record_transaction(early_buy)?;
        assert_eq!(stored.realized_pl, None);
        let position = f.position()?.unwrap();
        assert_eq!(position.quantity, dec!(20));
        assert_eq!(position.total_investment, dec!(120));
        assert_eq!(position.average_purchase_price, dec!(6));
        Ok(())
    }
}
