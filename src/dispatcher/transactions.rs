use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use papertrade::db::{
    LedgerRepository, NewTransaction, OrderType, TransactionType, TransactionUpdate,
};
use papertrade::reports;
use std::collections::HashMap;
use uuid::Uuid;

use super::{asset_label, resolve_asset, resolve_portfolio, Context};
use crate::cli::{formatters, TradeArgs, TradeCommands, TransactionCommands};

pub fn dispatch_trade(action: TradeCommands, ctx: &Context) -> Result<()> {
    match action {
        TradeCommands::Buy(args) => record_trade(TransactionType::Buy, args, ctx),
        TradeCommands::Sell(args) => record_trade(TransactionType::Sell, args, ctx),
    }
}

pub fn dispatch_transactions(action: TransactionCommands, ctx: &Context) -> Result<()> {
    match action {
        TransactionCommands::List { portfolio } => list_transactions(portfolio.as_deref(), ctx),
        TransactionCommands::Amend {
            id,
            quantity,
            price,
            order_type,
            limit,
            clear_limit,
            status,
            date,
        } => {
            let update = TransactionUpdate {
                status,
                order_type,
                limit_price: if clear_limit { Some(None) } else { limit.map(Some) },
                quantity,
                price,
                transaction_date: date,
            };
            amend_transaction(id, &update, ctx)
        }
        TransactionCommands::Delete { id } => delete_transaction(id, ctx),
    }
}

fn record_trade(side: TransactionType, args: TradeArgs, ctx: &Context) -> Result<()> {
    let mut ledger = ctx.open_ledger()?;
    let (portfolio, asset) = {
        let repo = ledger.repository();
        (
            resolve_portfolio(&repo, ctx.user_id, &args.portfolio)?,
            resolve_asset(&repo, &args.symbol)?,
        )
    };

    let order_type = args.order_type.unwrap_or(if args.limit.is_some() {
        OrderType::Limit
    } else {
        OrderType::Market
    });
    let new = NewTransaction {
        portfolio_id: portfolio.id,
        asset_id: asset.id,
        transaction_type: side,
        status: args.status,
        order_type,
        limit_price: args.limit,
        quantity: args.quantity,
        price: args.price,
        transaction_date: args.date.unwrap_or_else(Utc::now),
    };

    let tx = ledger.record_transaction(new)?;

    if ctx.json_output {
        println!("{}", formatters::to_json(&tx)?);
    } else {
        println!(
            "{}",
            formatters::format_trade(&tx, &asset.symbol, "Recorded", ctx.scale())
        );
    }
    Ok(())
}

fn list_transactions(portfolio: Option<&str>, ctx: &Context) -> Result<()> {
    let ledger = ctx.open_ledger()?;
    let repo = ledger.repository();

    let rows = match portfolio {
        Some(ident) => {
            let portfolio = resolve_portfolio(&repo, ctx.user_id, ident)?;
            let names: HashMap<Uuid, String> = repo
                .list_assets()?
                .into_iter()
                .map(|a| (a.id, a.name))
                .collect();
            let transactions = repo.get_transactions_by_portfolio(portfolio.id)?;
            reports::merge_transactions_for_display(transactions, &portfolio.name, |asset_id| {
                names.get(&asset_id).cloned()
            })
        }
        None => reports::user_transactions(&repo, ctx.user_id)?,
    };

    if ctx.json_output {
        println!("{}", formatters::to_json(&rows)?);
    } else {
        println!("{}", formatters::format_transactions_table(&rows, ctx.scale()));
    }
    Ok(())
}

fn amend_transaction(id: Uuid, update: &TransactionUpdate, ctx: &Context) -> Result<()> {
    let mut ledger = ctx.open_ledger()?;
    let tx = ledger.amend_transaction(id, update)?;

    if ctx.json_output {
        println!("{}", formatters::to_json(&tx)?);
    } else {
        let label = asset_label(&ledger.repository(), tx.asset_id)?;
        println!(
            "{}",
            formatters::format_trade(&tx, &label, "Amended", ctx.scale())
        );
    }
    Ok(())
}

fn delete_transaction(id: Uuid, ctx: &Context) -> Result<()> {
    let mut ledger = ctx.open_ledger()?;
    let tx = ledger.delete_transaction(id)?;

    if ctx.json_output {
        println!(
            "{}",
            formatters::to_json(&serde_json::json!({ "deleted": tx.id }))?
        );
    } else {
        println!("{} Transaction {} deleted", "✓".green().bold(), tx.id);
    }
    Ok(())
}
