//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of ledger calculation from presentation. Values are rounded
//! to the configured display scale here and only here; JSON output keeps
//! full precision.

use anyhow::Result;
use colored::Colorize;
use papertrade::db::{Asset, Portfolio, Transaction, TransactionRow};
use papertrade::reports::PortfolioView;
use papertrade::utils::{format_decimal, format_money};
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn colored_pl(value: Decimal, scale: u32) -> String {
    let text = format_money(value, scale);
    if value >= Decimal::ZERO {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

/// Format one portfolio with its merged positions
pub fn format_portfolio_table(view: &PortfolioView, scale: u32) -> String {
    let mut output = format!(
        "\n{} {}  {}\n\n",
        "📊".cyan().bold(),
        view.portfolio.name.bold(),
        view.portfolio.id.to_string().bright_black()
    );

    if view.positions.is_empty() {
        output.push_str(&format!("{} No positions found\n", "ℹ".blue().bold()));
        return output;
    }

    #[derive(Tabled)]
    struct PositionLine {
        #[tabled(rename = "Asset")]
        asset: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Avg Price")]
        average: String,
        #[tabled(rename = "Invested")]
        invested: String,
    }

    let rows: Vec<PositionLine> = view
        .positions
        .iter()
        .map(|p| PositionLine {
            asset: p
                .asset_name
                .clone()
                .unwrap_or_else(|| p.asset_id.to_string()),
            quantity: format_decimal(p.quantity, scale),
            average: p
                .average_purchase_price
                .map(|avg| format_money(avg, scale))
                .unwrap_or_else(|| "-".to_string()),
            invested: format_money(p.total_investment, scale),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());
    output.push_str(&table.to_string());

    output.push_str(&format!(
        "\n{:<20} {}\n",
        "Total Invested:".bold(),
        format_money(view.total_investment, scale)
    ));
    output
}

pub fn format_empty_portfolios() -> String {
    format!(
        "{} No portfolios found\nCreate one using: {} portfolio create <name>\n",
        "ℹ".blue().bold(),
        "papertrade".bold()
    )
}

pub fn format_portfolio_saved(portfolio: &Portfolio, verb: &str) -> String {
    format!(
        "{} Portfolio {} {} ({})",
        "✓".green().bold(),
        portfolio.name.bold(),
        verb,
        portfolio.id
    )
}

pub fn format_assets_table(assets: &[Asset]) -> String {
    if assets.is_empty() {
        return format!("{} No assets registered\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct AssetLine {
        #[tabled(rename = "Symbol")]
        symbol: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Exchange")]
        exchange: String,
        #[tabled(rename = "Id")]
        id: String,
    }

    let rows: Vec<AssetLine> = assets
        .iter()
        .map(|a| AssetLine {
            symbol: a.symbol.clone(),
            name: a.name.clone(),
            exchange: a.exchange.clone(),
            id: a.id.to_string(),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.to_string()
}

/// Confirmation line after a trade was recorded or amended
pub fn format_trade(tx: &Transaction, symbol: &str, verb: &str, scale: u32) -> String {
    let mut line = format!(
        "{} {} {} {} {} x {} = {} [{}]",
        "✓".green().bold(),
        verb,
        tx.transaction_type.as_str(),
        symbol.bold(),
        format_decimal(tx.quantity, scale),
        format_money(tx.price, scale),
        format_money(tx.value, scale),
        tx.status.as_str()
    );
    if let Some(pl) = tx.realized_pl {
        line.push_str(&format!("  Realized P&L: {}", colored_pl(pl, scale)));
    }
    line.push_str(&format!("\n  id: {}", tx.id));
    line
}

pub fn format_transactions_table(rows: &[TransactionRow], scale: u32) -> String {
    if rows.is_empty() {
        return format!("{} No transactions found\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct TransactionLine {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Portfolio")]
        portfolio: String,
        #[tabled(rename = "Asset")]
        asset: String,
        #[tabled(rename = "Type")]
        side: String,
        #[tabled(rename = "Order")]
        order: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Realized P&L")]
        realized: String,
        #[tabled(rename = "Id")]
        id: String,
    }

    let lines: Vec<TransactionLine> = rows
        .iter()
        .map(|row| {
            let tx = &row.transaction;
            let order = match tx.limit_price {
                Some(limit) => format!("{} @ {}", tx.order_type.as_str(), format_money(limit, scale)),
                None => tx.order_type.as_str().to_string(),
            };
            TransactionLine {
                date: tx.transaction_date.format("%Y-%m-%d %H:%M").to_string(),
                portfolio: row.portfolio_name.clone().unwrap_or_default(),
                asset: row.asset_name.clone().unwrap_or_else(|| "-".to_string()),
                side: tx.transaction_type.as_str().to_string(),
                order,
                status: tx.status.as_str().to_string(),
                quantity: format_decimal(tx.quantity, scale),
                price: format_money(tx.price, scale),
                value: format_money(tx.value, scale),
                realized: tx
                    .realized_pl
                    .map(|pl| colored_pl(pl, scale))
                    .unwrap_or_else(|| "-".to_string()),
                id: tx.id.to_string(),
            }
        })
        .collect();

    let mut table = Table::new(&lines);
    table.with(Style::modern());
    table.modify(Columns::new(6..10), Alignment::right());
    table.to_string()
}
