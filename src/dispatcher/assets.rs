use anyhow::Result;
use colored::Colorize;
use papertrade::db::LedgerRepository;

use super::Context;
use crate::cli::{formatters, AssetCommands};

pub fn dispatch_assets(action: AssetCommands, ctx: &Context) -> Result<()> {
    match action {
        AssetCommands::Add {
            symbol,
            name,
            exchange,
        } => add_asset(&symbol, &name, &exchange, ctx),
        AssetCommands::List => list_assets(ctx),
    }
}

fn add_asset(symbol: &str, name: &str, exchange: &str, ctx: &Context) -> Result<()> {
    let mut ledger = ctx.open_ledger()?;
    let asset = ledger.add_asset(symbol, name, exchange)?;

    if ctx.json_output {
        println!("{}", formatters::to_json(&asset)?);
    } else {
        println!(
            "{} Asset {} added ({})",
            "✓".green().bold(),
            asset.symbol.bold(),
            asset.id
        );
    }
    Ok(())
}

fn list_assets(ctx: &Context) -> Result<()> {
    let ledger = ctx.open_ledger()?;
    let assets = ledger.repository().list_assets()?;

    if ctx.json_output {
        println!("{}", formatters::to_json(&assets)?);
    } else {
        println!("{}", formatters::format_assets_table(&assets));
    }
    Ok(())
}
