//! Command dispatcher that routes parsed clap commands to their handlers.
//!
//! Handlers open the ledger from the loaded settings, call into the library
//! and print either a table or JSON.

mod assets;
mod portfolio;
mod transactions;

use anyhow::Result;
use papertrade::config::Settings;
use papertrade::db::{Asset, LedgerRepository, Portfolio};
use papertrade::error::LedgerError;
use papertrade::service::LedgerService;
use uuid::Uuid;

use crate::cli::Commands;

/// Everything a handler needs besides its own arguments
pub struct Context {
    pub settings: Settings,
    pub user_id: Uuid,
    pub json_output: bool,
}

impl Context {
    pub fn open_ledger(&self) -> Result<LedgerService> {
        LedgerService::from_settings(&self.settings)
    }

    pub fn scale(&self) -> u32 {
        self.settings.display_scale
    }
}

/// Route a parsed command to its handler
pub fn dispatch_command(command: Commands, ctx: &Context) -> Result<()> {
    match command {
        Commands::Portfolio { action } => portfolio::dispatch_portfolio(action, ctx),
        Commands::Asset { action } => assets::dispatch_assets(action, ctx),
        Commands::Trade { action } => transactions::dispatch_trade(action, ctx),
        Commands::Transactions { action } => transactions::dispatch_transactions(action, ctx),
    }
}

/// Find one of the user's portfolios by id or by (case-insensitive) name
pub fn resolve_portfolio<R: LedgerRepository>(
    repo: &R,
    user_id: Uuid,
    ident: &str,
) -> Result<Portfolio> {
    if let Ok(id) = Uuid::parse_str(ident) {
        if let Some(portfolio) = repo.get_portfolio(id)? {
            return Ok(portfolio);
        }
    }
    repo.get_portfolios_by_user(user_id)?
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(ident.trim()))
        .ok_or_else(|| LedgerError::not_found("portfolio", ident).into())
}

pub fn resolve_asset<R: LedgerRepository>(repo: &R, symbol: &str) -> Result<Asset> {
    Ok(repo
        .get_asset_by_symbol(symbol.trim())?
        .ok_or_else(|| LedgerError::not_found("asset", symbol))?)
}

/// Symbol for display, falling back to the id when the asset is gone
pub fn asset_label<R: LedgerRepository>(repo: &R, asset_id: Uuid) -> Result<String> {
    Ok(repo
        .get_asset(asset_id)?
        .map(|a| a.symbol)
        .unwrap_or_else(|| asset_id.to_string()))
}
