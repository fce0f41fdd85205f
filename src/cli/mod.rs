use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use papertrade::db::{OrderType, TransactionStatus};
use rust_decimal::Decimal;
use uuid::Uuid;

pub mod formatters;

#[derive(Parser)]
#[command(name = "papertrade")]
#[command(version, about = "Paper-trading ledger with weighted-average cost positions")]
#[command(
    long_about = "Record simulated buy and sell trades per portfolio, track positions at weighted-average cost, and report realized P&L."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Act as this user (defaults to `user_id` from config.toml)
    #[arg(long, global = true, env = "PAPERTRADE_USER")]
    pub user: Option<Uuid>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Portfolio management and viewing
    Portfolio {
        #[command(subcommand)]
        action: PortfolioCommands,
    },

    /// Asset management
    Asset {
        #[command(subcommand)]
        action: AssetCommands,
    },

    /// Record a simulated trade
    Trade {
        #[command(subcommand)]
        action: TradeCommands,
    },

    /// Inspect and correct recorded trades
    Transactions {
        #[command(subcommand)]
        action: TransactionCommands,
    },
}

#[derive(Subcommand)]
pub enum PortfolioCommands {
    /// Create a new portfolio
    Create {
        /// Portfolio name (up to 50 characters)
        name: String,
    },

    /// List your portfolios with merged positions
    List,

    /// Show one portfolio with merged positions
    Show {
        /// Portfolio id or name
        portfolio: String,
    },

    /// Rename a portfolio
    Rename {
        /// Portfolio id or name
        portfolio: String,

        /// New name
        name: String,
    },

    /// Delete a portfolio (trades are kept)
    Delete {
        /// Portfolio id or name
        portfolio: String,
    },
}

#[derive(Subcommand)]
pub enum AssetCommands {
    /// Register a tradable asset
    Add {
        /// Ticker symbol (e.g., AAPL)
        symbol: String,

        /// Display name (e.g., "Apple Inc.")
        name: String,

        /// Exchange code
        #[arg(short, long, default_value = "NASDAQ")]
        exchange: String,
    },

    /// List registered assets
    List,
}

#[derive(clap::Args)]
pub struct TradeArgs {
    /// Portfolio id or name
    pub portfolio: String,

    /// Asset symbol
    pub symbol: String,

    /// Number of units (must be positive)
    pub quantity: Decimal,

    /// Execution price per unit
    pub price: Decimal,

    /// Limit price; makes the order a LIMIT order unless --order-type says otherwise
    #[arg(long)]
    pub limit: Option<Decimal>,

    /// Order type (market or limit)
    #[arg(long, value_parser = parse_order_type)]
    pub order_type: Option<OrderType>,

    /// Trade time (YYYY-MM-DD, "YYYY-MM-DD HH:MM:SS" or RFC 3339, UTC); defaults to now
    #[arg(long, value_parser = parse_trade_date)]
    pub date: Option<DateTime<Utc>>,

    /// Trade status (pending, cancelled, fulfilled)
    #[arg(long, value_parser = parse_status, default_value = "fulfilled")]
    pub status: TransactionStatus,
}

#[derive(Subcommand)]
pub enum TradeCommands {
    /// Buy units of an asset
    Buy(TradeArgs),

    /// Sell units of an asset
    Sell(TradeArgs),
}

#[derive(Subcommand)]
pub enum TransactionCommands {
    /// List trades across your portfolios
    List {
        /// Only trades of this portfolio (id or name)
        #[arg(short, long)]
        portfolio: Option<String>,
    },

    /// Change fields of a recorded trade and rebuild its position
    Amend {
        /// Transaction id
        id: Uuid,

        #[arg(long)]
        quantity: Option<Decimal>,

        #[arg(long)]
        price: Option<Decimal>,

        #[arg(long, value_parser = parse_order_type)]
        order_type: Option<OrderType>,

        #[arg(long, conflicts_with = "clear_limit")]
        limit: Option<Decimal>,

        /// Remove the limit price
        #[arg(long)]
        clear_limit: bool,

        #[arg(long, value_parser = parse_status)]
        status: Option<TransactionStatus>,

        #[arg(long, value_parser = parse_trade_date)]
        date: Option<DateTime<Utc>>,
    },

    /// Delete a recorded trade and rebuild its position
    Delete {
        /// Transaction id
        id: Uuid,
    },
}

pub fn parse_order_type(s: &str) -> Result<OrderType, String> {
    s.parse()
        .map_err(|_| format!("Invalid order type '{}'. Use market or limit", s))
}

pub fn parse_status(s: &str) -> Result<TransactionStatus, String> {
    s.parse()
        .map_err(|_| format!("Invalid status '{}'. Use pending, cancelled or fulfilled", s))
}

/// Parse a trade time. Dates without a time mean midnight UTC.
pub fn parse_trade_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(format!(
        "Invalid date '{}'. Use YYYY-MM-DD, \"YYYY-MM-DD HH:MM:SS\" or RFC 3339",
        s
    ))
}
