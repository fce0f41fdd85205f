//! Papertrade - paper-trading position and ledger accounting
//!
//! Records simulated buy and sell trades per portfolio, maintains one
//! weighted-average cost position per (portfolio, asset) pair, computes
//! realized P&L on sells and builds merged portfolio views for display.

pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod reports;
pub mod service;
pub mod utils;
