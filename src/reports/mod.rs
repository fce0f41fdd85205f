// Reports module - read-only views over the ledger

pub mod portfolio;

pub use portfolio::{
    merge_positions, merge_transactions_for_display, portfolio_view, user_transactions, user_view,
    PortfolioView,
};
