//! Position accounting engine: validation, weighted-average cost positions
//! and realized P&L. Everything here is synchronous and free of I/O.

pub mod position;
pub mod realized;
pub mod validation;

pub use position::{
    apply_transaction, consolidate_lots, rebuild_position, AppliedTrade, RebuiltPosition,
};
pub use realized::realized_pl;
pub use validation::{check_amounts, validate_transaction, LimitPricePolicy};
