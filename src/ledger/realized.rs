//! Realized profit/loss recognized at the moment of a sale.

use rust_decimal::Decimal;

use crate::error::LedgerError;

/// Gain (positive) or loss (negative) locked in by selling `quantity` units at
/// `sell_price`, measured against the average cost held *before* the sale.
pub fn realized_pl(
    quantity: Decimal,
    sell_price: Decimal,
    average_cost_before: Decimal,
) -> Result<Decimal, LedgerError> {
    sell_price
        .checked_sub(average_cost_before)
        .and_then(|margin| quantity.checked_mul(margin))
        .ok_or(LedgerError::Overflow("realized P&L"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sell_above_cost_is_gain() {
        assert_eq!(realized_pl(dec!(5), dec!(9), dec!(6)), Ok(dec!(15)));
        assert!(realized_pl(dec!(1), dec!(6.01), dec!(6)).unwrap() > Decimal::ZERO);
    }

    #[test]
    fn test_sell_below_cost_is_loss() {
        assert_eq!(realized_pl(dec!(4), dec!(2.5), dec!(3)), Ok(dec!(-2)));
    }

    #[test]
    fn test_sell_at_cost_is_exactly_zero() {
        assert_eq!(realized_pl(dec!(15), dec!(6), dec!(6.00)), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_fractional_units() {
        assert_eq!(realized_pl(dec!(0.5), dec!(101), dec!(100)), Ok(dec!(0.5)));
    }

    #[test]
    fn test_out_of_range_result_is_an_error() {
        assert_eq!(
            realized_pl(Decimal::MAX, Decimal::MAX, dec!(0)),
            Err(LedgerError::Overflow("realized P&L"))
        );
    }
}
