//! Display formatting for money and quantities
//!
//! The ledger keeps full decimal precision; rounding happens here, at the
//! presentation boundary, and nowhere else.

use rust_decimal::{Decimal, RoundingStrategy};

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include "$" prefix
    Usd,
    /// No currency symbol (for quantities and table cells)
    None,
}

/// Round half away from zero to `scale` places, keeping trailing zeros.
///
/// ```
/// use papertrade::utils::round_for_display;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(round_for_display(dec!(8.875), 2).to_string(), "8.88");
/// assert_eq!(round_for_display(dec!(5), 2).to_string(), "5.00");
/// ```
pub fn round_for_display(value: Decimal, scale: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

/// Core formatting function with full control over output.
///
/// Uses `,` as thousands separator and `.` as decimal separator, with
/// `scale` decimal places.
///
/// ```
/// use papertrade::utils::{format_money_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_money_with_width(dec!(1234.56), 2, 0, CurrencySymbol::Usd),
///     "$1,234.56"
/// );
/// assert_eq!(
///     format_money_with_width(dec!(1234), 2, 12, CurrencySymbol::None),
///     "    1,234.00"
/// );
/// ```
pub fn format_money_with_width(
    value: Decimal,
    scale: u32,
    width: usize,
    symbol: CurrencySymbol,
) -> String {
    let rounded = round_for_display(value, scale);
    let is_negative = rounded < Decimal::ZERO;
    let formatted = rounded.abs().to_string();
    let (integer_part, decimal_part) = match formatted.split_once('.') {
        Some((int, dec)) => (int, Some(dec)),
        None => (formatted.as_str(), None),
    };

    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec![',', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    let prefix = match symbol {
        CurrencySymbol::Usd => "$",
        CurrencySymbol::None => "",
    };

    let result = match decimal_part {
        Some(dec) => format!("{}{}{}.{}", sign, prefix, with_separators, dec),
        None => format!("{}{}{}", sign, prefix, with_separators),
    };

    if width > 0 && result.len() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// Format as money with symbol: "$1,234.56"
pub fn format_money(value: Decimal, scale: u32) -> String {
    format_money_with_width(value, scale, 0, CurrencySymbol::Usd)
}

/// Format number only (no symbol): "1,234.56"
pub fn format_decimal(value: Decimal, scale: u32) -> String {
    format_money_with_width(value, scale, 0, CurrencySymbol::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_for_display_half_away_from_zero() {
        assert_eq!(round_for_display(dec!(2.345), 2), dec!(2.35));
        assert_eq!(round_for_display(dec!(-2.345), 2), dec!(-2.35));
        assert_eq!(round_for_display(dec!(2.344), 2), dec!(2.34));
        assert_eq!(round_for_display(dec!(1.5), 0).to_string(), "2");
    }

    #[test]
    fn test_format_money_basic() {
        assert_eq!(format_money(dec!(1234.56), 2), "$1,234.56");
        assert_eq!(format_money(dec!(0.99), 2), "$0.99");
        assert_eq!(format_money(dec!(1000000), 2), "$1,000,000.00");
        assert_eq!(format_money(dec!(0), 2), "$0.00");
    }

    #[test]
    fn test_format_money_negative() {
        assert_eq!(format_money(dec!(-1234.56), 2), "-$1,234.56");
        assert_eq!(format_money(dec!(-0.01), 2), "-$0.01");
    }

    #[test]
    fn test_format_rounds_instead_of_truncating() {
        assert_eq!(format_money(dec!(1.999), 2), "$2.00");
        assert_eq!(format_decimal(dec!(8.875), 2), "8.88");
        // rounding to zero drops the sign
        assert_eq!(format_money(dec!(-0.001), 2), "$0.00");
    }

    #[test]
    fn test_format_respects_scale() {
        assert_eq!(format_decimal(dec!(1234.5678), 4), "1,234.5678");
        assert_eq!(format_decimal(dec!(1234.5678), 0), "1,235");
    }

    #[test]
    fn test_format_with_width() {
        let result = format_money_with_width(dec!(100), 2, 12, CurrencySymbol::Usd);
        assert_eq!(result, "     $100.00");
        let result = format_money_with_width(dec!(1000000), 2, 5, CurrencySymbol::Usd);
        assert_eq!(result, "$1,000,000.00");
    }
}
