//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;
use std::str::FromStr;

use rust_decimal::Decimal;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats an amount with two decimals and thousands separators.
///
/// Usage in templates: `{{ order.total_amount|money }}` renders `1 234.50`.
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn money(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_money(&value.to_string()))
}

/// Formats a millimetre length without trailing zeros.
///
/// Usage in templates: `{{ canvas.width_mm|mm }}` renders `120 mm`.
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn mm(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    let text = Decimal::from_str(&raw).map_or(raw, |d| d.round_dp(1).normalize().to_string());
    Ok(format!("{text} mm"))
}

fn format_money(raw: &str) -> String {
    let Ok(amount) = Decimal::from_str(raw) else {
        return raw.to_owned();
    };

    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_at(fixed.len() - 3);

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}{cents}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money("0"), "0.00");
        assert_eq!(format_money("12.5"), "12.50");
        assert_eq!(format_money("1234.567"), "1 234.57");
        assert_eq!(format_money("1000000"), "1 000 000.00");
        assert_eq!(format_money("-42.1"), "-42.10");
        assert_eq!(format_money("n/a"), "n/a");
    }
}
