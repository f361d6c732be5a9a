//! FILENAME: core/pivot-engine/src/number_format.rs
//! PURPOSE: Number formatting for calculated-field display strings.
//! CONTEXT: Output follows en-US conventions: comma thousands separator,
//! dot decimal separator, currency symbol before the amount.

/// Largest number of fraction digits shown by the plain number format.
const MAX_FRACTION_DIGITS: usize = 3;

/// Plain locale number: grouped, at most three decimals, trailing zeros
/// dropped (`1234.5` -> `1,234.5`, `2.0` -> `2`).
pub fn format_locale_number(value: f64) -> String {
    let fixed = format!("{:.prec$}", value, prec = MAX_FRACTION_DIGITS);
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };
    add_thousands_separator(strip_negative_zero(trimmed))
}

/// Format a number with specified decimal places and optional thousands separator.
pub fn format_decimal(value: f64, decimal_places: u8, use_thousands_separator: bool) -> String {
    let rounded = format!("{:.prec$}", value, prec = decimal_places as usize);
    let rounded = strip_negative_zero(&rounded);

    if use_thousands_separator {
        add_thousands_separator(rounded)
    } else {
        rounded.to_string()
    }
}

/// Format a number as currency with the symbol before the amount and a
/// leading minus for negatives (`-$1,234.50`).
pub fn format_currency(value: f64, decimal_places: u8, symbol: &str) -> String {
    let formatted = add_thousands_separator(&format!(
        "{:.prec$}",
        value.abs(),
        prec = decimal_places as usize
    ));
    let is_zero = formatted.chars().all(|c| !c.is_ascii_digit() || c == '0');

    if value < 0.0 && !is_zero {
        format!("-{}{}", symbol, formatted)
    } else {
        format!("{}{}", symbol, formatted)
    }
}

/// Format a number as percentage.
pub fn format_percentage(value: f64, decimal_places: u8) -> String {
    format!("{}%", format_decimal(value * 100.0, decimal_places, false))
}

/// Add thousands separators to a numeric string.
fn add_thousands_separator(s: &str) -> String {
    let (integer_part, decimal_part) = match s.split_once('.') {
        Some((int, dec)) => (int, Some(dec)),
        None => (s, None),
    };

    let negative = integer_part.starts_with('-');
    let digits: String = integer_part.chars().filter(|c| c.is_ascii_digit()).collect();

    let mut result = String::new();
    if negative {
        result.push('-');
    }

    let len = digits.len();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    if let Some(decimal) = decimal_part {
        result.push('.');
        result.push_str(decimal);
    }

    result
}

/// "-0", "-0.00" -> "0", "0.00"
fn strip_negative_zero(s: &str) -> &str {
    match s.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => rest,
        _ => s,
    }
}
