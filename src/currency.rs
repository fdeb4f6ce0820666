// Kwanza formatting (pt-AO conventions)
//
// pt-AO groups thousands with a no-break space, uses a decimal comma and
// puts the currency label after the amount. Like the rest of the pt family
// it has a minimum grouping of two digits, so 4-digit integers stay
// ungrouped ("1000,00 Kz").

const NBSP: char = '\u{a0}';

pub const CURRENCY_LABEL: &str = "Kz";
pub const CURRENCY_CODE: &str = "AOA";
pub const NOT_APPLICABLE: &str = "N/A";

/// `15000000.0` -> `"15 000 000,00 Kz"` (no-break spaces)
pub fn format_kz(value: f64) -> String {
    if !value.is_finite() {
        return NOT_APPLICABLE.to_string();
    }
    format!("{}{}{}", format_decimal(value, 2), NBSP, CURRENCY_LABEL)
}

/// Ratio as a percentage with one decimal: `Some(0.7)` -> `"70,0%"`
pub fn format_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) if r.is_finite() => format!("{}%", format_decimal(r * 100.0, 1)),
        _ => NOT_APPLICABLE.to_string(),
    }
}

/// Value already in percentage points: `12.5` -> `"+12,5%"`
pub fn format_performance(points: f64) -> String {
    if !points.is_finite() {
        return NOT_APPLICABLE.to_string();
    }
    let sign = if points > 0.0 { "+" } else { "" };
    format!("{}{}%", sign, format_decimal(points, 1))
}

/// Locale-grouped decimal without a currency label
pub fn format_decimal(value: f64, decimals: usize) -> String {
    let rounded = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match rounded.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rounded.as_str(), None),
    };

    let is_zero = rounded.chars().all(|c| c == '0' || c == '.');
    let mut out = String::new();
    if value < 0.0 && !is_zero {
        out.push('-');
    }

    out.push_str(&group_thousands(int_part));

    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }

    out
}

fn group_thousands(digits: &str) -> String {
    if digits.len() <= 4 {
        return digits.to_string();
    }

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            grouped.push(NBSP);
        }
        grouped.push(ch);
    }
    grouped
}
