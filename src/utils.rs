/// Formats an amount held in millions for display, e.g. `£150.00 million` or
/// `£1,250 million`.
pub fn format_currency(value: f64) -> String {
    if value >= 1000.0 {
        format!("£{} million", group_thousands(&format!("{:.0}", value)))
    } else {
        format!("£{} million", group_thousands(&format!("{:.2}", value)))
    }
}

pub fn format_optional_currency(value: Option<f64>) -> String {
    match value {
        Some(v) => format_currency(v),
        None => "Not specified".to_string(),
    }
}

/// Whole-number percentage, e.g. `0.85` -> `85%`.
pub fn format_percentage(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

/// Renders a float the way a findings message quotes a computed amount:
/// integral values keep one decimal place (`210.0`), others print in full.
pub fn format_computed_amount(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Cuts `text` to `max_chars` characters, appending `...` when anything was removed.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn group_thousands(number: &str) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}
