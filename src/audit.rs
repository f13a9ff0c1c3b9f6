use crate::schema::Report;
use crate::utils::{format_currency, format_percentage};

pub const AUDIT_LOG_TITLE: &str = "AUDIT LOG - Field Justifications";

/// Field-by-field justification trail for populated fields, in template order.
///
/// Deterministic for a given report; callers wanting a generation timestamp
/// prepend it themselves.
pub fn create_audit_log(report: &Report) -> String {
    if report.is_empty() {
        return "No fields extracted".to_string();
    }

    let mut lines = vec![AUDIT_LOG_TITLE.to_string(), "=".repeat(50)];

    for field in report.fields() {
        let Some(value) = field.value() else {
            continue;
        };

        lines.push(format!("\n{}: {}", field.field_code(), field.description()));
        lines.push(format!("  Value: {}", format_currency(value)));
        lines.push(format!("  Confidence: {}", format_percentage(field.confidence())));
        lines.push(format!("  Justification: {}", field.justification()));
        if !field.source_rule().is_empty() {
            lines.push(format!("  Source: {}", field.source_rule()));
        }
    }

    lines.join("\n")
}
