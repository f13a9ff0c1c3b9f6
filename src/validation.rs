use crate::schema::{FieldCode, Report};
use crate::utils::format_computed_amount;
use log::warn;

/// Absorbs floating-point rounding in the sum identity, not unit or scale errors.
pub const SUM_TOLERANCE: f64 = 0.01;

pub struct ReportValidator {
    tolerance: f64,
}

impl Default for ReportValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportValidator {
    pub fn new() -> Self {
        Self {
            tolerance: SUM_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Cross-field rules over a finalized report. All findings are collected in
    /// rule order; an empty list means the report passes.
    pub fn validate(&self, report: &Report) -> Vec<String> {
        let mut findings = Vec::new();

        for field in report.fields() {
            if matches!(field.value(), Some(v) if v < 0.0) {
                findings.push(format!("{} cannot be negative", field.field_code()));
            }
        }

        // Strict: the identity is only checked when all four values are present.
        // Absent fields are never treated as zero.
        let cet1 = report.value(FieldCode::Cet1);
        let at1 = report.value(FieldCode::At1);
        let tier2 = report.value(FieldCode::Tier2);
        let total = report.value(FieldCode::TotalOwnFunds);

        if let (Some(cet1), Some(at1), Some(tier2), Some(total)) = (cet1, at1, tier2, total) {
            let expected = cet1 + at1 + tier2;
            if (total - expected).abs() > self.tolerance {
                findings.push(format!(
                    "Total ({}) doesn't match sum ({})",
                    total,
                    format_computed_amount(expected)
                ));
            }
        }

        for finding in &findings {
            warn!("Validation finding: {}", finding);
        }
        findings
    }
}

pub fn validate_report(report: &Report) -> Vec<String> {
    ReportValidator::new().validate(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CapitalField;

    fn report(values: [Option<f64>; 4]) -> Report {
        Report::from_fields(
            FieldCode::ALL
                .iter()
                .zip(values)
                .map(|(&code, value)| CapitalField::new(code, value, 0.9, "", "").unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_total_mismatch() {
        let findings = validate_report(&report([Some(120.0), Some(30.0), Some(60.0), Some(200.0)]));
        assert_eq!(findings, vec!["Total (200) doesn't match sum (210.0)".to_string()]);
    }

    #[test]
    fn test_total_matches() {
        let findings = validate_report(&report([Some(120.0), Some(30.0), Some(60.0), Some(210.0)]));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_rounding_tolerated() {
        let findings = validate_report(&report([Some(0.1), Some(0.2), Some(0.0), Some(0.3)]));
        assert!(findings.is_empty());

        let findings =
            validate_report(&report([Some(120.0), Some(30.0), Some(60.0), Some(210.005)]));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_missing_fields_not_defaulted() {
        // Defaulting the missing Tier 2 to zero would report a mismatch here.
        let findings = validate_report(&report([Some(120.0), Some(30.0), None, Some(210.0)]));
        assert!(findings.is_empty());

        let findings = validate_report(&report([Some(120.0), Some(30.0), Some(60.0), None]));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_negative_values_reported_in_order() {
        let report = Report::from_fields(vec![
            CapitalField::unchecked(FieldCode::Cet1, Some(-10.0), 0.9),
            CapitalField::unchecked(FieldCode::At1, Some(5.0), 0.9),
            CapitalField::unchecked(FieldCode::Tier2, Some(-1.0), 0.9),
            CapitalField::unchecked(FieldCode::TotalOwnFunds, Some(100.0), 0.9),
        ])
        .unwrap();

        let findings = validate_report(&report);
        assert_eq!(
            findings,
            vec![
                "OF_010 cannot be negative".to_string(),
                "OF_030 cannot be negative".to_string(),
                "Total (100) doesn't match sum (-6.0)".to_string(),
            ]
        );
    }

    #[test]
    fn test_custom_tolerance() {
        let validator = ReportValidator::new().with_tolerance(1.0);
        let findings =
            validator.validate(&report([Some(120.0), Some(30.0), Some(60.0), Some(210.5)]));
        assert!(findings.is_empty());
    }
}
