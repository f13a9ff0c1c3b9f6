use crate::schema::{FieldCode, Report};
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub const DERIVED_TOTAL_JUSTIFICATION: &str = "Calculated as sum of CET1 + AT1 + Tier 2";

pub const OWN_FUNDS_AGGREGATION_RULE: &str =
    "CRR Article 72 - Own funds consist of the sum of Tier 1 capital and Tier 2 capital";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    /// Total was absent and has been set from the three components.
    DerivedTotal,
    /// Total was already present and was left untouched.
    ExplicitTotal,
    /// Total is absent and at least one component is missing, so it stays absent.
    InsufficientComponents,
}

pub struct TotalReconciler {
    source_rule: String,
}

impl Default for TotalReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl TotalReconciler {
    pub fn new() -> Self {
        Self {
            source_rule: OWN_FUNDS_AGGREGATION_RULE.to_string(),
        }
    }

    /// Cites a different regulatory basis on derived totals.
    pub fn with_source_rule(mut self, rule: impl Into<String>) -> Self {
        self.source_rule = rule.into();
        self
    }

    /// Fills an absent Total from CET1 + AT1 + Tier 2 when all three are present.
    ///
    /// A present Total is never overwritten, so a second call is a no-op. Any
    /// disagreement with the component sum is left for validation to report.
    pub fn reconcile(&self, report: &mut Report) -> ReconciliationOutcome {
        if report.value(FieldCode::TotalOwnFunds).is_some() {
            debug!("Total own funds stated explicitly; leaving it as extracted");
            return ReconciliationOutcome::ExplicitTotal;
        }

        let components: Option<Vec<(f64, f64)>> = FieldCode::COMPONENTS
            .iter()
            .map(|&code| {
                let field = report.field(code);
                field.value().map(|v| (v, field.confidence()))
            })
            .collect();

        let Some(components) = components else {
            debug!("Total own funds left unpopulated: not all components are present");
            return ReconciliationOutcome::InsufficientComponents;
        };

        let total: f64 = components.iter().map(|(v, _)| v).sum();
        let confidence = components
            .iter()
            .map(|(_, c)| *c)
            .fold(f64::INFINITY, f64::min);

        report.field_mut(FieldCode::TotalOwnFunds).set_derived(
            total,
            confidence,
            DERIVED_TOTAL_JUSTIFICATION,
            &self.source_rule,
        );

        info!(
            "Derived total own funds {} from components (confidence {:.2})",
            total, confidence
        );
        ReconciliationOutcome::DerivedTotal
    }
}

pub fn reconcile_total(report: &mut Report) -> ReconciliationOutcome {
    TotalReconciler::new().reconcile(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CapitalField;

    fn components(cet1: f64, at1: f64, tier2: f64) -> Vec<CapitalField> {
        vec![
            CapitalField::new(FieldCode::Cet1, Some(cet1), 0.95, "stated", "CRR Article 26")
                .unwrap(),
            CapitalField::new(FieldCode::At1, Some(at1), 0.8, "stated", "CRR Article 51")
                .unwrap(),
            CapitalField::new(FieldCode::Tier2, Some(tier2), 0.9, "stated", "CRR Article 62")
                .unwrap(),
        ]
    }

    #[test]
    fn test_derives_missing_total() {
        let mut report = Report::from_fields(components(150.0, 50.0, 75.0)).unwrap();

        let outcome = reconcile_total(&mut report);
        assert_eq!(outcome, ReconciliationOutcome::DerivedTotal);

        let total = report.field(FieldCode::TotalOwnFunds);
        assert_eq!(total.value(), Some(275.0));
        assert_eq!(total.confidence(), 0.8);
        assert_eq!(total.justification(), DERIVED_TOTAL_JUSTIFICATION);
        assert_eq!(total.source_rule(), OWN_FUNDS_AGGREGATION_RULE);
    }

    #[test]
    fn test_idempotent() {
        let mut report = Report::from_fields(components(150.0, 50.0, 75.0)).unwrap();

        reconcile_total(&mut report);
        let first = report.clone();
        let outcome = reconcile_total(&mut report);

        assert_eq!(outcome, ReconciliationOutcome::ExplicitTotal);
        assert_eq!(report, first);
        assert_eq!(report.value(FieldCode::TotalOwnFunds), Some(275.0));
    }

    #[test]
    fn test_no_partial_sum() {
        let mut fields = components(200.0, 45.0, 0.0);
        fields.pop();
        let mut report = Report::from_fields(fields).unwrap();

        let outcome = reconcile_total(&mut report);
        assert_eq!(outcome, ReconciliationOutcome::InsufficientComponents);
        assert_eq!(report.value(FieldCode::TotalOwnFunds), None);
    }

    #[test]
    fn test_explicit_total_not_overwritten() {
        let mut fields = components(120.0, 30.0, 60.0);
        fields.push(
            CapitalField::new(FieldCode::TotalOwnFunds, Some(200.0), 0.7, "stated", "").unwrap(),
        );
        let mut report = Report::from_fields(fields).unwrap();

        let outcome = reconcile_total(&mut report);
        assert_eq!(outcome, ReconciliationOutcome::ExplicitTotal);
        assert_eq!(report.value(FieldCode::TotalOwnFunds), Some(200.0));
        assert_eq!(report.field(FieldCode::TotalOwnFunds).justification(), "stated");
    }

    #[test]
    fn test_custom_source_rule() {
        let mut report = Report::from_fields(components(1.0, 2.0, 3.0)).unwrap();
        TotalReconciler::new()
            .with_source_rule("PRA Rulebook, Own Funds 1.1")
            .reconcile(&mut report);
        assert_eq!(
            report.field(FieldCode::TotalOwnFunds).source_rule(),
            "PRA Rulebook, Own Funds 1.1"
        );
    }
}
