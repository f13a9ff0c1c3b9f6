use crate::error::{CorepError, Result};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The only template this crate populates.
pub const TEMPLATE_ID: &str = "C 01.00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldCode {
    /// Common Equity Tier 1 capital, after deductions
    #[serde(rename = "OF_010")]
    Cet1,
    /// Additional Tier 1 capital
    #[serde(rename = "OF_020")]
    At1,
    #[serde(rename = "OF_030")]
    Tier2,
    /// CET1 + AT1 + Tier 2
    #[serde(rename = "OF_040")]
    TotalOwnFunds,
}

impl FieldCode {
    /// Template order.
    pub const ALL: [FieldCode; 4] = [
        FieldCode::Cet1,
        FieldCode::At1,
        FieldCode::Tier2,
        FieldCode::TotalOwnFunds,
    ];

    pub const COMPONENTS: [FieldCode; 3] = [FieldCode::Cet1, FieldCode::At1, FieldCode::Tier2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cet1 => "OF_010",
            Self::At1 => "OF_020",
            Self::Tier2 => "OF_030",
            Self::TotalOwnFunds => "OF_040",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Cet1 => "Common Equity Tier 1 capital",
            Self::At1 => "Additional Tier 1 capital",
            Self::Tier2 => "Tier 2 capital",
            Self::TotalOwnFunds => "Total Own Funds",
        }
    }

    /// Position of the code within `Report::fields`.
    pub fn index(&self) -> usize {
        match self {
            Self::Cet1 => 0,
            Self::At1 => 1,
            Self::Tier2 => 2,
            Self::TotalOwnFunds => 3,
        }
    }
}

impl fmt::Display for FieldCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldCode {
    type Err = CorepError;

    fn from_str(s: &str) -> Result<Self> {
        FieldCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CorepError::InvalidSchema(format!("unknown field code '{}'", s)))
    }
}

/// One line item as the extraction service returns it.
///
/// Nothing here is trusted; `CapitalField::try_from` enforces the invariants.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CapitalFieldPayload {
    #[schemars(
        description = "COREP template field code: OF_010 (CET1), OF_020 (AT1), OF_030 (Tier 2) or OF_040 (Total Own Funds)"
    )]
    pub field_code: String,

    #[serde(default)]
    #[schemars(description = "Field description")]
    pub description: String,

    #[serde(default)]
    #[schemars(
        description = "Amount in millions of reporting currency. Use null if the amount is not explicitly stated. Never negative, never guessed."
    )]
    pub value: Option<f64>,

    #[serde(default)]
    #[schemars(description = "Extraction confidence between 0.0 and 1.0")]
    pub confidence: f64,

    #[serde(default)]
    #[schemars(description = "How the value was derived from the scenario text")]
    pub justification: String,

    #[serde(default)]
    #[schemars(description = "The regulatory rule supporting the value (e.g. CRR Article 26)")]
    pub source_rule: String,
}

fn default_template() -> String {
    TEMPLATE_ID.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportPayload {
    #[serde(default = "default_template")]
    #[schemars(description = "COREP template code. Always \"C 01.00\".")]
    pub template: String,

    #[schemars(
        description = "One entry per template field: OF_010, OF_020, OF_030 and OF_040. Leave value null for anything not stated in the scenario."
    )]
    pub fields: Vec<CapitalFieldPayload>,
}

impl ReportPayload {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportPayload)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CapitalFieldPayload")]
pub struct CapitalField {
    field_code: FieldCode,
    description: String,
    value: Option<f64>,
    confidence: f64,
    justification: String,
    source_rule: String,
}

impl CapitalField {
    /// Builds a field, rejecting negative or non-finite values and clamping
    /// confidence into [0, 1].
    pub fn new(
        field_code: FieldCode,
        value: Option<f64>,
        confidence: f64,
        justification: impl Into<String>,
        source_rule: impl Into<String>,
    ) -> Result<Self> {
        if let Some(v) = value {
            if !v.is_finite() {
                return Err(CorepError::InvalidSchema(format!(
                    "{} has non-finite value {}",
                    field_code, v
                )));
            }
            if v < 0.0 {
                return Err(CorepError::InvalidSchema(format!(
                    "Negative value {} not allowed for {}",
                    v, field_code
                )));
            }
        }

        Ok(Self {
            field_code,
            description: field_code.description().to_string(),
            value,
            confidence: clamp_confidence(confidence),
            justification: justification.into(),
            source_rule: source_rule.into(),
        })
    }

    pub fn unpopulated(field_code: FieldCode) -> Self {
        Self {
            field_code,
            description: field_code.description().to_string(),
            value: None,
            confidence: 0.0,
            justification: String::new(),
            source_rule: String::new(),
        }
    }

    pub fn field_code(&self) -> FieldCode {
        self.field_code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn justification(&self) -> &str {
        &self.justification
    }

    pub fn source_rule(&self) -> &str {
        &self.source_rule
    }

    pub fn is_populated(&self) -> bool {
        self.value.is_some()
    }

    pub(crate) fn set_derived(
        &mut self,
        value: f64,
        confidence: f64,
        justification: &str,
        source_rule: &str,
    ) {
        self.value = Some(value);
        self.confidence = clamp_confidence(confidence);
        self.justification = justification.to_string();
        self.source_rule = source_rule.to_string();
    }

    /// Bypasses construction checks so the report-level rules can be tested
    /// against values that could only arrive from outside the crate.
    #[cfg(test)]
    pub(crate) fn unchecked(field_code: FieldCode, value: Option<f64>, confidence: f64) -> Self {
        Self {
            field_code,
            description: field_code.description().to_string(),
            value,
            confidence,
            justification: String::new(),
            source_rule: String::new(),
        }
    }
}

impl TryFrom<CapitalFieldPayload> for CapitalField {
    type Error = CorepError;

    fn try_from(payload: CapitalFieldPayload) -> Result<Self> {
        let code: FieldCode = payload.field_code.parse()?;
        if !payload.description.is_empty() && payload.description != code.description() {
            debug!(
                "Replacing description '{}' for {} with the template label",
                payload.description, code
            );
        }
        CapitalField::new(
            code,
            payload.value,
            payload.confidence,
            payload.justification,
            payload.source_rule,
        )
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ReportPayload")]
pub struct Report {
    template: String,
    fields: Vec<CapitalField>,
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

impl Report {
    /// A report with all four fields present and unpopulated.
    pub fn new() -> Self {
        Self {
            template: TEMPLATE_ID.to_string(),
            fields: FieldCode::ALL
                .iter()
                .map(|&code| CapitalField::unpopulated(code))
                .collect(),
        }
    }

    /// Places each field at its template position. Codes not supplied stay
    /// unpopulated; a code supplied twice is rejected.
    pub fn from_fields(fields: impl IntoIterator<Item = CapitalField>) -> Result<Self> {
        let mut report = Self::new();
        let mut seen = [false; 4];

        for field in fields {
            let idx = field.field_code.index();
            if seen[idx] {
                return Err(CorepError::InvalidSchema(format!(
                    "duplicate field code {}",
                    field.field_code
                )));
            }
            seen[idx] = true;
            report.fields[idx] = field;
        }

        Ok(report)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn fields(&self) -> &[CapitalField] {
        &self.fields
    }

    pub fn field(&self, code: FieldCode) -> &CapitalField {
        &self.fields[code.index()]
    }

    pub(crate) fn field_mut(&mut self, code: FieldCode) -> &mut CapitalField {
        &mut self.fields[code.index()]
    }

    pub fn value(&self, code: FieldCode) -> Option<f64> {
        self.field(code).value
    }

    pub fn is_empty(&self) -> bool {
        self.fields.iter().all(|f| f.value.is_none())
    }

    pub fn extracted_count(&self) -> usize {
        self.fields.iter().filter(|f| f.value.is_some()).count()
    }

    /// Mean confidence over populated fields, 0.0 when nothing is populated.
    pub fn confidence_score(&self) -> f64 {
        let populated: Vec<f64> = self
            .fields
            .iter()
            .filter(|f| f.value.is_some())
            .map(|f| f.confidence)
            .collect();

        if populated.is_empty() {
            return 0.0;
        }
        populated.iter().sum::<f64>() / populated.len() as f64
    }
}

impl TryFrom<ReportPayload> for Report {
    type Error = CorepError;

    fn try_from(payload: ReportPayload) -> Result<Self> {
        if payload.template != TEMPLATE_ID {
            debug!(
                "Template '{}' normalized to '{}'",
                payload.template, TEMPLATE_ID
            );
        }
        let fields = payload
            .fields
            .into_iter()
            .map(CapitalField::try_from)
            .collect::<Result<Vec<_>>>()?;
        Report::from_fields(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_generation() {
        let schema_json = ReportPayload::schema_as_json().unwrap();
        assert!(schema_json.contains("field_code"));
        assert!(schema_json.contains("source_rule"));
        assert!(schema_json.contains("C 01.00"));
    }

    #[test]
    fn test_negative_value_rejected() {
        let result = CapitalField::new(FieldCode::Cet1, Some(-1.0), 0.9, "", "");
        assert!(matches!(result, Err(CorepError::InvalidSchema(_))));

        let result = CapitalField::new(FieldCode::At1, Some(f64::NAN), 0.9, "", "");
        assert!(result.is_err());
    }

    #[test]
    fn test_confidence_clamped() {
        let high = CapitalField::new(FieldCode::Cet1, Some(10.0), 1.7, "", "").unwrap();
        assert_eq!(high.confidence(), 1.0);

        let low = CapitalField::new(FieldCode::Cet1, Some(10.0), -0.2, "", "").unwrap();
        assert_eq!(low.confidence(), 0.0);

        let nan = CapitalField::new(FieldCode::Cet1, None, f64::NAN, "", "").unwrap();
        assert_eq!(nan.confidence(), 0.0);
    }

    #[test]
    fn test_description_fixed_per_code() {
        let payload = CapitalFieldPayload {
            field_code: "OF_020".to_string(),
            description: "AT1 stuff".to_string(),
            value: Some(50.0),
            confidence: 0.8,
            justification: "stated".to_string(),
            source_rule: String::new(),
        };
        let field = CapitalField::try_from(payload).unwrap();
        assert_eq!(field.field_code(), FieldCode::At1);
        assert_eq!(field.description(), "Additional Tier 1 capital");
    }

    #[test]
    fn test_report_order_and_fill() {
        let report = Report::from_fields(vec![
            CapitalField::new(FieldCode::Tier2, Some(75.0), 0.9, "", "").unwrap(),
            CapitalField::new(FieldCode::Cet1, Some(150.0), 0.8, "", "").unwrap(),
        ])
        .unwrap();

        let codes: Vec<FieldCode> = report.fields().iter().map(|f| f.field_code()).collect();
        assert_eq!(codes, FieldCode::ALL.to_vec());
        assert_eq!(report.template(), TEMPLATE_ID);
        assert_eq!(report.extracted_count(), 2);
        assert!(!report.is_empty());
        assert!((report.confidence_score() - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_codes_rejected() {
        let result = Report::from_fields(vec![
            CapitalField::new(FieldCode::Cet1, Some(1.0), 0.9, "", "").unwrap(),
            CapitalField::new(FieldCode::Cet1, Some(2.0), 0.9, "", "").unwrap(),
        ]);
        assert!(matches!(result, Err(CorepError::InvalidSchema(_))));
    }

    #[test]
    fn test_empty_report_score() {
        let report = Report::new();
        assert!(report.is_empty());
        assert_eq!(report.confidence_score(), 0.0);
        assert_eq!(report.extracted_count(), 0);
    }

    #[test]
    fn test_field_code_parse() {
        assert_eq!("OF_040".parse::<FieldCode>().unwrap(), FieldCode::TotalOwnFunds);
        assert_eq!("of_010".parse::<FieldCode>().unwrap(), FieldCode::Cet1);
        assert!("OF_050".parse::<FieldCode>().is_err());
    }
}
