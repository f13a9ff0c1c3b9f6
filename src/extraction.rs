use crate::error::Result;
use crate::pre_extract::AmountHints;
use crate::schema::ReportPayload;
use serde::{Deserialize, Serialize};

/// Everything the extraction service receives for one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Retrieved regulatory text, passed through uninspected.
    pub context: String,
    pub scenario: String,
    pub question: Option<String>,
    /// Advisory amounts found in the scenario text, in millions.
    pub hints: AmountHints,
    /// JSON Schema of the expected response.
    pub schema: String,
}

impl ExtractionRequest {
    pub fn new(
        context: impl Into<String>,
        scenario: impl Into<String>,
        question: Option<String>,
        hints: AmountHints,
    ) -> Result<Self> {
        Ok(Self {
            context: context.into(),
            scenario: scenario.into(),
            question,
            hints,
            schema: ReportPayload::schema_as_json()?,
        })
    }

    pub fn hints_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.hints)?)
    }
}

/// The language-model side of the pipeline.
///
/// Implementations return the model's raw text, which is expected to hold
/// either `{"error": "..."}` or a `{"template": ..., "fields": [...]}` object,
/// possibly wrapped in prose. Timeouts and transport failures should be
/// reported as `CorepError::ExtractionError`.
pub trait Extractor {
    fn extract(&self, request: &ExtractionRequest) -> Result<String>;
}

impl<F> Extractor for F
where
    F: Fn(&ExtractionRequest) -> Result<String>,
{
    fn extract(&self, request: &ExtractionRequest) -> Result<String> {
        self(request)
    }
}
