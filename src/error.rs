use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorepError {
    #[error("Scenario description is too short ({length} characters, minimum {minimum}). Please provide more details.")]
    InputTooShort { length: usize, minimum: usize },

    #[error("Scenario should mention capital amounts, values, or financial terms: {0}")]
    InputNotFinancial(String),

    #[error("Extraction failed: {0}")]
    ExtractionError(String),

    #[error("Extraction output is not valid JSON: {0}")]
    MalformedOutput(String),

    #[error("Extraction output does not match the C 01.00 schema: {0}")]
    InvalidSchema(String),

    #[error("All {populated} extracted values are zero; treating as a failed extraction")]
    DegenerateExtraction { populated: usize },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Export error: {0}")]
    ExportError(String),
}

impl CorepError {
    /// Targeted guidance the presentation layer can show next to the error.
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::InputTooShort { .. } => {
                "Describe the capital position in at least one full sentence, e.g. \
                 \"Our bank has CET1 capital of £150 million.\""
            }
            Self::InputNotFinancial(_) => {
                "Mention the capital tiers and their amounts explicitly, e.g. \
                 \"CET1 capital of 150 million GBP, AT1 of £50M, Tier 2: 75 million\"."
            }
            Self::ExtractionError(_) => {
                "Make sure every amount is stated with a currency or scale \
                 (\"150 million GBP\" rather than \"150\") and use the names \
                 \"CET1\", \"AT1\" and \"Tier 2\" explicitly."
            }
            Self::MalformedOutput(_) | Self::InvalidSchema(_) => {
                "The extraction service returned an unusable answer. Try again, \
                 or rephrase the scenario with one clear amount per capital tier."
            }
            Self::DegenerateExtraction { .. } => {
                "No non-zero amounts were found. State the amounts numerically, \
                 e.g. \"AT1 instruments worth €50,000,000\"."
            }
            Self::SerializationError(_) | Self::ExportError(_) => {
                "The report could not be exported. Retry the export."
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CorepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_distinguishable() {
        let errors = vec![
            CorepError::InputTooShort {
                length: 2,
                minimum: 10,
            },
            CorepError::InputNotFinancial("no digits".to_string()),
            CorepError::ExtractionError("Missing required field: AT1".to_string()),
            CorepError::MalformedOutput("expected value at line 1".to_string()),
            CorepError::InvalidSchema("missing 'fields'".to_string()),
            CorepError::DegenerateExtraction { populated: 4 },
        ];

        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_extraction_error_is_verbatim() {
        let err = CorepError::ExtractionError("Missing required field: Tier 2".to_string());
        assert!(err.to_string().contains("Missing required field: Tier 2"));
        assert!(err.remediation().contains("Tier 2"));
    }
}
