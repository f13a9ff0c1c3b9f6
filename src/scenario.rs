use crate::error::{CorepError, Result};
use log::debug;

pub const DEFAULT_MIN_LENGTH: usize = 10;

pub const DEFAULT_FINANCIAL_TERMS: &[&str] = &[
    "capital", "million", "funds", "cet1", "at1", "tier", "value", "amount",
];

/// Admissibility rules applied to a scenario before any collaborator is invoked.
#[derive(Debug, Clone)]
pub struct ScenarioRules {
    pub min_length: usize,
    /// Matched case-insensitively as substrings.
    pub financial_terms: Vec<String>,
    pub require_digit: bool,
}

impl Default for ScenarioRules {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            financial_terms: DEFAULT_FINANCIAL_TERMS
                .iter()
                .map(|t| t.to_string())
                .collect(),
            require_digit: true,
        }
    }
}

impl ScenarioRules {
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn with_financial_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.financial_terms = terms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_require_digit(mut self, require_digit: bool) -> Self {
        self.require_digit = require_digit;
        self
    }

    pub fn check(&self, scenario: &str) -> Result<()> {
        let trimmed = scenario.trim();
        let length = trimmed.chars().count();
        if length < self.min_length {
            debug!("Rejecting scenario of {} characters", length);
            return Err(CorepError::InputTooShort {
                length,
                minimum: self.min_length,
            });
        }

        let lower = trimmed.to_lowercase();
        let has_term = self
            .financial_terms
            .iter()
            .any(|term| lower.contains(&term.to_lowercase()));
        if !has_term {
            debug!("Rejecting scenario without financial vocabulary");
            return Err(CorepError::InputNotFinancial(
                "no capital or funding terms found".to_string(),
            ));
        }

        if self.require_digit && !trimmed.chars().any(|c| c.is_ascii_digit()) {
            debug!("Rejecting scenario without any numeric amount");
            return Err(CorepError::InputNotFinancial(
                "no numeric amount found".to_string(),
            ));
        }

        Ok(())
    }
}

pub fn validate_scenario(scenario: &str) -> Result<()> {
    ScenarioRules::default().check(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short() {
        let err = validate_scenario("ok").unwrap_err();
        assert!(matches!(
            err,
            CorepError::InputTooShort {
                length: 2,
                minimum: 10
            }
        ));

        assert!(matches!(
            validate_scenario("   CET1 5m   "),
            Err(CorepError::InputTooShort { .. })
        ));
    }

    #[test]
    fn test_not_financial() {
        let err = validate_scenario("The bank is doing fine this quarter").unwrap_err();
        assert!(matches!(err, CorepError::InputNotFinancial(_)));
    }

    #[test]
    fn test_terms_without_digits() {
        let err = validate_scenario("We hold a lot of capital in various tiers").unwrap_err();
        assert!(matches!(err, CorepError::InputNotFinancial(_)));
        assert!(err.to_string().contains("numeric"));
    }

    #[test]
    fn test_admissible() {
        assert!(validate_scenario(
            "Our bank has CET1 capital of £150 million, AT1 capital of £50 million."
        )
        .is_ok());
    }

    #[test]
    fn test_custom_rules() {
        let rules = ScenarioRules::default()
            .with_financial_terms(["eigenmittel"])
            .with_require_digit(false);
        assert!(rules.check("Die Eigenmittel sind ausreichend").is_ok());
        assert!(rules.check("Our capital is 150 million").is_err());
    }
}
