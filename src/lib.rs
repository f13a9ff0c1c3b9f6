//! # COREP Report Builder
//!
//! A library for turning a free-text description of a bank's capital position
//! (and the untrusted output of an LLM asked to read it) into a validated,
//! auditable COREP Own Funds report (template C 01.00).
//!
//! ## Core Concepts
//!
//! - **Scenario**: Free text such as "CET1 capital of £150 million, AT1 of £50M"
//! - **Hints**: Amounts found in the scenario by a regex heuristic, passed to the
//!   extraction service as advisory context and cross-checked afterwards
//! - **Report**: Exactly four fields (OF_010 CET1, OF_020 AT1, OF_030 Tier 2,
//!   OF_040 Total Own Funds), amounts in millions, each with a confidence
//! - **Reconciliation**: An absent Total is derived from the three components
//! - **Validation**: Non-negativity and Total = CET1 + AT1 + Tier 2, reported as
//!   findings, never silently corrected
//!
//! ## Example
//!
//! ```rust,ignore
//! use corep_report_builder::*;
//!
//! let extractor = |request: &ExtractionRequest| -> Result<String> {
//!     my_llm.complete(&request.context, &request.scenario, &request.schema)
//! };
//!
//! let processor = ReportProcessor::new(extractor);
//! let outcome = processor.process(
//!     "Our bank has CET1 capital of £150 million, AT1 capital of £50 million, \
//!      and Tier 2 capital of £75 million.",
//!     Some("Extract capital values for COREP Own Funds reporting"),
//!     &retrieved_context,
//! )?;
//!
//! assert_eq!(outcome.report.value(FieldCode::TotalOwnFunds), Some(275.0));
//! println!("{}", outcome.audit_log);
//! ```

pub mod audit;
pub mod error;
pub mod export;
pub mod extraction;
pub mod history;
pub mod normalizer;
pub mod pre_extract;
pub mod reconciliation;
pub mod scenario;
pub mod schema;
pub mod utils;
pub mod validation;

pub use audit::create_audit_log;
pub use error::{CorepError, Result};
pub use export::TableRow;
pub use extraction::{ExtractionRequest, Extractor};
pub use history::{HistoryEntry, ReportHistory};
pub use normalizer::{locate_json_object, normalize_extraction};
pub use pre_extract::{
    cross_check, pre_extract_amounts, AmountHeuristic, AmountHints, CapitalCategory,
    HintDiscrepancy, NoHints, RegexAmountExtractor,
};
pub use reconciliation::{reconcile_total, ReconciliationOutcome, TotalReconciler};
pub use scenario::{validate_scenario, ScenarioRules};
pub use schema::*;
pub use utils::*;
pub use validation::{validate_report, ReportValidator, SUM_TOLERANCE};

use log::{debug, info};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub scenario_rules: ScenarioRules,
    pub sum_tolerance: f64,
    /// When false, an absent Total stays absent.
    pub reconcile_total: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            scenario_rules: ScenarioRules::default(),
            sum_tolerance: SUM_TOLERANCE,
            reconcile_total: true,
        }
    }
}

/// Everything produced for one scenario.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub report: Report,
    /// Empty when the report passes validation.
    pub findings: Vec<String>,
    pub audit_log: String,
    pub hints: AmountHints,
    pub hint_discrepancies: Vec<HintDiscrepancy>,
    /// `None` when reconciliation was disabled.
    pub reconciliation: Option<ReconciliationOutcome>,
}

impl PipelineOutcome {
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }

    /// Nothing could be extracted; the caller should ask for a more specific scenario.
    pub fn is_empty(&self) -> bool {
        self.report.is_empty()
    }
}

pub struct ReportProcessor<E: Extractor> {
    extractor: E,
    heuristic: Box<dyn AmountHeuristic>,
    options: PipelineOptions,
}

impl<E: Extractor> ReportProcessor<E> {
    pub fn new(extractor: E) -> Self {
        Self {
            extractor,
            heuristic: Box::new(RegexAmountExtractor::new()),
            options: PipelineOptions::default(),
        }
    }

    pub fn with_heuristic(mut self, heuristic: impl AmountHeuristic + 'static) -> Self {
        self.heuristic = Box::new(heuristic);
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Runs one scenario end to end: admissibility, hints, extraction,
    /// normalization, reconciliation, validation and audit.
    pub fn process(
        &self,
        scenario: &str,
        question: Option<&str>,
        context: &str,
    ) -> Result<PipelineOutcome> {
        self.options.scenario_rules.check(scenario)?;

        let hints = self.heuristic.extract(scenario);
        let request = ExtractionRequest::new(
            context,
            scenario,
            question.map(str::to_string),
            hints.clone(),
        )?;

        debug!(
            "Requesting extraction ({} context characters, {} hints)",
            context.len(),
            request.hints.len()
        );
        let raw = self.extractor.extract(&request)?;

        finalize_extraction(&raw, hints, &self.options)
    }
}

/// Normalizes, reconciles, validates and audits raw extraction output.
///
/// For callers that invoke the extraction service themselves.
pub fn finalize_extraction(
    raw: &str,
    hints: AmountHints,
    options: &PipelineOptions,
) -> Result<PipelineOutcome> {
    let mut report = normalize_extraction(raw)?;

    let reconciliation = options
        .reconcile_total
        .then(|| TotalReconciler::new().reconcile(&mut report));

    let findings = ReportValidator::new()
        .with_tolerance(options.sum_tolerance)
        .validate(&report);
    let audit_log = create_audit_log(&report);

    let hint_discrepancies = cross_check(&hints, &report);
    for discrepancy in &hint_discrepancies {
        debug!("Hint discrepancy: {}", discrepancy);
    }

    info!(
        "Report finalized: {} fields, {} findings, confidence {:.2}",
        report.extracted_count(),
        findings.len(),
        report.confidence_score()
    );

    Ok(PipelineOutcome {
        report,
        findings,
        audit_log,
        hints,
        hint_discrepancies,
        reconciliation,
    })
}

pub fn process_scenario<E: Extractor>(
    extractor: E,
    scenario: &str,
    question: Option<&str>,
    context: &str,
) -> Result<PipelineOutcome> {
    ReportProcessor::new(extractor).process(scenario, question, context)
}
