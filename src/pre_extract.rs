use crate::schema::{FieldCode, Report};
use lazy_static::lazy_static;
use log::debug;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum number of non-digit characters allowed between a label and its amount.
pub const LOOKAHEAD_WINDOW: usize = 60;

/// Hinted and extracted amounts closer than this are considered equal.
pub const HINT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapitalCategory {
    Cet1,
    At1,
    Tier2,
    Total,
}

impl CapitalCategory {
    pub const ALL: [CapitalCategory; 4] = [
        CapitalCategory::Cet1,
        CapitalCategory::At1,
        CapitalCategory::Tier2,
        CapitalCategory::Total,
    ];

    pub fn field_code(&self) -> FieldCode {
        match self {
            Self::Cet1 => FieldCode::Cet1,
            Self::At1 => FieldCode::At1,
            Self::Tier2 => FieldCode::Tier2,
            Self::Total => FieldCode::TotalOwnFunds,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Cet1 => "cet1",
            Self::At1 => "at1",
            Self::Tier2 => "tier2",
            Self::Total => "total",
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            Self::Cet1 => &CET1_REGEX,
            Self::At1 => &AT1_REGEX,
            Self::Tier2 => &TIER2_REGEX,
            Self::Total => &TOTAL_REGEX,
        }
    }
}

/// Best-guess amounts in millions, keyed by category. Absent keys mean no
/// confident match.
pub type AmountHints = BTreeMap<CapitalCategory, f64>;

/// A text-to-hints heuristic. Hints are advisory context for the extraction
/// service and never override what it asserts.
pub trait AmountHeuristic: Send + Sync {
    fn extract(&self, text: &str) -> AmountHints;
}

/// Label-then-amount scan over the scenario text; the last match per category wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexAmountExtractor;

/// Produces no hints.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHints;

impl AmountHeuristic for NoHints {
    fn extract(&self, _text: &str) -> AmountHints {
        AmountHints::new()
    }
}

// Amount tail shared by all labels: an optional currency prefix, the number,
// then an optional scale word and currency suffix. At least one marker must be
// present for the match to count (checked in code).
macro_rules! amount_pattern {
    ($label:expr) => {
        format!(
            r"(?i)(?:{label})[^\d]{{0,{window}}}?(?P<prefix>[£€$]|\b(?:GBP|EUR|USD)\s?)?(?P<amount>\d{{1,3}}(?:,\d{{3}})+(?:\.\d+)?|\d+(?:\.\d+)?)(?:\s*(?P<scale>billion|bn|million|mn|m)\b)?(?:\s*(?P<suffix>GBP|EUR|USD|euros?|pounds?|dollars?)\b)?",
            label = $label,
            window = LOOKAHEAD_WINDOW
        )
    };
}

lazy_static! {
    static ref CET1_REGEX: Regex = Regex::new(&amount_pattern!(
        r"\bCET\s?1\b|\bcommon\s+equity\s+tier\s*(?:1|one)\b"
    ))
    .unwrap();

    // The spaced form stays uppercase so "valued at 1 million" is not a label.
    static ref AT1_REGEX: Regex = Regex::new(&amount_pattern!(
        r"\bAT1\b|\b(?-i:AT\s1)\b|\badditional\s+tier\s*(?:1|one)\b"
    ))
    .unwrap();

    static ref TIER2_REGEX: Regex = Regex::new(&amount_pattern!(
        r"\btier\s*(?:2|two)\b|\bT2\b"
    ))
    .unwrap();

    static ref TOTAL_REGEX: Regex = Regex::new(&amount_pattern!(
        r"\btotal\s+(?:own\s+funds|regulatory\s+capital|capital)\b|\bown\s+funds\b"
    ))
    .unwrap();
}

impl RegexAmountExtractor {
    pub fn new() -> Self {
        Self
    }

    fn last_amount(&self, category: CapitalCategory, text: &str) -> Option<f64> {
        let mut found = None;
        for cap in category.pattern().captures_iter(text) {
            match parse_amount_capture(&cap) {
                Some(amount) => found = Some(amount),
                None => debug!(
                    "Skipping unconfirmed {} candidate '{}'",
                    category.key(),
                    cap.get(0).map(|m| m.as_str()).unwrap_or_default()
                ),
            }
        }
        found
    }
}

impl AmountHeuristic for RegexAmountExtractor {
    fn extract(&self, text: &str) -> AmountHints {
        let hints: AmountHints = CapitalCategory::ALL
            .iter()
            .filter_map(|&category| {
                self.last_amount(category, text)
                    .map(|amount| (category, amount))
            })
            .collect();

        debug!("Pre-extracted {} amount hint(s)", hints.len());
        hints
    }
}

pub fn pre_extract_amounts(text: &str) -> AmountHints {
    RegexAmountExtractor::new().extract(text)
}

/// Normalizes a matched amount to millions; `None` when no monetary or scale
/// marker sits next to the number, or the number does not parse.
fn parse_amount_capture(cap: &Captures) -> Option<f64> {
    let has_prefix = cap.name("prefix").is_some();
    let has_suffix = cap.name("suffix").is_some();
    let scale = cap.name("scale").map(|m| m.as_str().to_lowercase());

    if !has_prefix && !has_suffix && scale.is_none() {
        return None;
    }

    let raw = cap.name("amount")?.as_str().replace(',', "");
    let amount: f64 = match raw.parse() {
        Ok(v) => v,
        Err(e) => {
            debug!("Unparseable amount '{}': {}", raw, e);
            return None;
        }
    };

    let millions = match scale.as_deref() {
        Some("billion") | Some("bn") => amount * 1000.0,
        Some(_) => amount,
        // Bare currency amounts of a million or more are stated in units.
        None if amount >= 1_000_000.0 => amount / 1_000_000.0,
        None => amount,
    };
    Some(millions)
}

/// Disagreement between a hint and the finalized report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintDiscrepancy {
    pub field_code: FieldCode,
    pub hinted: f64,
    /// `None` when the report left the field unpopulated.
    pub extracted: Option<f64>,
}

impl fmt::Display for HintDiscrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.extracted {
            Some(extracted) => write!(
                f,
                "{}: scenario text suggests {} but extraction reported {}",
                self.field_code, self.hinted, extracted
            ),
            None => write!(
                f,
                "{}: scenario text suggests {} but no value was extracted",
                self.field_code, self.hinted
            ),
        }
    }
}

/// Compares hints against the report without changing it.
pub fn cross_check(hints: &AmountHints, report: &Report) -> Vec<HintDiscrepancy> {
    hints
        .iter()
        .filter_map(|(category, &hinted)| {
            let code = category.field_code();
            let extracted = report.value(code);
            let agrees = extracted
                .map(|v| (v - hinted).abs() <= HINT_TOLERANCE)
                .unwrap_or(false);
            (!agrees).then_some(HintDiscrepancy {
                field_code: code,
                hinted,
                extracted,
            })
        })
        .collect()
}
