use crate::schema::Report;
use crate::utils::truncate_with_ellipsis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SCENARIO_PREVIEW_CHARS: usize = 100;

/// How many entries a history view shows by default.
pub const DEFAULT_RECENT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub scenario: String,
    pub question: String,
    pub confidence: f64,
    pub fields_extracted: usize,
}

impl HistoryEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        scenario: &str,
        question: &str,
        report: &Report,
    ) -> Self {
        Self {
            timestamp,
            scenario: truncate_with_ellipsis(scenario, SCENARIO_PREVIEW_CHARS),
            question: question.to_string(),
            confidence: report.confidence_score(),
            fields_extracted: report.extracted_count(),
        }
    }
}

/// In-memory, per-session summary of generated reports. The caller owns it;
/// nothing in the pipeline writes to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportHistory {
    entries: Vec<HistoryEntry>,
}

impl ReportHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, scenario: &str, question: &str, report: &Report) -> &HistoryEntry {
        self.record_at(Utc::now(), scenario, question, report)
    }

    pub fn record_at(
        &mut self,
        timestamp: DateTime<Utc>,
        scenario: &str,
        question: &str,
        report: &Report,
    ) -> &HistoryEntry {
        self.entries
            .push(HistoryEntry::new(timestamp, scenario, question, report));
        &self.entries[self.entries.len() - 1]
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CapitalField, FieldCode};
    use chrono::TimeZone;

    fn report() -> Report {
        Report::from_fields(vec![
            CapitalField::new(FieldCode::Cet1, Some(150.0), 0.9, "", "").unwrap(),
            CapitalField::new(FieldCode::At1, Some(50.0), 0.7, "", "").unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_entry_summary() {
        let mut history = ReportHistory::new();
        let ts = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        let scenario = "x".repeat(150);

        let entry = history.record_at(ts, &scenario, "Extract capital values", &report());
        assert_eq!(entry.timestamp, ts);
        assert_eq!(entry.scenario.chars().count(), SCENARIO_PREVIEW_CHARS + 3);
        assert_eq!(entry.fields_extracted, 2);
        assert!((entry.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_recent_and_clear() {
        let mut history = ReportHistory::new();
        for i in 0..7 {
            history.record(&format!("Scenario {} with CET1 of 10m", i), "q", &report());
        }

        let recent = history.recent(DEFAULT_RECENT);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].scenario, "Scenario 2 with CET1 of 10m");
        assert_eq!(recent[4].scenario, "Scenario 6 with CET1 of 10m");
        assert_eq!(history.recent(100).len(), 7);

        history.clear();
        assert!(history.is_empty());
        assert!(history.recent(DEFAULT_RECENT).is_empty());
    }
}
