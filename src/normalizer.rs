use crate::error::{CorepError, Result};
use crate::schema::{CapitalField, CapitalFieldPayload, Report, TEMPLATE_ID};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde_json::Value;

lazy_static! {
    // An error object whose message is not valid JSON, e.g. unescaped quotes.
    static ref ERROR_OBJECT_REGEX: Regex =
        Regex::new(r#"(?s)\{\s*"error"\s*:\s*"(?P<message>.*)"\s*\}"#).unwrap();
}

/// Turns raw extraction output into a `Report`, or classifies why it cannot.
///
/// Tolerates prose and code fences around the JSON object. An `error` key on
/// the object short-circuits into `ExtractionError`; negative values, unknown
/// or duplicate codes fail closed as `InvalidSchema`; a report whose populated
/// values are all zero is `DegenerateExtraction`.
pub fn normalize_extraction(raw: &str) -> Result<Report> {
    let Some(json_text) = locate_json_object(raw) else {
        return Err(salvage_error_signal(raw).unwrap_or_else(|| {
            CorepError::MalformedOutput(format!(
                "no JSON object found in extraction output ({} characters)",
                raw.len()
            ))
        }));
    };

    let value: Value = match serde_json::from_str(json_text) {
        Ok(value) => value,
        Err(e) => {
            return Err(salvage_error_signal(raw)
                .unwrap_or_else(|| CorepError::MalformedOutput(e.to_string())))
        }
    };

    let object = value.as_object().ok_or_else(|| {
        CorepError::MalformedOutput("extraction output is not a JSON object".to_string())
    })?;

    if let Some(error) = object.get("error") {
        let message = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        warn!("Extraction service reported an error: {}", message);
        return Err(CorepError::ExtractionError(message));
    }

    match object.get("template").and_then(Value::as_str) {
        Some(template) if template != TEMPLATE_ID => {
            warn!(
                "Extraction returned template '{}', normalizing to '{}'",
                template, TEMPLATE_ID
            );
        }
        _ => {}
    }

    let raw_fields = match object.get("fields") {
        Some(Value::Array(fields)) => fields,
        Some(_) => {
            return Err(CorepError::InvalidSchema(
                "'fields' must be an array".to_string(),
            ))
        }
        None => {
            return Err(CorepError::InvalidSchema(
                "missing required 'fields' collection".to_string(),
            ))
        }
    };

    let fields = raw_fields
        .iter()
        .enumerate()
        .map(|(idx, raw_field)| parse_field(idx, raw_field))
        .collect::<Result<Vec<_>>>()?;

    let report = Report::from_fields(fields)?;
    check_not_degenerate(&report)?;

    info!(
        "Normalized extraction: {}/{} fields populated, confidence {:.2}",
        report.extracted_count(),
        report.fields().len(),
        report.confidence_score()
    );
    Ok(report)
}

fn parse_field(idx: usize, raw_field: &Value) -> Result<CapitalField> {
    let payload: CapitalFieldPayload = serde_json::from_value(raw_field.clone())
        .map_err(|e| CorepError::InvalidSchema(format!("field #{}: {}", idx, e)))?;
    debug!(
        "Field #{} {} value {:?} confidence {}",
        idx, payload.field_code, payload.value, payload.confidence
    );
    CapitalField::try_from(payload)
}

fn check_not_degenerate(report: &Report) -> Result<()> {
    let populated: Vec<f64> = report.fields().iter().filter_map(|f| f.value()).collect();
    if !populated.is_empty() && populated.iter().all(|&v| v == 0.0) {
        warn!("All {} extracted values are zero", populated.len());
        return Err(CorepError::DegenerateExtraction {
            populated: populated.len(),
        });
    }
    Ok(())
}

/// Recovers the message of an `{"error": "..."}` object that did not parse.
fn salvage_error_signal(raw: &str) -> Option<CorepError> {
    let message = ERROR_OBJECT_REGEX.captures(raw)?.name("message")?.as_str();
    warn!("Extraction service reported an error (unparseable): {}", message);
    Some(CorepError::ExtractionError(message.to_string()))
}

/// Returns the first balanced `{ ... }` span that parses as a JSON object,
/// skipping braces inside JSON strings. Spans that fail to parse are stepped
/// over whole; when none parses, the first balanced span is returned so the
/// caller can report the parser's diagnostic.
pub fn locate_json_object(raw: &str) -> Option<&str> {
    let mut first_balanced = None;
    let mut pos = 0;

    while let Some(found) = raw[pos..].find('{') {
        let start = pos + found;
        match balanced_span(&raw[start..]) {
            Some(span) => {
                if serde_json::from_str::<serde_json::Map<String, Value>>(span).is_ok() {
                    return Some(span);
                }
                debug!("Skipping non-JSON brace span at offset {}", start);
                if first_balanced.is_none() {
                    first_balanced = Some(span);
                }
                pos = start + span.len();
            }
            None => pos = start + 1,
        }
    }

    first_balanced
}

/// The balanced span starting at the `{` that opens `text`.
fn balanced_span(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
