use crate::types::{ScoreResult, MIN_SCORE};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, error, warn};

pub const NO_REASON: &str = "No reason provided";
pub const MISSING_FROM_BATCH: &str = "Missing from batch response";
pub const BATCH_PARSE_FAILURE: &str = "Failed to parse batch response";

/// First `max_chars` characters of a raw reply, for log lines.
fn snippet(raw: &str, max_chars: usize) -> String {
    raw.chars().take(max_chars).collect()
}

/// Best-effort integer coercion for score and index fields. Models emit
/// numbers, floats, and quoted numerics interchangeably.
fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn reason_or_default(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => NO_REASON.to_string(),
    }
}

/// Parse a single-article reply into a validated result.
///
/// Total over arbitrary input: every failure mode degrades to a
/// bottom-scored result with a diagnostic reason instead of an error.
pub fn parse_single(raw: &str) -> ScoreResult {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to parse JSON response: {}", e);
            debug!("Raw response: {}", snippet(raw, 500));
            return ScoreResult::floor(format!("JSON parse error: {}", e));
        }
    };

    let score = match value.get("score") {
        None | Some(Value::Null) => {
            warn!("No 'score' field in JSON response: {}", snippet(raw, 200));
            MIN_SCORE as i64
        }
        Some(score_value) => match coerce_int(score_value) {
            Some(score) => score,
            None => {
                error!("Invalid score value in response: {}", score_value);
                return ScoreResult::floor(format!(
                    "Invalid response format: score is not an integer ({})",
                    score_value
                ));
            }
        },
    };

    ScoreResult::new(score, reason_or_default(value.get("reason")))
}

/// Parse a batch reply into exactly `expected` validated results.
///
/// Entries are keyed by their declared `article_index`, never by array
/// position, so a model that reorders or drops entries cannot misalign a
/// score with the wrong article. Indices outside `[0, expected)` are
/// ignored; holes are filled with a diagnostic bottom score.
pub fn parse_batch(raw: &str, expected: usize) -> Vec<ScoreResult> {
    let all_defaults = || vec![ScoreResult::floor(BATCH_PARSE_FAILURE); expected];

    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to parse batch JSON response: {}", e);
            debug!("Raw response: {}", snippet(raw, 500));
            return all_defaults();
        }
    };

    let Some(entries) = value.get("results").and_then(Value::as_array) else {
        error!("Expected 'results' array in batch response");
        debug!("Raw response: {}", snippet(raw, 500));
        return all_defaults();
    };

    let mut indexed: HashMap<usize, ScoreResult> = HashMap::new();
    for entry in entries {
        let Some(object) = entry.as_object() else {
            continue;
        };
        let Some(index) = object.get("article_index").and_then(coerce_int) else {
            continue;
        };
        if index < 0 || index as usize >= expected {
            debug!("Ignoring out-of-range article_index {} in batch response", index);
            continue;
        }

        let score = object
            .get("score")
            .and_then(coerce_int)
            .unwrap_or(MIN_SCORE as i64);
        let reason = reason_or_default(object.get("reason"));

        indexed.insert(index as usize, ScoreResult::new(score, reason));
    }

    (0..expected)
        .map(|index| {
            indexed.remove(&index).unwrap_or_else(|| {
                warn!("Missing result for article index {} in batch response", index);
                ScoreResult::floor(MISSING_FROM_BATCH)
            })
        })
        .collect()
}
