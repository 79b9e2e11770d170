//! ResponseParser (spec §4.3) — extracts `<<<ORCHESTRATOR_RESPONSE>>>`
//! blocks from assistant text, tolerantly recovers common JSON
//! malformations, and validates payloads by phase.

mod error;
mod recovery;
pub mod schema;

pub use error::ParseError;
pub use schema::{AggregationData, AnalysisData, CompletionData, CompletionStatus, PhasePayload, ProgressData, TaskListData};

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, warn};

const RESPONSE_START: &str = "<<<ORCHESTRATOR_RESPONSE>>>";
const RESPONSE_END: &str = "<<<END_ORCHESTRATOR_RESPONSE>>>";

/// One parsed (or failed) response block, in transcript order.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub phase: Option<String>,
    pub payload: Option<PhasePayload>,
    pub error: Option<ParseError>,
}

impl ParseResult {
    pub fn found(&self) -> bool {
        self.payload.is_some()
    }
}

/// Result of scanning a whole message for response blocks.
pub struct ParseMultiple {
    pub results: Vec<ParseResult>,
    /// Prose preceding the first block.
    pub before_text: String,
    /// Prose following the last block.
    pub after_text: String,
}

/// Scan `text` for every `<<<ORCHESTRATOR_RESPONSE>>> ... <<<END...>>>`
/// block, tolerantly parsing and phase-validating each (spec §4.3
/// "Extraction").
pub fn parse_multiple(text: &str) -> ParseMultiple {
    debug!(len = text.len(), "parse_multiple: called");
    let mut results = Vec::new();
    let mut before_text = String::new();
    let mut after_text = text.to_string();
    let mut cursor = 0usize;
    let mut first_block_seen = false;

    while let Some(start_rel) = text[cursor..].find(RESPONSE_START) {
        let start = cursor + start_rel;
        if !first_block_seen {
            before_text = text[..start].to_string();
            first_block_seen = true;
        }
        let body_start = start + RESPONSE_START.len();
        match text[body_start..].find(RESPONSE_END) {
            Some(end_rel) => {
                let end = body_start + end_rel;
                let raw = text[body_start..end].trim();
                results.push(parse_block(raw));
                let after_block_start = end + RESPONSE_END.len();
                after_text = text[after_block_start..].to_string();
                cursor = after_block_start;
            }
            None => {
                results.push(ParseResult {
                    phase: None,
                    payload: None,
                    error: Some(ParseError::MissingEnd),
                });
                after_text = String::new();
                break;
            }
        }
    }

    ParseMultiple {
        results,
        before_text,
        after_text,
    }
}

fn parse_block(raw: &str) -> ParseResult {
    let value = match recovery::tolerant_parse(raw) {
        Ok(v) => v,
        Err(e) => {
            return ParseResult {
                phase: None,
                payload: None,
                error: Some(ParseError::Malformed(e.to_string())),
            }
        }
    };

    let Some(phase) = value.get("phase").and_then(Value::as_str) else {
        return ParseResult {
            phase: None,
            payload: None,
            error: Some(ParseError::MissingField("phase".into())),
        };
    };
    let phase = phase.to_string();

    let Some(data) = value.get("data") else {
        return ParseResult {
            phase: Some(phase.clone()),
            payload: None,
            error: Some(ParseError::MissingField("data".into())),
        };
    };

    match validate_phase(&phase, data.clone()) {
        Ok(payload) => ParseResult {
            phase: Some(phase),
            payload: Some(payload),
            error: None,
        },
        Err(e) => ParseResult {
            phase: Some(phase),
            payload: None,
            error: Some(e),
        },
    }
}

fn validate_phase(phase: &str, data: Value) -> Result<PhasePayload, ParseError> {
    match phase {
        "analysis" => serde_json::from_value(data)
            .map(PhasePayload::Analysis)
            .map_err(|e| ParseError::MissingField(e.to_string())),
        "task_list" => serde_json::from_value(data)
            .map(PhasePayload::TaskList)
            .map_err(|e| ParseError::MissingField(e.to_string())),
        "progress" => serde_json::from_value(data)
            .map(PhasePayload::Progress)
            .map_err(|e| ParseError::MissingField(e.to_string())),
        "completion" => serde_json::from_value(data)
            .map(PhasePayload::Completion)
            .map_err(|e| ParseError::MissingField(e.to_string())),
        "aggregation" => serde_json::from_value(data)
            .map(PhasePayload::Aggregation)
            .map_err(|e| ParseError::MissingField(e.to_string())),
        other => Err(ParseError::UnknownPhase(other.to_string())),
    }
}

/// Result of keyword-heuristic fallback detection when no structured
/// block was found (spec §4.3 "Fallback detection").
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackDetection {
    pub detected: bool,
    pub probable_phase: Option<String>,
    pub confidence: f32,
}

struct PhaseHeuristic {
    phase: &'static str,
    pattern: fn() -> &'static Regex,
    confidence: f32,
}

macro_rules! heuristic_regex {
    ($name:ident, $pat:literal) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pat).unwrap())
        }
    };
}

heuristic_regex!(analysis_re, r"(?i)\b(analy[sz]ing|analysis complete|i(?:'ve| have) reviewed)\b");
heuristic_regex!(task_list_re, r"(?i)\b(splitting into|task list|sub-?tasks?:)\b");
heuristic_regex!(progress_re, r"(?i)\b(progress|working on|currently (?:on|doing))\b");
heuristic_regex!(completion_re, r"(?i)\b(task (?:complete|finished|done)|i(?:'ve| have) (?:completed|finished))\b");
heuristic_regex!(aggregation_re, r"(?i)\b(aggregat(?:ing|ed)|merging results|final summary)\b");

/// Apply the per-phase keyword heuristic set (spec §4.3). Callers decide
/// whether to act on a low-confidence hit.
pub fn detect_fallback(text: &str) -> FallbackDetection {
    let candidates = [
        PhaseHeuristic { phase: "completion", pattern: completion_re, confidence: 0.6 },
        PhaseHeuristic { phase: "aggregation", pattern: aggregation_re, confidence: 0.5 },
        PhaseHeuristic { phase: "task_list", pattern: task_list_re, confidence: 0.5 },
        PhaseHeuristic { phase: "analysis", pattern: analysis_re, confidence: 0.4 },
        PhaseHeuristic { phase: "progress", pattern: progress_re, confidence: 0.3 },
    ];

    for h in candidates {
        if (h.pattern)().is_match(text) {
            let confidence = h.confidence.clamp(0.1, 0.9);
            warn!(phase = h.phase, confidence, "detect_fallback: no structured block found, heuristic match");
            return FallbackDetection {
                detected: true,
                probable_phase: Some(h.phase.to_string()),
                confidence,
            };
        }
    }

    FallbackDetection {
        detected: false,
        probable_phase: None,
        confidence: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(phase: &str, data: &str) -> String {
        format!("{RESPONSE_START}\n{{\"phase\": \"{phase}\", \"data\": {data}}}\n{RESPONSE_END}")
    }

    #[test]
    fn parses_clean_analysis_block() {
        let text = format!("Some prose.\n{}\nAfter.", wrap("analysis", r#"{"summary":"S","recommended_splits":3}"#));
        let parsed = parse_multiple(&text);
        assert_eq!(parsed.results.len(), 1);
        assert!(parsed.results[0].found());
        assert_eq!(parsed.before_text.trim(), "Some prose.");
        assert_eq!(parsed.after_text.trim(), "After.");
    }

    #[test]
    fn multiple_blocks_in_one_message() {
        let text = format!(
            "{} middle {}",
            wrap("progress", r#"{"task_id":"t1","status":"running"}"#),
            wrap("progress", r#"{"task_id":"t2","status":"running"}"#)
        );
        let parsed = parse_multiple(&text);
        assert_eq!(parsed.results.len(), 2);
        assert!(parsed.results.iter().all(|r| r.found()));
    }

    #[test]
    fn missing_end_delimiter_is_an_error() {
        let text = format!("{RESPONSE_START}\n{{\"phase\": \"analysis\", \"data\": {{}} }}");
        let parsed = parse_multiple(&text);
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].error, Some(ParseError::MissingEnd));
    }

    #[test]
    fn missing_phase_field_is_typed_error() {
        let text = wrap_raw(r#"{"data": {}}"#);
        let parsed = parse_multiple(&text);
        assert_eq!(parsed.results[0].error, Some(ParseError::MissingField("phase".into())));
    }

    fn wrap_raw(body: &str) -> String {
        format!("{RESPONSE_START}\n{body}\n{RESPONSE_END}")
    }

    #[test]
    fn recovers_trailing_comma_and_single_quotes() {
        let body = "{'phase': 'progress', 'data': {'task_id': 't1', 'status': 'running', 'progress_percent': 42,}}";
        let text = wrap_raw(body);
        let parsed = parse_multiple(&text);
        assert!(parsed.results[0].found(), "expected recovery to succeed: {:?}", parsed.results[0].error);
        if let Some(PhasePayload::Progress(p)) = &parsed.results[0].payload {
            assert_eq!(p.progress_percent, Some(42));
        } else {
            panic!("expected Progress payload");
        }
    }

    #[test]
    fn fallback_detects_completion_keywords() {
        let detection = detect_fallback("I've completed the task, all tests pass.");
        assert!(detection.detected);
        assert_eq!(detection.probable_phase.as_deref(), Some("completion"));
        assert!(detection.confidence >= 0.1 && detection.confidence <= 0.9);
    }

    #[test]
    fn fallback_reports_nothing_for_unrelated_text() {
        let detection = detect_fallback("The weather is nice today.");
        assert!(!detection.detected);
    }
}
