use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::types::{TestCase, TestStep};

/// Fenced block with paired open/close markers, e.g. ```json { ... } ```.
static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap());

/// Start of an object carrying the required marker key.
static MARKER_START: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\{[^{]*"test_cases""#).unwrap());

/// Trailing commas left dangling before a closer after repair.
static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([\]\}])").unwrap());

/// The `… using selector: <sel>` convention the exploration task mandates.
static STEP_SELECTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:using\s+)?(?:css\s+)?selectors?\s*:\s*").unwrap());

/// Longest raw-output excerpt quoted into a diagnostic test case.
const EXCERPT_LEN: usize = 200;

/// Recover structured test cases from the agent's free-form text.
///
/// The agent's output is not schema-enforced: it commonly arrives wrapped in
/// explanatory prose, fenced formatting, or cut off by a length limit. The
/// strategies run in order and the first successful parse wins; if none
/// succeeds the result is a single synthetic diagnostic case, so extraction
/// never fails the pipeline.
pub fn extract_test_cases(raw: &str) -> Vec<TestCase> {
    let parsed = parse_whole(raw)
        .or_else(|| parse_fenced(raw))
        .or_else(|| parse_repaired(raw));

    match parsed {
        Some(value) => {
            let cases = collect_cases(&value);
            if cases.is_empty() {
                warn!("agent output parsed but contained no valid test cases");
                vec![TestCase::error(
                    "No Valid Test Cases",
                    vec![
                        "Agent completed the task but returned no valid test cases.".to_string(),
                        "Review the application manually or re-run the generation.".to_string(),
                    ],
                )]
            } else {
                info!(count = cases.len(), "extracted test cases from agent output");
                cases
            }
        }
        None => {
            warn!("all extraction strategies failed on agent output");
            vec![TestCase::error(
                "JSON Parse Error",
                vec![
                    "Failed to extract valid JSON from the agent response.".to_string(),
                    format!("Raw output snippet: {}", excerpt(raw)),
                ],
            )]
        }
    }
}

/// Strategy 1: the whole text is already a structured object.
fn parse_whole(text: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    value.is_object().then_some(value)
}

/// Strategy 2: a fenced block somewhere in the text holds the object.
fn parse_fenced(text: &str) -> Option<Value> {
    let captured = FENCED_BLOCK.captures(text)?;
    let value: Value = serde_json::from_str(captured.get(1)?.as_str()).ok()?;
    debug!("extracted object from fenced block");
    value.is_object().then_some(value)
}

/// Strategy 3: take the substring from the first marker key to end-of-text
/// and repair truncation by appending the deficit of closers.
///
/// This targets length-limit truncation (missing closers), not arbitrary
/// corruption.
fn parse_repaired(text: &str) -> Option<Value> {
    let start = MARKER_START.find(text)?.start();
    let fragment: String = text[start..].replace(['\n', '\r'], " ");

    if let Ok(value) = serde_json::from_str::<Value>(&fragment) {
        if value.is_object() {
            return Some(value);
        }
    }

    let repaired = repair_closers(&fragment);
    let repaired = TRAILING_COMMA.replace_all(&repaired, "$1");
    let value: Value = serde_json::from_str(&repaired).ok()?;
    debug!("repaired truncated object");
    value.is_object().then_some(value)
}

/// Append the closers a truncated object is missing: close an unterminated
/// string, drop a dangling separator, then unwind the open brace/bracket
/// stack in nesting order.
fn repair_closers(fragment: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in fragment.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut repaired = fragment.trim_end().to_string();
    if in_string {
        repaired.push('"');
    }
    if repaired.ends_with(',') {
        repaired.pop();
    }
    while let Some(closer) = stack.pop() {
        repaired.push(closer);
    }
    repaired
}

/// Post-parse validation: keep only objects with id/title/steps, and only
/// cases left with at least one valid step.
fn collect_cases(value: &Value) -> Vec<TestCase> {
    let Some(raw_cases) = value.get("test_cases").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut cases = Vec::new();
    for raw in raw_cases {
        let (Some(id), Some(title), Some(steps)) = (
            raw.get("id").and_then(Value::as_str),
            raw.get("title").and_then(Value::as_str),
            raw.get("steps").and_then(Value::as_array),
        ) else {
            warn!(case = %raw, "skipping test case without id/title/steps");
            continue;
        };

        let steps: Vec<TestStep> = steps
            .iter()
            .filter_map(Value::as_str)
            .map(split_step)
            .collect();
        if steps.is_empty() {
            warn!(id, "skipping test case with no valid steps");
            continue;
        }

        cases.push(TestCase::new(id, title, steps));
    }
    cases
}

/// Split a step string on the `using selector:` convention into action text
/// and selector. Steps without a recognizable selector keep the whole string
/// as action text.
fn split_step(step: &str) -> TestStep {
    match STEP_SELECTOR.find(step) {
        Some(found) => {
            let action = step[..found.start()].trim().trim_end_matches(',').to_string();
            let selector = step[found.end()..]
                .trim()
                .trim_end_matches(['.', ',', ')'])
                .trim()
                .to_string();
            if selector.is_empty() {
                TestStep::new(step.trim(), None)
            } else {
                TestStep::new(action, Some(selector))
            }
        }
        None => TestStep::new(step.trim(), None),
    }
}

fn excerpt(raw: &str) -> String {
    raw.chars().take(EXCERPT_LEN).collect()
}
