//! Test-case sourcing.
//!
//! Sources, in order of preference: cases supplied by the caller, cases
//! produced by a language model, and the fixed deterministic list. Any model
//! output that fails extraction or validation is discarded in favour of the
//! fixed list.

use crate::extract;
use crate::llm::{self, GenerationParams, LanguageModel};
use autograder_common::types::{TestCase, TestSource};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

/// Number of cases the generator must return
pub const GENERATED_CASE_COUNT: usize = 5;

/// Separator in judge-suggested `input::expected` strings
pub const SUGGESTION_SEPARATOR: &str = "::";

/// The deterministic five-case list used whenever model output is unusable
pub fn fallback_test_cases() -> Vec<TestCase> {
    ["5", "0", "1", "-1", "10"]
        .iter()
        .map(|value| TestCase::new(format!("{}\n", value), *value))
        .collect()
}

fn generation_prompt(title: &str) -> String {
    format!(
        r#"You are an automated software test generator for C programs.

Program Title:
{title}

STRICT INSTRUCTIONS:
- Generate exactly {count} test cases.
- Each test case MUST contain:
  1. "input"
  2. "expected"
- Output ONLY valid JSON.
- No explanation. No markdown.

FORMAT:
[
  {{"input": "value", "expected": "value"}},
  {{"input": "value", "expected": "value"}}
]
"#,
        title = title,
        count = GENERATED_CASE_COUNT,
    )
}

#[derive(Debug, Deserialize)]
struct GeneratedCase {
    input: Value,
    expected: Value,
}

/// Strings pass through; numbers and booleans use their JSON text
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Validate a generator response: exactly five `{input, expected}` scalars
pub fn parse_generated_cases(raw: &str) -> Option<Vec<TestCase>> {
    let cases: Vec<GeneratedCase> = extract::array_as(raw)?;
    if cases.len() != GENERATED_CASE_COUNT {
        return None;
    }

    cases
        .iter()
        .map(|case| {
            let input = scalar_text(&case.input)?;
            let expected = scalar_text(&case.expected)?;
            Some(TestCase::new(input, expected.trim()))
        })
        .collect()
}

/// Ask the generator model for cases derived from the problem title
#[tracing::instrument(skip(model), fields(model = model.name()))]
pub async fn generate_cases(model: &dyn LanguageModel, title: &str) -> (Vec<TestCase>, TestSource) {
    let raw = llm::generate_or_none(model, &generation_prompt(title), GenerationParams::PRECISE).await;

    match raw.as_deref().and_then(parse_generated_cases) {
        Some(cases) => {
            info!(count = cases.len(), "Using model-generated test cases");
            (cases, TestSource::ModelGenerated)
        }
        None => {
            if raw.is_some() {
                warn!("Generated test cases were malformed; using fallback list");
            }
            (fallback_test_cases(), TestSource::Fallback)
        }
    }
}

/// Parse one `input::expected` suggestion. The input keeps a trailing
/// newline so line-oriented reads see a complete line.
pub fn parse_suggestion(suggestion: &str) -> Option<TestCase> {
    let (input, expected) = suggestion.split_once(SUGGESTION_SEPARATOR)?;
    let input = input.trim();
    let input = if input.is_empty() {
        String::new()
    } else {
        format!("{}\n", input)
    };
    Some(TestCase::new(input, expected.trim()))
}

pub fn parse_suggestions(suggestions: &[String]) -> Vec<TestCase> {
    suggestions.iter().filter_map(|s| parse_suggestion(s)).collect()
}

/// Pick the batch to execute: caller cases, then model cases, then the fixed list
pub fn resolve(caller: &[TestCase], model_cases: Option<(Vec<TestCase>, TestSource)>) -> (Vec<TestCase>, TestSource) {
    if !caller.is_empty() {
        return (caller.to_vec(), TestSource::Caller);
    }
    match model_cases {
        Some((cases, source)) if !cases.is_empty() => (cases, source),
        _ => (fallback_test_cases(), TestSource::Fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;

    #[test]
    fn test_fallback_list_shape() {
        let cases = fallback_test_cases();
        let inputs: Vec<&str> = cases.iter().map(|c| c.input.as_str()).collect();
        let expected: Vec<&str> = cases.iter().map(|c| c.expected_output.as_str()).collect();
        assert_eq!(inputs, vec!["5\n", "0\n", "1\n", "-1\n", "10\n"]);
        assert_eq!(expected, vec!["5", "0", "1", "-1", "10"]);
    }

    #[test]
    fn test_parse_valid_generation() {
        let raw = r#"Here you go:
[
  {"input": "2 3\n", "expected": "5"},
  {"input": "0 0\n", "expected": 0},
  {"input": "-1 1\n", "expected": "0"},
  {"input": "10 5\n", "expected": "15 "},
  {"input": "7 8\n", "expected": "15"}
]"#;
        let cases = parse_generated_cases(raw).unwrap();
        assert_eq!(cases.len(), 5);
        assert_eq!(cases[1].expected_output, "0");
        assert_eq!(cases[3].expected_output, "15");
    }

    #[test]
    fn test_wrong_count_rejected() {
        let raw = r#"[{"input": "1", "expected": "1"}, {"input": "2", "expected": "2"}]"#;
        assert!(parse_generated_cases(raw).is_none());
    }

    #[test]
    fn test_wrong_shape_rejected() {
        let missing_field = r#"[{"input": "1"}, {"input": "2"}, {"input": "3"}, {"input": "4"}, {"input": "5"}]"#;
        assert!(parse_generated_cases(missing_field).is_none());

        let nested = r#"[{"input": "1", "expected": {"x": 1}}, {"input": "2", "expected": "2"}, {"input": "3", "expected": "3"}, {"input": "4", "expected": "4"}, {"input": "5", "expected": "5"}]"#;
        assert!(parse_generated_cases(nested).is_none());
    }

    #[test]
    fn test_truncated_and_non_json_rejected() {
        assert!(parse_generated_cases(r#"[{"input": "1", "expected": "1"},"#).is_none());
        assert!(parse_generated_cases("I cannot help with that.").is_none());
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_malformed_output() {
        let model = ScriptedModel::new(&["[{\"input\": \"1\", \"expected\": \"1\"}]"]);
        let (cases, source) = generate_cases(&model, "Echo a number").await;
        assert_eq!(source, TestSource::Fallback);
        assert_eq!(cases, fallback_test_cases());
        assert!(model.prompts.lock().unwrap()[0].contains("Echo a number"));
    }

    #[tokio::test]
    async fn test_generate_falls_back_when_unavailable() {
        let model = ScriptedModel::new(&[]);
        let (cases, source) = generate_cases(&model, "Echo").await;
        assert_eq!(source, TestSource::Fallback);
        assert_eq!(cases.len(), 5);
    }

    #[tokio::test]
    async fn test_generate_uses_valid_output() {
        let raw = r#"[{"input":"1\n","expected":"2"},{"input":"2\n","expected":"4"},{"input":"3\n","expected":"6"},{"input":"4\n","expected":"8"},{"input":"5\n","expected":"10"}]"#;
        let model = ScriptedModel::new(&[raw]);
        let (cases, source) = generate_cases(&model, "Double").await;
        assert_eq!(source, TestSource::ModelGenerated);
        assert_eq!(cases[4], TestCase::new("5\n", "10"));
    }

    #[test]
    fn test_parse_suggestions() {
        let suggestions = vec![
            "5::120".to_string(),
            " 3 4 :: 7 ".to_string(),
            "no separator".to_string(),
            "a::b::c".to_string(),
        ];
        let cases = parse_suggestions(&suggestions);
        assert_eq!(cases.len(), 3);
        assert_eq!(cases[0], TestCase::new("5\n", "120"));
        assert_eq!(cases[1], TestCase::new("3 4\n", "7"));
        assert_eq!(cases[2], TestCase::new("a\n", "b::c"));
    }

    #[test]
    fn test_resolve_order() {
        let caller = vec![TestCase::new("1\n", "1")];
        let model = Some((vec![TestCase::new("2\n", "2")], TestSource::ModelSuggested));

        assert_eq!(resolve(&caller, model.clone()).1, TestSource::Caller);
        assert_eq!(resolve(&[], model).1, TestSource::ModelSuggested);
        assert_eq!(resolve(&[], Some((vec![], TestSource::ModelSuggested))).1, TestSource::Fallback);
        assert_eq!(resolve(&[], None).0, fallback_test_cases());
    }
}
