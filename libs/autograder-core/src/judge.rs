//! Reasoning judge: asks the judge model for a structured verdict on the
//! submission and validates it before use.

use crate::extract;
use crate::llm::{self, GenerationParams, LanguageModel};
use autograder_common::types::{JudgeVerdict, SolvesProblem, TestCase};
use tracing::{info, warn};

/// Upper bound of a valid logic score
pub const MAX_LOGIC_SCORE: u32 = 100;

/// Verdict used whenever the model is unavailable or its output is unusable
pub fn fallback_verdict() -> JudgeVerdict {
    JudgeVerdict {
        intent: "unknown".to_string(),
        solves_problem: SolvesProblem {
            value: false,
            explanation: "LLM parse failure".to_string(),
        },
        syntax_errors: Vec::new(),
        key_steps: Vec::new(),
        logic_score: 0,
        suggested_tests: Vec::new(),
        from_model: false,
    }
}

fn judge_prompt(title: &str, source: &str, tests: &[TestCase]) -> String {
    let tests = if tests.is_empty() {
        "none supplied".to_string()
    } else {
        tests
            .iter()
            .map(|t| format!("{}::{}", t.input.trim(), t.expected_output.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Analyze the following C program and return ONLY a JSON object with fields:

- intent: short label
- solves_problem: {{ "value": true/false, "explanation": "" }}
- syntax_errors: [list]
- key_steps: [{{"name": "", "implemented": true/false, "evidence": ""}}]
- logic_score: integer 0-100
- suggested_tests: ["input::expected"]

Problem: {title}

Code:
{source}

Tests:
{tests}
"#
    )
}

/// Extract and validate a verdict from raw model text
pub fn parse_verdict(raw: &str) -> Option<JudgeVerdict> {
    let mut verdict: JudgeVerdict = extract::object_as(raw)?;
    if verdict.logic_score > MAX_LOGIC_SCORE {
        return None;
    }
    verdict.from_model = true;
    Some(verdict)
}

#[tracing::instrument(skip(model, source, tests), fields(model = model.name()))]
pub async fn judge(
    model: &dyn LanguageModel,
    title: &str,
    source: &str,
    tests: &[TestCase],
) -> JudgeVerdict {
    let prompt = judge_prompt(title, source, tests);
    let Some(raw) = llm::generate_or_none(model, &prompt, GenerationParams::PRECISE).await else {
        return fallback_verdict();
    };

    match parse_verdict(&raw) {
        Some(verdict) => {
            info!(
                logic_score = verdict.logic_score,
                suggested = verdict.suggested_tests.len(),
                "Judge verdict received"
            );
            verdict
        }
        None => {
            warn!("Judge output was malformed; using fallback verdict");
            fallback_verdict()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;

    const VERDICT: &str = r#"```json
{
  "intent": "factorial",
  "solves_problem": {"value": true, "explanation": "iterative product"},
  "syntax_errors": [],
  "key_steps": [{"name": "read n", "implemented": true, "evidence": "scanf"}],
  "logic_score": 85,
  "suggested_tests": ["5::120", "0::1"]
}
```"#;

    #[test]
    fn test_parse_verdict() {
        let verdict = parse_verdict(VERDICT).unwrap();
        assert_eq!(verdict.intent, "factorial");
        assert!(verdict.solves_problem.value);
        assert_eq!(verdict.key_steps.len(), 1);
        assert_eq!(verdict.logic_score, 85);
        assert_eq!(verdict.suggested_tests, vec!["5::120", "0::1"]);
        assert!(verdict.from_model);
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        assert!(parse_verdict(r#"{"logic_score": 140}"#).is_none());
        assert!(parse_verdict(r#"{"logic_score": -5}"#).is_none());
        assert!(parse_verdict(r#"{"logic_score": "high"}"#).is_none());
    }

    #[test]
    fn test_verdict_found_after_example_object() {
        let raw = r#"Steps look like {"name": "read input"}. Final: {"intent": "sum", "logic_score": 60}"#;
        let verdict = parse_verdict(raw).unwrap();
        assert_eq!(verdict.intent, "sum");
        assert_eq!(verdict.logic_score, 60);
    }

    #[test]
    fn test_model_cannot_claim_fallback() {
        let verdict = parse_verdict(r#"{"logic_score": 10, "from_model": false}"#).unwrap();
        assert!(verdict.from_model);
    }

    #[tokio::test]
    async fn test_judge_uses_model_verdict() {
        let model = ScriptedModel::new(&[VERDICT]);
        let tests = vec![TestCase::new("5\n", "120")];
        let verdict = judge(&model, "Factorial", "int main() {}", &tests).await;

        assert_eq!(verdict.logic_score, 85);
        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("Factorial"));
        assert!(prompts[0].contains("5::120"));
    }

    #[tokio::test]
    async fn test_judge_falls_back_on_garbage() {
        let model = ScriptedModel::new(&["The program looks fine to me."]);
        let verdict = judge(&model, "Sum", "int main() {}", &[]).await;
        assert_eq!(verdict, fallback_verdict());
        assert_eq!(verdict.solves_problem.explanation, "LLM parse failure");
    }

    #[tokio::test]
    async fn test_judge_falls_back_when_unavailable() {
        let model = ScriptedModel::new(&[]);
        let verdict = judge(&model, "Sum", "int main() {}", &[]).await;
        assert!(!verdict.from_model);
        assert_eq!(verdict.logic_score, 0);
    }
}
