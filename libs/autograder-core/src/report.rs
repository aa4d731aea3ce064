//! Report assembly: the deterministic text report, model-written feedback and
//! the compile-error explanation.

use crate::error::GraderResult;
use crate::llm::{self, GenerationParams, LanguageModel};
use autograder_common::types::{Evaluation, GradeStatus, TestSource};
use handlebars::Handlebars;
use serde_json::json;
use tracing::warn;

pub const FEEDBACK_UNAVAILABLE: &str = "Language model feedback unavailable.";
pub const EXPLANATION_UNAVAILABLE: &str = "Language model not configured.";

const REPORT_TEMPLATE: &str = "\
Evaluation Report: {{title}}
Profile: {{profile}}
Final Score: {{final_score}}
Compile Status: {{compile_status}}
{{#if diagnostics}}

Compiler Diagnostics:
{{diagnostics}}
{{/if}}

Structural Checks:
{{#if checks}}
{{#each checks}}
  [{{mark}}] {{name}} ({{weight}} pts): {{evidence}}
{{/each}}
{{else}}
  not evaluated
{{/if}}

Score Breakdown:
{{#if breakdown}}
{{#each breakdown}}
  {{name}}: {{score}} / {{max}}
{{/each}}
{{else}}
  not scored
{{/if}}
{{#if details}}

Details:
{{#each details}}
  - {{this}}
{{/each}}
{{/if}}

Recommendations:
{{#each recommendations}}
  - {{this}}
{{/each}}
";

const COMPILED_RECOMMENDATIONS: &[&str] = &[
    "Test edge cases such as zero, negative and large inputs.",
    "Comment the intent of each non-trivial block.",
    "Keep functions small and give each a single responsibility.",
];

const COMPILE_FAILED_RECOMMENDATIONS: &[&str] = &[
    "Fix the compiler errors listed above and resubmit.",
    "Compile locally with warnings enabled before submitting.",
];

pub fn recommendations(compiled: bool) -> &'static [&'static str] {
    if compiled {
        COMPILED_RECOMMENDATIONS
    } else {
        COMPILE_FAILED_RECOMMENDATIONS
    }
}

fn source_label(source: TestSource) -> &'static str {
    match source {
        TestSource::Caller => "caller-supplied",
        TestSource::ModelGenerated => "model-generated",
        TestSource::ModelSuggested => "judge-suggested",
        TestSource::Fallback => "fallback",
    }
}

fn format_points(value: f64) -> String {
    format!("{:.2}", value)
}

/// Per-component lines, in the order the components ran
fn detail_lines(evaluation: &Evaluation) -> Vec<String> {
    let mut details = Vec::new();

    if let Some(design) = &evaluation.design {
        details.push(format!("Design: {}", design.report));
    }
    if let Some(optimization) = &evaluation.optimization {
        details.push(format!("Optimization: {}", optimization.report));
    }
    if let Some(analysis) = &evaluation.static_analysis {
        let line = match &analysis.note {
            Some(note) if !analysis.available => format!("Static analysis: {}", note),
            _ => format!("Static analysis: {} warning(s)", analysis.warnings.len()),
        };
        details.push(line);
    }
    if let Some(judge) = &evaluation.judge {
        details.push(format!(
            "Judge: intent '{}', logic score {}/100{}",
            judge.intent,
            judge.logic_score,
            if judge.from_model { "" } else { " (fallback verdict)" }
        ));
    }
    if let Some(tests) = &evaluation.tests {
        details.push(format!("Tests ({}): {}", source_label(tests.source), tests.summary));
    }
    if let Some(performance) = &evaluation.performance {
        details.push(format!("Performance: {}", performance.report));
    }

    details
}

/// Render the deterministic report. Identical evaluations render identically.
pub fn render_report(evaluation: &Evaluation) -> GraderResult<String> {
    let compiled = evaluation.status == GradeStatus::Graded;

    let final_score = match evaluation.final_score {
        Some(score) => format!("{} / 100", format_points(score)),
        None => "not scored".to_string(),
    };

    let compile_status = if compiled {
        "success".to_string()
    } else if evaluation.compile.timed_out {
        "failed (timed out)".to_string()
    } else {
        match evaluation.compile.exit_code {
            Some(code) => format!("failed (exit code {})", code),
            None => "failed".to_string(),
        }
    };

    let diagnostics = if compiled {
        String::new()
    } else {
        evaluation.compile.stderr.trim().to_string()
    };

    let checks: Vec<_> = evaluation
        .structural
        .iter()
        .flat_map(|report| report.checks.iter())
        .map(|check| {
            json!({
                "mark": if check.passed { "PASS" } else { "FAIL" },
                "name": check.name,
                "weight": check.weight,
                "evidence": check.evidence,
            })
        })
        .collect();

    let breakdown: Vec<_> = evaluation
        .breakdown
        .iter()
        .map(|c| {
            json!({
                "name": c.name,
                "score": format_points(c.score),
                "max": format_points(c.max),
            })
        })
        .collect();

    let data = json!({
        "title": evaluation.title,
        "profile": evaluation.profile.to_string(),
        "final_score": final_score,
        "compile_status": compile_status,
        "diagnostics": diagnostics,
        "checks": checks,
        "breakdown": breakdown,
        "details": detail_lines(evaluation),
        "recommendations": recommendations(compiled),
    });

    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);

    Ok(handlebars.render_template(REPORT_TEMPLATE, &data)?)
}

/// Serialise the evaluation and cut it to at most `max_chars` characters
pub fn bounded_context(evaluation: &Evaluation, max_chars: usize) -> GraderResult<String> {
    let serialized = serde_json::to_string_pretty(evaluation)?;
    Ok(serialized.chars().take(max_chars).collect())
}

fn feedback_prompt(context: &str) -> String {
    format!(
        r#"Given the following evaluation JSON of a student's C program, write a clear 3-5 paragraph feedback report:

- One-line summary with the final score
- What the student did right
- Issues and how to fix them, without writing corrected code
- Action checklist (3 bullet points)

Return plain text only.

EVALUATION:
{context}
"#
    )
}

/// Model-written feedback, or a fixed placeholder when the model is unavailable
#[tracing::instrument(skip_all, fields(model = model.name()))]
pub async fn model_feedback(model: &dyn LanguageModel, evaluation: &Evaluation, max_chars: usize) -> String {
    let context = match bounded_context(evaluation, max_chars) {
        Ok(context) => context,
        Err(e) => {
            warn!(error = %e, "Failed to serialise evaluation for feedback");
            return FEEDBACK_UNAVAILABLE.to_string();
        }
    };

    llm::generate_or_none(model, &feedback_prompt(&context), GenerationParams::PROSE)
        .await
        .map(|text| text.trim().to_string())
        .unwrap_or_else(|| FEEDBACK_UNAVAILABLE.to_string())
}

/// Plain-language hints for compiler diagnostics; never corrected code
#[tracing::instrument(skip_all, fields(model = model.name()))]
pub async fn explain_compile_errors(model: &dyn LanguageModel, diagnostics: &str) -> String {
    let prompt = format!(
        r#"Explain the following gcc compilation errors in simple language.
Only give hints. Do NOT rewrite or fix the code.

ERROR LOG:
{}
"#,
        diagnostics
    );

    llm::generate_or_none(model, &prompt, GenerationParams::PROSE)
        .await
        .map(|text| text.trim().to_string())
        .unwrap_or_else(|| EXPLANATION_UNAVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;
    use crate::structural;
    use autograder_common::types::{CompileSummary, ScoreComponent, ScoringProfile};
    use chrono::Utc;
    use uuid::Uuid;

    fn evaluation(status: GradeStatus) -> Evaluation {
        let compiled = status == GradeStatus::Graded;
        Evaluation {
            id: Uuid::new_v4(),
            title: "Echo".to_string(),
            profile: ScoringProfile::Artifact,
            status,
            compile: CompileSummary {
                success: compiled,
                exit_code: Some(if compiled { 0 } else { 1 }),
                stdout: String::new(),
                stderr: if compiled {
                    String::new()
                } else {
                    "submission.c:3:5: error: expected ';' before 'return'".to_string()
                },
                timed_out: false,
            },
            compile_explanation: None,
            structural: compiled.then(|| {
                structural::evaluate("#include <stdio.h>\nint main() { printf(\"hi\"); }")
            }),
            design: None,
            optimization: None,
            performance: None,
            static_analysis: None,
            judge: None,
            tests: None,
            breakdown: if compiled {
                vec![ScoreComponent {
                    name: "Design".to_string(),
                    score: 13.0,
                    max: 15.0,
                }]
            } else {
                Vec::new()
            },
            final_score: compiled.then_some(72.5),
            report: String::new(),
            feedback: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_report_sections_in_order() {
        let report = render_report(&evaluation(GradeStatus::Graded)).unwrap();

        let score = report.find("Final Score: 72.50 / 100").unwrap();
        let compile = report.find("Compile Status: success").unwrap();
        let checks = report.find("Structural Checks:").unwrap();
        let breakdown = report.find("Score Breakdown:").unwrap();
        let recs = report.find("Recommendations:").unwrap();
        assert!(score < compile && compile < checks && checks < breakdown && breakdown < recs);

        assert!(report.contains("[PASS] entry point (15 pts): main detected"));
        assert!(report.contains("[FAIL] input reading (20 pts): none"));
        assert!(report.contains("Design: 13.00 / 15.00"));
        assert!(report.contains(COMPILED_RECOMMENDATIONS[0]));
        assert!(!report.contains("Compiler Diagnostics"));
    }

    #[test]
    fn test_compile_failure_report() {
        let report = render_report(&evaluation(GradeStatus::CompileFailed)).unwrap();

        assert!(report.contains("Final Score: not scored"));
        assert!(report.contains("Compile Status: failed (exit code 1)"));
        assert!(report.contains("expected ';' before 'return'"));
        assert!(report.contains(COMPILE_FAILED_RECOMMENDATIONS[0]));
        assert!(!report.contains(COMPILED_RECOMMENDATIONS[0]));
    }

    #[test]
    fn test_report_is_deterministic() {
        let eval = evaluation(GradeStatus::Graded);
        assert_eq!(render_report(&eval).unwrap(), render_report(&eval).unwrap());
    }

    #[test]
    fn test_bounded_context() {
        let eval = evaluation(GradeStatus::Graded);
        let context = bounded_context(&eval, 50).unwrap();
        assert_eq!(context.chars().count(), 50);
        let full = bounded_context(&eval, usize::MAX).unwrap();
        assert!(full.contains("\"title\": \"Echo\""));
    }

    #[tokio::test]
    async fn test_feedback_placeholder_when_unavailable() {
        let model = ScriptedModel::new(&[]);
        let feedback = model_feedback(&model, &evaluation(GradeStatus::Graded), 6000).await;
        assert_eq!(feedback, FEEDBACK_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_feedback_prompt_is_bounded() {
        let model = ScriptedModel::new(&["  Good work overall.  "]);
        let feedback = model_feedback(&model, &evaluation(GradeStatus::Graded), 100).await;
        assert_eq!(feedback, "Good work overall.");

        let prompts = model.prompts.lock().unwrap();
        let context = prompts[0].split("EVALUATION:\n").nth(1).unwrap();
        assert!(context.trim_end().chars().count() <= 100);
    }

    #[tokio::test]
    async fn test_compile_explanation_fallback() {
        let model = ScriptedModel::new(&[]);
        let explanation = explain_compile_errors(&model, "error: x").await;
        assert_eq!(explanation, EXPLANATION_UNAVAILABLE);

        let model = ScriptedModel::new(&["A semicolon is missing on line 3."]);
        let explanation = explain_compile_errors(&model, "error: x").await;
        assert_eq!(explanation, "A semicolon is missing on line 3.");
        assert!(model.prompts.lock().unwrap()[0].contains("Do NOT rewrite"));
    }
}
