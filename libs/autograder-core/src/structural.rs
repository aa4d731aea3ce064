//! Structural heuristic evaluator.
//!
//! Six independent substring checks over the raw source text. There is no
//! lexical awareness: a keyword inside a string literal or a comment still
//! counts.

use autograder_common::types::{StructuralCheck, StructuralReport};

pub const MAX_STRUCTURAL_SCORE: u32 = 100;

fn contains_any(source: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| source.contains(needle))
}

fn check(name: &str, passed: bool, weight: u32, found: &str, missing: &str) -> StructuralCheck {
    StructuralCheck {
        name: name.to_string(),
        passed,
        weight,
        evidence: if passed { found } else { missing }.to_string(),
    }
}

/// Run the structural checks in their fixed order
pub fn evaluate(source: &str) -> StructuralReport {
    let has_comments = contains_any(source, &["//", "/*"]);

    let checks = vec![
        check(
            "entry point",
            contains_any(source, &["main(", "int main"]),
            15,
            "main detected",
            "missing",
        ),
        check("includes", source.contains("#include"), 10, "includes found", "none"),
        check(
            "input reading",
            contains_any(source, &["scanf", "fscanf"]),
            20,
            "scanf present",
            "none",
        ),
        check(
            "iteration",
            contains_any(source, &["for", "while", "do"]),
            20,
            "loop found",
            "none",
        ),
        check(
            "output",
            contains_any(source, &["printf", "puts("]),
            20,
            "output call present",
            "none",
        ),
        check("documentation", has_comments, 15, "present", "none"),
    ];

    let total: u32 = checks.iter().filter(|c| c.passed).map(|c| c.weight).sum();

    StructuralReport {
        checks,
        score: total.min(MAX_STRUCTURAL_SCORE),
        has_comments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETE: &str = r#"#include <stdio.h>

// echo the number back
int main() {
    int n;
    scanf("%d", &n);
    for (int i = 0; i < 1; i++) {
        printf("%d\n", n);
    }
    return 0;
}
"#;

    #[test]
    fn test_all_checks_pass() {
        let report = evaluate(COMPLETE);
        assert_eq!(report.score, 100);
        assert!(report.has_comments);
        assert!(report.checks.iter().all(|c| c.passed));
    }

    #[test]
    fn test_output_and_loop_only() {
        let source = "void run() { int i = 0; while (i < 3) { printf(\"x\"); i++; } }";
        let report = evaluate(source);
        assert_eq!(report.score, 40);
        assert!(!report.has_comments);

        let passed: Vec<&str> = report
            .checks
            .iter()
            .filter(|c| c.passed)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(passed, vec!["iteration", "output"]);
    }

    #[test]
    fn test_empty_source_scores_zero() {
        let report = evaluate("");
        assert_eq!(report.score, 0);
        assert_eq!(report.checks.len(), 6);
        assert!(report.checks.iter().all(|c| !c.passed));
    }

    #[test]
    fn test_check_order_and_weights() {
        let report = evaluate("");
        let layout: Vec<(&str, u32)> = report
            .checks
            .iter()
            .map(|c| (c.name.as_str(), c.weight))
            .collect();
        assert_eq!(
            layout,
            vec![
                ("entry point", 15),
                ("includes", 10),
                ("input reading", 20),
                ("iteration", 20),
                ("output", 20),
                ("documentation", 15),
            ]
        );
    }

    #[test]
    fn test_keywords_inside_string_literals_count() {
        let report = evaluate(r##"char *s = "#include scanf";"##);
        assert!(report.checks[1].passed);
        assert!(report.checks[2].passed);
    }

    #[test]
    fn test_score_is_monotonic_in_checks() {
        let sources = [
            "",
            "printf",
            "printf while",
            "printf while scanf",
            "printf while scanf #include",
            "printf while scanf #include main(",
            "printf while scanf #include main( //",
        ];
        let scores: Vec<u32> = sources.iter().map(|s| evaluate(s).score).collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*scores.last().unwrap(), 100);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(evaluate(COMPLETE), evaluate(COMPLETE));
    }
}
