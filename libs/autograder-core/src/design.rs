// Design heuristic: size, function count and comment density
use crate::patterns::FUNCTION_DEFINITION;
use autograder_common::types::HeuristicScore;

pub const DESIGN_BASE: u32 = 15;

const MAX_LINES: usize = 200;
const MIN_FUNCTIONS: usize = 2;
const MIN_COMMENT_MARKERS: usize = 3;

pub fn score(source: &str) -> HeuristicScore {
    let lines = source.lines().count();
    let functions = FUNCTION_DEFINITION.count(source);
    let comments = source.matches("//").count() + source.matches("/*").count();

    let mut penalty = 0;
    if lines > MAX_LINES {
        penalty += 2;
    }
    if functions < MIN_FUNCTIONS {
        penalty += 3;
    }
    if comments < MIN_COMMENT_MARKERS {
        penalty += 2;
    }

    HeuristicScore {
        score: DESIGN_BASE.saturating_sub(penalty),
        base: DESIGN_BASE,
        report: format!("Lines: {}, Functions: {}, Comments: {}", lines, functions, comments),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_structured_source_keeps_base() {
        let source = r#"// sum two numbers
/* helper */
int add(int a, int b) {
    return a + b; // plain addition
}

int main(void) {
    return add(1, 2);
}
"#;
        let result = score(source);
        assert_eq!(result.score, 15);
        assert_eq!(result.report, "Lines: 9, Functions: 2, Comments: 3");
    }

    #[test]
    fn test_single_function_no_comments() {
        let result = score("int main(void) {\n    return 0;\n}\n");
        // -3 functions, -2 comments
        assert_eq!(result.score, 10);
    }

    #[test]
    fn test_long_file_penalised() {
        let mut source = String::from("// a\n// b\n// c\nint f(void) {\n return 1;\n}\nint main(void) {\n return f();\n}\n");
        for _ in 0..200 {
            source.push_str("int x_unused;\n");
        }
        let result = score(&source);
        assert_eq!(result.score, 13);
    }

    #[test]
    fn test_score_never_exceeds_base_or_goes_negative() {
        for source in ["", "x", "int main(void) { return 0; }"] {
            let result = score(source);
            assert!(result.score <= DESIGN_BASE);
        }
        assert_eq!(score("").score, 10);
    }
}
