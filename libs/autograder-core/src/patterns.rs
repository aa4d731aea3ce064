//! Error-tolerant text patterns used by the source heuristics.
//!
//! Every pattern carries a literal fallback. If the regex fails to compile
//! the pattern degrades to plain substring matching instead of failing the
//! evaluation.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub enum Fallback {
    /// Count occurrences of every literal
    AnyOf(&'static [&'static str]),
    /// Match once when the literals appear in this order
    InOrder(&'static [&'static str]),
}

#[derive(Debug)]
pub struct TextPattern {
    regex: Option<Regex>,
    fallback: Fallback,
}

impl TextPattern {
    pub fn new(pattern: &str, fallback: Fallback) -> Self {
        let regex = match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(pattern, error = %e, "Pattern failed to compile; using literal fallback");
                None
            }
        };
        Self { regex, fallback }
    }

    pub fn count(&self, text: &str) -> usize {
        match &self.regex {
            Some(regex) => regex.find_iter(text).count(),
            None => fallback_count(self.fallback, text),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(text),
            None => fallback_count(self.fallback, text) > 0,
        }
    }
}

fn fallback_count(fallback: Fallback, text: &str) -> usize {
    match fallback {
        Fallback::AnyOf(literals) => literals.iter().map(|lit| text.matches(lit).count()).sum(),
        Fallback::InOrder(literals) => {
            let mut rest = text;
            for lit in literals {
                match rest.find(lit) {
                    Some(idx) => rest = &rest[idx + lit.len()..],
                    None => return 0,
                }
            }
            1
        }
    }
}

lazy_static! {
    /// return type, identifier, parameter list, opening brace
    pub static ref FUNCTION_DEFINITION: TextPattern = TextPattern::new(
        r"\w+\s+\**\w+\s*\([^)]*\)\s*\{",
        Fallback::AnyOf(&[") {", "){"]),
    );

    /// a loop keyword followed anywhere later by printf
    pub static ref PRINTF_AFTER_LOOP: TextPattern = TextPattern::new(
        r"(?s)\b(?:for|while|do)\b.*printf",
        Fallback::InOrder(&["for", "printf"]),
    );

    pub static ref LOOP_KEYWORD: TextPattern = TextPattern::new(
        r"\b(?:for|while|do)\b",
        Fallback::AnyOf(&["for", "while"]),
    );

    pub static ref BRANCH_KEYWORD: TextPattern = TextPattern::new(
        r"\b(?:if|else|switch|case)\b",
        Fallback::AnyOf(&["if", "switch"]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_regex_degrades_to_literals() {
        let pattern = TextPattern::new(r"(unclosed", Fallback::AnyOf(&["for"]));
        assert_eq!(pattern.count("for for"), 2);
        assert!(pattern.is_match("for"));
        assert!(!pattern.is_match("while"));
    }

    #[test]
    fn test_in_order_fallback() {
        let pattern = TextPattern::new(r"[", Fallback::InOrder(&["for", "printf"]));
        assert!(pattern.is_match("for (;;) { printf(\"x\"); }"));
        assert!(!pattern.is_match("printf(\"x\"); for (;;) {}"));
    }

    #[test]
    fn test_function_definitions() {
        let src = "int add(int a, int b) {\n return a + b;\n}\nint main(void)\n{\n return add(1, 2);\n}\n";
        assert_eq!(FUNCTION_DEFINITION.count(src), 2);
        assert_eq!(FUNCTION_DEFINITION.count("x = y;"), 0);
    }

    #[test]
    fn test_keyword_counts_use_word_boundaries() {
        assert_eq!(LOOP_KEYWORD.count("for (;;) {} while (1) {} double d; format();"), 2);
        assert_eq!(BRANCH_KEYWORD.count("if (a) {} else if (b) {} switch (c) { case 1: break; }"), 5);
    }

    #[test]
    fn test_printf_after_loop_spans_lines() {
        assert!(PRINTF_AFTER_LOOP.is_match("for (int i = 0; i < n; i++)\n{\n  printf(\"%d\", i);\n}"));
        assert!(!PRINTF_AFTER_LOOP.is_match("printf(\"once\");"));
    }
}
