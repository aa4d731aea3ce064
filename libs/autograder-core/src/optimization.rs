// Optimization heuristic: whole-file leak and buffered-output checks
use crate::patterns::PRINTF_AFTER_LOOP;
use autograder_common::types::HeuristicScore;

pub const OPTIMIZATION_BASE: u32 = 20;

const LEAK_PENALTY: u32 = 4;
const PRINTF_IN_LOOP_PENALTY: u32 = 3;

/// Whole-file approximation: `free` anywhere in the file clears the leak
/// check, and a printf anywhere after a loop keyword counts as in-loop.
pub fn score(source: &str) -> HeuristicScore {
    let mut penalty = 0;
    let mut suggestions = Vec::new();

    if source.contains("malloc") && !source.contains("free") {
        penalty += LEAK_PENALTY;
        suggestions.push("Possible memory leak: malloc without free.");
    }

    if PRINTF_AFTER_LOOP.is_match(source) {
        penalty += PRINTF_IN_LOOP_PENALTY;
        suggestions.push("printf used inside loop; consider buffering output.");
    }

    let report = if suggestions.is_empty() {
        "No major optimizations required.".to_string()
    } else {
        suggestions.join("\n")
    };

    HeuristicScore {
        score: OPTIMIZATION_BASE.saturating_sub(penalty),
        base: OPTIMIZATION_BASE,
        report,
    }
}
