//! Score aggregation.
//!
//! Two weighting profiles are supported:
//! - Artifact: design + tests + performance + optimization + static analysis,
//!   weights in rubric points summing to 100.
//! - Reasoning: compile success + structure + model logic score + tests, each
//!   normalised to [0, 1] and weighted by fractions summing to 1.
//!
//! Every component is clamped to [0, max]; the total is clamped to [0, 100]
//! and rounded to two decimals.

use autograder_common::config::{ArtifactWeights, ReasoningWeights};
use autograder_common::types::{
    HeuristicScore, PerformanceReport, ScoreComponent, StaticAnalysisReport,
};

pub const MAX_TOTAL: f64 = 100.0;

/// Component scores feeding the artifact profile
#[derive(Debug, Clone, Copy)]
pub struct ArtifactInputs<'a> {
    pub design: &'a HeuristicScore,
    pub optimization: &'a HeuristicScore,
    pub performance: &'a PerformanceReport,
    pub static_analysis: &'a StaticAnalysisReport,
    /// 0-100
    pub test_pass_rate: f64,
}

/// Component scores feeding the reasoning profile
#[derive(Debug, Clone, Copy)]
pub struct ReasoningInputs {
    pub compiled: bool,
    /// 0-100
    pub structural_score: u32,
    /// 0-100
    pub logic_score: u32,
    /// 0-100
    pub test_pass_rate: f64,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn component(name: &str, fraction: f64, max: f64) -> ScoreComponent {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let max = max.max(0.0);
    ScoreComponent {
        name: name.to_string(),
        score: round2(fraction * max),
        max,
    }
}

fn ratio(score: u32, base: u32) -> f64 {
    if base == 0 {
        0.0
    } else {
        score as f64 / base as f64
    }
}

/// `max(0, weight - warnings * penalty)`
pub fn static_analysis_score(weight: f64, warnings: usize, penalty_per_warning: f64) -> f64 {
    (weight - warnings as f64 * penalty_per_warning).clamp(0.0, weight.max(0.0))
}

pub fn artifact_breakdown(
    weights: &ArtifactWeights,
    inputs: ArtifactInputs<'_>,
    penalty_per_warning: f64,
) -> Vec<ScoreComponent> {
    let static_points = static_analysis_score(
        weights.static_analysis,
        inputs.static_analysis.warnings.len(),
        penalty_per_warning,
    );
    let static_fraction = if weights.static_analysis > 0.0 {
        static_points / weights.static_analysis
    } else {
        0.0
    };

    vec![
        component("Design", ratio(inputs.design.score, inputs.design.base), weights.design),
        component("Tests", inputs.test_pass_rate / 100.0, weights.tests),
        component(
            "Performance",
            ratio(inputs.performance.score, inputs.performance.base),
            weights.performance,
        ),
        component(
            "Optimization",
            ratio(inputs.optimization.score, inputs.optimization.base),
            weights.optimization,
        ),
        component("Static Analysis", static_fraction, weights.static_analysis),
    ]
}

pub fn reasoning_breakdown(weights: &ReasoningWeights, inputs: ReasoningInputs) -> Vec<ScoreComponent> {
    let compile = if inputs.compiled { 1.0 } else { 0.0 };
    vec![
        component("Compilation", compile, weights.compile * MAX_TOTAL),
        component("Structure", inputs.structural_score as f64 / 100.0, weights.structure * MAX_TOTAL),
        component("Logic", inputs.logic_score as f64 / 100.0, weights.logic * MAX_TOTAL),
        component("Tests", inputs.test_pass_rate / 100.0, weights.tests * MAX_TOTAL),
    ]
}

/// Sum of components, clamped to [0, 100] and rounded to two decimals
pub fn final_score(breakdown: &[ScoreComponent]) -> f64 {
    let total: f64 = breakdown.iter().map(|c| c.score).sum();
    round2(total.clamp(0.0, MAX_TOTAL))
}
