//! Performance heuristic.
//!
//! One timed run of the compiled binary with no stdin, plus keyword counts as
//! a coarse complexity proxy. Single-run timing is noisy; that noise is
//! accepted.

use crate::patterns::{BRANCH_KEYWORD, LOOP_KEYWORD};
use crate::runner::{self, Executable, RunLimits};
use autograder_common::config::ExecutionConfig;
use autograder_common::types::PerformanceReport;
use std::time::Duration;
use tracing::{info, warn};

pub const PERFORMANCE_BASE: u32 = 15;

const SLOW_RUNTIME_SECS: f64 = 0.7;
const VERY_SLOW_RUNTIME_SECS: f64 = 1.2;
const MAX_LOOP_KEYWORDS: usize = 5;
const MAX_BRANCH_KEYWORDS: usize = 12;

/// Measured runtime of the single performance run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeSample {
    pub elapsed_secs: f64,
    pub timed_out: bool,
}

/// Run the binary once under the performance timeout.
/// A timeout or launch failure is recorded as the fixed penalty runtime.
pub async fn measure(executable: &Executable, execution: &ExecutionConfig) -> RuntimeSample {
    let limits = RunLimits {
        timeout: Duration::from_millis(execution.perf_timeout_ms),
        max_output_bytes: execution.max_output_bytes,
    };

    match runner::run(executable, None, None, &limits).await {
        Ok(output) if output.timed_out => {
            warn!(
                timeout_ms = execution.perf_timeout_ms,
                penalty_secs = execution.perf_timeout_penalty_secs,
                "Performance run timed out"
            );
            RuntimeSample {
                elapsed_secs: execution.perf_timeout_penalty_secs,
                timed_out: true,
            }
        }
        Ok(output) => RuntimeSample {
            elapsed_secs: output.elapsed.as_secs_f64(),
            timed_out: false,
        },
        Err(e) => {
            warn!(error = %e, "Performance run could not be started");
            RuntimeSample {
                elapsed_secs: execution.perf_timeout_penalty_secs,
                timed_out: true,
            }
        }
    }
}

/// Score a runtime sample against the source's keyword counts
pub fn score(source: &str, sample: RuntimeSample) -> PerformanceReport {
    let loop_keywords = LOOP_KEYWORD.count(source);
    let branch_keywords = BRANCH_KEYWORD.count(source);

    let mut penalty = 0;
    if sample.elapsed_secs > SLOW_RUNTIME_SECS {
        penalty += 3;
    }
    if sample.elapsed_secs > VERY_SLOW_RUNTIME_SECS {
        penalty += 3;
    }
    if loop_keywords > MAX_LOOP_KEYWORDS {
        penalty += 2;
    }
    if branch_keywords > MAX_BRANCH_KEYWORDS {
        penalty += 2;
    }

    let runtime = if sample.timed_out {
        format!("Runtime: timed out (recorded as {:.2}s)", sample.elapsed_secs)
    } else {
        format!("Runtime: {:.3}s", sample.elapsed_secs)
    };

    PerformanceReport {
        score: PERFORMANCE_BASE.saturating_sub(penalty),
        base: PERFORMANCE_BASE,
        elapsed_secs: sample.elapsed_secs,
        timed_out: sample.timed_out,
        loop_keywords,
        branch_keywords,
        report: format!(
            "{}, Loops: {}, Branches: {}",
            runtime, loop_keywords, branch_keywords
        ),
    }
}

/// Measure and score in one step
pub async fn evaluate(
    source: &str,
    executable: &Executable,
    execution: &ExecutionConfig,
) -> PerformanceReport {
    let sample = measure(executable, execution).await;
    let report = score(source, sample);
    info!(
        score = report.score,
        elapsed_secs = report.elapsed_secs,
        timed_out = report.timed_out,
        "Performance evaluated"
    );
    report
}
