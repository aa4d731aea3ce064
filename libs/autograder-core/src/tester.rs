//! Test executor: one bounded run of the binary per test case.
//!
//! A case that crashes, exits non-zero or times out is recorded as failed;
//! the batch always completes and always produces a report.

use crate::evaluator::{self, TestExecutionOutput};
use crate::runner::{self, Executable, RunLimits};
use autograder_common::config::ExecutionConfig;
use autograder_common::types::{MatchPolicy, TestCase, TestReport, TestSource};
use std::time::Duration;
use tracing::{debug, info, warn};

#[tracing::instrument(skip_all, fields(test_count = test_cases.len(), source = ?source))]
pub async fn execute_tests(
    executable: &Executable,
    test_cases: &[TestCase],
    source: TestSource,
    execution: &ExecutionConfig,
    policy: MatchPolicy,
) -> TestReport {
    let limits = RunLimits {
        timeout: Duration::from_millis(execution.test_timeout_ms),
        max_output_bytes: execution.max_output_bytes,
    };

    let mut outputs = Vec::with_capacity(test_cases.len());

    for (case_index, test_case) in test_cases.iter().enumerate() {
        let output = match runner::run(executable, Some(&test_case.input), None, &limits).await {
            Ok(output) => TestExecutionOutput {
                case_index,
                execution_time_ms: output.execution_time_ms(),
                timed_out: output.timed_out,
                runtime_error: output.runtime_error,
                stdout: output.stdout,
                stderr: output.stderr,
            },
            Err(e) => {
                warn!(case_index, error = %e, "Test run could not be started");
                TestExecutionOutput {
                    case_index,
                    stdout: String::new(),
                    stderr: format!("Runtime Error: {}", e),
                    execution_time_ms: 0,
                    timed_out: false,
                    runtime_error: true,
                }
            }
        };

        debug!(
            case_index,
            execution_ms = output.execution_time_ms,
            timed_out = output.timed_out,
            runtime_error = output.runtime_error,
            "Test case executed"
        );
        outputs.push(output);
    }

    let report = evaluator::aggregate_results(&outputs, test_cases, source, policy);
    info!(passed = report.passed, total = report.total, "Test batch completed");
    report
}
