/// Test Evaluator - Output Comparison and Pass-Rate Scoring
///
/// **Core Responsibility:**
/// Compare raw execution outputs against expected outputs and compute the
/// pass rate of a batch.
///
/// **Critical Properties:**
/// - Knows nothing about processes, compilers or models
/// - Pure function: (execution outputs, test cases, policy) → TestReport
/// - Every attempted case counts toward the total, including crashes and timeouts
///
/// **Normalization Rules:**
/// - Trim leading and trailing whitespace on both sides
/// - Case sensitive
/// - Internal whitespace preserved
///
/// **Match Policies:**
/// - Exact: trimmed actual == trimmed expected (default)
/// - Suffix: trimmed actual ends with trimmed expected
/// - Contains: trimmed actual contains trimmed expected

use autograder_common::types::{
    MatchPolicy, TestCase, TestReport, TestResult, TestSource, TestStatus,
};

/// Raw execution output for a single test case, produced by the tester
#[derive(Debug, Clone)]
pub struct TestExecutionOutput {
    pub case_index: usize,
    pub stdout: String,
    pub stderr: String,
    pub execution_time_ms: u64,
    pub timed_out: bool,
    pub runtime_error: bool,
}

fn normalize_output(output: &str) -> &str {
    output.trim()
}

/// Compare trimmed outputs under the given policy
pub fn outputs_match(actual: &str, expected: &str, policy: MatchPolicy) -> bool {
    let actual = normalize_output(actual);
    let expected = normalize_output(expected);
    match policy {
        MatchPolicy::Exact => actual == expected,
        MatchPolicy::Suffix => actual.ends_with(expected),
        MatchPolicy::Contains => actual.contains(expected),
    }
}

/// Evaluate a single test case execution output
///
/// Priority: runtime error, then timeout, then output comparison.
pub fn evaluate_test(
    output: &TestExecutionOutput,
    test_case: &TestCase,
    policy: MatchPolicy,
) -> TestResult {
    let status = if output.runtime_error {
        TestStatus::RuntimeError
    } else if output.timed_out {
        TestStatus::TimeLimitExceeded
    } else if outputs_match(&output.stdout, &test_case.expected_output, policy) {
        TestStatus::Passed
    } else {
        TestStatus::Failed
    };

    TestResult {
        case_index: output.case_index,
        input: test_case.input.clone(),
        expected_output: normalize_output(&test_case.expected_output).to_string(),
        actual_output: normalize_output(&output.stdout).to_string(),
        stderr: output.stderr.clone(),
        status,
        execution_time_ms: output.execution_time_ms,
    }
}

/// Aggregate per-case outputs into a TestReport.
///
/// `total` is the number of test cases, not the number of outputs, so a case
/// without an output is counted as failed rather than omitted.
pub fn aggregate_results(
    outputs: &[TestExecutionOutput],
    test_cases: &[TestCase],
    source: TestSource,
    policy: MatchPolicy,
) -> TestReport {
    let mut results = Vec::with_capacity(test_cases.len());

    for (idx, test_case) in test_cases.iter().enumerate() {
        let result = match outputs.iter().find(|o| o.case_index == idx) {
            Some(output) => evaluate_test(output, test_case, policy),
            None => TestResult {
                case_index: idx,
                input: test_case.input.clone(),
                expected_output: normalize_output(&test_case.expected_output).to_string(),
                actual_output: String::new(),
                stderr: "No execution output recorded".to_string(),
                status: TestStatus::RuntimeError,
                execution_time_ms: 0,
            },
        };
        results.push(result);
    }

    let total = results.len();
    let passed = results.iter().filter(|r| r.status == TestStatus::Passed).count();
    let pass_rate = pass_rate(passed, total);

    TestReport {
        source,
        results,
        passed,
        total,
        pass_rate,
        summary: format!("{}/{} test cases passed.", passed, total),
    }
}

/// 100 * passed / total, or 0 for an empty batch
pub fn pass_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * passed as f64 / total as f64
    }
}
