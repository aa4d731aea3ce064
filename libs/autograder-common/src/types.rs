use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Named weighting scheme used by the score aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScoringProfile {
    /// design + tests + performance + optimization + static analysis
    #[default]
    Artifact,
    /// compile success + structure + model logic score + tests
    Reasoning,
}

impl fmt::Display for ScoringProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringProfile::Artifact => write!(f, "artifact"),
            ScoringProfile::Reasoning => write!(f, "reasoning"),
        }
    }
}

impl std::str::FromStr for ScoringProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "artifact" => Ok(ScoringProfile::Artifact),
            "reasoning" => Ok(ScoringProfile::Reasoning),
            other => Err(format!("unknown scoring profile: {}", other)),
        }
    }
}

/// How trimmed actual output is compared with trimmed expected output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    #[default]
    Exact,
    Suffix,
    Contains,
}

/// A grading request as received from the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub title: String,
    pub source_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// Where the executed test list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestSource {
    Caller,
    ModelGenerated,
    ModelSuggested,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    Passed,
    Failed,
    RuntimeError,
    TimeLimitExceeded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub case_index: usize,
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub stderr: String,
    pub status: TestStatus,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub source: TestSource,
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub total: usize,
    /// 100 * passed / total, 0 for an empty batch
    pub pass_rate: f64,
    pub summary: String,
}

/// Compiler outcome as surfaced to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileSummary {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralCheck {
    pub name: String,
    pub passed: bool,
    pub weight: u32,
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralReport {
    pub checks: Vec<StructuralCheck>,
    /// Sum of passed weights, clamped to 100
    pub score: u32,
    pub has_comments: bool,
}

/// Result of a base-minus-penalties heuristic (design, optimization)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicScore {
    pub score: u32,
    pub base: u32,
    pub report: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub score: u32,
    pub base: u32,
    pub elapsed_secs: f64,
    pub timed_out: bool,
    pub loop_keywords: usize,
    pub branch_keywords: usize,
    pub report: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticAnalysisReport {
    pub available: bool,
    pub warnings: Vec<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SolvesProblem {
    #[serde(default)]
    pub value: bool,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyStep {
    pub name: String,
    #[serde(default)]
    pub implemented: bool,
    #[serde(default)]
    pub evidence: String,
}

/// Reasoning verdict produced by the judge model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub solves_problem: SolvesProblem,
    #[serde(default)]
    pub syntax_errors: Vec<String>,
    #[serde(default)]
    pub key_steps: Vec<KeyStep>,
    pub logic_score: u32,
    #[serde(default)]
    pub suggested_tests: Vec<String>,
    /// False when the verdict is the parse-failure default
    #[serde(default = "default_true")]
    pub from_model: bool,
}

fn default_true() -> bool {
    true
}

/// One line of the score breakdown, already scaled to rubric points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub name: String,
    pub score: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeStatus {
    Graded,
    CompileFailed,
}

/// Aggregate grading record, assembled once per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: Uuid,
    pub title: String,
    pub profile: ScoringProfile,
    pub status: GradeStatus,
    pub compile: CompileSummary,
    pub compile_explanation: Option<String>,
    pub structural: Option<StructuralReport>,
    pub design: Option<HeuristicScore>,
    pub optimization: Option<HeuristicScore>,
    pub performance: Option<PerformanceReport>,
    pub static_analysis: Option<StaticAnalysisReport>,
    pub judge: Option<JudgeVerdict>,
    pub tests: Option<TestReport>,
    pub breakdown: Vec<ScoreComponent>,
    pub final_score: Option<f64>,
    pub report: String,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Queue payload pushed by the API and consumed by the worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeJob {
    pub id: Uuid,
    pub title: String,
    pub source_code: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub profile: Option<ScoringProfile>,
    pub submitted_at: DateTime<Utc>,
}

impl GradeJob {
    pub fn submission(&self) -> Submission {
        Submission {
            title: self.title.clone(),
            source_code: self.source_code.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    CompileFailed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::CompileFailed | JobStatus::Failed
        )
    }
}

impl From<GradeStatus> for JobStatus {
    fn from(status: GradeStatus) -> Self {
        match status {
            GradeStatus::Graded => JobStatus::Completed,
            GradeStatus::CompileFailed => JobStatus::CompileFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_parsing() {
        assert_eq!("artifact".parse::<ScoringProfile>(), Ok(ScoringProfile::Artifact));
        assert_eq!("Reasoning".parse::<ScoringProfile>(), Ok(ScoringProfile::Reasoning));
        assert!("weighted".parse::<ScoringProfile>().is_err());
        assert_eq!(ScoringProfile::default().to_string(), "artifact");
    }

    #[test]
    fn test_judge_verdict_requires_logic_score() {
        let missing: Result<JudgeVerdict, _> = serde_json::from_str(r#"{"intent": "sum"}"#);
        assert!(missing.is_err());

        let minimal: JudgeVerdict = serde_json::from_str(r#"{"logic_score": 70}"#).unwrap();
        assert_eq!(minimal.logic_score, 70);
        assert!(minimal.from_model);
        assert!(minimal.suggested_tests.is_empty());
    }

    #[test]
    fn test_job_status_from_grade_status() {
        assert_eq!(JobStatus::from(GradeStatus::Graded), JobStatus::Completed);
        assert_eq!(JobStatus::from(GradeStatus::CompileFailed), JobStatus::CompileFailed);
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_grade_job_defaults() {
        let job: GradeJob = serde_json::from_str(
            r#"{"id":"6f1c1e8a-4b7e-4c55-9a51-0c6a1c1f2d3e","title":"echo","source_code":"int main(){}","submitted_at":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(job.test_cases.is_empty());
        assert!(job.profile.is_none());
        assert_eq!(job.submission().title, "echo");
    }
}
