/// Grading Pipeline - Sequential Orchestration of One Submission
///
/// **Core Responsibility:**
/// Take a submission from raw text to an assembled `Evaluation`.
///
/// **Order:**
/// 1. Validate the submission (title present, source non-empty and bounded)
/// 2. Compile into a scratch workspace (hard stop on failure)
/// 3. Static analysis, structural, design and optimization heuristics
/// 4. Judge verdict (reasoning profile)
/// 5. Test sourcing and execution
/// 6. Performance run
/// 7. Aggregation, deterministic report, model feedback
///
/// **Failure Semantics:**
/// Missing tools, timeouts and malformed model output degrade to fallback
/// values. Only an invalid submission or a workspace that cannot be created
/// is returned as an error. The workspace is removed on every exit path.

use crate::compiler::{self, Workspace};
use crate::error::{GraderError, GraderResult};
use crate::judge;
use crate::llm::ModelSet;
use crate::report;
use crate::scoring::{self, ArtifactInputs, ReasoningInputs};
use crate::{analyzer, design, optimization, performance, structural, tester, testgen};
use autograder_common::config::GraderConfig;
use autograder_common::types::{
    Evaluation, GradeJob, GradeStatus, ScoringProfile, Submission, TestCase, TestSource,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

/// Upper bound on accepted source size
pub const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024;

/// One grading request: the submission plus optional caller tests and profile
#[derive(Debug, Clone)]
pub struct GradeRequest {
    pub id: Uuid,
    pub submission: Submission,
    pub test_cases: Vec<TestCase>,
    pub profile: Option<ScoringProfile>,
}

impl GradeRequest {
    pub fn new(submission: Submission) -> Self {
        Self {
            id: Uuid::new_v4(),
            submission,
            test_cases: Vec::new(),
            profile: None,
        }
    }

    pub fn with_tests(mut self, test_cases: Vec<TestCase>) -> Self {
        self.test_cases = test_cases;
        self
    }

    pub fn with_profile(mut self, profile: Option<ScoringProfile>) -> Self {
        self.profile = profile;
        self
    }
}

impl From<&GradeJob> for GradeRequest {
    fn from(job: &GradeJob) -> Self {
        Self {
            id: job.id,
            submission: job.submission(),
            test_cases: job.test_cases.clone(),
            profile: job.profile,
        }
    }
}

/// Reject submissions the pipeline cannot grade
pub fn validate_submission(submission: &Submission) -> GraderResult<()> {
    if submission.title.trim().is_empty() {
        return Err(GraderError::InvalidSubmission("missing title".to_string()));
    }
    if submission.source_code.trim().is_empty() {
        return Err(GraderError::InvalidSubmission("empty source".to_string()));
    }
    if submission.source_code.len() > MAX_SOURCE_CODE_BYTES {
        return Err(GraderError::InvalidSubmission(format!(
            "source exceeds {} bytes",
            MAX_SOURCE_CODE_BYTES
        )));
    }
    Ok(())
}

/// Grade one submission end to end
#[tracing::instrument(skip_all, fields(job_id = %request.id, title = %request.submission.title))]
pub async fn grade(
    config: &GraderConfig,
    models: &ModelSet,
    request: &GradeRequest,
) -> GraderResult<Evaluation> {
    validate_submission(&request.submission)?;

    let workspace = Workspace::create()?;
    let result = grade_in_workspace(config, models, request, &workspace).await;
    workspace.close();
    result
}

async fn grade_in_workspace(
    config: &GraderConfig,
    models: &ModelSet,
    request: &GradeRequest,
    workspace: &Workspace,
) -> GraderResult<Evaluation> {
    let profile = request.profile.unwrap_or(config.profile);
    let submission = &request.submission;
    let source = submission.source_code.as_str();

    let compiled = compiler::compile(config, workspace, source).await?;

    let Some(executable) = compiled.executable else {
        info!(exit_code = ?compiled.summary.exit_code, "Compilation failed; grading stopped");
        let explanation =
            report::explain_compile_errors(models.reporter.as_ref(), &compiled.summary.stderr).await;

        let mut evaluation = Evaluation {
            id: request.id,
            title: submission.title.clone(),
            profile,
            status: GradeStatus::CompileFailed,
            compile: compiled.summary,
            compile_explanation: Some(explanation),
            structural: None,
            design: None,
            optimization: None,
            performance: None,
            static_analysis: None,
            judge: None,
            tests: None,
            breakdown: Vec::new(),
            final_score: None,
            report: String::new(),
            feedback: None,
            created_at: Utc::now(),
        };
        evaluation.report = report::render_report(&evaluation)?;
        return Ok(evaluation);
    };

    let static_analysis = analyzer::analyze(config, &workspace.source_path()).await;
    let structural = structural::evaluate(source);
    let design = design::score(source);
    let optimization = optimization::score(source);

    let verdict = match profile {
        ScoringProfile::Reasoning => Some(
            judge::judge(models.judge.as_ref(), &submission.title, source, &request.test_cases).await,
        ),
        ScoringProfile::Artifact => None,
    };

    // Caller cases skip the model entirely
    let model_cases = if !request.test_cases.is_empty() {
        None
    } else {
        match &verdict {
            Some(verdict) => Some((
                testgen::parse_suggestions(&verdict.suggested_tests),
                TestSource::ModelSuggested,
            )),
            None => Some(testgen::generate_cases(models.test_generator.as_ref(), &submission.title).await),
        }
    };
    let (test_cases, test_source) = testgen::resolve(&request.test_cases, model_cases);

    let tests = tester::execute_tests(
        &executable,
        &test_cases,
        test_source,
        &config.execution,
        config.match_policy,
    )
    .await;

    let performance = performance::evaluate(source, &executable, &config.execution).await;

    let breakdown = match profile {
        ScoringProfile::Artifact => scoring::artifact_breakdown(
            &config.weights.artifact,
            ArtifactInputs {
                design: &design,
                optimization: &optimization,
                performance: &performance,
                static_analysis: &static_analysis,
                test_pass_rate: tests.pass_rate,
            },
            config.static_penalty_per_warning,
        ),
        ScoringProfile::Reasoning => scoring::reasoning_breakdown(
            &config.weights.reasoning,
            ReasoningInputs {
                compiled: true,
                structural_score: structural.score,
                logic_score: verdict.as_ref().map_or(0, |v| v.logic_score),
                test_pass_rate: tests.pass_rate,
            },
        ),
    };
    let final_score = scoring::final_score(&breakdown);

    info!(
        profile = %profile,
        score = final_score,
        passed = tests.passed,
        total = tests.total,
        "Submission graded"
    );

    let mut evaluation = Evaluation {
        id: request.id,
        title: submission.title.clone(),
        profile,
        status: GradeStatus::Graded,
        compile: compiled.summary,
        compile_explanation: None,
        structural: Some(structural),
        design: Some(design),
        optimization: Some(optimization),
        performance: Some(performance),
        static_analysis: Some(static_analysis),
        judge: verdict,
        tests: Some(tests),
        breakdown,
        final_score: Some(final_score),
        report: String::new(),
        feedback: None,
        created_at: Utc::now(),
    };

    evaluation.report = report::render_report(&evaluation)?;

    let feedback = report::model_feedback(
        models.reporter.as_ref(),
        &evaluation,
        config.models.report_context_chars,
    )
    .await;
    if feedback == report::FEEDBACK_UNAVAILABLE {
        warn!("Model feedback unavailable; deterministic report only");
    }
    evaluation.feedback = Some(feedback);

    Ok(evaluation)
}
