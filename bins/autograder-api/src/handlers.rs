// HTTP route handlers for the grading API

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use autograder_common::redis;
use autograder_common::types::{GradeJob, JobStatus, ScoringProfile, Submission, TestCase};
use autograder_core::pipeline::validate_submission;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GradeSubmission {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source_code: String,
    #[serde(default)]
    pub test_cases: Vec<TestCaseInput>,
    #[serde(default)]
    pub profile: Option<ScoringProfile>,
}

#[derive(Debug, Deserialize)]
pub struct TestCaseInput {
    pub input: String,
    #[serde(alias = "expected")]
    pub expected_output: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
}

fn error_body(message: impl Into<String>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": message.into() }))
}

/// Build the queue payload, rejecting submissions the grader cannot accept
pub fn build_job(payload: GradeSubmission) -> Result<GradeJob, String> {
    let submission = Submission {
        title: payload.title,
        source_code: payload.source_code,
    };
    validate_submission(&submission).map_err(|e| e.to_string())?;

    Ok(GradeJob {
        id: Uuid::new_v4(),
        title: submission.title,
        source_code: submission.source_code,
        test_cases: payload
            .test_cases
            .into_iter()
            .map(|tc| TestCase::new(tc.input, tc.expected_output))
            .collect(),
        profile: payload.profile,
        submitted_at: Utc::now(),
    })
}

/// POST /grade - Queue a submission for grading
pub async fn submit_grade(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GradeSubmission>,
) -> Response {
    let job = match build_job(payload) {
        Ok(job) => job,
        Err(message) => {
            metrics::JOBS_REJECTED.inc();
            warn!(reason = %message, "Submission rejected");
            return (StatusCode::BAD_REQUEST, error_body(message)).into_response();
        }
    };

    let job_id = job.id;
    let mut conn = state.redis.clone();

    if let Err(e) = redis::set_status(&mut conn, &job_id, JobStatus::Queued).await {
        error!(job_id = %job_id, error = %e, "Failed to record job status");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_body(format!("Failed to queue job: {}", e)),
        )
            .into_response();
    }

    match redis::push_job(&mut conn, &job).await {
        Ok(_) => {
            metrics::JOBS_SUBMITTED.inc();
            info!(
                job_id = %job_id,
                title = %job.title,
                test_cases = job.test_cases.len(),
                source_size = job.source_code.len(),
                "Job queued"
            );
            (
                StatusCode::CREATED,
                Json(SubmitResponse {
                    job_id: job_id.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Failed to queue job");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body(format!("Failed to queue job: {}", e)),
            )
                .into_response()
        }
    }
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus text exposition
pub async fn metrics_handler() -> Response {
    match metrics::export() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// GET /grade/:job_id - Evaluation once graded, status while pending
pub async fn get_grade(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Response {
    let job_uuid = match Uuid::parse_str(&job_id) {
        Ok(id) => id,
        Err(_) => {
            return (StatusCode::BAD_REQUEST, error_body("Invalid job ID format")).into_response();
        }
    };

    let mut conn = state.redis.clone();
    match redis::get_result(&mut conn, &job_uuid).await {
        Ok(Some(evaluation)) => {
            metrics::RESULTS_SERVED.inc();
            info!(job_id = %job_id, status = ?evaluation.status, "Evaluation retrieved");
            return (StatusCode::OK, Json(evaluation)).into_response();
        }
        Ok(None) => {}
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Failed to fetch evaluation");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body(format!("Failed to query job: {}", e)),
            )
                .into_response();
        }
    }

    match redis::get_status(&mut conn, &job_uuid).await {
        Ok(Some(status)) if status.is_terminal() => (
            StatusCode::OK,
            Json(serde_json::json!({ "job_id": job_id, "status": status })),
        )
            .into_response(),
        Ok(Some(status)) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "job_id": job_id, "status": status })),
        )
            .into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, error_body("Job not found")).into_response(),
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Failed to fetch job status");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body(format!("Failed to query job: {}", e)),
            )
                .into_response()
        }
    }
}
