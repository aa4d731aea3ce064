use crate::types::{Evaluation, GradeJob, JobStatus};
use redis::{AsyncCommands, RedisResult};

/// Redis queue semantics shared by the API and the worker.
/// Keys are deterministic so both sides never drift.

pub const QUEUE_KEY: &str = "autograder:queue";
pub const RESULT_PREFIX: &str = "autograder:result";
pub const STATUS_PREFIX: &str = "autograder:status";

/// Results and statuses expire after 24 hours
pub const RESULT_TTL_SECONDS: u64 = 86400;

pub fn result_key(job_id: &uuid::Uuid) -> String {
    format!("{}:{}", RESULT_PREFIX, job_id)
}

pub fn status_key(job_id: &uuid::Uuid) -> String {
    format!("{}:{}", STATUS_PREFIX, job_id)
}

fn serialization_error(e: serde_json::Error) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::TypeError, "serialization error", e.to_string()))
}

/// Push a grading job (RPUSH, FIFO with BLPOP)
pub async fn push_job(
    conn: &mut redis::aio::ConnectionManager,
    job: &GradeJob,
) -> RedisResult<()> {
    let payload = serde_json::to_string(job).map_err(serialization_error)?;
    conn.rpush(QUEUE_KEY, payload).await
}

/// A queue entry taken by the worker
#[derive(Debug)]
pub enum PoppedJob {
    Job(GradeJob),
    /// Payload that does not decode as a job; `id` is recovered when present
    Malformed {
        id: Option<uuid::Uuid>,
        error: String,
    },
}

pub fn decode_job(payload: &str) -> PoppedJob {
    match serde_json::from_str::<GradeJob>(payload) {
        Ok(job) => PoppedJob::Job(job),
        Err(e) => {
            let id = serde_json::from_str::<serde_json::Value>(payload)
                .ok()
                .and_then(|value| value.get("id")?.as_str()?.parse().ok());
            PoppedJob::Malformed {
                id,
                error: e.to_string(),
            }
        }
    }
}

/// Pop the next grading job.
/// BLPOP with a timeout so the worker can notice shutdown.
pub async fn pop_job(
    conn: &mut redis::aio::ConnectionManager,
    timeout_seconds: f64,
) -> RedisResult<Option<PoppedJob>> {
    let result: Option<(String, String)> = conn.blpop(QUEUE_KEY, timeout_seconds).await?;
    Ok(result.map(|(_key, payload)| decode_job(&payload)))
}

pub async fn set_status(
    conn: &mut redis::aio::ConnectionManager,
    job_id: &uuid::Uuid,
    status: JobStatus,
) -> RedisResult<()> {
    let status_str = serde_json::to_string(&status).map_err(serialization_error)?;
    conn.set_ex(status_key(job_id), status_str, RESULT_TTL_SECONDS).await
}

pub async fn get_status(
    conn: &mut redis::aio::ConnectionManager,
    job_id: &uuid::Uuid,
) -> RedisResult<Option<JobStatus>> {
    let payload: Option<String> = conn.get(status_key(job_id)).await?;
    match payload {
        Some(data) => Ok(Some(serde_json::from_str(&data).map_err(serialization_error)?)),
        None => Ok(None),
    }
}

/// Store a finished evaluation together with its terminal status
pub async fn store_result(
    conn: &mut redis::aio::ConnectionManager,
    evaluation: &Evaluation,
) -> RedisResult<()> {
    let payload = serde_json::to_string(evaluation).map_err(serialization_error)?;
    let _: () = conn
        .set_ex(result_key(&evaluation.id), payload, RESULT_TTL_SECONDS)
        .await?;

    set_status(conn, &evaluation.id, JobStatus::from(evaluation.status)).await
}

pub async fn get_result(
    conn: &mut redis::aio::ConnectionManager,
    job_id: &uuid::Uuid,
) -> RedisResult<Option<Evaluation>> {
    let payload: Option<String> = conn.get(result_key(job_id)).await?;

    match payload {
        Some(data) => {
            let evaluation: Evaluation = serde_json::from_str(&data).map_err(serialization_error)?;
            Ok(Some(evaluation))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_result_key_deterministic() {
        let id = Uuid::new_v4();
        let key1 = result_key(&id);
        let key2 = result_key(&id);
        assert_eq!(key1, key2);
        assert!(key1.starts_with("autograder:result:"));
    }

    #[test]
    fn test_status_key_format() {
        let id = Uuid::new_v4();
        let key = status_key(&id);
        assert!(key.starts_with("autograder:status:"));
        assert!(key.contains(&id.to_string()));
    }

    #[test]
    fn test_decode_malformed_job_keeps_id() {
        let id = Uuid::new_v4();
        let payload = format!(r#"{{"id": "{}", "title": 7}}"#, id);
        match decode_job(&payload) {
            PoppedJob::Malformed { id: recovered, .. } => assert_eq!(recovered, Some(id)),
            other => panic!("expected malformed job, got {:?}", other),
        }

        assert!(matches!(
            decode_job("not json"),
            PoppedJob::Malformed { id: None, .. }
        ));
    }

    #[test]
    fn test_status_serialization_is_stable() {
        assert_eq!(serde_json::to_string(&JobStatus::CompileFailed).unwrap(), "\"compile_failed\"");
        assert_eq!(serde_json::to_string(&JobStatus::Queued).unwrap(), "\"queued\"");
    }
}
