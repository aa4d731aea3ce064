use anyhow::Context;
use autograder_common::config::GraderConfig;
use autograder_common::redis::{self, PoppedJob};
use autograder_common::types::{GradeJob, JobStatus};
use autograder_core::{ensure_toolchain, GradeRequest, ModelSet};
use std::future::Future;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

/// BLPOP timeout, so shutdown is noticed between jobs
const POP_TIMEOUT_SECS: f64 = 5.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Autograder Worker booting...");

    let config = GraderConfig::load_default().map_err(|e| {
        error!("Failed to load grader configuration: {:#}", e);
        error!("Make sure {} exists", GraderConfig::default_path().display());
        e
    })?;

    info!(
        profile = %config.profile,
        compiler = %config.compiler.command,
        analyzer = %config.analyzer.command,
        "Loaded grader configuration"
    );

    // A host without the compiler cannot grade anything
    let compiler_version = ensure_toolchain(&config.compiler)
        .await
        .context("Compiler check failed")?;
    info!("Compiler: {}", compiler_version);

    let models = ModelSet::from_config(&config.models).context("Failed to build model clients")?;
    if config.models.groq_api_key.is_none() {
        warn!("GROQ_API_KEY not set; test generation will use the fallback list");
    }
    if config.models.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY not set; judge and feedback will use fallbacks");
    }

    let redis_url = std::env::var("REDIS_URL")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

    let client = ::redis::Client::open(redis_url.as_str())?;
    let redis_conn = ::redis::aio::ConnectionManager::new(client).await?;

    info!("Connected to Redis: {}", redis_url);

    // The signal only flips a flag; a job already popped always finishes
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                warn!("Received shutdown signal, finishing current job...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    worker_loop(&redis_conn, &config, &models, shutdown_rx).await;

    info!("Worker shutdown complete");
    Ok(())
}

#[instrument(skip_all)]
async fn worker_loop(
    redis_conn: &::redis::aio::ConnectionManager,
    config: &GraderConfig,
    models: &ModelSet,
    shutdown: watch::Receiver<bool>,
) {
    run_until_shutdown(shutdown, move || {
        // ConnectionManager clones share one multiplexed connection
        let mut conn = redis_conn.clone();
        async move { poll_once(&mut conn, config, models).await }
    })
    .await;
}

/// Run `step` repeatedly until shutdown is requested.
/// The flag is read between steps, never during one.
async fn run_until_shutdown<F, Fut>(shutdown: watch::Receiver<bool>, mut step: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    while !*shutdown.borrow() {
        step().await;
    }
}

async fn poll_once(
    redis_conn: &mut ::redis::aio::ConnectionManager,
    config: &GraderConfig,
    models: &ModelSet,
) {
    match redis::pop_job(redis_conn, POP_TIMEOUT_SECS).await {
        Ok(Some(PoppedJob::Job(job))) => process_job(redis_conn, config, models, job).await,
        Ok(Some(PoppedJob::Malformed { id, error })) => {
            error!(job_id = ?id, error = %error, "Malformed job payload");
            if let Some(job_id) = id {
                if let Err(e) = redis::set_status(redis_conn, &job_id, JobStatus::Failed).await {
                    error!(job_id = %job_id, error = %e, "Failed to record job failure");
                }
            }
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "Redis error");
            tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
        }
    }
}

async fn process_job(
    redis_conn: &mut ::redis::aio::ConnectionManager,
    config: &GraderConfig,
    models: &ModelSet,
    job: GradeJob,
) {
    let job_id = job.id;
    info!(
        job_id = %job_id,
        title = %job.title,
        test_cases = job.test_cases.len(),
        source_size = job.source_code.len(),
        "Received job"
    );

    if let Err(e) = redis::set_status(redis_conn, &job_id, JobStatus::Running).await {
        warn!(job_id = %job_id, error = %e, "Failed to mark job running");
    }

    let start = std::time::Instant::now();
    let request = GradeRequest::from(&job);

    match autograder_core::grade(config, models, &request).await {
        Ok(evaluation) => {
            info!(
                job_id = %job_id,
                status = ?evaluation.status,
                score = ?evaluation.final_score,
                elapsed_ms = start.elapsed().as_millis(),
                "Grading completed"
            );

            match redis::store_result(redis_conn, &evaluation).await {
                Ok(_) => info!(job_id = %job_id, "Evaluation persisted to Redis"),
                // Non-fatal - worker continues
                Err(e) => error!(job_id = %job_id, error = %e, "Failed to persist evaluation"),
            }
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Grading failed");
            if let Err(e) = redis::set_status(redis_conn, &job_id, JobStatus::Failed).await {
                error!(job_id = %job_id, error = %e, "Failed to record job failure");
            }
        }
    }
}
