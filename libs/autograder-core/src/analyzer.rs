// Static analysis (cppcheck) over the submission source file
use crate::runner::{self, Executable, RunLimits};
use autograder_common::config::GraderConfig;
use autograder_common::types::StaticAnalysisReport;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Run the configured analyzer; a missing or hung tool degrades to an empty report
#[tracing::instrument(skip(config), fields(analyzer = %config.analyzer.command))]
pub async fn analyze(config: &GraderConfig, source_path: &Path) -> StaticAnalysisReport {
    let mut args = config.analyzer.args.clone();
    args.push(source_path.display().to_string());

    let analyzer = Executable::new(&config.analyzer.command).with_args(args);
    let limits = RunLimits {
        timeout: Duration::from_secs(config.analyzer.timeout_secs),
        max_output_bytes: config.execution.max_output_bytes,
    };

    match runner::run(&analyzer, None, source_path.parent(), &limits).await {
        Ok(output) if output.timed_out => {
            warn!(timeout_secs = config.analyzer.timeout_secs, "Static analysis timed out");
            StaticAnalysisReport {
                available: false,
                warnings: Vec::new(),
                note: Some("Static analysis timed out; no warnings recorded.".to_string()),
            }
        }
        Ok(output) => {
            // cppcheck reports findings on stderr
            let warnings = parse_warnings(&output.stderr, &output.stdout);
            info!(warnings = warnings.len(), "Static analysis completed");
            StaticAnalysisReport {
                available: true,
                warnings,
                note: None,
            }
        }
        Err(e) => {
            warn!(error = %e, "Static analyzer unavailable");
            StaticAnalysisReport {
                available: false,
                warnings: Vec::new(),
                note: Some(format!(
                    "{} is not available on this host; static analysis skipped.",
                    config.analyzer.command
                )),
            }
        }
    }
}

/// Non-empty analyzer lines, minus the notes the runner itself appends
fn parse_warnings(stderr: &str, stdout: &str) -> Vec<String> {
    stderr
        .lines()
        .chain(stdout.lines())
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !is_runner_note(line.trim_start()))
        .map(str::to_string)
        .collect()
}

fn is_runner_note(line: &str) -> bool {
    line == runner::TRUNCATION_MARKER || line.starts_with(runner::SIGNAL_MARKER_PREFIX)
}
