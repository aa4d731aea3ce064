//! C compilation into a per-request scratch workspace.
//!
//! The workspace owns the temporary directory holding the source file and the
//! produced binary. It is removed when the workspace is closed or dropped, so
//! every exit path of a grading request cleans up after itself.

use crate::error::{GraderError, GraderResult};
use crate::runner::{self, Executable, RunLimits};
use autograder_common::config::{GraderConfig, ToolConfig};
use autograder_common::types::CompileSummary;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{info, warn};

const SOURCE_FILE: &str = "submission.c";
const BINARY_FILE: &str = "submission_bin";
const TOOLCHAIN_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Temporary directory scoped to one grading request
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create() -> GraderResult<Self> {
        let dir = tempfile::Builder::new().prefix("autograde_").tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_path(&self) -> PathBuf {
        self.dir.path().join(SOURCE_FILE)
    }

    pub fn binary_path(&self) -> PathBuf {
        self.dir.path().join(BINARY_FILE)
    }

    pub fn write_source(&self, source: &str) -> GraderResult<PathBuf> {
        let path = self.source_path();
        fs::write(&path, source)?;
        Ok(path)
    }

    /// Remove the directory now; failures are logged, never fatal
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(path = %path.display(), error = %e, "Failed to remove grading workspace");
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub summary: CompileSummary,
    /// Present only when the compiler exited 0 and the binary exists
    pub executable: Option<Executable>,
}

/// Write the source into the workspace and compile it
#[tracing::instrument(skip(config, workspace, source), fields(source_size = source.len()))]
pub async fn compile(
    config: &GraderConfig,
    workspace: &Workspace,
    source: &str,
) -> GraderResult<CompileOutcome> {
    let source_path = workspace.write_source(source)?;
    let binary_path = workspace.binary_path();

    let mut args = vec![
        source_path.display().to_string(),
        "-o".to_string(),
        binary_path.display().to_string(),
    ];
    args.extend(config.compiler.args.iter().cloned());

    let compiler = Executable::new(&config.compiler.command).with_args(args);
    let limits = RunLimits {
        timeout: Duration::from_secs(config.compiler.timeout_secs),
        max_output_bytes: config.execution.max_output_bytes,
    };

    let output = match runner::run(&compiler, None, Some(workspace.path()), &limits).await {
        Ok(output) => output,
        Err(e) => {
            warn!(compiler = %config.compiler.command, error = %e, "Failed to launch compiler");
            return Ok(CompileOutcome {
                summary: CompileSummary {
                    success: false,
                    exit_code: None,
                    stdout: String::new(),
                    stderr: format!("Failed to run compiler '{}': {}", config.compiler.command, e),
                    timed_out: false,
                },
                executable: None,
            });
        }
    };

    if output.timed_out {
        warn!(timeout_secs = config.compiler.timeout_secs, "Compilation timed out");
        return Ok(CompileOutcome {
            summary: CompileSummary {
                success: false,
                exit_code: None,
                stdout: String::new(),
                stderr: "Compilation timed out".to_string(),
                timed_out: true,
            },
            executable: None,
        });
    }

    // A zero exit without a binary still counts as a failure
    let success = output.exit_code == Some(0) && binary_path.exists();

    info!(
        success,
        exit_code = ?output.exit_code,
        elapsed_ms = output.execution_time_ms(),
        "Compilation finished"
    );

    Ok(CompileOutcome {
        summary: CompileSummary {
            success,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            timed_out: false,
        },
        executable: success.then(|| Executable::new(binary_path)),
    })
}

/// Startup check: the configured compiler must be runnable on this host
pub async fn ensure_toolchain(tool: &ToolConfig) -> GraderResult<String> {
    let version_check = Executable::new(&tool.command).with_args(["--version"]);
    let limits = RunLimits {
        timeout: TOOLCHAIN_CHECK_TIMEOUT,
        max_output_bytes: 4096,
    };

    let output = runner::run(&version_check, None, None, &limits)
        .await
        .map_err(|e| GraderError::ToolchainUnavailable(format!("{}: {}", tool.command, e)))?;

    if !output.success() {
        return Err(GraderError::ToolchainUnavailable(format!(
            "{} --version did not succeed",
            tool.command
        )));
    }

    Ok(output.stdout.lines().next().unwrap_or_default().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_removed_on_close() {
        let workspace = Workspace::create().unwrap();
        let path = workspace.path().to_path_buf();
        workspace.write_source("int main(void) { return 0; }").unwrap();
        assert!(path.join(SOURCE_FILE).exists());

        workspace.close();
        assert!(!path.exists());
    }

    #[test]
    fn test_workspace_removed_on_drop() {
        let path = {
            let workspace = Workspace::create().unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_missing_compiler_is_failed_compile() {
        let mut config = GraderConfig::default();
        config.compiler.command = "/nonexistent/cc".to_string();
        let workspace = Workspace::create().unwrap();

        let outcome = compile(&config, &workspace, "int main(void) { return 0; }").await.unwrap();

        assert!(!outcome.summary.success);
        assert!(outcome.executable.is_none());
        assert!(outcome.summary.stderr.contains("Failed to run compiler"));
    }

    #[tokio::test]
    async fn test_ensure_toolchain_missing() {
        let tool = ToolConfig {
            command: "/nonexistent/cc".to_string(),
            args: vec![],
            timeout_secs: 1,
        };
        let result = ensure_toolchain(&tool).await;
        assert!(matches!(result, Err(GraderError::ToolchainUnavailable(_))));
    }

    #[tokio::test]
    #[ignore] // Requires gcc
    async fn test_compile_success_and_failure() {
        let config = GraderConfig::default();

        let workspace = Workspace::create().unwrap();
        let ok = compile(&config, &workspace, "#include <stdio.h>\nint main(void) { puts(\"hi\"); return 0; }\n")
            .await
            .unwrap();
        assert!(ok.summary.success);
        assert!(ok.executable.is_some());

        let broken_workspace = Workspace::create().unwrap();
        let broken = compile(&config, &broken_workspace, "int main(void) { return 0 }\n")
            .await
            .unwrap();
        assert!(!broken.summary.success);
        assert!(broken.executable.is_none());
        assert!(!broken.summary.stderr.is_empty());
    }
}
