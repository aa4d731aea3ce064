/// Process Runner - Bounded Execution of External Programs
///
/// **Core Responsibility:**
/// Spawn a program, feed it stdin, capture raw stdout/stderr and timing.
///
/// **Critical Properties:**
/// - Knows nothing about scoring or expected outputs
/// - Every run is bounded by a hard timeout; the child is killed on expiry
/// - Captured output is capped at a byte budget while the child runs
/// - Returns raw outputs for the evaluator and heuristics to judge

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

/// A runnable program: the compiled submission, or any command in tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Executable {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// Raw outcome of a single bounded run
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
    pub timed_out: bool,
    /// Non-zero exit or killed by a signal (never set on timeout)
    pub runtime_error: bool,
}

impl ProcessOutput {
    pub fn execution_time_ms(&self) -> u64 {
        self.elapsed.as_millis().min(u64::MAX as u128) as u64
    }

    pub fn success(&self) -> bool {
        !self.timed_out && !self.runtime_error
    }
}

/// Options for one bounded run
#[derive(Debug, Clone)]
pub struct RunLimits {
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

/// Run a program with optional stdin under a hard timeout.
///
/// Spawn failures (program missing, permission denied) are returned as `Err`
/// so call sites can choose their own fallback. Everything after a successful
/// spawn is reported through `ProcessOutput`.
pub async fn run(
    executable: &Executable,
    stdin_data: Option<&str>,
    cwd: Option<&Path>,
    limits: &RunLimits,
) -> std::io::Result<ProcessOutput> {
    let mut command = Command::new(&executable.program);
    command
        .args(&executable.args)
        .stdin(if stdin_data.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let start = Instant::now();
    let mut child = command.spawn()?;

    let stdin_handle = child.stdin.take();
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let input = stdin_data.map(|s| s.as_bytes().to_vec());
    let budget = limits.max_output_bytes;

    let write_input = async move {
        if let (Some(mut handle), Some(bytes)) = (stdin_handle, input) {
            // Programs that exit without reading stdin close the pipe early
            if let Err(e) = handle.write_all(&bytes).await {
                debug!(error = %e, "stdin write interrupted");
            }
        }
    };

    let execution = async move {
        let (_, stdout, stderr, status) = tokio::join!(
            write_input,
            capture(stdout_handle, budget),
            capture(stderr_handle, budget),
            child.wait(),
        );
        Ok::<_, std::io::Error>((status?, stdout?, stderr?))
    };

    // Dropping the future on timeout drops the child, which kills it
    match tokio::time::timeout(limits.timeout, execution).await {
        Ok(Ok((status, stdout, stderr))) => {
            let elapsed = start.elapsed();
            let mut stderr = stderr.into_text();
            if let Some(note) = describe_signal(&status) {
                stderr.push_str(&note);
            }

            Ok(ProcessOutput {
                stdout: stdout.into_text(),
                stderr,
                exit_code: status.code(),
                elapsed,
                timed_out: false,
                runtime_error: !status.success(),
            })
        }
        Ok(Err(e)) => Err(e),
        Err(_) => {
            debug!(
                program = %executable.program.display(),
                timeout_ms = limits.timeout.as_millis() as u64,
                "process timed out and was killed"
            );
            Ok(ProcessOutput {
                stdout: String::new(),
                stderr: String::from("[Execution timed out]"),
                exit_code: None,
                elapsed: start.elapsed(),
                timed_out: true,
                runtime_error: false,
            })
        }
    }
}

/// Marker appended when a stream exceeded its byte budget
pub const TRUNCATION_MARKER: &str = "[output truncated]";

/// Prefix of the note appended to stderr when a signal ends the process
pub const SIGNAL_MARKER_PREFIX: &str = "[Process killed";

/// Bytes kept from one output stream
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

impl Captured {
    /// Lossy UTF-8 decode; a char cut by the budget is dropped
    fn into_text(self) -> String {
        let mut end = self.bytes.len();
        if self.truncated {
            if let Err(e) = std::str::from_utf8(&self.bytes) {
                if e.error_len().is_none() {
                    end = e.valid_up_to();
                }
            }
        }
        let mut text = String::from_utf8_lossy(&self.bytes[..end]).into_owned();
        if self.truncated {
            text.push('\n');
            text.push_str(TRUNCATION_MARKER);
        }
        text
    }
}

/// Keep at most `budget` bytes and discard the rest of the stream.
/// The pipe keeps draining so the child never blocks on a full buffer.
async fn capture<R>(reader: Option<R>, budget: usize) -> std::io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(Captured::default());
    };

    let mut bytes = Vec::with_capacity(budget.min(8192));
    (&mut reader).take(budget as u64).read_to_end(&mut bytes).await?;
    let discarded = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;

    Ok(Captured {
        bytes,
        truncated: discarded > 0,
    })
}

#[cfg(unix)]
fn describe_signal(status: &ExitStatus) -> Option<String> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|signal| match signal {
        11 => "\n[Process killed: segmentation fault]".to_string(),
        8 => "\n[Process killed: floating point exception]".to_string(),
        6 => "\n[Process killed: aborted]".to_string(),
        9 => "\n[Process killed: SIGKILL]".to_string(),
        other => format!("\n[Process killed by signal {}]", other),
    })
}

#[cfg(not(unix))]
fn describe_signal(_status: &ExitStatus) -> Option<String> {
    None
}
