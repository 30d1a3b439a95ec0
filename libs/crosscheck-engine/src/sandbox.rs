/// Process Sandbox - one bounded process invocation
///
/// **Guarantees:**
/// - Every invocation runs inside a `Workspace`, a uniquely named directory removed
///   on drop (normal return, error, timeout or panic)
/// - stdin is fed from the given string, or is an empty stream when absent
/// - The wall-clock timeout is hard: on expiry the whole process group is killed and
///   the result is returned with `timed_out = true` and the partial output
/// - stdout and stderr are captured separately and trimmed; stdout that is not valid
///   UTF-8 is reported on stderr instead of being compared lossily
///
/// Isolation stops there: no namespaces, no resource limits beyond time.

use crosscheck_common::types::ExecutionResult;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// Cap on each captured stream. Past it the read end is closed, so a process that keeps
/// writing gets EPIPE or SIGPIPE; the bytes read up to the cap are kept.
pub const MAX_CAPTURED_OUTPUT_BYTES: u64 = 16 * 1024 * 1024;

/// Appended to stderr when stdout cannot be decoded
pub const INVALID_UTF8_NOTE: &str = "[stdout is not valid UTF-8]";

/// How long to wait for pipes to drain once the process is gone
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Program plus arguments, spawned directly without a shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Run-scoped scratch directory, removed recursively when dropped
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    pub fn create(root: &Path) -> io::Result<Self> {
        let path = root.join(format!("crosscheck-{}", Uuid::new_v4()));
        fs::create_dir_all(&path).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("Failed to create workspace {}: {}", path.display(), e),
            )
        })?;
        // Absolute, so artifacts stay reachable from a process running elsewhere
        let path = match fs::canonicalize(&path) {
            Ok(absolute) => absolute,
            Err(e) => {
                let _ = fs::remove_dir_all(&path);
                return Err(e);
            }
        };
        debug!(workspace = %path.display(), "Workspace created");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `content` to `name` inside the workspace and return the full path
    pub fn write_file(&self, name: &str, content: &str) -> io::Result<PathBuf> {
        let file = self.path.join(name);
        fs::write(&file, content).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("Failed to write {}: {}", file.display(), e),
            )
        })?;
        Ok(file)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(workspace = %self.path.display(), "Workspace removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                workspace = %self.path.display(),
                error = %e,
                "Failed to remove workspace"
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    workspace_root: PathBuf,
    default_timeout: Duration,
}

impl Default for ProcessSandbox {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl ProcessSandbox {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            default_timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn open_workspace(&self) -> io::Result<Workspace> {
        Workspace::create(&self.workspace_root)
    }

    /// Run `command` in `working_dir` with `stdin`, bounded by `timeout`.
    ///
    /// Only a failure to start the process is an error. Non-zero exits and timeouts
    /// are part of the returned result. A process killed by a signal has no exit code;
    /// the signal number is reported on its own.
    pub async fn execute(
        &self,
        command: &CommandSpec,
        working_dir: &Path,
        stdin: Option<&str>,
        timeout: Duration,
    ) -> io::Result<ExecutionResult> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(working_dir)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        debug!(command = %command, timeout_ms = timeout.as_millis() as u64, "Spawning process");

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            io::Error::new(e.kind(), format!("Failed to spawn '{}': {}", command.program, e))
        })?;
        let pgid = child.id();

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            let data = input.as_bytes().to_vec();
            tokio::spawn(async move {
                // The process may exit without reading everything.
                if let Err(e) = pipe.write_all(&data).await {
                    debug!(error = %e, "stdin closed early");
                }
            });
        }

        let mut stdout_task = tokio::spawn(capture(child.stdout.take()));
        let mut stderr_task = tokio::spawn(capture(child.stderr.take()));

        let waited = tokio::time::timeout(timeout, child.wait()).await;
        let (exit_code, signal, timed_out) = match waited {
            Ok(status) => {
                let (code, signal) = exit_status_parts(status?);
                (code, signal, false)
            }
            Err(_) => {
                warn!(
                    command = %command,
                    timeout_ms = timeout.as_millis() as u64,
                    "Execution timed out, killing process group"
                );
                kill_process_tree(pgid, &mut child).await;
                (None, None, true)
            }
        };

        let mut stdout = drain(&mut stdout_task).await;
        let mut stderr = drain(&mut stderr_task).await;
        if stdout.is_none() || stderr.is_none() {
            // Something left in the group still holds a pipe open.
            kill_process_tree(pgid, &mut child).await;
            if stdout.is_none() {
                stdout = drain(&mut stdout_task).await;
            }
            if stderr.is_none() {
                stderr = drain(&mut stderr_task).await;
            }
            stdout_task.abort();
            stderr_task.abort();
        }

        let (stdout, stdout_is_utf8) = decode(stdout.unwrap_or_default());
        let (mut stderr, _) = decode(stderr.unwrap_or_default());
        if !stdout_is_utf8 {
            if !stderr.is_empty() {
                stderr.push('\n');
            }
            stderr.push_str(INVALID_UTF8_NOTE);
        }

        Ok(ExecutionResult {
            stdout,
            stderr,
            timed_out,
            exit_code,
            signal,
            compile_failed: false,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

async fn capture<R: AsyncRead + Unpin>(stream: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(stream) = stream {
        if let Err(e) = stream
            .take(MAX_CAPTURED_OUTPUT_BYTES)
            .read_to_end(&mut buf)
            .await
        {
            debug!(error = %e, "Output stream closed with error");
        }
    }
    buf
}

async fn drain(task: &mut JoinHandle<Vec<u8>>) -> Option<Vec<u8>> {
    match tokio::time::timeout(DRAIN_GRACE, task).await {
        Ok(Ok(buf)) => Some(buf),
        Ok(Err(e)) => {
            warn!(error = %e, "Output capture task failed");
            Some(Vec::new())
        }
        Err(_) => None,
    }
}

/// Trimmed text plus whether the bytes were valid UTF-8
fn decode(raw: Vec<u8>) -> (String, bool) {
    match String::from_utf8(raw) {
        Ok(text) => (text.trim().to_string(), true),
        Err(e) => (String::from_utf8_lossy(e.as_bytes()).trim().to_string(), false),
    }
}

/// (exit code, terminating signal)
fn exit_status_parts(status: std::process::ExitStatus) -> (Option<i32>, Option<i32>) {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return (None, Some(signal));
        }
    }
    (status.code(), None)
}

/// Kill the process group led by `pgid`, then the child itself
async fn kill_process_tree(pgid: Option<u32>, child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pgid) = pgid {
            // SAFETY: kill(2) with a negative pid only signals the group we created.
            let rc = unsafe { libc::kill(-(pgid as libc::pid_t), libc::SIGKILL) };
            if rc != 0 {
                debug!(pgid, error = %io::Error::last_os_error(), "Process group already gone");
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;

    if let Err(e) = child.start_kill() {
        debug!(error = %e, "Child already exited");
    }
    let _ = child.wait().await;
}
