/// Execution pipeline - materialize, compile, run, clean up
///
/// **Responsibility:**
/// Turn a `CodeSubmission` plus an input into an `ExecutionResult`, whatever the
/// language. Submissions under comparison and delegated generator programs both go
/// through here.
///
/// **Phases:**
/// 1. Validate (no process): size limits, Java class name
/// 2. Materialize into a fresh `Workspace`
/// 3. Compile, if the language has a compile phase. A failure here stops the
///    pipeline and is reported with the compiler marker, never as a runtime error
/// 4. Run with the input as stdin under the sandbox timeout
/// 5. Every run gets a scratch workspace of its own as working directory, so nothing a
///    run writes is visible to the next one. The compiled artifacts live in a separate
///    workspace, released when the prepared program is dropped

use crate::config::LanguageConfigManager;
use crate::runner::{LanguageRunner, RunnerRegistry};
use crate::sandbox::{CommandSpec, ProcessSandbox, Workspace};
use async_trait::async_trait;
use crosscheck_common::config::Config;
use crosscheck_common::error::HarnessError;
use crosscheck_common::types::{CodeSubmission, ExecutionResult, Language};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can be executed against one input
#[async_trait]
pub trait Runnable: Send {
    async fn run(&mut self, stdin: Option<&str>) -> Result<ExecutionResult, HarnessError>;
}

#[derive(Debug)]
pub struct SourceExecutor {
    sandbox: ProcessSandbox,
    registry: RunnerRegistry,
    compile_timeout: Duration,
}

impl SourceExecutor {
    pub fn new(sandbox: ProcessSandbox, registry: RunnerRegistry) -> Self {
        Self {
            sandbox,
            registry,
            compile_timeout: DEFAULT_COMPILE_TIMEOUT,
        }
    }

    pub fn from_config(config: &Config, languages: &LanguageConfigManager) -> Self {
        let sandbox = ProcessSandbox::new(&config.workspace_root).with_timeout(config.timeout());
        Self::new(sandbox, RunnerRegistry::from_config(languages))
            .with_compile_timeout(config.compile_timeout())
    }

    pub fn with_compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout = timeout;
        self
    }

    pub fn sandbox(&self) -> &ProcessSandbox {
        &self.sandbox
    }

    fn runner(&self, language: Language) -> Result<&dyn LanguageRunner, HarnessError> {
        self.registry.runner(language)
    }

    /// Upfront checks that need no process
    pub fn validate(&self, submission: &CodeSubmission) -> Result<(), HarnessError> {
        self.runner(submission.language)?.validate(&submission.source)
    }

    /// Materialize and compile a submission, keeping its workspace alive
    pub async fn prepare(&self, submission: &CodeSubmission) -> Result<PreparedProgram, HarnessError> {
        let runner = self.runner(submission.language)?;
        runner.validate(&submission.source)?;

        let workspace = self.sandbox.open_workspace()?;
        let program = runner.materialize(&submission.source, &workspace)?;

        if let Some(compile) = runner.compile_command(&program) {
            let compiled = self
                .sandbox
                .execute(&compile, workspace.path(), None, self.compile_timeout)
                .await?;

            if compiled.timed_out || compiled.exit_code != Some(0) {
                let diagnostics = if !compiled.stderr.is_empty() {
                    compiled.stderr
                } else if !compiled.stdout.is_empty() {
                    compiled.stdout
                } else if compiled.timed_out {
                    format!(
                        "compilation timed out after {}ms",
                        self.compile_timeout.as_millis()
                    )
                } else {
                    describe_exit(compiled.exit_code, compiled.signal)
                };

                warn!(
                    language = %submission.language,
                    compile_ms = compiled.execution_time_ms,
                    error_preview = diagnostics.lines().next().unwrap_or(""),
                    "Compilation failed"
                );

                let mut failure = ExecutionResult::compile_failure(format!(
                    "{}\n{}",
                    runner.compile_error_marker(),
                    diagnostics
                ));
                failure.exit_code = compiled.exit_code;
                failure.signal = compiled.signal;
                failure.execution_time_ms = compiled.execution_time_ms;
                return Ok(PreparedProgram {
                    language: submission.language,
                    state: Prepared::CompileFailed(failure),
                });
            }

            debug!(
                language = %submission.language,
                compile_ms = compiled.execution_time_ms,
                "Compilation succeeded"
            );
        }

        Ok(PreparedProgram {
            language: submission.language,
            state: Prepared::Ready {
                command: runner.run_command(&program),
                artifacts: workspace,
                sandbox: self.sandbox.clone(),
            },
        })
    }

    /// Full pipeline in a workspace of its own
    pub async fn run(
        &self,
        submission: &CodeSubmission,
        stdin: Option<&str>,
    ) -> Result<ExecutionResult, HarnessError> {
        self.prepare(submission).await?.execute(stdin).await
    }
}

#[derive(Debug)]
enum Prepared {
    Ready {
        artifacts: Workspace,
        command: CommandSpec,
        sandbox: ProcessSandbox,
    },
    CompileFailed(ExecutionResult),
}

/// A submission that went through materialize and compile
#[derive(Debug)]
pub struct PreparedProgram {
    language: Language,
    state: Prepared,
}

impl PreparedProgram {
    pub fn language(&self) -> Language {
        self.language
    }

    pub fn compile_failed(&self) -> bool {
        matches!(self.state, Prepared::CompileFailed(_))
    }

    /// Run the prepared artifact from a fresh scratch workspace. A failed compile yields
    /// its failure every time.
    pub async fn execute(&self, stdin: Option<&str>) -> Result<ExecutionResult, HarnessError> {
        match &self.state {
            Prepared::CompileFailed(failure) => Ok(failure.clone()),
            Prepared::Ready {
                artifacts,
                command,
                sandbox,
            } => {
                let scratch = sandbox.open_workspace()?;
                debug!(
                    artifacts = %artifacts.path().display(),
                    scratch = %scratch.path().display(),
                    "Running prepared program"
                );
                let mut result = sandbox
                    .execute(command, scratch.path(), stdin, sandbox.default_timeout())
                    .await?;
                annotate_abnormal_exit(&mut result);
                if result.is_failure() {
                    warn!(
                        language = %self.language,
                        timed_out = result.timed_out,
                        exit_code = ?result.exit_code,
                        signal = ?result.signal,
                        execution_ms = result.execution_time_ms,
                        "Execution failed"
                    );
                }
                Ok(result)
            }
        }
    }
}

#[async_trait]
impl Runnable for PreparedProgram {
    async fn run(&mut self, stdin: Option<&str>) -> Result<ExecutionResult, HarnessError> {
        self.execute(stdin).await
    }
}

/// Rebuilt from source on every call, so each run gets its own workspace
#[derive(Debug, Clone)]
pub struct FreshProgram {
    executor: Arc<SourceExecutor>,
    submission: CodeSubmission,
}

impl FreshProgram {
    pub fn new(executor: Arc<SourceExecutor>, submission: CodeSubmission) -> Self {
        Self {
            executor,
            submission,
        }
    }
}

#[async_trait]
impl Runnable for FreshProgram {
    async fn run(&mut self, stdin: Option<&str>) -> Result<ExecutionResult, HarnessError> {
        self.executor.run(&self.submission, stdin).await
    }
}

/// Make sure a crash is visible on stderr even when the program printed nothing there
fn annotate_abnormal_exit(result: &mut ExecutionResult) {
    let clean_exit = result.exit_code == Some(0) && result.signal.is_none();
    if result.timed_out || !result.stderr.is_empty() || clean_exit {
        return;
    }
    result.stderr = describe_exit(result.exit_code, result.signal);
}

fn describe_exit(exit_code: Option<i32>, signal: Option<i32>) -> String {
    match (signal, exit_code) {
        (Some(6), _) => "[terminated by signal 6: aborted]".to_string(),
        (Some(8), _) => "[terminated by signal 8: floating point exception]".to_string(),
        (Some(9), _) => "[terminated by signal 9: killed, likely out of memory]".to_string(),
        (Some(11), _) => "[terminated by signal 11: segmentation fault]".to_string(),
        (Some(n), _) => format!("[terminated by signal {}]", n),
        (None, Some(code)) => format!("[exited with status {}]", code),
        (None, None) => "[exited abnormally]".to_string(),
    }
}
