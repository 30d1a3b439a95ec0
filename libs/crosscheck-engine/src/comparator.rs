/// Differential Comparator - the short-circuiting comparison loop
///
/// **State machine:** `Running` → `Diverged` | `Completed`, both terminal.
///
/// **Per iteration `i` (1-based):**
/// 1. Draw one input from the generator
/// 2. Run slow, then fast, on that input (strictly sequential)
/// 3. Any execution failure on either side → `Diverged`, even if both sides failed
///    the same way: neither result can be trusted
/// 4. Otherwise differing normalized stdout → `Diverged`
/// 5. Otherwise continue
///
/// No retries. The first divergence ends the run, so the reported index is always
/// the lowest one at which the submissions disagree.
///
/// **Normalization:** leading/trailing whitespace is trimmed; everything else,
/// including case and inner whitespace, must match exactly.

use crate::generator::InputGenerator;
use crate::pipeline::Runnable;
use crosscheck_common::config::DEFAULT_ITERATIONS;
use crosscheck_common::error::HarnessError;
use crosscheck_common::types::{
    ComparisonOutcome, Divergence, DivergenceReason, ExecutionResult, TestCase,
};
use tracing::{debug, info, instrument};

#[derive(Debug)]
enum ComparisonState {
    Running { next: u32 },
    Diverged(Divergence),
    Completed { count: u32 },
}

fn normalize_output(output: &str) -> &str {
    output.trim()
}

/// Decide whether one pair of results agrees
pub fn judge(slow: &ExecutionResult, fast: &ExecutionResult) -> Option<DivergenceReason> {
    if slow.is_failure() || fast.is_failure() {
        Some(DivergenceReason::ExecutionError)
    } else if normalize_output(&slow.stdout) != normalize_output(&fast.stdout) {
        Some(DivergenceReason::OutputMismatch)
    } else {
        None
    }
}

/// Run one side. A configuration problem found only now counts against that side.
async fn run_side(program: &mut dyn Runnable, input: &str) -> Result<ExecutionResult, HarnessError> {
    match program.run(Some(input)).await {
        Err(HarnessError::Configuration(message)) => Ok(ExecutionResult {
            stderr: message,
            ..Default::default()
        }),
        other => other,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DifferentialComparator {
    iterations: u32,
}

impl Default for DifferentialComparator {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl DifferentialComparator {
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    #[instrument(skip_all, fields(iterations = self.iterations, generator = %generator.describe()))]
    pub async fn compare(
        &self,
        generator: &mut dyn InputGenerator,
        slow: &mut dyn Runnable,
        fast: &mut dyn Runnable,
    ) -> Result<ComparisonOutcome, HarnessError> {
        let mut state = ComparisonState::Running { next: 1 };

        loop {
            state = match state {
                ComparisonState::Running { next } if next > self.iterations => {
                    ComparisonState::Completed {
                        count: self.iterations,
                    }
                }
                ComparisonState::Running { next } => {
                    self.step(next, generator, slow, fast).await?
                }
                ComparisonState::Diverged(divergence) => {
                    info!(
                        test_number = divergence.index,
                        reason = ?divergence.reason,
                        slow_failure = ?divergence.slow.failure_kind(),
                        fast_failure = ?divergence.fast.failure_kind(),
                        "Submissions diverged"
                    );
                    return Ok(ComparisonOutcome::Diverged(divergence));
                }
                ComparisonState::Completed { count } => {
                    info!(count, "All test cases matched");
                    return Ok(ComparisonOutcome::AllMatched { count });
                }
            };
        }
    }

    async fn step(
        &self,
        index: u32,
        generator: &mut dyn InputGenerator,
        slow: &mut dyn Runnable,
        fast: &mut dyn Runnable,
    ) -> Result<ComparisonState, HarnessError> {
        let input = generator
            .next()
            .await
            .map_err(|e| HarnessError::Generation {
                test_number: index,
                message: e.0,
            })?;
        let case = TestCase { index, input };

        let slow_result = run_side(slow, &case.input).await?;
        let fast_result = run_side(fast, &case.input).await?;

        debug!(
            test_number = case.index,
            slow_ms = slow_result.execution_time_ms,
            fast_ms = fast_result.execution_time_ms,
            "Test case executed"
        );

        Ok(match judge(&slow_result, &fast_result) {
            None => ComparisonState::Running { next: index + 1 },
            Some(reason) => ComparisonState::Diverged(Divergence {
                index: case.index,
                input: case.input,
                slow: slow_result,
                fast: fast_result,
                reason,
            }),
        })
    }
}
