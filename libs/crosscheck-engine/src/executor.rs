/// Comparison Executor - High-Level Orchestration
///
/// **Responsibility:**
/// Turn a validated `ComparisonPlan` into a `ComparisonOutcome`.
///
/// **Architecture:**
/// 1. Validate all submissions upfront (no process spawned on a bad request)
/// 2. Build the two contestants and the input generator as `Runnable`s
/// 3. Hand them to the `DifferentialComparator`
///
/// This module is the glue layer - it knows nothing about:
/// - How code executes (pipeline's job)
/// - How outputs are judged (comparator's job)
/// - How outcomes are shaped for callers (reporter's job)
///
/// ## Compile-once mode
/// With `compile_once` set, each submission is materialized and compiled once and every
/// iteration runs the prepared artifacts from a fresh scratch workspace. Otherwise every
/// iteration starts from source. Either way no files carry over between iterations.

use crate::comparator::DifferentialComparator;
use crate::generator::{DelegatedGenerator, FixedSchemeGenerator, InputGenerator};
use crate::pipeline::{FreshProgram, Runnable, SourceExecutor};
use crosscheck_common::error::HarnessError;
use crosscheck_common::types::{CodeSubmission, ComparisonOutcome, ComparisonPlan, GeneratorSpec};
use std::sync::Arc;
use tracing::{error, info};

/// Build the runnable form of a submission for the selected execution mode
pub async fn contestant(
    executor: &Arc<SourceExecutor>,
    submission: CodeSubmission,
    compile_once: bool,
) -> Result<Box<dyn Runnable>, HarnessError> {
    if compile_once {
        Ok(Box::new(executor.prepare(&submission).await?))
    } else {
        Ok(Box::new(FreshProgram::new(Arc::clone(executor), submission)))
    }
}

/// Run the comparison with a caller-supplied generator
pub async fn compare_submissions(
    executor: Arc<SourceExecutor>,
    slow: CodeSubmission,
    fast: CodeSubmission,
    generator: &mut dyn InputGenerator,
    iterations: u32,
    compile_once: bool,
) -> Result<ComparisonOutcome, HarnessError> {
    executor.validate(&slow)?;
    executor.validate(&fast)?;

    info!(
        slow_lang = %slow.language,
        fast_lang = %fast.language,
        iterations,
        execution_mode = if compile_once { "compile_once" } else { "per_iteration" },
        "Starting comparison"
    );

    let mut slow = contestant(&executor, slow, compile_once).await?;
    let mut fast = contestant(&executor, fast, compile_once).await?;

    let outcome = DifferentialComparator::new(iterations)
        .compare(generator, slow.as_mut(), fast.as_mut())
        .await;

    if let Err(e) = &outcome {
        error!(error = %e, "Comparison aborted");
    }
    outcome
}

/// Execute a plan end to end
pub async fn execute_plan(
    executor: Arc<SourceExecutor>,
    plan: ComparisonPlan,
    iterations: u32,
    compile_once: bool,
) -> Result<ComparisonOutcome, HarnessError> {
    let mut generator: Box<dyn InputGenerator> = match plan.generator {
        GeneratorSpec::FixedScheme => Box::new(FixedSchemeGenerator::new()),
        GeneratorSpec::Delegated {
            program,
            input_spec,
        } => {
            executor.validate(&program)?;
            // Fail on a bad contestant before paying for the generator's compile
            executor.validate(&plan.slow)?;
            executor.validate(&plan.fast)?;
            let program = contestant(&executor, program, compile_once).await?;
            Box::new(DelegatedGenerator::new(program, input_spec))
        }
    };

    compare_submissions(
        executor,
        plan.slow,
        plan.fast,
        generator.as_mut(),
        iterations,
        compile_once,
    )
    .await
}
