// Outcome to response mapping
use crosscheck_common::types::{
    ComparisonOutcome, Divergence, DivergedResponse, ExecutionResult, MatchedResponse,
    RunResponse,
};

pub const TIMEOUT_MESSAGE: &str = "Execution timed out";

/// Error text shown for one side of a divergence.
///
/// A timeout always leads with the timeout message so "too slow" reads differently
/// from a crash, with any partial stderr after it.
pub fn error_text(result: &ExecutionResult) -> String {
    if result.timed_out {
        if result.stderr.is_empty() {
            TIMEOUT_MESSAGE.to_string()
        } else {
            format!("{}\n{}", TIMEOUT_MESSAGE, result.stderr)
        }
    } else {
        result.stderr.clone()
    }
}

pub fn matched_message(count: u32) -> String {
    format!("All {} test cases matched!", count)
}

fn diverged(divergence: &Divergence) -> DivergedResponse {
    DivergedResponse {
        matched: false,
        test_number: divergence.index,
        test_input: divergence.input.clone(),
        slow_output: divergence.slow.stdout.clone(),
        fast_output: divergence.fast.stdout.clone(),
        slow_error: error_text(&divergence.slow),
        fast_error: error_text(&divergence.fast),
        slow_timed_out: divergence.slow.timed_out,
        fast_timed_out: divergence.fast.timed_out,
        reason: divergence.reason,
    }
}

pub fn report(outcome: &ComparisonOutcome) -> RunResponse {
    match outcome {
        ComparisonOutcome::AllMatched { count } => RunResponse::Matched(MatchedResponse {
            matched: true,
            message: matched_message(*count),
        }),
        ComparisonOutcome::Diverged(divergence) => RunResponse::Diverged(diverged(divergence)),
    }
}
