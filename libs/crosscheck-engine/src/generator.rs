//! Test input generation
//!
//! Every strategy is a lazy, non-restartable sequence: `next()` is called once per
//! iteration and values cannot be re-derived afterwards. The fixed scheme takes no
//! seed, so two runs never see the same inputs.

use crate::pipeline::Runnable;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use thiserror::Error;
use tracing::debug;

/// Safety limit on a single generated input
pub const MAX_TEST_INPUT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct GenerationFailure(pub String);

#[async_trait]
pub trait InputGenerator: Send {
    async fn next(&mut self) -> Result<String, GenerationFailure>;

    fn describe(&self) -> String;
}

/// One integer drawn uniformly from an inclusive range, on its own line
#[derive(Debug)]
pub struct FixedSchemeGenerator {
    range: RangeInclusive<i64>,
    rng: StdRng,
}

impl FixedSchemeGenerator {
    pub const DEFAULT_LOW: i64 = 1;
    pub const DEFAULT_HIGH: i64 = 99;

    pub fn new() -> Self {
        Self {
            range: Self::DEFAULT_LOW..=Self::DEFAULT_HIGH,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_range(low: i64, high: i64) -> Result<Self, GenerationFailure> {
        if low > high {
            return Err(GenerationFailure(format!(
                "Empty input range {}..={}",
                low, high
            )));
        }
        Ok(Self {
            range: low..=high,
            rng: StdRng::from_entropy(),
        })
    }
}

impl Default for FixedSchemeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InputGenerator for FixedSchemeGenerator {
    async fn next(&mut self) -> Result<String, GenerationFailure> {
        Ok(format!("{}\n", self.rng.gen_range(self.range.clone())))
    }

    fn describe(&self) -> String {
        format!("fixed scheme: one integer in {}..={}", self.range.start(), self.range.end())
    }
}

/// Yields the same input forever
#[derive(Debug, Clone)]
pub struct RepeatGenerator {
    input: String,
}

impl RepeatGenerator {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

#[async_trait]
impl InputGenerator for RepeatGenerator {
    async fn next(&mut self) -> Result<String, GenerationFailure> {
        Ok(self.input.clone())
    }

    fn describe(&self) -> String {
        "fixed input".to_string()
    }
}

/// Runs a generator program with empty stdin; its trimmed stdout is the input.
///
/// The program usually comes from an external author working off `input_spec`.
pub struct DelegatedGenerator {
    program: Box<dyn Runnable>,
    input_spec: Option<String>,
}

impl DelegatedGenerator {
    pub fn new(program: Box<dyn Runnable>, input_spec: Option<String>) -> Self {
        Self {
            program,
            input_spec,
        }
    }

    pub fn input_spec(&self) -> Option<&str> {
        self.input_spec.as_deref()
    }
}

#[async_trait]
impl InputGenerator for DelegatedGenerator {
    async fn next(&mut self) -> Result<String, GenerationFailure> {
        let result = self
            .program
            .run(None)
            .await
            .map_err(|e| GenerationFailure(format!("Generator program could not run: {}", e)))?;

        if result.compile_failed {
            return Err(GenerationFailure(format!(
                "Generator program failed to compile: {}",
                result.stderr
            )));
        }
        if result.timed_out {
            return Err(GenerationFailure(format!(
                "Generator program timed out after {}ms",
                result.execution_time_ms
            )));
        }
        if !result.stderr.is_empty() {
            return Err(GenerationFailure(format!(
                "Generator program failed: {}",
                result.stderr
            )));
        }
        if result.stdout.len() > MAX_TEST_INPUT_BYTES {
            return Err(GenerationFailure(format!(
                "Generated input exceeds maximum size of {} bytes",
                MAX_TEST_INPUT_BYTES
            )));
        }

        debug!(bytes = result.stdout.len(), "Generated test input");
        Ok(result.stdout)
    }

    fn describe(&self) -> String {
        match &self.input_spec {
            Some(spec) => format!("generator program for: {}", spec),
            None => "generator program".to_string(),
        }
    }
}
