use thiserror::Error;

/// Failures that stop a comparison run before it reaches a terminal outcome.
///
/// Compile, runtime and timeout failures of a submission are not errors here; they
/// are recorded on the `ExecutionResult` and surface as a divergence.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The run cannot begin for a submission (unknown language, no Java class, ...)
    #[error("{0}")]
    Configuration(String),

    /// The input generator failed; neither submission is at fault
    #[error("Test input generation failed on test {test_number}: {message}")]
    Generation { test_number: u32, message: String },

    #[error("Sandbox failure: {0}")]
    Sandbox(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HarnessError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, HarnessError::Configuration(_))
    }
}
