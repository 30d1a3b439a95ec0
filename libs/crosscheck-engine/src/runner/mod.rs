//! Language runners
//!
//! A runner knows how to lay a submission out on disk and which commands compile
//! and run it. It never spawns anything itself; `pipeline::SourceExecutor` drives
//! the commands through the sandbox.

mod cpp;
mod java;
mod python;

pub use cpp::CppRunner;
pub use java::{extract_public_class, JavaRunner};
pub use python::PythonRunner;

use crate::config::{LanguageConfig, LanguageConfigManager};
use crate::sandbox::{CommandSpec, Workspace};
use crosscheck_common::error::HarnessError;
use crosscheck_common::types::Language;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Safety limit on submitted source text
pub const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024;

/// A submission written into a workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    pub source_file: PathBuf,
    /// What the run command targets: the script, the class name or the binary
    pub entry: String,
}

pub trait LanguageRunner: fmt::Debug + Send + Sync {
    fn language(&self) -> Language;

    /// Checks that need no process. Runs before any iteration.
    fn validate(&self, source: &str) -> Result<(), HarnessError> {
        check_source_size(source)
    }

    fn materialize(&self, source: &str, workspace: &Workspace) -> Result<Materialized, HarnessError>;

    /// `None` for languages without a compile phase
    fn compile_command(&self, program: &Materialized) -> Option<CommandSpec>;

    fn run_command(&self, program: &Materialized) -> CommandSpec;

    /// Prefix put in front of compiler diagnostics
    fn compile_error_marker(&self) -> String {
        format!("{} compile error:", self.language().display_name())
    }
}

pub fn check_source_size(source: &str) -> Result<(), HarnessError> {
    if source.len() > MAX_SOURCE_CODE_BYTES {
        return Err(HarnessError::Configuration(format!(
            "Source code exceeds maximum size of {} bytes",
            MAX_SOURCE_CODE_BYTES
        )));
    }
    Ok(())
}

fn build_runner(language: Language, config: &LanguageConfig) -> Box<dyn LanguageRunner> {
    match language {
        Language::Python => Box::new(PythonRunner::from_config(config)),
        Language::Java => Box::new(JavaRunner::from_config(config)),
        Language::Cpp => Box::new(CppRunner::from_config(config)),
    }
}

/// Dispatch table from language to runner, holding only configured languages
#[derive(Debug)]
pub struct RunnerRegistry {
    runners: HashMap<Language, Box<dyn LanguageRunner>>,
}

impl RunnerRegistry {
    pub fn from_config(manager: &LanguageConfigManager) -> Self {
        let runners = manager
            .list_languages()
            .into_iter()
            .filter_map(|language| {
                manager
                    .get_config(language)
                    .ok()
                    .map(|config| (language, build_runner(language, config)))
            })
            .collect();
        Self { runners }
    }

    pub fn runner(&self, language: Language) -> Result<&dyn LanguageRunner, HarnessError> {
        self.runners
            .get(&language)
            .map(|r| r.as_ref())
            .ok_or_else(|| {
                HarnessError::Configuration(format!("Language '{}' is not configured", language))
            })
    }
}

impl Default for RunnerRegistry {
    fn default() -> Self {
        Self::from_config(&LanguageConfigManager::defaults())
    }
}
