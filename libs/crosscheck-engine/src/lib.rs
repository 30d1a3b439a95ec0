//! Differential testing engine.
//!
//! Layering, leaf first:
//! - `sandbox`: one process invocation with stdin, timeout and captured output
//! - `runner`: per-language materialize / compile / run commands
//! - `pipeline`: the execute-untrusted-source capability built from the two above
//! - `generator`: test input strategies
//! - `comparator`: the short-circuiting comparison loop
//! - `reporter`: outcome to response mapping
//! - `executor`: glue turning a validated plan into an outcome

pub mod comparator;
pub mod config;
pub mod executor;
pub mod generator;
pub mod pipeline;
pub mod reporter;
pub mod runner;
pub mod sandbox;

#[cfg(test)]
mod toolchain_tests;

pub use comparator::DifferentialComparator;
pub use config::LanguageConfigManager;
pub use executor::execute_plan;
pub use pipeline::{Runnable, SourceExecutor};
pub use sandbox::{CommandSpec, ProcessSandbox, Workspace};
