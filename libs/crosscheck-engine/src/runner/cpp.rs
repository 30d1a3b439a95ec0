use super::{LanguageRunner, Materialized};
use crate::config::{default_config, LanguageConfig, ToolCommand};
use crate::sandbox::{CommandSpec, Workspace};
use crosscheck_common::error::HarnessError;
use crosscheck_common::types::Language;

const SOURCE_FILE: &str = "solution.cpp";
const BINARY_FILE: &str = "solution.out";

/// Compile `solution.cpp` to `solution.out`, then execute the binary directly
#[derive(Debug, Clone)]
pub struct CppRunner {
    compiler: ToolCommand,
}

impl CppRunner {
    pub fn from_config(config: &LanguageConfig) -> Self {
        let compiler = config
            .compile
            .clone()
            .or_else(|| default_config(Language::Cpp).compile)
            .unwrap_or_else(|| ToolCommand::new("g++", &[]));
        Self { compiler }
    }
}

impl LanguageRunner for CppRunner {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn materialize(&self, source: &str, workspace: &Workspace) -> Result<Materialized, HarnessError> {
        let source_file = workspace.write_file(SOURCE_FILE, source)?;
        let binary = workspace.path().join(BINARY_FILE);
        Ok(Materialized {
            source_file,
            entry: binary.to_string_lossy().into_owned(),
        })
    }

    fn compile_command(&self, program: &Materialized) -> Option<CommandSpec> {
        Some(
            CommandSpec::new(&self.compiler.command)
                .args(self.compiler.args.iter().cloned())
                .arg(program.source_file.to_string_lossy())
                .arg("-o")
                .arg(&program.entry),
        )
    }

    fn run_command(&self, program: &Materialized) -> CommandSpec {
        CommandSpec::new(&program.entry)
    }
}
