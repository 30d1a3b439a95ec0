use super::{LanguageRunner, Materialized};
use crate::config::{default_config, LanguageConfig, ToolCommand};
use crate::sandbox::{CommandSpec, Workspace};
use crosscheck_common::error::HarnessError;
use crosscheck_common::types::Language;

const SOURCE_FILE: &str = "solution.py";

/// Interpreted: no compile phase, the script is handed to the interpreter
#[derive(Debug, Clone)]
pub struct PythonRunner {
    interpreter: ToolCommand,
}

impl PythonRunner {
    pub fn from_config(config: &LanguageConfig) -> Self {
        let interpreter = config
            .execution
            .clone()
            .or_else(|| default_config(Language::Python).execution)
            .unwrap_or_else(|| ToolCommand::new("python3", &[]));
        Self { interpreter }
    }
}

impl LanguageRunner for PythonRunner {
    fn language(&self) -> Language {
        Language::Python
    }

    fn materialize(&self, source: &str, workspace: &Workspace) -> Result<Materialized, HarnessError> {
        let source_file = workspace.write_file(SOURCE_FILE, source)?;
        Ok(Materialized {
            entry: source_file.to_string_lossy().into_owned(),
            source_file,
        })
    }

    fn compile_command(&self, _program: &Materialized) -> Option<CommandSpec> {
        None
    }

    fn run_command(&self, program: &Materialized) -> CommandSpec {
        CommandSpec::new(&self.interpreter.command)
            .args(self.interpreter.args.iter().cloned())
            .arg(&program.entry)
    }
}
