use super::{check_source_size, LanguageRunner, Materialized};
use crate::config::{default_config, LanguageConfig, ToolCommand};
use crate::sandbox::{CommandSpec, Workspace};
use crosscheck_common::error::HarnessError;
use crosscheck_common::types::Language;
use lazy_regex::{lazy_regex, Lazy, Regex};

static RE_PUBLIC_CLASS: Lazy<Regex> = lazy_regex!(r"public\s+class\s+([A-Za-z_][A-Za-z0-9_]*)");

/// Find the identifier following `public class`.
///
/// javac requires the file to be named after the public top-level class, so this is
/// the only thing we need to know about the source before compiling it.
pub fn extract_public_class(source: &str) -> Option<&str> {
    RE_PUBLIC_CLASS
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn missing_class() -> HarnessError {
    HarnessError::Configuration("Could not find public class declaration in Java code".to_string())
}

/// Two phases: `javac <Class>.java`, then `java -cp <workspace> <Class>`
#[derive(Debug, Clone)]
pub struct JavaRunner {
    compiler: ToolCommand,
    runtime: ToolCommand,
}

impl JavaRunner {
    pub fn from_config(config: &LanguageConfig) -> Self {
        let defaults = default_config(Language::Java);
        Self {
            compiler: config
                .compile
                .clone()
                .or(defaults.compile)
                .unwrap_or_else(|| ToolCommand::new("javac", &[])),
            runtime: config
                .execution
                .clone()
                .or(defaults.execution)
                .unwrap_or_else(|| ToolCommand::new("java", &[])),
        }
    }
}

impl LanguageRunner for JavaRunner {
    fn language(&self) -> Language {
        Language::Java
    }

    fn validate(&self, source: &str) -> Result<(), HarnessError> {
        check_source_size(source)?;
        extract_public_class(source).map(|_| ()).ok_or_else(missing_class)
    }

    fn materialize(&self, source: &str, workspace: &Workspace) -> Result<Materialized, HarnessError> {
        let class_name = extract_public_class(source).ok_or_else(missing_class)?;
        let source_file = workspace.write_file(&format!("{}.java", class_name), source)?;
        Ok(Materialized {
            source_file,
            entry: class_name.to_string(),
        })
    }

    fn compile_command(&self, program: &Materialized) -> Option<CommandSpec> {
        Some(
            CommandSpec::new(&self.compiler.command)
                .args(self.compiler.args.iter().cloned())
                .arg(program.source_file.to_string_lossy()),
        )
    }

    fn run_command(&self, program: &Materialized) -> CommandSpec {
        let class_dir = program
            .source_file
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string());
        CommandSpec::new(&self.runtime.command)
            .args(self.runtime.args.iter().cloned())
            .arg("-cp")
            .arg(class_dir)
            .arg(&program.entry)
    }
}
