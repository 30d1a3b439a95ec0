// Toolchain configuration for each supported language
use anyhow::{bail, Context, Result};
use crosscheck_common::types::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: String,
    pub version: String,
    pub file_extension: String,
    /// Compiler invocation; absent for interpreted languages
    #[serde(default)]
    pub compile: Option<ToolCommand>,
    /// Runtime invocation; absent when the compiled artifact runs directly
    #[serde(default)]
    pub execution: Option<ToolCommand>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    languages: Vec<LanguageConfig>,
}

/// Language configuration manager
#[derive(Debug, Clone)]
pub struct LanguageConfigManager {
    configs: HashMap<Language, LanguageConfig>,
}

impl LanguageConfigManager {
    /// Load language configurations from languages.json
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Language config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to load {}", config_path.display()))
    }

    /// Load from `config_path` when it exists, built-in toolchains otherwise
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            tracing::info!(
                path = %config_path.display(),
                "Language config not found, using built-in toolchains"
            );
            Ok(Self::defaults())
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let languages_json: LanguagesJson =
            serde_json::from_str(content).context("Failed to parse languages.json")?;

        let mut configs = HashMap::new();
        for lang in languages_json.languages {
            let language: Language = lang
                .name
                .parse()
                .map_err(|_| anyhow::anyhow!("Unknown language '{}' in languages.json", lang.name))?;
            if configs.insert(language, lang).is_some() {
                bail!("Language '{}' is configured twice", language);
            }
        }

        if configs.is_empty() {
            bail!("No languages configured in languages.json");
        }

        Ok(Self { configs })
    }

    /// Built-in toolchains: python3, javac/java and g++
    pub fn defaults() -> Self {
        let configs = Language::ALL
            .into_iter()
            .map(|language| (language, default_config(language)))
            .collect();
        Self { configs }
    }

    /// Replace (or add) the toolchain of one language
    pub fn with_language(mut self, language: Language, config: LanguageConfig) -> Self {
        self.configs.insert(language, config);
        self
    }

    /// Get configuration for a specific language
    pub fn get_config(&self, language: Language) -> Result<&LanguageConfig> {
        self.configs
            .get(&language)
            .ok_or_else(|| anyhow::anyhow!("No configuration found for language: {}", language))
    }

    /// List all configured languages in a stable order
    pub fn list_languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|l| self.configs.contains_key(l))
            .collect()
    }
}

pub fn default_config(language: Language) -> LanguageConfig {
    match language {
        Language::Python => LanguageConfig {
            name: "python".to_string(),
            version: "3".to_string(),
            file_extension: "py".to_string(),
            compile: None,
            execution: Some(ToolCommand::new("python3", &[])),
        },
        Language::Java => LanguageConfig {
            name: "java".to_string(),
            version: "17".to_string(),
            file_extension: "java".to_string(),
            compile: Some(ToolCommand::new("javac", &[])),
            execution: Some(ToolCommand::new("java", &[])),
        },
        Language::Cpp => LanguageConfig {
            name: "cpp".to_string(),
            version: "c++17".to_string(),
            file_extension: "cpp".to_string(),
            compile: Some(ToolCommand::new("g++", &["-O2", "-std=c++17"])),
            execution: None,
        },
    }
}
