// Runtime configuration shared by the API and the CLI
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ITERATIONS: u32 = 100;
pub const DEFAULT_MAX_ITERATIONS: u32 = 1000;
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_COMPILE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_LANGUAGES_PATH: &str = "config/languages.json";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {raw:?}")]
    InvalidValue { key: String, raw: String },

    #[error("CROSSCHECK_ITERATIONS must be at least 1")]
    ZeroIterations,

    #[error("CROSSCHECK_ITERATIONS ({iterations}) exceeds CROSSCHECK_MAX_ITERATIONS ({max})")]
    IterationsAboveMax { iterations: u32, max: u32 },

    #[error("Timeouts must be greater than zero")]
    ZeroTimeout,

    /// A per-run override outside `1..=max_iterations`
    #[error("iterations must be between 1 and {max} (got {requested})")]
    IterationsOutOfRange { requested: u32, max: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub iterations: u32,
    pub max_iterations: u32,
    pub timeout_ms: u64,
    pub compile_timeout_ms: u64,
    pub compile_once: bool,
    pub workspace_root: PathBuf,
    pub languages_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            iterations: DEFAULT_ITERATIONS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            compile_timeout_ms: DEFAULT_COMPILE_TIMEOUT_MS,
            compile_once: false,
            workspace_root: env::temp_dir(),
            languages_path: PathBuf::from(DEFAULT_LANGUAGES_PATH),
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            raw,
        }),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            iterations: parse_var(&lookup, "CROSSCHECK_ITERATIONS", defaults.iterations)?,
            max_iterations: parse_var(&lookup, "CROSSCHECK_MAX_ITERATIONS", defaults.max_iterations)?,
            timeout_ms: parse_var(&lookup, "CROSSCHECK_TIMEOUT_MS", defaults.timeout_ms)?,
            compile_timeout_ms: parse_var(
                &lookup,
                "CROSSCHECK_COMPILE_TIMEOUT_MS",
                defaults.compile_timeout_ms,
            )?,
            compile_once: parse_var(&lookup, "CROSSCHECK_COMPILE_ONCE", defaults.compile_once)?,
            workspace_root: lookup("CROSSCHECK_WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_root),
            languages_path: lookup("CROSSCHECK_LANGUAGES")
                .map(PathBuf::from)
                .unwrap_or(defaults.languages_path),
        };

        config.validate()?;
        Ok(config)
    }

    /// Checked on load; call again after overriding fields by hand
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.iterations > self.max_iterations {
            return Err(ConfigError::IterationsAboveMax {
                iterations: self.iterations,
                max: self.max_iterations,
            });
        }
        if self.timeout_ms == 0 || self.compile_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_millis(self.compile_timeout_ms)
    }

    /// Resolve the iteration count for a request, bounded by `max_iterations`
    pub fn iterations_for(&self, requested: Option<u32>) -> Result<u32, ConfigError> {
        match requested {
            None => Ok(self.iterations),
            Some(n) if n >= 1 && n <= self.max_iterations => Ok(n),
            Some(n) => Err(ConfigError::IterationsOutOfRange {
                requested: n,
                max: self.max_iterations,
            }),
        }
    }
}
