use crate::error::HarnessError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    Cpp,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Python, Language::Java, Language::Cpp];

    /// Human-facing name used in diagnostics ("Java compile error: ...").
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::Java => "Java",
            Language::Cpp => "C++",
        }
    }

    /// Infer a language from a source file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" => Some(Language::Python),
            "java" => Some(Language::Java),
            "cpp" | "cc" | "cxx" => Some(Language::Cpp),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::Java => write!(f, "java"),
            Language::Cpp => write!(f, "cpp"),
        }
    }
}

impl FromStr for Language {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "python" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "cpp" => Ok(Language::Cpp),
            other => Err(HarnessError::Configuration(format!(
                "Unsupported language: {}",
                other
            ))),
        }
    }
}

/// One program taking part in a comparison. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSubmission {
    pub language: Language,
    pub source: String,
}

impl CodeSubmission {
    pub fn new(language: Language, source: impl Into<String>) -> Self {
        Self {
            language,
            source: source.into(),
        }
    }
}

/// A generated input together with its 1-based position in the run.
/// The index is assigned by the comparator, never by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub index: u32,
    pub input: String,
}

/// Captured outcome of one program execution.
///
/// stdout and stderr are trimmed. When `timed_out` is set they hold only what the
/// process wrote before it was killed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    /// Absent when the process was killed by a signal or timed out
    pub exit_code: Option<i32>,
    /// Terminating signal, kept apart so `exit(137)` is not mistaken for SIGKILL
    #[serde(default)]
    pub signal: Option<i32>,
    pub compile_failed: bool,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Compile,
    Runtime,
    Timeout,
}

impl ExecutionResult {
    /// Result of a compile phase that did not succeed; the run phase never happens.
    pub fn compile_failure(stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            compile_failed: true,
            ..Default::default()
        }
    }

    /// Any stderr output or a timeout makes the result untrustworthy.
    pub fn is_failure(&self) -> bool {
        self.compile_failed || self.timed_out || !self.stderr.is_empty()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        if self.compile_failed {
            Some(FailureKind::Compile)
        } else if self.timed_out {
            Some(FailureKind::Timeout)
        } else if !self.stderr.is_empty() {
            Some(FailureKind::Runtime)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceReason {
    ExecutionError,
    OutputMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    pub index: u32,
    pub input: String,
    pub slow: ExecutionResult,
    pub fast: ExecutionResult,
    pub reason: DivergenceReason,
}

/// Terminal state of a comparison run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonOutcome {
    AllMatched { count: u32 },
    Diverged(Divergence),
}

/// How test inputs are produced for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorSpec {
    FixedScheme,
    Delegated {
        program: CodeSubmission,
        input_spec: Option<String>,
    },
}

/// A validated comparison request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonPlan {
    pub slow: CodeSubmission,
    pub fast: CodeSubmission,
    pub generator: GeneratorSpec,
    pub iterations: Option<u32>,
}

/// Request body of `POST /api/run`.
///
/// Every field is optional at the wire level so that missing or unknown values are
/// reported with our own messages instead of a deserializer rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub slow_lang: Option<String>,
    pub fast_lang: Option<String>,
    pub slow_code: Option<String>,
    pub fast_code: Option<String>,
    pub input_spec: Option<String>,
    pub generator_lang: Option<String>,
    pub generator_code: Option<String>,
    pub iterations: Option<u32>,
}

fn parse_language(role: &str, tag: Option<&str>) -> Result<Language, HarnessError> {
    let tag = tag.unwrap_or("<missing>");
    tag.parse().map_err(|_| {
        HarnessError::Configuration(format!("Unsupported {} language: {}", role, tag))
    })
}

fn non_empty(code: Option<String>) -> Option<String> {
    code.filter(|c| !c.is_empty())
}

impl RunRequest {
    /// Validate the payload and turn it into a plan the engine can execute
    pub fn into_plan(self) -> Result<ComparisonPlan, HarnessError> {
        let (slow_code, fast_code) = match (non_empty(self.slow_code), non_empty(self.fast_code)) {
            (Some(slow), Some(fast)) => (slow, fast),
            _ => {
                return Err(HarnessError::Configuration(
                    "Both code inputs are required".to_string(),
                ))
            }
        };

        let slow = CodeSubmission::new(parse_language("slow", self.slow_lang.as_deref())?, slow_code);
        let fast = CodeSubmission::new(parse_language("fast", self.fast_lang.as_deref())?, fast_code);

        let input_spec = self.input_spec.filter(|s| !s.trim().is_empty());
        let generator = match (self.generator_lang, non_empty(self.generator_code)) {
            (Some(lang), Some(code)) => GeneratorSpec::Delegated {
                program: CodeSubmission::new(parse_language("generator", Some(lang.as_str()))?, code),
                input_spec,
            },
            (None, Some(_)) => {
                return Err(HarnessError::Configuration(
                    "generatorLang is required when generatorCode is given".to_string(),
                ))
            }
            (Some(_), None) => {
                return Err(HarnessError::Configuration(
                    "generatorCode is required when generatorLang is given".to_string(),
                ))
            }
            (None, None) => GeneratorSpec::FixedScheme,
        };

        if self.iterations == Some(0) {
            return Err(HarnessError::Configuration(
                "iterations must be at least 1".to_string(),
            ));
        }

        Ok(ComparisonPlan {
            slow,
            fast,
            generator,
            iterations: self.iterations,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedResponse {
    #[serde(rename = "match")]
    pub matched: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivergedResponse {
    #[serde(rename = "match")]
    pub matched: bool,
    pub test_number: u32,
    pub test_input: String,
    pub slow_output: String,
    pub fast_output: String,
    pub slow_error: String,
    pub fast_error: String,
    pub slow_timed_out: bool,
    pub fast_timed_out: bool,
    pub reason: DivergenceReason,
}

/// Response body of `POST /api/run` when the run itself completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunResponse {
    Diverged(DivergedResponse),
    Matched(MatchedResponse),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(slow_lang: &str, fast_lang: &str) -> RunRequest {
        RunRequest {
            slow_lang: Some(slow_lang.to_string()),
            fast_lang: Some(fast_lang.to_string()),
            slow_code: Some("print(input())".to_string()),
            fast_code: Some("print(input())".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_language_round_trips_through_tag() {
        for lang in Language::ALL {
            assert_eq!(lang.to_string().parse::<Language>().unwrap(), lang);
        }
        assert!("ruby".parse::<Language>().is_err());
    }

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("JAVA"), Some(Language::Java));
        assert_eq!(Language::from_extension("cc"), Some(Language::Cpp));
        assert_eq!(Language::from_extension("rs"), None);
    }

    #[test]
    fn test_request_uses_camel_case_fields() {
        let req: RunRequest = serde_json::from_str(
            r#"{"slowLang":"python","fastLang":"cpp","slowCode":"a","fastCode":"b","inputSpec":"one int"}"#,
        )
        .unwrap();
        let plan = req.into_plan().unwrap();
        assert_eq!(plan.slow.language, Language::Python);
        assert_eq!(plan.fast.language, Language::Cpp);
        assert_eq!(plan.generator, GeneratorSpec::FixedScheme);
    }

    #[test]
    fn test_missing_code_is_rejected() {
        let mut req = request("python", "python");
        req.fast_code = Some(String::new());
        let err = req.into_plan().unwrap_err();
        assert_eq!(err.to_string(), "Both code inputs are required");
    }

    #[test]
    fn test_unsupported_language_names_the_side() {
        let err = request("python", "ruby").into_plan().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported fast language: ruby");

        let mut req = request("python", "python");
        req.slow_lang = None;
        let err = req.into_plan().unwrap_err();
        assert!(err.to_string().starts_with("Unsupported slow language"));
    }

    #[test]
    fn test_delegated_generator_plan() {
        let mut req = request("python", "java");
        req.generator_lang = Some("python".to_string());
        req.generator_code = Some("print(3)".to_string());
        req.input_spec = Some("a single integer".to_string());

        match req.into_plan().unwrap().generator {
            GeneratorSpec::Delegated { program, input_spec } => {
                assert_eq!(program.language, Language::Python);
                assert_eq!(input_spec.as_deref(), Some("a single integer"));
            }
            other => panic!("expected delegated generator, got {:?}", other),
        }
    }

    #[test]
    fn test_generator_fields_must_come_together() {
        let mut req = request("python", "python");
        req.generator_code = Some("print(1)".to_string());
        assert!(req.into_plan().is_err());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut req = request("python", "python");
        req.iterations = Some(0);
        assert!(req.into_plan().is_err());
    }

    #[test]
    fn test_failure_kind_priority() {
        let compile = ExecutionResult::compile_failure("Java compile error:\nboom");
        assert_eq!(compile.failure_kind(), Some(FailureKind::Compile));

        let timeout = ExecutionResult {
            timed_out: true,
            ..Default::default()
        };
        assert!(timeout.is_failure());
        assert_eq!(timeout.failure_kind(), Some(FailureKind::Timeout));

        let runtime = ExecutionResult {
            stderr: "Traceback".to_string(),
            exit_code: Some(1),
            ..Default::default()
        };
        assert_eq!(runtime.failure_kind(), Some(FailureKind::Runtime));

        let ok = ExecutionResult {
            stdout: "49".to_string(),
            exit_code: Some(0),
            ..Default::default()
        };
        assert!(!ok.is_failure());
        assert_eq!(ok.failure_kind(), None);
    }

    #[test]
    fn test_matched_response_shape() {
        let resp = RunResponse::Matched(MatchedResponse {
            matched: true,
            message: "All 100 test cases matched!".to_string(),
        });
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"match": true, "message": "All 100 test cases matched!"})
        );
    }

    #[test]
    fn test_diverged_response_shape() {
        let resp = RunResponse::Diverged(DivergedResponse {
            matched: false,
            test_number: 1,
            test_input: "7\n".to_string(),
            slow_output: "7".to_string(),
            fast_output: "8".to_string(),
            slow_error: String::new(),
            fast_error: String::new(),
            slow_timed_out: false,
            fast_timed_out: false,
            reason: DivergenceReason::OutputMismatch,
        });
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["match"], false);
        assert_eq!(json["test_number"], 1);
        assert_eq!(json["reason"], "output_mismatch");
        assert_eq!(json["slow_output"], "7");
    }
}
