/// Integration tests against the real toolchains
///
/// These tests verify the per-language pipelines end to end:
/// 1. Matching submissions complete in every language
/// 2. An off-by-one fast submission diverges on test 1
/// 3. Compile failures carry the compiler marker and diagnostics
/// 4. Runtime errors and timeouts are told apart
/// 5. Workspaces are gone afterwards
///
/// Run with `cargo test -p crosscheck-engine -- --ignored`.

use crate::config::LanguageConfigManager;
use crate::executor::{compare_submissions, execute_plan};
use crate::generator::RepeatGenerator;
use crate::pipeline::SourceExecutor;
use crate::reporter::report;
use crosscheck_common::config::Config;
use crosscheck_common::types::{
    CodeSubmission, ComparisonOutcome, ComparisonPlan, DivergenceReason, GeneratorSpec, Language,
    RunResponse,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;

const PY_SQUARE: &str = "n = int(input())\nprint(n * n)\n";
const PY_IDENTITY: &str = "n = int(input())\nprint(n)\n";
const PY_PLUS_ONE: &str = "n = int(input())\nprint(n + 1)\n";

const JAVA_SQUARE: &str = r#"
import java.util.Scanner;

public class Square {
    public static void main(String[] args) {
        Scanner in = new Scanner(System.in);
        long n = in.nextLong();
        System.out.println(n * n);
    }
}
"#;

const CPP_SQUARE: &str = r#"
#include <iostream>
int main() {
    long long n;
    std::cin >> n;
    std::cout << n * n << std::endl;
    return 0;
}
"#;

fn executor(root: &Path, timeout_ms: u64) -> Arc<SourceExecutor> {
    let config = Config {
        workspace_root: root.to_path_buf(),
        timeout_ms,
        ..Default::default()
    };
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/languages.json");
    let languages = LanguageConfigManager::load_or_default(&path)
        .expect("Failed to load language config");
    Arc::new(SourceExecutor::from_config(&config, &languages))
}

async fn compare_fixed(
    executor: Arc<SourceExecutor>,
    slow: CodeSubmission,
    fast: CodeSubmission,
    iterations: u32,
) -> ComparisonOutcome {
    let mut generator = RepeatGenerator::new("7\n");
    compare_submissions(executor, slow, fast, &mut generator, iterations, false)
        .await
        .expect("comparison should complete")
}

fn assert_no_residue(root: &Path) {
    assert_eq!(
        fs::read_dir(root).unwrap().count(),
        0,
        "workspaces left behind"
    );
}

/// Test: n*n against itself with input 7 matches every time
#[tokio::test]
#[ignore] // Requires python3
async fn test_python_squares_match() {
    let root = tempfile::tempdir().unwrap();
    let outcome = compare_fixed(
        executor(root.path(), 5000),
        CodeSubmission::new(Language::Python, PY_SQUARE),
        CodeSubmission::new(Language::Python, PY_SQUARE),
        10,
    )
    .await;

    assert_eq!(
        serde_json::to_value(report(&outcome)).unwrap(),
        serde_json::json!({ "match": true, "message": "All 10 test cases matched!" })
    );
    assert_no_residue(root.path());
}

/// Test: n against n+1 diverges on the first test
#[tokio::test]
#[ignore] // Requires python3
async fn test_python_off_by_one_diverges_first() {
    let root = tempfile::tempdir().unwrap();
    let plan = ComparisonPlan {
        slow: CodeSubmission::new(Language::Python, PY_IDENTITY),
        fast: CodeSubmission::new(Language::Python, PY_PLUS_ONE),
        generator: GeneratorSpec::FixedScheme,
        iterations: None,
    };

    let outcome = execute_plan(executor(root.path(), 5000), plan, 100, false)
        .await
        .unwrap();

    match report(&outcome) {
        RunResponse::Diverged(d) => {
            assert_eq!(d.test_number, 1);
            assert_ne!(d.slow_output, d.fast_output);
            assert_eq!(d.reason, DivergenceReason::OutputMismatch);
        }
        other => panic!("expected divergence, got {:?}", other),
    }
    assert_no_residue(root.path());
}

/// Test: the same program in three languages agrees
#[tokio::test]
#[ignore] // Requires python3, javac/java and g++
async fn test_cross_language_squares_match() {
    let root = tempfile::tempdir().unwrap();
    let executor = executor(root.path(), 10_000);

    let outcome = compare_fixed(
        Arc::clone(&executor),
        CodeSubmission::new(Language::Java, JAVA_SQUARE),
        CodeSubmission::new(Language::Cpp, CPP_SQUARE),
        3,
    )
    .await;
    assert_eq!(outcome, ComparisonOutcome::AllMatched { count: 3 });

    let outcome = compare_fixed(
        executor,
        CodeSubmission::new(Language::Python, PY_SQUARE),
        CodeSubmission::new(Language::Cpp, CPP_SQUARE),
        3,
    )
    .await;
    assert_eq!(outcome, ComparisonOutcome::AllMatched { count: 3 });
    assert_no_residue(root.path());
}

/// Test: compile-once runs Java through one javac invocation
#[tokio::test]
#[ignore] // Requires javac/java
async fn test_java_compile_once() {
    let root = tempfile::tempdir().unwrap();
    let mut generator = RepeatGenerator::new("12\n");

    let outcome = compare_submissions(
        executor(root.path(), 10_000),
        CodeSubmission::new(Language::Java, JAVA_SQUARE),
        CodeSubmission::new(Language::Java, JAVA_SQUARE),
        &mut generator,
        5,
        true,
    )
    .await
    .unwrap();

    assert_eq!(outcome, ComparisonOutcome::AllMatched { count: 5 });
    assert_no_residue(root.path());
}

/// Test: a Java syntax error is a compile failure, not a runtime error
#[tokio::test]
#[ignore] // Requires python3 and javac
async fn test_java_compile_error_diverges() {
    let root = tempfile::tempdir().unwrap();
    let broken = "public class Broken { public static void main(String[] a) { int x = ; } }";

    let outcome = compare_fixed(
        executor(root.path(), 10_000),
        CodeSubmission::new(Language::Python, PY_SQUARE),
        CodeSubmission::new(Language::Java, broken),
        5,
    )
    .await;

    match outcome {
        ComparisonOutcome::Diverged(d) => {
            assert_eq!(d.index, 1);
            assert!(d.fast.compile_failed);
            assert!(d.fast.stderr.starts_with("Java compile error:"));
            assert_eq!(d.reason, DivergenceReason::ExecutionError);
        }
        other => panic!("expected divergence, got {:?}", other),
    }
    assert_no_residue(root.path());
}

/// Test: a segfaulting C++ program is a runtime error with a visible reason
#[tokio::test]
#[ignore] // Requires python3 and g++
async fn test_cpp_runtime_error_diverges() {
    let root = tempfile::tempdir().unwrap();
    let crash = "#include <cstdlib>\nint main() { std::abort(); }\n";

    let outcome = compare_fixed(
        executor(root.path(), 5000),
        CodeSubmission::new(Language::Python, PY_SQUARE),
        CodeSubmission::new(Language::Cpp, crash),
        5,
    )
    .await;

    match outcome {
        ComparisonOutcome::Diverged(d) => {
            assert_eq!(d.index, 1);
            assert!(!d.fast.timed_out);
            assert!(!d.fast.compile_failed);
            assert!(!d.fast.stderr.is_empty());
        }
        other => panic!("expected divergence, got {:?}", other),
    }
}

/// Test: an infinite loop is reported as a timeout
#[tokio::test]
#[ignore] // Requires python3
async fn test_python_timeout_is_reported_distinctly() {
    let root = tempfile::tempdir().unwrap();
    let spin = "n = int(input())\nwhile True:\n    pass\n";

    let outcome = compare_fixed(
        executor(root.path(), 500),
        CodeSubmission::new(Language::Python, PY_SQUARE),
        CodeSubmission::new(Language::Python, spin),
        5,
    )
    .await;

    match report(&outcome) {
        RunResponse::Diverged(d) => {
            assert_eq!(d.test_number, 1);
            assert!(d.fast_timed_out);
            assert!(!d.slow_timed_out);
            assert!(d.fast_error.starts_with("Execution timed out"));
        }
        other => panic!("expected divergence, got {:?}", other),
    }
    assert_no_residue(root.path());
}

/// Test: a Python generator program supplies the inputs
#[tokio::test]
#[ignore] // Requires python3
async fn test_python_generator_program() {
    let root = tempfile::tempdir().unwrap();
    let plan = ComparisonPlan {
        slow: CodeSubmission::new(Language::Python, PY_SQUARE),
        fast: CodeSubmission::new(Language::Python, "n = int(input())\nprint(n ** 2)\n"),
        generator: GeneratorSpec::Delegated {
            program: CodeSubmission::new(
                Language::Python,
                "import random\nprint(random.randint(-1000, 1000))\n",
            ),
            input_spec: Some("a single integer between -1000 and 1000".to_string()),
        },
        iterations: None,
    };

    let outcome = execute_plan(executor(root.path(), 5000), plan, 10, false)
        .await
        .unwrap();

    assert_eq!(outcome, ComparisonOutcome::AllMatched { count: 10 });
    assert_no_residue(root.path());
}
