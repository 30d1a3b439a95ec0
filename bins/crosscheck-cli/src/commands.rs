// CLI commands: run a local comparison, list toolchains
use anyhow::{anyhow, Context, Result};
use clap::Args;
use crosscheck_common::config::Config;
use crosscheck_common::types::{
    CodeSubmission, ComparisonPlan, DivergedResponse, GeneratorSpec, Language, RunResponse,
};
use crosscheck_engine::executor::compare_submissions;
use crosscheck_engine::generator::RepeatGenerator;
use crosscheck_engine::reporter::report;
use crosscheck_engine::{execute_plan, LanguageConfigManager, SourceExecutor};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Reference (slow) submission
    #[arg(long)]
    pub slow: PathBuf,

    /// Candidate (fast) submission
    #[arg(long)]
    pub fast: PathBuf,

    /// Language of the slow submission (python, java, cpp); inferred from the extension
    #[arg(long)]
    pub slow_lang: Option<String>,

    /// Language of the fast submission; inferred from the extension
    #[arg(long)]
    pub fast_lang: Option<String>,

    /// Number of test cases (defaults to CROSSCHECK_ITERATIONS)
    #[arg(short = 'n', long)]
    pub iterations: Option<u32>,

    /// Per-execution time limit in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Generator program whose stdout is one test input
    #[arg(long, conflicts_with = "input")]
    pub generator: Option<PathBuf>,

    /// Language of the generator program; inferred from the extension
    #[arg(long, requires = "generator")]
    pub generator_lang: Option<String>,

    /// Free-text description of the input format, kept with the generator
    #[arg(long)]
    pub input_spec: Option<String>,

    /// Feed this file's contents as the input of every test case
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Compile each submission once and reuse it across test cases
    #[arg(long)]
    pub compile_once: bool,

    /// Print the response as JSON
    #[arg(long)]
    pub json: bool,
}

fn load_config(languages: Option<&Path>) -> Result<(Config, LanguageConfigManager)> {
    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(path) = languages {
        config.languages_path = path.to_path_buf();
    }
    let manager = LanguageConfigManager::load_or_default(&config.languages_path)?;
    Ok((config, manager))
}

/// Explicit tag wins; otherwise the file extension decides
pub fn resolve_language(path: &Path, explicit: Option<&str>) -> Result<Language> {
    if let Some(tag) = explicit {
        return Ok(tag.parse()?);
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(Language::from_extension)
        .ok_or_else(|| {
            anyhow!(
                "Cannot infer language of {}; pass it explicitly (python, java, cpp)",
                path.display()
            )
        })
}

/// Apply `--timeout-ms` and check the result like any other configuration
fn with_timeout_override(mut config: Config, timeout_ms: Option<u64>) -> Result<Config> {
    if let Some(timeout_ms) = timeout_ms {
        config.timeout_ms = timeout_ms;
        config.validate().context("Invalid --timeout-ms")?;
    }
    Ok(config)
}

fn read_submission(path: &Path, explicit: Option<&str>) -> Result<CodeSubmission> {
    let language = resolve_language(path, explicit)?;
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(CodeSubmission::new(language, source))
}

/// Returns `true` when every test case matched
pub async fn run(args: RunArgs, languages: Option<&Path>) -> Result<bool> {
    let (config, manager) = load_config(languages)?;
    let config = with_timeout_override(config, args.timeout_ms)?;
    let iterations = config.iterations_for(args.iterations)?;
    let compile_once = args.compile_once || config.compile_once;

    let slow = read_submission(&args.slow, args.slow_lang.as_deref())?;
    let fast = read_submission(&args.fast, args.fast_lang.as_deref())?;
    let executor = Arc::new(SourceExecutor::from_config(&config, &manager));

    let outcome = if let Some(input_path) = &args.input {
        let input = fs::read_to_string(input_path)
            .with_context(|| format!("Failed to read {}", input_path.display()))?;
        let mut generator = RepeatGenerator::new(input);
        compare_submissions(executor, slow, fast, &mut generator, iterations, compile_once).await?
    } else {
        let generator = match &args.generator {
            Some(path) => GeneratorSpec::Delegated {
                program: read_submission(path, args.generator_lang.as_deref())?,
                input_spec: args.input_spec.clone(),
            },
            None => GeneratorSpec::FixedScheme,
        };
        let plan = ComparisonPlan {
            slow,
            fast,
            generator,
            iterations: Some(iterations),
        };
        execute_plan(executor, plan, iterations, compile_once).await?
    };

    let response = report(&outcome);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_human(&response);
    }

    Ok(matches!(response, RunResponse::Matched(_)))
}

fn print_block(title: &str, body: &str) {
    println!("{}:", title);
    if body.is_empty() {
        println!("  (empty)");
    } else {
        for line in body.lines() {
            println!("  {}", line);
        }
    }
}

fn print_divergence(d: &DivergedResponse) {
    println!("❌ Submissions diverged on test {} ({:?})\n", d.test_number, d.reason);
    print_block("Input", &d.test_input);
    print_block("Slow output", &d.slow_output);
    print_block("Fast output", &d.fast_output);
    if !d.slow_error.is_empty() {
        print_block("Slow error", &d.slow_error);
    }
    if !d.fast_error.is_empty() {
        print_block("Fast error", &d.fast_error);
    }
}

fn print_human(response: &RunResponse) {
    match response {
        RunResponse::Matched(m) => println!("✅ {}", m.message),
        RunResponse::Diverged(d) => print_divergence(d),
    }
}

/// List configured toolchains
pub fn list_languages(languages: Option<&Path>) -> Result<()> {
    let (_, manager) = load_config(languages)?;

    println!("📋 Configured Languages:\n");
    println!("{:<10} {:<10} {:<6} {:<30} {:<30}", "NAME", "VERSION", "EXT", "COMPILE", "RUN");
    println!("{}", "─".repeat(90));

    for language in manager.list_languages() {
        let config = manager.get_config(language)?;
        let render = |tool: &Option<crosscheck_engine::config::ToolCommand>| match tool {
            Some(t) if t.args.is_empty() => t.command.clone(),
            Some(t) => format!("{} {}", t.command, t.args.join(" ")),
            None => "-".to_string(),
        };
        println!(
            "{:<10} {:<10} {:<6} {:<30} {:<30}",
            language,
            config.version,
            config.file_extension,
            render(&config.compile),
            render(&config.execution)
        );
    }

    println!("\n✅ Total: {} language(s)", manager.list_languages().len());
    Ok(())
}
