mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crosscheck-cli")]
#[command(about = "Crosscheck CLI - Differential testing of two programs", long_about = None)]
struct Cli {
    /// Path to languages.json (falls back to CROSSCHECK_LANGUAGES, then built-in toolchains)
    #[arg(long, global = true)]
    languages: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a reference submission against a candidate
    Run(commands::RunArgs),

    /// List the configured language toolchains
    Langs,
}

/// Exit statuses: 0 match, 1 divergence, 2 harness error
const EXIT_DIVERGED: u8 = 1;
const EXIT_HARNESS_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so `--json` output stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => commands::run(args, cli.languages.as_deref()).await,
        Commands::Langs => commands::list_languages(cli.languages.as_deref()).map(|_| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_DIVERGED),
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::from(EXIT_HARNESS_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_arguments_parse() {
        let cli = Cli::try_parse_from([
            "crosscheck-cli",
            "run",
            "--slow",
            "brute.py",
            "--fast",
            "Fast.java",
            "--iterations",
            "25",
            "--compile-once",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.slow, PathBuf::from("brute.py"));
                assert_eq!(args.fast, PathBuf::from("Fast.java"));
                assert_eq!(args.iterations, Some(25));
                assert!(args.compile_once);
                assert!(args.json);
                assert!(args.generator.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_input_and_generator_conflict() {
        let parsed = Cli::try_parse_from([
            "crosscheck-cli",
            "run",
            "--slow",
            "a.py",
            "--fast",
            "b.py",
            "--input",
            "case.txt",
            "--generator",
            "gen.py",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_langs_with_global_config_path() {
        let cli = Cli::try_parse_from(["crosscheck-cli", "langs", "--languages", "custom.json"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Langs));
        assert_eq!(cli.languages, Some(PathBuf::from("custom.json")));
    }
}
