mod error;
mod handlers;
mod metrics;
mod routes;

use anyhow::{Context, Result};
use crosscheck_common::config::Config;
use crosscheck_engine::{LanguageConfigManager, SourceExecutor};
use metrics::Metrics;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub struct AppState {
    pub executor: Arc<SourceExecutor>,
    pub config: Config,
    pub metrics: Metrics,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Crosscheck API booting...");

    let config = Config::from_env().context("Invalid configuration")?;
    let languages = LanguageConfigManager::load_or_default(&config.languages_path)?;

    info!(
        languages = ?languages.list_languages(),
        iterations = config.iterations,
        timeout_ms = config.timeout_ms,
        compile_once = config.compile_once,
        workspace_root = %config.workspace_root.display(),
        "Configuration loaded"
    );

    let executor = Arc::new(SourceExecutor::from_config(&config, &languages));
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState {
        executor,
        config,
        metrics: Metrics::new().context("Failed to register metrics")?,
    });

    let app = routes::routes().with_state(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, "HTTP server listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
