// HTTP route handlers for the Crosscheck API

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use crosscheck_common::types::{RunRequest, RunResponse};
use crosscheck_engine::execute_plan;
use crosscheck_engine::reporter::report;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::AppState;

fn outcome_label(response: &RunResponse) -> &'static str {
    match response {
        RunResponse::Matched(_) => "matched",
        RunResponse::Diverged(_) => "diverged",
    }
}

/// POST /api/run - Compare two submissions
///
/// The comparison runs in its own task so a panic inside the engine becomes a 500
/// instead of a dropped connection.
pub async fn run_comparison(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<RunResponse>, ApiError> {
    let started = Instant::now();
    let result = compare(&state, payload).await;

    let outcome = match &result {
        Ok(Json(response)) => outcome_label(response),
        Err(e) => e.outcome(),
    };
    state.metrics.observe_run(outcome, started.elapsed());

    result
}

async fn compare(
    state: &AppState,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<RunResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Malformed request body");
        ApiError::from(rejection)
    })?;

    let plan = request.into_plan().map_err(|e| {
        warn!(error = %e, "Rejected comparison request");
        ApiError::from(e)
    })?;
    let iterations = state
        .config
        .iterations_for(plan.iterations)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    info!(
        slow_lang = %plan.slow.language,
        fast_lang = %plan.fast.language,
        iterations,
        "Comparison requested"
    );

    let task = tokio::spawn(execute_plan(
        Arc::clone(&state.executor),
        plan,
        iterations,
        state.config.compile_once,
    ));

    let outcome = match task.await {
        Ok(outcome) => outcome?,
        Err(e) => {
            error!(error = %e, "Comparison task failed");
            return Err(ApiError::internal("Comparison task failed unexpectedly"));
        }
    };

    let response = report(&outcome);
    info!(outcome = outcome_label(&response), "Comparison finished");
    Ok(Json(response))
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus exposition
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let body = state.metrics.render().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        ApiError::internal(e.to_string())
    })?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use axum::body::to_bytes;
    use axum::response::Response;
    use crosscheck_common::config::Config;
    use crosscheck_engine::{LanguageConfigManager, SourceExecutor};
    use serde_json::Value;

    fn state() -> Arc<AppState> {
        let config = Config {
            max_iterations: 50,
            iterations: 10,
            ..Default::default()
        };
        let executor = SourceExecutor::from_config(&config, &LanguageConfigManager::defaults());
        Arc::new(AppState {
            executor: Arc::new(executor),
            config,
            metrics: Metrics::new().unwrap(),
        })
    }

    fn request() -> RunRequest {
        RunRequest {
            slow_lang: Some("python".to_string()),
            fast_lang: Some("python".to_string()),
            slow_code: Some("print(input())".to_string()),
            fast_code: Some("print(input())".to_string()),
            ..Default::default()
        }
    }

    async fn call(state: Arc<AppState>, request: RunRequest) -> (StatusCode, Value) {
        let response: Response = run_comparison(State(state), Ok(Json(request)))
            .await
            .into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_missing_code_is_bad_request() {
        let (status, body) = call(
            state(),
            RunRequest {
                fast_code: None,
                ..request()
            },
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Both code inputs are required");
    }

    #[tokio::test]
    async fn test_unsupported_language_is_bad_request() {
        let (status, body) = call(
            state(),
            RunRequest {
                slow_lang: Some("ruby".to_string()),
                ..request()
            },
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unsupported slow language: ruby");
    }

    #[tokio::test]
    async fn test_java_without_public_class_is_bad_request() {
        let (status, body) = call(
            state(),
            RunRequest {
                fast_lang: Some("java".to_string()),
                fast_code: Some("class Main {}".to_string()),
                ..request()
            },
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Could not find public class declaration in Java code"
        );
    }

    #[tokio::test]
    async fn test_iterations_above_limit_are_rejected() {
        let (status, body) = call(
            state(),
            RunRequest {
                iterations: Some(51),
                ..request()
            },
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("between 1 and 50"));
    }

    #[tokio::test]
    async fn test_rejections_are_counted() {
        let state = state();
        call(
            Arc::clone(&state),
            RunRequest {
                slow_code: None,
                ..request()
            },
        )
        .await;

        let text = state.metrics.render().unwrap();
        assert!(text.contains("crosscheck_runs_total{outcome=\"rejected\"} 1"));
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
