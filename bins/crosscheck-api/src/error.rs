// Error responses: `{ "error": <message> }` with a status per failure class
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use crosscheck_common::error::HarnessError;
use crosscheck_common::types::ErrorResponse;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Metrics label for the failure class
    pub fn outcome(&self) -> &'static str {
        match self.status {
            StatusCode::BAD_REQUEST => "rejected",
            StatusCode::UNPROCESSABLE_ENTITY => "generation_error",
            _ => "error",
        }
    }
}

impl From<HarnessError> for ApiError {
    fn from(err: HarnessError) -> Self {
        let status = match &err {
            HarnessError::Configuration(_) => StatusCode::BAD_REQUEST,
            HarnessError::Generation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            HarnessError::Sandbox(_) | HarnessError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}
