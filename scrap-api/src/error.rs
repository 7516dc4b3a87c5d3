use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scrap_core::ScrapError;
use serde::Serialize;

/// Core error as an HTTP response body `{error, message}`.
#[derive(Debug)]
pub struct ApiError(pub ScrapError);

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl From<ScrapError> for ApiError {
    fn from(err: ScrapError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            match &self.0 {
                ScrapError::UpstreamStatus { status, body } => {
                    tracing::error!("Upstream responded {}: {}", status, body)
                }
                ScrapError::Transport { url, message } => {
                    tracing::error!("Upstream {} unreachable: {}", url, message)
                }
                other => tracing::error!("Request failed: {}", other),
            }
        }

        let body = ErrorBody {
            error: self.0.kind(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
