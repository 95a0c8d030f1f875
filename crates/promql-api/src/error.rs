//! Mapping from [`AppError`] to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use promql_core::AppError;
use serde::Serialize;
use tracing::{error, warn};

/// Handler error; wraps [`AppError`] so it can become a response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl<E> From<E> for ApiError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::Input(_) | AppError::Build(_) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Cancelled(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let Some(raw) = self.0.raw_snippet() {
            error!(error = %self.0, raw = %raw, "undecodable model response");
        } else if status.is_server_error() {
            error!(error = %self.0, "request failed");
        } else {
            warn!(error = %self.0, "request rejected");
        }

        let body = ErrorBody {
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promql_core::Cancelled;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(AppError::input("empty")).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(AppError::build("x")).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(AppError::validation("x")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AppError::extraction("x")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(AppError::format("x", "raw")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::from(Cancelled).status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_raw_snippet_not_in_body() {
        let response =
            ApiError::from(AppError::format("expected value", "secret raw")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "invalid response format: expected value");
    }
}
