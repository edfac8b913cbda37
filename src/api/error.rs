use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::application::AppError;

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::App(err) => match err {
                AppError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
                // Shares 400 with malformed input, as existing clients expect
                AppError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
                AppError::AccountNotFound(_) => StatusCode::NOT_FOUND,
                AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            ApiError::App(AppError::Database(err)) => {
                tracing::error!(error = ?err, "Storage failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::App(AppError::InvalidAmount("Amount is required".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::App(AppError::InsufficientFunds {
                    account_id: 1,
                    balance: Decimal::ONE,
                    requested: Decimal::TEN,
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::App(AppError::AccountNotFound(7)),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::App(AppError::Database(anyhow::anyhow!("disk I/O error"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::BadRequest("EOF while parsing".into()),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
