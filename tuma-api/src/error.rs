use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use tuma_order::error::OrderError;
use tuma_payments::error::PaymentError;

/// API-facing error. Every variant maps to a stable machine-readable
/// code so clients can branch without parsing messages.
#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    StateConflict(String),
    GatewayError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, "authentication_error", msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, "authorization_error", msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::StateConflict(msg) => (StatusCode::BAD_REQUEST, "state_conflict", msg),
            AppError::GatewayError(msg) => {
                tracing::error!("Payment gateway error: {}", msg);
                (StatusCode::BAD_GATEWAY, "payment_gateway_error", msg)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(msg) => AppError::ValidationError(msg),
            OrderError::Authorization(msg) => AppError::AuthorizationError(msg),
            OrderError::NotFound(what) => AppError::NotFoundError(format!("{what} not found")),
            OrderError::InvalidTransition { .. } => AppError::StateConflict(err.to_string()),
            OrderError::Conflict(msg) => AppError::StateConflict(msg),
            OrderError::Storage(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Validation(msg) => AppError::ValidationError(msg),
            PaymentError::Authorization(msg) => AppError::AuthorizationError(msg),
            PaymentError::NotFound(what) => AppError::NotFoundError(format!("{what} not found")),
            PaymentError::Gateway(msg) => AppError::GatewayError(msg),
            PaymentError::Storage(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}
