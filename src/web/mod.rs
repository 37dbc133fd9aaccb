//! HTTP surface for the booking engine.
//!
//! Thin axum adapter: handlers translate requests into engine calls and
//! engine errors into JSON problem responses with stable `code` strings.

pub mod app;
pub mod handlers;

use crate::core::EngineError;
use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;

pub use app::build_router;
pub use handlers::AppState;

/// Validation message returned when the idempotency key header is absent.
pub const IDEMPOTENCY_KEY_REQUIRED_MESSAGE: &str = "Idempotency-Key header is required";
/// Validation message returned when idempotency key contains invalid characters.
pub const IDEMPOTENCY_KEY_INVALID_MESSAGE: &str = "Idempotency-Key must be valid ASCII";
/// Validation message returned when idempotency key is too long.
pub const IDEMPOTENCY_KEY_TOO_LONG_MESSAGE: &str =
    "Idempotency-Key must not exceed 128 characters";

/// Upper bound for normalized idempotency keys.
pub const IDEMPOTENCY_KEY_MAX_LEN: usize = 128;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum WebError {
    Engine(EngineError),
    Input(String),
}

impl From<EngineError> for WebError {
    fn from(err: EngineError) -> Self {
        WebError::Engine(err)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            WebError::Engine(err) => {
                let (status, code) = match &err {
                    EngineError::TheaterNotFound(_) | EngineError::BookingNotFound(_) => {
                        (StatusCode::NOT_FOUND, "not_found")
                    }
                    EngineError::InsufficientSeats { .. } => {
                        (StatusCode::BAD_REQUEST, "insufficient_seats")
                    }
                    EngineError::ReservationExpired(_) => {
                        (StatusCode::BAD_REQUEST, "reservation_expired")
                    }
                    EngineError::IdempotencyConflict(_) => {
                        (StatusCode::CONFLICT, "idempotency_conflict")
                    }
                    EngineError::DuplicateKey(_) | EngineError::StateConflict { .. } => {
                        (StatusCode::CONFLICT, "conflict")
                    }
                    EngineError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "input_error"),
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
                };
                (status, err.to_string(), code.to_string())
            }
            WebError::Input(msg) => (StatusCode::BAD_REQUEST, msg, "input_error".to_string()),
        };

        let body = Json(ErrorResponse {
            error: message,
            code,
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;

/// Normalizes the mandatory idempotency key header value.
///
/// The key is trimmed; missing or blank values are rejected.
pub fn normalize_idempotency_key(raw_key: Option<&str>) -> Result<String> {
    let Some(raw_key) = raw_key else {
        return Err(WebError::Input(IDEMPOTENCY_KEY_REQUIRED_MESSAGE.to_string()));
    };

    let trimmed = raw_key.trim();
    if trimmed.is_empty() {
        return Err(WebError::Input(IDEMPOTENCY_KEY_REQUIRED_MESSAGE.to_string()));
    }

    if !trimmed.is_ascii() {
        return Err(WebError::Input(IDEMPOTENCY_KEY_INVALID_MESSAGE.to_string()));
    }

    if trimmed.len() > IDEMPOTENCY_KEY_MAX_LEN {
        return Err(WebError::Input(IDEMPOTENCY_KEY_TOO_LONG_MESSAGE.to_string()));
    }

    Ok(trimmed.to_string())
}
