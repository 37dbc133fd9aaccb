use crate::engine::{BookingEngine, BookingStats};
use crate::ledger::{BookingKey, BookingRecord};
use crate::storage::{Theater, TheaterId};
use crate::web::{
    IDEMPOTENCY_KEY_INVALID_MESSAGE, Result, WebError, normalize_idempotency_key,
};
use axum::{
    Json,
    extract::{Path, State},
};
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Header carrying the client's idempotency key for direct bookings.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine>,
}

impl AppState {
    pub fn new(engine: Arc<BookingEngine>) -> Self {
        Self { engine }
    }
}

// ============================================================================
// REQUEST / RESPONSE BODIES
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTheaterRequest {
    pub total_seats: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReserveRequest {
    pub seat_count: u32,
    #[serde(default)]
    pub customer_email: Option<String>,
}

/// Body of `POST /theaters/:theater_id/book`.
///
/// `kind: "new"` books seats directly under the `Idempotency-Key` header;
/// `kind: "confirm_reservation"` upgrades an existing hold and carries its
/// key in the body instead.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookRequest {
    New {
        seat_count: u32,
        #[serde(default)]
        customer_email: Option<String>,
    },
    ConfirmReservation {
        reservation_key: String,
    },
}

#[derive(Debug, Serialize)]
pub struct SeatAvailabilityResponse {
    pub theater_id: TheaterId,
    pub remaining_seats: u32,
    pub version: u64,
}

// ============================================================================
// HANDLERS
// ============================================================================

pub async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn stats(State(state): State<AppState>) -> Json<BookingStats> {
    Json(state.engine.stats().await)
}

pub async fn create_theater(
    State(state): State<AppState>,
    Json(request): Json<CreateTheaterRequest>,
) -> Result<(StatusCode, Json<Theater>)> {
    let theater = state.engine.create_theater(request.total_seats).await?;
    Ok((StatusCode::CREATED, Json(theater)))
}

pub async fn list_theaters(State(state): State<AppState>) -> Json<Vec<Theater>> {
    Json(state.engine.list_theaters().await)
}

pub async fn seat_availability(
    State(state): State<AppState>,
    Path(theater_id): Path<u64>,
) -> Result<Json<SeatAvailabilityResponse>> {
    let theater_id = TheaterId(theater_id);
    let snapshot = state.engine.availability(theater_id).await?;

    Ok(Json(SeatAvailabilityResponse {
        theater_id,
        remaining_seats: snapshot.remaining_seats,
        version: snapshot.version,
    }))
}

pub async fn reserve(
    State(state): State<AppState>,
    Path(theater_id): Path<u64>,
    Json(request): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<BookingRecord>)> {
    let record = state
        .engine
        .reserve(
            TheaterId(theater_id),
            request.seat_count,
            request.customer_email,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Direct booking and reservation confirmation share one route; the body's
/// `kind` tag picks the path. Both outcomes answer 200 with the record.
pub async fn book(
    State(state): State<AppState>,
    Path(theater_id): Path<u64>,
    headers: HeaderMap,
    Json(request): Json<BookRequest>,
) -> Result<Json<BookingRecord>> {
    let theater_id = TheaterId(theater_id);

    let record = match request {
        BookRequest::New {
            seat_count,
            customer_email,
        } => {
            let key = idempotency_key_from(&headers)?;
            state
                .engine
                .book(theater_id, BookingKey::new(key), seat_count, customer_email)
                .await?
        }
        BookRequest::ConfirmReservation { reservation_key } => {
            state
                .engine
                .confirm_reservation(&BookingKey::new(reservation_key))
                .await?
        }
    };

    Ok(Json(record))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_key): Path<String>,
) -> Result<Json<BookingRecord>> {
    let record = state.engine.booking(&BookingKey::new(booking_key)).await?;
    Ok(Json(record))
}

pub async fn cancel_reservation(
    State(state): State<AppState>,
    Path(reservation_key): Path<String>,
) -> Result<Json<BookingRecord>> {
    let record = state
        .engine
        .cancel_reservation(&BookingKey::new(reservation_key))
        .await?;
    Ok(Json(record))
}

fn idempotency_key_from(headers: &HeaderMap) -> Result<String> {
    let raw_key = match headers.get(IDEMPOTENCY_KEY_HEADER) {
        Some(value) => Some(value.to_str().map_err(|_| {
            WebError::Input(IDEMPOTENCY_KEY_INVALID_MESSAGE.to_string())
        })?),
        None => None,
    };
    normalize_idempotency_key(raw_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_request_parses_both_kinds() {
        let new: BookRequest = serde_json::from_str(
            r#"{"kind": "new", "seat_count": 3, "customer_email": "ada@example.com"}"#,
        )
        .unwrap();
        assert!(matches!(
            new,
            BookRequest::New {
                seat_count: 3,
                customer_email: Some(_),
            }
        ));

        let confirm: BookRequest =
            serde_json::from_str(r#"{"kind": "confirm_reservation", "reservation_key": "r-1"}"#)
                .unwrap();
        assert!(matches!(
            confirm,
            BookRequest::ConfirmReservation { reservation_key } if reservation_key == "r-1"
        ));
    }

    #[test]
    fn book_request_rejects_unknown_kind() {
        let result = serde_json::from_str::<BookRequest>(r#"{"kind": "walk_in", "seat_count": 1}"#);
        assert!(result.is_err());
    }
}
