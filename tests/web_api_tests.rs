/// HTTP contract tests
///
/// Every route is exercised through `tower::ServiceExt::oneshot` against
/// the real router, including idempotency header validation and the
/// expired-confirmation path on a manual clock.
/// Run with: cargo test --test web_api_tests
use axum::{Router, body::Body};
use boxoffice::web::{
    IDEMPOTENCY_KEY_INVALID_MESSAGE, IDEMPOTENCY_KEY_MAX_LEN, IDEMPOTENCY_KEY_REQUIRED_MESSAGE,
    IDEMPOTENCY_KEY_TOO_LONG_MESSAGE,
};
use boxoffice::{AppState, BookingEngine, EngineConfig, ManualClock, build_router};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tower::ServiceExt;

fn test_app() -> Router {
    build_router(AppState::new(Arc::new(BookingEngine::new())))
}

fn manual_app(ttl_secs: u64) -> (Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_wall_clock());
    let config = EngineConfig::new().with_reservation_ttl(StdDuration::from_secs(ttl_secs));
    let engine = Arc::new(BookingEngine::with_clock(config, clock.clone()).unwrap());
    (build_router(AppState::new(engine)), clock)
}

async fn request_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .oneshot(request)
        .await
        .expect("router should serve request");

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();

    if body.is_empty() {
        return (status, Value::Null);
    }

    let value = serde_json::from_slice(&body).expect("body should be valid json");
    (status, value)
}

async fn create_theater(app: &Router, total_seats: u32) -> u64 {
    let (status, theater) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri("/theaters")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "total_seats": total_seats }).to_string()))
            .expect("valid create request"),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    theater.get("id").and_then(Value::as_u64).expect("theater id")
}

fn assert_error(problem: &Value, expected_code: &str) {
    assert_eq!(
        problem.get("code").and_then(Value::as_str),
        Some(expected_code)
    );
    assert!(problem.get("error").and_then(Value::as_str).is_some());
}

#[tokio::test]
async fn health_and_stats_respond() {
    let app = test_app();

    let (status, body) = request_json(
        app.clone(),
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .expect("valid health request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("status").and_then(Value::as_str), Some("ok"));

    let (status, stats) = request_json(
        app,
        Request::builder()
            .uri("/stats")
            .body(Body::empty())
            .expect("valid stats request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats.get("theaters").and_then(Value::as_u64), Some(0));
    assert_eq!(stats.get("booked").and_then(Value::as_u64), Some(0));
}

#[tokio::test]
async fn theater_creation_and_listing() {
    let app = test_app();

    let (status, theater) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri("/theaters")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "total_seats": 120 }).to_string()))
            .expect("valid create request"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(theater.get("total_seats").and_then(Value::as_u64), Some(120));
    assert_eq!(
        theater.get("remaining_seats").and_then(Value::as_u64),
        Some(120)
    );
    assert!(theater.get("id").and_then(Value::as_u64).is_some());

    let (status, problem) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri("/theaters")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "total_seats": 0 }).to_string()))
            .expect("valid zero-seat request"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&problem, "input_error");

    create_theater(&app, 40).await;
    let (status, theaters) = request_json(
        app,
        Request::builder()
            .uri("/theaters")
            .body(Body::empty())
            .expect("valid list request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(theaters.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn seat_availability_contract() {
    let app = test_app();
    let theater_id = create_theater(&app, 75).await;

    let (status, seats) = request_json(
        app.clone(),
        Request::builder()
            .uri(format!("/theaters/{theater_id}/seats"))
            .body(Body::empty())
            .expect("valid seats request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        seats.get("theater_id").and_then(Value::as_u64),
        Some(theater_id)
    );
    assert_eq!(
        seats.get("remaining_seats").and_then(Value::as_u64),
        Some(75)
    );

    let (status, problem) = request_json(
        app,
        Request::builder()
            .uri("/theaters/9999/seats")
            .body(Body::empty())
            .expect("valid unknown-theater request"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error(&problem, "not_found");
}

#[tokio::test]
async fn reserve_contract() {
    let app = test_app();
    let theater_id = create_theater(&app, 10).await;

    let (status, record) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri(format!("/theaters/{theater_id}/reserve"))
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "seat_count": 4, "customer_email": "ada@example.com" }).to_string(),
            ))
            .expect("valid reserve request"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record.get("state").and_then(Value::as_str), Some("reserved"));
    assert_eq!(record.get("seat_count").and_then(Value::as_u64), Some(4));
    assert_eq!(
        record.get("customer_email").and_then(Value::as_str),
        Some("ada@example.com")
    );
    assert!(record.get("key").and_then(Value::as_str).is_some());
    assert!(record.get("expires_at").and_then(Value::as_str).is_some());

    // more than the pool holds
    let (status, problem) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri(format!("/theaters/{theater_id}/reserve"))
            .header("content-type", "application/json")
            .body(Body::from(json!({ "seat_count": 7 }).to_string()))
            .expect("valid oversized reserve"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&problem, "insufficient_seats");

    // zero seats is rejected before any seat math
    let (status, problem) = request_json(
        app,
        Request::builder()
            .method("POST")
            .uri(format!("/theaters/{theater_id}/reserve"))
            .header("content-type", "application/json")
            .body(Body::from(json!({ "seat_count": 0 }).to_string()))
            .expect("valid zero-seat reserve"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&problem, "input_error");
}

#[tokio::test]
async fn direct_booking_is_idempotent() {
    let app = test_app();
    let theater_id = create_theater(&app, 50).await;

    let book = |key: &'static str, seat_count: u32| {
        Request::builder()
            .method("POST")
            .uri(format!("/theaters/{theater_id}/book"))
            .header("content-type", "application/json")
            .header("Idempotency-Key", key)
            .body(Body::from(
                json!({ "kind": "new", "seat_count": seat_count }).to_string(),
            ))
            .expect("valid book request")
    };

    let (status, first) = request_json(app.clone(), book("order-1", 5)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first.get("state").and_then(Value::as_str), Some("booked"));
    assert_eq!(first.get("key").and_then(Value::as_str), Some("order-1"));
    assert!(first.get("expires_at").is_none());

    let (status, replay) = request_json(app.clone(), book("order-1", 5)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay, first);

    // same key, different request
    let (status, problem) = request_json(app.clone(), book("order-1", 6)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_error(&problem, "idempotency_conflict");

    // one deduction in total
    let (_, seats) = request_json(
        app,
        Request::builder()
            .uri(format!("/theaters/{theater_id}/seats"))
            .body(Body::empty())
            .expect("valid seats request"),
    )
    .await;
    assert_eq!(
        seats.get("remaining_seats").and_then(Value::as_u64),
        Some(45)
    );
}

#[tokio::test]
async fn idempotency_key_header_is_validated() {
    let app = test_app();
    let theater_id = create_theater(&app, 10).await;

    let body = || Body::from(json!({ "kind": "new", "seat_count": 1 }).to_string());

    // absent header
    let (status, problem) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri(format!("/theaters/{theater_id}/book"))
            .header("content-type", "application/json")
            .body(body())
            .expect("valid headerless request"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&problem, "input_error");
    assert_eq!(
        problem.get("error").and_then(Value::as_str),
        Some(IDEMPOTENCY_KEY_REQUIRED_MESSAGE)
    );

    // blank header
    let (status, problem) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri(format!("/theaters/{theater_id}/book"))
            .header("content-type", "application/json")
            .header("Idempotency-Key", "   ")
            .body(body())
            .expect("valid blank-header request"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        problem.get("error").and_then(Value::as_str),
        Some(IDEMPOTENCY_KEY_REQUIRED_MESSAGE)
    );

    // non-ASCII header bytes
    let (status, problem) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri(format!("/theaters/{theater_id}/book"))
            .header("content-type", "application/json")
            .header("Idempotency-Key", "ключ-1".as_bytes())
            .body(body())
            .expect("valid non-ascii-header request"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        problem.get("error").and_then(Value::as_str),
        Some(IDEMPOTENCY_KEY_INVALID_MESSAGE)
    );

    // oversized header
    let oversized = "k".repeat(IDEMPOTENCY_KEY_MAX_LEN + 1);
    let (status, problem) = request_json(
        app,
        Request::builder()
            .method("POST")
            .uri(format!("/theaters/{theater_id}/book"))
            .header("content-type", "application/json")
            .header("Idempotency-Key", oversized)
            .body(body())
            .expect("valid oversized-header request"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        problem.get("error").and_then(Value::as_str),
        Some(IDEMPOTENCY_KEY_TOO_LONG_MESSAGE)
    );
}

#[tokio::test]
async fn reservation_confirm_and_cancel_flow() {
    let app = test_app();
    let theater_id = create_theater(&app, 12).await;

    let (_, reservation) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri(format!("/theaters/{theater_id}/reserve"))
            .header("content-type", "application/json")
            .body(Body::from(json!({ "seat_count": 5 }).to_string()))
            .expect("valid reserve request"),
    )
    .await;
    let key = reservation
        .get("key")
        .and_then(Value::as_str)
        .expect("reservation key")
        .to_string();

    // confirmation needs no idempotency header
    let (status, booked) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri(format!("/theaters/{theater_id}/book"))
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "kind": "confirm_reservation", "reservation_key": key }).to_string(),
            ))
            .expect("valid confirm request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booked.get("state").and_then(Value::as_str), Some("booked"));
    assert!(booked.get("expires_at").is_none());

    // the booking is queryable and no longer cancellable
    let (status, fetched) = request_json(
        app.clone(),
        Request::builder()
            .uri(format!("/bookings/{key}", key = booked["key"].as_str().unwrap()))
            .body(Body::empty())
            .expect("valid booking request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, booked);

    let (status, problem) = request_json(
        app.clone(),
        Request::builder()
            .method("DELETE")
            .uri(format!("/reservations/{key}", key = booked["key"].as_str().unwrap()))
            .body(Body::empty())
            .expect("valid cancel request"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_error(&problem, "conflict");

    // a second hold cancels cleanly and returns its seats
    let (_, hold) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri(format!("/theaters/{theater_id}/reserve"))
            .header("content-type", "application/json")
            .body(Body::from(json!({ "seat_count": 3 }).to_string()))
            .expect("valid reserve request"),
    )
    .await;
    let hold_key = hold.get("key").and_then(Value::as_str).unwrap();

    let (status, cancelled) = request_json(
        app.clone(),
        Request::builder()
            .method("DELETE")
            .uri(format!("/reservations/{hold_key}"))
            .body(Body::empty())
            .expect("valid cancel request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        cancelled.get("state").and_then(Value::as_str),
        Some("cancelled")
    );

    let (_, seats) = request_json(
        app,
        Request::builder()
            .uri(format!("/theaters/{theater_id}/seats"))
            .body(Body::empty())
            .expect("valid seats request"),
    )
    .await;
    assert_eq!(
        seats.get("remaining_seats").and_then(Value::as_u64),
        Some(7)
    );
}

#[tokio::test]
async fn confirming_lapsed_reservation_fails() {
    let (app, clock) = manual_app(60);
    let theater_id = create_theater(&app, 10).await;

    let (_, reservation) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri(format!("/theaters/{theater_id}/reserve"))
            .header("content-type", "application/json")
            .body(Body::from(json!({ "seat_count": 4 }).to_string()))
            .expect("valid reserve request"),
    )
    .await;
    let key = reservation.get("key").and_then(Value::as_str).unwrap();

    clock.advance(chrono::Duration::seconds(61));

    let (status, problem) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri(format!("/theaters/{theater_id}/book"))
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "kind": "confirm_reservation", "reservation_key": key }).to_string(),
            ))
            .expect("valid confirm request"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&problem, "reservation_expired");

    // the lapsed hold gave its seats back
    let (_, seats) = request_json(
        app,
        Request::builder()
            .uri(format!("/theaters/{theater_id}/seats"))
            .body(Body::empty())
            .expect("valid seats request"),
    )
    .await;
    assert_eq!(
        seats.get("remaining_seats").and_then(Value::as_u64),
        Some(10)
    );
}

#[tokio::test]
async fn unknown_keys_and_theaters_are_not_found() {
    let app = test_app();
    let theater_id = create_theater(&app, 10).await;

    let (status, problem) = request_json(
        app.clone(),
        Request::builder()
            .uri("/bookings/ghost")
            .body(Body::empty())
            .expect("valid booking request"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error(&problem, "not_found");

    let (status, problem) = request_json(
        app.clone(),
        Request::builder()
            .method("DELETE")
            .uri("/reservations/ghost")
            .body(Body::empty())
            .expect("valid cancel request"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error(&problem, "not_found");

    let (status, problem) = request_json(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri(format!("/theaters/{theater_id}/book"))
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "kind": "confirm_reservation", "reservation_key": "ghost" }).to_string(),
            ))
            .expect("valid confirm request"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error(&problem, "not_found");

    let (status, problem) = request_json(
        app,
        Request::builder()
            .method("POST")
            .uri("/theaters/9999/reserve")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "seat_count": 1 }).to_string()))
            .expect("valid reserve request"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error(&problem, "not_found");
}
