use axum::{
    Router,
    routing::{delete, get, post},
};
use http::{HeaderName, Method};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::web::handlers::{
    AppState, book, cancel_reservation, create_theater, get_booking, healthcheck, list_theaters,
    reserve, seat_availability, stats,
};

pub fn build_router(state: AppState) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .route("/health", get(healthcheck))
        .route("/stats", get(stats))
        .route("/theaters", post(create_theater).get(list_theaters))
        .route("/theaters/:theater_id/seats", get(seat_availability))
        .route("/theaters/:theater_id/reserve", post(reserve))
        .route("/theaters/:theater_id/book", post(book))
        .route("/bookings/:booking_key", get(get_booking))
        .route("/reservations/:reservation_key", delete(cancel_reservation))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS]),
        )
        .with_state(state)
}
