// ============================================================================
// Booking Record State Management
// ============================================================================
//
// Implements the State Pattern for the booking/reservation lifecycle.
// Records are created as Reserved (temporary hold) or directly as Booked,
// and move through defined states: Reserved -> Booked/Expired/Cancelled.
//
// Terminal records are never deleted: the ledger doubles as the idempotency
// and audit log, so a key keeps answering with its original outcome.
//
// ============================================================================

use crate::storage::theater::TheaterId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Ledger key: a caller-supplied idempotency key for bookings, or a
/// system-generated reservation id for reservations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BookingKey(String);

impl BookingKey {
    pub fn new(key: impl Into<String>) -> Self {
        BookingKey(key.into())
    }

    /// Generate a fresh reservation key.
    pub fn fresh() -> Self {
        BookingKey(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BookingKey {
    fn from(key: &str) -> Self {
        BookingKey(key.to_string())
    }
}

impl From<String> for BookingKey {
    fn from(key: String) -> Self {
        BookingKey(key)
    }
}

impl std::fmt::Display for BookingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Booking state following the State Pattern
///
/// State transitions:
/// ```text
/// (none) ──reserve──> Reserved ──confirm──> Booked
/// (none) ──book─────────────────────────--> Booked
///   Reserved ──expiry sweep──> Expired
///   Reserved ──cancel────────> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingState {
    /// Temporary hold; the seats are deducted but the record can still
    /// move to any terminal state
    Reserved,

    /// Durable booking; the seats stay deducted
    Booked,

    /// Reclaimed by the expiry sweep; the seats were returned
    Expired,

    /// Released by the caller; the seats were returned
    Cancelled,
}

impl BookingState {
    /// Check if the record can still transition
    pub fn is_active(&self) -> bool {
        matches!(self, BookingState::Reserved)
    }

    /// Check if the record is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingState::Booked | BookingState::Expired | BookingState::Cancelled
        )
    }
}

impl std::fmt::Display for BookingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingState::Reserved => write!(f, "reserved"),
            BookingState::Booked => write!(f, "booked"),
            BookingState::Expired => write!(f, "expired"),
            BookingState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One booking or reservation.
///
/// Owned exclusively by the ledger; every read hands out a clone, so a
/// record can never be mutated behind the ledger's back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingRecord {
    pub key: BookingKey,
    pub theater_id: TheaterId,
    pub seat_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    pub state: BookingState,
    /// Present only while `state == Reserved`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BookingRecord {
    /// Create a reservation: a hold that expires at `expires_at` unless
    /// confirmed first.
    pub fn new_reservation(
        key: BookingKey,
        theater_id: TheaterId,
        seat_count: u32,
        customer_email: Option<String>,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            theater_id,
            seat_count,
            customer_email,
            state: BookingState::Reserved,
            expires_at: Some(expires_at),
            created_at,
        }
    }

    /// Create a direct booking: terminal from the start, no expiry.
    pub fn new_booking(
        key: BookingKey,
        theater_id: TheaterId,
        seat_count: u32,
        customer_email: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            theater_id,
            seat_count,
            customer_email,
            state: BookingState::Booked,
            expires_at: None,
            created_at,
        }
    }

    /// Whether a replayed booking request matches this record's parameters.
    pub fn matches_request(
        &self,
        theater_id: TheaterId,
        seat_count: u32,
        customer_email: Option<&str>,
    ) -> bool {
        self.theater_id == theater_id
            && self.seat_count == seat_count
            && self.customer_email.as_deref() == customer_email
    }

    /// A reservation whose deadline has passed but that the sweep has not
    /// claimed yet.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.state == BookingState::Reserved
            && self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_reservation(now: DateTime<Utc>) -> BookingRecord {
        BookingRecord::new_reservation(
            BookingKey::fresh(),
            TheaterId(1),
            3,
            Some("alice@example.com".to_string()),
            now + Duration::minutes(10),
            now,
        )
    }

    #[test]
    fn test_fresh_keys_are_unique() {
        assert_ne!(BookingKey::fresh(), BookingKey::fresh());
    }

    #[test]
    fn test_state_predicates() {
        assert!(BookingState::Reserved.is_active());
        assert!(!BookingState::Reserved.is_terminal());

        for state in [
            BookingState::Booked,
            BookingState::Expired,
            BookingState::Cancelled,
        ] {
            assert!(state.is_terminal());
            assert!(!state.is_active());
        }
    }

    #[test]
    fn test_state_display_matches_wire_format() {
        assert_eq!(BookingState::Reserved.to_string(), "reserved");
        assert_eq!(
            serde_json::to_string(&BookingState::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn test_reservation_has_expiry_and_booking_does_not() {
        let now = Utc::now();

        let reservation = sample_reservation(now);
        assert_eq!(reservation.state, BookingState::Reserved);
        assert_eq!(reservation.expires_at, Some(now + Duration::minutes(10)));

        let booking =
            BookingRecord::new_booking(BookingKey::new("k1"), TheaterId(1), 2, None, now);
        assert_eq!(booking.state, BookingState::Booked);
        assert_eq!(booking.expires_at, None);
    }

    #[test]
    fn test_is_expired_flips_at_deadline() {
        let now = Utc::now();
        let reservation = sample_reservation(now);

        assert!(!reservation.is_expired(now));
        assert!(!reservation.is_expired(now + Duration::minutes(9)));
        assert!(reservation.is_expired(now + Duration::minutes(10)));
        assert!(reservation.is_expired(now + Duration::hours(1)));
    }

    #[test]
    fn test_matches_request_compares_all_parameters() {
        let now = Utc::now();
        let record = BookingRecord::new_booking(
            BookingKey::new("k1"),
            TheaterId(1),
            2,
            Some("bob@example.com".to_string()),
            now,
        );

        assert!(record.matches_request(TheaterId(1), 2, Some("bob@example.com")));
        assert!(!record.matches_request(TheaterId(2), 2, Some("bob@example.com")));
        assert!(!record.matches_request(TheaterId(1), 3, Some("bob@example.com")));
        assert!(!record.matches_request(TheaterId(1), 2, None));
    }
}
