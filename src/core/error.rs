use crate::ledger::record::{BookingKey, BookingState};
use crate::storage::theater::TheaterId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Theater {0} not found")]
    TheaterNotFound(TheaterId),

    #[error("Booking '{0}' not found")]
    BookingNotFound(BookingKey),

    #[error("Theater {theater_id}: {requested} seats requested, {remaining} remaining")]
    InsufficientSeats {
        theater_id: TheaterId,
        requested: u32,
        remaining: u32,
    },

    #[error("Booking key '{0}' already exists")]
    DuplicateKey(BookingKey),

    #[error("Idempotency conflict for key '{0}': request does not match the stored booking")]
    IdempotencyConflict(BookingKey),

    #[error("Reservation '{0}' has expired")]
    ReservationExpired(BookingKey),

    #[error("Booking '{key}' is {actual}, expected {expected}")]
    StateConflict {
        key: BookingKey,
        expected: BookingState,
        actual: BookingState,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Task error: {0}")]
    TaskError(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl<T> From<std::sync::PoisonError<T>> for EngineError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
