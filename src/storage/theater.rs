use crate::core::{EngineError, Result};
use serde::Serialize;

/// Unique identifier for a theater
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TheaterId(pub u64);

impl TheaterId {
    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TheaterId {
    fn from(raw: u64) -> Self {
        TheaterId(raw)
    }
}

impl std::fmt::Display for TheaterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A theater with a fungible pool of seats.
///
/// `remaining_seats` is the only mutable field and is only ever changed
/// through [`Theater::try_adjust_remaining`], which keeps it inside
/// `[0, total_seats]`. Every booking, reservation, cancellation and expiry
/// funnels through that one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theater {
    pub id: TheaterId,
    pub total_seats: u32,
    pub remaining_seats: u32,
}

impl Theater {
    pub fn new(id: TheaterId, total_seats: u32) -> Self {
        Self {
            id,
            total_seats,
            remaining_seats: total_seats,
        }
    }

    /// Apply a signed seat-count delta, rejecting any result outside
    /// `[0, total_seats]`.
    ///
    /// Negative deltas take seats (booking/reserving), positive deltas give
    /// them back (cancel/expiry). Returns the new remaining count.
    ///
    /// # Errors
    /// `InsufficientSeats` when the delta would drop below zero;
    /// `ConstraintViolation` when a release would exceed capacity.
    pub fn try_adjust_remaining(&mut self, delta: i64) -> Result<u32> {
        let adjusted = i64::from(self.remaining_seats) + delta;

        if adjusted < 0 {
            return Err(EngineError::InsufficientSeats {
                theater_id: self.id,
                requested: delta.unsigned_abs() as u32,
                remaining: self.remaining_seats,
            });
        }

        if adjusted > i64::from(self.total_seats) {
            return Err(EngineError::ConstraintViolation(format!(
                "releasing {} seats would exceed capacity {} of theater {}",
                delta, self.total_seats, self.id
            )));
        }

        self.remaining_seats = adjusted as u32;
        Ok(self.remaining_seats)
    }

    pub fn is_sold_out(&self) -> bool {
        self.remaining_seats == 0
    }
}
