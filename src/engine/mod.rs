pub mod booking;
pub mod expirer;

pub use booking::{BookingEngine, BookingStats, ExpirySweepReport};
pub use expirer::{ReservationExpirer, spawn_reservation_expirer};
