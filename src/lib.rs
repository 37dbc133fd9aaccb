// ============================================================================
// Boxoffice Library
// ============================================================================

pub mod cache;
pub mod config;
pub mod core;
pub mod engine;
pub mod ledger;
pub mod storage;
pub mod web;

// Re-export main types for convenience
pub use crate::cache::{AvailabilityCache, SeatSnapshot};
pub use crate::config::EngineConfig;
pub use crate::core::{Clock, EngineError, ManualClock, Result, SystemClock};
pub use crate::engine::{
    BookingEngine, BookingStats, ExpirySweepReport, ReservationExpirer,
    spawn_reservation_expirer,
};
pub use crate::ledger::{BookingKey, BookingLedger, BookingRecord, BookingState};
pub use crate::storage::{Theater, TheaterId, TheaterStore};

// Re-export web surface
pub use crate::web::{AppState, build_router};
