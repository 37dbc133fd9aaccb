pub mod manager;
pub mod record;

pub use manager::{BookingLedger, LedgerStats};
pub use record::{BookingKey, BookingRecord, BookingState};
