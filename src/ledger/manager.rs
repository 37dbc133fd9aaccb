// ============================================================================
// Booking Ledger
// ============================================================================

use super::record::{BookingKey, BookingRecord, BookingState};
use crate::core::{EngineError, Result};
use crate::storage::theater::TheaterId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Owns every booking/reservation record, keyed by idempotency/reservation
/// key. Records are mutated in place through [`compare_and_transition`] and
/// handed out as clones only.
///
/// The internal lock is never held across a return or while waiting on any
/// other lock, so callers may invoke the ledger while holding a theater
/// guard without ordering hazards.
///
/// [`compare_and_transition`]: BookingLedger::compare_and_transition
pub struct BookingLedger {
    records: RwLock<HashMap<BookingKey, BookingRecord>>,
}

impl BookingLedger {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a new record.
    ///
    /// # Errors
    /// `DuplicateKey` if the key is already present; the stored record is
    /// left untouched.
    pub async fn insert(&self, record: BookingRecord) -> Result<BookingRecord> {
        let mut records = self.records.write().await;

        if records.contains_key(&record.key) {
            return Err(EngineError::DuplicateKey(record.key));
        }

        let stored = record.clone();
        records.insert(record.key.clone(), record);
        Ok(stored)
    }

    /// Look up a record, `None` when absent.
    pub async fn find(&self, key: &BookingKey) -> Option<BookingRecord> {
        let records = self.records.read().await;
        records.get(key).cloned()
    }

    /// Look up a record that must exist.
    pub async fn get(&self, key: &BookingKey) -> Result<BookingRecord> {
        self.find(key)
            .await
            .ok_or_else(|| EngineError::BookingNotFound(key.clone()))
    }

    /// Atomically move a record from `expected` to `next`.
    ///
    /// The transition only succeeds while the record is still in `expected`,
    /// so two racing transitions (confirm vs expiry, cancel vs expiry) have
    /// exactly one winner. Leaving `Reserved` clears `expires_at`.
    ///
    /// # Errors
    /// `BookingNotFound` when the key is absent; `StateConflict` carrying
    /// the actual state when the record has already moved on.
    pub async fn compare_and_transition(
        &self,
        key: &BookingKey,
        expected: BookingState,
        next: BookingState,
    ) -> Result<BookingRecord> {
        let mut records = self.records.write().await;

        let record = records
            .get_mut(key)
            .ok_or_else(|| EngineError::BookingNotFound(key.clone()))?;

        if record.state != expected {
            return Err(EngineError::StateConflict {
                key: key.clone(),
                expected,
                actual: record.state,
            });
        }

        record.state = next;
        if next != BookingState::Reserved {
            record.expires_at = None;
        }

        Ok(record.clone())
    }

    /// Keys of reservations whose deadline has passed as of `now`.
    pub async fn reserved_due(&self, now: DateTime<Utc>) -> Vec<BookingKey> {
        let records = self.records.read().await;
        records
            .values()
            .filter(|record| record.is_expired(now))
            .map(|record| record.key.clone())
            .collect()
    }

    /// Seats currently held against a theater (reserved + booked records).
    pub async fn seats_held(&self, theater_id: TheaterId) -> u32 {
        let records = self.records.read().await;
        records
            .values()
            .filter(|record| {
                record.theater_id == theater_id
                    && matches!(record.state, BookingState::Reserved | BookingState::Booked)
            })
            .map(|record| record.seat_count)
            .sum()
    }

    /// Per-state record counts.
    pub async fn stats(&self) -> LedgerStats {
        let records = self.records.read().await;

        let mut stats = LedgerStats::default();
        for record in records.values() {
            match record.state {
                BookingState::Reserved => stats.reserved += 1,
                BookingState::Booked => stats.booked += 1,
                BookingState::Expired => stats.expired += 1,
                BookingState::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}

impl Default for BookingLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Record counts by state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub reserved: usize,
    pub booked: usize,
    pub expired: usize,
    pub cancelled: usize,
}

impl LedgerStats {
    pub fn total(&self) -> usize {
        self.reserved + self.booked + self.expired + self.cancelled
    }
}
