use crate::cache::{AvailabilityCache, SeatSnapshot};
use crate::config::EngineConfig;
use crate::core::{Clock, EngineError, Result, SystemClock};
use crate::ledger::{BookingKey, BookingLedger, BookingRecord, BookingState};
use crate::storage::{Theater, TheaterId, TheaterStore};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

// ============================================================================
// SWEEP REPORT / STATS
// ============================================================================

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpirySweepReport {
    /// Reservations whose deadline had passed when the sweep started.
    pub due: usize,
    /// Holds this sweep actually reclaimed.
    pub expired: usize,
    /// Due records that were confirmed or cancelled before the sweep
    /// reached them.
    pub skipped: usize,
    /// Due records whose release failed; left for the next sweep.
    pub failed: usize,
}

impl fmt::Display for ExpirySweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} due, {} expired, {} skipped, {} failed",
            self.due, self.expired, self.skipped, self.failed
        )
    }
}

/// Point-in-time counters across the whole engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookingStats {
    pub theaters: usize,
    pub reserved: usize,
    pub booked: usize,
    pub expired: usize,
    pub cancelled: usize,
}

impl fmt::Display for BookingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Booking Stats: {} theaters, {} reserved, {} booked, {} expired, {} cancelled",
            self.theaters, self.reserved, self.booked, self.expired, self.cancelled
        )
    }
}

// ============================================================================
// BOOKING ENGINE
// ============================================================================

/// In-memory seat inventory and booking orchestrator.
///
/// Owns the theater store, the booking ledger and the availability cache,
/// and is the only place that touches more than one of them in a single
/// operation. Seat math for a theater happens under that theater's write
/// lock, and the cache entry is refreshed before the lock is released, so
/// readers never observe a count the ledger does not back.
///
/// All methods take `&self`; share the engine with `Arc` across tasks.
///
/// # Examples
///
/// ```
/// use boxoffice::engine::BookingEngine;
///
/// tokio_test::block_on(async {
///     let engine = BookingEngine::new();
///     let theater = engine.create_theater(100).await.unwrap();
///
///     let reservation = engine.reserve(theater.id, 4, None).await.unwrap();
///     assert_eq!(engine.availability(theater.id).await.unwrap().remaining_seats, 96);
///
///     let booked = engine.confirm_reservation(&reservation.key).await.unwrap();
///     assert!(booked.state.is_terminal());
/// });
/// ```
pub struct BookingEngine {
    theaters: RwLock<TheaterStore>,
    ledger: BookingLedger,
    cache: AvailabilityCache,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl BookingEngine {
    pub fn new() -> Self {
        Self::assemble(EngineConfig::default(), Arc::new(SystemClock))
    }

    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        Ok(Self::assemble(config, Arc::new(SystemClock)))
    }

    /// Build an engine on an injected clock. Tests pair this with
    /// [`ManualClock`] to drive expiry deterministically.
    ///
    /// [`ManualClock`]: crate::core::ManualClock
    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        Ok(Self::assemble(config, clock))
    }

    fn assemble(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            theaters: RwLock::new(TheaterStore::new()),
            ledger: BookingLedger::new(),
            cache: AvailabilityCache::new(config.cache_capacity),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // THEATER ADMINISTRATION
    // ========================================================================

    pub async fn create_theater(&self, total_seats: u32) -> Result<Theater> {
        let theater = {
            let mut store = self.theaters.write().await;
            store.create_theater(total_seats)?
        };
        self.cache.put(theater.id, theater.remaining_seats)?;

        info!(theater_id = %theater.id, total_seats, "theater created");
        Ok(theater)
    }

    pub async fn list_theaters(&self) -> Vec<Theater> {
        let store = self.theaters.read().await;
        store.snapshot().await
    }

    /// Remaining seats for a theater, served from the cache when possible.
    pub async fn availability(&self, theater_id: TheaterId) -> Result<SeatSnapshot> {
        if let Some(snapshot) = self.cache.get(theater_id)? {
            return Ok(snapshot);
        }

        // Version is taken before the store read, so a mutation racing this
        // fill always carries the newer version and wins in the cache.
        let version = self.cache.next_version();

        let handle = {
            let store = self.theaters.read().await;
            store.get_theater(theater_id)?
        };
        let remaining = handle.read().await.remaining_seats;

        self.cache.fill(theater_id, remaining, version)
    }

    // ========================================================================
    // RESERVE / BOOK
    // ========================================================================

    /// Place a timed hold on `seat_count` seats.
    ///
    /// Seats are deducted immediately; the hold expires
    /// `config.reservation_ttl` later unless confirmed or cancelled first.
    /// The reservation key is generated server-side and returned in the
    /// record.
    pub async fn reserve(
        &self,
        theater_id: TheaterId,
        seat_count: u32,
        customer_email: Option<String>,
    ) -> Result<BookingRecord> {
        validate_seat_count(seat_count)?;

        let handle = {
            let store = self.theaters.read().await;
            store.get_theater(theater_id)?
        };
        let mut theater = handle.write().await;

        theater.try_adjust_remaining(-i64::from(seat_count))?;

        let now = self.clock.now();
        let record = BookingRecord::new_reservation(
            BookingKey::fresh(),
            theater_id,
            seat_count,
            customer_email,
            now + self.reservation_ttl(),
            now,
        );

        let stored = match self.ledger.insert(record).await {
            Ok(stored) => stored,
            Err(error) => {
                // Freshly generated key collided; undo the hold.
                theater.try_adjust_remaining(i64::from(seat_count))?;
                return Err(error);
            }
        };
        self.cache.put(theater_id, theater.remaining_seats)?;
        drop(theater);

        info!(
            key = %stored.key,
            theater_id = %theater_id,
            seat_count,
            "reservation created"
        );
        Ok(stored)
    }

    /// Book seats directly under a client-supplied idempotency key.
    ///
    /// Replaying the same key with the same parameters returns the stored
    /// record without touching seat counts; the same key with different
    /// parameters, or a key that belongs to a reservation, is an
    /// [`IdempotencyConflict`].
    ///
    /// [`IdempotencyConflict`]: EngineError::IdempotencyConflict
    pub async fn book(
        &self,
        theater_id: TheaterId,
        key: BookingKey,
        seat_count: u32,
        customer_email: Option<String>,
    ) -> Result<BookingRecord> {
        validate_seat_count(seat_count)?;

        if let Some(existing) = self.ledger.find(&key).await {
            return Self::replay_or_conflict(
                existing,
                theater_id,
                seat_count,
                customer_email.as_deref(),
            );
        }

        let handle = {
            let store = self.theaters.read().await;
            store.get_theater(theater_id)?
        };
        let mut theater = handle.write().await;

        theater.try_adjust_remaining(-i64::from(seat_count))?;

        let record = BookingRecord::new_booking(
            key.clone(),
            theater_id,
            seat_count,
            customer_email.clone(),
            self.clock.now(),
        );

        let stored = match self.ledger.insert(record).await {
            Ok(stored) => stored,
            Err(error) => {
                // Lost the insert race to a concurrent request using the
                // same key; undo the deduction and fall back to replay
                // handling.
                theater.try_adjust_remaining(i64::from(seat_count))?;
                self.cache.put(theater_id, theater.remaining_seats)?;
                drop(theater);

                if !matches!(error, EngineError::DuplicateKey(_)) {
                    return Err(error);
                }
                let existing = self.ledger.get(&key).await?;
                return Self::replay_or_conflict(
                    existing,
                    theater_id,
                    seat_count,
                    customer_email.as_deref(),
                );
            }
        };
        self.cache.put(theater_id, theater.remaining_seats)?;
        drop(theater);

        info!(key = %stored.key, theater_id = %theater_id, seat_count, "booking created");
        Ok(stored)
    }

    /// Idempotent replay: an identical already-booked request returns the
    /// stored record, anything else conflicts.
    fn replay_or_conflict(
        existing: BookingRecord,
        theater_id: TheaterId,
        seat_count: u32,
        customer_email: Option<&str>,
    ) -> Result<BookingRecord> {
        if existing.state == BookingState::Booked
            && existing.matches_request(theater_id, seat_count, customer_email)
        {
            return Ok(existing);
        }
        Err(EngineError::IdempotencyConflict(existing.key))
    }

    // ========================================================================
    // CONFIRM / CANCEL / EXPIRE
    // ========================================================================

    /// Turn a live reservation into a booking. Seats were already deducted
    /// at reserve time, so no seat math happens here.
    ///
    /// # Errors
    /// `BookingNotFound` for an unknown key; `ReservationExpired` when the
    /// hold has lapsed or already left the reserved state.
    pub async fn confirm_reservation(&self, key: &BookingKey) -> Result<BookingRecord> {
        let record = self.ledger.get(key).await?;

        if record.state != BookingState::Reserved {
            return Err(EngineError::ReservationExpired(key.clone()));
        }

        if record.is_expired(self.clock.now()) {
            // Deadline passed but the sweep has not claimed it yet; reclaim
            // the seats now instead of waiting for the worker.
            self.expire_reservation(key).await?;
            return Err(EngineError::ReservationExpired(key.clone()));
        }

        match self
            .ledger
            .compare_and_transition(key, BookingState::Reserved, BookingState::Booked)
            .await
        {
            Ok(confirmed) => {
                info!(key = %confirmed.key, theater_id = %confirmed.theater_id, "reservation confirmed");
                Ok(confirmed)
            }
            // Raced the sweep or a cancel and lost.
            Err(EngineError::StateConflict { .. }) => {
                Err(EngineError::ReservationExpired(key.clone()))
            }
            Err(error) => Err(error),
        }
    }

    /// Cancel a live reservation and return its seats to the pool.
    pub async fn cancel_reservation(&self, key: &BookingKey) -> Result<BookingRecord> {
        let cancelled = self
            .ledger
            .compare_and_transition(key, BookingState::Reserved, BookingState::Cancelled)
            .await?;

        let remaining = self
            .release_seats(cancelled.theater_id, cancelled.seat_count)
            .await?;

        info!(
            key = %cancelled.key,
            theater_id = %cancelled.theater_id,
            seat_count = cancelled.seat_count,
            remaining,
            "reservation cancelled"
        );
        Ok(cancelled)
    }

    /// Move one overdue reservation to `Expired` and return its seats.
    ///
    /// `Ok(None)` means another path (confirm, cancel, a concurrent sweep)
    /// claimed the record first.
    async fn expire_reservation(&self, key: &BookingKey) -> Result<Option<BookingRecord>> {
        let expired = match self
            .ledger
            .compare_and_transition(key, BookingState::Reserved, BookingState::Expired)
            .await
        {
            Ok(expired) => expired,
            Err(EngineError::StateConflict { .. }) | Err(EngineError::BookingNotFound(_)) => {
                return Ok(None);
            }
            Err(error) => return Err(error),
        };

        self.release_seats(expired.theater_id, expired.seat_count)
            .await?;
        Ok(Some(expired))
    }

    /// One expiry sweep over every overdue reservation.
    ///
    /// A failure on one record is logged and counted, never aborts the
    /// sweep.
    pub async fn run_expiry_tick(&self) -> ExpirySweepReport {
        let now = self.clock.now();
        let due = self.ledger.reserved_due(now).await;

        let mut report = ExpirySweepReport {
            due: due.len(),
            ..ExpirySweepReport::default()
        };

        for key in due {
            match self.expire_reservation(&key).await {
                Ok(Some(expired)) => {
                    report.expired += 1;
                    info!(
                        key = %expired.key,
                        theater_id = %expired.theater_id,
                        seat_count = expired.seat_count,
                        "reservation expired"
                    );
                }
                Ok(None) => report.skipped += 1,
                Err(error) => {
                    report.failed += 1;
                    error!(key = %key, %error, "failed to expire reservation");
                }
            }
        }

        report
    }

    // ========================================================================
    // INTROSPECTION
    // ========================================================================

    pub async fn booking(&self, key: &BookingKey) -> Result<BookingRecord> {
        self.ledger.get(key).await
    }

    /// Seats currently held against a theater by reserved and booked
    /// records. Always equals `total_seats - remaining_seats`.
    pub async fn seats_held(&self, theater_id: TheaterId) -> u32 {
        self.ledger.seats_held(theater_id).await
    }

    pub async fn stats(&self) -> BookingStats {
        let theaters = {
            let store = self.theaters.read().await;
            store.theater_count()
        };
        let ledger = self.ledger.stats().await;

        BookingStats {
            theaters,
            reserved: ledger.reserved,
            booked: ledger.booked,
            expired: ledger.expired,
            cancelled: ledger.cancelled,
        }
    }

    /// Give seats back to a theater and refresh its cache entry under the
    /// theater's write lock.
    async fn release_seats(&self, theater_id: TheaterId, seat_count: u32) -> Result<u32> {
        let handle = {
            let store = self.theaters.read().await;
            store.get_theater(theater_id)?
        };
        let mut theater = handle.write().await;

        let remaining = theater.try_adjust_remaining(i64::from(seat_count))?;
        self.cache.put(theater_id, remaining)?;
        Ok(remaining)
    }

    fn reservation_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.config.reservation_ttl.as_secs() as i64)
    }
}

impl Default for BookingEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_seat_count(seat_count: u32) -> Result<()> {
    if seat_count == 0 {
        return Err(EngineError::InvalidRequest(
            "seat_count must be at least 1".to_string(),
        ));
    }
    Ok(())
}
