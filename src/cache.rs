use crate::core::Result;
use crate::storage::theater::TheaterId;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Remaining-seat snapshot for one theater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeatSnapshot {
    pub remaining_seats: u32,
    /// Versions come from one cache-global monotonic counter, so for any
    /// theater a higher version is always the fresher value.
    pub version: u64,
}

/// LRU-bounded remaining-seat cache.
///
/// Mutators call [`put`] inside their per-theater critical section, which
/// stamps the entry with a fresh version. The read-through path must call
/// [`next_version`] BEFORE reading the authoritative store and pass that
/// version to [`fill`]; `fill` refuses to replace an entry carrying a
/// version >= its own. Under that ordering a fill that raced a mutation
/// always loses, so a stale store read can never overwrite the mutation's
/// entry.
///
/// Eviction is harmless: the cache is derived state, repopulated on the
/// next miss.
///
/// [`put`]: AvailabilityCache::put
/// [`next_version`]: AvailabilityCache::next_version
/// [`fill`]: AvailabilityCache::fill
pub struct AvailabilityCache {
    entries: Mutex<LruCache<TheaterId, SeatSnapshot>>,
    versions: AtomicU64,
}

impl AvailabilityCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            versions: AtomicU64::new(0),
        }
    }

    /// Cached snapshot for a theater, `None` on miss.
    pub fn get(&self, theater_id: TheaterId) -> Result<Option<SeatSnapshot>> {
        let mut entries = self.entries.lock()?;
        Ok(entries.get(&theater_id).copied())
    }

    /// Allocate the next snapshot version.
    pub fn next_version(&self) -> u64 {
        self.versions.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record the post-mutation remaining count under a fresh version.
    pub fn put(&self, theater_id: TheaterId, remaining_seats: u32) -> Result<SeatSnapshot> {
        let snapshot = SeatSnapshot {
            remaining_seats,
            version: self.next_version(),
        };

        let mut entries = self.entries.lock()?;
        entries.put(theater_id, snapshot);
        Ok(snapshot)
    }

    /// Populate the cache from a store read, keeping whichever entry is
    /// newer. Returns the winning snapshot.
    pub fn fill(
        &self,
        theater_id: TheaterId,
        remaining_seats: u32,
        version: u64,
    ) -> Result<SeatSnapshot> {
        let mut entries = self.entries.lock()?;

        if let Some(current) = entries.get(&theater_id) {
            if current.version >= version {
                return Ok(*current);
            }
        }

        let snapshot = SeatSnapshot {
            remaining_seats,
            version,
        };
        entries.put(theater_id, snapshot);
        Ok(snapshot)
    }
}
