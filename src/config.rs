use std::num::NonZeroUsize;
use std::time::Duration;

// ============================================================================
// ENGINE CONFIGURATION
// ============================================================================

const DEFAULT_RESERVATION_TTL_SECS: u64 = 600;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Tunables for the booking engine and its background expiry worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long a reservation holds its seats before a sweep may reclaim it.
    pub reservation_ttl: Duration,
    /// Pause between expiry sweeps.
    pub sweep_interval: Duration,
    /// Maximum number of theaters the availability cache retains.
    pub cache_capacity: NonZeroUsize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reservation_ttl: Duration::from_secs(DEFAULT_RESERVATION_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            // capacity constant is non-zero
            cache_capacity: NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reservation_ttl(mut self, ttl: Duration) -> Self {
        self.reservation_ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Load configuration from `BOXOFFICE_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`] but reads through the given lookup, so tests
    /// can supply variables without touching the process environment.
    ///
    /// [`from_env`]: EngineConfig::from_env
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(secs) = parse_u64(&lookup, "BOXOFFICE_RESERVATION_TTL_SECS")? {
            config.reservation_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_u64(&lookup, "BOXOFFICE_SWEEP_INTERVAL_SECS")? {
            config.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(capacity) = parse_u64(&lookup, "BOXOFFICE_CACHE_CAPACITY")? {
            config.cache_capacity = NonZeroUsize::new(capacity as usize)
                .ok_or_else(|| "BOXOFFICE_CACHE_CAPACITY must be greater than zero".to_string())?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.reservation_ttl.is_zero() {
            return Err("reservation_ttl must be greater than zero".to_string());
        }
        if self.sweep_interval.is_zero() {
            return Err("sweep_interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

fn parse_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<u64>, String> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| format!("{key} must be a non-negative integer, got '{raw}'")),
        None => Ok(None),
    }
}
