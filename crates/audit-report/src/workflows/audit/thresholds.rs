use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::sources::ThresholdSource;

pub const DEFAULT_OVERALL_THRESHOLD: f64 = 83.0;
pub const DEFAULT_SECTION_THRESHOLD: f64 = 89.0;
pub const DEFAULT_CATEGORY_THRESHOLD: f64 = 83.0;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Pass marks applied at each level of the report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub overall: f64,
    pub section: f64,
    pub category: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            overall: DEFAULT_OVERALL_THRESHOLD,
            section: DEFAULT_SECTION_THRESHOLD,
            category: DEFAULT_CATEGORY_THRESHOLD,
        }
    }
}

/// Thresholds as published by the source; any level may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialThresholds {
    #[serde(default)]
    pub overall: Option<f64>,
    #[serde(default)]
    pub section: Option<f64>,
    #[serde(default)]
    pub category: Option<f64>,
}

impl PartialThresholds {
    /// Fills absent or out-of-range levels from the static defaults.
    pub fn resolve(self) -> Thresholds {
        let defaults = Thresholds::default();
        Thresholds {
            overall: usable(self.overall).unwrap_or(defaults.overall),
            section: usable(self.section).unwrap_or(defaults.section),
            category: usable(self.category).unwrap_or(defaults.category),
        }
    }
}

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|threshold| threshold.is_finite() && (0.0..=100.0).contains(threshold))
}

#[derive(Debug, Clone, Copy)]
struct CachedThresholds {
    value: Thresholds,
    expires_at: Instant,
}

/// Caller-owned, time-boxed threshold cache.
///
/// Shared behind an `Arc` by every report generation. Refreshes are
/// serialized: while one caller reads the source, others keep serving the
/// expired value if there is one, and wait for the refresh on a cold cache.
pub struct ThresholdProvider {
    source: Arc<dyn ThresholdSource>,
    ttl: Duration,
    cache: RwLock<Option<CachedThresholds>>,
    refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for ThresholdProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThresholdProvider")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ThresholdProvider {
    pub fn new(source: Arc<dyn ThresholdSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_default_ttl(source: Arc<dyn ThresholdSource>) -> Self {
        Self::new(source, DEFAULT_CACHE_TTL)
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds_at(Instant::now())
    }

    pub fn thresholds_at(&self, now: Instant) -> Thresholds {
        let cached = self.cached();
        if let Some(entry) = cached {
            if now < entry.expires_at {
                debug!("threshold cache hit");
                return entry.value;
            }
        }

        let _guard = match cached {
            Some(stale) => match self.refresh_lock.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    debug!("threshold refresh in progress; serving expired value");
                    return stale.value;
                }
            },
            None => self
                .refresh_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        };

        // Another caller may have refreshed while this one waited.
        if let Some(entry) = self.cached() {
            if now < entry.expires_at {
                return entry.value;
            }
        }

        self.refresh(now)
    }

    fn cached(&self) -> Option<CachedThresholds> {
        *self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh(&self, now: Instant) -> Thresholds {
        match self.source.thresholds() {
            Ok(partial) => {
                let value = partial.resolve();
                debug!(?value, "threshold cache refreshed");
                *self.cache.write().unwrap_or_else(PoisonError::into_inner) =
                    Some(CachedThresholds {
                        value,
                        expires_at: now + self.ttl,
                    });
                value
            }
            Err(err) => {
                warn!(%err, "threshold source unavailable; using static defaults");
                Thresholds::default()
            }
        }
    }
}
