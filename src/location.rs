// src/location.rs
//! Best-effort current position: a cached last-known fix raced against a
//! live provider fix under a timeout, with exactly-once delivery.
//!
//! Resolution walks `Idle -> ProbingCache -> (ResolvedFromCache |
//! RequestingLive) -> (ResolvedLive | TimedOut | PermissionDenied)`. The one
//! mutual-exclusion primitive is [`DeliveryCell`]: both race arms offer into
//! the same cell and the first writer wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, Notify};

use crate::error::LocationError;

/// A cached fix younger than this resolves immediately, no live request.
pub const FRESH_FIX_MAX_AGE_MS: i64 = 120_000;
/// How long a live request may run before falling back to the cache.
pub const LIVE_FIX_TIMEOUT: Duration = Duration::from_secs(10);

/// Ephemeral position snapshot; produced at most once per resolution and
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: f64,
    pub altitude_m: f64,
    pub speed_mps: f64,
    pub heading_deg: f64,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationProviderId {
    Gps,
    Network,
}

// Primary first: cache-freshness ties and the live subscription both prefer
// Gps.
const PROBE_ORDER: [LocationProviderId; 2] = [LocationProviderId::Gps, LocationProviderId::Network];

/// Device location collaborator. Any call may report
/// [`LocationError::PermissionDenied`], which ends the resolution outright.
pub trait LocationSource: Send + Sync {
    fn is_enabled(&self, provider: LocationProviderId) -> bool;
    fn last_known(
        &self,
        provider: LocationProviderId,
    ) -> Result<Option<LocationFix>, LocationError>;
    fn subscribe(&self, provider: LocationProviderId) -> Result<FixSubscription, LocationError>;
}

/// Live-update stream handle. Dropping it cancels the subscription: the
/// sending side observes a closed channel.
pub struct FixSubscription {
    rx: mpsc::Receiver<LocationFix>,
}

impl FixSubscription {
    /// Channel-backed subscription; the source keeps the sender.
    pub fn channel(capacity: usize) -> (mpsc::Sender<LocationFix>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }

    pub async fn next_fix(&mut self) -> Option<LocationFix> {
        self.rx.recv().await
    }
}

/// Write-at-most-once result cell. Both completion paths of a resolution
/// hold a reference; `offer` is a compare-and-set, so whichever path loses
/// the race becomes a no-op.
#[derive(Debug, Default)]
pub struct DeliveryCell<T> {
    won: AtomicBool,
    slot: Mutex<Option<T>>,
    notify: Notify,
}

impl<T> DeliveryCell<T> {
    pub fn new() -> Self {
        Self {
            won: AtomicBool::new(false),
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// First offer wins and returns true; every later offer is dropped.
    pub fn offer(&self, value: T) -> bool {
        if self.won.swap(true, Ordering::AcqRel) {
            return false;
        }
        *self.slot.lock().expect("delivery cell mutex poisoned") = Some(value);
        self.notify.notify_one();
        true
    }

    /// Wait for the winning offer. Single-consumer.
    pub async fn wait(&self) -> T {
        loop {
            if let Some(value) = self.slot.lock().expect("delivery cell mutex poisoned").take() {
                return value;
            }
            self.notify.notified().await;
        }
    }
}

/// Resolves one coordinate per call, racing cache against live updates.
pub struct LocationResolver<S> {
    source: S,
    timeout: Duration,
}

impl<S: LocationSource> LocationResolver<S> {
    pub fn new(source: S) -> Self {
        Self::with_timeout(source, LIVE_FIX_TIMEOUT)
    }

    pub fn with_timeout(source: S, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Resolve a best-effort position.
    ///
    /// Returns `Ok(None)` when nothing is available (no enabled provider and
    /// no cache, or live timeout with an empty cache) — distinct from
    /// `Err(PermissionDenied)`, which callers surface as a permission prompt
    /// rather than "location unavailable".
    pub async fn resolve(&self, now_ms: i64) -> Result<Option<LocationFix>, LocationError> {
        // ProbingCache: the freshest last-known fix across enabled providers.
        let mut best_cached: Option<LocationFix> = None;
        for id in PROBE_ORDER {
            if !self.source.is_enabled(id) {
                continue;
            }
            if let Some(fix) = self.source.last_known(id)? {
                let newer = best_cached
                    .as_ref()
                    .map_or(true, |best| fix.timestamp_ms > best.timestamp_ms);
                if newer {
                    best_cached = Some(fix);
                }
            }
        }

        if let Some(fix) = &best_cached {
            if now_ms - fix.timestamp_ms < FRESH_FIX_MAX_AGE_MS {
                return Ok(Some(fix.clone()));
            }
        }

        // RequestingLive, from the first enabled provider.
        let Some(live_id) = PROBE_ORDER.into_iter().find(|&id| self.source.is_enabled(id)) else {
            // Nobody to ask: the cached fix (possibly stale) is all we have.
            // No timer is started.
            return Ok(best_cached);
        };
        let mut subscription = self.source.subscribe(live_id)?;

        let cell = Arc::new(DeliveryCell::new());

        let live = {
            let cell = Arc::clone(&cell);
            tokio::spawn(async move {
                if let Some(fix) = subscription.next_fix().await {
                    cell.offer(Some(fix));
                }
                // Subscription drops here, unsubscribing either way.
            })
        };
        let timer = {
            let cell = Arc::clone(&cell);
            let fallback = best_cached.clone();
            let timeout = self.timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                cell.offer(fallback);
            })
        };

        let delivered = cell.wait().await;
        // Cancel the losing arm so neither the subscription nor the timer
        // outlives the resolution.
        live.abort();
        timer.abort();
        Ok(delivered)
    }
}
