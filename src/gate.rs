// src/gate.rs
use std::sync::Arc;

use crate::store::{KvStore, LAST_REFRESH_KEY};

pub const REFRESH_COOLDOWN_MS: i64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    /// Denied; `remaining_ms` is diagnostic only — no retry is scheduled.
    Cooldown { remaining_ms: i64 },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Cooldown gate in front of the aggregation pipeline. State lives in the
/// key-value store, not in process memory, so every trigger surface shares
/// one cooldown.
#[derive(Clone)]
pub struct RefreshGate {
    store: Arc<dyn KvStore>,
    cooldown_ms: i64,
}

impl RefreshGate {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_cooldown(store, REFRESH_COOLDOWN_MS)
    }

    pub fn with_cooldown(store: Arc<dyn KvStore>, cooldown_ms: i64) -> Self {
        Self { store, cooldown_ms }
    }

    /// Returns whether a refresh may run now. On allow, the timestamp is
    /// committed *before* the caller starts the pipeline, so a concurrent
    /// re-entrant trigger cannot also pass the gate.
    pub fn try_refresh(&self, now_ms: i64) -> GateDecision {
        let last = self
            .store
            .get(LAST_REFRESH_KEY)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);

        let elapsed = now_ms - last;
        if elapsed < self.cooldown_ms {
            let remaining_ms = self.cooldown_ms - elapsed;
            tracing::debug!(remaining_ms, "refresh denied, cooldown active");
            return GateDecision::Cooldown { remaining_ms };
        }

        self.store.set(LAST_REFRESH_KEY, &now_ms.to_string());
        if let Err(e) = self.store.commit() {
            tracing::warn!(error = %e, "persisting refresh timestamp");
        }
        GateDecision::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn second_trigger_within_cooldown_is_denied() {
        let gate = RefreshGate::new(Arc::new(MemoryStore::new()));
        let t0 = 1_700_000_000_000;

        assert!(gate.try_refresh(t0).is_allowed());
        match gate.try_refresh(t0 + 10_000) {
            GateDecision::Cooldown { remaining_ms } => assert_eq!(remaining_ms, 20_000),
            GateDecision::Allowed => panic!("second trigger passed the gate"),
        }
        // 31s after the first: cooldown expired.
        assert!(gate.try_refresh(t0 + 31_000).is_allowed());
    }

    #[test]
    fn allow_updates_the_stamp_before_the_pipeline_runs() {
        let store = Arc::new(MemoryStore::new());
        let gate = RefreshGate::new(Arc::clone(&store) as Arc<dyn KvStore>);
        let t0 = 1_700_000_000_000;

        assert!(gate.try_refresh(t0).is_allowed());
        assert_eq!(store.get(LAST_REFRESH_KEY), Some(t0.to_string()));
    }

    #[test]
    fn missing_or_garbage_stamp_allows() {
        let store = Arc::new(MemoryStore::new());
        store.set(LAST_REFRESH_KEY, "not a number");
        store.commit().unwrap();

        let gate = RefreshGate::new(store);
        assert!(gate.try_refresh(1_700_000_000_000).is_allowed());
    }
}
