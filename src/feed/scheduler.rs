// src/feed/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::display::RenderSurface;
use crate::feed::types::EventProvider;
use crate::gate::{GateDecision, RefreshGate};
use crate::store::KvStore;

#[derive(Clone, Copy, Debug)]
pub struct RefreshSchedulerCfg {
    pub interval: Duration,
}

impl Default for RefreshSchedulerCfg {
    fn default() -> Self {
        // The widget's automatic cadence.
        Self {
            interval: Duration::from_secs(30 * 60),
        }
    }
}

/// Spawn the periodic refresh loop. Every tick goes through the same gate as
/// a user-triggered refresh, so timer and button share one cooldown.
pub fn spawn_refresh_scheduler(
    cfg: RefreshSchedulerCfg,
    providers: Arc<Vec<Box<dyn EventProvider>>>,
    store: Arc<dyn KvStore>,
    surface: Arc<dyn RenderSurface>,
    gate: RefreshGate,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.interval);
        loop {
            ticker.tick().await;
            let now_ms = chrono::Utc::now().timestamp_millis();

            match gate.try_refresh(now_ms) {
                GateDecision::Cooldown { remaining_ms } => {
                    tracing::debug!(remaining_ms, "scheduled refresh skipped, cooldown active");
                    continue;
                }
                GateDecision::Allowed => {}
            }

            let feed =
                crate::feed::run_refresh(now_ms, &providers, store.as_ref(), surface.as_ref())
                    .await;
            counter!("feed_refresh_runs_total").increment(1);

            tracing::info!(
                target: "feed",
                kept = feed.records.len(),
                "scheduled refresh tick"
            );
        }
    })
}
