// src/feed/mod.rs
pub mod config;
pub mod dedup;
pub mod providers;
pub mod scheduler;
pub mod types;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

use crate::display::{RenderSurface, SurfaceMetadata};
use crate::feed::dedup::DedupIndex;
use crate::feed::types::{AggregatedFeed, EventProvider, EventRecord, TimeWindow};
use crate::store::{KvStore, EVENT_DATA_KEY, LAST_UPDATE_KEY};

/// One-time metrics registration (so series show up on an exporter).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_events_total", "Total events parsed from providers.");
        describe_counter!("feed_kept_total", "Events kept after the cross-provider merge.");
        describe_counter!(
            "feed_dedup_total",
            "Events dropped as cross-provider duplicates."
        );
        describe_counter!("feed_provider_errors_total", "Provider fetch/parse errors.");
        describe_counter!("feed_refresh_runs_total", "Completed refresh runs.");
        describe_histogram!("feed_parse_ms", "Provider parse time in milliseconds.");
        describe_gauge!("feed_last_refresh_ts", "Unix ts when the feed last refreshed.");
    });
}

/// Shorten a place name for the widget row. Names of 30 characters or fewer
/// pass through; longer names are cut at the first comma when it falls within
/// the first 30 characters, otherwise hard-truncated to 27 plus an ellipsis.
pub fn truncate_place(place: &str) -> String {
    let chars: Vec<char> = place.chars().collect();
    if chars.len() <= 30 {
        return place.to_string();
    }
    if let Some(pos) = chars.iter().position(|&c| c == ',') {
        if (1..=30).contains(&pos) {
            return chars[..pos].iter().collect();
        }
    }
    let mut out: String = chars[..27].iter().collect();
    out.push_str("...");
    out
}

/// Merge per-provider batches in priority order through a [`DedupIndex`].
///
/// The first batch is the trusted provider: its records are screened on id
/// only (same-provider records are trusted not to self-duplicate on the
/// coarse key). Later batches are screened on id *and* duplicate key, so an
/// event already reported by an earlier provider is dropped; first-seen wins
/// and no fields are merged. Returns the merged records, sorted descending by
/// time, plus the number of duplicates dropped.
pub fn merge_providers(batches: Vec<Vec<EventRecord>>) -> (Vec<EventRecord>, usize) {
    let mut index = DedupIndex::new();
    let mut merged = Vec::new();
    let mut dropped = 0usize;

    for (priority, batch) in batches.into_iter().enumerate() {
        for rec in batch {
            let duplicate = if priority == 0 {
                index.contains_id(&rec.id)
            } else {
                index.contains(&rec)
            };
            if duplicate {
                dropped += 1;
                continue;
            }
            index.insert(&rec);
            merged.push(rec);
        }
    }

    merged.sort_by_key(|r| std::cmp::Reverse(r.time_ms));
    (merged, dropped)
}

/// Run one full refresh: fetch every provider over the trailing 24 h window,
/// merge, persist, and invalidate the display surface.
///
/// Provider failures are isolated: a failing provider contributes zero
/// records and is logged, never aborting the run. Total failure yields an
/// empty feed so the surface can render an explicit empty state. Nothing here
/// escalates past the refresh boundary — the caller always gets a feed back.
pub async fn run_refresh(
    now_ms: i64,
    providers: &[Box<dyn EventProvider>],
    store: &dyn KvStore,
    surface: &dyn RenderSurface,
) -> AggregatedFeed {
    ensure_metrics_described();
    let window = TimeWindow::trailing_24h(now_ms);

    // Fixed configured order, regardless of fetch completion order, so the
    // first-seen tie-break stays deterministic.
    let mut batches = Vec::with_capacity(providers.len());
    for p in providers {
        match p.fetch_window(&window).await {
            Ok(records) => {
                tracing::debug!(provider = p.name(), count = records.len(), "provider fetched");
                batches.push(records);
            }
            Err(e) => {
                tracing::warn!(error = %e, provider = p.name(), "provider error");
                counter!("feed_provider_errors_total").increment(1);
                batches.push(Vec::new());
            }
        }
    }

    let (records, dedup_cnt) = merge_providers(batches);
    counter!("feed_kept_total").increment(records.len() as u64);
    counter!("feed_dedup_total").increment(dedup_cnt as u64);
    gauge!("feed_last_refresh_ts").set((now_ms / 1000) as f64);

    let feed = AggregatedFeed {
        records,
        last_updated_ms: now_ms,
    };
    persist_feed(store, &feed);

    surface.notify_data_changed();
    surface.update_surface(&SurfaceMetadata::for_feed(&feed));

    tracing::info!(
        kept = feed.records.len(),
        dedup = dedup_cnt,
        "feed refresh complete"
    );
    feed
}

/// Serialized records and the last-update stamp go out as one atomic commit;
/// the display layer never observes one without the other.
fn persist_feed(store: &dyn KvStore, feed: &AggregatedFeed) {
    let payload = match serde_json::to_string(&feed.records) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "serializing feed");
            return;
        }
    };
    store.set(EVENT_DATA_KEY, &payload);
    store.set(LAST_UPDATE_KEY, &feed.last_updated_ms.to_string());
    if let Err(e) = store.commit() {
        tracing::warn!(error = %e, "persisting feed");
    }
}
