// src/display.rs
//! Read side of the persisted feed: classified, time-relative items for a
//! recycled list surface. Data is re-read in full on every invalidation; no
//! incremental diffing.

use chrono::{Local, TimeZone};

use crate::feed::types::{AggregatedFeed, EventRecord};
use crate::store::{KvStore, EVENT_DATA_KEY, LAST_UPDATE_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagnitudeTier {
    Low,
    Medium,
    High,
}

impl MagnitudeTier {
    pub fn for_magnitude(magnitude: f64) -> Self {
        if magnitude >= 7.0 {
            Self::High
        } else if magnitude >= 5.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Human age of an event relative to `now_ms`.
pub fn relative_time_label(time_ms: i64, now_ms: i64) -> String {
    if time_ms <= 0 {
        return "Unknown time".to_string();
    }

    let diff = now_ms - time_ms;
    let minutes = diff / (60 * 1000);
    let hours = diff / (60 * 60 * 1000);

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else {
        Local
            .timestamp_millis_opt(time_ms)
            .single()
            .map(|dt| dt.format("%b %-d").to_string())
            .unwrap_or_else(|| "Unknown time".to_string())
    }
}

/// One renderable row: the record plus presentation-only derived fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayItem {
    pub record: EventRecord,
    pub tier: MagnitudeTier,
    /// Magnitude rendered to one decimal for the badge.
    pub magnitude_label: String,
    pub relative_time: String,
}

impl DisplayItem {
    pub fn from_record(record: EventRecord, now_ms: i64) -> Self {
        let tier = MagnitudeTier::for_magnitude(record.magnitude);
        let magnitude_label = format!("{:.1}", record.magnitude);
        let relative_time = relative_time_label(record.time_ms, now_ms);
        Self {
            record,
            tier,
            magnitude_label,
            relative_time,
        }
    }
}

/// Header-level metadata for the hosting surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceMetadata {
    pub item_count: usize,
    /// Local "HH:MM" of the last refresh, or "--:--" before the first one.
    pub last_updated_label: String,
}

impl SurfaceMetadata {
    pub fn new(item_count: usize, last_updated_ms: i64) -> Self {
        let last_updated_label = if last_updated_ms > 0 {
            Local
                .timestamp_millis_opt(last_updated_ms)
                .single()
                .map(|dt| dt.format("%H:%M").to_string())
                .unwrap_or_else(|| "--:--".to_string())
        } else {
            "--:--".to_string()
        };
        Self {
            item_count,
            last_updated_label,
        }
    }

    pub fn for_feed(feed: &AggregatedFeed) -> Self {
        Self::new(feed.records.len(), feed.last_updated_ms)
    }
}

/// The rendering host. Implementations re-pull via [`EventList`] when
/// notified; an empty list renders an explicit empty state, never an error.
pub trait RenderSurface: Send + Sync {
    fn notify_data_changed(&self);
    fn update_surface(&self, metadata: &SurfaceMetadata);
}

/// Positional view over the persisted feed.
#[derive(Debug, Default)]
pub struct EventList {
    records: Vec<EventRecord>,
    last_updated_ms: i64,
}

impl EventList {
    pub fn load(store: &dyn KvStore) -> Self {
        let mut list = Self::default();
        list.reload(store);
        list
    }

    /// Full re-read of the persisted feed (the data-changed path). Unreadable
    /// data degrades to an empty list.
    pub fn reload(&mut self, store: &dyn KvStore) {
        let raw = store
            .get(EVENT_DATA_KEY)
            .unwrap_or_else(|| "[]".to_string());
        self.records = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable persisted feed, showing empty state");
                Vec::new()
            }
        };
        self.last_updated_ms = store
            .get(LAST_UPDATE_KEY)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record_at(&self, position: usize, now_ms: i64) -> Option<DisplayItem> {
        self.records
            .get(position)
            .cloned()
            .map(|record| DisplayItem::from_record(record, now_ms))
    }

    /// Stable per-position identity for the host's view recycling.
    pub fn item_id(&self, position: usize) -> i64 {
        position as i64
    }

    pub fn metadata(&self) -> SurfaceMetadata {
        SurfaceMetadata::new(self.records.len(), self.last_updated_ms)
    }
}
