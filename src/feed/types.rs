// src/feed/types.rs
use chrono::{TimeZone, Utc};

use crate::error::ProviderError;

/// One normalized seismic event, identical across providers.
///
/// Serialized field names are the persisted wire contract: the display layer
/// reads back exactly `id, magnitude, place, time, depth, tsunami`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub magnitude: f64,
    pub place: String,
    /// Epoch milliseconds, UTC.
    #[serde(rename = "time")]
    pub time_ms: i64,
    #[serde(rename = "depth")]
    pub depth_km: f64,
    /// 0 or 1; providers without the signal always report 0.
    pub tsunami: i32,
}

/// Merged, deduplicated, time-ordered result of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedFeed {
    /// Descending by `time_ms`.
    pub records: Vec<EventRecord>,
    pub last_updated_ms: i64,
}

impl AggregatedFeed {
    pub fn empty(last_updated_ms: i64) -> Self {
        Self {
            records: Vec::new(),
            last_updated_ms,
        }
    }
}

/// The rolling fetch window, `[end - 24h, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

pub const WINDOW_24H_MS: i64 = 24 * 60 * 60 * 1000;

impl TimeWindow {
    pub fn trailing_24h(now_ms: i64) -> Self {
        Self {
            start_ms: now_ms - WINDOW_24H_MS,
            end_ms: now_ms,
        }
    }

    /// Second-precision UTC timestamp, e.g. `2025-03-05T14:07:00`.
    pub fn start_iso(&self) -> String {
        format_utc(self.start_ms, "%Y-%m-%dT%H:%M:%S")
    }

    pub fn end_iso(&self) -> String {
        format_utc(self.end_ms, "%Y-%m-%dT%H:%M:%S")
    }

    /// Date-only UTC bound for providers that reject time-of-day filters.
    pub fn start_date(&self) -> String {
        format_utc(self.start_ms, "%Y-%m-%d")
    }

    pub fn end_date(&self) -> String {
        format_utc(self.end_ms, "%Y-%m-%d")
    }
}

fn format_utc(ms: i64, fmt: &str) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.format(fmt).to_string())
        .unwrap_or_default()
}

#[async_trait::async_trait]
pub trait EventProvider: Send + Sync {
    /// Fetch and normalize all events inside `window`.
    ///
    /// Any failure here is provider-local; the pipeline downgrades it to an
    /// empty contribution and keeps going.
    async fn fetch_window(&self, window: &TimeWindow) -> Result<Vec<EventRecord>, ProviderError>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_spans_24h() {
        let w = TimeWindow::trailing_24h(1_700_000_000_000);
        assert_eq!(w.end_ms - w.start_ms, WINDOW_24H_MS);
    }

    #[test]
    fn window_formats_utc_bounds() {
        // 2023-11-14T22:13:20 UTC
        let w = TimeWindow::trailing_24h(1_700_000_000_000);
        assert_eq!(w.end_iso(), "2023-11-14T22:13:20");
        assert_eq!(w.start_iso(), "2023-11-13T22:13:20");
        assert_eq!(w.end_date(), "2023-11-14");
        assert_eq!(w.start_date(), "2023-11-13");
    }

    #[test]
    fn record_serializes_with_wire_keys() {
        let rec = EventRecord {
            id: "us7000abcd".into(),
            magnitude: 5.3,
            place: "Offshore Chile".into(),
            time_ms: 1_700_000_000_000,
            depth_km: 12.5,
            tsunami: 1,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["time"], 1_700_000_000_000_i64);
        assert_eq!(json["depth"], 12.5);
        assert_eq!(json["tsunami"], 1);
        let back: EventRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, rec);
    }
}
