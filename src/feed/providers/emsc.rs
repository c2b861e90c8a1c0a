// src/feed/providers/emsc.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use time::{format_description, format_description::FormatItem, PrimitiveDateTime};

use crate::error::ProviderError;
use crate::feed::config::FeedConfig;
use crate::feed::providers::FETCH_TIMEOUT;
use crate::feed::truncate_place;
use crate::feed::types::{EventProvider, EventRecord, TimeWindow};

const NAME: &str = "EMSC";

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: Option<Properties>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    // ISO-8601 string; only the first 19 chars (seconds precision, assumed
    // UTC) are trusted.
    time: Option<String>,
    mag: Option<f64>,
    flynn_region: Option<String>,
    source_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(default)]
    coordinates: Vec<f64>,
}

fn iso_seconds_format() -> &'static [FormatItem<'static>] {
    static FMT: OnceCell<Vec<FormatItem<'static>>> = OnceCell::new();
    FMT.get_or_init(|| {
        format_description::parse("[year]-[month]-[day]T[hour]:[minute]:[second]").unwrap()
    })
}

fn parse_iso_to_unix_ms(ts: &str) -> i64 {
    let truncated: String = ts.chars().take(19).collect();
    PrimitiveDateTime::parse(&truncated, iso_seconds_format())
        .ok()
        .map(|dt| dt.assume_utc().unix_timestamp() * 1_000)
        .unwrap_or(0)
}

/// EMSC FDSN event feed. Same feature-collection shape as USGS but with
/// ISO-8601 time strings and a provider-local `source_id`; ids are prefixed
/// so they can never collide with USGS ids, and the format carries no
/// tsunami signal.
pub struct EmscProvider {
    source: Source,
}

enum Source {
    Fixture(String),
    Http {
        base_url: String,
        min_magnitude: f64,
        limit: u32,
        client: reqwest::Client,
    },
}

impl EmscProvider {
    pub fn from_fixture(payload: &str) -> Self {
        Self {
            source: Source::Fixture(payload.to_string()),
        }
    }

    pub fn from_config(cfg: &FeedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("building emsc http client")?;
        Ok(Self {
            source: Source::Http {
                base_url: cfg.emsc_url.clone(),
                min_magnitude: cfg.min_magnitude,
                limit: cfg.limit,
                client,
            },
        })
    }
}

/// Normalize a raw EMSC payload. Features missing their properties or
/// geometry blocks are skipped; other missing fields default to zero or
/// "Unknown". `tsunami` is always 0 here.
pub fn parse_feed(payload: &str) -> Result<Vec<EventRecord>, ProviderError> {
    let t0 = std::time::Instant::now();
    let root: FeatureCollection =
        serde_json::from_str(payload).map_err(|source| ProviderError::Parse {
            provider: NAME,
            source,
        })?;

    let mut out = Vec::with_capacity(root.features.len());
    for (i, f) in root.features.into_iter().enumerate() {
        let (Some(props), Some(geometry)) = (f.properties, f.geometry) else {
            continue;
        };
        let source_id = props
            .source_id
            .unwrap_or_else(|| i.to_string());

        out.push(EventRecord {
            id: format!("emsc_{source_id}"),
            magnitude: props.mag.unwrap_or(0.0),
            place: truncate_place(props.flynn_region.as_deref().unwrap_or("Unknown")),
            time_ms: props.time.as_deref().map(parse_iso_to_unix_ms).unwrap_or(0),
            depth_km: geometry.coordinates.get(2).copied().unwrap_or(0.0),
            tsunami: 0,
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("feed_events_total").increment(out.len() as u64);
    Ok(out)
}

#[async_trait]
impl EventProvider for EmscProvider {
    async fn fetch_window(&self, window: &TimeWindow) -> Result<Vec<EventRecord>, ProviderError> {
        match &self.source {
            Source::Fixture(payload) => parse_feed(payload),

            Source::Http {
                base_url,
                min_magnitude,
                limit,
                client,
            } => {
                // Date-only bounds: this endpoint rejects time-of-day filters.
                let url = format!(
                    "{base_url}?format=json&orderby=time-desc&minmagnitude={min_magnitude}\
                     &starttime={}&endtime={}&limit={limit}",
                    window.start_date(),
                    window.end_date(),
                );
                let resp = client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|source| ProviderError::Fetch {
                        provider: NAME,
                        source,
                    })?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(ProviderError::Status {
                        provider: NAME,
                        status: status.as_u16(),
                    });
                }
                let body = resp.text().await.map_err(|source| ProviderError::Fetch {
                    provider: NAME,
                    source,
                })?;
                parse_feed(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_seconds_parse_assumes_utc() {
        // 2023-11-14T22:13:20Z
        assert_eq!(
            parse_iso_to_unix_ms("2023-11-14T22:13:20"),
            1_700_000_000_000
        );
    }

    #[test]
    fn fractional_seconds_and_zone_suffix_are_ignored() {
        assert_eq!(
            parse_iso_to_unix_ms("2023-11-14T22:13:20.123456Z"),
            1_700_000_000_000
        );
    }

    #[test]
    fn unparsable_time_defaults_to_zero() {
        assert_eq!(parse_iso_to_unix_ms("not a timestamp"), 0);
        assert_eq!(parse_iso_to_unix_ms(""), 0);
    }
}
