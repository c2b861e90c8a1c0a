use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::error::ProviderError;
use crate::feed::config::FeedConfig;
use crate::feed::providers::FETCH_TIMEOUT;
use crate::feed::truncate_place;
use crate::feed::types::{EventProvider, EventRecord, TimeWindow};

const NAME: &str = "USGS";

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    id: Option<String>,
    properties: Properties,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Properties {
    mag: Option<f64>,
    place: Option<String>,
    time: Option<i64>,
    tsunami: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    // [lon, lat, depth_km]
    #[serde(default)]
    coordinates: Vec<f64>,
}

/// USGS FDSN event feed: GeoJSON feature collection with epoch-millis times
/// and feature-level ids taken verbatim.
pub struct UsgsProvider {
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

impl UsgsProvider {
    pub fn from_fixture(payload: &str) -> Self {
        Self {
            source: Source::Fixture(payload.to_string()),
        }
    }

    pub fn from_config(cfg: &FeedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("building usgs http client")?;
        Ok(Self {
            source: Source::Http {
                base_url: cfg.usgs_url.clone(),
                min_magnitude: cfg.min_magnitude,
                limit: cfg.limit,
                client,
            },
        })
    }
}

/// Normalize a raw GeoJSON payload. A malformed top-level document is a
/// parse failure; a missing `features` array is an empty (valid) feed.
/// Missing leaf fields default to zero / "Unknown".
pub fn parse_geojson(payload: &str) -> Result<Vec<EventRecord>, ProviderError> {
    let t0 = std::time::Instant::now();
    let root: FeatureCollection =
        serde_json::from_str(payload).map_err(|source| ProviderError::Parse {
            provider: NAME,
            source,
        })?;

    let mut out = Vec::with_capacity(root.features.len());
    for f in root.features {
        out.push(EventRecord {
            id: f.id.unwrap_or_default(),
            magnitude: f.properties.mag.unwrap_or(0.0),
            place: truncate_place(f.properties.place.as_deref().unwrap_or("Unknown")),
            time_ms: f.properties.time.unwrap_or(0),
            depth_km: f.geometry.coordinates.get(2).copied().unwrap_or(0.0),
            tsunami: f.properties.tsunami.unwrap_or(0),
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("feed_events_total").increment(out.len() as u64);
    Ok(out)
}

#[async_trait]
impl EventProvider for UsgsProvider {
    async fn fetch_window(&self, window: &TimeWindow) -> Result<Vec<EventRecord>, ProviderError> {
        match &self.source {
            Source::Fixture(payload) => parse_geojson(payload),

            Source::Http {
                base_url,
                min_magnitude,
                limit,
                client,
            } => {
                let url = format!(
                    "{base_url}?format=geojson&orderby=time&minmagnitude={min_magnitude}\
                     &starttime={}&endtime={}&limit={limit}",
                    window.start_iso(),
                    window.end_iso(),
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
                parse_geojson(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
