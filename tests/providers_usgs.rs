// tests/providers_usgs.rs
use quake_widget_engine::error::ProviderError;
use quake_widget_engine::feed::providers::usgs::{parse_geojson, UsgsProvider};
use quake_widget_engine::feed::types::{EventProvider, TimeWindow};

const FIXTURE: &str = include_str!("fixtures/usgs_feed.json");

#[test]
fn fixture_parses_to_normalized_records() {
    let records = parse_geojson(FIXTURE).unwrap();
    assert_eq!(records.len(), 3);

    assert_eq!(records[0].id, "us7000lm9n");
    assert_eq!(records[0].magnitude, 5.3);
    assert_eq!(records[0].place, "South Sandwich Islands region");
    assert_eq!(records[0].time_ms, 1_700_000_000_000);
    assert_eq!(records[0].depth_km, 35.0);
    assert_eq!(records[0].tsunami, 0);

    // 31-char place, comma inside the first 30: cut at the comma.
    assert_eq!(records[1].place, "79 km SSE of Sand Point");
    assert_eq!(records[1].tsunami, 1);

    // Null magnitude/place fall back; a 2-element coordinate triple has no
    // depth.
    assert_eq!(records[2].magnitude, 0.0);
    assert_eq!(records[2].place, "Unknown");
    assert_eq!(records[2].depth_km, 0.0);
}

#[test]
fn malformed_payload_is_a_parse_failure() {
    let err = parse_geojson("definitely not geojson").unwrap_err();
    assert!(matches!(err, ProviderError::Parse { provider: "USGS", .. }));

    assert!(parse_geojson(r#"{"features": "nope"}"#).is_err());
}

#[test]
fn missing_features_array_is_an_empty_feed() {
    let records = parse_geojson(r#"{"type": "FeatureCollection"}"#).unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn fixture_provider_serves_the_payload() {
    let provider = UsgsProvider::from_fixture(FIXTURE);
    assert_eq!(provider.name(), "USGS");

    let window = TimeWindow::trailing_24h(1_700_000_100_000);
    let records = provider.fetch_window(&window).await.unwrap();
    assert_eq!(records.len(), 3);
}
