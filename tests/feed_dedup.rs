// tests/feed_dedup.rs
use quake_widget_engine::feed::merge_providers;
use quake_widget_engine::{DuplicateKey, EventRecord};

fn rec(id: &str, magnitude: f64, time_ms: i64) -> EventRecord {
    EventRecord {
        id: id.to_string(),
        magnitude,
        place: "Somewhere".into(),
        time_ms,
        depth_km: 12.0,
        tsunami: 0,
    }
}

#[test]
fn cross_provider_duplicate_resolves_to_first_seen() {
    let t = 1_700_000_000_000;
    let (merged, dropped) = merge_providers(vec![
        vec![rec("a1", 5.3, t)],
        vec![rec("b1", 5.3, t + 10_000)],
    ]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].id, "a1");
    assert_eq!(dropped, 1);
}

#[test]
fn events_outside_the_bucket_both_survive() {
    let t = 1_700_000_000_000;
    let (merged, dropped) = merge_providers(vec![
        vec![rec("a1", 5.3, t)],
        vec![rec("b1", 5.3, t + 400_000)],
    ]);
    assert_eq!(merged.len(), 2);
    assert_eq!(dropped, 0);
}

#[test]
fn key_bridges_small_rounding_differences() {
    // Two networks reporting 5.25 vs 5.3 land in the same 0.1 bucket.
    let a = rec("a1", 5.25, 1_700_000_000_000);
    let b = rec("b1", 5.3, 1_700_000_030_000);
    assert_eq!(DuplicateKey::of(&a), DuplicateKey::of(&b));
}

#[test]
fn repeated_id_within_one_provider_is_dropped() {
    let t = 1_700_000_000_000;
    let (merged, dropped) = merge_providers(vec![vec![
        rec("a1", 5.3, t),
        rec("a1", 5.3, t),
        rec("a2", 4.0, t - 900_000),
    ]]);
    assert_eq!(merged.len(), 2);
    assert_eq!(dropped, 1);
}

#[test]
fn merge_is_order_deterministic_for_fixed_priority() {
    // Same batches, same outcome, however often we run it.
    let t = 1_700_000_000_000;
    let batches = || {
        vec![
            vec![rec("a1", 5.3, t), rec("a2", 6.0, t - 3_600_000)],
            vec![rec("b1", 5.3, t + 10_000), rec("b2", 4.2, t - 7_200_000)],
        ]
    };
    let (first, _) = merge_providers(batches());
    let (second, _) = merge_providers(batches());
    assert_eq!(first, second);
    let ids: Vec<&str> = first.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a2", "b2"]);
}
