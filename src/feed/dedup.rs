// src/feed/dedup.rs
use std::collections::HashSet;

use crate::feed::types::EventRecord;

/// Coarse composite identity bridging cross-provider mismatches: the same
/// physical event reported by two networks lands in the same 0.1-magnitude,
/// 5-minute bucket even when their timestamps and magnitudes disagree
/// slightly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DuplicateKey {
    pub magnitude_bucket: i64,
    pub time_bucket: i64,
}

const TIME_BUCKET_MS: i64 = 5 * 60 * 1000;

impl DuplicateKey {
    pub fn of(record: &EventRecord) -> Self {
        Self {
            magnitude_bucket: (record.magnitude * 10.0).round() as i64,
            time_bucket: record.time_ms.div_euclid(TIME_BUCKET_MS),
        }
    }
}

/// Incremental duplicate index over both identity schemes: provider-native
/// ids and derived `DuplicateKey`s. Lookups are O(1), so merging N providers
/// stays linear in the total record count.
#[derive(Debug, Default)]
pub struct DedupIndex {
    ids: HashSet<String>,
    keys: HashSet<DuplicateKey>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the record's provider-native id is already indexed.
    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// True when either identity of `record` is already indexed. Used for
    /// secondary providers, where a colliding key means the event was
    /// already reported by an earlier provider.
    pub fn contains(&self, record: &EventRecord) -> bool {
        self.ids.contains(&record.id) || self.keys.contains(&DuplicateKey::of(record))
    }

    pub fn insert(&mut self, record: &EventRecord) {
        self.ids.insert(record.id.clone());
        self.keys.insert(DuplicateKey::of(record));
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, magnitude: f64, time_ms: i64) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            magnitude,
            place: "Test Region".into(),
            time_ms,
            depth_km: 10.0,
            tsunami: 0,
        }
    }

    #[test]
    fn same_bucket_collides() {
        // 10s apart, same 0.1 magnitude: one physical event, two networks.
        let a = rec("us1", 5.3, 1_700_000_000_000);
        let b = rec("emsc_9", 5.3, 1_700_000_010_000);
        assert_eq!(DuplicateKey::of(&a), DuplicateKey::of(&b));
    }

    #[test]
    fn distinct_events_do_not_collide() {
        let a = rec("us1", 5.3, 1_700_000_000_000);
        let late = rec("emsc_9", 5.3, 1_700_000_400_000); // > 5 min later
        let weaker = rec("emsc_10", 5.1, 1_700_000_010_000);
        assert_ne!(DuplicateKey::of(&a), DuplicateKey::of(&late));
        assert_ne!(DuplicateKey::of(&a), DuplicateKey::of(&weaker));
    }

    #[test]
    fn magnitude_bucket_rounds_to_tenths() {
        assert_eq!(DuplicateKey::of(&rec("a", 5.34, 0)).magnitude_bucket, 53);
        assert_eq!(DuplicateKey::of(&rec("b", 5.35, 0)).magnitude_bucket, 54);
    }

    #[test]
    fn index_rejects_by_id_or_key() {
        let mut index = DedupIndex::new();
        let a = rec("us1", 5.3, 1_700_000_000_000);
        index.insert(&a);

        assert!(index.contains_id("us1"));
        assert!(!index.contains_id("us2"));

        // Same id, different bucket: still a duplicate.
        assert!(index.contains(&rec("us1", 7.9, 1_650_000_000_000)));
        // Different id, same bucket: still a duplicate.
        assert!(index.contains(&rec("emsc_9", 5.3, 1_700_000_010_000)));
        // Different id, different bucket: new event.
        assert!(!index.contains(&rec("emsc_9", 6.1, 1_700_000_010_000)));
    }
}
