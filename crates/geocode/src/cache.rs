use std::collections::BTreeMap;

use crate::coord::CoordKey;

/// In-memory memoization of resolved location labels.
///
/// Unbounded and never evicted: the intended lifetime is one UI session, so
/// growth is bounded by how many distinct ~11 m cells a user can click.
/// Entries are keyed in a `BTreeMap` for stable traversal order.
///
/// Concurrent misses for the same key may each resolve remotely; the write is
/// last-write-wins. Both resolutions normally derive the same label, so this
/// is an accepted race rather than a correctness bug.
#[derive(Debug, Default)]
pub struct LabelCache {
    entries: BTreeMap<CoordKey, String>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CoordKey) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }

    pub fn insert(&mut self, key: CoordKey, label: impl Into<String>) {
        self.entries.insert(key, label.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::LabelCache;
    use crate::coord::Coord;

    #[test]
    fn holds_at_most_one_label_per_key() {
        let mut cache = LabelCache::new();
        let key = Coord::new(34.9576, 137.1656).key();

        cache.insert(key.clone(), "岡崎図書館");
        cache.insert(key.clone(), "愛知県 岡崎市");

        assert_eq!(cache.get(&key), Some("愛知県 岡崎市"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn absent_key_is_a_miss() {
        let cache = LabelCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&Coord::new(0.0, 0.0).key()), None);
    }
}
