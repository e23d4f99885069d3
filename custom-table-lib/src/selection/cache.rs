//! Owned, versioned row cache.

use std::collections::HashMap;

use crate::model::Record;
use crate::model::RowKey;

/// `key → record` map owned by the selection engine.
///
/// Only the engine writes; everyone else reads through `&SelectionCache`.
/// Every write bumps [`version`](Self::version).
#[derive(Debug, Clone, Default)]
pub struct SelectionCache {
    rows: HashMap<RowKey, Record>,
    version: u64,
}

impl SelectionCache {
    pub fn get(&self, key: &RowKey) -> Option<&Record> {
        self.rows.get(key)
    }

    pub fn contains(&self, key: &RowKey) -> bool {
        self.rows.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn keys(&self) -> impl Iterator<Item = &RowKey> {
        self.rows.keys()
    }

    pub(super) fn set(&mut self, key: RowKey, record: Record) {
        self.rows.insert(key, record);
        self.version += 1;
    }

    pub(super) fn remove(&mut self, key: &RowKey) -> Option<Record> {
        let removed = self.rows.remove(key);
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }

    pub(super) fn retain(&mut self, mut keep: impl FnMut(&RowKey) -> bool) {
        let before = self.rows.len();
        self.rows.retain(|key, _| keep(key));
        if self.rows.len() != before {
            self.version += 1;
        }
    }

    pub(super) fn clear(&mut self) {
        if !self.rows.is_empty() {
            self.rows.clear();
            self.version += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_bump_version() {
        let mut cache = SelectionCache::default();
        cache.set(RowKey::from("a"), Record::new().set("id", "a"));
        cache.set(RowKey::from("b"), Record::new().set("id", "b"));
        assert_eq!(cache.version(), 2);

        assert!(cache.remove(&RowKey::from("zz")).is_none());
        assert_eq!(cache.version(), 2);

        cache.retain(|key| key.as_str() == "a");
        assert_eq!(cache.version(), 3);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&RowKey::from("a")));
    }
}
