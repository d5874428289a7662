//! Write-once keyed storage for per-stage outputs.

use crate::errors::DataConflictError;
use std::collections::BTreeMap;

/// A keyed map where each key can be written exactly once.
///
/// Writing to an existing key returns a `DataConflictError`. Later stages
/// only ever read from it, so there is no mutable accessor.
#[derive(Debug, Clone, PartialEq)]
pub struct StageData<V> {
    entries: BTreeMap<String, V>,
}

impl<V> Default for StageData<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> StageData<V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the value stored under a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores a value under a new key.
    ///
    /// # Errors
    ///
    /// Returns `DataConflictError` if the key already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Result<(), DataConflictError> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(DataConflictError::new(key));
        }
        self.entries.insert(key, value);
        Ok(())
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.entries.iter()
    }

    /// Returns all keys in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a, V> IntoIterator for &'a StageData<V> {
    type Item = (&'a String, &'a V);
    type IntoIter = std::collections::btree_map::Iter<'a, String, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut data = StageData::new();
        data.insert("whoop", 3).unwrap();

        assert_eq!(data.get("whoop"), Some(&3));
        assert!(data.contains_key("whoop"));
        assert!(!data.contains_key("oura"));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_second_write_conflicts() {
        let mut data = StageData::new();
        data.insert("whoop", 1).unwrap();

        let err = data.insert("whoop", 2).unwrap_err();
        assert_eq!(err.key, "whoop");
        assert_eq!(data.get("whoop"), Some(&1));
    }

    #[test]
    fn test_keys_are_ordered() {
        let mut data = StageData::new();
        data.insert("withings", ()).unwrap();
        data.insert("hevy", ()).unwrap();
        data.insert("oura", ()).unwrap();

        assert_eq!(data.keys(), vec!["hevy", "oura", "withings"]);
    }
}
