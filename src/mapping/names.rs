//! Case-insensitive name maps.

use std::collections::HashMap;

/// A string-to-string map whose keys compare case-insensitively.
///
/// The original spelling of each key is kept for iteration. Inserting a key
/// that differs from an existing one only by case replaces the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMap {
    entries: HashMap<String, (String, String)>,
}

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mapping, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        self.entries
            .insert(key.to_lowercase(), (key, value.into()))
            .map(|(_, previous)| previous)
    }

    /// Look up a key, ignoring case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_lowercase())
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_lowercase())
    }

    /// Iterate `(key, value)` pairs with keys in their original spelling.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NameMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<const N: usize> From<[(&str, &str); N]> for NameMap {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs.into_iter().collect()
    }
}
