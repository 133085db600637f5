//! Raw station spellings grouped by canonical key.
//!
//! Normalization only merges formatting variants, but two different physical
//! stations can still land on one key. The directory keeps every spelling it
//! saw so those keys can be reported instead of trusted silently.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// A canonical key that more than one distinct raw name collapsed into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationCollision {
    pub station_key: String,
    /// Raw spellings with their ride counts, most frequent first.
    pub variants: Vec<(String, u64)>,
}

#[derive(Debug, Default)]
pub struct StationDirectory {
    names: BTreeMap<String, HashMap<String, u64>>,
}

impl StationDirectory {
    pub fn record(&mut self, station_key: &str, raw_name: &str) {
        *self
            .names
            .entry(station_key.to_string())
            .or_default()
            .entry(raw_name.trim().to_string())
            .or_default() += 1;
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Raw spellings for `station_key`, most frequent first, ties alphabetical.
    pub fn variants(&self, station_key: &str) -> Vec<(String, u64)> {
        let mut variants: Vec<(String, u64)> = self
            .names
            .get(station_key)
            .map(|v| v.iter().map(|(name, n)| (name.clone(), *n)).collect())
            .unwrap_or_default();
        variants.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        variants
    }

    /// Label for output rows. Falls back to the key itself when the key was
    /// never recorded.
    pub fn display_name(&self, station_key: &str) -> String {
        self.variants(station_key)
            .into_iter()
            .next()
            .map(|(name, _)| name)
            .unwrap_or_else(|| station_key.to_string())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// Keys with more than one distinct raw spelling, ordered by key.
    pub fn collisions(&self) -> Vec<StationCollision> {
        self.names
            .iter()
            .filter(|(_, variants)| variants.len() > 1)
            .map(|(key, _)| StationCollision {
                station_key: key.clone(),
                variants: self.variants(key),
            })
            .collect()
    }

    /// Logs every collision at `warn` so it shows up next to the results.
    pub fn warn_collisions(&self) -> Vec<StationCollision> {
        let collisions = self.collisions();
        for collision in &collisions {
            let names: Vec<&str> = collision.variants.iter().map(|(n, _)| n.as_str()).collect();
            warn!(
                station_key = %collision.station_key,
                variants = ?names,
                "Multiple station names share one canonical key"
            );
        }
        collisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_most_frequent() {
        let mut dir = StationDirectory::default();
        dir.record("zilkerpark", "Zilker Park");
        dir.record("zilkerpark", "Zilker Park ");
        dir.record("zilkerpark", "zilker park");

        assert_eq!(dir.display_name("zilkerpark"), "Zilker Park");
        assert_eq!(dir.variants("zilkerpark"), vec![
            ("Zilker Park".to_string(), 2),
            ("zilker park".to_string(), 1),
        ]);
    }

    #[test]
    fn test_display_name_tie_is_alphabetical() {
        let mut dir = StationDirectory::default();
        dir.record("a", "b-A");
        dir.record("a", "a-A");
        assert_eq!(dir.display_name("a"), "a-A");
    }

    #[test]
    fn test_display_name_unknown_key() {
        let dir = StationDirectory::default();
        assert_eq!(dir.display_name("ghost"), "ghost");
    }

    #[test]
    fn test_collisions_only_multi_spelling_keys() {
        let mut dir = StationDirectory::default();
        dir.record("4thcongress", "4th & Congress");
        dir.record("4thcongress", "4th/Congress");
        dir.record("zilkerpark", "Zilker Park");
        dir.record("zilkerpark", "Zilker Park");

        let collisions = dir.warn_collisions();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].station_key, "4thcongress");
        assert_eq!(collisions[0].variants.len(), 2);
        assert_eq!(dir.keys().count(), 2);
    }
}
