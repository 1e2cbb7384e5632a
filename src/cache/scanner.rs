//! Cluster Scanner Module
//!
//! Scatter-gather key enumeration over every primary node.
//!
//! The full matching key set is collected in memory before any pagination is
//! applied, so memory use grows with the number of matching keys.

use tracing::debug;

use super::codec::TYPE_FIELD;
use crate::error::Result;
use crate::store::{CacheStore, KeyKind};

/// Enumerates namespaced keys on all primaries of a store.
#[derive(Debug)]
pub struct ClusterScanner<'a, S> {
    store: &'a S,
}

impl<'a, S: CacheStore> ClusterScanner<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Keys matching `pattern` on every primary whose store type is `kind`.
    ///
    /// With `type_tag`, hash keys must also carry a non-blank `_Type` equal to it.
    pub async fn collect(
        &self,
        pattern: &str,
        kind: KeyKind,
        type_tag: Option<&str>,
    ) -> Result<Vec<String>> {
        let nodes = self.store.primary_count().await?;
        let mut matched = Vec::new();

        for node in 0..nodes {
            let keys = self.store.scan_node(node, pattern).await?;
            let scanned = keys.len();
            for key in keys {
                if self.accepts(&key, kind, type_tag).await? {
                    matched.push(key);
                }
            }
            debug!(node = node, pattern = pattern, scanned = scanned, "Scanned primary");
        }

        debug!(pattern = pattern, nodes = nodes, matched = matched.len(), "Scan complete");
        Ok(matched)
    }

    /// Number of keys [`ClusterScanner::collect`] would return.
    pub async fn count(
        &self,
        pattern: &str,
        kind: KeyKind,
        type_tag: Option<&str>,
    ) -> Result<usize> {
        Ok(self.collect(pattern, kind, type_tag).await?.len())
    }

    async fn accepts(&self, key: &str, kind: KeyKind, type_tag: Option<&str>) -> Result<bool> {
        if self.store.key_type(key).await? != kind {
            return Ok(false);
        }
        let Some(expected) = type_tag else {
            return Ok(true);
        };
        let tag = self.store.hash_get(key, TYPE_FIELD).await?;
        Ok(tag.is_some_and(|tag| !tag.trim().is_empty() && tag == expected))
    }
}

/// Zero-based page window: `skip(page * page_size).take(page_size)`.
pub fn page_window<T>(items: Vec<T>, page: usize, page_size: usize) -> Vec<T> {
    items
        .into_iter()
        .skip(page.saturating_mul(page_size))
        .take(page_size)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BatchCommand, MemoryStore};

    async fn seed(store: &MemoryStore) {
        store
            .execute_batch(vec![
                BatchCommand::HashSet {
                    key: "Sys:Person:1".to_string(),
                    fields: vec![(TYPE_FIELD.to_string(), "Person".to_string())],
                },
                BatchCommand::HashSet {
                    key: "Sys:Person:2".to_string(),
                    fields: vec![(TYPE_FIELD.to_string(), "Car".to_string())],
                },
                BatchCommand::HashSet {
                    key: "Sys:Person:3".to_string(),
                    fields: vec![("Name".to_string(), "untagged".to_string())],
                },
                BatchCommand::HashSet {
                    key: "Sys:Other:1".to_string(),
                    fields: vec![(TYPE_FIELD.to_string(), "Person".to_string())],
                },
            ])
            .await
            .unwrap();
        store
            .set("Sys:Person:4", b"blob".to_vec(), None)
            .await
            .unwrap();
    }

    #[test]
    fn test_page_window() {
        let items: Vec<u32> = (0..45).collect();
        assert_eq!(page_window(items.clone(), 0, 20), (0..20).collect::<Vec<_>>());
        assert_eq!(page_window(items.clone(), 2, 20), (40..45).collect::<Vec<_>>());
        assert!(page_window(items.clone(), 3, 20).is_empty());
        assert!(page_window(items, usize::MAX, 20).is_empty());
    }

    #[tokio::test]
    async fn test_collect_filters_kind_and_tag() {
        let store = MemoryStore::with_nodes(3);
        seed(&store).await;
        let scanner = ClusterScanner::new(&store);

        let mut hashes = scanner
            .collect("Sys:Person:*", KeyKind::Hash, Some("Person"))
            .await
            .unwrap();
        hashes.sort();
        assert_eq!(hashes, vec!["Sys:Person:1".to_string()]);

        let all_hashes = scanner
            .count("Sys:Person:*", KeyKind::Hash, None)
            .await
            .unwrap();
        assert_eq!(all_hashes, 3);

        let strings = scanner
            .collect("Sys:Person:*", KeyKind::String, None)
            .await
            .unwrap();
        assert_eq!(strings, vec!["Sys:Person:4".to_string()]);
    }
}
