use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::engine::{CollectionResult, QueryKey};

/// Process-lifetime memo of completed collections.
///
/// Entries are never replaced or evicted: the first result stored for a key
/// is the one every later lookup sees.
#[derive(Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, Arc<CollectionResult>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &QueryKey) -> Option<Arc<CollectionResult>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Stores `result` unless the key is already present, and returns the
    /// entry that ends up cached.
    pub async fn insert(&self, key: QueryKey, result: Arc<CollectionResult>) -> Arc<CollectionResult> {
        self.entries
            .write()
            .await
            .entry(key)
            .or_insert(result)
            .clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::CollectionReport;
    use chrono::NaiveDate;

    fn result(day: u32) -> Arc<CollectionResult> {
        Arc::new(CollectionResult {
            reference_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            tracks: vec![],
            report: CollectionReport::default(),
        })
    }

    fn key(query: &str) -> QueryKey {
        QueryKey::Keyword {
            query: query.to_string(),
            total: 10,
            market: None,
            include_extended_fields: false,
        }
    }

    #[tokio::test]
    async fn test_get_after_insert() {
        let cache = QueryCache::new();
        assert!(cache.is_empty().await);

        cache.insert(key("k-pop"), result(1)).await;

        let hit = cache.get(&key("k-pop")).await.unwrap();
        assert_eq!(hit.reference_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(cache.get(&key("j-pop")).await.is_none());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_insert_keeps_first_entry() {
        let cache = QueryCache::new();
        let first = result(1);

        cache.insert(key("k-pop"), first.clone()).await;
        let stored = cache.insert(key("k-pop"), result(2)).await;

        assert!(Arc::ptr_eq(&stored, &first));
        assert_eq!(cache.len().await, 1);
    }
}
