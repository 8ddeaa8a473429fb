use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Cache key such as `["getExtractor", "<uuid>", "false"]`. The first part
/// is the tag that mutations invalidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryKey(parts.into_iter().map(Into::into).collect())
    }

    pub fn tag(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or("")
    }
}

pub mod tags {
    pub const EXTRACTORS: &str = "getExtractors";
    pub const EXTRACTOR: &str = "getExtractor";
    pub const CONFIGURATION: &str = "getConfiguration";
    pub const EXAMPLES: &str = "getExamples";
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, Value>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &QueryKey) -> Option<Value> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn insert(&self, key: QueryKey, value: Value) {
        self.entries.write().await.insert(key, value);
    }

    /// Drop every entry whose key carries `tag`; returns how many went.
    pub async fn invalidate(&self, tag: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| key.tag() != tag);
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!("Invalidated {} cached '{}' entries", removed, tag);
        }
        removed
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
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
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = QueryCache::new();
        let key = QueryKey::new([tags::EXTRACTOR, "abc", "false"]);

        assert!(cache.get(&key).await.is_none());
        cache.insert(key.clone(), json!({"uuid": "abc"})).await;
        assert_eq!(cache.get(&key).await, Some(json!({"uuid": "abc"})));
    }

    #[tokio::test]
    async fn test_invalidate_only_matching_tag() {
        let cache = QueryCache::new();
        cache
            .insert(QueryKey::new([tags::EXTRACTORS, "10", "0"]), json!([]))
            .await;
        cache
            .insert(QueryKey::new([tags::EXTRACTORS, "10", "10"]), json!([]))
            .await;
        cache
            .insert(QueryKey::new([tags::CONFIGURATION]), json!({}))
            .await;

        assert_eq!(cache.invalidate(tags::EXTRACTORS).await, 2);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.invalidate(tags::EXTRACTORS).await, 0);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
