use std::{sync::Arc, time::Duration};

use metrics::counter;
use tracing::warn;

use crate::domain::entities::EntryMeta;

use super::{
    METRIC_LIST_HIT, METRIC_LIST_MISS, METRIC_LIST_STORE,
    keys::list_key,
    store::{CacheError, KvStore},
};

/// Typed view over a [`KvStore`] holding sorted metadata lists as JSON.
#[derive(Debug, Clone)]
pub struct MetaListCache {
    store: Arc<dyn KvStore>,
    ttl: Duration,
    prefix: Option<String>,
}

impl MetaListCache {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration, prefix: Option<String>) -> Self {
        Self { store, ttl, prefix }
    }

    pub fn key(&self, collection: &str) -> String {
        list_key(self.prefix.as_deref(), collection)
    }

    /// Cached list for `collection`. Payloads that no longer decode count as
    /// a miss.
    pub async fn get(&self, collection: &str) -> Result<Option<Vec<EntryMeta>>, CacheError> {
        let key = self.key(collection);
        let Some(payload) = self.store.get(&key).await? else {
            counter!(METRIC_LIST_MISS).increment(1);
            return Ok(None);
        };

        match serde_json::from_str::<Vec<EntryMeta>>(&payload) {
            Ok(entries) => {
                counter!(METRIC_LIST_HIT).increment(1);
                Ok(Some(entries))
            }
            Err(err) => {
                warn!(
                    target = "cache::lists",
                    key = %key,
                    error = %err,
                    "Discarding undecodable cached list"
                );
                counter!(METRIC_LIST_MISS).increment(1);
                Ok(None)
            }
        }
    }

    pub async fn put(&self, collection: &str, entries: &[EntryMeta]) -> Result<(), CacheError> {
        let payload = serde_json::to_string(entries)?;
        self.store
            .set(&self.key(collection), payload, self.ttl)
            .await?;
        counter!(METRIC_LIST_STORE).increment(1);
        Ok(())
    }

    pub async fn invalidate(&self, collection: &str) -> Result<(), CacheError> {
        self.store.delete(&self.key(collection)).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use time::macros::datetime;

    use super::*;
    use crate::cache::store::{ManualClock, MemoryKvStore};

    fn meta(slug: &str) -> EntryMeta {
        EntryMeta {
            slug: slug.to_string(),
            title: slug.to_string(),
            description: "d".to_string(),
            tags: vec!["t".to_string()],
            authors: vec!["Site Owner".to_string()],
            created: datetime!(2024-01-01 00:00 UTC),
            updated: None,
            excerpt: None,
            extra: BTreeMap::new(),
        }
    }

    fn cache() -> (MetaListCache, Arc<MemoryKvStore>) {
        let clock = Arc::new(ManualClock::new(datetime!(2024-01-01 00:00 UTC)));
        let store = Arc::new(MemoryKvStore::new(clock));
        let cache = MetaListCache::new(
            store.clone(),
            Duration::from_secs(60),
            Some("site".to_string()),
        );
        (cache, store)
    }

    #[tokio::test]
    async fn stores_and_loads_lists() {
        let (cache, _) = cache();
        let entries = vec![meta("b"), meta("a")];

        assert_eq!(cache.get("posts").await.expect("get"), None);
        cache.put("posts", &entries).await.expect("put");

        assert_eq!(cache.get("posts").await.expect("get"), Some(entries));
        assert_eq!(cache.get("articles").await.expect("get"), None);
    }

    #[tokio::test]
    async fn undecodable_payload_is_a_miss() {
        let (cache, store) = cache();
        store
            .set("site:posts", "{\"not\":\"a list\"}".into(), Duration::from_secs(60))
            .await
            .expect("seed");

        assert_eq!(cache.get("posts").await.expect("get"), None);
    }

    #[tokio::test]
    async fn invalidate_removes_the_list() {
        let (cache, _) = cache();
        cache.put("posts", &[meta("a")]).await.expect("put");
        cache.invalidate("posts").await.expect("invalidate");

        assert_eq!(cache.get("posts").await.expect("get"), None);
    }
}
