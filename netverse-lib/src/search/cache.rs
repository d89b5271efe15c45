use dashmap::DashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Cache key of a query for one endpoint, `<kind>:<query>`
pub(crate) fn cache_key(kind: impl fmt::Display, query: &str) -> String {
    format!("{kind}:{query}")
}

/// A time-to-live cache of search responses.
///
/// Expired entries are dropped lazily when they are looked up.
#[derive(Debug)]
pub(crate) struct ResponseCache<V> {
    entries: DashMap<String, (Instant, V)>,
    ttl: Duration,
}

impl<V: Clone> ResponseCache<V> {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<V> {
        {
            let entry = self.entries.get(key)?;
            let (stored, value) = entry.value();
            if stored.elapsed() < self.ttl {
                return Some(value.clone());
            }
        }
        // Leave a fresh value stored by a concurrent request in place
        self.entries
            .remove_if(key, |_, (stored, _)| stored.elapsed() >= self.ttl);
        None
    }

    pub(crate) fn insert(&self, key: String, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(key, (Instant::now(), value));
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(15 * 60);

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = ResponseCache::new(TTL);
        let key = cache_key("web", "rust");
        assert_eq!(key, "web:rust");

        cache.insert(key.clone(), vec![1, 2, 3]);
        assert_eq!(cache.get(&key), Some(vec![1, 2, 3]));

        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        assert_eq!(cache.get(&key), Some(vec![1, 2, 3]));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get(&key), None);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_disables_cache() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.insert("web:rust".to_string(), 1);
        assert_eq!(cache.get("web:rust"), None);
    }

    #[test]
    fn test_keys_are_per_kind() {
        let cache = ResponseCache::new(TTL);
        cache.insert(cache_key("web", "rust"), 1);
        assert_eq!(cache.get("images:rust"), None);
        assert_eq!(cache.get("web:rust"), Some(1));
    }
}
