//! Remote-fetch caching.
//!
//! Catalog data is never a source of truth: these caches only decide whether
//! a recent answer from a source is still fresh enough to reuse.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::app::Result;
use crate::config::CacheConfig;
use crate::source::{RemoteChapter, RemoteTitle, SourceRegistry};
use crate::store::Store;

/// A map of values that go stale after a fixed window.
pub struct QueryCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, (Instant, V)>>,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached value, if it is younger than the staleness window.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(key)
            .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
            .map(|(_, value)| value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, (Instant::now(), value));
        }
    }

    pub fn invalidate(&self, key: &K) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    pub fn invalidate_where<F>(&self, mut predicate: F)
    where
        F: FnMut(&K) -> bool,
    {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|key, _| !predicate(key));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return a fresh cached value or run `fetch` and cache its success.
    /// Failures are passed through and never cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = fetch().await?;
        self.insert(key, value.clone());
        Ok(value)
    }
}

type ListingKey = (String, u32);
type SearchKey = (String, String, u32);
type TitleKey = (String, String);

/// Cached catalog reads, one cache per kind of request.
pub struct CatalogQueries<S: Store> {
    registry: Arc<SourceRegistry<S>>,
    search: QueryCache<SearchKey, Vec<RemoteTitle>>,
    details: QueryCache<TitleKey, RemoteTitle>,
    chapters: QueryCache<TitleKey, Vec<RemoteChapter>>,
    popular: QueryCache<ListingKey, Vec<RemoteTitle>>,
    latest: QueryCache<ListingKey, Vec<RemoteTitle>>,
}

impl<S: Store> CatalogQueries<S> {
    pub fn new(registry: Arc<SourceRegistry<S>>, config: &CacheConfig) -> Self {
        Self {
            registry,
            search: QueryCache::new(Duration::from_secs(config.search_secs)),
            details: QueryCache::new(Duration::from_secs(config.details_secs)),
            chapters: QueryCache::new(Duration::from_secs(config.chapters_secs)),
            popular: QueryCache::new(Duration::from_secs(config.popular_secs)),
            latest: QueryCache::new(Duration::from_secs(config.latest_secs)),
        }
    }

    pub async fn search(&self, source_id: &str, query: &str, page: u32) -> Result<Vec<RemoteTitle>> {
        let key = (source_id.to_string(), query.to_string(), page);
        self.search
            .get_or_fetch(key, || self.registry.search(source_id, query, page))
            .await
    }

    pub async fn popular(&self, source_id: &str, page: u32) -> Result<Vec<RemoteTitle>> {
        self.popular
            .get_or_fetch((source_id.to_string(), page), || {
                self.registry.popular(source_id, page)
            })
            .await
    }

    pub async fn latest(&self, source_id: &str, page: u32) -> Result<Vec<RemoteTitle>> {
        self.latest
            .get_or_fetch((source_id.to_string(), page), || {
                self.registry.latest(source_id, page)
            })
            .await
    }

    pub async fn details(&self, source_id: &str, remote_id: &str) -> Result<RemoteTitle> {
        self.details
            .get_or_fetch((source_id.to_string(), remote_id.to_string()), || {
                self.registry.details(source_id, remote_id)
            })
            .await
    }

    pub async fn chapters(&self, source_id: &str, remote_id: &str) -> Result<Vec<RemoteChapter>> {
        self.chapters
            .get_or_fetch((source_id.to_string(), remote_id.to_string()), || {
                self.registry.chapter_list(source_id, remote_id)
            })
            .await
    }

    /// Drop cached details and chapters for one title, e.g. after a refresh.
    pub fn invalidate_title(&self, source_id: &str, remote_id: &str) {
        let key = (source_id.to_string(), remote_id.to_string());
        self.details.invalidate(&key);
        self.chapters.invalidate(&key);
    }

    pub fn invalidate_source(&self, source_id: &str) {
        debug!("Invalidating cached queries for source {}", source_id);
        self.search.invalidate_where(|(id, _, _)| id == source_id);
        self.details.invalidate_where(|(id, _)| id == source_id);
        self.chapters.invalidate_where(|(id, _)| id == source_id);
        self.popular.invalidate_where(|(id, _)| id == source_id);
        self.latest.invalidate_where(|(id, _)| id == source_id);
    }

    pub fn invalidate_all(&self) {
        self.search.clear();
        self.details.clear();
        self.chapters.clear();
        self.popular.clear();
        self.latest.clear();
    }
}
