use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::app::{OmniError, Result};
use crate::domain::{SourceRecord, ID_SEPARATOR};
use crate::source::{CatalogSource, RemoteChapter, RemoteTitle, SourceOperation};
use crate::store::Store;

pub const DEFAULT_WORKERS: usize = 10;

type SourceMap = HashMap<String, Arc<dyn CatalogSource>>;

/// Maps source ids to adapter instances.
///
/// Constructed once at startup and shared by `Arc`. The adapter map lives in
/// memory; enabled flags and installation metadata live in the store.
pub struct SourceRegistry<S: Store> {
    sources: RwLock<SourceMap>,
    store: Arc<S>,
    workers: usize,
}

impl<S: Store> SourceRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_workers(store, DEFAULT_WORKERS)
    }

    pub fn with_workers(store: Arc<S>, workers: usize) -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
            store,
            workers: workers.max(1),
        }
    }

    fn read_map(&self) -> Result<std::sync::RwLockReadGuard<'_, SourceMap>> {
        self.sources
            .read()
            .map_err(|e| OmniError::Other(format!("source registry lock poisoned: {}", e)))
    }

    /// Register an adapter. Re-registering an id replaces the instance.
    ///
    /// The source record is written first; the adapter only becomes visible
    /// once that write has succeeded.
    pub fn register(&self, source: Arc<dyn CatalogSource>) -> Result<()> {
        let info = source.info().clone();
        if info.id.is_empty() || info.id.contains(ID_SEPARATOR) {
            return Err(OmniError::InvalidSourceId(info.id));
        }

        let created = self
            .store
            .insert_source_record(&SourceRecord::from_info(&info))?;

        {
            let mut map = self
                .sources
                .write()
                .map_err(|e| OmniError::Other(format!("source registry lock poisoned: {}", e)))?;
            map.insert(info.id.clone(), source);
        }

        if created {
            info!("Installed source {} ({})", info.name, info.id);
        } else {
            debug!("Registered source {} ({})", info.name, info.id);
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn CatalogSource>> {
        self.read_map().ok()?.get(id).cloned()
    }

    /// Like [`get`](Self::get), but a miss is an error.
    pub fn require(&self, id: &str) -> Result<Arc<dyn CatalogSource>> {
        self.get(id)
            .ok_or_else(|| OmniError::SourceNotFound(id.to_string()))
    }

    pub fn get_all(&self) -> Vec<Arc<dyn CatalogSource>> {
        self.read_map()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_by_lang(&self, lang: &str) -> Vec<Arc<dyn CatalogSource>> {
        self.get_all()
            .into_iter()
            .filter(|source| source.info().lang == lang)
            .collect()
    }

    /// Flip the persisted enabled flag. The adapter stays registered.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        if !self.store.set_source_enabled(id, enabled)? {
            return Err(OmniError::SourceNotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn is_enabled(&self, id: &str) -> Result<bool> {
        Ok(self
            .store
            .get_source_record(id)?
            .map(|record| record.enabled)
            .unwrap_or(false))
    }

    pub fn enabled_sources(&self) -> Result<Vec<Arc<dyn CatalogSource>>> {
        let enabled: Vec<String> = self
            .store
            .get_source_records()?
            .into_iter()
            .filter(|record| record.enabled)
            .map(|record| record.id)
            .collect();

        Ok(self
            .get_all()
            .into_iter()
            .filter(|source| enabled.iter().any(|id| id == source.id()))
            .collect())
    }

    pub fn records(&self) -> Result<Vec<SourceRecord>> {
        self.store.get_source_records()
    }

    /// Search every enabled source (optionally only those in `lang`).
    ///
    /// A source that fails, or cannot search, contributes an empty result
    /// instead of failing the whole call. Results are ordered by source id.
    pub async fn search_all(&self, query: &str, lang: Option<&str>) -> Vec<(String, Vec<RemoteTitle>)> {
        let sources = match self.enabled_sources() {
            Ok(sources) => sources,
            Err(e) => {
                warn!("Could not load enabled sources: {}", e);
                return Vec::new();
            }
        };

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let searches = sources
            .into_iter()
            .filter(|source| lang.is_none_or(|lang| source.info().lang == lang))
            .map(|source| {
                let semaphore = semaphore.clone();
                async move {
                    let id = source.id().to_string();
                    if !source.capabilities().search {
                        return (id, Vec::new());
                    }

                    let _permit = semaphore.acquire().await;
                    match source.search(query, 1).await {
                        Ok(results) => (id, results),
                        Err(e) => {
                            warn!("Search failed for source {}: {}", id, e);
                            (id, Vec::new())
                        }
                    }
                }
            });

        let mut results = join_all(searches).await;
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }

    fn require_capable(
        &self,
        source_id: &str,
        operation: SourceOperation,
    ) -> Result<Arc<dyn CatalogSource>> {
        let source = self.require(source_id)?;
        if !source.capabilities().supports(operation) {
            return Err(OmniError::unsupported(source_id, operation));
        }
        Ok(source)
    }

    pub async fn search(&self, source_id: &str, query: &str, page: u32) -> Result<Vec<RemoteTitle>> {
        let source = self.require_capable(source_id, SourceOperation::Search)?;
        source.search(query, page).await
    }

    pub async fn popular(&self, source_id: &str, page: u32) -> Result<Vec<RemoteTitle>> {
        let source = self.require_capable(source_id, SourceOperation::Popular)?;
        source.get_popular(page).await
    }

    pub async fn latest(&self, source_id: &str, page: u32) -> Result<Vec<RemoteTitle>> {
        let source = self.require_capable(source_id, SourceOperation::Latest)?;
        source.get_latest(page).await
    }

    pub async fn details(&self, source_id: &str, remote_id: &str) -> Result<RemoteTitle> {
        self.require(source_id)?.get_details(remote_id).await
    }

    pub async fn chapter_list(&self, source_id: &str, remote_id: &str) -> Result<Vec<RemoteChapter>> {
        self.require(source_id)?.get_chapter_list(remote_id).await
    }

    pub async fn page_list(&self, source_id: &str, remote_chapter_id: &str) -> Result<Vec<String>> {
        self.require(source_id)?
            .get_page_list(remote_chapter_id)
            .await
    }
}
