use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{OmniError, Result};
use crate::config::Config;
use crate::library::{Library, ProgressDebouncer};
use crate::query::CatalogQueries;
use crate::source::{MemoryCatalog, SourceRegistry};
use crate::store::sqlite::SqliteStore;

/// Process-wide wiring. Built once at startup and passed by reference to
/// everything that needs the store, a source or the library.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub registry: Arc<SourceRegistry<SqliteStore>>,
    pub library: Arc<Library<SqliteStore>>,
    pub queries: CatalogQueries<SqliteStore>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match &config.library.database_path {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(config, store)
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let workers = config.library.update_workers;
        let registry = Arc::new(SourceRegistry::with_workers(store.clone(), workers));
        registry.register(Arc::new(MemoryCatalog::demo()))?;

        let library = Arc::new(Library::with_workers(
            store.clone(),
            registry.clone(),
            workers,
        ));
        let queries = CatalogQueries::new(registry.clone(), &config.cache);

        Ok(Self {
            config,
            store,
            registry,
            library,
            queries,
        })
    }

    /// A debouncer for reading progress, using the configured delay.
    pub fn progress_debouncer(&self) -> ProgressDebouncer {
        ProgressDebouncer::spawn(self.library.clone(), self.config.reader.progress_debounce())
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| OmniError::Config("Could not find data directory".into()))?;
        let omni_dir = data_dir.join("omni");
        std::fs::create_dir_all(&omni_dir)?;
        Ok(omni_dir.join("omni.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[test]
    fn test_demo_source_registered() {
        let ctx = AppContext::in_memory(Config::default()).unwrap();
        assert!(ctx.registry.get("mangadex").is_some());
        assert!(ctx.store.get_source_record("mangadex").unwrap().is_some());
    }

    #[test]
    fn test_database_path_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.library.database_path = Some(dir.path().join("library.db"));

        AppContext::new(config).unwrap();
        assert!(dir.path().join("library.db").exists());
    }

    #[tokio::test]
    async fn test_debouncer_from_context() {
        let ctx = AppContext::in_memory(Config::default()).unwrap();
        ctx.library
            .add_to_library("mangadex", "md-spy-family", None)
            .await
            .unwrap();

        let debouncer = ctx.progress_debouncer();
        debouncer.record("mangadex-md-spy-family-ch-1", 2).unwrap();
        debouncer.shutdown().await.unwrap();
        assert_eq!(ctx.store.get_history(5).unwrap().len(), 1);
    }
}
