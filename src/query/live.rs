use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::debug;

use crate::app::Result;
use crate::query::{ChangeNotifier, Collection, StoreChange};

type QueryFn<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;

/// A derived view that re-runs its query whenever one of the watched
/// collections changes.
///
/// The subscription is taken before the first run, so no write committed
/// after construction can be missed.
pub struct LiveQuery<T> {
    rx: broadcast::Receiver<StoreChange>,
    watched: Vec<Collection>,
    query: QueryFn<T>,
    current: T,
}

impl<T> LiveQuery<T> {
    pub fn new<F>(
        notifier: &ChangeNotifier,
        watched: impl IntoIterator<Item = Collection>,
        query: F,
    ) -> Result<Self>
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        let rx = notifier.subscribe();
        let current = query()?;
        Ok(Self {
            rx,
            watched: watched.into_iter().collect(),
            query: Box::new(query),
            current,
        })
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    fn is_relevant(&self, change: &StoreChange) -> bool {
        self.watched.contains(&change.collection)
    }

    fn rerun(&mut self) -> Result<()> {
        self.current = (self.query)()?;
        Ok(())
    }

    /// Wait for the next relevant change and re-run the query.
    ///
    /// Returns `None` once the store is gone. A lagged receiver re-runs
    /// unconditionally since the missed changes are unknown.
    pub async fn changed(&mut self) -> Result<Option<&T>> {
        loop {
            match self.rx.recv().await {
                Ok(change) if self.is_relevant(&change) => break,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Live query lagged by {} changes", skipped);
                    break;
                }
                Err(RecvError::Closed) => return Ok(None),
            }
        }

        self.rerun()?;
        Ok(Some(&self.current))
    }

    /// Drain pending notifications without waiting. Re-runs the query at
    /// most once and reports whether it did.
    pub fn refresh(&mut self) -> Result<bool> {
        let mut dirty = false;
        loop {
            match self.rx.try_recv() {
                Ok(change) => dirty |= self.is_relevant(&change),
                Err(TryRecvError::Lagged(_)) => dirty = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if dirty {
            self.rerun()?;
        }
        Ok(dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Title;
    use crate::store::{SqliteStore, Store};
    use std::sync::Arc;

    fn library_query(store: &Arc<SqliteStore>) -> LiveQuery<Vec<Title>> {
        let source = store.clone();
        LiveQuery::new(store.changes(), [Collection::Titles], move || {
            source.get_library_titles()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_reruns_after_relevant_write() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mut live = library_query(&store);
        assert!(live.current().is_empty());

        let mut title = Title::new("src", "one", "One");
        title.in_library = true;
        store.put_title(&title).unwrap();

        let titles = live.changed().await.unwrap().unwrap();
        assert_eq!(titles.len(), 1);
    }

    #[test]
    fn test_refresh_ignores_other_collections() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mut live = library_query(&store);

        store.clear_history().unwrap();
        assert!(!live.refresh().unwrap());

        store.put_title(&Title::new("src", "one", "One")).unwrap();
        store.put_title(&Title::new("src", "two", "Two")).unwrap();
        assert!(live.refresh().unwrap());
        assert!(!live.refresh().unwrap());
    }

    #[test]
    fn test_lagged_receiver_reruns() {
        let notifier = ChangeNotifier::new(1);
        let mut live = LiveQuery::new(&notifier, [Collection::Titles], || Ok(1)).unwrap();

        notifier.emit_all(Collection::History);
        notifier.emit_all(Collection::History);
        assert!(live.refresh().unwrap());
    }
}
