//! Trailing-edge coalescing of reading progress.
//!
//! A reader scrolling through a chapter reports every page. Recording each
//! one would append a history row per page, so reports are held per chapter
//! and only the last one is written once the chapter has been quiet for the
//! debounce delay.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::app::{OmniError, Result};
use crate::library::Library;
use crate::store::Store;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

enum Command {
    Record { chapter_id: String, page: u32 },
    Flush(oneshot::Sender<()>),
}

struct Pending {
    page: u32,
    due: Instant,
}

pub struct ProgressDebouncer {
    tx: mpsc::UnboundedSender<Command>,
    handle: JoinHandle<()>,
}

impl ProgressDebouncer {
    /// Spawn the coalescing task on the current runtime.
    pub fn spawn<S: Store + 'static>(library: Arc<Library<S>>, delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(library, delay, rx));
        Self { tx, handle }
    }

    pub fn record(&self, chapter_id: &str, page: u32) -> Result<()> {
        self.tx
            .send(Command::Record {
                chapter_id: chapter_id.to_string(),
                page,
            })
            .map_err(|_| closed())
    }

    /// Write everything pending now, without waiting for the delay.
    pub async fn flush(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.tx.send(Command::Flush(ack)).map_err(|_| closed())?;
        done.await.map_err(|_| closed())
    }

    /// Write everything pending and stop the task.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.tx);
        self.handle
            .await
            .map_err(|e| OmniError::Other(format!("progress task failed: {}", e)))
    }
}

fn closed() -> OmniError {
    OmniError::Other("progress debouncer has stopped".into())
}

async fn run<S: Store>(
    library: Arc<Library<S>>,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    let mut pending: HashMap<String, Pending> = HashMap::new();

    loop {
        let next_due = pending.values().map(|p| p.due).min();

        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Record { chapter_id, page }) => {
                    pending.insert(chapter_id, Pending { page, due: Instant::now() + delay });
                }
                Some(Command::Flush(ack)) => {
                    write(&library, &mut pending, None);
                    let _ = ack.send(());
                }
                None => {
                    write(&library, &mut pending, None);
                    break;
                }
            },
            _ = sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                write(&library, &mut pending, Some(Instant::now()));
            }
        }
    }

    debug!("Progress debouncer stopped");
}

/// Write entries due by `now`, or all of them when `now` is `None`.
fn write<S: Store>(
    library: &Library<S>,
    pending: &mut HashMap<String, Pending>,
    now: Option<Instant>,
) {
    let due: Vec<String> = pending
        .iter()
        .filter(|(_, p)| now.is_none_or(|now| p.due <= now))
        .map(|(id, _)| id.clone())
        .collect();

    for chapter_id in due {
        if let Some(entry) = pending.remove(&chapter_id) {
            if let Err(e) = library.update_progress(&chapter_id, entry.page) {
                warn!("Failed to save progress for {}: {}", chapter_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemoryCatalog, SourceRegistry};
    use crate::store::SqliteStore;

    const TITLE_ID: &str = "mangadex-md-one-piece";
    const CHAPTER_ID: &str = "mangadex-md-one-piece-ch-1";

    async fn library() -> Arc<Library<SqliteStore>> {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let registry = Arc::new(SourceRegistry::new(store.clone()));
        registry.register(Arc::new(MemoryCatalog::demo())).unwrap();
        let library = Library::new(store, registry);
        library
            .add_to_library("mangadex", "md-one-piece", None)
            .await
            .unwrap();
        Arc::new(library)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_coalesced() {
        let library = library().await;
        let debouncer = ProgressDebouncer::spawn(library.clone(), DEFAULT_DEBOUNCE);

        for page in 1..=5 {
            debouncer.record(CHAPTER_ID, page).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(library.store().get_history(10).unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let history = library.store().get_history_by_title(TITLE_ID).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].pages_read, Some(5));
        assert_eq!(library.chapter(CHAPTER_ID).unwrap().last_page_read, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_report_restarts_delay() {
        let library = library().await;
        let debouncer = ProgressDebouncer::spawn(library.clone(), DEFAULT_DEBOUNCE);

        debouncer.record(CHAPTER_ID, 1).unwrap();
        tokio::time::sleep(Duration::from_millis(800)).await;
        debouncer.record(CHAPTER_ID, 2).unwrap();
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(library.store().get_history(10).unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(library.store().get_history(10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_flush_writes_immediately() {
        let library = library().await;
        let debouncer = ProgressDebouncer::spawn(library.clone(), Duration::from_secs(60));

        debouncer.record(CHAPTER_ID, 4).unwrap();
        debouncer.flush().await.unwrap();
        assert_eq!(library.chapter(CHAPTER_ID).unwrap().last_page_read, 4);
    }

    #[tokio::test]
    async fn test_shutdown_writes_pending() {
        let library = library().await;
        let debouncer = ProgressDebouncer::spawn(library.clone(), Duration::from_secs(60));

        debouncer.record(CHAPTER_ID, 9).unwrap();
        debouncer.shutdown().await.unwrap();
        assert_eq!(library.chapter(CHAPTER_ID).unwrap().last_page_read, 9);
    }
}
