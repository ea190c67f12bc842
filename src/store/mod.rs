pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{Category, Chapter, HistoryEntry, SourceRecord, Title};
use crate::query::ChangeNotifier;

pub use sqlite::SqliteStore;

/// Records written together in one transaction.
///
/// Titles are written first, then chapters, then history rows, so a chapter
/// may reference a title from the same batch.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub titles: Vec<Title>,
    pub chapters: Vec<Chapter>,
    pub history: Vec<HistoryEntry>,
}

impl WriteBatch {
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty() && self.chapters.is_empty() && self.history.is_empty()
    }
}

/// What a purge removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub chapters: usize,
    pub history: usize,
}

/// Persistence for the four library collections plus source records.
///
/// Every write is a whole-record upsert inside one statement or transaction,
/// and emits a [`StoreChange`](crate::query::StoreChange) once committed.
pub trait Store: Send + Sync {
    fn changes(&self) -> &ChangeNotifier;

    // Title operations
    fn get_title(&self, id: &str) -> Result<Option<Title>>;
    fn get_all_titles(&self) -> Result<Vec<Title>>;
    /// In-library titles, most recently read first.
    fn get_library_titles(&self) -> Result<Vec<Title>>;
    fn get_favorite_titles(&self) -> Result<Vec<Title>>;
    fn get_titles_by_category(&self, category_id: &str) -> Result<Vec<Title>>;
    fn get_titles_by_source(&self, source_id: &str) -> Result<Vec<Title>>;
    fn put_title(&self, title: &Title) -> Result<()>;
    fn put_titles(&self, titles: &[Title]) -> Result<usize>;
    /// Delete a title with its chapters and history. `None` if absent.
    fn purge_title(&self, id: &str) -> Result<Option<PurgeReport>>;

    // Chapter operations
    fn get_chapter(&self, id: &str) -> Result<Option<Chapter>>;
    /// Chapters of one title, highest chapter number first.
    fn get_chapters_by_title(&self, manga_id: &str) -> Result<Vec<Chapter>>;
    fn count_unread(&self, manga_id: &str) -> Result<u32>;
    fn put_chapter(&self, chapter: &Chapter) -> Result<()>;
    fn put_chapters(&self, chapters: &[Chapter]) -> Result<usize>;

    // History operations
    fn add_history(&self, entry: &HistoryEntry) -> Result<i64>;
    /// Newest first.
    fn get_history(&self, limit: usize) -> Result<Vec<HistoryEntry>>;
    fn get_history_by_title(&self, manga_id: &str) -> Result<Vec<HistoryEntry>>;
    /// Distinct title ids with their latest read time, newest first.
    fn get_recent_reads(&self, limit: usize) -> Result<Vec<(String, DateTime<Utc>)>>;
    fn delete_history_entry(&self, id: i64) -> Result<bool>;
    fn clear_title_history(&self, manga_id: &str) -> Result<usize>;
    fn clear_history(&self) -> Result<()>;

    // Category operations
    fn get_category(&self, id: &str) -> Result<Option<Category>>;
    /// Ordered by `order`, then name.
    fn get_categories(&self) -> Result<Vec<Category>>;
    fn put_category(&self, category: &Category) -> Result<()>;
    fn put_categories(&self, categories: &[Category]) -> Result<()>;
    /// Delete a category and prune it from every title in one transaction.
    /// Returns the ids of the titles that referenced it.
    fn delete_category(&self, id: &str) -> Result<Option<Vec<String>>>;

    // Source record operations
    fn get_source_record(&self, id: &str) -> Result<Option<SourceRecord>>;
    fn get_source_records(&self) -> Result<Vec<SourceRecord>>;
    /// Insert unless a record already exists. Returns whether it inserted.
    fn insert_source_record(&self, record: &SourceRecord) -> Result<bool>;
    fn set_source_enabled(&self, id: &str, enabled: bool) -> Result<bool>;

    /// Write a batch atomically.
    fn commit(&self, batch: &WriteBatch) -> Result<()>;

    /// Delete every record in every collection.
    fn clear_all(&self) -> Result<()>;
}
