use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One read or progress event. Rows are appended, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub manga_id: String,
    pub chapter_id: String,
    pub last_read_at: DateTime<Utc>,
    pub pages_read: Option<u32>,
}

impl HistoryEntry {
    pub fn new(manga_id: &str, chapter_id: &str, pages_read: Option<u32>) -> Self {
        Self::at(manga_id, chapter_id, pages_read, Utc::now())
    }

    pub fn at(
        manga_id: &str,
        chapter_id: &str,
        pages_read: Option<u32>,
        last_read_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            manga_id: manga_id.to_string(),
            chapter_id: chapter_id.to_string(),
            last_read_at,
            pages_read,
        }
    }
}
