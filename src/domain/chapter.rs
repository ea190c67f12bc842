use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::title::composite_id;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub manga_id: String,
    pub source_id: String,
    pub remote_id: String,
    pub url: String,
    pub name: String,
    pub chapter_number: Option<f64>,
    pub volume_number: Option<f64>,
    pub scanlator: Option<String>,

    // User state. Owned locally, never taken from a remote copy.
    pub read: bool,
    pub bookmark: bool,
    pub last_page_read: u32,

    pub pages_count: Option<u32>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
}

impl Chapter {
    pub fn new(source_id: &str, remote_id: &str, manga_id: &str) -> Self {
        Self {
            id: composite_id(source_id, remote_id),
            manga_id: manga_id.to_string(),
            source_id: source_id.to_string(),
            remote_id: remote_id.to_string(),
            url: String::new(),
            name: String::new(),
            chapter_number: None,
            volume_number: None,
            scanlator: None,
            read: false,
            bookmark: false,
            last_page_read: 0,
            pages_count: None,
            uploaded_at: None,
            fetched_at: Utc::now(),
        }
    }

    /// Copy the user-owned fields from a previously stored copy.
    pub fn keep_user_state(&mut self, existing: &Chapter) {
        self.read = existing.read;
        self.bookmark = existing.bookmark;
        self.last_page_read = existing.last_page_read;
        if self.pages_count.is_none() {
            self.pages_count = existing.pages_count;
        }
    }

    /// Mark as read. `last_page_read` moves to `pages_count` when known and
    /// is otherwise left where it was.
    pub fn mark_read(&mut self) {
        self.read = true;
        if let Some(pages) = self.pages_count {
            self.last_page_read = pages;
        }
    }

    pub fn mark_unread(&mut self) {
        self.read = false;
        self.last_page_read = 0;
    }

    pub fn is_last_page(&self, page_index: u32) -> bool {
        self.pages_count
            .is_some_and(|pages| pages > 0 && page_index >= pages - 1)
    }

    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        match self.chapter_number {
            Some(number) => format!("Chapter {}", number),
            None => "(Untitled)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_chapter_is_unread() {
        let chapter = Chapter::new("src", "ch-1", "src-manga");
        assert_eq!(chapter.id, "src-ch-1");
        assert!(!chapter.read);
        assert!(!chapter.bookmark);
        assert_eq!(chapter.last_page_read, 0);
        assert!(chapter.pages_count.is_none());
    }

    #[test]
    fn test_mark_read_uses_pages_count_when_known() {
        let mut chapter = Chapter::new("src", "ch-1", "src-manga");
        chapter.pages_count = Some(15);
        chapter.last_page_read = 3;
        chapter.mark_read();
        assert!(chapter.read);
        assert_eq!(chapter.last_page_read, 15);
    }

    #[test]
    fn test_mark_read_keeps_progress_when_pages_unknown() {
        let mut chapter = Chapter::new("src", "ch-1", "src-manga");
        chapter.last_page_read = 7;
        chapter.mark_read();
        assert!(chapter.read);
        assert_eq!(chapter.last_page_read, 7);
    }

    #[test]
    fn test_mark_unread_resets_progress() {
        let mut chapter = Chapter::new("src", "ch-1", "src-manga");
        chapter.pages_count = Some(10);
        chapter.mark_read();
        chapter.mark_unread();
        assert!(!chapter.read);
        assert_eq!(chapter.last_page_read, 0);
    }

    #[test]
    fn test_is_last_page() {
        let mut chapter = Chapter::new("src", "ch-1", "src-manga");
        assert!(!chapter.is_last_page(100));

        chapter.pages_count = Some(10);
        assert!(!chapter.is_last_page(8));
        assert!(chapter.is_last_page(9));
        assert!(chapter.is_last_page(12));

        chapter.pages_count = Some(0);
        assert!(!chapter.is_last_page(0));
    }

    #[test]
    fn test_keep_user_state() {
        let mut existing = Chapter::new("src", "ch-1", "src-manga");
        existing.read = true;
        existing.bookmark = true;
        existing.last_page_read = 12;
        existing.pages_count = Some(20);

        let mut fresh = Chapter::new("src", "ch-1", "src-manga");
        fresh.name = "Renamed".into();
        fresh.keep_user_state(&existing);

        assert!(fresh.read);
        assert!(fresh.bookmark);
        assert_eq!(fresh.last_page_read, 12);
        assert_eq!(fresh.pages_count, Some(20));
        assert_eq!(fresh.name, "Renamed");
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut chapter = Chapter::new("src", "ch-1", "src-manga");
        assert_eq!(chapter.display_name(), "(Untitled)");
        chapter.chapter_number = Some(10.5);
        assert_eq!(chapter.display_name(), "Chapter 10.5");
        chapter.name = "The End".into();
        assert_eq!(chapter.display_name(), "The End");
    }
}
