use chrono::{DateTime, Utc};

use crate::app::{OmniError, Result};
use crate::domain::{HistoryEntry, Title};
use crate::library::Library;
use crate::store::Store;

impl<S: Store> Library<S> {
    /// Newest first.
    pub fn recent_history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.store.get_history(limit)
    }

    /// Distinct titles by their latest read, newest first.
    pub fn recent_titles(&self, limit: usize) -> Result<Vec<(Title, DateTime<Utc>)>> {
        let mut recent = Vec::new();
        for (manga_id, read_at) in self.store.get_recent_reads(limit)? {
            if let Some(title) = self.store.get_title(&manga_id)? {
                recent.push((title, read_at));
            }
        }
        Ok(recent)
    }

    pub fn title_history(&self, title_id: &str) -> Result<Vec<HistoryEntry>> {
        self.require_title(title_id)?;
        self.store.get_history_by_title(title_id)
    }

    pub fn remove_history_entry(&self, id: i64) -> Result<()> {
        if !self.store.delete_history_entry(id)? {
            return Err(OmniError::not_found("history entry", id.to_string()));
        }
        Ok(())
    }

    pub fn clear_title_history(&self, title_id: &str) -> Result<usize> {
        self.require_title(title_id)?;
        self.store.clear_title_history(title_id)
    }

    pub fn clear_history(&self) -> Result<()> {
        self.store.clear_history()
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{Chapter, HistoryEntry, Title};
    use crate::library::Library;
    use crate::source::SourceRegistry;
    use crate::store::{SqliteStore, Store};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn library_with_reads() -> Library<SqliteStore> {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let registry = Arc::new(SourceRegistry::new(store.clone()));

        let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        for (n, remote) in ["a", "b"].iter().enumerate() {
            let title = Title::new("src", remote, remote);
            let chapter = Chapter::new("src", &format!("{}1", remote), &title.id);
            store.put_title(&title).unwrap();
            store.put_chapter(&chapter).unwrap();
            for minute in 0..3 {
                store
                    .add_history(&HistoryEntry::at(
                        &title.id,
                        &chapter.id,
                        None,
                        base + Duration::minutes(n as i64 * 10 + minute),
                    ))
                    .unwrap();
            }
        }

        Library::new(store, registry)
    }

    #[test]
    fn test_recent_titles_are_distinct() {
        let library = library_with_reads();
        let recent = library.recent_titles(10).unwrap();
        let ids: Vec<&str> = recent.iter().map(|(t, _)| t.id.as_str()).collect();
        assert_eq!(ids, vec!["src-b", "src-a"]);
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(recent[0].1, base + Duration::minutes(12));
        assert_eq!(recent[1].1, base + Duration::minutes(2));

        assert_eq!(library.recent_titles(1).unwrap().len(), 1);
    }

    #[test]
    fn test_history_views() {
        let library = library_with_reads();
        assert_eq!(library.recent_history(4).unwrap().len(), 4);
        assert_eq!(library.title_history("src-a").unwrap().len(), 3);
        assert!(library.title_history("src-missing").is_err());

        assert_eq!(library.clear_title_history("src-a").unwrap(), 3);
        assert_eq!(library.recent_history(10).unwrap().len(), 3);
    }

    #[test]
    fn test_remove_entry() {
        let library = library_with_reads();
        let newest = library.recent_history(1).unwrap().remove(0);
        library.remove_history_entry(newest.id).unwrap();
        assert!(library.remove_history_entry(newest.id).is_err());

        library.clear_history().unwrap();
        assert!(library.recent_history(10).unwrap().is_empty());
    }
}
