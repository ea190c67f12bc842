//! In-memory catalog source.
//!
//! Serves a fixed set of records with the same paging and capability rules a
//! network source follows. The application registers a demo instance at
//! startup; tests build their own and mutate the chapter lists to simulate
//! remote changes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use crate::app::{OmniError, Result};
use crate::source::{
    Capabilities, CatalogSource, RemoteChapter, RemoteTitle, SourceInfo, SourceOperation,
};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_PAGES_PER_CHAPTER: usize = 15;

pub struct MemoryCatalog {
    info: SourceInfo,
    page_size: usize,
    pages_per_chapter: usize,
    titles: RwLock<Vec<RemoteTitle>>,
    chapters: RwLock<HashMap<String, Vec<RemoteChapter>>>,
    offline: AtomicBool,
}

impl MemoryCatalog {
    pub fn new(info: SourceInfo) -> Self {
        Self {
            info,
            page_size: DEFAULT_PAGE_SIZE,
            pages_per_chapter: DEFAULT_PAGES_PER_CHAPTER,
            titles: RwLock::new(Vec::new()),
            chapters: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// A source with every capability enabled.
    pub fn with_id(id: &str) -> Self {
        Self::new(SourceInfo {
            id: id.to_string(),
            name: id.to_string(),
            lang: "en".to_string(),
            version: "1.0.0".to_string(),
            icon: None,
            capabilities: Capabilities::all(),
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_pages_per_chapter(mut self, pages: usize) -> Self {
        self.pages_per_chapter = pages;
        self
    }

    pub fn with_title(self, title: RemoteTitle, chapters: Vec<RemoteChapter>) -> Self {
        if let (Ok(mut titles), Ok(mut map)) = (self.titles.write(), self.chapters.write()) {
            map.insert(title.id.clone(), chapters);
            titles.push(title);
        }
        self
    }

    /// Replace the chapter list served for a title.
    pub fn set_chapters(&self, remote_id: &str, chapters: Vec<RemoteChapter>) -> Result<()> {
        let mut map = self.chapters.write().map_err(lock_error)?;
        map.insert(remote_id.to_string(), chapters);
        Ok(())
    }

    pub fn push_chapter(&self, remote_id: &str, chapter: RemoteChapter) -> Result<()> {
        let mut map = self.chapters.write().map_err(lock_error)?;
        map.entry(remote_id.to_string()).or_default().push(chapter);
        Ok(())
    }

    /// Make every call fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self, operation: SourceOperation) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(OmniError::fetch(
                &self.info.id,
                operation,
                "source is offline",
            ));
        }
        Ok(())
    }

    fn check_capability(&self, operation: SourceOperation) -> Result<()> {
        if !self.info.capabilities.supports(operation) {
            return Err(OmniError::unsupported(&self.info.id, operation));
        }
        Ok(())
    }

    /// Slice one 1-based page out of `items`. Page 0 is treated as page 1.
    fn paginate<T: Clone>(&self, items: &[T], page: u32) -> Vec<T> {
        let page = page.max(1) as usize;
        items
            .iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
            .cloned()
            .collect()
    }

    /// Demo catalog: a handful of series with twenty chapters each.
    pub fn demo() -> Self {
        let info = SourceInfo {
            id: "mangadex".to_string(),
            name: "MangaDex (demo)".to_string(),
            lang: "en".to_string(),
            version: "1.0.0".to_string(),
            icon: Some("https://mangadex.org/favicon.ico".to_string()),
            capabilities: Capabilities::all(),
        };

        let series = [
            ("md-one-piece", "One Piece", "Oda Eiichiro", "ongoing", &["Action", "Adventure", "Comedy"][..]),
            ("md-jujutsu-kaisen", "Jujutsu Kaisen", "Akutami Gege", "ongoing", &["Action", "Supernatural"][..]),
            ("md-chainsaw-man", "Chainsaw Man", "Fujimoto Tatsuki", "completed", &["Action", "Horror"][..]),
            ("md-spy-family", "SPY x FAMILY", "Endou Tatsuya", "ongoing", &["Action", "Comedy"][..]),
            ("md-demon-slayer", "Demon Slayer: Kimetsu no Yaiba", "Gotouge Koyoharu", "completed", &["Action", "Historical"][..]),
            ("md-my-hero-academia", "My Hero Academia", "Horikoshi Kouhei", "ongoing", &["Action", "Superhero"][..]),
            ("md-tokyo-ghoul", "Tokyo Ghoul", "Ishida Sui", "completed", &["Horror", "Psychological"][..]),
            ("md-attack-on-titan", "Attack on Titan", "Isayama Hajime", "completed", &["Action", "Drama"][..]),
        ];

        let mut catalog = Self::new(info);
        for (id, name, author, status, genres) in series {
            let title = RemoteTitle {
                id: id.to_string(),
                title: name.to_string(),
                url: format!("https://mangadex.org/title/{}", id),
                cover: Some(format!(
                    "https://placehold.co/400x600?text={}",
                    name.replace(' ', "+")
                )),
                author: Some(author.to_string()),
                artist: Some(author.to_string()),
                description: Some(format!("{} by {}.", name, author)),
                genres: genres.iter().map(|g| g.to_string()).collect(),
                status: Some(status.to_string()),
            };
            let chapters = demo_chapters(id, 20);
            catalog = catalog.with_title(title, chapters);
        }
        catalog
    }
}

fn demo_chapters(remote_id: &str, count: u32) -> Vec<RemoteChapter> {
    let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single();
    (1..=count)
        .rev()
        .map(|n| RemoteChapter {
            id: format!("{}-ch-{}", remote_id, n),
            name: format!("Chapter {}", n),
            url: format!("https://mangadex.org/chapter/{}-{}", remote_id, n),
            chapter_number: Some(f64::from(n)),
            volume_number: None,
            scanlator: Some("Scanlation Group".to_string()),
            uploaded_at: epoch.map(|e| e + Duration::days(i64::from(n))),
        })
        .collect()
}

fn lock_error<E: std::fmt::Display>(e: E) -> OmniError {
    OmniError::Other(format!("catalog lock poisoned: {}", e))
}

#[async_trait]
impl CatalogSource for MemoryCatalog {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    async fn get_details(&self, remote_id: &str) -> Result<RemoteTitle> {
        self.check_online(SourceOperation::Details)?;
        let titles = self.titles.read().map_err(lock_error)?;
        titles
            .iter()
            .find(|t| t.id == remote_id)
            .cloned()
            .ok_or_else(|| OmniError::not_found("remote title", remote_id))
    }

    async fn get_chapter_list(&self, remote_id: &str) -> Result<Vec<RemoteChapter>> {
        self.check_online(SourceOperation::ChapterList)?;
        let map = self.chapters.read().map_err(lock_error)?;
        map.get(remote_id)
            .cloned()
            .ok_or_else(|| OmniError::not_found("remote title", remote_id))
    }

    async fn get_page_list(&self, remote_chapter_id: &str) -> Result<Vec<String>> {
        self.check_online(SourceOperation::PageList)?;
        let map = self.chapters.read().map_err(lock_error)?;
        let known = map
            .values()
            .flatten()
            .any(|chapter| chapter.id == remote_chapter_id);
        if !known {
            return Err(OmniError::not_found("remote chapter", remote_chapter_id));
        }

        Ok((1..=self.pages_per_chapter)
            .map(|n| {
                format!(
                    "https://pages.example/{}/{}/{}.jpg",
                    self.info.id, remote_chapter_id, n
                )
            })
            .collect())
    }

    async fn search(&self, query: &str, page: u32) -> Result<Vec<RemoteTitle>> {
        self.check_capability(SourceOperation::Search)?;
        self.check_online(SourceOperation::Search)?;

        let needle = query.to_lowercase();
        let titles = self.titles.read().map_err(lock_error)?;
        let matches: Vec<RemoteTitle> = titles
            .iter()
            .filter(|t| {
                t.title.to_lowercase().contains(&needle)
                    || t.author
                        .as_deref()
                        .is_some_and(|a| a.to_lowercase().contains(&needle))
                    || t.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();

        Ok(self.paginate(&matches, page))
    }

    async fn get_popular(&self, page: u32) -> Result<Vec<RemoteTitle>> {
        self.check_capability(SourceOperation::Popular)?;
        self.check_online(SourceOperation::Popular)?;
        let titles = self.titles.read().map_err(lock_error)?;
        Ok(self.paginate(&titles, page))
    }

    async fn get_latest(&self, page: u32) -> Result<Vec<RemoteTitle>> {
        self.check_capability(SourceOperation::Latest)?;
        self.check_online(SourceOperation::Latest)?;
        let titles = self.titles.read().map_err(lock_error)?;
        let reversed: Vec<RemoteTitle> = titles.iter().rev().cloned().collect();
        Ok(self.paginate(&reversed, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn numbered_catalog(count: usize) -> MemoryCatalog {
        let mut catalog = MemoryCatalog::with_id("test").with_page_size(4);
        for n in 0..count {
            catalog = catalog.with_title(
                RemoteTitle {
                    id: format!("t{}", n),
                    title: format!("Title {}", n),
                    ..Default::default()
                },
                Vec::new(),
            );
        }
        catalog
    }

    #[tokio::test]
    async fn test_popular_pages_are_disjoint_and_ordered() {
        let catalog = numbered_catalog(11);

        let first = catalog.get_popular(1).await.unwrap();
        let second = catalog.get_popular(2).await.unwrap();

        let first_ids: HashSet<_> = first.iter().map(|t| t.id.clone()).collect();
        let second_ids: HashSet<_> = second.iter().map(|t| t.id.clone()).collect();
        assert!(first_ids.is_disjoint(&second_ids));

        let union: Vec<String> = first.iter().chain(second.iter()).map(|t| t.id.clone()).collect();
        let expected: Vec<String> = (0..8).map(|n| format!("t{}", n)).collect();
        assert_eq!(union, expected);
    }

    #[tokio::test]
    async fn test_popular_past_end_is_empty() {
        let catalog = numbered_catalog(3);
        assert_eq!(catalog.get_popular(1).await.unwrap().len(), 3);
        assert!(catalog.get_popular(2).await.unwrap().is_empty());
        // Page 0 is clamped to page 1
        assert_eq!(catalog.get_popular(0).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_latest_is_reverse_order() {
        let catalog = numbered_catalog(3);
        let latest = catalog.get_latest(1).await.unwrap();
        let ids: Vec<_> = latest.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t1", "t0"]);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let catalog = MemoryCatalog::demo();
        let results = catalog.search("CHAINSAW", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "md-chainsaw-man");

        let by_author = catalog.search("oda", 1).await.unwrap();
        assert!(by_author.iter().any(|t| t.id == "md-one-piece"));
    }

    #[tokio::test]
    async fn test_unknown_title_is_not_found() {
        let catalog = MemoryCatalog::demo();
        let err = catalog.get_details("missing").await.unwrap_err();
        assert!(matches!(err, OmniError::NotFound { .. }));
        let err = catalog.get_chapter_list("missing").await.unwrap_err();
        assert!(matches!(err, OmniError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_offline_surfaces_fetch_error() {
        let catalog = MemoryCatalog::demo();
        catalog.set_offline(true);

        let err = catalog.get_details("md-one-piece").await.unwrap_err();
        match err {
            OmniError::SourceFetch {
                source_id,
                operation,
                ..
            } => {
                assert_eq!(source_id, "mangadex");
                assert_eq!(operation, SourceOperation::Details);
            }
            other => panic!("unexpected error: {other}"),
        }

        catalog.set_offline(false);
        assert!(catalog.get_details("md-one-piece").await.is_ok());
    }

    #[tokio::test]
    async fn test_page_list() {
        let catalog = MemoryCatalog::demo();
        let pages = catalog.get_page_list("md-one-piece-ch-3").await.unwrap();
        assert_eq!(pages.len(), DEFAULT_PAGES_PER_CHAPTER);
        assert!(pages[0].ends_with("/1.jpg"));

        assert!(catalog.get_page_list("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_capability_is_unsupported() {
        let mut info = MemoryCatalog::demo().info().clone();
        info.capabilities.latest = false;
        let catalog = MemoryCatalog::new(info);
        let err = catalog.get_latest(1).await.unwrap_err();
        assert!(matches!(err, OmniError::UnsupportedOperation { .. }));
    }

    #[tokio::test]
    async fn test_set_chapters_replaces_list() {
        let catalog = MemoryCatalog::demo();
        catalog
            .set_chapters(
                "md-one-piece",
                vec![RemoteChapter {
                    id: "only".into(),
                    ..Default::default()
                }],
            )
            .unwrap();
        let chapters = catalog.get_chapter_list("md-one-piece").await.unwrap();
        assert_eq!(chapters.len(), 1);
    }
}
