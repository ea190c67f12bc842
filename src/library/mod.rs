//! Library reconciliation engine.
//!
//! Every flow reads what it needs, awaits the source if it has to, and then
//! writes its result through a single [`WriteBatch`]. A failure before that
//! commit leaves the store as it was.
//!
//! There is no optimistic concurrency control: two flows that read the same
//! record and write it back can lose one update. Network flows re-read the
//! stored records after the fetch returns, which narrows that window to the
//! local read-modify-write.

pub mod categories;
pub mod history;
pub mod merge;
pub mod progress;
pub mod view;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::app::{OmniError, Result};
use crate::domain::{composite_id, default_categories, Chapter, HistoryEntry, Title};
use crate::query::{Collection, LiveQuery};
use crate::source::{SourceRegistry, DEFAULT_WORKERS};
use crate::store::{PurgeReport, Store, WriteBatch};
use crate::transform::{TitleOptions, Transformer};

pub use merge::{merge_chapters, MergeOutcome};
pub use progress::ProgressDebouncer;
pub use view::{CategoryFilter, LibrarySort};

/// What a sync wrote for one title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub title_id: String,
    pub inserted: usize,
    pub updated: usize,
    pub retained: usize,
    pub unread_count: u32,
}

impl SyncReport {
    fn new(title_id: &str, outcome: &MergeOutcome) -> Self {
        Self {
            title_id: title_id.to_string(),
            inserted: outcome.inserted,
            updated: outcome.updated,
            retained: outcome.retained,
            unread_count: outcome.unread_count,
        }
    }
}

/// Which library titles a bulk update refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateScope {
    /// Titles in a category flagged for global updates, or in none.
    All,
    Category(String),
}

pub struct Library<S: Store> {
    store: Arc<S>,
    registry: Arc<SourceRegistry<S>>,
    workers: usize,
}

impl<S: Store> Library<S> {
    pub fn new(store: Arc<S>, registry: Arc<SourceRegistry<S>>) -> Self {
        Self::with_workers(store, registry, DEFAULT_WORKERS)
    }

    pub fn with_workers(store: Arc<S>, registry: Arc<SourceRegistry<S>>, workers: usize) -> Self {
        Self {
            store,
            registry,
            workers: workers.max(1),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<SourceRegistry<S>> {
        &self.registry
    }

    fn require_title(&self, id: &str) -> Result<Title> {
        self.store
            .get_title(id)?
            .ok_or_else(|| OmniError::not_found("title", id))
    }

    fn require_chapter(&self, id: &str) -> Result<Chapter> {
        self.store
            .get_chapter(id)?
            .ok_or_else(|| OmniError::not_found("chapter", id))
    }

    /// Load every chapter in `ids`, failing on the first missing one.
    fn require_chapters(&self, ids: &[String]) -> Result<Vec<Chapter>> {
        let mut seen = HashSet::new();
        let mut chapters = Vec::with_capacity(ids.len());
        for id in ids {
            if seen.insert(id.as_str()) {
                chapters.push(self.require_chapter(id)?);
            }
        }
        Ok(chapters)
    }

    fn ensure_categories(&self, categories: &BTreeSet<String>) -> Result<()> {
        for id in categories {
            if self.store.get_category(id)?.is_none() {
                return Err(OmniError::not_found("category", id.clone()));
            }
        }
        Ok(())
    }

    /// Unread count for a title as it will be once `pending` is written.
    fn unread_after(&self, manga_id: &str, pending: &[Chapter]) -> Result<u32> {
        let overrides: HashMap<&str, &Chapter> = pending
            .iter()
            .filter(|c| c.manga_id == manga_id)
            .map(|c| (c.id.as_str(), c))
            .collect();

        let unread = self
            .store
            .get_chapters_by_title(manga_id)?
            .iter()
            .map(|stored| overrides.get(stored.id.as_str()).copied().unwrap_or(stored))
            .filter(|chapter| !chapter.read)
            .count();
        Ok(unread as u32)
    }

    pub fn title(&self, id: &str) -> Result<Title> {
        self.require_title(id)
    }

    pub fn chapter(&self, id: &str) -> Result<Chapter> {
        self.require_chapter(id)
    }

    pub fn chapters(&self, title_id: &str) -> Result<Vec<Chapter>> {
        self.require_title(title_id)?;
        self.store.get_chapters_by_title(title_id)
    }

    pub fn library_titles(&self) -> Result<Vec<Title>> {
        self.store.get_library_titles()
    }

    pub fn favorites(&self) -> Result<Vec<Title>> {
        self.store.get_favorite_titles()
    }

    /// In-library titles filtered, searched and sorted for display.
    pub fn library_view(
        &self,
        category: &CategoryFilter,
        query: Option<&str>,
        order: LibrarySort,
    ) -> Result<Vec<Title>> {
        Ok(view::process(self.store.get_library_titles()?, category, query, order))
    }

    /// Fetch a title and its chapters and store them as a library member.
    ///
    /// `categories` defaults to the stored set for a known title and to the
    /// default category otherwise. Re-adding a removed title keeps chapter
    /// progress. Fails with [`OmniError::ChapterOwnership`] if the source
    /// reuses a chapter id already stored under another title.
    pub async fn add_to_library(
        &self,
        source_id: &str,
        remote_id: &str,
        categories: Option<BTreeSet<String>>,
    ) -> Result<SyncReport> {
        let source = self.registry.require(source_id)?;
        if let Some(categories) = &categories {
            self.ensure_categories(categories)?;
        }

        debug!("Adding {}/{} to library", source_id, remote_id);
        let (mut remote, remote_chapters) = tokio::try_join!(
            source.get_details(remote_id),
            source.get_chapter_list(remote_id)
        )?;
        remote.id = remote_id.to_string();

        let transformer = Transformer::new();
        let id = composite_id(source_id, remote_id);
        let existing = self.store.get_title(&id)?;

        let categories = categories
            .or_else(|| existing.as_ref().map(|t| t.categories.clone()))
            .unwrap_or_else(default_categories);
        let opts = TitleOptions {
            in_library: true,
            favorite: existing.as_ref().is_some_and(|t| t.favorite),
            categories,
        };

        let mut title = transformer.title(&remote, source_id, opts);
        title.added_at = Some(transformer.fetched_at());
        if let Some(previous) = &existing {
            title.last_read_at = previous.last_read_at;
            if previous.in_library {
                title.added_at = previous.added_at.or(title.added_at);
            }
        }

        let stored = self.store.get_chapters_by_title(&id)?;
        let candidates = transformer.chapters(&remote_chapters, source_id, &id);
        let outcome = merge_chapters(&stored, candidates);
        title.unread_count = outcome.unread_count;

        let report = SyncReport::new(&id, &outcome);
        self.store.commit(&WriteBatch {
            titles: vec![title],
            chapters: outcome.chapters,
            history: Vec::new(),
        })?;

        info!(
            "Added {} to library ({} chapters, {} unread)",
            id,
            report.inserted + report.updated + report.retained,
            report.unread_count
        );
        Ok(report)
    }

    /// Re-fetch a title's chapter list and merge it into the stored one.
    pub async fn refresh(&self, title_id: &str) -> Result<SyncReport> {
        let title = self.require_title(title_id)?;
        let source = self.registry.require(&title.source_id)?;

        debug!("Refreshing chapters for {}", title_id);
        let remote = source.get_chapter_list(&title.remote_id).await?;

        let transformer = Transformer::new();
        let mut title = self.require_title(title_id)?;
        let stored = self.store.get_chapters_by_title(title_id)?;
        let candidates = transformer.chapters(&remote, &title.source_id, title_id);
        let outcome = merge_chapters(&stored, candidates);

        title.unread_count = outcome.unread_count;
        title.last_fetched_at = Some(transformer.fetched_at());

        let report = SyncReport::new(title_id, &outcome);
        self.store.commit(&WriteBatch {
            titles: vec![title],
            chapters: outcome.chapters,
            history: Vec::new(),
        })?;

        debug!(
            "Refreshed {}: {} new, {} updated, {} retained",
            title_id, report.inserted, report.updated, report.retained
        );
        Ok(report)
    }

    /// Refresh many library titles concurrently. Individual failures are
    /// reported per title and do not stop the others.
    pub async fn update_library(
        &self,
        scope: &UpdateScope,
    ) -> Result<Vec<(String, Result<SyncReport>)>> {
        let titles = self.store.get_library_titles()?;

        let ids: Vec<String> = match scope {
            UpdateScope::All => {
                let global: HashSet<String> = self
                    .store
                    .get_categories()?
                    .into_iter()
                    .filter(|c| c.flags.include_in_global_update)
                    .map(|c| c.id)
                    .collect();
                titles
                    .into_iter()
                    .filter(|t| t.categories.is_empty() || t.categories.iter().any(|c| global.contains(c)))
                    .map(|t| t.id)
                    .collect()
            }
            UpdateScope::Category(category_id) => {
                if self.store.get_category(category_id)?.is_none() {
                    return Err(OmniError::not_found("category", category_id.clone()));
                }
                titles
                    .into_iter()
                    .filter(|t| t.categories.contains(category_id))
                    .map(|t| t.id)
                    .collect()
            }
        };

        info!("Updating {} library titles with {} workers", ids.len(), self.workers);

        let results: Vec<(String, Result<SyncReport>)> = stream::iter(ids)
            .map(|id| async move {
                let result = self.refresh(&id).await;
                if let Err(e) = &result {
                    warn!("Failed to update {}: {}", id, e);
                }
                (id, result)
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        info!(
            "Library update finished: {} succeeded, {} failed",
            results.len() - failed,
            failed
        );
        Ok(results)
    }

    /// Soft removal: the record, chapters and history stay.
    pub fn remove_from_library(&self, title_id: &str) -> Result<()> {
        let mut title = self.require_title(title_id)?;
        title.in_library = false;
        title.favorite = false;
        self.store.put_title(&title)
    }

    /// Delete a title with all of its chapters and history.
    pub fn purge(&self, title_id: &str) -> Result<PurgeReport> {
        let report = self
            .store
            .purge_title(title_id)?
            .ok_or_else(|| OmniError::not_found("title", title_id))?;
        info!(
            "Purged {} ({} chapters, {} history entries)",
            title_id, report.chapters, report.history
        );
        Ok(report)
    }

    pub fn mark_read(&self, chapter_id: &str) -> Result<()> {
        self.mark_chapters_read(&[chapter_id.to_string()])
    }

    pub fn mark_unread(&self, chapter_id: &str) -> Result<()> {
        self.mark_chapters_unread(&[chapter_id.to_string()])
    }

    /// Mark chapters read, append one history entry per chapter and stamp
    /// each parent title's `last_read_at`.
    pub fn mark_chapters_read(&self, chapter_ids: &[String]) -> Result<()> {
        self.set_read_state(chapter_ids, true)
    }

    /// Mark chapters unread and reset their progress. History is kept.
    pub fn mark_chapters_unread(&self, chapter_ids: &[String]) -> Result<()> {
        self.set_read_state(chapter_ids, false)
    }

    fn set_read_state(&self, chapter_ids: &[String], read: bool) -> Result<()> {
        let mut chapters = self.require_chapters(chapter_ids)?;
        if chapters.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let mut history = Vec::new();
        for chapter in &mut chapters {
            if read {
                chapter.mark_read();
                history.push(HistoryEntry::at(&chapter.manga_id, &chapter.id, None, now));
            } else {
                chapter.mark_unread();
            }
        }

        let manga_ids: BTreeSet<&str> = chapters.iter().map(|c| c.manga_id.as_str()).collect();
        let mut titles = Vec::with_capacity(manga_ids.len());
        for manga_id in manga_ids {
            let mut title = self.require_title(manga_id)?;
            title.unread_count = self.unread_after(manga_id, &chapters)?;
            if read {
                title.last_read_at = Some(now);
            }
            titles.push(title);
        }

        debug!(
            "Marked {} chapters {}",
            chapters.len(),
            if read { "read" } else { "unread" }
        );
        self.store.commit(&WriteBatch {
            titles,
            chapters,
            history,
        })
    }

    /// Record reading progress on a chapter.
    ///
    /// Reaching the last page also marks the chapter read; that produces a
    /// single history entry, not two. Callers reading continuously should
    /// go through a [`ProgressDebouncer`].
    pub fn update_progress(&self, chapter_id: &str, page_index: u32) -> Result<Chapter> {
        let mut chapter = self.require_chapter(chapter_id)?;
        let mut title = self.require_title(&chapter.manga_id)?;

        chapter.last_page_read = page_index;
        if chapter.is_last_page(page_index) {
            chapter.mark_read();
        }

        let now = Utc::now();
        title.last_read_at = Some(now);
        title.unread_count = self.unread_after(&title.id, std::slice::from_ref(&chapter))?;

        self.store.commit(&WriteBatch {
            titles: vec![title],
            chapters: vec![chapter.clone()],
            history: vec![HistoryEntry::at(
                &chapter.manga_id,
                &chapter.id,
                Some(page_index),
                now,
            )],
        })?;
        Ok(chapter)
    }

    /// Returns the new value.
    pub fn toggle_favorite(&self, title_id: &str) -> Result<bool> {
        let mut title = self.require_title(title_id)?;
        title.favorite = !title.favorite;
        self.store.put_title(&title)?;
        Ok(title.favorite)
    }

    /// Returns the new value.
    pub fn toggle_bookmark(&self, chapter_id: &str) -> Result<bool> {
        let mut chapter = self.require_chapter(chapter_id)?;
        chapter.bookmark = !chapter.bookmark;
        self.store.put_chapter(&chapter)?;
        Ok(chapter.bookmark)
    }

    pub fn set_categories(&self, title_id: &str, categories: BTreeSet<String>) -> Result<()> {
        let mut title = self.require_title(title_id)?;
        self.ensure_categories(&categories)?;
        title.categories = categories;
        self.store.put_title(&title)
    }

    /// Fetch a chapter's page list and record its page count.
    pub async fn load_pages(&self, chapter_id: &str) -> Result<Vec<String>> {
        let chapter = self.require_chapter(chapter_id)?;
        let source = self.registry.require(&chapter.source_id)?;
        let pages = source.get_page_list(&chapter.remote_id).await?;

        let mut chapter = self.require_chapter(chapter_id)?;
        let count = pages.len() as u32;
        if chapter.pages_count != Some(count) {
            chapter.pages_count = Some(count);
            self.store.put_chapter(&chapter)?;
        }
        Ok(pages)
    }
}

impl<S: Store + 'static> Library<S> {
    /// In-library titles, re-queried whenever titles change.
    pub fn watch_library(&self) -> Result<LiveQuery<Vec<Title>>> {
        let store = self.store.clone();
        LiveQuery::new(self.store.changes(), [Collection::Titles], move || {
            store.get_library_titles()
        })
    }

    /// One title's chapters, re-queried whenever chapters change.
    pub fn watch_chapters(&self, title_id: &str) -> Result<LiveQuery<Vec<Chapter>>> {
        let store = self.store.clone();
        let title_id = title_id.to_string();
        LiveQuery::new(self.store.changes(), [Collection::Chapters], move || {
            store.get_chapters_by_title(&title_id)
        })
    }
}
