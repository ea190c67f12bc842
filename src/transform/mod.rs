//! Maps source records onto local entities.
//!
//! Pure: no store access and no clock reads beyond the timestamp captured
//! when the [`Transformer`] is built.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::domain::title::default_categories;
use crate::domain::{Chapter, Title, TitleStatus};
use crate::source::{RemoteChapter, RemoteTitle};

/// Library flags applied to a freshly transformed title.
#[derive(Debug, Clone)]
pub struct TitleOptions {
    pub in_library: bool,
    pub favorite: bool,
    pub categories: BTreeSet<String>,
}

impl Default for TitleOptions {
    fn default() -> Self {
        Self {
            in_library: false,
            favorite: false,
            categories: default_categories(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Transformer {
    fetched_at: DateTime<Utc>,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// A transformer that stamps every record with `fetched_at`.
    pub fn at(fetched_at: DateTime<Utc>) -> Self {
        Self { fetched_at }
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn title(&self, remote: &RemoteTitle, source_id: &str, opts: TitleOptions) -> Title {
        let mut title = Title::new(source_id, &remote.id, &remote.title);
        title.url = remote.url.clone();
        title.author = remote.author.clone();
        title.artist = remote.artist.clone();
        title.description = remote.description.clone();
        title.genres = remote.genres.clone();
        title.status = TitleStatus::normalize(remote.status.as_deref());
        title.cover_url = remote.cover.clone();

        title.in_library = opts.in_library;
        title.favorite = opts.favorite;
        title.categories = opts.categories;

        title.last_fetched_at = Some(self.fetched_at);
        title
    }

    /// Transformed chapters always start unread; stored progress is merged
    /// back in by the library.
    pub fn chapter(&self, remote: &RemoteChapter, source_id: &str, manga_id: &str) -> Chapter {
        let mut chapter = Chapter::new(source_id, &remote.id, manga_id);
        chapter.url = remote.url.clone();
        chapter.name = remote.name.clone();
        chapter.chapter_number = remote.chapter_number;
        chapter.volume_number = remote.volume_number;
        chapter.scanlator = remote.scanlator.clone();
        chapter.uploaded_at = remote.uploaded_at;
        chapter.fetched_at = self.fetched_at;
        chapter
    }

    pub fn chapters(&self, remote: &[RemoteChapter], source_id: &str, manga_id: &str) -> Vec<Chapter> {
        remote
            .iter()
            .map(|chapter| self.chapter(chapter, source_id, manga_id))
            .collect()
    }
}

pub fn derive_unread_count(chapters: &[Chapter]) -> u32 {
    chapters.iter().filter(|chapter| !chapter.read).count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn remote_title() -> RemoteTitle {
        RemoteTitle {
            id: "md-one-piece".into(),
            title: "One Piece".into(),
            url: "https://example.com/one-piece".into(),
            cover: Some("https://example.com/cover.jpg".into()),
            author: Some("Oda Eiichiro".into()),
            artist: None,
            description: Some("Pirates.".into()),
            genres: vec!["Action".into(), "Adventure".into()],
            status: Some("Publishing".into()),
        }
    }

    fn fixed() -> Transformer {
        Transformer::at(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_title_defaults() {
        let title = fixed().title(&remote_title(), "mangadex", TitleOptions::default());

        assert_eq!(title.id, "mangadex-md-one-piece");
        assert_eq!(title.source_id, "mangadex");
        assert_eq!(title.remote_id, "md-one-piece");
        assert_eq!(title.status, TitleStatus::Ongoing);
        assert!(!title.in_library);
        assert!(!title.favorite);
        assert_eq!(title.categories, BTreeSet::from(["default".to_string()]));
        assert_eq!(title.unread_count, 0);
        assert_eq!(title.cover_url.as_deref(), Some("https://example.com/cover.jpg"));
    }

    #[test]
    fn test_title_applies_options() {
        let opts = TitleOptions {
            in_library: true,
            favorite: true,
            categories: BTreeSet::from(["reading".to_string()]),
        };
        let title = fixed().title(&remote_title(), "mangadex", opts);
        assert!(title.in_library);
        assert!(title.favorite);
        assert!(title.categories.contains("reading"));
        assert!(!title.categories.contains("default"));
    }

    #[test]
    fn test_transform_is_deterministic() {
        let transformer = fixed();
        let a = transformer.title(&remote_title(), "mangadex", TitleOptions::default());
        let b = transformer.title(&remote_title(), "mangadex", TitleOptions::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_chapter_starts_unread() {
        let remote = RemoteChapter {
            id: "md-one-piece-ch-1".into(),
            name: "Romance Dawn".into(),
            url: "https://example.com/ch/1".into(),
            chapter_number: Some(1.0),
            volume_number: Some(1.0),
            scanlator: Some("Group".into()),
            uploaded_at: None,
        };
        let chapter = fixed().chapter(&remote, "mangadex", "mangadex-md-one-piece");

        assert_eq!(chapter.id, "mangadex-md-one-piece-ch-1");
        assert_eq!(chapter.remote_id, "md-one-piece-ch-1");
        assert_eq!(chapter.manga_id, "mangadex-md-one-piece");
        assert!(!chapter.read);
        assert!(!chapter.bookmark);
        assert_eq!(chapter.last_page_read, 0);
        assert_eq!(chapter.pages_count, None);
        assert_eq!(chapter.fetched_at, fixed().fetched_at());
    }

    #[test]
    fn test_derive_unread_count() {
        let transformer = fixed();
        let remote: Vec<RemoteChapter> = (0..20)
            .map(|n| RemoteChapter {
                id: format!("ch-{}", n),
                ..Default::default()
            })
            .collect();
        let mut chapters = transformer.chapters(&remote, "src", "src-m");
        assert_eq!(derive_unread_count(&chapters), 20);

        for chapter in chapters.iter_mut().take(5) {
            chapter.read = true;
        }
        assert_eq!(derive_unread_count(&chapters), 15);
        assert_eq!(derive_unread_count(&[]), 0);
    }
}
