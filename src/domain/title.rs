use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::category::DEFAULT_CATEGORY_ID;

/// Separator between the source id and the remote id in composite ids.
pub const ID_SEPARATOR: char = '-';

/// Build the `"{source_id}-{remote_id}"` lookup key.
pub fn composite_id(source_id: &str, remote_id: &str) -> String {
    format!("{}{}{}", source_id, ID_SEPARATOR, remote_id)
}

/// Recover the source id from a composite id.
///
/// The source id is everything before the first separator. Remote ids may
/// contain the separator; source ids may not (the registry rejects them).
pub fn source_id_of(id: &str) -> Option<&str> {
    id.split_once(ID_SEPARATOR)
        .map(|(source, _)| source)
        .filter(|source| !source.is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleStatus {
    Ongoing,
    Completed,
    Hiatus,
    Cancelled,
    #[default]
    Unknown,
}

impl TitleStatus {
    /// Map free-text publication status onto the fixed enum.
    ///
    /// Case-insensitive substring match, checked in priority order.
    pub fn normalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Unknown;
        };
        let normalized = raw.to_lowercase();

        if normalized.contains("ongoing") || normalized.contains("publishing") {
            Self::Ongoing
        } else if normalized.contains("completed") || normalized.contains("finished") {
            Self::Completed
        } else if normalized.contains("hiatus") {
            Self::Hiatus
        } else if normalized.contains("cancelled") || normalized.contains("canceled") {
            Self::Cancelled
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Hiatus => "hiatus",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TitleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TitleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            "hiatus" => Ok(Self::Hiatus),
            "cancelled" => Ok(Self::Cancelled),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown title status: {}", other)),
        }
    }
}

/// Where a title sits in the library lifecycle. `Purged` titles have no
/// record, so they never show up here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryState {
    Discovered,
    InLibrary,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub id: String,
    pub source_id: String,
    pub remote_id: String,
    pub url: String,
    pub title: String,
    pub author: Option<String>,
    pub artist: Option<String>,
    pub description: Option<String>,
    pub genres: Vec<String>,
    pub status: TitleStatus,
    pub cover_url: Option<String>,

    pub favorite: bool,
    pub in_library: bool,
    pub categories: BTreeSet<String>,

    pub unread_count: u32,
    pub added_at: Option<DateTime<Utc>>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub last_read_at: Option<DateTime<Utc>>,
}

impl Title {
    pub fn new(source_id: &str, remote_id: &str, title: &str) -> Self {
        Self {
            id: composite_id(source_id, remote_id),
            source_id: source_id.to_string(),
            remote_id: remote_id.to_string(),
            url: String::new(),
            title: title.to_string(),
            author: None,
            artist: None,
            description: None,
            genres: Vec::new(),
            status: TitleStatus::Unknown,
            cover_url: None,
            favorite: false,
            in_library: false,
            categories: default_categories(),
            unread_count: 0,
            added_at: None,
            last_fetched_at: None,
            last_read_at: None,
        }
    }

    pub fn library_state(&self) -> LibraryState {
        if self.in_library {
            LibraryState::InLibrary
        } else if self.added_at.is_some() {
            LibraryState::Removed
        } else {
            LibraryState::Discovered
        }
    }

    pub fn display_author(&self) -> &str {
        self.author
            .as_deref()
            .or(self.artist.as_deref())
            .unwrap_or("Unknown author")
    }
}

pub fn default_categories() -> BTreeSet<String> {
    BTreeSet::from([DEFAULT_CATEGORY_ID.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_id_format() {
        assert_eq!(composite_id("mangadex", "md-one-piece"), "mangadex-md-one-piece");
    }

    #[test]
    fn test_source_id_splits_at_first_separator() {
        assert_eq!(source_id_of("mangadex-md-one-piece"), Some("mangadex"));
        assert_eq!(source_id_of("mangadex"), None);
        assert_eq!(source_id_of("-orphan"), None);
    }

    #[test]
    fn test_normalize_status_priority() {
        assert_eq!(TitleStatus::normalize(Some("Ongoing")), TitleStatus::Ongoing);
        assert_eq!(TitleStatus::normalize(Some("PUBLISHING")), TitleStatus::Ongoing);
        assert_eq!(TitleStatus::normalize(Some("Finished")), TitleStatus::Completed);
        assert_eq!(TitleStatus::normalize(Some("on hiatus")), TitleStatus::Hiatus);
        assert_eq!(TitleStatus::normalize(Some("Canceled")), TitleStatus::Cancelled);
        assert_eq!(TitleStatus::normalize(Some("cancelled")), TitleStatus::Cancelled);
        assert_eq!(TitleStatus::normalize(Some("licensed")), TitleStatus::Unknown);
        assert_eq!(TitleStatus::normalize(None), TitleStatus::Unknown);
    }

    #[test]
    fn test_normalize_status_first_match_wins() {
        // "ongoing" outranks "completed" when both appear
        assert_eq!(
            TitleStatus::normalize(Some("completed season, ongoing series")),
            TitleStatus::Ongoing
        );
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            TitleStatus::Ongoing,
            TitleStatus::Completed,
            TitleStatus::Hiatus,
            TitleStatus::Cancelled,
            TitleStatus::Unknown,
        ] {
            assert_eq!(status.as_str().parse::<TitleStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_library_state() {
        let mut title = Title::new("src", "1", "Title");
        assert_eq!(title.library_state(), LibraryState::Discovered);

        title.in_library = true;
        title.added_at = Some(Utc::now());
        assert_eq!(title.library_state(), LibraryState::InLibrary);

        title.in_library = false;
        assert_eq!(title.library_state(), LibraryState::Removed);
    }

    #[test]
    fn test_new_title_defaults() {
        let title = Title::new("src", "abc", "Title");
        assert_eq!(title.id, "src-abc");
        assert!(!title.favorite);
        assert!(!title.in_library);
        assert!(title.categories.contains(DEFAULT_CATEGORY_ID));
    }
}
