//! Pure views over library titles: sorting, category filtering and search.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::Title;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LibrarySort {
    #[default]
    TitleAsc,
    TitleDesc,
    LastRead,
    UnreadCount,
    DateAdded,
}

impl LibrarySort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TitleAsc => "title-asc",
            Self::TitleDesc => "title-desc",
            Self::LastRead => "last-read",
            Self::UnreadCount => "unread-count",
            Self::DateAdded => "date-added",
        }
    }
}

impl fmt::Display for LibrarySort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LibrarySort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "title-asc" | "title" => Ok(Self::TitleAsc),
            "title-desc" => Ok(Self::TitleDesc),
            "last-read" => Ok(Self::LastRead),
            "unread-count" | "unread" => Ok(Self::UnreadCount),
            "date-added" | "added" => Ok(Self::DateAdded),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    /// Titles with an empty category set.
    Uncategorized,
    Category(String),
}

impl CategoryFilter {
    pub fn parse(s: &str) -> Self {
        match s {
            "all" => Self::All,
            "uncategorized" => Self::Uncategorized,
            id => Self::Category(id.to_string()),
        }
    }

    pub fn matches(&self, title: &Title) -> bool {
        match self {
            Self::All => true,
            Self::Uncategorized => title.categories.is_empty(),
            Self::Category(id) => title.categories.contains(id),
        }
    }
}

fn by_name(a: &Title, b: &Title) -> Ordering {
    a.title.to_lowercase().cmp(&b.title.to_lowercase())
}

/// Sort in place. Ties fall back to the display title. Missing timestamps
/// sort last.
pub fn sort(titles: &mut [Title], order: LibrarySort) {
    match order {
        LibrarySort::TitleAsc => titles.sort_by(by_name),
        LibrarySort::TitleDesc => titles.sort_by(|a, b| by_name(b, a)),
        LibrarySort::LastRead => titles.sort_by(|a, b| {
            b.last_read_at
                .is_some()
                .cmp(&a.last_read_at.is_some())
                .then_with(|| b.last_read_at.cmp(&a.last_read_at))
                .then_with(|| by_name(a, b))
        }),
        LibrarySort::UnreadCount => titles.sort_by(|a, b| {
            b.unread_count
                .cmp(&a.unread_count)
                .then_with(|| by_name(a, b))
        }),
        LibrarySort::DateAdded => titles.sort_by(|a, b| {
            b.added_at
                .is_some()
                .cmp(&a.added_at.is_some())
                .then_with(|| b.added_at.cmp(&a.added_at))
                .then_with(|| by_name(a, b))
        }),
    }
}

pub fn filter(titles: Vec<Title>, category: &CategoryFilter) -> Vec<Title> {
    titles.into_iter().filter(|t| category.matches(t)).collect()
}

/// Case-insensitive match on title, author or artist. A blank query keeps
/// everything.
pub fn search(titles: Vec<Title>, query: &str) -> Vec<Title> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return titles;
    }

    titles
        .into_iter()
        .filter(|t| {
            t.title.to_lowercase().contains(&needle)
                || t.author
                    .as_deref()
                    .is_some_and(|a| a.to_lowercase().contains(&needle))
                || t.artist
                    .as_deref()
                    .is_some_and(|a| a.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Filter, then search, then sort.
pub fn process(
    titles: Vec<Title>,
    category: &CategoryFilter,
    query: Option<&str>,
    order: LibrarySort,
) -> Vec<Title> {
    let mut titles = filter(titles, category);
    if let Some(query) = query {
        titles = search(titles, query);
    }
    sort(&mut titles, order);
    titles
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn titles() -> Vec<Title> {
        let mut berserk = Title::new("src", "berserk", "Berserk");
        berserk.author = Some("Miura Kentarou".into());
        berserk.unread_count = 3;
        berserk.last_read_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        berserk.added_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        let mut akira = Title::new("src", "akira", "Akira");
        akira.artist = Some("Otomo Katsuhiro".into());
        akira.unread_count = 10;
        akira.categories = BTreeSet::from(["reading".to_string()]);
        akira.added_at = Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());

        let mut monster = Title::new("src", "monster", "monster");
        monster.categories = BTreeSet::new();
        monster.last_read_at = Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());

        vec![berserk, akira, monster]
    }

    fn names(titles: &[Title]) -> Vec<&str> {
        titles.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_sort_orders() {
        let mut list = titles();
        sort(&mut list, LibrarySort::TitleAsc);
        assert_eq!(names(&list), vec!["Akira", "Berserk", "monster"]);

        sort(&mut list, LibrarySort::TitleDesc);
        assert_eq!(names(&list), vec!["monster", "Berserk", "Akira"]);

        sort(&mut list, LibrarySort::LastRead);
        assert_eq!(names(&list), vec!["monster", "Berserk", "Akira"]);

        sort(&mut list, LibrarySort::UnreadCount);
        assert_eq!(names(&list), vec!["Akira", "Berserk", "monster"]);

        sort(&mut list, LibrarySort::DateAdded);
        assert_eq!(names(&list), vec!["Akira", "Berserk", "monster"]);
    }

    #[test]
    fn test_category_filter() {
        assert_eq!(filter(titles(), &CategoryFilter::All).len(), 3);
        assert_eq!(
            names(&filter(titles(), &CategoryFilter::Uncategorized)),
            vec!["monster"]
        );
        assert_eq!(
            names(&filter(titles(), &CategoryFilter::parse("reading"))),
            vec!["Akira"]
        );
    }

    #[test]
    fn test_search_covers_author_and_artist() {
        assert_eq!(names(&search(titles(), "MIURA")), vec!["Berserk"]);
        assert_eq!(names(&search(titles(), "otomo")), vec!["Akira"]);
        assert_eq!(search(titles(), "  ").len(), 3);
    }

    #[test]
    fn test_process_combines_steps() {
        let result = process(
            titles(),
            &CategoryFilter::parse("default"),
            Some("e"),
            LibrarySort::TitleDesc,
        );
        assert_eq!(names(&result), vec!["Berserk"]);
    }

    #[test]
    fn test_parse_sort() {
        assert_eq!("last-read".parse::<LibrarySort>().unwrap(), LibrarySort::LastRead);
        assert_eq!("Date-Added".parse::<LibrarySort>().unwrap(), LibrarySort::DateAdded);
        assert!("sideways".parse::<LibrarySort>().is_err());
    }
}
