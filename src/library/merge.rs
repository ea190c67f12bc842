use std::collections::{HashMap, HashSet};

use crate::domain::Chapter;
use crate::transform::derive_unread_count;

/// Result of reconciling a fresh chapter list with the stored one.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Chapters to write: every candidate, with user state carried over.
    pub chapters: Vec<Chapter>,
    pub inserted: usize,
    pub updated: usize,
    /// Stored chapters the source no longer lists. They are kept as is.
    pub retained: usize,
    /// Unread chapters across the merged and retained sets.
    pub unread_count: u32,
}

/// Merge `candidates` into `existing` by chapter id.
///
/// Metadata comes from the candidate. `read`, `bookmark` and
/// `last_page_read` always come from the stored copy. Chapters missing from
/// the candidates are never deleted. Duplicate candidate ids keep the first.
pub fn merge_chapters(existing: &[Chapter], candidates: Vec<Chapter>) -> MergeOutcome {
    let stored: HashMap<&str, &Chapter> = existing.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut seen = HashSet::new();
    let mut outcome = MergeOutcome::default();

    for mut candidate in candidates {
        if !seen.insert(candidate.id.clone()) {
            continue;
        }
        match stored.get(candidate.id.as_str()) {
            Some(previous) => {
                candidate.keep_user_state(previous);
                outcome.updated += 1;
            }
            None => outcome.inserted += 1,
        }
        outcome.chapters.push(candidate);
    }

    let retained: Vec<&Chapter> = existing
        .iter()
        .filter(|chapter| !seen.contains(&chapter.id))
        .collect();
    outcome.retained = retained.len();

    let retained_unread = retained.iter().filter(|chapter| !chapter.read).count() as u32;
    outcome.unread_count = derive_unread_count(&outcome.chapters) + retained_unread;
    outcome
}
