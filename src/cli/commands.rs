use std::collections::BTreeSet;

use crate::app::{AppContext, Result};
use crate::domain::Title;
use crate::library::{CategoryFilter, LibrarySort, UpdateScope};
use crate::source::RemoteTitle;

pub fn list_sources(ctx: &AppContext) -> Result<()> {
    let records = ctx.registry.records()?;

    if records.is_empty() {
        println!("No sources");
        return Ok(());
    }

    for record in records {
        let status = if record.enabled { "enabled" } else { "disabled" };
        println!(
            "{} [{}] {} v{} ({})",
            record.id, record.lang, record.name, record.version, status
        );
    }
    Ok(())
}

pub fn set_source_enabled(ctx: &AppContext, source_id: &str, enabled: bool) -> Result<()> {
    ctx.registry.set_enabled(source_id, enabled)?;
    ctx.queries.invalidate_source(source_id);
    println!(
        "{} {}",
        if enabled { "Enabled" } else { "Disabled" },
        source_id
    );
    Ok(())
}

fn print_remote_titles(source_id: &str, titles: &[RemoteTitle]) {
    for title in titles {
        println!("  {} {} ({})", source_id, title.id, title.title);
    }
}

pub async fn search(
    ctx: &AppContext,
    query: &str,
    lang: Option<&str>,
    source: Option<&str>,
    page: u32,
) -> Result<()> {
    if let Some(source_id) = source {
        let titles = ctx.queries.search(source_id, query, page).await?;
        println!("{} results from {}", titles.len(), source_id);
        print_remote_titles(source_id, &titles);
        return Ok(());
    }

    for (source_id, titles) in ctx.registry.search_all(query, lang).await {
        println!("{} results from {}", titles.len(), source_id);
        print_remote_titles(&source_id, &titles);
    }
    Ok(())
}

pub async fn popular(ctx: &AppContext, source_id: &str, page: u32) -> Result<()> {
    let titles = ctx.queries.popular(source_id, page).await?;
    print_remote_titles(source_id, &titles);
    Ok(())
}

pub async fn latest(ctx: &AppContext, source_id: &str, page: u32) -> Result<()> {
    let titles = ctx.queries.latest(source_id, page).await?;
    print_remote_titles(source_id, &titles);
    Ok(())
}

pub async fn add(
    ctx: &AppContext,
    source_id: &str,
    remote_id: &str,
    categories: Vec<String>,
) -> Result<()> {
    let categories = if categories.is_empty() {
        None
    } else {
        Some(categories.into_iter().collect::<BTreeSet<_>>())
    };

    let report = ctx
        .library
        .add_to_library(source_id, remote_id, categories)
        .await?;
    ctx.queries.invalidate_title(source_id, remote_id);

    let title = ctx.library.title(&report.title_id)?;
    println!(
        "Added {} ({}): {} chapters, {} unread",
        title.title,
        title.id,
        report.inserted + report.updated + report.retained,
        report.unread_count
    );
    Ok(())
}

pub async fn refresh(ctx: &AppContext, title_id: &str) -> Result<()> {
    let report = ctx.library.refresh(title_id).await?;
    println!(
        "Refreshed {}: {} new, {} updated, {} unread",
        title_id, report.inserted, report.updated, report.unread_count
    );
    Ok(())
}

pub async fn update(ctx: &AppContext, category: Option<String>) -> Result<()> {
    let scope = match category {
        Some(id) => UpdateScope::Category(id),
        None => UpdateScope::All,
    };

    let results = ctx.library.update_library(&scope).await?;
    if results.is_empty() {
        println!("No titles to update");
        return Ok(());
    }

    let mut total_new = 0;
    let mut errors = 0;

    for (title_id, result) in results {
        match result {
            Ok(report) => {
                total_new += report.inserted;
                if report.inserted > 0 {
                    println!("  {} new chapters for {}", report.inserted, title_id);
                }
            }
            Err(e) => {
                errors += 1;
                eprintln!("  Error updating {}: {}", title_id, e);
            }
        }
    }

    println!("Update complete: {} new chapters, {} errors", total_new, errors);
    Ok(())
}

pub fn remove(ctx: &AppContext, title_id: &str) -> Result<()> {
    ctx.library.remove_from_library(title_id)?;
    println!("Removed {} from library", title_id);
    Ok(())
}

pub fn purge(ctx: &AppContext, title_id: &str) -> Result<()> {
    let report = ctx.library.purge(title_id)?;
    println!(
        "Purged {}: {} chapters, {} history entries",
        title_id, report.chapters, report.history
    );
    Ok(())
}

fn print_title(title: &Title) {
    let favorite = if title.favorite { "*" } else { " " };
    println!(
        "{} {} - {} by {} [{}] ({} unread)",
        favorite,
        title.id,
        title.title,
        title.display_author(),
        title.status,
        title.unread_count
    );
}

pub fn list_library(
    ctx: &AppContext,
    sort: Option<LibrarySort>,
    category: Option<&str>,
    search: Option<&str>,
) -> Result<()> {
    let filter = category.map(CategoryFilter::parse).unwrap_or_default();
    let sort = sort.unwrap_or(ctx.config.library.default_sort);
    let titles = ctx.library.library_view(&filter, search, sort)?;

    if titles.is_empty() {
        println!("Library is empty");
        return Ok(());
    }

    for title in &titles {
        print_title(title);
    }
    Ok(())
}

pub fn list_chapters(ctx: &AppContext, title_id: &str) -> Result<()> {
    let title = ctx.library.title(title_id)?;
    println!("{} ({} unread)", title.title, title.unread_count);

    for chapter in ctx.library.chapters(title_id)? {
        let status = if chapter.read { "x" } else { " " };
        let bookmark = if chapter.bookmark { "b" } else { " " };
        let progress = match chapter.pages_count {
            Some(pages) => format!("{}/{}", chapter.last_page_read, pages),
            None => chapter.last_page_read.to_string(),
        };
        println!(
            "  [{}{}] {} {} ({})",
            status,
            bookmark,
            chapter.id,
            chapter.display_name(),
            progress
        );
    }
    Ok(())
}

pub fn mark(ctx: &AppContext, chapter_ids: &[String], read: bool) -> Result<()> {
    if read {
        ctx.library.mark_chapters_read(chapter_ids)?;
    } else {
        ctx.library.mark_chapters_unread(chapter_ids)?;
    }
    println!(
        "Marked {} chapters {}",
        chapter_ids.len(),
        if read { "read" } else { "unread" }
    );
    Ok(())
}

pub fn progress(ctx: &AppContext, chapter_id: &str, page: u32) -> Result<()> {
    let chapter = ctx.library.update_progress(chapter_id, page)?;
    if chapter.read {
        println!("Finished {}", chapter.display_name());
    } else {
        println!("Saved {} at page {}", chapter.display_name(), page);
    }
    Ok(())
}

pub fn bookmark(ctx: &AppContext, chapter_id: &str) -> Result<()> {
    let on = ctx.library.toggle_bookmark(chapter_id)?;
    println!("{} {}", if on { "Bookmarked" } else { "Unbookmarked" }, chapter_id);
    Ok(())
}

pub fn favorite(ctx: &AppContext, title_id: &str) -> Result<()> {
    let on = ctx.library.toggle_favorite(title_id)?;
    println!("{} {}", if on { "Favorited" } else { "Unfavorited" }, title_id);
    Ok(())
}

pub async fn pages(ctx: &AppContext, chapter_id: &str) -> Result<()> {
    for (index, page) in ctx.library.load_pages(chapter_id).await?.iter().enumerate() {
        println!("{:>3} {}", index, page);
    }
    Ok(())
}

pub fn history(ctx: &AppContext, limit: usize, clear: bool) -> Result<()> {
    if clear {
        ctx.library.clear_history()?;
        println!("History cleared");
        return Ok(());
    }

    let entries = ctx.library.recent_history(limit)?;
    if entries.is_empty() {
        println!("No history");
        return Ok(());
    }

    for entry in entries {
        let pages = entry
            .pages_read
            .map(|p| format!(" page {}", p))
            .unwrap_or_default();
        println!(
            "{} {}{}",
            entry.last_read_at.format("%Y-%m-%d %H:%M"),
            entry.chapter_id,
            pages
        );
    }
    Ok(())
}

pub fn list_categories(ctx: &AppContext) -> Result<()> {
    for category in ctx.library.categories()? {
        println!("{:>3} {} ({})", category.order, category.name, category.id);
    }
    Ok(())
}

pub fn add_category(ctx: &AppContext, name: &str) -> Result<()> {
    let category = ctx.library.create_category(name)?;
    println!("Created category {} ({})", category.name, category.id);
    Ok(())
}

pub fn remove_category(ctx: &AppContext, id: &str) -> Result<()> {
    let affected = ctx.library.delete_category(id)?;
    println!("Deleted category {} ({} titles updated)", id, affected.len());
    Ok(())
}

pub fn reorder_categories(ctx: &AppContext, ids: &[String]) -> Result<()> {
    ctx.library.reorder_categories(ids)?;
    list_categories(ctx)
}
