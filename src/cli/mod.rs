pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::library::LibrarySort;

#[derive(Parser)]
#[command(name = "omni")]
#[command(about = "A manga library manager", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/omni/config.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered sources
    Sources,
    /// Enable a source
    Enable { source: String },
    /// Disable a source
    Disable { source: String },
    /// Search enabled sources, or one source
    Search {
        query: String,
        /// Only search sources in this language
        #[arg(long)]
        lang: Option<String>,
        /// Only search this source
        #[arg(short, long)]
        source: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show a source's popular listing
    Popular {
        source: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show a source's latest listing
    Latest {
        source: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Add a title to the library
    Add {
        source: String,
        remote_id: String,
        /// Category id (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
    },
    /// Re-fetch a title's chapters
    Refresh { title: String },
    /// Refresh every library title
    Update {
        /// Only titles in this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Remove a title from the library, keeping its progress
    Remove { title: String },
    /// Delete a title with its chapters and history
    Purge { title: String },
    /// List library titles
    Library {
        /// title-asc, title-desc, last-read, unread-count or date-added
        #[arg(long)]
        sort: Option<LibrarySort>,
        /// Category id, "all" or "uncategorized"
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// List a title's chapters
    Chapters { title: String },
    /// Mark chapters read
    Read {
        #[arg(required = true)]
        chapters: Vec<String>,
    },
    /// Mark chapters unread
    Unread {
        #[arg(required = true)]
        chapters: Vec<String>,
    },
    /// Record reading progress (0-based page index)
    Progress { chapter: String, page: u32 },
    /// Toggle a chapter bookmark
    Bookmark { chapter: String },
    /// Toggle a title favorite
    Favorite { title: String },
    /// Fetch a chapter's page list
    Pages { chapter: String },
    /// Show or clear reading history
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Delete all history
        #[arg(long)]
        clear: bool,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
}

#[derive(Subcommand)]
pub enum CategoryAction {
    /// List categories in display order
    List,
    /// Create a category
    Add { name: String },
    /// Delete a category and remove it from every title
    Remove { id: String },
    /// Move the given categories to the front, in order
    Reorder {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}
