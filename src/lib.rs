//! # omni
//!
//! A local manga library that keeps remote catalogs and your reading state
//! in step.
//!
//! ## Architecture
//!
//! ```text
//! Source → Registry → Transformer → Library → Store → Live queries
//! ```
//!
//! - [`source`]: catalog adapters and the registry that resolves them
//! - [`transform`]: maps remote records to local titles and chapters
//! - [`library`]: add, refresh, remove, purge and read-state flows
//! - [`store`]: SQLite persistence with change notifications
//! - [`query`]: live queries over the store and cached remote reads
//!
//! ## Quick Start
//!
//! ```bash
//! # Find something to read
//! omni search "one piece"
//!
//! # Add it to the library
//! omni add mangadex md-one-piece
//!
//! # Pull new chapters for every library title
//! omni update
//!
//! # Record progress
//! omni progress mangadex-md-one-piece-ch-1 14
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, source registry, library and catalog queries.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/omni/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Title`](domain::Title): a series, keyed by `{source}-{remote id}`
/// - [`Chapter`](domain::Chapter): one installment with reading state
/// - [`HistoryEntry`](domain::HistoryEntry): append-only read events
/// - [`Category`](domain::Category): user-defined library partitions
pub mod domain;

/// Library reconciliation: merging remote chapter lists without losing
/// reading progress.
pub mod library;

/// Change notifications, live queries and remote-read caching.
pub mod query;

/// Catalog sources.
///
/// - [`CatalogSource`](source::CatalogSource): async trait every adapter implements
/// - [`SourceRegistry`](source::SourceRegistry): id → adapter map plus persisted enabled flags
/// - [`MemoryCatalog`](source::MemoryCatalog): in-memory adapter with a demo data set
pub mod source;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

/// Pure mapping from remote records to local entities.
pub mod transform;
