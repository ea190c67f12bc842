//! Reactive query layer.
//!
//! Nothing here is a source of truth. Store writes are observed through
//! [`ChangeNotifier`] and re-derived by [`LiveQuery`]; remote reads are kept
//! briefly in [`QueryCache`]s.

pub mod cache;
pub mod changes;
pub mod live;

pub use cache::{CatalogQueries, QueryCache};
pub use changes::{ChangeNotifier, Collection, StoreChange};
pub use live::LiveQuery;
