pub mod category;
pub mod chapter;
pub mod history;
pub mod source;
pub mod title;

pub use category::{Category, CategoryFlags, CategoryUpdate, DEFAULT_CATEGORY_ID};
pub use chapter::Chapter;
pub use history::HistoryEntry;
pub use source::SourceRecord;
pub use title::{
    composite_id, default_categories, source_id_of, LibraryState, Title, TitleStatus, ID_SEPARATOR,
};
