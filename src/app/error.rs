use thiserror::Error;

use crate::source::SourceOperation;

#[derive(Error, Debug)]
pub enum OmniError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Invalid source id {0:?}: must be non-empty and must not contain '-'")]
    InvalidSourceId(String),

    #[error("Source {source_id} does not support {operation}")]
    UnsupportedOperation {
        source_id: String,
        operation: SourceOperation,
    },

    #[error("Source {source_id} failed during {operation}: {message}")]
    SourceFetch {
        source_id: String,
        operation: SourceOperation,
        message: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Chapter {chapter_id} references missing title {manga_id}")]
    ReferentialIntegrity { chapter_id: String, manga_id: String },

    #[error("Chapter {chapter_id} belongs to {owner}, not {manga_id}")]
    ChapterOwnership {
        chapter_id: String,
        owner: String,
        manga_id: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl OmniError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn fetch(
        source_id: impl Into<String>,
        operation: SourceOperation,
        message: impl ToString,
    ) -> Self {
        Self::SourceFetch {
            source_id: source_id.into(),
            operation,
            message: message.to_string(),
        }
    }

    pub fn unsupported(source_id: impl Into<String>, operation: SourceOperation) -> Self {
        Self::UnsupportedOperation {
            source_id: source_id.into(),
            operation,
        }
    }

    /// Whether the failure came from a remote source call.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::SourceFetch { .. })
    }
}

pub type Result<T> = std::result::Result<T, OmniError>;
