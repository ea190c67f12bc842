pub mod memory;
pub mod registry;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{OmniError, Result};

pub use memory::MemoryCatalog;
pub use registry::{SourceRegistry, DEFAULT_WORKERS};

/// Names an adapter call, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceOperation {
    Details,
    ChapterList,
    PageList,
    Search,
    Popular,
    Latest,
}

impl fmt::Display for SourceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Details => "details",
            Self::ChapterList => "chapter list",
            Self::PageList => "page list",
            Self::Search => "search",
            Self::Popular => "popular",
            Self::Latest => "latest",
        };
        f.write_str(name)
    }
}

/// Optional operations an adapter declares support for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub search: bool,
    pub popular: bool,
    pub latest: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            search: true,
            popular: true,
            latest: true,
        }
    }

    pub fn supports(&self, operation: SourceOperation) -> bool {
        match operation {
            SourceOperation::Search => self.search,
            SourceOperation::Popular => self.popular,
            SourceOperation::Latest => self.latest,
            SourceOperation::Details | SourceOperation::ChapterList | SourceOperation::PageList => {
                true
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub id: String,
    pub name: String,
    pub lang: String,
    pub version: String,
    pub icon: Option<String>,
    pub capabilities: Capabilities,
}

/// A title as a source describes it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemoteTitle {
    pub id: String,
    pub title: String,
    pub url: String,
    pub cover: Option<String>,
    pub author: Option<String>,
    pub artist: Option<String>,
    pub description: Option<String>,
    pub genres: Vec<String>,
    /// Free text; normalized by the transformer.
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemoteChapter {
    pub id: String,
    pub name: String,
    pub url: String,
    pub chapter_number: Option<f64>,
    pub volume_number: Option<f64>,
    pub scanlator: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// A provider of remote catalog data.
///
/// Network failures must surface as [`OmniError::SourceFetch`]; an unknown
/// remote id as [`OmniError::NotFound`]. The optional listings default to
/// [`OmniError::UnsupportedOperation`] and are gated by
/// [`SourceInfo::capabilities`].
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn info(&self) -> &SourceInfo;

    fn id(&self) -> &str {
        &self.info().id
    }

    fn capabilities(&self) -> Capabilities {
        self.info().capabilities
    }

    async fn get_details(&self, remote_id: &str) -> Result<RemoteTitle>;

    /// Chapters in whatever order the source keeps them.
    async fn get_chapter_list(&self, remote_id: &str) -> Result<Vec<RemoteChapter>>;

    /// Page image URIs, in reading order.
    async fn get_page_list(&self, remote_chapter_id: &str) -> Result<Vec<String>>;

    async fn search(&self, _query: &str, _page: u32) -> Result<Vec<RemoteTitle>> {
        Err(OmniError::unsupported(self.id(), SourceOperation::Search))
    }

    async fn get_popular(&self, _page: u32) -> Result<Vec<RemoteTitle>> {
        Err(OmniError::unsupported(self.id(), SourceOperation::Popular))
    }

    async fn get_latest(&self, _page: u32) -> Result<Vec<RemoteTitle>> {
        Err(OmniError::unsupported(self.id(), SourceOperation::Latest))
    }
}
