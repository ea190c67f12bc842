use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::SourceInfo;

/// Persisted metadata for a registered catalog source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub name: String,
    pub lang: String,
    pub version: String,
    pub icon: Option<String>,
    pub supports_search: bool,
    pub supports_popular: bool,
    pub supports_latest: bool,
    pub enabled: bool,
    pub installed_at: DateTime<Utc>,
}

impl SourceRecord {
    pub fn from_info(info: &SourceInfo) -> Self {
        Self {
            id: info.id.clone(),
            name: info.name.clone(),
            lang: info.lang.clone(),
            version: info.version.clone(),
            icon: info.icon.clone(),
            supports_search: info.capabilities.search,
            supports_popular: info.capabilities.popular,
            supports_latest: info.capabilities.latest,
            enabled: true,
            installed_at: Utc::now(),
        }
    }
}
