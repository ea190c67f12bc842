use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_CATEGORY_ID: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryFlags {
    pub download_new_chapters: bool,
    pub include_in_update: bool,
    pub include_in_global_update: bool,
}

impl Default for CategoryFlags {
    fn default() -> Self {
        Self {
            download_new_chapters: false,
            include_in_update: true,
            include_in_global_update: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Display position. Need not be contiguous.
    pub order: i64,
    pub flags: CategoryFlags,
}

impl Category {
    pub fn new(id: &str, name: &str, order: i64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            order,
            flags: CategoryFlags::default(),
        }
    }

    /// Generate an id for a user-created category.
    pub fn generate_id(name: &str, created_at: DateTime<Utc>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        hasher.update(
            created_at
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_be_bytes(),
        );
        let digest = hex::encode(hasher.finalize());
        format!("category-{}", &digest[..12])
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub flags: Option<CategoryFlags>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_id_deterministic() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            Category::generate_id("Reading", at),
            Category::generate_id("Reading", at)
        );
    }

    #[test]
    fn test_generate_id_differs_by_name_and_time() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();
        let id = Category::generate_id("Reading", at);
        assert_ne!(id, Category::generate_id("Dropped", at));
        assert_ne!(id, Category::generate_id("Reading", later));
        assert!(id.starts_with("category-"));
        assert_eq!(id.len(), "category-".len() + 12);
    }
}
