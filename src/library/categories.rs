use chrono::Utc;
use tracing::debug;

use crate::app::{OmniError, Result};
use crate::domain::{Category, CategoryUpdate};
use crate::library::Library;
use crate::store::Store;

impl<S: Store> Library<S> {
    /// Categories in display order.
    pub fn categories(&self) -> Result<Vec<Category>> {
        self.store.get_categories()
    }

    /// Create a category at the end of the display order.
    pub fn create_category(&self, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OmniError::Other("category name must not be empty".into()));
        }

        let order = self
            .store
            .get_categories()?
            .iter()
            .map(|c| c.order)
            .max()
            .map_or(0, |max| max + 1);

        let category = Category::new(&Category::generate_id(name, Utc::now()), name, order);
        self.store.put_category(&category)?;
        debug!("Created category {} ({})", category.name, category.id);
        Ok(category)
    }

    pub fn update_category(&self, id: &str, update: CategoryUpdate) -> Result<Category> {
        let mut category = self
            .store
            .get_category(id)?
            .ok_or_else(|| OmniError::not_found("category", id))?;

        if let Some(name) = update.name {
            category.name = name;
        }
        if let Some(flags) = update.flags {
            category.flags = flags;
        }
        self.store.put_category(&category)?;
        Ok(category)
    }

    /// Delete a category and drop it from every title that had it.
    /// Returns the affected title ids.
    pub fn delete_category(&self, id: &str) -> Result<Vec<String>> {
        let affected = self
            .store
            .delete_category(id)?
            .ok_or_else(|| OmniError::not_found("category", id))?;
        debug!("Deleted category {} from {} titles", id, affected.len());
        Ok(affected)
    }

    /// Put `ids` first, in the given order. Categories not listed keep their
    /// relative order after them.
    pub fn reorder_categories(&self, ids: &[String]) -> Result<()> {
        let mut existing = self.store.get_categories()?;
        for id in ids {
            if !existing.iter().any(|c| &c.id == id) {
                return Err(OmniError::not_found("category", id.clone()));
            }
        }

        existing.sort_by_key(|c| {
            ids.iter()
                .position(|id| id == &c.id)
                .unwrap_or(ids.len())
        });
        for (position, category) in existing.iter_mut().enumerate() {
            category.order = position as i64;
        }
        self.store.put_categories(&existing)
    }
}
