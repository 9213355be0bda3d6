//! List update engine.
//!
//! Every mutation is a read-decode-mutate-encode-write cycle against one key
//! (two for `edit`), performed while holding a single process-wide lock.
//! Reads do not take the lock.
//!
//! The lock only serializes writers inside this process. Several processes
//! sharing one store can still interleave between read and write; the last
//! writer wins. An `edit` writes two keys in sequence, so a crash between the
//! writes can lose or duplicate the item.

pub mod codec;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::keys::{list_key, Owner};
use crate::db::KvStore;
use crate::errors::AppError;
use crate::models::ListItem;

/// Serializes all list mutations across owners and categories.
pub struct ListEngine {
    store: Arc<KvStore>,
    write_lock: Mutex<()>,
}

impl ListEngine {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Current items of one category, in stored order.
    pub async fn list(&self, owner: &Owner, category: &str) -> Result<Vec<ListItem>, AppError> {
        require_category(category)?;
        self.load(&list_key(owner, category)).await
    }

    /// Append an item to its category, normalizing its priority.
    pub async fn add(&self, owner: &Owner, mut item: ListItem) -> Result<ListItem, AppError> {
        require_category(&item.category)?;
        item.normalize_priority();

        let key = list_key(owner, &item.category);
        let _guard = self.write_lock.lock().await;

        let mut items = self.load(&key).await?;
        items.push(item.clone());
        self.save(&key, &items).await?;

        log_activity("Added", owner, &item.category, &item.name);
        Ok(item)
    }

    /// Drop every item called `name` from a category. Returns how many were removed.
    pub async fn remove(&self, owner: &Owner, category: &str, name: &str) -> Result<usize, AppError> {
        require_category(category)?;

        let key = list_key(owner, category);
        let _guard = self.write_lock.lock().await;

        let mut items = self.load(&key).await?;
        let before = items.len();
        items.retain(|item| item.name != name);
        self.save(&key, &items).await?;

        log_activity("Deleted", owner, category, name);
        Ok(before - items.len())
    }

    /// Set the bought flag of the first item called `name`.
    ///
    /// Returns `false` when no item matched; the list is left as it was.
    pub async fn set_bought(
        &self,
        owner: &Owner,
        category: &str,
        name: &str,
        bought: bool,
    ) -> Result<bool, AppError> {
        require_category(category)?;

        let key = list_key(owner, category);
        let _guard = self.write_lock.lock().await;

        let mut items = self.load(&key).await?;
        let Some(item) = items.iter_mut().find(|item| item.name == name) else {
            return Ok(false);
        };
        item.bought = bought;
        self.save(&key, &items).await?;

        log_activity("Bought", owner, category, name);
        Ok(true)
    }

    /// Remove `old_name` from `old_category`, then append `item` to its own category.
    ///
    /// Both keys are rewritten under one lock acquisition.
    pub async fn edit(
        &self,
        owner: &Owner,
        old_name: &str,
        old_category: &str,
        mut item: ListItem,
    ) -> Result<ListItem, AppError> {
        if old_category.trim().is_empty() {
            return Err(AppError::Validation("Old category is required".to_string()));
        }
        require_category(&item.category)?;
        item.normalize_priority();

        let old_key = list_key(owner, old_category);
        let new_key = list_key(owner, &item.category);
        let _guard = self.write_lock.lock().await;

        let mut old_items = self.load(&old_key).await?;
        old_items.retain(|existing| existing.name != old_name);
        self.save(&old_key, &old_items).await?;

        let mut new_items = self.load(&new_key).await?;
        new_items.push(item.clone());
        self.save(&new_key, &new_items).await?;

        log_activity("Edited", owner, &item.category, &item.name);
        Ok(item)
    }

    /// Replace a whole category with `items`, verbatim.
    ///
    /// The category is taken from the first item.
    pub async fn reorder(&self, owner: &Owner, items: Vec<ListItem>) -> Result<(), AppError> {
        let Some(first) = items.first() else {
            return Err(AppError::Validation("No items provided".to_string()));
        };
        require_category(&first.category)?;

        let category = first.category.clone();
        let key = list_key(owner, &category);
        let _guard = self.write_lock.lock().await;

        self.save(&key, &items).await?;

        tracing::info!(action = "Reordered", %owner, category = %category, count = items.len(), "list activity");
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Vec<ListItem>, AppError> {
        let raw = self.store.get(key).await?;
        Ok(codec::decode(key, raw.as_deref()))
    }

    async fn save(&self, key: &str, items: &[ListItem]) -> Result<(), AppError> {
        let encoded = codec::encode(items)?;
        self.store.set(key, &encoded).await
    }
}

fn require_category(category: &str) -> Result<(), AppError> {
    if category.trim().is_empty() {
        return Err(AppError::Validation("Category is required".to_string()));
    }
    Ok(())
}

fn log_activity(action: &str, owner: &Owner, category: &str, item: &str) {
    tracing::info!(action, %owner, category, item, "list activity");
}
