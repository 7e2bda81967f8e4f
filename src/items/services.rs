use std::str::FromStr;
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::dto::InventorySnapshot;
use super::repo::ItemRepo;
use super::repo_types::{Item, ItemPatch, NewItemDoc};
use super::selection::Selection;
use crate::error::AppError;
use crate::images::{upload_image, ImageUpload};
use crate::storage::StorageClient;

/// What the manager does with its item list after a successful write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPolicy {
    /// Re-fetch the whole list from the store after every write.
    #[default]
    Reload,
    /// Leave the list untouched; the caller refreshes when it sees fit.
    Deferred,
}

impl FromStr for RefreshPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reload" => Ok(Self::Reload),
            "deferred" => Ok(Self::Deferred),
            other => Err(AppError::validation(format!(
                "unknown refresh policy {:?}, expected reload or deferred",
                other
            ))),
        }
    }
}

pub struct NewItem {
    pub name: String,
    pub quantity: i64,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDelete {
    pub id: Uuid,
    pub error: String,
}

/// Outcome of a bulk delete. Each delete succeeds or fails on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkDeleteReport {
    pub deleted: Vec<Uuid>,
    pub failed: Vec<FailedDelete>,
}

#[derive(Debug, Default)]
struct View {
    pantry_id: Option<Uuid>,
    items: Vec<Item>,
    selection: Selection,
    filter: String,
}

/// Items whose name contains `term`, ignoring case.
pub fn filter_items<'a>(items: &'a [Item], term: &str) -> Vec<&'a Item> {
    let needle = term.to_lowercase();
    items
        .iter()
        .filter(|i| i.name.to_lowercase().contains(&needle))
        .collect()
}

/// Local view of one pantry's items, kept in step with the record store.
///
/// Operations take `&self` and may overlap freely. The view lock is never held
/// across a store call, so the list reflects whichever load finished last.
pub struct InventoryManager {
    repo: ItemRepo,
    storage: Arc<dyn StorageClient>,
    refresh: RefreshPolicy,
    view: RwLock<View>,
}

impl InventoryManager {
    pub fn new(
        repo: ItemRepo,
        storage: Arc<dyn StorageClient>,
        refresh: RefreshPolicy,
    ) -> Self {
        Self {
            repo,
            storage,
            refresh,
            view: RwLock::new(View::default()),
        }
    }

    /// Fetches every item of `pantry_id` and replaces the local list.
    ///
    /// On failure the previous list is kept. Selected IDs that are no longer
    /// present are dropped.
    #[instrument(skip(self))]
    pub async fn load(&self, pantry_id: Uuid) -> Result<Vec<Item>, AppError> {
        let items = self.repo.list_by_pantry(pantry_id).await.map_err(|e| {
            error!(error = %e, %pantry_id, "load items failed");
            AppError::store(e)
        })?;

        let mut view = self.view.write();
        view.pantry_id = Some(pantry_id);
        view.selection.retain_present(&items);
        view.items = items.clone();
        debug!(count = items.len(), "items loaded");
        Ok(items)
    }

    /// Reloads the current pantry.
    pub async fn refresh(&self) -> Result<Vec<Item>, AppError> {
        let pantry_id = self.current_pantry()?;
        self.load(pantry_id).await
    }

    async fn after_write(&self) -> Result<(), AppError> {
        match self.refresh {
            RefreshPolicy::Reload => self.refresh().await.map(|_| ()),
            RefreshPolicy::Deferred => Ok(()),
        }
    }

    /// Checks against the store that `item_id` belongs to the loaded pantry.
    async fn ensure_in_pantry(&self, item_id: Uuid) -> Result<Uuid, AppError> {
        let pantry_id = self.current_pantry()?;
        let item = self.repo.get(item_id).await.map_err(|e| {
            error!(error = %e, %item_id, "item lookup failed");
            AppError::store(e)
        })?;
        match item {
            Some(item) if item.pantry_id == pantry_id => Ok(pantry_id),
            _ => {
                warn!(%item_id, %pantry_id, "item is not in the loaded pantry");
                Err(AppError::validation(format!(
                    "item {} is not in this pantry",
                    item_id
                )))
            }
        }
    }

    fn current_pantry(&self) -> Result<Uuid, AppError> {
        self.view
            .read()
            .pantry_id
            .ok_or_else(|| AppError::validation("no pantry loaded"))
    }

    #[instrument(skip(self, new), fields(name = %new.name, quantity = new.quantity))]
    pub async fn create(&self, new: NewItem) -> Result<Uuid, AppError> {
        let name = new.name.trim();
        if name.is_empty() {
            warn!("rejecting item without a name");
            return Err(AppError::validation("item name must not be empty"));
        }
        if new.quantity <= 0 {
            warn!("rejecting item with non-positive quantity");
            return Err(AppError::validation("quantity must be greater than zero"));
        }
        let quantity = u32::try_from(new.quantity)
            .map_err(|_| AppError::validation("quantity is too large"))?;
        let pantry_id = self.current_pantry()?;

        // An uploaded image stays in the blob store even if the write below fails.
        let image_url = match new.image {
            Some(image) => Some(upload_image(self.storage.as_ref(), pantry_id, image).await?),
            None => None,
        };

        let id = self
            .repo
            .create(&NewItemDoc {
                pantry_id,
                name,
                quantity,
                image_url: image_url.as_deref(),
            })
            .await
            .map_err(|e| {
                error!(error = %e, %pantry_id, "create item failed");
                AppError::store(e)
            })?;

        info!(item_id = %id, %pantry_id, "item created");
        self.after_write().await?;
        Ok(id)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, item_id: Uuid, patch: ItemPatch) -> Result<(), AppError> {
        if item_id.is_nil() {
            return Err(AppError::validation("item id is required"));
        }
        if patch.is_empty() {
            return Err(AppError::validation("nothing to update"));
        }
        if matches!(patch.name.as_deref(), Some(n) if n.trim().is_empty()) {
            return Err(AppError::validation("item name must not be empty"));
        }
        self.ensure_in_pantry(item_id).await?;
        self.write_patch(item_id, patch).await
    }

    async fn write_patch(&self, item_id: Uuid, patch: ItemPatch) -> Result<(), AppError> {
        self.repo.update(item_id, &patch).await.map_err(|e| {
            error!(error = %e, %item_id, "update item failed");
            AppError::store(e)
        })?;

        info!(%item_id, "item updated");
        self.after_write().await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, item_id: Uuid) -> Result<(), AppError> {
        if item_id.is_nil() {
            return Err(AppError::validation("item id is required"));
        }
        self.ensure_in_pantry(item_id).await?;

        self.repo.delete(item_id).await.map_err(|e| {
            error!(error = %e, %item_id, "delete item failed");
            AppError::store(e)
        })?;
        self.view.write().selection.remove(item_id);

        info!(%item_id, "item deleted");
        self.after_write().await
    }

    /// Deletes every selected item concurrently and clears the selection.
    ///
    /// A failed delete does not stop the others; failures are listed in the report.
    #[instrument(skip(self))]
    pub async fn delete_selected(&self) -> Result<BulkDeleteReport, AppError> {
        let ids = {
            let view = self.view.read();
            if view.selection.is_empty() {
                return Err(AppError::validation("no items selected"));
            }
            view.selection.ids().to_vec()
        };

        let outcomes = join_all(
            ids.iter()
                .map(|&id| async move { (id, self.repo.delete(id).await) }),
        )
        .await;

        let mut report = BulkDeleteReport::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => report.deleted.push(id),
                Err(e) => {
                    warn!(error = %e, item_id = %id, "delete of selected item failed");
                    report.failed.push(FailedDelete {
                        id,
                        error: format!("{:#}", e),
                    });
                }
            }
        }
        self.view.write().selection.clear();

        info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "selected items deleted"
        );
        self.after_write().await?;
        Ok(report)
    }

    /// Adds `delta` to the loaded quantity, clamping at zero. Returns the new quantity.
    #[instrument(skip(self))]
    pub async fn set_quantity(&self, item_id: Uuid, delta: i64) -> Result<u32, AppError> {
        let current = self
            .view
            .read()
            .items
            .iter()
            .find(|i| i.id == item_id)
            .map(|i| i.quantity)
            .ok_or_else(|| AppError::validation(format!("item {} is not loaded", item_id)))?;

        let next = i64::from(current).saturating_add(delta).max(0);
        let next = u32::try_from(next).unwrap_or(u32::MAX);
        self.update(item_id, ItemPatch::quantity(next)).await?;
        Ok(next)
    }

    /// Renames an item. An empty name leaves it untouched.
    pub async fn rename(&self, item_id: Uuid, new_name: &str) -> Result<(), AppError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            debug!(%item_id, "ignoring rename to empty name");
            return Ok(());
        }
        self.update(item_id, ItemPatch::name(new_name)).await
    }

    /// Uploads a new image and points the item at it.
    #[instrument(skip(self, image))]
    pub async fn update_image(&self, item_id: Uuid, image: ImageUpload) -> Result<(), AppError> {
        if item_id.is_nil() {
            return Err(AppError::validation("item id is required"));
        }
        let pantry_id = self.ensure_in_pantry(item_id).await?;
        let url = upload_image(self.storage.as_ref(), pantry_id, image).await?;
        self.write_patch(item_id, ItemPatch::image_url(url)).await
    }

    /// Flips selection of a loaded item; returns whether it is now selected.
    pub fn toggle_select(&self, item_id: Uuid) -> Result<bool, AppError> {
        let mut view = self.view.write();
        if !view.items.iter().any(|i| i.id == item_id) {
            return Err(AppError::validation(format!(
                "item {} is not loaded",
                item_id
            )));
        }
        Ok(view.selection.toggle(item_id))
    }

    /// Selects every loaded item, or clears the selection if that is already the case.
    /// Returns whether everything is now selected.
    pub fn select_all(&self) -> bool {
        let mut view = self.view.write();
        let View {
            items, selection, ..
        } = &mut *view;
        selection.toggle_all(items)
    }

    pub fn set_filter(&self, term: impl Into<String>) {
        self.view.write().filter = term.into();
    }

    pub fn filter(&self) -> String {
        self.view.read().filter.clone()
    }

    /// Loaded items matching the current filter.
    pub fn visible_items(&self) -> Vec<Item> {
        let view = self.view.read();
        filter_items(&view.items, &view.filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn items(&self) -> Vec<Item> {
        self.view.read().items.clone()
    }

    pub fn selection(&self) -> Vec<Uuid> {
        self.view.read().selection.ids().to_vec()
    }

    pub fn snapshot(&self) -> InventorySnapshot {
        let view = self.view.read();
        InventorySnapshot {
            pantry_id: view.pantry_id,
            items: filter_items(&view.items, &view.filter)
                .into_iter()
                .cloned()
                .collect(),
            total: view.items.len(),
            selected: view.selection.ids().to_vec(),
            all_selected: !view.items.is_empty() && view.selection.covers(&view.items),
            filter: view.filter.clone(),
        }
    }
}
