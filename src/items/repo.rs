use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use super::repo_types::{Item, ItemPatch, NewItemDoc};
use crate::db::{from_document, to_fields, RecordStore};

pub const ITEMS: &str = "pantryItems";

/// Typed access to the item collection.
#[derive(Clone)]
pub struct ItemRepo {
    store: Arc<dyn RecordStore>,
}

impl ItemRepo {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// All items of a pantry. Documents that do not decode as items are skipped.
    pub async fn list_by_pantry(&self, pantry_id: Uuid) -> anyhow::Result<Vec<Item>> {
        let docs = self
            .store
            .query(ITEMS, "pantryId", &Value::String(pantry_id.to_string()))
            .await?;

        let mut items = Vec::with_capacity(docs.len());
        for doc in docs {
            match from_document::<Item>(doc) {
                Ok(item) => items.push(item),
                Err(e) => warn!(error = %e, %pantry_id, "skipping malformed item"),
            }
        }
        Ok(items)
    }

    pub async fn get(&self, id: Uuid) -> anyhow::Result<Option<Item>> {
        match self.store.get(ITEMS, id).await? {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn create(&self, item: &NewItemDoc<'_>) -> anyhow::Result<Uuid> {
        let fields = to_fields(item)?;
        self.store
            .put(ITEMS, None, fields)
            .await
            .context("create item")
    }

    pub async fn update(&self, id: Uuid, patch: &ItemPatch) -> anyhow::Result<()> {
        let fields = to_fields(patch)?;
        self.store
            .put(ITEMS, Some(id), fields)
            .await
            .with_context(|| format!("update item {}", id))?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        self.store
            .delete(ITEMS, id)
            .await
            .with_context(|| format!("delete item {}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRecordStore;
    use serde_json::json;

    #[tokio::test]
    async fn list_skips_documents_that_are_not_items() {
        let store = Arc::new(MemoryRecordStore::new());
        let repo = ItemRepo::new(store.clone());
        let pantry_id = Uuid::new_v4();

        repo.create(&NewItemDoc {
            pantry_id,
            name: "Oats",
            quantity: 1,
            image_url: None,
        })
        .await
        .unwrap();
        let junk = to_fields(&json!({"pantryId": pantry_id.to_string(), "name": "Bad"})).unwrap();
        store.put(ITEMS, None, junk).await.unwrap();

        let items = repo.list_by_pantry(pantry_id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Oats");
        assert_eq!(items[0].pantry_id, pantry_id);
    }

    #[tokio::test]
    async fn update_of_missing_item_fails() {
        let repo = ItemRepo::new(Arc::new(MemoryRecordStore::new()));
        assert!(repo
            .update(Uuid::new_v4(), &ItemPatch::quantity(1))
            .await
            .is_err());
    }
}
