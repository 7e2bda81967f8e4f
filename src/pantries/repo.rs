use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use super::repo_types::{NewPantryDoc, Pantry};
use crate::db::{from_document, to_fields, RecordStore};

pub const PANTRIES: &str = "pantries";

#[derive(Clone)]
pub struct PantryRepo {
    store: Arc<dyn RecordStore>,
}

impl PantryRepo {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Pantries of one owner, oldest first.
    pub async fn list_by_owner(&self, owner_key: &str) -> anyhow::Result<Vec<Pantry>> {
        let docs = self
            .store
            .query(PANTRIES, "ownerKey", &Value::String(owner_key.to_string()))
            .await?;

        let mut pantries = Vec::with_capacity(docs.len());
        for doc in docs {
            match from_document::<Pantry>(doc) {
                Ok(p) => pantries.push(p),
                Err(e) => warn!(error = %e, owner_key, "skipping malformed pantry"),
            }
        }
        pantries.sort_by_key(|p| p.created_at);
        Ok(pantries)
    }

    pub async fn get(&self, id: Uuid) -> anyhow::Result<Option<Pantry>> {
        match self.store.get(PANTRIES, id).await? {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn create(&self, pantry: &NewPantryDoc<'_>) -> anyhow::Result<Uuid> {
        let fields = to_fields(pantry)?;
        self.store
            .put(PANTRIES, None, fields)
            .await
            .context("create pantry")
    }

    pub async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        self.store
            .delete(PANTRIES, id)
            .await
            .with_context(|| format!("delete pantry {}", id))
    }
}
