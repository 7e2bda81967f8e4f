use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use uuid::Uuid;

/// Schemaless document body.
pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub fields: Fields,
}

impl Document {
    /// Flattens the document into one JSON object with its `id` alongside the fields.
    pub fn into_value(self) -> Value {
        let mut fields = self.fields;
        fields.insert("id".into(), Value::String(self.id.to_string()));
        Value::Object(fields)
    }
}

/// Serializes a typed record into document fields.
pub fn to_fields<T: Serialize>(value: &T) -> anyhow::Result<Fields> {
    match serde_json::to_value(value).context("serialize document")? {
        Value::Object(fields) => Ok(fields),
        other => anyhow::bail!("expected a JSON object, got {}", other),
    }
}

/// Decodes a stored document, `id` included, into a typed record.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> anyhow::Result<T> {
    let id = doc.id;
    serde_json::from_value(doc.into_value()).with_context(|| format!("decode document {}", id))
}

/// Remote document collections keyed by store-assigned IDs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every document of `collection` whose `field` equals `value`.
    async fn query(&self, collection: &str, field: &str, value: &Value)
        -> anyhow::Result<Vec<Document>>;

    async fn get(&self, collection: &str, id: Uuid) -> anyhow::Result<Option<Document>>;

    /// Creates a document when `id` is `None`, otherwise merges `fields` into the
    /// existing one. Merging into a missing document is an error.
    async fn put(&self, collection: &str, id: Option<Uuid>, fields: Fields)
        -> anyhow::Result<Uuid>;

    async fn delete(&self, collection: &str, id: Uuid) -> anyhow::Result<()>;
}

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    data: Json<Fields>,
}

impl From<DocumentRow> for Document {
    fn from(r: DocumentRow) -> Self {
        Self {
            id: r.id,
            fields: r.data.0,
        }
    }
}

/// Documents stored as JSONB rows of a single `documents` table.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> anyhow::Result<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, data
            FROM documents
            WHERE collection = $1 AND data -> $2 = $3
            ORDER BY created_at ASC
            "#,
        )
        .bind(collection)
        .bind(field)
        .bind(Json(value))
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("query {} where {} = {}", collection, field, value))?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn get(&self, collection: &str, id: Uuid) -> anyhow::Result<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, data
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("get {}/{}", collection, id))?;
        Ok(row.map(Document::from))
    }

    async fn put(
        &self,
        collection: &str,
        id: Option<Uuid>,
        fields: Fields,
    ) -> anyhow::Result<Uuid> {
        match id {
            None => {
                let id = Uuid::new_v4();
                sqlx::query(
                    r#"
                    INSERT INTO documents (id, collection, data)
                    VALUES ($1, $2, $3)
                    "#,
                )
                .bind(id)
                .bind(collection)
                .bind(Json(&fields))
                .execute(&self.pool)
                .await
                .with_context(|| format!("insert into {}", collection))?;
                Ok(id)
            }
            Some(id) => {
                let updated = sqlx::query_scalar::<_, Uuid>(
                    r#"
                    UPDATE documents
                    SET data = data || $3
                    WHERE collection = $1 AND id = $2
                    RETURNING id
                    "#,
                )
                .bind(collection)
                .bind(id)
                .bind(Json(&fields))
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("merge into {}/{}", collection, id))?;
                updated.ok_or_else(|| anyhow::anyhow!("no document {}/{}", collection, id))
            }
        }
    }

    async fn delete(&self, collection: &str, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("delete {}/{}", collection, id))?;
        Ok(())
    }
}

/// In-process record store. Keeps insertion order within each collection.
#[derive(Default)]
pub struct MemoryRecordStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> anyhow::Result<Vec<Document>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.fields.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: Uuid) -> anyhow::Result<Option<Document>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn put(
        &self,
        collection: &str,
        id: Option<Uuid>,
        fields: Fields,
    ) -> anyhow::Result<Uuid> {
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        match id {
            None => {
                let id = Uuid::new_v4();
                docs.push(Document { id, fields });
                Ok(id)
            }
            Some(id) => {
                let doc = docs
                    .iter_mut()
                    .find(|d| d.id == id)
                    .ok_or_else(|| anyhow::anyhow!("no document {}/{}", collection, id))?;
                doc.fields.extend(fields);
                Ok(id)
            }
        }
    }

    async fn delete(&self, collection: &str, id: Uuid) -> anyhow::Result<()> {
        if let Some(docs) = self.collections.write().get_mut(collection) {
            docs.retain(|d| d.id != id);
        }
        Ok(())
    }
}
