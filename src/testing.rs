//! Fakes for the external collaborators, shared by unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::{Document, Fields, MemoryRecordStore, RecordStore};
use crate::error::AppError;
use crate::recipes::TextGenerator;
use crate::state::AppState;
use crate::storage::{MemoryStorage, StorageClient};

/// Memory-backed record store with switchable failures.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryRecordStore,
    fail_deletes: Mutex<HashSet<Uuid>>,
    fail_gets: Mutex<HashSet<Uuid>>,
    fail_queries: AtomicBool,
    fail_puts: AtomicBool,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_delete_of(&self, id: Uuid) {
        self.fail_deletes.lock().insert(id);
    }

    pub fn fail_get_of(&self, id: Uuid) {
        self.fail_gets.lock().insert(id);
    }

    pub fn fail_queries(&self, on: bool) {
        self.fail_queries.store(on, Ordering::SeqCst);
    }

    pub fn fail_puts(&self, on: bool) {
        self.fail_puts.store(on, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> anyhow::Result<Vec<Document>> {
        anyhow::ensure!(!self.fail_queries.load(Ordering::SeqCst), "store unavailable");
        self.inner.query(collection, field, value).await
    }

    async fn get(&self, collection: &str, id: Uuid) -> anyhow::Result<Option<Document>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        anyhow::ensure!(!self.fail_gets.lock().contains(&id), "get {} timed out", id);
        self.inner.get(collection, id).await
    }

    async fn put(
        &self,
        collection: &str,
        id: Option<Uuid>,
        fields: Fields,
    ) -> anyhow::Result<Uuid> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        anyhow::ensure!(!self.fail_puts.load(Ordering::SeqCst), "write rejected");
        self.inner.put(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: Uuid) -> anyhow::Result<()> {
        anyhow::ensure!(!self.fail_deletes.lock().contains(&id), "delete {} denied", id);
        self.inner.delete(collection, id).await
    }
}

/// Generator that replays one canned reply and records what it was asked.
pub struct CannedGenerator {
    reply: Result<String, AppError>,
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<Option<String>>,
    pub last_model: Mutex<Option<String>>,
}

impl CannedGenerator {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
            last_model: Mutex::new(None),
        })
    }

    pub fn failing(err: AppError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(err),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
            last_model: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock() = Some(prompt.to_string());
        *self.last_model.lock() = Some(model.to_string());
        self.reply.clone()
    }
}

/// Blob store that refuses every write.
pub struct BrokenStorage;

#[async_trait]
impl StorageClient for BrokenStorage {
    async fn put_object(&self, key: &str, _body: Bytes, _ct: &str) -> anyhow::Result<()> {
        anyhow::bail!("bucket unreachable while writing {}", key)
    }

    fn object_url(&self, key: &str) -> String {
        format!("broken://{}", key)
    }
}

pub fn test_state(store: Arc<dyn RecordStore>, generator: Arc<dyn TextGenerator>) -> AppState {
    AppState::from_parts(
        Arc::new(AppConfig::local()),
        store,
        Arc::new(MemoryStorage::new()),
        generator,
    )
}
