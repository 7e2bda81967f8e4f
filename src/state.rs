use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::{MemoryRecordStore, PgRecordStore, RecordStore};
use crate::error::AppError;
use crate::items::{InventoryManager, ItemRepo};
use crate::pantries::{PantryGallery, PantryRepo};
use crate::recipes::{OpenRouterClient, RecipePipeline, TextGenerator};
use crate::storage::{MemoryStorage, Storage, StorageClient};

/// Per-pantry working state: the loaded items, the selection and the last recipe.
pub struct PantrySession {
    pub inventory: InventoryManager,
    pub recipes: RecipePipeline,
}

struct OpenSession {
    session: Arc<PantrySession>,
    last_used: Instant,
    tick: u64,
}

#[derive(Default)]
struct SessionMap {
    open: HashMap<Uuid, OpenSession>,
    tick: u64,
}

/// Open pantry sessions. Idle ones expire, and past `capacity` the least
/// recently used one is dropped.
pub struct Sessions {
    inner: Mutex<SessionMap>,
    idle: Duration,
    capacity: usize,
}

impl Sessions {
    pub fn new(idle: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(SessionMap::default()),
            idle,
            capacity: capacity.max(1),
        }
    }

    fn touch(&self, pantry_id: Uuid) -> Option<Arc<PantrySession>> {
        let now = Instant::now();
        let mut map = self.inner.lock();
        self.expire(&mut map, now);
        map.tick += 1;
        let tick = map.tick;
        let entry = map.open.get_mut(&pantry_id)?;
        entry.last_used = now;
        entry.tick = tick;
        Some(entry.session.clone())
    }

    /// Registers `session` unless another one for the pantry got there first.
    fn insert(&self, pantry_id: Uuid, session: Arc<PantrySession>) -> Arc<PantrySession> {
        let now = Instant::now();
        let mut map = self.inner.lock();
        self.expire(&mut map, now);
        map.tick += 1;
        let tick = map.tick;

        if let Some(entry) = map.open.get_mut(&pantry_id) {
            entry.last_used = now;
            entry.tick = tick;
            return entry.session.clone();
        }

        while map.open.len() >= self.capacity {
            let oldest = map
                .open
                .iter()
                .min_by_key(|(_, s)| s.tick)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    map.open.remove(&id);
                    debug!(pantry_id = %id, "evicted least recently used session");
                }
                None => break,
            }
        }

        map.open.insert(
            pantry_id,
            OpenSession {
                session: session.clone(),
                last_used: now,
                tick,
            },
        );
        session
    }

    fn remove(&self, pantry_id: Uuid) -> bool {
        self.inner.lock().open.remove(&pantry_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expire(&self, map: &mut SessionMap, now: Instant) {
        let before = map.open.len();
        map.open
            .retain(|_, s| now.saturating_duration_since(s.last_used) < self.idle);
        let expired = before - map.open.len();
        if expired > 0 {
            debug!(expired, "idle sessions dropped");
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn RecordStore>,
    pub storage: Arc<dyn StorageClient>,
    pub generator: Arc<dyn TextGenerator>,
    sessions: Arc<Sessions>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn RecordStore> = match &config.database_url {
            Some(url) => {
                let store = PgRecordStore::connect(url).await?;
                // Run migrations if present
                if let Err(e) = sqlx::migrate!("./migrations").run(store.pool()).await {
                    warn!(error = %e, "migrations folder not found or migration failed; continuing");
                }
                Arc::new(store)
            }
            None => {
                warn!("DATABASE_URL not set; records are kept in memory only");
                Arc::new(MemoryRecordStore::new())
            }
        };

        let storage: Arc<dyn StorageClient> = match &config.blob {
            Some(blob) => Arc::new(Storage::new(blob).await?),
            None => {
                warn!("MINIO_ENDPOINT not set; images are kept in memory only");
                Arc::new(MemoryStorage::new())
            }
        };

        if config.recipes.api_key.is_empty() {
            warn!("OPENROUTER_API_KEY not set; recipe requests will be rejected upstream");
        }
        let generator = Arc::new(OpenRouterClient::with_base_url(
            config.recipes.api_key.clone(),
            config.recipes.base_url.clone(),
        )) as Arc<dyn TextGenerator>;

        Ok(Self::from_parts(config, store, storage, generator))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn RecordStore>,
        storage: Arc<dyn StorageClient>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let sessions = Sessions::new(
            Duration::from_secs(config.session_idle_secs),
            config.max_sessions,
        );
        Self {
            config,
            store,
            storage,
            generator,
            sessions: Arc::new(sessions),
        }
    }

    pub fn pantries(&self) -> PantryGallery {
        PantryGallery::new(PantryRepo::new(self.store.clone()))
    }

    /// The open session of `pantry_id`, loading its items on first use.
    ///
    /// Only existing pantries get a session. A failed first load leaves no
    /// session behind.
    pub async fn session(&self, pantry_id: Uuid) -> Result<Arc<PantrySession>, AppError> {
        if let Some(session) = self.sessions.touch(pantry_id) {
            return Ok(session);
        }

        let pantry = PantryRepo::new(self.store.clone())
            .get(pantry_id)
            .await
            .map_err(AppError::store)?;
        if pantry.is_none() {
            warn!(%pantry_id, "session requested for unknown pantry");
            return Err(AppError::UnknownPantry(pantry_id));
        }

        let session = Arc::new(self.new_session());
        session.inventory.load(pantry_id).await?;

        // Another request may have opened the same pantry meanwhile; keep the first.
        let session = self.sessions.insert(pantry_id, session);
        info!(%pantry_id, open = self.sessions.len(), "pantry session ready");
        Ok(session)
    }

    pub fn close_session(&self, pantry_id: Uuid) {
        if self.sessions.remove(pantry_id) {
            info!(%pantry_id, "pantry session closed");
        }
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn new_session(&self) -> PantrySession {
        let repo = ItemRepo::new(self.store.clone());
        PantrySession {
            inventory: InventoryManager::new(
                repo.clone(),
                self.storage.clone(),
                self.config.refresh,
            ),
            recipes: RecipePipeline::new(
                repo,
                self.generator.clone(),
                self.config.recipes.model.clone(),
            ),
        }
    }
}
