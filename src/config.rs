use serde::Deserialize;

use crate::items::RefreshPolicy;
use crate::recipes::client::DEFAULT_BASE_URL as DEFAULT_OPENROUTER_BASE_URL;

const DEFAULT_RECIPE_MODEL: &str = "qwen/qwen-2-7b-instruct:free";
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;
const DEFAULT_MAX_SESSIONS: usize = 256;

#[derive(Debug, Clone, Deserialize)]
pub struct BlobConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Base of stored image URLs; the endpoint when unset.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs against the in-process record store.
    pub database_url: Option<String>,
    /// `None` runs against the in-process blob store.
    pub blob: Option<BlobConfig>,
    pub recipes: RecipeConfig,
    pub refresh: RefreshPolicy,
    /// Open pantry sessions unused for this long are dropped.
    pub session_idle_secs: u64,
    pub max_sessions: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let blob = match std::env::var("MINIO_ENDPOINT") {
            Ok(endpoint) if !endpoint.is_empty() => Some(BlobConfig {
                endpoint,
                bucket: std::env::var("MINIO_BUCKET")?,
                access_key: std::env::var("MINIO_ACCESS_KEY")?,
                secret_key: std::env::var("MINIO_SECRET_KEY")?,
                region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
                public_url: std::env::var("MINIO_PUBLIC_URL").ok().filter(|v| !v.is_empty()),
            }),
            _ => None,
        };

        let recipes = RecipeConfig {
            api_key: std::env::var("OPENROUTER_API_KEY").unwrap_or_default(),
            base_url: std::env::var("OPENROUTER_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENROUTER_BASE_URL.into()),
            model: std::env::var("RECIPE_MODEL").unwrap_or_else(|_| DEFAULT_RECIPE_MODEL.into()),
        };

        let refresh = match std::env::var("INVENTORY_REFRESH") {
            Ok(v) => v.parse()?,
            Err(_) => RefreshPolicy::default(),
        };

        Ok(Self {
            database_url,
            blob,
            recipes,
            refresh,
            session_idle_secs: std::env::var("SESSION_IDLE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SESSION_IDLE_SECS),
            max_sessions: std::env::var("MAX_SESSIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_SESSIONS),
        })
    }

    /// Configuration with every external collaborator running in-process.
    pub fn local() -> Self {
        Self {
            database_url: None,
            blob: None,
            recipes: RecipeConfig {
                api_key: String::new(),
                base_url: DEFAULT_OPENROUTER_BASE_URL.into(),
                model: DEFAULT_RECIPE_MODEL.into(),
            },
            refresh: RefreshPolicy::default(),
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}
