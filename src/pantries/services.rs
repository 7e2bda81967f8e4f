use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::repo::PantryRepo;
use super::repo_types::{NewPantryDoc, Pantry};
use crate::error::AppError;

/// One owner's pantry list. There is no authentication: the owner key is
/// whatever the caller says it is.
#[derive(Clone)]
pub struct PantryGallery {
    repo: PantryRepo,
}

impl PantryGallery {
    pub fn new(repo: PantryRepo) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, owner_key: &str) -> Result<Vec<Pantry>, AppError> {
        let owner_key = require_owner(owner_key)?;
        self.repo.list_by_owner(owner_key).await.map_err(|e| {
            error!(error = %e, "list pantries failed");
            AppError::store(e)
        })
    }

    /// Creates a pantry and returns the owner's refreshed list with its id.
    #[instrument(skip(self, description))]
    pub async fn create(
        &self,
        owner_key: &str,
        name: &str,
        description: &str,
    ) -> Result<(Uuid, Vec<Pantry>), AppError> {
        let owner_key = require_owner(owner_key)?;
        let name = name.trim();
        if name.is_empty() {
            warn!("pantry name is empty");
            return Err(AppError::validation("pantry name must not be empty"));
        }

        let doc = NewPantryDoc {
            name,
            description: description.trim(),
            owner_key,
            created_at: OffsetDateTime::now_utc(),
        };
        let id = self.repo.create(&doc).await.map_err(|e| {
            error!(error = %e, "create pantry failed");
            AppError::store(e)
        })?;
        info!(%id, "pantry created");

        Ok((id, self.list(owner_key).await?))
    }

    /// Removes a pantry owned by `owner_key`. Its items stay in the store.
    #[instrument(skip(self))]
    pub async fn delete(&self, owner_key: &str, id: Uuid) -> Result<Vec<Pantry>, AppError> {
        let owner_key = require_owner(owner_key)?;
        let pantry = self.repo.get(id).await.map_err(AppError::store)?;
        match pantry {
            Some(p) if p.owner_key == owner_key => {}
            _ => {
                warn!(%id, "pantry not found for owner");
                return Err(AppError::validation(format!("no pantry {} for this owner", id)));
            }
        }

        self.repo.delete(id).await.map_err(|e| {
            error!(error = %e, %id, "delete pantry failed");
            AppError::store(e)
        })?;
        info!(%id, "pantry deleted");

        self.list(owner_key).await
    }
}

fn require_owner(owner_key: &str) -> Result<&str, AppError> {
    let owner_key = owner_key.trim();
    if owner_key.is_empty() {
        return Err(AppError::validation("owner key must not be empty"));
    }
    Ok(owner_key)
}
