use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreatePantryRequest, OwnerQuery};
use super::repo_types::Pantry;
use crate::error::AppError;
use crate::state::AppState;

pub fn pantry_routes() -> Router<AppState> {
    Router::new()
        .route("/pantries", get(list_pantries).post(create_pantry))
        .route("/pantries/:pantry_id", delete(delete_pantry))
}

#[instrument(skip(state))]
pub async fn list_pantries(
    State(state): State<AppState>,
    Query(q): Query<OwnerQuery>,
) -> Result<Json<Vec<Pantry>>, AppError> {
    Ok(Json(state.pantries().list(&q.owner).await?))
}

#[instrument(skip(state, body))]
pub async fn create_pantry(
    State(state): State<AppState>,
    Json(body): Json<CreatePantryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (_, pantries) = state
        .pantries()
        .create(&body.owner_key, &body.name, &body.description)
        .await?;
    Ok((StatusCode::CREATED, Json(pantries)))
}

#[instrument(skip(state))]
pub async fn delete_pantry(
    State(state): State<AppState>,
    Path(pantry_id): Path<Uuid>,
    Query(q): Query<OwnerQuery>,
) -> Result<Json<Vec<Pantry>>, AppError> {
    let pantries = state.pantries().delete(&q.owner, pantry_id).await?;
    state.close_session(pantry_id);
    Ok(Json(pantries))
}
