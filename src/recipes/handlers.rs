use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::SuggestionResponse;
use crate::error::AppError;
use crate::state::AppState;

pub fn recipe_routes() -> Router<AppState> {
    Router::new().route(
        "/pantries/:pantry_id/recipes",
        post(suggest_recipe).get(current_suggestion),
    )
}

/// Suggests a recipe from the pantry's current selection.
///
/// A failed suggestion is still a 200; the body carries the failure.
#[instrument(skip(state))]
pub async fn suggest_recipe(
    State(state): State<AppState>,
    Path(pantry_id): Path<Uuid>,
) -> Result<Json<SuggestionResponse>, AppError> {
    let session = state.session(pantry_id).await?;
    let selection = session.inventory.selection();
    let outcome = session.recipes.suggest(&selection).await?;
    Ok(Json(SuggestionResponse::from(&outcome)))
}

#[instrument(skip(state))]
pub async fn current_suggestion(
    State(state): State<AppState>,
    Path(pantry_id): Path<Uuid>,
) -> Result<Json<SuggestionResponse>, AppError> {
    let session = state.session(pantry_id).await?;
    Ok(Json(SuggestionResponse::from(&session.recipes.current())))
}
