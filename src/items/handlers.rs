use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::dto::{
    BulkDeleteResponse, CreatedItemResponse, FilterRequest, InventorySnapshot, QuantityRequest,
    RenameRequest, SelectionResponse,
};
use super::repo_types::ItemPatch;
use super::services::NewItem;
use crate::error::AppError;
use crate::images::ImageUpload;
use crate::state::AppState;

pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/pantries/:pantry_id/items",
            get(list_items).post(create_item),
        )
        .route(
            "/pantries/:pantry_id/items/:item_id",
            patch(update_item).delete(delete_item),
        )
        .route("/pantries/:pantry_id/items/:item_id/quantity", post(adjust_quantity))
        .route("/pantries/:pantry_id/items/:item_id/rename", post(rename_item))
        .route("/pantries/:pantry_id/items/:item_id/image", put(replace_image))
        .route("/pantries/:pantry_id/items/:item_id/select", post(toggle_select))
        .route("/pantries/:pantry_id/selection/all", post(select_all))
        .route("/pantries/:pantry_id/selection", delete(delete_selected))
        .route("/pantries/:pantry_id/filter", put(set_filter))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

/// GET re-fetches the list from the store before answering.
#[instrument(skip(state))]
pub async fn list_items(
    State(state): State<AppState>,
    Path(pantry_id): Path<Uuid>,
) -> Result<Json<InventorySnapshot>, AppError> {
    let session = state.session(pantry_id).await?;
    session.inventory.load(pantry_id).await?;
    Ok(Json(session.inventory.snapshot()))
}

/// POST multipart: `name`, `quantity`, optional `image` file.
#[instrument(skip(state, mp))]
pub async fn create_item(
    State(state): State<AppState>,
    Path(pantry_id): Path<Uuid>,
    mut mp: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut name = String::new();
    let mut quantity: Option<i64> = None;
    let mut image = None;

    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let field_name = field.name().map(|s| s.to_string());
        match field_name.as_deref() {
            Some("name") => name = field.text().await.map_err(bad_multipart)?,
            Some("quantity") => {
                let raw = field.text().await.map_err(bad_multipart)?;
                let parsed = raw.trim().parse::<i64>().map_err(|_| {
                    warn!(%raw, "quantity is not an integer");
                    AppError::validation("quantity must be an integer")
                })?;
                quantity = Some(parsed);
            }
            Some("image") => image = Some(read_image(field).await?),
            _ => {}
        }
    }

    let session = state.session(pantry_id).await?;
    let id = session
        .inventory
        .create(NewItem {
            name,
            quantity: quantity.unwrap_or(0),
            image,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        [(
            header::LOCATION,
            format!("/api/v1/pantries/{}/items/{}", pantry_id, id),
        )],
        Json(CreatedItemResponse {
            id,
            inventory: session.inventory.snapshot(),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn update_item(
    State(state): State<AppState>,
    Path((pantry_id, item_id)): Path<(Uuid, Uuid)>,
    Json(patch): Json<ItemPatch>,
) -> Result<Json<InventorySnapshot>, AppError> {
    let session = state.session(pantry_id).await?;
    session.inventory.update(item_id, patch).await?;
    Ok(Json(session.inventory.snapshot()))
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    Path((pantry_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<InventorySnapshot>, AppError> {
    let session = state.session(pantry_id).await?;
    session.inventory.delete(item_id).await?;
    Ok(Json(session.inventory.snapshot()))
}

#[instrument(skip(state))]
pub async fn adjust_quantity(
    State(state): State<AppState>,
    Path((pantry_id, item_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<QuantityRequest>,
) -> Result<Json<InventorySnapshot>, AppError> {
    let session = state.session(pantry_id).await?;
    session.inventory.set_quantity(item_id, body.delta).await?;
    Ok(Json(session.inventory.snapshot()))
}

#[instrument(skip(state, body))]
pub async fn rename_item(
    State(state): State<AppState>,
    Path((pantry_id, item_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<RenameRequest>,
) -> Result<Json<InventorySnapshot>, AppError> {
    let session = state.session(pantry_id).await?;
    session.inventory.rename(item_id, &body.name).await?;
    Ok(Json(session.inventory.snapshot()))
}

/// PUT multipart with a single `image` file.
#[instrument(skip(state, mp))]
pub async fn replace_image(
    State(state): State<AppState>,
    Path((pantry_id, item_id)): Path<(Uuid, Uuid)>,
    mut mp: Multipart,
) -> Result<Json<InventorySnapshot>, AppError> {
    let mut image = None;
    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let is_image = field.name() == Some("image");
        if is_image {
            image = Some(read_image(field).await?);
        }
    }
    let image = image.ok_or_else(|| AppError::validation("image is required"))?;

    let session = state.session(pantry_id).await?;
    session.inventory.update_image(item_id, image).await?;
    Ok(Json(session.inventory.snapshot()))
}

#[instrument(skip(state))]
pub async fn toggle_select(
    State(state): State<AppState>,
    Path((pantry_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SelectionResponse>, AppError> {
    let session = state.session(pantry_id).await?;
    session.inventory.toggle_select(item_id)?;
    let snapshot = session.inventory.snapshot();
    Ok(Json(SelectionResponse {
        selected: snapshot.selected,
        all_selected: snapshot.all_selected,
    }))
}

#[instrument(skip(state))]
pub async fn select_all(
    State(state): State<AppState>,
    Path(pantry_id): Path<Uuid>,
) -> Result<Json<SelectionResponse>, AppError> {
    let session = state.session(pantry_id).await?;
    let all_selected = session.inventory.select_all();
    Ok(Json(SelectionResponse {
        selected: session.inventory.selection(),
        all_selected,
    }))
}

#[instrument(skip(state))]
pub async fn delete_selected(
    State(state): State<AppState>,
    Path(pantry_id): Path<Uuid>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    let session = state.session(pantry_id).await?;
    let report = session.inventory.delete_selected().await?;
    Ok(Json(BulkDeleteResponse {
        report,
        inventory: session.inventory.snapshot(),
    }))
}

#[instrument(skip(state))]
pub async fn set_filter(
    State(state): State<AppState>,
    Path(pantry_id): Path<Uuid>,
    Json(body): Json<FilterRequest>,
) -> Result<Json<InventorySnapshot>, AppError> {
    let session = state.session(pantry_id).await?;
    session.inventory.set_filter(body.term);
    Ok(Json(session.inventory.snapshot()))
}

async fn read_image(field: axum::extract::multipart::Field<'_>) -> Result<ImageUpload, AppError> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field
        .content_type()
        .map(str::to_string)
        .unwrap_or_else(|| "application/octet-stream".into());
    let body = field.bytes().await.map_err(bad_multipart)?;
    Ok(ImageUpload {
        file_name,
        body,
        content_type,
    })
}

fn bad_multipart<E: std::fmt::Display>(e: E) -> AppError {
    AppError::validation(format!("invalid multipart body: {}", e))
}
