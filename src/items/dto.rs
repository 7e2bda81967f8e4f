use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::Item;
use super::services::BulkDeleteReport;

/// What the client sees of a pantry: the filtered items plus selection state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    pub pantry_id: Option<Uuid>,
    pub items: Vec<Item>,
    pub total: usize,
    pub selected: Vec<Uuid>,
    pub all_selected: bool,
    pub filter: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedItemResponse {
    pub id: Uuid,
    #[serde(flatten)]
    pub inventory: InventorySnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    #[serde(flatten)]
    pub report: BulkDeleteReport,
    pub inventory: InventorySnapshot,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub term: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResponse {
    pub selected: Vec<Uuid>,
    pub all_selected: bool,
}
