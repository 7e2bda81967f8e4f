pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod selection;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use repo::ItemRepo;
pub use repo_types::{Item, ItemPatch};
pub use selection::Selection;
pub use services::{BulkDeleteReport, InventoryManager, NewItem, RefreshPolicy};

pub fn router() -> Router<AppState> {
    handlers::item_routes()
}
