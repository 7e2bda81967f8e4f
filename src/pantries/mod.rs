pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use repo::PantryRepo;
pub use repo_types::Pantry;
pub use services::PantryGallery;

pub fn router() -> Router<AppState> {
    handlers::pantry_routes()
}
