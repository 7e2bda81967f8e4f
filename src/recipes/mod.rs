pub mod client;
pub mod dto;
pub mod handlers;
pub mod parse;
pub mod prompt;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use client::{OpenRouterClient, TextGenerator};
pub use parse::{parse_recipe, Recipe};
pub use prompt::build_prompt;
pub use services::{RecipePipeline, Suggestion, SuggestionStatus};

pub fn router() -> Router<AppState> {
    handlers::recipe_routes()
}
