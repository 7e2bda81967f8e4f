use serde::Serialize;

use super::parse::Recipe;
use super::services::{Suggestion, SuggestionStatus};
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub status: SuggestionStatus,
    pub raw: Option<String>,
    pub parsed: Option<Recipe>,
    pub error: Option<ErrorBody>,
}

impl From<&Suggestion> for SuggestionResponse {
    fn from(s: &Suggestion) -> Self {
        Self {
            status: s.status(),
            raw: s.raw().map(str::to_string),
            parsed: s.recipe().cloned(),
            error: s.error().map(ErrorBody::from),
        }
    }
}
