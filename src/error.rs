use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by inventory and recipe operations.
///
/// Payloads are plain strings so a failed state can be stored and cloned
/// alongside the data it describes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("record store error: {0}")]
    Store(String),

    #[error("no pantry {0}")]
    UnknownPantry(Uuid),

    #[error("could not resolve items: {}", join_ids(.0))]
    UnresolvedItems(Vec<Uuid>),

    #[error("image upload failed: {0}")]
    Upload(String),

    #[error("recipe service error: {0}")]
    Network(String),

    #[error("could not parse recipe: {0}")]
    Parse(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Wraps an infrastructure error from the record store, keeping the context chain.
    pub fn store(err: anyhow::Error) -> Self {
        Self::Store(format!("{:#}", err))
    }

    pub fn upload(err: anyhow::Error) -> Self {
        Self::Upload(format!("{:#}", err))
    }

    /// Stable machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::UnknownPantry(_) => "validation",
            Self::Store(_) | Self::UnresolvedItems(_) => "store",
            Self::Upload(_) => "upload",
            Self::Network(_) => "network",
            Self::Parse(_) => "parse",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::UnknownPantry(_) | Self::UnresolvedItems(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Network(_) | Self::Parse(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
