pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod images;
pub mod items;
pub mod pantries;
pub mod recipes;
pub mod state;
pub mod storage;

#[cfg(test)]
mod testing;

pub use error::AppError;
