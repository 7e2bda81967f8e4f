pub mod services;

pub use services::{upload_image, ImageUpload};
