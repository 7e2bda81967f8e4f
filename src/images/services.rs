use anyhow::Context;
use bytes::Bytes;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::storage::StorageClient;

pub struct ImageUpload {
    pub file_name: Option<String>,
    pub body: Bytes,
    pub content_type: String,
}

/// Stores an item image and returns its retrieval URL.
///
/// Every upload gets a fresh key under `images/{pantry_id}/`.
#[instrument(skip(storage, image), fields(size = image.body.len()))]
pub async fn upload_image(
    storage: &dyn StorageClient,
    pantry_id: Uuid,
    image: ImageUpload,
) -> Result<String, AppError> {
    if image.body.is_empty() {
        return Err(AppError::validation("image file is empty"));
    }

    let ext = ext_from_mime(&image.content_type)
        .or_else(|| image.file_name.as_deref().and_then(ext_from_file_name))
        .unwrap_or("bin");
    let key = format!("images/{}/{}.{}", pantry_id, Uuid::new_v4(), ext);

    storage
        .put_object(&key, image.body, &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))
        .map_err(|e| {
            error!(error = %e, %key, "image upload failed");
            AppError::upload(e)
        })?;

    info!(%key, "image uploaded");
    Ok(storage.object_url(&key))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

fn ext_from_file_name(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "jpeg" | "jpg" => Some("jpg"),
        "png" => Some("png"),
        "webp" => Some("webp"),
        "heic" => Some("heic"),
        "gif" => Some("gif"),
        _ => None,
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn png(name: Option<&str>, ct: &str) -> ImageUpload {
        ImageUpload {
            file_name: name.map(str::to_string),
            body: Bytes::from_static(&[0x89, 0x50, 0x4E, 0x47]),
            content_type: ct.to_string(),
        }
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn test_ext_from_file_name() {
        assert_eq!(ext_from_file_name("apple.JPEG"), Some("jpg"));
        assert_eq!(ext_from_file_name("scan.tar.png"), Some("png"));
        assert_eq!(ext_from_file_name("README"), None);
    }

    #[tokio::test]
    async fn upload_stores_blob_and_returns_url() {
        let storage = MemoryStorage::new();
        let pantry_id = Uuid::new_v4();

        let url = upload_image(&storage, pantry_id, png(None, "image/png"))
            .await
            .unwrap();

        assert_eq!(storage.len(), 1);
        assert!(url.contains(&format!("images/{}/", pantry_id)));
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn upload_falls_back_to_file_name_extension() {
        let storage = MemoryStorage::new();
        let url = upload_image(
            &storage,
            Uuid::new_v4(),
            png(Some("photo.webp"), "application/octet-stream"),
        )
        .await
        .unwrap();
        assert!(url.ends_with(".webp"));
    }

    #[tokio::test]
    async fn returned_url_addresses_the_stored_object() {
        let storage = MemoryStorage::new();
        let url = upload_image(&storage, Uuid::new_v4(), png(None, "image/png"))
            .await
            .unwrap();

        let key = url.strip_prefix("memory://blobs/").unwrap();
        assert_eq!(storage.get(key).unwrap(), Bytes::from_static(&[0x89, 0x50, 0x4E, 0x47]));
    }

    #[tokio::test]
    async fn empty_image_is_rejected_before_upload() {
        let storage = MemoryStorage::new();
        let image = ImageUpload {
            file_name: None,
            body: Bytes::new(),
            content_type: "image/png".into(),
        };
        let err = upload_image(&storage, Uuid::new_v4(), image)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(storage.is_empty());
    }
}
