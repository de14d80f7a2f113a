use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::storage::join_public;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Folder segment used by the hosted bucket layout in stored URLs.
const BUCKET_SEGMENT: &str = "recipe-images/";

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

pub fn validate_upload(item: &UploadItem) -> Result<(), AppError> {
    if item.body.is_empty() {
        return Err(AppError::validation("No file provided"));
    }
    if !item.content_type.starts_with("image/") {
        return Err(AppError::validation("File must be an image"));
    }
    if item.body.len() > MAX_IMAGE_BYTES {
        return Err(AppError::validation("Image size must be less than 5MB"));
    }
    Ok(())
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

fn extension(item: &UploadItem) -> String {
    if let Some(ext) = ext_from_mime(&item.content_type) {
        return ext.to_string();
    }
    item.file_name
        .as_deref()
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

/// `{user}/{recipe}_{millis}.{ext}`; the timestamp keeps re-uploads apart.
pub fn object_key(user_id: Uuid, recipe_id: Uuid, at: OffsetDateTime, ext: &str) -> String {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    format!("{}/{}_{}.{}", user_id, recipe_id, millis, ext)
}

pub async fn upload_recipe_image(
    st: &AppState,
    user_id: Uuid,
    recipe_id: Uuid,
    item: UploadItem,
) -> Result<StoredObject, AppError> {
    validate_upload(&item)?;
    let key = object_key(user_id, recipe_id, OffsetDateTime::now_utc(), &extension(&item));
    debug!(%key, size = item.body.len(), "uploading recipe image");
    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .map_err(|e| AppError::storage("Failed to upload image", e))?;
    let url = st.storage.public_url(&key);
    Ok(StoredObject { key, url })
}

/// Stored values may be absolute URLs or bare object keys; the latter are
/// joined onto the public storage base.
pub fn normalize_image_url(public_base: &str, stored: &str) -> String {
    if stored.starts_with("http") {
        stored.to_string()
    } else {
        join_public(public_base, stored)
    }
}

/// Recovers the object key from a stored image URL.
pub fn object_key_from_url(public_base: &str, url: &str) -> Option<String> {
    let base = format!("{}/", public_base.trim_end_matches('/'));
    let key = if let Some(rest) = url.strip_prefix(&base) {
        rest
    } else if let Some((_, rest)) = url.split_once(BUCKET_SEGMENT) {
        rest
    } else if !url.starts_with("http") {
        url.trim_start_matches('/')
    } else {
        return None;
    };
    (!key.is_empty()).then(|| key.to_string())
}

/// Deletes the objects behind `urls`. Failures are logged only.
pub async fn remove_objects_best_effort(st: &AppState, urls: &[String]) {
    let base = &st.config.storage.public_url;
    for url in urls {
        let Some(key) = object_key_from_url(base, url) else {
            warn!(%url, "cannot derive object key from image url");
            continue;
        };
        if let Err(e) = st.storage.delete_object(&key).await {
            warn!(%key, error = %e, "failed to delete orphaned image");
        }
    }
}
