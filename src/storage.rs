//! Object storage collaborator and storage key layout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Prefix under which every original upload is stored.
pub const KEY_PREFIX: &str = "watermark-removal";

/// Options passed along with an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Overwrite an existing object at the same key.
    pub upsert: bool,
    /// MIME type of the payload.
    pub content_type: String,
}

/// A persisted object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    /// Durable, publicly fetchable URL.
    pub public_url: String,
}

/// The object storage collaborator.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Persist `bytes` under `key` and return its durable URL.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        key: &str,
        options: UploadOptions,
    ) -> Result<StoredObject, ServiceError>;
}

/// Build the storage key for an original upload.
///
/// Format: `watermark-removal/original-<epoch-millis>.<ext>`.
#[must_use]
pub fn storage_key(epoch_millis: i64, extension: &str) -> String {
    format!("{KEY_PREFIX}/original-{epoch_millis}.{extension}")
}
