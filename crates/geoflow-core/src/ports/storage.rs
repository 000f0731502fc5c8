use async_trait::async_trait;

use crate::error::Result;

/// Metadata sent along with uploaded bytes
#[derive(Debug, Clone)]
pub struct UploadMeta {
    pub file_name: String,
    pub content_length: u64,
}

/// Port for persisting uploaded dataset bytes
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Persist the bytes and return the location they can be fetched from
    async fn put(&self, bytes: &[u8], meta: &UploadMeta) -> Result<String>;
}
