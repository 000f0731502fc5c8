//! In-memory upload storage for development and testing.
//!
//! Uses `RwLock::unwrap()` intentionally. Lock poisoning only occurs when
//! another thread panicked while holding the lock, which is an unrecoverable
//! state.

use async_trait::async_trait;
use geoflow_core::error::{GeoflowError, Result};
use geoflow_core::ports::{UploadMeta, UploadStore};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

const URL_PREFIX: &str = "memory://uploads/";

/// In-memory implementation of UploadStore
#[derive(Debug, Clone, Default)]
pub struct MemoryUploadStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryUploadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the bytes stored under a URL returned by `put`
    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        let key = url.strip_prefix(URL_PREFIX)?;
        self.objects.read().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UploadStore for MemoryUploadStore {
    async fn put(&self, bytes: &[u8], meta: &UploadMeta) -> Result<String> {
        if meta.content_length != bytes.len() as u64 {
            return Err(GeoflowError::Storage(format!(
                "Content length mismatch for {}: declared {}, received {}",
                meta.file_name,
                meta.content_length,
                bytes.len()
            )));
        }

        let key = format!("{}-{}", Uuid::new_v4(), meta.file_name);
        self.objects.write().unwrap().insert(key.clone(), bytes.to_vec());

        tracing::debug!(key = %key, size_bytes = bytes.len(), "Stored upload");
        Ok(format!("{}{}", URL_PREFIX, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(file_name: &str, len: usize) -> UploadMeta {
        UploadMeta {
            file_name: file_name.to_string(),
            content_length: len as u64,
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryUploadStore::new();
        let bytes = br#"{"type":"FeatureCollection","features":[]}"#;

        let url = store.put(bytes, &meta("parcels.geojson", bytes.len())).await.unwrap();

        assert!(url.starts_with("memory://uploads/"));
        assert!(url.ends_with("-parcels.geojson"));
        assert_eq!(store.get(&url).as_deref(), Some(&bytes[..]));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_same_name_gets_distinct_keys() {
        let store = MemoryUploadStore::new();
        let a = store.put(b"a", &meta("dem.tif", 1)).await.unwrap();
        let b = store.put(b"b", &meta("dem.tif", 1)).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_length_mismatch_is_storage_error() {
        let store = MemoryUploadStore::new();
        let err = store.put(b"abc", &meta("dem.tif", 10)).await.unwrap_err();

        assert!(matches!(err, GeoflowError::Storage(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_unknown_url() {
        let store = MemoryUploadStore::new();
        assert!(store.get("memory://uploads/missing").is_none());
        assert!(store.get("s3://bucket/key").is_none());
    }
}
