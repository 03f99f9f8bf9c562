//! In-memory [`BlobStore`] for tests and local development
//!
//! Objects live in a `HashMap` behind `std::sync::Mutex`. Individual
//! operations can be made to fail to exercise saga compensation.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::BlobStore;

/// Operation selector for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobOp {
    Put,
    Copy,
    Delete,
}

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: Mutex<HashMap<(String, String), StoredBlob>>,
    failing: Mutex<HashSet<BlobOp>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `op` fail until [`Self::recover`]
    pub fn fail_on(&self, op: BlobOp) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op);
    }

    pub fn recover(&self, op: BlobOp) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&op);
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredBlob> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.get(bucket, key).is_some()
    }

    /// Sorted keys currently stored in `bucket`
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self, op: BlobOp) -> Result<()> {
        if self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&op)
        {
            bail!("injected {:?} failure", op);
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        self.check(BlobOp::Put)?;
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (bucket.to_string(), key.to_string()),
                StoredBlob {
                    bytes,
                    content_type: content_type.to_string(),
                },
            );
        Ok(())
    }

    async fn copy(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<()> {
        self.check(BlobOp::Copy)?;
        let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(source) = objects
            .get(&(source_bucket.to_string(), source_key.to_string()))
            .cloned()
        else {
            bail!("NoSuchKey: {}/{}", source_bucket, source_key);
        };
        objects.insert((dest_bucket.to_string(), dest_key.to_string()), source);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.check(BlobOp::Delete)?;
        // S3 semantics: deleting a missing key succeeds
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_copy_delete() {
        let store = InMemoryBlobStore::new();
        store
            .put("race-gpx", "catalog/a/1.gpx", b"<gpx/>".to_vec(), "application/gpx+xml")
            .await
            .unwrap();
        store
            .copy("race-gpx", "catalog/a/1.gpx", "gpx-files", "u/p.gpx")
            .await
            .unwrap();

        assert_eq!(store.get("gpx-files", "u/p.gpx").unwrap().bytes, b"<gpx/>");
        assert_eq!(store.len(), 2);

        store.delete("race-gpx", "catalog/a/1.gpx").await.unwrap();
        assert_eq!(store.keys("race-gpx"), Vec::<String>::new());
        assert!(store.contains("gpx-files", "u/p.gpx"));
    }

    #[tokio::test]
    async fn test_copy_missing_source_fails() {
        let store = InMemoryBlobStore::new();
        assert!(store.copy("a", "missing", "b", "dest").await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = InMemoryBlobStore::new();
        store.fail_on(BlobOp::Put);
        assert!(store.put("b", "k", vec![1], "x").await.is_err());
        assert!(store.is_empty());

        store.recover(BlobOp::Put);
        assert!(store.put("b", "k", vec![1], "x").await.is_ok());
    }
}
