// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed object-store facade (C2).
//!
//! Wraps an [`object_store::ObjectStore`] behind the four operations the
//! rest of the workspace needs: `put`, `get`, `list`, `delete`. Keys never
//! begin with `/`; `/` is the only path separator. No atomicity is provided
//! across operations — ingestion and delete pipelines tolerate partial
//! failure by design (orphaned keys are harmless and reconciled by
//! [`BlobStore::gc_candidates`]).
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod keys;

use bytes::Bytes;
use futures::StreamExt;
use object_store::path::Path as StorePath;
use object_store::{ObjectStore, PutPayload};
use ota_config::StoreConfig;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Errors raised by the object-store facade.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested key does not exist.
    #[error("object not found: {key}")]
    NotFound {
        /// The key that was requested.
        key: String,
    },
    /// The backend could not be reached or returned a transient failure.
    /// Callers should retry the whole operation rather than partially
    /// recover.
    #[error("object store unavailable: {source}")]
    Unavailable {
        /// Underlying `object_store` error.
        #[source]
        source: object_store::Error,
    },
    /// The store backend could not be constructed from configuration.
    #[error("failed to initialize object store: {reason}")]
    InitFailed {
        /// Human-readable detail.
        reason: String,
    },
}

impl From<object_store::Error> for StoreError {
    fn from(source: object_store::Error) -> Self {
        match &source {
            object_store::Error::NotFound { path, .. } => StoreError::NotFound {
                key: path.clone(),
            },
            _ => StoreError::Unavailable { source },
        }
    }
}

/// Bytes and size of a stored object, returned by [`BlobStore::get`].
pub struct StoredObject {
    /// Full object body.
    pub bytes: Bytes,
    /// Size in bytes (equal to `bytes.len()`, kept as a distinct field to
    /// mirror the `(stream, size)` contract of the component spec).
    pub size: usize,
    /// Content type inferred by the caller's key, not set here.
    pub content_type: Option<String>,
}

/// Typed facade over an [`object_store::ObjectStore`] backend.
#[derive(Clone)]
pub struct BlobStore {
    inner: Arc<dyn ObjectStore>,
}

impl BlobStore {
    /// Build a [`BlobStore`] from the configured backend.
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let inner: Arc<dyn ObjectStore> = match config {
            StoreConfig::Local { path } => {
                std::fs::create_dir_all(path).map_err(|e| StoreError::InitFailed {
                    reason: format!("could not create local store root '{path}': {e}"),
                })?;
                let fs = object_store::local::LocalFileSystem::new_with_prefix(path).map_err(
                    |e| StoreError::InitFailed {
                        reason: e.to_string(),
                    },
                )?;
                Arc::new(fs)
            }
            StoreConfig::S3 {
                bucket,
                region,
                endpoint,
            } => {
                let mut builder = object_store::aws::AmazonS3Builder::new()
                    .with_bucket_name(bucket)
                    .with_region(region);
                if let Some(endpoint) = endpoint {
                    builder = builder.with_endpoint(endpoint).with_allow_http(true);
                }
                let s3 = builder.build().map_err(|e| StoreError::InitFailed {
                    reason: e.to_string(),
                })?;
                Arc::new(s3)
            }
        };
        Ok(Self { inner })
    }

    /// Wrap an already-constructed backend directly (used by tests).
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    /// Write `bytes` to `key`, overwriting any existing object.
    pub async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StoreError> {
        let path = normalize_key(key);
        self.inner
            .put(&path, PutPayload::from_bytes(bytes))
            .await?;
        Ok(())
    }

    /// Fetch the full object at `key`.
    pub async fn get(&self, key: &str) -> Result<StoredObject, StoreError> {
        let path = normalize_key(key);
        let result = self.inner.get(&path).await?;
        let bytes = result.bytes().await?;
        let size = bytes.len();
        Ok(StoredObject {
            bytes,
            size,
            content_type: None,
        })
    }

    /// List every key under `prefix`.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let path = normalize_key(prefix);
        let mut stream = self.inner.list(Some(&path));
        let mut out = Vec::new();
        while let Some(meta) = stream.next().await {
            out.push(meta?.location.to_string());
        }
        Ok(out)
    }

    /// Delete the object at `key`. Missing keys are not an error.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = normalize_key(key);
        match self.inner.delete(&path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every object under `prefix`. Best-effort: a single failed
    /// delete does not stop the others, and all errors encountered are
    /// returned together.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<(), StoreError> {
        let keys = self.list(prefix).await?;
        let mut first_err = None;
        for key in keys {
            if let Err(e) = self.delete(&key).await {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// List the update-bundle prefixes stored under `updates/<app_id>/**`
    /// that no longer appear in `live_prefixes`, i.e. candidates for
    /// garbage collection.
    ///
    /// This never deletes anything; it is a read-only diff intended to
    /// back an opt-in maintenance endpoint.
    pub async fn gc_candidates(
        &self,
        app_id: &str,
        live_prefixes: &BTreeSet<String>,
    ) -> Result<Vec<String>, StoreError> {
        let root = keys::app_root(app_id);
        let all_keys = self.list(&root).await?;
        let mut seen = BTreeSet::new();
        for key in all_keys {
            if let Some(prefix) = keys::upload_prefix_of(&key) {
                seen.insert(prefix);
            }
        }
        Ok(seen
            .into_iter()
            .filter(|p| !live_prefixes.contains(p))
            .collect())
    }
}

fn normalize_key(key: &str) -> StorePath {
    StorePath::from(key.trim_start_matches('/'))
}

/// `true` if `key` may be served through the public asset endpoint: it must
/// live under `updates/` and must not end with `app.json` or `package.json`
/// (§4.9).
pub fn is_servable_asset_key(key: &str) -> bool {
    key.starts_with("updates/") && !key.ends_with("app.json") && !key.ends_with("package.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_key_strips_leading_slash() {
        assert_eq!(normalize_key("/a/b").to_string(), "a/b");
        assert_eq!(normalize_key("a/b").to_string(), "a/b");
    }

    #[test]
    fn servable_asset_key_requires_updates_prefix() {
        assert!(is_servable_asset_key("updates/app/1.0.0/id/bundle.hbc"));
        assert!(!is_servable_asset_key("secrets/app.json"));
    }

    #[test]
    fn servable_asset_key_excludes_app_json_and_package_json() {
        assert!(!is_servable_asset_key("updates/app/1.0.0/id/app.json"));
        assert!(!is_servable_asset_key("updates/app/1.0.0/id/package.json"));
        assert!(is_servable_asset_key("updates/app/1.0.0/id/metadata.json"));
    }

    #[tokio::test]
    async fn put_get_round_trip_on_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let fs = object_store::local::LocalFileSystem::new_with_prefix(dir.path()).unwrap();
        let store = BlobStore::new(Arc::new(fs));

        store
            .put("updates/app/1.0.0/u1/bundle.hbc", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        let obj = store.get("updates/app/1.0.0/u1/bundle.hbc").await.unwrap();
        assert_eq!(&obj.bytes[..], b"hello");
        assert_eq!(obj.size, 5);
    }

    #[tokio::test]
    async fn get_missing_key_returns_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fs = object_store::local::LocalFileSystem::new_with_prefix(dir.path()).unwrap();
        let store = BlobStore::new(Arc::new(fs));
        let err = store.get("updates/app/1.0.0/missing/bundle.hbc").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_missing_key_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let fs = object_store::local::LocalFileSystem::new_with_prefix(dir.path()).unwrap();
        let store = BlobStore::new(Arc::new(fs));
        store.delete("updates/app/1.0.0/missing/bundle.hbc").await.unwrap();
    }

    #[tokio::test]
    async fn gc_candidates_excludes_live_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let fs = object_store::local::LocalFileSystem::new_with_prefix(dir.path()).unwrap();
        let store = BlobStore::new(Arc::new(fs));

        store
            .put("updates/app/1.0.0/live-id/bundle.hbc", Bytes::from_static(b"a"))
            .await
            .unwrap();
        store
            .put("updates/app/1.0.0/orphan-id/bundle.hbc", Bytes::from_static(b"b"))
            .await
            .unwrap();

        let mut live = BTreeSet::new();
        live.insert("updates/app/1.0.0/live-id".to_string());

        let candidates = store.gc_candidates("app", &live).await.unwrap();
        assert_eq!(candidates, vec!["updates/app/1.0.0/orphan-id".to_string()]);
    }

    #[tokio::test]
    async fn delete_prefix_removes_every_key_under_it() {
        let dir = tempfile::tempdir().unwrap();
        let fs = object_store::local::LocalFileSystem::new_with_prefix(dir.path()).unwrap();
        let store = BlobStore::new(Arc::new(fs));

        store
            .put("updates/app/1.0.0/id/metadata.json", Bytes::from_static(b"{}"))
            .await
            .unwrap();
        store
            .put("updates/app/1.0.0/id/bundle.hbc", Bytes::from_static(b"x"))
            .await
            .unwrap();

        store.delete_prefix("updates/app/1.0.0/id").await.unwrap();
        let remaining = store.list("updates/app/1.0.0/id").await.unwrap();
        assert!(remaining.is_empty());
    }
}
