// SPDX-License-Identifier: MIT OR Apache-2.0
//! Multipart upload ingestion pipeline (C5).
//!
//! This crate implements the procedure in full from already-buffered
//! multipart parts: shared-secret authentication, application resolution,
//! updateId derivation, content-addressed placement in the object store,
//! `assets_manifest_json` pre-computation, and atomic row insertion.
//!
//! Wire-level multipart parsing (`axum::extract::Multipart` streaming into
//! in-memory buffers, with the per-part and total-body size caps from §5)
//! happens in `ota-daemon`; this crate receives the already-buffered
//! [`IngestedFile`] list so the pipeline stays testable without an HTTP
//! server.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod content_type;
mod metadata;
mod signed_manifest;

pub use content_type::content_type_for_extension;
pub use metadata::{AssetDeclaration, FileMetadataByPlatform, MetadataDocument, PlatformFileMetadata};
pub use signed_manifest::extract_committed_update_id;

use bytes::Bytes;
use ota_core::{AssetEntry, AssetsManifest, Platform, PlatformAssets, Upload, UploadStatus};
use ota_db::PgPool;
use ota_error::{ErrorCode, OtaError};
use ota_store::BlobStore;
use subtle::ConstantTimeEq;
use tracing::info;
use uuid::Uuid;

/// One buffered multipart file part: the publisher-chosen relative path
/// (the part's field name) and its raw body.
#[derive(Debug, Clone)]
pub struct IngestedFile {
    /// Relative path within the upload, e.g. `"metadata.json"` or
    /// `"_static/js/ios/index-xxxx.hbc"`.
    pub relative_path: String,
    /// Raw file bytes.
    pub bytes: Bytes,
}

/// Header-derived context for one publish request, independent of the
/// multipart body itself.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Opaque runtime-version string (mandatory header).
    pub runtime_version: String,
    /// Opaque release-channel string (mandatory header).
    pub release_channel: String,
    /// Target platform; defaults to [`Platform::All`] when the header is
    /// absent.
    pub platform: Platform,
    /// Publisher-supplied git branch, if any.
    pub git_branch: Option<String>,
    /// Publisher-supplied git commit, if any.
    pub git_commit: Option<String>,
    /// Decoded bytes of the `signed-manifest` header, if present.
    pub signed_manifest: Option<Vec<u8>>,
    /// Decoded bytes of the `manifest-signature` header, if present.
    pub manifest_signature: Option<Vec<u8>>,
}

/// Run the full ingestion pipeline and return the inserted [`Upload`] row.
///
/// `presented_secret` is whatever the caller read out of the shared-secret
/// header; `configured_secret` is the value from [`ota_config::ServerConfig`].
/// The comparison is constant-time (§4.5 step 1).
pub async fn ingest_upload(
    pool: &PgPool,
    store: &BlobStore,
    configured_secret: &str,
    presented_secret: &str,
    application_id: &str,
    request: IngestRequest,
    files: Vec<IngestedFile>,
) -> Result<Upload, OtaError> {
    authenticate(configured_secret, presented_secret)?;

    let application = ota_db::applications::get_application(pool, application_id)
        .await?
        .ok_or_else(|| OtaError::application_not_found(application_id))?;

    let metadata_json = find_file(&files, "metadata.json");
    let app_config_json = find_file(&files, "app.json");

    let update_id = derive_update_id(request.signed_manifest.as_deref(), metadata_json, request.platform)?;

    let blob_prefix = ota_store::keys::blob_prefix(
        &application.id,
        &request.runtime_version,
        &update_id.to_string(),
    );

    let mut size_bytes: i64 = 0;
    for file in &files {
        store
            .put(
                &format!("{blob_prefix}/{}", file.relative_path),
                file.bytes.clone(),
            )
            .await
            .map_err(|e| {
                OtaError::new(ErrorCode::ObjectStoreUnavailable, "failed to store upload file")
                    .with_context("relative_path", &file.relative_path)
                    .with_source(e)
            })?;
        size_bytes += file.bytes.len() as i64;
    }

    let assets_manifest = metadata_json
        .map(|bytes| compute_assets_manifest(bytes, &files))
        .transpose()?
        .unwrap_or_default();

    let upload = Upload {
        id: update_id,
        application_id: application.id.clone(),
        runtime_version: request.runtime_version,
        release_channel: request.release_channel,
        platform: request.platform,
        status: UploadStatus::Ready,
        blob_prefix,
        metadata_json: metadata_json.map(|b| b.to_vec()).unwrap_or_default(),
        app_config_json: app_config_json.map(|b| b.to_vec()).unwrap_or_else(|| b"{}".to_vec()),
        assets_manifest_json: serde_json::to_vec(&assets_manifest).map_err(|e| {
            OtaError::new(ErrorCode::Internal, "failed to serialize assets manifest").with_source(e)
        })?,
        signed_manifest_json: request.signed_manifest,
        manifest_signature: request.manifest_signature,
        git_branch: request.git_branch,
        git_commit: request.git_commit,
        size_bytes,
        created_at: chrono::Utc::now(),
        released_at: None,
        updated_at: chrono::Utc::now(),
    };

    ota_db::uploads::insert_upload(pool, &upload).await?;

    info!(
        upload_id = %upload.id,
        application_id = %upload.application_id,
        runtime_version = %upload.runtime_version,
        release_channel = %upload.release_channel,
        platform = %upload.platform,
        size_bytes = upload.size_bytes,
        "upload ingested"
    );

    Ok(upload)
}

fn authenticate(configured_secret: &str, presented_secret: &str) -> Result<(), OtaError> {
    let matches: bool = configured_secret
        .as_bytes()
        .ct_eq(presented_secret.as_bytes())
        .into();
    if matches {
        Ok(())
    } else {
        Err(OtaError::new(ErrorCode::AuthBad, "shared secret did not match"))
    }
}

fn find_file<'a>(files: &'a [IngestedFile], relative_path: &str) -> Option<&'a [u8]> {
    files
        .iter()
        .find(|f| f.relative_path == relative_path)
        .map(|f| f.bytes.as_ref())
}

/// Derive the update identifier per §4.5 step 4.
fn derive_update_id(
    signed_manifest: Option<&[u8]>,
    metadata_json: Option<&[u8]>,
    platform: Platform,
) -> Result<Uuid, OtaError> {
    if let Some(bytes) = signed_manifest
        && let Some(id_str) = extract_committed_update_id(bytes)
        && let Ok(id) = id_str.parse::<Uuid>()
    {
        return Ok(id);
    }

    if let Some(bytes) = metadata_json {
        let mut salted = Vec::with_capacity(bytes.len() + 1 + platform.to_string().len());
        salted.extend_from_slice(bytes);
        salted.push(b':');
        salted.extend_from_slice(platform.to_string().as_bytes());
        let hash = ota_core::hash::sha256_b64url(&salted);
        let uuid_str = ota_core::hash::hash_to_uuid(&hash);
        return uuid_str
            .parse::<Uuid>()
            .map_err(|e| OtaError::new(ErrorCode::Internal, "derived update id is not a valid UUID").with_source(e));
    }

    Ok(Uuid::new_v4())
}

/// Pre-compute `assets_manifest_json` by walking `metadata.json`'s
/// `fileMetadata.{ios,android}` (§4.5 step 7).
fn compute_assets_manifest(
    metadata_json: &[u8],
    files: &[IngestedFile],
) -> Result<AssetsManifest, OtaError> {
    let doc: MetadataDocument = serde_json::from_slice(metadata_json).map_err(|e| {
        OtaError::new(ErrorCode::InvalidJson, "metadata.json failed to parse").with_source(e)
    })?;

    let ios = doc
        .file_metadata
        .ios
        .as_ref()
        .map(|p| platform_assets(p, files))
        .transpose()?;
    let android = doc
        .file_metadata
        .android
        .as_ref()
        .map(|p| platform_assets(p, files))
        .transpose()?;

    Ok(AssetsManifest { ios, android })
}

fn platform_assets(
    declared: &PlatformFileMetadata,
    files: &[IngestedFile],
) -> Result<PlatformAssets, OtaError> {
    let launch_asset = asset_entry(&declared.bundle, ".bundle", "application/javascript", files)?;
    let assets = declared
        .assets
        .iter()
        .map(|decl| {
            let ext = format!(".{}", decl.ext);
            let content_type = content_type_for_extension(&decl.ext);
            asset_entry(&decl.path, &ext, content_type, files)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PlatformAssets { launch_asset, assets })
}

fn asset_entry(
    relative_path: &str,
    file_extension: &str,
    content_type: &str,
    files: &[IngestedFile],
) -> Result<AssetEntry, OtaError> {
    let bytes = find_file(files, relative_path).ok_or_else(|| {
        OtaError::new(ErrorCode::InvalidJson, "metadata.json references a file not present in the upload")
            .with_context("relative_path", relative_path)
    })?;
    Ok(AssetEntry {
        hash: ota_core::hash::sha256_b64url(bytes),
        key: ota_core::hash::md5_hex(bytes),
        file_extension: file_extension.to_string(),
        content_type: content_type.to_string(),
        relative_path: relative_path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticate_accepts_matching_secret() {
        authenticate("shh", "shh").unwrap();
    }

    #[test]
    fn authenticate_rejects_mismatched_secret() {
        let err = authenticate("shh", "nope").unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthBad);
    }

    #[test]
    fn authenticate_rejects_different_length_secret() {
        let err = authenticate("shh", "sh").unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthBad);
    }

    #[test]
    fn derive_update_id_falls_back_to_metadata_hash() {
        let metadata = br#"{"fileMetadata":{}}"#;
        let id_a = derive_update_id(None, Some(metadata), Platform::Ios).unwrap();
        let id_b = derive_update_id(None, Some(metadata), Platform::Ios).unwrap();
        assert_eq!(id_a, id_b, "must be deterministic (L3)");
    }

    #[test]
    fn derive_update_id_differs_across_platforms_for_identical_metadata() {
        let metadata = br#"{"fileMetadata":{}}"#;
        let ios_id = derive_update_id(None, Some(metadata), Platform::Ios).unwrap();
        let android_id = derive_update_id(None, Some(metadata), Platform::Android).unwrap();
        assert_ne!(ios_id, android_id, "platform suffix must distinguish identical metadata (§9)");
    }

    #[test]
    fn derive_update_id_without_metadata_or_signed_manifest_is_random() {
        let a = derive_update_id(None, None, Platform::Ios).unwrap();
        let b = derive_update_id(None, None, Platform::Ios).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn derive_update_id_prefers_signed_manifest_commitment() {
        let inner = serde_json::json!({"id": "11111111-1111-1111-1111-111111111111"}).to_string();
        let outer = serde_json::json!({"ios": inner}).to_string();
        let metadata = br#"{"fileMetadata":{}}"#;
        let id = derive_update_id(Some(outer.as_bytes()), Some(metadata), Platform::Ios).unwrap();
        assert_eq!(id.to_string(), "11111111-1111-1111-1111-111111111111");
    }

    #[test]
    fn derive_update_id_falls_through_when_signed_manifest_has_no_id() {
        let outer = serde_json::json!({"ios": "{}"}).to_string();
        let metadata = br#"{"fileMetadata":{}}"#;
        let with_signed = derive_update_id(Some(outer.as_bytes()), Some(metadata), Platform::Ios).unwrap();
        let without_signed = derive_update_id(None, Some(metadata), Platform::Ios).unwrap();
        assert_eq!(with_signed, without_signed);
    }

    #[test]
    fn compute_assets_manifest_hashes_bundle_and_assets() {
        let metadata = serde_json::json!({
            "fileMetadata": {
                "ios": {
                    "bundle": "bundles/ios.hbc",
                    "assets": [{"path": "assets/a.png", "ext": "png"}]
                }
            }
        })
        .to_string();
        let files = vec![
            IngestedFile { relative_path: "bundles/ios.hbc".into(), bytes: Bytes::from_static(b"bundle-bytes") },
            IngestedFile { relative_path: "assets/a.png".into(), bytes: Bytes::from_static(b"png-bytes") },
        ];
        let manifest = compute_assets_manifest(metadata.as_bytes(), &files).unwrap();
        let ios = manifest.ios.unwrap();
        assert_eq!(ios.launch_asset.file_extension, ".bundle");
        assert_eq!(ios.launch_asset.content_type, "application/javascript");
        assert_eq!(ios.assets[0].content_type, "image/png");
        assert_eq!(ios.assets[0].hash, ota_core::hash::sha256_b64url(b"png-bytes"));
        assert!(manifest.android.is_none());
    }

    #[test]
    fn compute_assets_manifest_errors_when_bundle_file_missing() {
        let metadata = serde_json::json!({
            "fileMetadata": { "ios": { "bundle": "missing.hbc", "assets": [] } }
        })
        .to_string();
        let err = compute_assets_manifest(metadata.as_bytes(), &[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidJson);
    }
}
