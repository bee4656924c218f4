// SPDX-License-Identifier: MIT OR Apache-2.0
//! Manifest composer (C7, §4.7).
//!
//! Pure over already-fetched rows: the caller is responsible for the one
//! database read (`find_servable_upload`) and for enqueuing the C9
//! device-record upsert. This keeps the composition and signing logic
//! testable without a database or HTTP server.

use crate::request::DeviceContext;
use ota_core::{Application, AssetsManifest, Platform, Upload};
use ota_error::{ErrorCode, OtaError};
use serde_json::{Map, Value, json};

/// The exact bytes to put on the wire for the manifest part, plus the
/// `expo-signature` header value to attach, if any.
///
/// `manifest_bytes` must never be re-serialized once produced: when it
/// came from a signed passthrough, re-encoding would change whitespace and
/// invalidate the signature (§9).
#[derive(Debug, Clone)]
pub struct ComposedManifest {
    /// Raw JSON bytes of the manifest part.
    pub manifest_bytes: Vec<u8>,
    /// Structured-Headers `sig="...", keyid="..."` value, if a signature
    /// accompanies this manifest.
    pub signature_header: Option<String>,
}

/// Compose the manifest for `upload` as observed by `ctx`.
///
/// Tries the signed-passthrough branch first (step 3); falls back to
/// building a fresh manifest (step 4), signing it only if the device asked
/// for a signature and the application has a private key. Fails closed
/// with [`ErrorCode::SigningFailed`] rather than return an unsigned body
/// when a signature was requested but cannot be produced.
pub fn compose_manifest(
    upload: &Upload,
    application: &Application,
    ctx: &DeviceContext,
    base_url: &str,
) -> Result<ComposedManifest, OtaError> {
    if let Some(passthrough) = try_signed_passthrough(upload, ctx.platform)? {
        return Ok(passthrough);
    }

    build_fresh_manifest(upload, application, ctx, base_url)
}

/// §4.7 step 3: if `upload.signed_manifest_json` has an entry for
/// `platform`, emit it and its paired signature verbatim.
fn try_signed_passthrough(
    upload: &Upload,
    platform: Platform,
) -> Result<Option<ComposedManifest>, OtaError> {
    let Some(signed_json) = upload.signed_manifest_json.as_deref() else {
        return Ok(None);
    };

    let Some(manifest_bytes) = platform_entry_bytes(signed_json, platform)? else {
        return Ok(None);
    };

    let signature_header = upload
        .manifest_signature
        .as_deref()
        .map(|sig_json| platform_entry_bytes(sig_json, platform))
        .transpose()?
        .flatten()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());

    Ok(Some(ComposedManifest {
        manifest_bytes,
        signature_header,
    }))
}

/// Parse `json` as a map from platform name to a JSON-encoded string and
/// return the raw bytes of the entry for `platform`, if present. Returning
/// the decoded string's bytes (rather than re-serializing the outer value)
/// preserves whatever bytes the publisher originally embedded.
fn platform_entry_bytes(json: &[u8], platform: Platform) -> Result<Option<Vec<u8>>, OtaError> {
    let outer: Value = serde_json::from_slice(json).map_err(|e| {
        OtaError::new(ErrorCode::InvalidJson, "stored signed manifest is not valid JSON").with_source(e)
    })?;
    let Some(entry) = outer.get(platform.to_string().as_str()) else {
        return Ok(None);
    };
    match entry {
        Value::String(s) => Ok(Some(s.clone().into_bytes())),
        other => Ok(Some(other.to_string().into_bytes())),
    }
}

/// §4.7 step 4: build a fresh manifest object from the upload's cached
/// asset table and the application's config document.
fn build_fresh_manifest(
    upload: &Upload,
    application: &Application,
    ctx: &DeviceContext,
    base_url: &str,
) -> Result<ComposedManifest, OtaError> {
    let assets_manifest: AssetsManifest = serde_json::from_slice(&upload.assets_manifest_json)
        .map_err(|e| {
            OtaError::new(ErrorCode::Internal, "stored assets manifest is not valid JSON").with_source(e)
        })?;
    let platform_assets = assets_manifest.for_platform(ctx.platform).ok_or_else(|| {
        OtaError::new(
            ErrorCode::Internal,
            "upload has no asset metadata for the requested platform",
        )
        .with_context("upload_id", upload.id.to_string())
        .with_context("platform", ctx.platform.to_string())
    })?;

    let expo_client: Value = serde_json::from_slice(&upload.app_config_json).map_err(|e| {
        OtaError::new(ErrorCode::Internal, "stored app config is not valid JSON").with_source(e)
    })?;

    let launch_asset = asset_value(&upload.blob_prefix, &platform_assets.launch_asset, ctx.platform, base_url);
    let assets: Vec<Value> = platform_assets
        .assets
        .iter()
        .map(|a| asset_value(&upload.blob_prefix, a, ctx.platform, base_url))
        .collect();

    let manifest = json!({
        "id": upload.id.to_string(),
        "createdAt": upload.created_at.to_rfc3339(),
        "runtimeVersion": ctx.runtime_version,
        "launchAsset": launch_asset,
        "assets": assets,
        "metadata": {},
        "extra": { "expoClient": expo_client },
    });

    let manifest_bytes = serde_json::to_vec(&manifest).map_err(|e| {
        OtaError::new(ErrorCode::Internal, "failed to serialize composed manifest").with_source(e)
    })?;

    let signature_header = if ctx.expect_signature {
        let private_key = application.private_key_pem.as_deref().ok_or_else(|| {
            OtaError::new(
                ErrorCode::SigningFailed,
                "signature requested but application has no signing key",
            )
            .with_context("application_id", &application.id)
        })?;
        let signature = ota_signing::sign(private_key, &manifest_bytes)?;
        Some(ota_signing::encode_signature_header(&signature))
    } else {
        None
    };

    Ok(ComposedManifest {
        manifest_bytes,
        signature_header,
    })
}

fn asset_value(
    blob_prefix: &str,
    asset: &ota_core::AssetEntry,
    platform: Platform,
    base_url: &str,
) -> Value {
    let key = format!("{blob_prefix}/{}", asset.relative_path);
    let url = asset_url(base_url, &key, &asset.content_type, platform);
    let mut object = Map::new();
    object.insert("hash".into(), Value::String(asset.hash.clone()));
    object.insert("key".into(), Value::String(asset.key.clone()));
    object.insert("fileExtension".into(), Value::String(asset.file_extension.clone()));
    object.insert("contentType".into(), Value::String(asset.content_type.clone()));
    object.insert("url".into(), Value::String(url));
    Value::Object(object)
}

/// Build the absolute URL the asset-serving endpoint (§4.9) resolves,
/// carrying the object-store key plus the `contentType`/`platform` query
/// parameters the composer attaches (§4.7 step 4).
fn asset_url(base_url: &str, key: &str, content_type: &str, platform: Platform) -> String {
    format!(
        "{}/api/assets?asset={}&contentType={}&platform={}",
        base_url.trim_end_matches('/'),
        percent_encode_query_component(key),
        percent_encode_query_component(content_type),
        platform
    )
}

/// Minimal RFC 3986 query-component percent-encoding: everything outside
/// unreserved characters is escaped. Good enough for the small, mostly
/// already URL-safe alphabet object-store keys and MIME types use; this
/// server has no other use for a general-purpose URL-encoding crate.
fn percent_encode_query_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
