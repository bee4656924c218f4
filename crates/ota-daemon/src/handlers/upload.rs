// SPDX-License-Identifier: MIT OR Apache-2.0
//! `POST /upload` (C5, §4.5).

use crate::AppState;
use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use ota_error::{ErrorCode, OtaError};
use ota_ingest::{IngestRequest, IngestedFile, ingest_upload};
use serde_json::json;
use std::sync::Arc;

/// Header names are plain (no `x-app-` prefix), matching the ingestion
/// pipeline's own naming convention as described in `spec.md` §4.5, which
/// is distinct from the device-poll headers in §4.4.
fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

pub async fn post_upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, OtaError> {
    let presented_secret = header(&headers, "expo-upload-secret").unwrap_or_default();
    let application_id =
        header(&headers, "project").ok_or_else(|| missing("project"))?;
    let runtime_version = header(&headers, "version").ok_or_else(|| missing("version"))?;
    let release_channel =
        header(&headers, "release-channel").ok_or_else(|| missing("release-channel"))?;
    let platform = header(&headers, "platform")
        .map(|p| p.parse())
        .transpose()
        .map_err(|_| OtaError::new(ErrorCode::InvalidPlatform, "platform header is not recognised"))?
        .unwrap_or(ota_core::Platform::All);

    let signed_manifest = header(&headers, "signed-manifest")
        .map(|b64| decode_base64_header("signed-manifest", &b64))
        .transpose()?;
    let manifest_signature = header(&headers, "manifest-signature")
        .map(|b64| decode_base64_header("manifest-signature", &b64))
        .transpose()?;

    let request = IngestRequest {
        runtime_version,
        release_channel,
        platform,
        git_branch: header(&headers, "git-branch"),
        git_commit: header(&headers, "git-commit"),
        signed_manifest,
        manifest_signature,
    };

    let mut files = Vec::new();
    let max_part_bytes = state.config.max_upload_bytes as usize;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| OtaError::new(ErrorCode::InvalidJson, "malformed multipart body").with_source(e))?
    {
        let Some(relative_path) = field.name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| OtaError::new(ErrorCode::PayloadTooLarge, "failed to read multipart part").with_source(e))?;
        if bytes.len() > max_part_bytes {
            return Err(OtaError::new(ErrorCode::PayloadTooLarge, "multipart part exceeded the configured limit")
                .with_context("relative_path", &relative_path));
        }
        files.push(IngestedFile { relative_path, bytes });
    }

    let upload = ingest_upload(
        &state.pool,
        &state.store,
        &state.config.upload_secret,
        &presented_secret,
        &application_id,
        request,
        files,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": upload.id,
            "platform": upload.platform,
            "status": upload.status,
        })),
    ))
}

fn missing(field: &'static str) -> OtaError {
    OtaError::new(ErrorCode::MissingField, format!("missing required header '{field}'"))
        .with_context("field", field)
}

fn decode_base64_header(field: &'static str, value: &str) -> Result<Vec<u8>, OtaError> {
    BASE64_STANDARD
        .decode(value)
        .map_err(|e| OtaError::new(ErrorCode::InvalidJson, format!("'{field}' header is not valid base64")).with_source(e))
}
