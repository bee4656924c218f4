// SPDX-License-Identifier: MIT OR Apache-2.0
//! `GET /api/manifest` and `GET /api/manifest/<app>/<channel>` (C4+C7+C8).

use crate::recorder::{self, DeviceObservation};
use crate::AppState;
use axum::body::Body;
use axum::extract::{Path as AxPath, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use ota_error::OtaError;
use ota_manifest::{compose_manifest, encode_multipart_mixed, parse_device_context};
use std::collections::HashMap;
use std::sync::Arc;

/// `GET /api/manifest` — device context comes entirely from headers/query.
pub async fn get_manifest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, OtaError> {
    serve_manifest(state, headers, query, None, None).await
}

/// `GET /api/manifest/<app>/<channel>` — the application id and release
/// channel come from the path unless overridden by a header or query
/// parameter (§4.4 precedence).
pub async fn get_manifest_path(
    State(state): State<Arc<AppState>>,
    AxPath((app, channel)): AxPath<(String, String)>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, OtaError> {
    serve_manifest(state, headers, query, Some(app), Some(channel)).await
}

async fn serve_manifest(
    state: Arc<AppState>,
    headers: HeaderMap,
    query: HashMap<String, String>,
    path_app: Option<String>,
    path_channel: Option<String>,
) -> Result<Response, OtaError> {
    let lower_headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_ascii_lowercase(), v.to_string())))
        .collect();

    let ctx = parse_device_context(
        &lower_headers,
        &query,
        path_app.as_deref(),
        path_channel.as_deref(),
    )?;

    let application = ota_db::applications::get_application(&state.pool, &ctx.application_id)
        .await?
        .ok_or_else(|| OtaError::application_not_found(&ctx.application_id))?;

    let upload = ota_db::uploads::find_servable_upload(
        &state.pool,
        &application.id,
        &ctx.runtime_version,
        &ctx.release_channel,
        ctx.platform,
    )
    .await?
    .ok_or_else(|| {
        OtaError::upload_not_found(format!(
            "{}/{}/{}/{}",
            application.id, ctx.runtime_version, ctx.release_channel, ctx.platform
        ))
    })?;

    if let Some(client_id) = ctx.client_id.clone() {
        recorder::enqueue(
            state.pool.clone(),
            DeviceObservation {
                device_id: client_id,
                application_id: application.id.clone(),
                runtime_version: ctx.runtime_version.clone(),
                platform: ctx.platform,
                release_channel: ctx.release_channel.clone(),
                embedded_update_id: ctx.embedded_update_id.as_deref().and_then(|s| s.parse().ok()),
                current_update_id: ctx.current_update_id.as_deref().and_then(|s| s.parse().ok()),
            },
        );
    }

    let composed = compose_manifest(&upload, &application, &ctx, &state.config.base_url)?;
    let encoded = encode_multipart_mixed(&composed, &ctx.protocol_version);

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, encoded.content_type)
        .header("expo-protocol-version", encoded.protocol_version)
        .header("expo-sfv-version", encoded.sfv_version)
        .header(header::CACHE_CONTROL, "private, max-age=0");
    if let Some(sig) = &encoded.expo_signature {
        builder = builder.header("expo-signature", sig);
    }

    Ok(builder
        .body(Body::from(encoded.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}
