// SPDX-License-Identifier: MIT OR Apache-2.0
//! `GET /api/assets` (§4.9).

use crate::AppState;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use ota_error::{ErrorCode, OtaError};
use ota_store::is_servable_asset_key;
use std::collections::HashMap;
use std::sync::Arc;

pub async fn get_asset(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, OtaError> {
    let key = query
        .get("asset")
        .ok_or_else(|| OtaError::new(ErrorCode::MissingField, "missing required field 'asset'"))?;

    if !is_servable_asset_key(key) {
        return Err(OtaError::new(ErrorCode::AssetPathForbidden, "asset key is not servable")
            .with_context("key", key));
    }

    let object = state.store.get(key).await.map_err(|e| match e {
        ota_store::StoreError::NotFound { .. } => {
            OtaError::new(ErrorCode::AssetNotFound, "asset not found").with_context("key", key)
        }
        other => OtaError::new(ErrorCode::ObjectStoreUnavailable, "failed to read asset")
            .with_context("key", key)
            .with_source(other),
    })?;

    let content_type = query
        .get("contentType")
        .cloned()
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(Body::from(object.bytes))
        .unwrap())
}
