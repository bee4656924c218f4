// SPDX-License-Identifier: MIT OR Apache-2.0
//! `/utils/release`, `/utils/rollback` — direct drivers for the release
//! state machine (C6, §4.6), distinct from the `PATCH /uploads/<id>` path
//! so dashboard callers have a one-shot "just release this" action that
//! doesn't require knowing the target's current status.

use crate::AppState;
use axum::Json;
use axum::extract::State;
use ota_error::OtaError;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Shared body shape for both routes.
#[derive(Debug, Deserialize)]
pub struct UploadIdRequest {
    /// Target upload id.
    pub upload_id: Uuid,
}

/// `POST /utils/release`.
pub async fn post_release(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadIdRequest>,
) -> Result<impl axum::response::IntoResponse, OtaError> {
    let upload = ota_release::release(&state.pool, req.upload_id).await?;
    Ok(Json(upload))
}

/// `POST /utils/rollback`.
pub async fn post_rollback(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadIdRequest>,
) -> Result<impl axum::response::IntoResponse, OtaError> {
    let upload = ota_release::rollback(&state.pool, req.upload_id).await?;
    Ok(Json(upload))
}
