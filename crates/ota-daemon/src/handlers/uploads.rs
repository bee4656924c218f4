// SPDX-License-Identifier: MIT OR Apache-2.0
//! `/uploads`, `/uploads/<id>` — dashboard CRUD over the `uploads` table
//! (§6).
//!
//! An upload is an immutable artifact revision (§3 Glossary); the only
//! thing dashboard `PATCH` is permitted to mutate is lifecycle status, and
//! only by delegating to the release state machine (`ota-release`) so I1
//! is never at risk of a direct, unguarded row update. Arbitrary field
//! edits (metadata, blob prefix, etc.) are not exposed — republishing is
//! the supported path for a changed artifact.

use crate::AppState;
use axum::Json;
use axum::extract::{Path as AxPath, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use ota_core::UploadStatus;
use ota_error::{ErrorCode, OtaError};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// `GET /uploads?application=<id>&runtimeVersion=<v>&status=<s>` — listing
/// is always scoped to one application (§3: the composite index this query
/// relies on is keyed by `application_id` first).
pub async fn list_uploads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, OtaError> {
    let application_id = query
        .get("application")
        .ok_or_else(|| OtaError::new(ErrorCode::MissingField, "missing required query param 'application'"))?;

    let status = query
        .get("status")
        .map(|s| s.parse::<UploadStatus>())
        .transpose()
        .map_err(|_| OtaError::new(ErrorCode::InvalidJson, "status must be ready, released, or obsolete"))?;

    let uploads = ota_db::uploads::list_uploads(
        &state.pool,
        application_id,
        query.get("runtimeVersion").map(String::as_str),
        status,
    )
    .await?;
    Ok(Json(uploads))
}

/// `GET /uploads/<id>`.
pub async fn get_upload(
    State(state): State<Arc<AppState>>,
    AxPath(id): AxPath<Uuid>,
) -> Result<impl IntoResponse, OtaError> {
    let upload = ota_db::uploads::get_upload(&state.pool, id)
        .await?
        .ok_or_else(|| OtaError::upload_not_found(id))?;
    Ok(Json(upload))
}

/// `PATCH /uploads/<id>` body. `obsolete` is never a client-requested
/// target: it only ever happens as the side effect of some other row at the
/// same coordinate being released (§4.6). The only status a caller can ask
/// for here is `released`; which underlying state-machine entry point runs
/// depends on the target's *current* status, exactly as `ota-release`
/// itself distinguishes `release` (prior status `ready`) from `rollback`
/// (prior status `obsolete`).
#[derive(Debug, Deserialize)]
pub struct UpdateUploadRequest {
    /// Requested next status; only `released` is accepted.
    pub status: UploadStatus,
}

/// `PATCH /uploads/<id>`.
pub async fn update_upload(
    State(state): State<Arc<AppState>>,
    AxPath(id): AxPath<Uuid>,
    Json(req): Json<UpdateUploadRequest>,
) -> Result<impl IntoResponse, OtaError> {
    if req.status != UploadStatus::Released {
        return Err(OtaError::new(
            ErrorCode::InvalidJson,
            "the only status a client may request here is 'released'; 'obsolete' only ever \
             results from another upload at the same coordinate being released",
        ));
    }

    let current = ota_db::uploads::get_upload(&state.pool, id)
        .await?
        .ok_or_else(|| OtaError::upload_not_found(id))?;

    let upload = match current.status {
        UploadStatus::Obsolete => ota_release::rollback(&state.pool, id).await?,
        _ => ota_release::release(&state.pool, id).await?,
    };
    Ok(Json(upload))
}

/// `DELETE /uploads/<id>` — delete the row, then sweep its object-store
/// prefix. No invariant requires an upload to exist before it can be
/// deleted from any status; a `released` row is simply removed from
/// service along with its bytes.
pub async fn delete_upload(
    State(state): State<Arc<AppState>>,
    AxPath(id): AxPath<Uuid>,
) -> Result<impl IntoResponse, OtaError> {
    let upload = ota_db::uploads::get_upload(&state.pool, id)
        .await?
        .ok_or_else(|| OtaError::upload_not_found(id))?;

    let deleted = ota_db::uploads::delete_upload(&state.pool, id).await?;
    if !deleted {
        return Err(OtaError::upload_not_found(id));
    }

    if let Err(err) = state.store.delete_prefix(&upload.blob_prefix).await {
        tracing::warn!(
            error = %err,
            upload_id = %id,
            blob_prefix = %upload.blob_prefix,
            "object-store cleanup after upload delete failed; orphaned keys will surface in gc_candidates"
        );
    }

    Ok(StatusCode::NO_CONTENT)
}
