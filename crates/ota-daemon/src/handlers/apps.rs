// SPDX-License-Identifier: MIT OR Apache-2.0
//! `/apps`, `/apps/<id>` — dashboard CRUD over `applications` (§6).
//!
//! Deletion cascades to the application's uploads and devices at the
//! database layer (`ON DELETE CASCADE`, §3); the object-store keys under
//! its uploads are not visible to `ota-db`, so this handler deletes them
//! separately after the row is gone.

use crate::AppState;
use axum::Json;
use axum::extract::{Path as AxPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use ota_error::{ErrorCode, OtaError};
use serde::Deserialize;
use std::sync::Arc;

/// `POST /apps` body.
#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    /// Primary key slug. Stored with its original case; looked up
    /// case-insensitively (§3).
    pub id: String,
    /// Human-facing display name.
    pub display_name: String,
}

/// `PATCH /apps/<id>` body. Every field is optional; only `generate_keys`
/// has a meaningful default (`false`).
#[derive(Debug, Deserialize, Default)]
pub struct UpdateApplicationRequest {
    /// New display name, if changing it.
    pub display_name: Option<String>,
    /// When `true`, generates a fresh RSA key pair and installs it,
    /// replacing any existing pair. This is the only way an application
    /// acquires self-signing capability (§1: "the system generates a key
    /// pair and returns the public half").
    #[serde(default)]
    pub generate_keys: bool,
}

/// `GET /apps` — list every application, most recently created first.
pub async fn list_applications(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, OtaError> {
    let apps = ota_db::applications::list_applications(&state.pool).await?;
    Ok(Json(apps))
}

/// `POST /apps` — create a new application, with no signing key pair
/// installed by default.
pub async fn create_application(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateApplicationRequest>,
) -> Result<impl IntoResponse, OtaError> {
    if req.id.trim().is_empty() {
        return Err(OtaError::new(ErrorCode::MissingField, "id must not be empty"));
    }
    let app = ota_db::applications::insert_application(&state.pool, &req.id, &req.display_name).await?;
    Ok((StatusCode::CREATED, Json(app)))
}

/// `GET /apps/<id>` — fetch one application by case-insensitive id.
pub async fn get_application(
    State(state): State<Arc<AppState>>,
    AxPath(id): AxPath<String>,
) -> Result<impl IntoResponse, OtaError> {
    let app = ota_db::applications::get_application(&state.pool, &id)
        .await?
        .ok_or_else(|| OtaError::application_not_found(&id))?;
    Ok(Json(app))
}

/// `PATCH /apps/<id>` — update the display name and/or (re)generate the
/// signing key pair.
pub async fn update_application(
    State(state): State<Arc<AppState>>,
    AxPath(id): AxPath<String>,
    Json(req): Json<UpdateApplicationRequest>,
) -> Result<impl IntoResponse, OtaError> {
    let (private_key_pem, public_key_pem) = if req.generate_keys {
        let pair = ota_signing::generate_key_pair()?;
        (Some(pair.private_key_pem), Some(pair.public_key_pem))
    } else {
        (None, None)
    };

    let app = ota_db::applications::update_application(
        &state.pool,
        &id,
        req.display_name.as_deref(),
        private_key_pem.as_deref(),
        public_key_pem.as_deref(),
    )
    .await?
    .ok_or_else(|| OtaError::application_not_found(&id))?;
    Ok(Json(app))
}

/// `DELETE /apps/<id>` — delete the application, its uploads, and its
/// devices, then sweep the object store for every key under its uploads.
pub async fn delete_application(
    State(state): State<Arc<AppState>>,
    AxPath(id): AxPath<String>,
) -> Result<impl IntoResponse, OtaError> {
    let application = ota_db::applications::get_application(&state.pool, &id)
        .await?
        .ok_or_else(|| OtaError::application_not_found(&id))?;

    let deleted = ota_db::applications::delete_application_cascade(&state.pool, &id).await?;
    if !deleted {
        return Err(OtaError::application_not_found(&id));
    }

    if let Err(err) = state.store.delete_prefix(&ota_store::keys::app_root(&application.id)).await {
        tracing::warn!(
            error = %err,
            application_id = %application.id,
            "object-store cleanup after application delete failed; orphaned keys will surface in gc_candidates"
        );
    }

    Ok(StatusCode::NO_CONTENT)
}
