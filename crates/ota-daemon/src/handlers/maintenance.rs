// SPDX-License-Identifier: MIT OR Apache-2.0
//! `/utils/gc-candidates` — read-only reconciliation between the metadata
//! store and the object store (§4.2 supplement).
//!
//! This never deletes anything. It reports object-store keys under an
//! application's `updates/` prefix that no upload row references any more
//! (orphaned by a failed or partial cleanup elsewhere), so an operator can
//! decide what to reclaim by hand.

use crate::AppState;
use axum::Json;
use axum::extract::{Query, State};
use ota_error::{ErrorCode, OtaError};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Response body for `GET /utils/gc-candidates`.
#[derive(Debug, Serialize)]
pub struct GcCandidatesResponse {
    /// Application the scan was run against.
    pub application_id: String,
    /// Object-store prefixes under `updates/<application_id>/` with no
    /// surviving upload row.
    pub candidates: Vec<String>,
}

/// `GET /utils/gc-candidates?application=<id>` — bearer-gated alongside the
/// rest of the dashboard routes (§4.2).
pub async fn get_gc_candidates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<GcCandidatesResponse>, OtaError> {
    let application_id = query
        .get("application")
        .ok_or_else(|| OtaError::new(ErrorCode::MissingField, "missing required query param 'application'"))?;

    let live_prefixes: BTreeSet<String> =
        ota_db::uploads::list_blob_prefixes(&state.pool, application_id)
            .await?
            .into_iter()
            .collect();

    let candidates = state
        .store
        .gc_candidates(application_id, &live_prefixes)
        .await
        .map_err(|e| {
            OtaError::new(ErrorCode::ObjectStoreUnavailable, "failed to scan object store for gc candidates")
                .with_source(e)
        })?;

    Ok(Json(GcCandidatesResponse {
        application_id: application_id.clone(),
        candidates,
    }))
}
