// SPDX-License-Identifier: MIT OR Apache-2.0
//! `GET /health`.

use axum::Json;
use axum::response::IntoResponse;
use serde_json::json;

pub async fn get_health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "protocolVersion": ota_core::EXPO_PROTOCOL_VERSION,
    }))
}
