// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bearer-token guard for the dashboard CRUD and release/rollback routes.

use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use ota_error::{ErrorCode, OtaError};
use std::sync::Arc;

/// Extracts `Authorization: Bearer <token>`, checks it against the stored
/// admin bearer token hash, and rejects the request otherwise. A known
/// token admits the request; the verified user id is not threaded further
/// since the dashboard has no per-user authorization model (§6: a single
/// bootstrap admin account).
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, OtaError> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| OtaError::new(ErrorCode::AuthMissing, "missing bearer token"))?;

    let user_id = ota_db::users::verify_bearer_token(&state.pool, token).await?;
    if user_id.is_none() {
        return Err(OtaError::new(ErrorCode::AuthBad, "bearer token did not match"));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_stripped() {
        let header = "Bearer abc123";
        assert_eq!(header.strip_prefix("Bearer "), Some("abc123"));
    }
}
