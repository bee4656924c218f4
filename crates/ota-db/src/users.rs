// SPDX-License-Identifier: MIT OR Apache-2.0
//! Queries over the `users` table, which backs the dashboard auth module
//! only (§6: "not further specified"). No user-management API is built.

use crate::map_sqlx_err;
use ota_core::hash::sha256_b64url;
use ota_error::OtaError;
use sqlx::PgPool;
use uuid::Uuid;

/// Check whether `bearer_token` (the raw token presented by a dashboard
/// caller) matches a known user, and return that user's id if so.
///
/// The presented token is hashed before comparison; plaintext tokens are
/// never stored.
pub async fn verify_bearer_token(
    pool: &PgPool,
    bearer_token: &str,
) -> Result<Option<Uuid>, OtaError> {
    let hash = sha256_b64url(bearer_token.as_bytes());
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE bearer_token_hash = $1")
            .bind(hash)
            .fetch_optional(pool)
            .await
            .map_err(|e| map_sqlx_err("verify_bearer_token failed", e))?;
    Ok(row.map(|(id,)| id))
}

/// Ensure the bootstrap admin user exists, creating it from the configured
/// admin password and bearer token on first startup. A no-op if a user
/// with `username` already exists.
pub async fn ensure_admin_user(
    pool: &PgPool,
    username: &str,
    password_hash: &str,
    bearer_token: &str,
) -> Result<(), OtaError> {
    let bearer_token_hash = sha256_b64url(bearer_token.as_bytes());
    sqlx::query(
        "INSERT INTO users (username, password_hash, bearer_token_hash)
         VALUES ($1, $2, $3)
         ON CONFLICT (username) DO NOTHING",
    )
    .bind(username)
    .bind(password_hash)
    .bind(bearer_token_hash)
    .execute(pool)
    .await
    .map_err(|e| map_sqlx_err("ensure_admin_user failed", e))?;
    Ok(())
}
