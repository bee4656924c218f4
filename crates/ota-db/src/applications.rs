// SPDX-License-Identifier: MIT OR Apache-2.0
//! Queries over the `applications` table.

use crate::map_sqlx_err;
use chrono::{DateTime, Utc};
use ota_core::Application;
use ota_error::OtaError;
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: String,
    display_name: String,
    private_key_pem: Option<String>,
    public_key_pem: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ApplicationRow> for Application {
    fn from(row: ApplicationRow) -> Self {
        Application {
            id: row.id,
            display_name: row.display_name,
            private_key_pem: row.private_key_pem,
            public_key_pem: row.public_key_pem,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, display_name, private_key_pem, public_key_pem, created_at, updated_at";

/// Resolve an application by id, case-insensitively. Returns the row with
/// its originally stored case.
pub async fn get_application(pool: &PgPool, id: &str) -> Result<Option<Application>, OtaError> {
    let row = sqlx::query_as::<_, ApplicationRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM applications WHERE lower(id) = lower($1)"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| map_sqlx_err("get_application failed", e))?;
    Ok(row.map(Into::into))
}

/// List every application, most recently created first (dashboard listing).
pub async fn list_applications(pool: &PgPool) -> Result<Vec<Application>, OtaError> {
    let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM applications ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| map_sqlx_err("list_applications failed", e))?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Insert a new application with the given id and display name.
pub async fn insert_application(
    pool: &PgPool,
    id: &str,
    display_name: &str,
) -> Result<Application, OtaError> {
    let row = sqlx::query_as::<_, ApplicationRow>(&format!(
        "INSERT INTO applications (id, display_name) VALUES ($1, $2)
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(id)
    .bind(display_name)
    .fetch_one(pool)
    .await
    .map_err(|e| map_sqlx_err("insert_application failed", e))?;
    Ok(row.into())
}

/// Update an application's display name and/or signing key pair.
pub async fn update_application(
    pool: &PgPool,
    id: &str,
    display_name: Option<&str>,
    private_key_pem: Option<&str>,
    public_key_pem: Option<&str>,
) -> Result<Option<Application>, OtaError> {
    let row = sqlx::query_as::<_, ApplicationRow>(&format!(
        "UPDATE applications SET
            display_name = COALESCE($2, display_name),
            private_key_pem = COALESCE($3, private_key_pem),
            public_key_pem = COALESCE($4, public_key_pem),
            updated_at = now()
         WHERE lower(id) = lower($1)
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(id)
    .bind(display_name)
    .bind(private_key_pem)
    .bind(public_key_pem)
    .fetch_optional(pool)
    .await
    .map_err(|e| map_sqlx_err("update_application failed", e))?;
    Ok(row.map(Into::into))
}

/// Delete an application and cascade to its uploads and devices.
///
/// Returns `true` if a row was deleted. The object-store keys under the
/// application's uploads are not removed here — the caller (`ota-daemon`)
/// must delete those separately, since this store has no visibility into
/// the object store.
pub async fn delete_application_cascade(pool: &PgPool, id: &str) -> Result<bool, OtaError> {
    let result = sqlx::query("DELETE FROM applications WHERE lower(id) = lower($1)")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_err("delete_application_cascade failed", e))?;
    Ok(result.rows_affected() > 0)
}
