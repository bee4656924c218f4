// SPDX-License-Identifier: MIT OR Apache-2.0
//! Queries over the `uploads` table (§4.3, §4.6).

use crate::map_sqlx_err;
use chrono::{DateTime, Utc};
use ota_core::{Platform, Upload, UploadStatus};
use ota_error::{ErrorCode, OtaError};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct UploadRow {
    id: Uuid,
    application_id: String,
    runtime_version: String,
    release_channel: String,
    platform: String,
    status: String,
    blob_prefix: String,
    metadata_json: Vec<u8>,
    app_config_json: Vec<u8>,
    assets_manifest_json: Vec<u8>,
    signed_manifest_json: Option<Vec<u8>>,
    manifest_signature: Option<Vec<u8>>,
    git_branch: Option<String>,
    git_commit: Option<String>,
    size_bytes: i64,
    created_at: DateTime<Utc>,
    released_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UploadRow> for Upload {
    type Error = OtaError;

    fn try_from(row: UploadRow) -> Result<Self, Self::Error> {
        let platform: Platform = row.platform.parse().map_err(|_| {
            OtaError::new(ErrorCode::Internal, "upload row has unrecognised platform")
                .with_context("upload_id", row.id.to_string())
                .with_context("platform", row.platform.clone())
        })?;
        let status = match row.status.as_str() {
            "ready" => UploadStatus::Ready,
            "released" => UploadStatus::Released,
            "obsolete" => UploadStatus::Obsolete,
            other => {
                return Err(OtaError::new(
                    ErrorCode::Internal,
                    "upload row has unrecognised status",
                )
                .with_context("upload_id", row.id.to_string())
                .with_context("status", other));
            }
        };
        Ok(Upload {
            id: row.id,
            application_id: row.application_id,
            runtime_version: row.runtime_version,
            release_channel: row.release_channel,
            platform,
            status,
            blob_prefix: row.blob_prefix,
            metadata_json: row.metadata_json,
            app_config_json: row.app_config_json,
            assets_manifest_json: row.assets_manifest_json,
            signed_manifest_json: row.signed_manifest_json,
            manifest_signature: row.manifest_signature,
            git_branch: row.git_branch,
            git_commit: row.git_commit,
            size_bytes: row.size_bytes,
            created_at: row.created_at,
            released_at: row.released_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, application_id, runtime_version, release_channel, platform, \
    status, blob_prefix, metadata_json, app_config_json, assets_manifest_json, \
    signed_manifest_json, manifest_signature, git_branch, git_commit, size_bytes, \
    created_at, released_at, updated_at";

/// List uploads for an application, most recent first, optionally filtered
/// by runtime version and/or status.
pub async fn list_uploads(
    pool: &PgPool,
    application_id: &str,
    runtime_version: Option<&str>,
    status: Option<UploadStatus>,
) -> Result<Vec<Upload>, OtaError> {
    let rows = sqlx::query_as::<_, UploadRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM uploads
         WHERE application_id = $1
           AND ($2::text IS NULL OR runtime_version = $2)
           AND ($3::text IS NULL OR status = $3)
         ORDER BY created_at DESC"
    ))
    .bind(application_id)
    .bind(runtime_version)
    .bind(status.map(|s| s.to_string()))
    .fetch_all(pool)
    .await
    .map_err(|e| map_sqlx_err("list_uploads failed", e))?;
    rows.into_iter().map(Upload::try_from).collect()
}

/// Fetch a single upload by id.
pub async fn get_upload(pool: &PgPool, id: Uuid) -> Result<Option<Upload>, OtaError> {
    let row = sqlx::query_as::<_, UploadRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM uploads WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| map_sqlx_err("get_upload failed", e))?;
    row.map(Upload::try_from).transpose()
}

/// Insert a new upload row in `ready` status. `upload.id` is the derived
/// `updateId` (§4.5 step 8; I3 requires this).
pub async fn insert_upload(pool: &PgPool, upload: &Upload) -> Result<(), OtaError> {
    sqlx::query(
        "INSERT INTO uploads (
            id, application_id, runtime_version, release_channel, platform, status,
            blob_prefix, metadata_json, app_config_json, assets_manifest_json,
            signed_manifest_json, manifest_signature, git_branch, git_commit, size_bytes
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
    )
    .bind(upload.id)
    .bind(&upload.application_id)
    .bind(&upload.runtime_version)
    .bind(&upload.release_channel)
    .bind(upload.platform.to_string())
    .bind(upload.status.to_string())
    .bind(&upload.blob_prefix)
    .bind(&upload.metadata_json)
    .bind(&upload.app_config_json)
    .bind(&upload.assets_manifest_json)
    .bind(&upload.signed_manifest_json)
    .bind(&upload.manifest_signature)
    .bind(&upload.git_branch)
    .bind(&upload.git_commit)
    .bind(upload.size_bytes)
    .execute(pool)
    .await
    .map_err(|e| map_sqlx_err("insert_upload failed", e))?;
    Ok(())
}

/// Atomically set `id`'s status, optionally stamping `released_at = now()`.
pub async fn update_upload_status(
    pool: &PgPool,
    id: Uuid,
    status: UploadStatus,
    set_released_at: bool,
) -> Result<(), OtaError> {
    if set_released_at {
        sqlx::query(
            "UPDATE uploads SET status = $2, released_at = now(), updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(status.to_string())
        .execute(pool)
        .await
    } else {
        sqlx::query("UPDATE uploads SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status.to_string())
            .execute(pool)
            .await
    }
    .map_err(|e| map_sqlx_err("update_upload_status failed", e))?;
    Ok(())
}

/// Same as [`update_upload_status`] but inside an existing transaction, for
/// use by the release/rollback state machine (§4.6).
pub async fn update_upload_status_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: UploadStatus,
    set_released_at: bool,
) -> Result<(), OtaError> {
    if set_released_at {
        sqlx::query(
            "UPDATE uploads SET status = $2, released_at = now(), updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(status.to_string())
        .execute(&mut **tx)
        .await
    } else {
        sqlx::query("UPDATE uploads SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status.to_string())
            .execute(&mut **tx)
            .await
    }
    .map_err(|e| map_sqlx_err("update_upload_status_tx failed", e))?;
    Ok(())
}

/// The hot read path (§4.3): the unique `released` row for the exact
/// coordinate, preferring an exact-platform match over `platform = all`,
/// tie-broken by the most recent `released_at`.
pub async fn find_servable_upload(
    pool: &PgPool,
    application_id: &str,
    runtime_version: &str,
    release_channel: &str,
    platform: Platform,
) -> Result<Option<Upload>, OtaError> {
    let row = sqlx::query_as::<_, UploadRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM uploads
         WHERE application_id = $1
           AND runtime_version = $2
           AND release_channel = $3
           AND status = 'released'
           AND platform IN ($4, 'all')
         ORDER BY (platform = $4) DESC, released_at DESC
         LIMIT 1"
    ))
    .bind(application_id)
    .bind(runtime_version)
    .bind(release_channel)
    .bind(platform.to_string())
    .fetch_optional(pool)
    .await
    .map_err(|e| map_sqlx_err("find_servable_upload failed", e))?;
    row.map(Upload::try_from).transpose()
}

/// Demote every `released` sibling of `except_id` at the same
/// `(application_id, runtime_version, release_channel)` coordinate to
/// `obsolete`. Not conditioned on `platform` (§9 Open Question — preserved
/// as stated: a narrower release obsoletes a broader one).
pub async fn bulk_mark_obsolete(
    tx: &mut Transaction<'_, Postgres>,
    application_id: &str,
    runtime_version: &str,
    release_channel: &str,
    except_id: Uuid,
) -> Result<(), OtaError> {
    sqlx::query(
        "UPDATE uploads SET status = 'obsolete', updated_at = now()
         WHERE application_id = $1
           AND runtime_version = $2
           AND release_channel = $3
           AND status = 'released'
           AND id != $4",
    )
    .bind(application_id)
    .bind(runtime_version)
    .bind(release_channel)
    .bind(except_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_err("bulk_mark_obsolete failed", e))?;
    Ok(())
}

/// Fetch a single upload by id within an existing transaction, for the
/// release/rollback preconditions (§4.6).
pub async fn get_upload_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Upload>, OtaError> {
    let row = sqlx::query_as::<_, UploadRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM uploads WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_err("get_upload_tx failed", e))?;
    row.map(Upload::try_from).transpose()
}

/// Delete an upload row. The object-store keys under its `blob_prefix` are
/// not removed here; the caller deletes those separately.
pub async fn delete_upload(pool: &PgPool, id: Uuid) -> Result<bool, OtaError> {
    let result = sqlx::query("DELETE FROM uploads WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_err("delete_upload failed", e))?;
    Ok(result.rows_affected() > 0)
}

/// Every `blob_prefix` still referenced by an upload row for `application_id`,
/// regardless of status. Feeds `ota_store::BlobStore::gc_candidates` — a
/// prefix not in this set has no surviving row and is safe to report as
/// reclaimable.
pub async fn list_blob_prefixes(pool: &PgPool, application_id: &str) -> Result<Vec<String>, OtaError> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT blob_prefix FROM uploads WHERE application_id = $1")
        .bind(application_id)
        .fetch_all(pool)
        .await
        .map_err(|e| map_sqlx_err("list_blob_prefixes failed", e))?;
    Ok(rows.into_iter().map(|(p,)| p).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_row_rejects_unrecognised_platform() {
        let row = UploadRow {
            id: Uuid::nil(),
            application_id: "app".into(),
            runtime_version: "1.0.0".into(),
            release_channel: "production".into(),
            platform: "windows".into(),
            status: "ready".into(),
            blob_prefix: "updates/app/1.0.0/id".into(),
            metadata_json: vec![],
            app_config_json: vec![],
            assets_manifest_json: vec![],
            signed_manifest_json: None,
            manifest_signature: None,
            git_branch: None,
            git_commit: None,
            size_bytes: 0,
            created_at: Utc::now(),
            released_at: None,
            updated_at: Utc::now(),
        };
        let err = Upload::try_from(row).unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
    }

    #[test]
    fn upload_row_converts_known_platform_and_status() {
        let row = UploadRow {
            id: Uuid::nil(),
            application_id: "app".into(),
            runtime_version: "1.0.0".into(),
            release_channel: "production".into(),
            platform: "ios".into(),
            status: "released".into(),
            blob_prefix: "updates/app/1.0.0/id".into(),
            metadata_json: vec![],
            app_config_json: vec![],
            assets_manifest_json: vec![],
            signed_manifest_json: None,
            manifest_signature: None,
            git_branch: None,
            git_commit: None,
            size_bytes: 0,
            created_at: Utc::now(),
            released_at: Some(Utc::now()),
            updated_at: Utc::now(),
        };
        let upload = Upload::try_from(row).unwrap();
        assert_eq!(upload.platform, Platform::Ios);
        assert_eq!(upload.status, UploadStatus::Released);
    }
}
