// SPDX-License-Identifier: MIT OR Apache-2.0
//! Queries over the `devices` table (C9).

use crate::map_sqlx_err;
use ota_core::Platform;
use ota_error::OtaError;
use sqlx::PgPool;
use uuid::Uuid;

/// The observed coordinate and update ids for one device, as seen by a
/// manifest request. Purely observational (§3): no invariant in the system
/// depends on this table.
pub struct DeviceObservation<'a> {
    /// Client-supplied opaque identifier (`x-eas-client-id`).
    pub device_id: &'a str,
    /// Owning application.
    pub application_id: &'a str,
    /// Runtime version reported in the request.
    pub runtime_version: &'a str,
    /// Platform reported in the request.
    pub platform: Platform,
    /// Release channel reported in the request.
    pub release_channel: &'a str,
    /// Update id embedded in the running client binary, if reported.
    pub embedded_update_id: Option<Uuid>,
    /// Update id the client last reported running, if reported.
    pub current_update_id: Option<Uuid>,
}

/// Upsert a device record: insert a new row on first contact, or update the
/// observed coordinate and bump `last_seen`/`update_count` on repeat
/// contact. `update_count` is best-effort and never treated as
/// authoritative by any read path (§9 Open Question).
pub async fn upsert_device(pool: &PgPool, obs: &DeviceObservation<'_>) -> Result<(), OtaError> {
    sqlx::query(
        "INSERT INTO devices (
            id, application_id, runtime_version, platform, release_channel,
            embedded_update_id, current_update_id, update_count
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, 1)
         ON CONFLICT (id, application_id) DO UPDATE SET
            runtime_version = EXCLUDED.runtime_version,
            platform = EXCLUDED.platform,
            release_channel = EXCLUDED.release_channel,
            embedded_update_id = EXCLUDED.embedded_update_id,
            current_update_id = EXCLUDED.current_update_id,
            last_seen = now(),
            update_count = devices.update_count + 1",
    )
    .bind(obs.device_id)
    .bind(obs.application_id)
    .bind(obs.runtime_version)
    .bind(obs.platform.to_string())
    .bind(obs.release_channel)
    .bind(obs.embedded_update_id)
    .bind(obs.current_update_id)
    .execute(pool)
    .await
    .map_err(|e| map_sqlx_err("upsert_device failed", e))?;
    Ok(())
}
