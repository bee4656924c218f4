// SPDX-License-Identifier: MIT OR Apache-2.0
//! The device-record upsert (C9, §4.10).
//!
//! Spawned as a detached `tokio::spawn` from the manifest handler so a
//! cancelled device request cannot cancel the upsert, and so the upsert
//! never participates in the manifest read's own transaction (§5: "C9's
//! upsert must not participate in any serving transaction").

use ota_core::Platform;
use ota_db::PgPool;
use tracing::warn;
use uuid::Uuid;

/// The observed coordinate for one manifest request, owned so it can move
/// into the spawned task independent of the request's lifetime.
pub struct DeviceObservation {
    /// Client-supplied opaque identifier (`x-eas-client-id`).
    pub device_id: String,
    /// Owning application.
    pub application_id: String,
    /// Runtime version reported in the request.
    pub runtime_version: String,
    /// Platform reported in the request.
    pub platform: Platform,
    /// Release channel reported in the request.
    pub release_channel: String,
    /// Update id embedded in the running client binary, if reported.
    pub embedded_update_id: Option<Uuid>,
    /// Update id the client last reported running, if reported.
    pub current_update_id: Option<Uuid>,
}

/// Enqueue the upsert without waiting for it. A failure here is logged and
/// otherwise invisible to the caller; no invariant in the system depends on
/// this table (§3).
pub fn enqueue(pool: PgPool, observation: DeviceObservation) {
    tokio::spawn(async move {
        let obs = ota_db::devices::DeviceObservation {
            device_id: &observation.device_id,
            application_id: &observation.application_id,
            runtime_version: &observation.runtime_version,
            platform: observation.platform,
            release_channel: &observation.release_channel,
            embedded_update_id: observation.embedded_update_id,
            current_update_id: observation.current_update_id,
        };
        if let Err(err) = ota_db::devices::upsert_device(&pool, &obs).await {
            warn!(error = %err, device_id = %observation.device_id, "device record upsert failed");
        }
    });
}
