// SPDX-License-Identifier: MIT OR Apache-2.0
//! Device request parsing (C4, §4.4).
//!
//! Extraction is framework-agnostic: callers hand in plain header/query
//! lookup maps (already lowercased on the header side) plus whatever path
//! segments their router extracted, and this module applies the field
//! table's precedence — header, then query string, then path segment.

use ota_core::Platform;
use ota_error::{ErrorCode, OtaError};
use std::collections::HashMap;

/// The parsed coordinate and protocol options for one device manifest
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceContext {
    /// Canonical-cased application id, as the caller resolved it.
    pub application_id: String,
    /// Device platform; always `ios` or `android` (never `all`).
    pub platform: Platform,
    /// Opaque runtime-version string.
    pub runtime_version: String,
    /// Opaque release-channel string.
    pub release_channel: String,
    /// `x-app-protocol-version`, defaulting to `"0"`.
    pub protocol_version: String,
    /// `x-app-expect-signature`, defaulting to `false`.
    pub expect_signature: bool,
    /// `x-eas-client-id`, if present.
    pub client_id: Option<String>,
    /// Update id embedded in the running client binary, if reported.
    pub embedded_update_id: Option<String>,
    /// Update id the client last reported running, if reported.
    pub current_update_id: Option<String>,
}

/// Look up `field` in `headers` then `query`, falling back to `path` last.
/// Returns `None` only when none of the three sources has a non-empty
/// value.
fn resolve<'a>(
    headers: &'a HashMap<String, String>,
    header_name: &str,
    query: &'a HashMap<String, String>,
    query_name: &str,
    path: Option<&'a str>,
) -> Option<&'a str> {
    headers
        .get(header_name)
        .map(String::as_str)
        .or_else(|| query.get(query_name).map(String::as_str))
        .or(path)
        .filter(|s| !s.is_empty())
}

/// Parse a device manifest request's context (§4.4).
///
/// `headers` must have lowercase keys (as `HeaderMap::get` is
/// case-insensitive but this module takes a plain map so it stays
/// independent of any HTTP framework). `path_app`/`path_channel` are the
/// router-extracted path segments for the `/api/manifest/<app>/<channel>`
/// route form, or `None` for the header/query-only form.
pub fn parse_device_context(
    headers: &HashMap<String, String>,
    query: &HashMap<String, String>,
    path_app: Option<&str>,
    path_channel: Option<&str>,
) -> Result<DeviceContext, OtaError> {
    let application_id = resolve(headers, "x-app-project", query, "project", path_app)
        .ok_or_else(|| missing_field("project"))?
        .to_string();

    let platform_str = resolve(headers, "x-app-platform", query, "platform", None)
        .ok_or_else(|| missing_field("platform"))?;
    let platform: Platform = platform_str
        .parse()
        .ok()
        .filter(Platform::is_device_platform)
        .ok_or_else(|| {
            OtaError::new(ErrorCode::InvalidPlatform, "platform must be 'ios' or 'android'")
                .with_context("platform", platform_str)
        })?;

    let runtime_version = resolve(headers, "x-app-runtime-version", query, "version", None)
        .ok_or_else(|| missing_field("version"))?
        .to_string();

    let release_channel = resolve(headers, "x-app-channel-name", query, "channel", path_channel)
        .ok_or_else(|| missing_field("channel"))?
        .to_string();

    let protocol_version = headers
        .get("x-app-protocol-version")
        .cloned()
        .unwrap_or_else(|| "0".to_string());

    let expect_signature = headers
        .get("x-app-expect-signature")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);

    let client_id = headers.get("x-eas-client-id").cloned();
    let embedded_update_id = headers.get("x-app-embedded-update-id").cloned();
    let current_update_id = headers.get("x-app-current-update-id").cloned();

    Ok(DeviceContext {
        application_id,
        platform,
        runtime_version,
        release_channel,
        protocol_version,
        expect_signature,
        client_id,
        embedded_update_id,
        current_update_id,
    })
}

fn missing_field(field: &'static str) -> OtaError {
    OtaError::new(ErrorCode::MissingField, format!("missing required field '{field}'"))
        .with_context("field", field)
}
