// SPDX-License-Identifier: MIT OR Apache-2.0
//! Extracting the publisher-committed `id` out of a pre-signed manifest
//! document (§4.5 step 4a).
//!
//! A signed manifest, as the publisher uploads it, is a JSON object mapping
//! platform name to a JSON-encoded *string* (not a nested object) holding
//! that platform's manifest. This mirrors the shape the signature itself
//! covers: the signed bytes are the inner string, not a re-serialization of
//! it, so the outer object must carry the inner manifest as an opaque
//! string rather than a parsed value.

use serde_json::Value;

/// Platforms checked, in order, when looking for the first valid entry.
/// Order only matters when a signed manifest improbably declares both
/// platforms with different `id`s; picking a fixed order makes the choice
/// deterministic rather than dependent on JSON object iteration order.
const PLATFORM_ORDER: &[&str] = &["ios", "android"];

/// Find the first platform entry in a signed-manifest document that parses
/// as an object containing a string `id` field, and return that id.
///
/// Returns `None` if `bytes` is not a JSON object, none of its values is a
/// JSON-encoded object, or no such object carries an `id`.
pub fn extract_committed_update_id(bytes: &[u8]) -> Option<String> {
    let outer: Value = serde_json::from_slice(bytes).ok()?;
    let map = outer.as_object()?;
    for platform in PLATFORM_ORDER {
        let Some(inner_str) = map.get(*platform).and_then(Value::as_str) else {
            continue;
        };
        let Ok(inner) = serde_json::from_str::<Value>(inner_str) else {
            continue;
        };
        if let Some(id) = inner.get("id").and_then(Value::as_str) {
            return Some(id.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_ios_entry() {
        let ios_manifest = serde_json::json!({"id": "11111111-1111-1111-1111-111111111111"}).to_string();
        let outer = serde_json::json!({ "ios": ios_manifest }).to_string();
        assert_eq!(
            extract_committed_update_id(outer.as_bytes()),
            Some("11111111-1111-1111-1111-111111111111".to_string())
        );
    }

    #[test]
    fn prefers_ios_over_android_when_both_present() {
        let ios_manifest = serde_json::json!({"id": "ios-id"}).to_string();
        let android_manifest = serde_json::json!({"id": "android-id"}).to_string();
        let outer = serde_json::json!({ "ios": ios_manifest, "android": android_manifest }).to_string();
        assert_eq!(extract_committed_update_id(outer.as_bytes()), Some("ios-id".to_string()));
    }

    #[test]
    fn falls_back_to_android_when_ios_absent() {
        let android_manifest = serde_json::json!({"id": "android-id"}).to_string();
        let outer = serde_json::json!({ "android": android_manifest }).to_string();
        assert_eq!(extract_committed_update_id(outer.as_bytes()), Some("android-id".to_string()));
    }

    #[test]
    fn returns_none_for_malformed_outer_document() {
        assert!(extract_committed_update_id(b"not json").is_none());
        assert!(extract_committed_update_id(b"[1,2,3]").is_none());
    }

    #[test]
    fn returns_none_when_inner_manifest_lacks_an_id() {
        let ios_manifest = serde_json::json!({"launchAsset": {}}).to_string();
        let outer = serde_json::json!({ "ios": ios_manifest }).to_string();
        assert!(extract_committed_update_id(outer.as_bytes()).is_none());
    }
}
