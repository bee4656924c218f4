// SPDX-License-Identifier: MIT OR Apache-2.0
//! Multipart/mixed wire encoder (C8, §4.8).
//!
//! Produces the exact body shape the Expo Updates client parser expects: a
//! fresh boundary token per response, CRLF part separators, and the
//! `manifest`/`extensions` part pair.

use crate::compose::ComposedManifest;
use uuid::Uuid;

/// `expo-sfv-version` is fixed at `0` for every response this server
/// produces; there is no negotiation.
pub const EXPO_SFV_VERSION: &str = "0";

/// A fully encoded `multipart/mixed` manifest response, ready to hand to
/// whatever HTTP framework builds the outer response.
#[derive(Debug, Clone)]
pub struct EncodedManifestResponse {
    /// `Content-Type` header value, including the boundary token.
    pub content_type: String,
    /// Full response body.
    pub body: Vec<u8>,
    /// `expo-protocol-version` header value.
    pub protocol_version: String,
    /// `expo-sfv-version` header value; always [`EXPO_SFV_VERSION`].
    pub sfv_version: &'static str,
    /// Top-level `expo-signature` header value, mirroring the manifest
    /// part's own signature header, present only when signed.
    pub expo_signature: Option<String>,
}

/// Encode `manifest` as a two-part `multipart/mixed` body with a fresh
/// boundary token.
pub fn encode_multipart_mixed(manifest: &ComposedManifest, protocol_version: &str) -> EncodedManifestResponse {
    let boundary = format!("boundary-{}", Uuid::new_v4());
    let body = build_body(&boundary, manifest);

    EncodedManifestResponse {
        content_type: format!("multipart/mixed; boundary={boundary}"),
        body,
        protocol_version: protocol_version.to_string(),
        sfv_version: EXPO_SFV_VERSION,
        expo_signature: manifest.signature_header.clone(),
    }
}

fn build_body(boundary: &str, manifest: &ComposedManifest) -> Vec<u8> {
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=utf-8\r\n");
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"manifest\"\r\n");
    if let Some(sig) = &manifest.signature_header {
        body.extend_from_slice(format!("expo-signature: {sig}\r\n").as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(&manifest.manifest_bytes);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json\r\n");
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"extensions\"\r\n");
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(br#"{"assetRequestHeaders":{}}"#);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}
