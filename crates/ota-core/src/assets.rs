// SPDX-License-Identifier: MIT OR Apache-2.0
//! The server-computed assets cache (§4.5 step 7), shared between the
//! ingestion pipeline (producer) and the manifest composer (consumer).
//!
//! `Upload::assets_manifest_json` stores this type's JSON serialization
//! verbatim; the database itself treats the column as an opaque blob.

use crate::model::Platform;
use serde::{Deserialize, Serialize};

/// One addressable file within an upload: a launch bundle or a listed
/// asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    /// SHA-256/Base64URL content hash.
    pub hash: String,
    /// MD5/hex asset key, per the wire protocol's fixed key format.
    pub key: String,
    /// File extension, including the leading dot (e.g. `.bundle`, `.png`).
    pub file_extension: String,
    /// MIME content type, derived from the extension by a fixed table.
    pub content_type: String,
    /// Path relative to the upload's `blob_prefix`, as reproduced exactly
    /// from the publisher's multipart field name.
    pub relative_path: String,
}

/// The launch bundle plus every listed asset for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformAssets {
    /// The single executable bundle entry.
    pub launch_asset: AssetEntry,
    /// Every other asset the bundle references.
    pub assets: Vec<AssetEntry>,
}

/// The assets cache for an upload, indexed by platform. Only `ios` and
/// `android` ever appear (an upload declared `platform = all` may populate
/// both, since the publisher's `metadata.json` can describe either or both
/// platforms independently of the upload's own `platform` field).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetsManifest {
    /// Cache for the `ios` platform, if `metadata.json` declared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios: Option<PlatformAssets>,
    /// Cache for the `android` platform, if `metadata.json` declared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<PlatformAssets>,
}

impl AssetsManifest {
    /// The cached assets for `platform`, or `None` if this upload never
    /// declared that platform (or `platform` is [`Platform::All`], which
    /// never has its own cache entry).
    pub fn for_platform(&self, platform: Platform) -> Option<&PlatformAssets> {
        match platform {
            Platform::Ios => self.ios.as_ref(),
            Platform::Android => self.android.as_ref(),
            Platform::All => None,
        }
    }
}
