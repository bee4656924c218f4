// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parsed shape of the publisher's `metadata.json` document, just enough of
//! it to drive `assets_manifest_json` pre-computation (§4.5 step 7).

use serde::Deserialize;

/// Top-level `metadata.json` document.
#[derive(Debug, Deserialize)]
pub struct MetadataDocument {
    /// Per-platform file listing.
    #[serde(rename = "fileMetadata")]
    pub file_metadata: FileMetadataByPlatform,
}

/// The `fileMetadata` object, keyed by platform. Either key may be absent;
/// an upload's `metadata.json` can describe one platform, both, or (in
/// malformed input) neither.
#[derive(Debug, Default, Deserialize)]
pub struct FileMetadataByPlatform {
    /// iOS bundle and asset listing, if present.
    #[serde(default)]
    pub ios: Option<PlatformFileMetadata>,
    /// Android bundle and asset listing, if present.
    #[serde(default)]
    pub android: Option<PlatformFileMetadata>,
}

/// One platform's bundle path plus its listed assets.
#[derive(Debug, Deserialize)]
pub struct PlatformFileMetadata {
    /// Relative path (within the upload) of the launch bundle.
    pub bundle: String,
    /// Every other asset the bundle references.
    #[serde(default)]
    pub assets: Vec<AssetDeclaration>,
}

/// One asset entry as declared by the publisher.
#[derive(Debug, Deserialize)]
pub struct AssetDeclaration {
    /// Relative path (within the upload) of the asset file.
    pub path: String,
    /// File extension, without the leading dot (e.g. `"png"`).
    pub ext: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_platforms() {
        let raw = r#"{
            "fileMetadata": {
                "ios": { "bundle": "bundles/ios.hbc", "assets": [{"path": "assets/a", "ext": "png"}] },
                "android": { "bundle": "bundles/android.hbc", "assets": [] }
            }
        }"#;
        let doc: MetadataDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.file_metadata.ios.unwrap().bundle, "bundles/ios.hbc");
        assert_eq!(doc.file_metadata.android.unwrap().assets.len(), 0);
    }

    #[test]
    fn tolerates_a_single_platform() {
        let raw = r#"{ "fileMetadata": { "ios": { "bundle": "bundles/ios.hbc" } } }"#;
        let doc: MetadataDocument = serde_json::from_str(raw).unwrap();
        assert!(doc.file_metadata.android.is_none());
    }
}
