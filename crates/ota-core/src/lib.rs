// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod assets;
pub mod hash;
pub mod model;

pub use assets::{AssetEntry, AssetsManifest, PlatformAssets};
pub use model::{Application, Coordinate, DeviceRecord, Platform, Upload, UploadStatus};

/// Version of the wire protocol this server speaks, sent in every manifest
/// response via the `expo-protocol-version` header.
pub const EXPO_PROTOCOL_VERSION: u32 = 1;
