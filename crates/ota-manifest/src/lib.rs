// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod compose;
pub mod request;
pub mod wire;

pub use compose::{ComposedManifest, compose_manifest};
pub use request::{DeviceContext, parse_device_context};
pub use wire::{EncodedManifestResponse, encode_multipart_mixed};
