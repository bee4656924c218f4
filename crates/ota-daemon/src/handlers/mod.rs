// SPDX-License-Identifier: MIT OR Apache-2.0
//! One module per route group.

pub mod apps;
pub mod assets;
pub mod health;
pub mod maintenance;
pub mod manifest;
pub mod upload;
pub mod uploads;
pub mod utils;
