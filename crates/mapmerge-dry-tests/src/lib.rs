// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for mapmerge crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`scene`] - Brush, patch, entity and scene builders

pub mod config;
pub mod scene;

pub use config::InMemoryConfigStore;
pub use scene::{cube_brush, light, named, patch_grid, worldspawn, SceneBuilder};
