// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! mapmerge command line.
//!
//! Scenes are read from JSON snapshots (the serde form of
//! [`mapmerge_scene::SceneRoot`]). Merge settings come from the `merge` config
//! section, with `--digits` overriding the fingerprint precision.

pub mod cli;

pub use cli::{run, Cli, Command};
