// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Host-side services shared by mapmerge tools (config storage, notifications).
//! The merge engine talks to these through small ports so editors and the CLI
//! can plug in their own storage and UI.

pub mod config;
pub mod notify;
