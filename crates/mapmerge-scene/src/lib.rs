// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scene model consumed by the mapmerge engine.
//!
//! A level is a flat list of entities under one root. Each entity owns a map of
//! key/value attributes ("spawnargs") and an ordered list of primitives
//! (brushes and patches). This crate holds the data and nothing else: the
//! diff/merge logic lives in mapmerge-core and file parsing is left to hosts.
//!
//! # Design Principles
//!
//! - **Primitives are opaque**: The engine never recomputes geometry. It only
//!   compares canonicalized values and moves whole primitives around.
//! - **Deterministic iteration**: Attributes iterate in key order, entities
//!   and primitives in stored order.
//! - **Validate once**: [`SceneRoot::validate`] rejects malformed trees before
//!   any comparison starts.

use thiserror::Error;

mod canon;
mod entity;
mod highlight;
mod types;

pub use canon::{canonicalize_f64, Canonical};
pub use entity::{Entity, SceneRoot, CLASSNAME_KEY};
pub use highlight::{Highlight, HighlightState};
pub use types::{Brush, Face, Patch, PatchControl, Plane, Primitive, PrimitiveKind, TextureMatrix};

/// Error type for malformed scene trees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// A plane, texture matrix, or control point holds NaN or infinity.
    #[error("entity #{entity} primitive #{primitive}: non-finite {component}")]
    NonFiniteValue {
        /// Index of the entity in traversal order.
        entity: usize,
        /// Index of the primitive within the entity.
        primitive: usize,
        /// Which component carried the bad value.
        component: &'static str,
    },
    /// A patch does not hold `width * height` control points.
    #[error("entity #{entity} primitive #{primitive}: patch grid expects {expected} control points, found {actual}")]
    PatchGridMismatch {
        /// Index of the entity in traversal order.
        entity: usize,
        /// Index of the primitive within the entity.
        primitive: usize,
        /// `width * height`.
        expected: usize,
        /// Stored control point count.
        actual: usize,
    },
    /// The identity attribute is present but empty.
    #[error("entity #{entity}: identity attribute {key:?} is empty")]
    EmptyIdentity {
        /// Index of the entity in traversal order.
        entity: usize,
        /// The identity attribute name.
        key: String,
    },
}
