// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! mapmerge core: compare two versions of a level and merge one into the other.
//!
//! The pipeline is
//!
//! ```text
//! GraphComparer::compare(source, base) -> ComparisonResult
//!     -> MergeOperation::create_from_comparison_result -> [MergeAction]
//!     -> MergeActionNode per action (preview)
//!     -> MergeOperation::apply_actions(base)   (commit)  | drop (abort)
//! ```
//!
//! Comparison is pure and read-only over both scenes. Applying mutates the base
//! scene action by action; the first failing action stops the pass and is
//! reported with its index. Rolling back the actions that did run is the
//! host's job ([`MapSession`] does it with a snapshot transaction).

use mapmerge_scene::SceneError;
use thiserror::Error;

mod action;
mod action_node;
mod comparer;
mod comparison;
mod fingerprint;
mod identity;
mod operation;
mod session;
mod settings;

pub use action::{ActionType, MergeAction};
pub use action_node::{MergeActionNode, MergePreview};
pub use comparer::GraphComparer;
pub use comparison::{
    ComparisonResult, ComparisonSummary, DifferenceKind, EntityDifference, KeyValueChange,
    KeyValueDifference, PrimitiveChange, PrimitiveDifference,
};
pub use fingerprint::{fingerprint, Fingerprint, Fingerprinter};
pub use identity::EntityKey;
pub use operation::{ActionId, ApplyReport, MergeOperation};
pub use session::{
    abort_merge, finish_merge, start_merge, EditMode, MapSession, SessionError, MERGE_UNDO_NAME,
};
pub use settings::{MergeSettings, DEFAULT_SIGNIFICANT_DIGITS};

/// Which input scene a construction error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneSide {
    /// The scene whose changes are merged in.
    Source,
    /// The scene being changed.
    Base,
}

impl core::fmt::Display for SceneSide {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Base => f.write_str("base"),
        }
    }
}

/// Error type for comparison and merge application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// One of the input scenes is malformed; nothing was compared.
    #[error("malformed {side} scene: {source}")]
    MalformedScene {
        /// Offending scene.
        side: SceneSide,
        /// What is wrong with it.
        source: SceneError,
    },
    /// Settings outside the accepted range.
    #[error("invalid merge settings: {0}")]
    InvalidSettings(String),
    /// The base scene no longer has the shape the action was built against.
    #[error("structural conflict on {entity}: {detail}")]
    StructuralConflict {
        /// Entity the action targets.
        entity: EntityKey,
        /// What did not line up.
        detail: String,
    },
    /// An entity, attribute, or primitive the action needs is gone.
    #[error("{entity}: {what} not found")]
    NotFound {
        /// Entity the action targets.
        entity: EntityKey,
        /// The missing thing.
        what: String,
    },
    /// An action failed while applying an operation; earlier actions stay applied.
    #[error("merge action #{index} ({description}) failed: {cause}")]
    ActionFailed {
        /// Position of the action in the operation.
        index: usize,
        /// One-line description of the action.
        description: String,
        /// Underlying failure.
        #[source]
        cause: Box<MergeError>,
    },
}

impl MergeError {
    /// True for errors raised before any comparison happened.
    pub const fn is_construction(&self) -> bool {
        matches!(self, Self::MalformedScene { .. } | Self::InvalidSettings(_))
    }

    /// Innermost cause (unwraps `ActionFailed`).
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::ActionFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}
