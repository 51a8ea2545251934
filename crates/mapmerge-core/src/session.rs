// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Merge lifecycle: start, preview, finish or abort.
//!
//! The free functions are the bare lifecycle. [`MapSession`] is the host side:
//! it owns the edited scene, tracks the edit mode, wraps the apply pass in a
//! snapshot transaction and reports failures through a notification queue.

use mapmerge_app_core::notify::NotificationQueue;
use mapmerge_scene::{HighlightState, SceneRoot};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::action_node::MergePreview;
use crate::comparer::GraphComparer;
use crate::comparison::ComparisonResult;
use crate::identity::EntityKey;
use crate::operation::{ActionId, ApplyReport, MergeOperation};
use crate::settings::MergeSettings;
use crate::MergeError;

/// Undo step name recorded for a committed merge.
pub const MERGE_UNDO_NAME: &str = "mergeMap";

/// Compare `source` against `base` and build the operation that merges one
/// into the other. Nothing is mutated.
///
/// # Errors
/// Construction errors from [`GraphComparer::compare`].
pub fn start_merge(
    source: &SceneRoot,
    base: &SceneRoot,
    settings: &MergeSettings,
) -> Result<(ComparisonResult, MergeOperation), MergeError> {
    let result = GraphComparer::new(settings.clone()).compare(source, base)?;
    let operation = MergeOperation::create_from_comparison_result(&result);
    Ok((result, operation))
}

/// Apply `operation` to `base` and discard it.
///
/// # Errors
/// The first failing action; earlier actions stay applied.
pub fn finish_merge(
    operation: MergeOperation,
    base: &mut SceneRoot,
) -> Result<ApplyReport, MergeError> {
    operation.apply_actions(base)
}

/// Discard `operation` without applying it.
pub fn abort_merge(operation: MergeOperation) {
    debug!(actions = operation.len(), "merge operation discarded");
    drop(operation);
}

/// Editing mode of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditMode {
    /// Regular editing.
    #[default]
    Normal,
    /// A merge is being previewed.
    Merge,
}

/// Session lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// `finish_merge`/`abort_merge` without a pending merge.
    #[error("not in merge mode")]
    NotMerging,
    /// Comparison or apply failed.
    #[error(transparent)]
    Merge(#[from] MergeError),
}

struct PendingMerge {
    result: ComparisonResult,
    operation: MergeOperation,
    preview: MergePreview,
}

struct UndoStep {
    name: &'static str,
    snapshot: SceneRoot,
}

/// One open level plus its merge state.
pub struct MapSession {
    scene: SceneRoot,
    settings: MergeSettings,
    mode: EditMode,
    pending: Option<PendingMerge>,
    undo: Vec<UndoStep>,
    notifications: NotificationQueue,
}

impl MapSession {
    /// Session editing `scene`.
    pub fn new(scene: SceneRoot, settings: MergeSettings) -> Self {
        Self {
            scene,
            settings,
            mode: EditMode::Normal,
            pending: None,
            undo: Vec::new(),
            notifications: NotificationQueue::default(),
        }
    }

    /// The edited scene.
    pub fn scene(&self) -> &SceneRoot {
        &self.scene
    }

    /// Direct edits by the host. Edits made while a merge is pending can make
    /// `finish_merge` fail with a conflict.
    pub fn scene_mut(&mut self) -> &mut SceneRoot {
        &mut self.scene
    }

    /// Give up the session and keep the scene.
    pub fn into_scene(self) -> SceneRoot {
        self.scene
    }

    /// Merge settings.
    pub fn settings(&self) -> &MergeSettings {
        &self.settings
    }

    /// Current mode.
    pub const fn mode(&self) -> EditMode {
        self.mode
    }

    /// True while a merge is pending.
    pub const fn is_merging(&self) -> bool {
        matches!(self.mode, EditMode::Merge)
    }

    /// Comparison of the pending merge.
    pub fn comparison(&self) -> Option<&ComparisonResult> {
        self.pending.as_ref().map(|p| &p.result)
    }

    /// Operation of the pending merge.
    pub fn operation(&self) -> Option<&MergeOperation> {
        self.pending.as_ref().map(|p| &p.operation)
    }

    /// Preview nodes of the pending merge.
    pub fn preview(&self) -> Option<&MergePreview> {
        self.pending.as_ref().map(|p| &p.preview)
    }

    /// Highlight sets of the pending merge.
    pub fn highlights(&self) -> Option<HighlightState<EntityKey>> {
        self.pending
            .as_ref()
            .map(|p| p.preview.highlights(&p.operation))
    }

    /// Queued user-visible messages.
    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    /// Mutable access for hosts that drain the queue.
    pub fn notifications_mut(&mut self) -> &mut NotificationQueue {
        &mut self.notifications
    }

    /// Compare `source` against the edited scene and enter merge mode.
    ///
    /// A merge that is already pending is aborted first. On error the session
    /// stays in normal mode.
    #[instrument(skip_all)]
    pub fn start_merge(&mut self, source: &SceneRoot) -> Result<&ComparisonResult, SessionError> {
        if self.pending.is_some() {
            warn!("merge already pending, aborting it");
            self.abort_merge()?;
        }
        let (result, operation) = start_merge(source, &self.scene, &self.settings)?;
        let preview = MergePreview::new(&operation);
        info!(
            differences = result.len(),
            actions = operation.len(),
            "merge started"
        );
        self.mode = EditMode::Merge;
        let pending = self.pending.insert(PendingMerge {
            result,
            operation,
            preview,
        });
        Ok(&pending.result)
    }

    /// Toggle an action of the pending merge.
    pub fn set_action_active(&mut self, id: ActionId, active: bool) -> Result<bool, SessionError> {
        let pending = self.pending.as_mut().ok_or(SessionError::NotMerging)?;
        Ok(pending.operation.set_active(id, active))
    }

    /// Commit the pending merge as one undo step.
    ///
    /// On failure the scene is restored to its pre-merge state, one error
    /// notification is queued and the error is returned. Either way the
    /// session returns to normal mode.
    #[instrument(skip_all)]
    pub fn finish_merge(&mut self) -> Result<ApplyReport, SessionError> {
        let Some(pending) = self.pending.take() else {
            warn!("finish_merge called outside merge mode");
            return Err(SessionError::NotMerging);
        };
        self.mode = EditMode::Normal;
        drop(pending.preview);

        let snapshot = self.scene.clone();
        match finish_merge(pending.operation, &mut self.scene) {
            Ok(report) => {
                self.undo.push(UndoStep {
                    name: MERGE_UNDO_NAME,
                    snapshot,
                });
                info!(applied = report.applied, "merge committed");
                Ok(report)
            }
            Err(err) => {
                self.scene = snapshot;
                self.notifications
                    .error("Merge failed", Some(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Drop the pending merge without touching the scene.
    pub fn abort_merge(&mut self) -> Result<(), SessionError> {
        let pending = self.pending.take().ok_or(SessionError::NotMerging)?;
        self.mode = EditMode::Normal;
        abort_merge(pending.operation);
        Ok(())
    }

    /// Revert the most recent committed step. Returns its name.
    pub fn undo(&mut self) -> Option<&'static str> {
        let step = self.undo.pop()?;
        self.scene = step.snapshot;
        Some(step.name)
    }

    /// Number of undoable steps.
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }
}

impl core::fmt::Debug for MapSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MapSession")
            .field("entities", &self.scene.len())
            .field("mode", &self.mode)
            .field("pending_actions", &self.operation().map(MergeOperation::len))
            .field("undo_depth", &self.undo.len())
            .finish_non_exhaustive()
    }
}
