// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Merge operation: ordered batch of merge actions.

use mapmerge_scene::SceneRoot;
use tracing::{debug, error, info, instrument};

use crate::action::{ActionType, MergeAction};
use crate::comparison::{
    ComparisonResult, DifferenceKind, EntityDifference, KeyValueChange, KeyValueDifference,
    PrimitiveChange, PrimitiveDifference,
};
use crate::identity::EntityKey;
use crate::settings::MergeSettings;
use crate::MergeError;

/// Position of an action within its operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(usize);

impl ActionId {
    /// Id of the action at `index`.
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Zero-based index.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl core::fmt::Display for ActionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of a successful [`MergeOperation::apply_actions`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Actions that ran.
    pub applied: usize,
    /// Actions deactivated during review.
    pub skipped: usize,
}

#[derive(Clone, Debug, PartialEq)]
struct Slot {
    action: MergeAction,
    active: bool,
}

/// Ordered list of actions; insertion order is application order.
///
/// The operation carries the [`MergeSettings`] its actions were built with so
/// fingerprint lookups at apply time use the same precision as the comparison.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergeOperation {
    settings: MergeSettings,
    slots: Vec<Slot>,
}

impl MergeOperation {
    /// Empty operation.
    pub fn new(settings: MergeSettings) -> Self {
        Self {
            settings,
            slots: Vec::new(),
        }
    }

    /// Build the action list for `result`.
    ///
    /// Added/removed entities become one action each. Modified entities become
    /// one action per attribute difference, then one per primitive difference,
    /// in record order.
    pub fn create_from_comparison_result(result: &ComparisonResult) -> Self {
        let mut operation = Self::new(result.settings().clone());
        for diff in result {
            operation.push_difference(diff);
        }
        debug!(actions = operation.len(), "merge operation built");
        operation
    }

    fn push_difference(&mut self, diff: &EntityDifference) {
        match diff.kind {
            DifferenceKind::Added => {
                if let Some(entity) = diff.source_entity() {
                    self.add_action(MergeAction::AddEntity {
                        target: diff.key.clone(),
                        entity: entity.clone(),
                    });
                }
            }
            DifferenceKind::Removed => {
                self.add_action(MergeAction::RemoveEntity {
                    target: diff.key.clone(),
                });
            }
            DifferenceKind::Modified => {
                for kv in &diff.key_values {
                    if let Some(action) = key_value_action(&diff.key, kv) {
                        self.add_action(action);
                    }
                }
                for prim in &diff.primitives {
                    self.add_action(primitive_action(&diff.key, prim));
                }
            }
        }
    }

    /// Append an action; returns its id.
    pub fn add_action(&mut self, action: MergeAction) -> ActionId {
        self.slots.push(Slot {
            action,
            active: true,
        });
        ActionId(self.slots.len() - 1)
    }

    /// Settings the actions were built with.
    pub fn settings(&self) -> &MergeSettings {
        &self.settings
    }

    /// Number of actions (active or not).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Action by id.
    pub fn action(&self, id: ActionId) -> Option<&MergeAction> {
        self.slots.get(id.0).map(|slot| &slot.action)
    }

    /// Effective type: [`ActionType::NoAction`] for deactivated actions.
    pub fn action_type(&self, id: ActionId) -> Option<ActionType> {
        self.slots.get(id.0).map(|slot| {
            if slot.active {
                slot.action.action_type()
            } else {
                ActionType::NoAction
            }
        })
    }

    /// False for deactivated or unknown actions.
    pub fn is_active(&self, id: ActionId) -> bool {
        self.slots.get(id.0).is_some_and(|slot| slot.active)
    }

    /// Activate or deactivate an action. Returns false for unknown ids.
    pub fn set_active(&mut self, id: ActionId, active: bool) -> bool {
        match self.slots.get_mut(id.0) {
            Some(slot) => {
                slot.active = active;
                true
            }
            None => false,
        }
    }

    /// Visit every action in order.
    pub fn foreach_action<F>(&self, mut visit: F)
    where
        F: FnMut(ActionId, &MergeAction),
    {
        for (id, action) in self.actions() {
            visit(id, action);
        }
    }

    /// Actions in order with their ids.
    pub fn actions(&self) -> impl Iterator<Item = (ActionId, &MergeAction)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (ActionId(index), &slot.action))
    }

    /// Apply every active action to `base`, in order, consuming the operation.
    ///
    /// Stops at the first failing action. Actions that already ran stay
    /// applied; the caller owns rollback (see [`crate::MapSession`]).
    ///
    /// # Errors
    /// [`MergeError::ActionFailed`] with the failing index and description.
    #[instrument(skip_all, fields(actions = self.slots.len()))]
    pub fn apply_actions(self, base: &mut SceneRoot) -> Result<ApplyReport, MergeError> {
        let mut report = ApplyReport::default();
        for (index, slot) in self.slots.iter().enumerate() {
            if !slot.active {
                debug!(index, "skipping deactivated action");
                report.skipped += 1;
                continue;
            }
            debug!(index, action = %slot.action.describe(), "applying merge action");
            if let Err(cause) = slot.action.apply(base, &self.settings) {
                let description = slot.action.describe();
                error!(index, action = %description, error = %cause, "merge action failed");
                return Err(MergeError::ActionFailed {
                    index,
                    description,
                    cause: Box::new(cause),
                });
            }
            report.applied += 1;
        }
        info!(
            applied = report.applied,
            skipped = report.skipped,
            "merge operation applied"
        );
        Ok(report)
    }
}

fn key_value_action(target: &EntityKey, kv: &KeyValueDifference) -> Option<MergeAction> {
    let target = target.clone();
    let key = kv.key.clone();
    Some(match kv.kind {
        KeyValueChange::KeyAdded => MergeAction::AddKeyValue {
            target,
            key,
            value: kv.source_value.clone()?,
        },
        KeyValueChange::KeyChanged => MergeAction::ChangeKeyValue {
            target,
            key,
            value: kv.source_value.clone()?,
            previous: kv.base_value.clone().unwrap_or_default(),
        },
        KeyValueChange::KeyRemoved => MergeAction::RemoveKeyValue { target, key },
    })
}

fn primitive_action(target: &EntityKey, prim: &PrimitiveDifference) -> MergeAction {
    match prim.kind {
        PrimitiveChange::PrimitiveAdded => MergeAction::AddChildNode {
            target: target.clone(),
            fingerprint: prim.fingerprint.clone(),
            primitive: prim.primitive.clone(),
        },
        PrimitiveChange::PrimitiveRemoved => MergeAction::RemoveChildNode {
            target: target.clone(),
            fingerprint: prim.fingerprint.clone(),
            primitive_kind: prim.primitive_kind(),
        },
    }
}
