// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Preview wrappers around pending merge actions.
//!
//! A [`MergeActionNode`] does not own its action. It remembers the action id
//! and looks the action up in the operation when asked, so nodes can be
//! dropped at any time without touching either the operation or the scene.

use mapmerge_scene::{Highlight, HighlightState};

use crate::action::{ActionType, MergeAction};
use crate::identity::EntityKey;
use crate::operation::{ActionId, MergeOperation};

/// Scene-visible placeholder for one pending action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeActionNode {
    id: ActionId,
    entity: EntityKey,
    action_type: ActionType,
    label: String,
}

impl MergeActionNode {
    /// Wrap the action `id` of `operation`. `None` for unknown ids.
    pub fn new(operation: &MergeOperation, id: ActionId) -> Option<Self> {
        operation.action(id).map(|action| Self::wrap(id, action))
    }

    fn wrap(id: ActionId, action: &MergeAction) -> Self {
        Self {
            id,
            entity: action.affected_entity().clone(),
            action_type: action.action_type(),
            label: action.describe(),
        }
    }

    /// Id of the wrapped action.
    pub const fn id(&self) -> ActionId {
        self.id
    }

    /// Entity the action touches.
    pub const fn affected_entity(&self) -> &EntityKey {
        &self.entity
    }

    /// Type of the wrapped action, regardless of its active flag.
    pub const fn action_type(&self) -> ActionType {
        self.action_type
    }

    /// Display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The wrapped action.
    pub fn action<'a>(&self, operation: &'a MergeOperation) -> Option<&'a MergeAction> {
        operation.action(self.id)
    }

    /// Effective type: [`ActionType::NoAction`] once deactivated.
    pub fn current_type(&self, operation: &MergeOperation) -> ActionType {
        operation
            .action_type(self.id)
            .unwrap_or(ActionType::NoAction)
    }

    /// How a renderer should tint the affected entity.
    pub const fn highlight(&self) -> Highlight {
        match self.action_type {
            ActionType::AddEntity => Highlight::Added,
            ActionType::RemoveEntity => Highlight::Removed,
            _ => Highlight::Changed,
        }
    }
}

/// All preview nodes of one operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergePreview {
    nodes: Vec<MergeActionNode>,
}

impl MergePreview {
    /// One node per action, in action order.
    pub fn new(operation: &MergeOperation) -> Self {
        let mut nodes = Vec::with_capacity(operation.len());
        operation.foreach_action(|id, action| nodes.push(MergeActionNode::wrap(id, action)));
        Self { nodes }
    }

    /// Nodes in action order.
    pub fn nodes(&self) -> &[MergeActionNode] {
        &self.nodes
    }

    /// Node wrapping `id`.
    pub fn node(&self, id: ActionId) -> Option<&MergeActionNode> {
        self.nodes.get(id.index())
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the operation had no actions.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes touching `entity`.
    pub fn nodes_for<'a>(
        &'a self,
        entity: &'a EntityKey,
    ) -> impl Iterator<Item = &'a MergeActionNode> + 'a {
        self.nodes.iter().filter(move |n| &n.entity == entity)
    }

    /// Highlight sets for the still-active actions.
    pub fn highlights(&self, operation: &MergeOperation) -> HighlightState<EntityKey> {
        let mut state = HighlightState::default();
        for node in &self.nodes {
            if operation.is_active(node.id) {
                state.insert(node.entity.clone(), node.highlight());
            }
        }
        state
    }
}
