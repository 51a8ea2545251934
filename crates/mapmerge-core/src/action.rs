// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Merge actions: one typed edit that moves the base scene toward the source.
//!
//! Actions never hold pointers into either scene. The base entity is named by
//! its [`EntityKey`] and resolved when the action is applied; anything taken
//! from the source scene is cloned into the action up front.

use mapmerge_scene::{Entity, Primitive, PrimitiveKind, SceneRoot};

use crate::fingerprint::{Fingerprint, Fingerprinter};
use crate::identity::{locate, EntityKey};
use crate::settings::MergeSettings;
use crate::MergeError;

/// Action classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionType {
    /// Insert a whole entity.
    AddEntity,
    /// Delete a whole entity.
    RemoveEntity,
    /// Set an attribute the base entity does not have.
    AddKeyValue,
    /// Delete an attribute.
    RemoveKeyValue,
    /// Overwrite an attribute value.
    ChangeKeyValue,
    /// Append a primitive.
    AddChildNode,
    /// Delete a primitive.
    RemoveChildNode,
    /// Deactivated during review; applying does nothing.
    NoAction,
}

impl core::fmt::Display for ActionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::AddEntity => "add entity",
            Self::RemoveEntity => "remove entity",
            Self::AddKeyValue => "add key value",
            Self::RemoveKeyValue => "remove key value",
            Self::ChangeKeyValue => "change key value",
            Self::AddChildNode => "add child node",
            Self::RemoveChildNode => "remove child node",
            Self::NoAction => "no action",
        })
    }
}

/// One pending edit against the base scene.
#[derive(Clone, Debug, PartialEq)]
pub enum MergeAction {
    /// Insert a copy of a source entity as a new child of the base root.
    AddEntity {
        /// Identity of the new entity.
        target: EntityKey,
        /// Full copy of the source entity.
        entity: Entity,
    },
    /// Delete a base entity.
    RemoveEntity {
        /// Entity to delete.
        target: EntityKey,
    },
    /// Set a new attribute.
    AddKeyValue {
        /// Base entity.
        target: EntityKey,
        /// Attribute name.
        key: String,
        /// Source value.
        value: String,
    },
    /// Overwrite an attribute.
    ChangeKeyValue {
        /// Base entity.
        target: EntityKey,
        /// Attribute name.
        key: String,
        /// Source value.
        value: String,
        /// Base value at comparison time (for review only).
        previous: String,
    },
    /// Delete an attribute. Applying twice is not an error.
    RemoveKeyValue {
        /// Base entity.
        target: EntityKey,
        /// Attribute name.
        key: String,
    },
    /// Append a copy of a source primitive.
    AddChildNode {
        /// Base entity.
        target: EntityKey,
        /// Fingerprint of the primitive.
        fingerprint: Fingerprint,
        /// Copy of the source primitive.
        primitive: Primitive,
    },
    /// Delete the first base primitive with a matching fingerprint.
    RemoveChildNode {
        /// Base entity.
        target: EntityKey,
        /// Fingerprint to match.
        fingerprint: Fingerprint,
        /// Brush or patch, for review.
        primitive_kind: PrimitiveKind,
    },
}

impl MergeAction {
    /// Classification of this action.
    pub const fn action_type(&self) -> ActionType {
        match self {
            Self::AddEntity { .. } => ActionType::AddEntity,
            Self::RemoveEntity { .. } => ActionType::RemoveEntity,
            Self::AddKeyValue { .. } => ActionType::AddKeyValue,
            Self::ChangeKeyValue { .. } => ActionType::ChangeKeyValue,
            Self::RemoveKeyValue { .. } => ActionType::RemoveKeyValue,
            Self::AddChildNode { .. } => ActionType::AddChildNode,
            Self::RemoveChildNode { .. } => ActionType::RemoveChildNode,
        }
    }

    /// The entity this action touches.
    pub const fn affected_entity(&self) -> &EntityKey {
        match self {
            Self::AddEntity { target, .. }
            | Self::RemoveEntity { target }
            | Self::AddKeyValue { target, .. }
            | Self::ChangeKeyValue { target, .. }
            | Self::RemoveKeyValue { target, .. }
            | Self::AddChildNode { target, .. }
            | Self::RemoveChildNode { target, .. } => target,
        }
    }

    /// One-line summary for reports, preview labels and error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::AddEntity { target, entity } => match entity.classname() {
                Some(classname) => format!("add {target} ({classname})"),
                None => format!("add {target}"),
            },
            Self::RemoveEntity { target } => format!("remove {target}"),
            Self::AddKeyValue { target, key, value } => {
                format!("set {key} = {value:?} on {target}")
            }
            Self::ChangeKeyValue {
                target,
                key,
                value,
                previous,
            } => format!("change {key} from {previous:?} to {value:?} on {target}"),
            Self::RemoveKeyValue { target, key } => format!("remove {key} from {target}"),
            Self::AddChildNode {
                target,
                fingerprint,
                primitive,
            } => format!("add {} [{fingerprint}] to {target}", primitive.kind()),
            Self::RemoveChildNode {
                target,
                fingerprint,
                primitive_kind,
            } => format!("remove {primitive_kind} [{fingerprint}] from {target}"),
        }
    }

    /// Apply to `base`.
    ///
    /// # Errors
    /// - [`MergeError::StructuralConflict`] when adding a named entity that
    ///   already exists.
    /// - [`MergeError::NotFound`] when the target entity or the primitive to
    ///   remove is gone.
    pub fn apply(&self, base: &mut SceneRoot, settings: &MergeSettings) -> Result<(), MergeError> {
        let fingerprinter = settings.fingerprinter();
        match self {
            Self::AddEntity { target, entity } => {
                if matches!(target, EntityKey::Named(_))
                    && locate(base, target, settings, &fingerprinter).is_some()
                {
                    return Err(MergeError::StructuralConflict {
                        entity: target.clone(),
                        detail: "entity already exists in base".to_owned(),
                    });
                }
                base.add_entity(entity.clone());
            }
            Self::RemoveEntity { target } => {
                let index = resolve(base, target, settings, &fingerprinter)?;
                base.remove_entity(index);
            }
            Self::AddKeyValue { target, key, value }
            | Self::ChangeKeyValue {
                target, key, value, ..
            } => {
                let index = resolve(base, target, settings, &fingerprinter)?;
                base.entities[index].set_key_value(key.as_str(), value.as_str());
            }
            Self::RemoveKeyValue { target, key } => {
                let index = resolve(base, target, settings, &fingerprinter)?;
                base.entities[index].remove_key_value(key);
            }
            Self::AddChildNode {
                target, primitive, ..
            } => {
                let index = resolve(base, target, settings, &fingerprinter)?;
                base.entities[index].add_primitive(primitive.clone());
            }
            Self::RemoveChildNode {
                target,
                fingerprint,
                primitive_kind,
            } => {
                let index = resolve(base, target, settings, &fingerprinter)?;
                let entity = &mut base.entities[index];
                let at = entity
                    .primitives()
                    .iter()
                    .position(|p| fingerprinter.primitive(p) == *fingerprint)
                    .ok_or_else(|| MergeError::NotFound {
                        entity: target.clone(),
                        what: format!("{primitive_kind} [{fingerprint}]"),
                    })?;
                entity.remove_primitive(at);
            }
        }
        Ok(())
    }
}

fn resolve(
    base: &SceneRoot,
    target: &EntityKey,
    settings: &MergeSettings,
    fingerprinter: &Fingerprinter,
) -> Result<usize, MergeError> {
    locate(base, target, settings, fingerprinter).ok_or_else(|| MergeError::NotFound {
        entity: target.clone(),
        what: "entity".to_owned(),
    })
}
