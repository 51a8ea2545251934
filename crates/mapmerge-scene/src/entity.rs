// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Entities and the scene root.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Primitive;
use crate::SceneError;

/// Attribute naming the entity class.
pub const CLASSNAME_KEY: &str = "classname";

/// A scene node holding key/value attributes and owning primitives.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Attributes ("spawnargs"), iterated in key order.
    #[serde(default)]
    pub key_values: BTreeMap<String, String>,
    /// Child primitives in stored order.
    #[serde(default)]
    pub primitives: Vec<Primitive>,
}

impl Entity {
    /// Create an entity with only a classname.
    pub fn new(classname: impl Into<String>) -> Self {
        let mut entity = Self::default();
        entity.set_key_value(CLASSNAME_KEY, classname);
        entity
    }

    /// Builder-style attribute setter.
    pub fn with_key_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_key_value(key, value);
        self
    }

    /// Builder-style primitive append.
    pub fn with_primitive(mut self, primitive: impl Into<Primitive>) -> Self {
        self.primitives.push(primitive.into());
        self
    }

    /// Attribute lookup.
    pub fn key_value(&self, key: &str) -> Option<&str> {
        self.key_values.get(key).map(String::as_str)
    }

    /// Set (or overwrite) an attribute. Returns the previous value.
    pub fn set_key_value(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.key_values.insert(key.into(), value.into())
    }

    /// Delete an attribute. Returns the removed value.
    pub fn remove_key_value(&mut self, key: &str) -> Option<String> {
        self.key_values.remove(key)
    }

    /// The `classname` attribute, if set.
    pub fn classname(&self) -> Option<&str> {
        self.key_value(CLASSNAME_KEY)
    }

    /// Primitives in stored order.
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Append a primitive.
    pub fn add_primitive(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }

    /// Remove the primitive at `index`, if any.
    pub fn remove_primitive(&mut self, index: usize) -> Option<Primitive> {
        (index < self.primitives.len()).then(|| self.primitives.remove(index))
    }
}

/// Root of a level: owns every entity in traversal order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneRoot {
    /// Entities in traversal order.
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl SceneRoot {
    /// Empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style entity append.
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Entities in traversal order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when the scene holds no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Append an entity as a new child of the root.
    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    /// Detach the entity at `index`, if any.
    pub fn remove_entity(&mut self, index: usize) -> Option<Entity> {
        (index < self.entities.len()).then(|| self.entities.remove(index))
    }

    /// Index of the first entity whose `key` attribute equals `value`.
    pub fn position_by_key_value(&self, key: &str, value: &str) -> Option<usize> {
        self.entities
            .iter()
            .position(|e| e.key_value(key) == Some(value))
    }

    /// Total primitive count across all entities.
    pub fn primitive_count(&self) -> usize {
        self.entities.iter().map(|e| e.primitives.len()).sum()
    }

    /// Reject trees the engine cannot compare reliably.
    ///
    /// `identity_key` is the attribute used to match entities across scenes; a
    /// present but empty value for it is malformed.
    pub fn validate(&self, identity_key: &str) -> Result<(), SceneError> {
        for (entity_index, entity) in self.entities.iter().enumerate() {
            if entity.key_value(identity_key) == Some("") {
                return Err(SceneError::EmptyIdentity {
                    entity: entity_index,
                    key: identity_key.to_owned(),
                });
            }
            for (primitive_index, primitive) in entity.primitives.iter().enumerate() {
                validate_primitive(primitive).map_err(|fault| match fault {
                    PrimitiveFault::NonFinite(component) => SceneError::NonFiniteValue {
                        entity: entity_index,
                        primitive: primitive_index,
                        component,
                    },
                    PrimitiveFault::Grid { expected, actual } => SceneError::PatchGridMismatch {
                        entity: entity_index,
                        primitive: primitive_index,
                        expected,
                        actual,
                    },
                })?;
            }
        }
        Ok(())
    }
}

enum PrimitiveFault {
    NonFinite(&'static str),
    Grid { expected: usize, actual: usize },
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

fn validate_primitive(primitive: &Primitive) -> Result<(), PrimitiveFault> {
    match primitive {
        Primitive::Brush(brush) => {
            for face in &brush.faces {
                if !all_finite(&face.plane.normal) || !face.plane.dist.is_finite() {
                    return Err(PrimitiveFault::NonFinite("plane"));
                }
                if !all_finite(&face.texture.components()) {
                    return Err(PrimitiveFault::NonFinite("texture matrix"));
                }
            }
        }
        Primitive::Patch(patch) => {
            let expected = patch.width.saturating_mul(patch.height);
            if patch.control_points.len() != expected {
                return Err(PrimitiveFault::Grid {
                    expected,
                    actual: patch.control_points.len(),
                });
            }
            for ctrl in &patch.control_points {
                if !all_finite(&ctrl.vertex) || !all_finite(&ctrl.texcoord) {
                    return Err(PrimitiveFault::NonFinite("control point"));
                }
            }
        }
    }
    Ok(())
}
