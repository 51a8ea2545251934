// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Comparison result: what differs between a source and a base scene.
//!
//! The result is sparse (untouched entities produce no record) and ordered:
//! records follow source traversal order, then base-only removals in base
//! traversal order. Records own clones of everything an action later needs, so
//! neither scene has to outlive the result.

use mapmerge_scene::{Entity, Primitive, PrimitiveKind};
use serde::Serialize;

use crate::fingerprint::Fingerprint;
use crate::identity::EntityKey;
use crate::settings::MergeSettings;

/// Entity-level classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceKind {
    /// Present only in the source scene.
    Added,
    /// Present only in the base scene.
    Removed,
    /// Present in both with at least one attribute or primitive difference.
    Modified,
}

/// Attribute-level classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyValueChange {
    /// Key only set in the source entity.
    KeyAdded,
    /// Key only set in the base entity.
    KeyRemoved,
    /// Key set on both sides with different values.
    KeyChanged,
}

/// One attribute difference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyValueDifference {
    /// Attribute name.
    pub key: String,
    /// Value in the source entity.
    pub source_value: Option<String>,
    /// Value in the base entity.
    pub base_value: Option<String>,
    /// Classification derived from which sides hold a value.
    pub kind: KeyValueChange,
}

impl KeyValueDifference {
    /// Classify a key. Returns `None` when both sides agree.
    pub fn classify(key: &str, source_value: Option<&str>, base_value: Option<&str>) -> Option<Self> {
        let kind = match (source_value, base_value) {
            (Some(_), None) => KeyValueChange::KeyAdded,
            (None, Some(_)) => KeyValueChange::KeyRemoved,
            (Some(s), Some(b)) if s != b => KeyValueChange::KeyChanged,
            _ => return None,
        };
        Some(Self {
            key: key.to_owned(),
            source_value: source_value.map(str::to_owned),
            base_value: base_value.map(str::to_owned),
            kind,
        })
    }
}

/// Primitive-level classification. A modified primitive shows up as one
/// removal plus one addition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveChange {
    /// Primitive only present in the source entity.
    PrimitiveAdded,
    /// Primitive only present in the base entity.
    PrimitiveRemoved,
}

/// One primitive difference.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PrimitiveDifference {
    /// Classification.
    pub kind: PrimitiveChange,
    /// Index within the owning entity (source entity for additions, base entity
    /// for removals).
    pub index: usize,
    /// Content fingerprint of the primitive.
    pub fingerprint: Fingerprint,
    /// Copy of the primitive (from source for additions, from base for removals).
    pub primitive: Primitive,
}

impl PrimitiveDifference {
    /// Brush or patch.
    pub const fn primitive_kind(&self) -> PrimitiveKind {
        self.primitive.kind()
    }
}

/// Everything that differs for one entity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntityDifference {
    /// Cross-scene identity.
    pub key: EntityKey,
    /// Classification.
    pub kind: DifferenceKind,
    /// Classname, for reports (source side when present, else base side).
    pub classname: Option<String>,
    /// Attribute differences in key order (Modified only).
    pub key_values: Vec<KeyValueDifference>,
    /// Primitive differences, removals then additions (Modified only).
    pub primitives: Vec<PrimitiveDifference>,
    /// Full copy of the source entity (Added only).
    #[serde(skip)]
    source_entity: Option<Entity>,
}

impl EntityDifference {
    pub(crate) fn added(key: EntityKey, entity: &Entity) -> Self {
        Self {
            key,
            kind: DifferenceKind::Added,
            classname: entity.classname().map(str::to_owned),
            key_values: Vec::new(),
            primitives: Vec::new(),
            source_entity: Some(entity.clone()),
        }
    }

    pub(crate) fn removed(key: EntityKey, entity: &Entity) -> Self {
        Self {
            key,
            kind: DifferenceKind::Removed,
            classname: entity.classname().map(str::to_owned),
            key_values: Vec::new(),
            primitives: Vec::new(),
            source_entity: None,
        }
    }

    /// `None` when the entity pair has no differences.
    pub(crate) fn modified(
        key: EntityKey,
        classname: Option<&str>,
        key_values: Vec<KeyValueDifference>,
        primitives: Vec<PrimitiveDifference>,
    ) -> Option<Self> {
        if key_values.is_empty() && primitives.is_empty() {
            return None;
        }
        Some(Self {
            key,
            kind: DifferenceKind::Modified,
            classname: classname.map(str::to_owned),
            key_values,
            primitives,
            source_entity: None,
        })
    }

    /// The source entity copied for an Added record.
    pub fn source_entity(&self) -> Option<&Entity> {
        self.source_entity.as_ref()
    }
}

/// Counts over a comparison result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonSummary {
    /// Entities only in source.
    pub entities_added: usize,
    /// Entities only in base.
    pub entities_removed: usize,
    /// Entities in both with differences.
    pub entities_modified: usize,
    /// Attribute differences across modified entities.
    pub key_value_differences: usize,
    /// Primitive differences across modified entities.
    pub primitive_differences: usize,
}

/// Immutable, ordered list of entity differences.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonResult {
    #[serde(skip)]
    settings: MergeSettings,
    differences: Vec<EntityDifference>,
}

impl ComparisonResult {
    pub(crate) fn new(settings: MergeSettings, differences: Vec<EntityDifference>) -> Self {
        Self {
            settings,
            differences,
        }
    }

    /// Settings the comparison ran with.
    pub fn settings(&self) -> &MergeSettings {
        &self.settings
    }

    /// Records in stable order.
    pub fn differences(&self) -> &[EntityDifference] {
        &self.differences
    }

    /// Iterate records in stable order.
    pub fn iter(&self) -> std::slice::Iter<'_, EntityDifference> {
        self.differences.iter()
    }

    /// Number of entity records.
    pub fn len(&self) -> usize {
        self.differences.len()
    }

    /// True when the scenes are equivalent.
    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }

    /// Record for `key`, if any.
    pub fn find(&self, key: &EntityKey) -> Option<&EntityDifference> {
        self.differences.iter().find(|d| &d.key == key)
    }

    /// Per-kind counts.
    pub fn summary(&self) -> ComparisonSummary {
        let mut summary = ComparisonSummary::default();
        for diff in &self.differences {
            match diff.kind {
                DifferenceKind::Added => summary.entities_added += 1,
                DifferenceKind::Removed => summary.entities_removed += 1,
                DifferenceKind::Modified => summary.entities_modified += 1,
            }
            summary.key_value_differences += diff.key_values.len();
            summary.primitive_differences += diff.primitives.len();
        }
        summary
    }
}

impl<'a> IntoIterator for &'a ComparisonResult {
    type Item = &'a EntityDifference;
    type IntoIter = std::slice::Iter<'a, EntityDifference>;

    fn into_iter(self) -> Self::IntoIter {
        self.differences.iter()
    }
}

fn quoted(value: Option<&String>) -> String {
    value.map_or_else(|| "<unset>".to_owned(), |v| format!("{v:?}"))
}

impl core::fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            return writeln!(f, "scenes are equivalent");
        }
        for diff in &self.differences {
            let marker = match diff.kind {
                DifferenceKind::Added => '+',
                DifferenceKind::Removed => '-',
                DifferenceKind::Modified => '~',
            };
            write!(f, "{marker} {}", diff.key)?;
            if let Some(classname) = &diff.classname {
                write!(f, " ({classname})")?;
            }
            writeln!(f)?;
            for kv in &diff.key_values {
                match kv.kind {
                    KeyValueChange::KeyAdded => {
                        writeln!(f, "    + {} = {}", kv.key, quoted(kv.source_value.as_ref()))?;
                    }
                    KeyValueChange::KeyRemoved => {
                        writeln!(f, "    - {} (was {})", kv.key, quoted(kv.base_value.as_ref()))?;
                    }
                    KeyValueChange::KeyChanged => writeln!(
                        f,
                        "    ~ {}: {} -> {}",
                        kv.key,
                        quoted(kv.base_value.as_ref()),
                        quoted(kv.source_value.as_ref())
                    )?,
                }
            }
            for prim in &diff.primitives {
                let sign = match prim.kind {
                    PrimitiveChange::PrimitiveAdded => '+',
                    PrimitiveChange::PrimitiveRemoved => '-',
                };
                writeln!(
                    f,
                    "    {sign} {} #{} [{}]",
                    prim.primitive_kind(),
                    prim.index,
                    prim.fingerprint
                )?;
            }
        }
        let s = self.summary();
        writeln!(
            f,
            "{} added, {} removed, {} modified ({} key values, {} primitives)",
            s.entities_added,
            s.entities_removed,
            s.entities_modified,
            s.key_value_differences,
            s.primitive_differences
        )
    }
}
