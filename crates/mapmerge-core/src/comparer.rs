// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph comparer: read-only diff of two scene roots.

use std::collections::{BTreeSet, VecDeque};

use mapmerge_scene::{Entity, SceneRoot};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, instrument};

use crate::comparison::{
    ComparisonResult, EntityDifference, KeyValueDifference, PrimitiveChange, PrimitiveDifference,
};
use crate::fingerprint::{Fingerprint, Fingerprinter};
use crate::identity::{collect_duplicates, EntityKey, SceneIndex};
use crate::settings::MergeSettings;
use crate::{MergeError, SceneSide};

/// Fingerprint -> pending indices, consumed front to back.
type Buckets = FxHashMap<Fingerprint, VecDeque<usize>>;

/// Compares a source scene against a base scene.
///
/// Entities are matched by identity (see [`EntityKey`]); matched pairs are
/// diffed attribute by attribute and primitive by primitive, where primitives
/// are compared as a multiset of fingerprints so reordering is not a change.
#[derive(Clone, Debug, Default)]
pub struct GraphComparer {
    settings: MergeSettings,
    fingerprinter: Fingerprinter,
}

impl GraphComparer {
    /// Comparer using `settings`.
    pub fn new(settings: MergeSettings) -> Self {
        let fingerprinter = settings.fingerprinter();
        Self {
            settings,
            fingerprinter,
        }
    }

    /// Settings in use.
    pub fn settings(&self) -> &MergeSettings {
        &self.settings
    }

    /// Diff `source` against `base`.
    ///
    /// Neither scene is mutated. Records appear in source traversal order,
    /// followed by base-only removals in base traversal order.
    ///
    /// # Errors
    /// [`MergeError::InvalidSettings`] or [`MergeError::MalformedScene`]; no
    /// partial result is returned.
    #[instrument(skip_all, fields(source = source.len(), base = base.len()))]
    pub fn compare(
        &self,
        source: &SceneRoot,
        base: &SceneRoot,
    ) -> Result<ComparisonResult, MergeError> {
        self.settings.validate()?;
        let key = self.settings.identity_key.as_str();
        source
            .validate(key)
            .map_err(|source| MergeError::MalformedScene {
                side: SceneSide::Source,
                source,
            })?;
        base.validate(key)
            .map_err(|source| MergeError::MalformedScene {
                side: SceneSide::Base,
                source,
            })?;

        let mut ambiguous = FxHashSet::default();
        collect_duplicates(source, &self.settings, &mut ambiguous);
        collect_duplicates(base, &self.settings, &mut ambiguous);
        if !ambiguous.is_empty() {
            debug!(count = ambiguous.len(), "duplicate identities fall back to fingerprints");
        }
        let source_index = SceneIndex::build(source, &self.settings, &ambiguous);
        let base_index = SceneIndex::build(base, &self.settings, &ambiguous);

        // Unidentified base entities, paired with unidentified source entities
        // by whole-entity fingerprint.
        let mut base_anonymous = Buckets::default();
        let mut base_fps: Vec<Option<Fingerprint>> = Vec::with_capacity(base.len());
        for (index, entity) in base.entities().iter().enumerate() {
            let fp = base_index.identities[index]
                .is_none()
                .then(|| self.fingerprinter.entity(entity));
            if let Some(fp) = &fp {
                base_anonymous.entry(fp.clone()).or_default().push_back(index);
            }
            base_fps.push(fp);
        }

        let mut differences = Vec::new();
        for (index, entity) in source.entities().iter().enumerate() {
            match source_index.identities[index] {
                Some(name) => {
                    let key = EntityKey::Named(name.to_owned());
                    match base_index.named.get(name) {
                        Some(&base_at) => {
                            let base_entity = &base.entities()[base_at];
                            if let Some(diff) = self.diff_entity(key, entity, base_entity) {
                                differences.push(diff);
                            }
                        }
                        None => differences.push(EntityDifference::added(key, entity)),
                    }
                }
                None => {
                    let fp = self.fingerprinter.entity(entity);
                    let paired = base_anonymous
                        .get_mut(&fp)
                        .and_then(VecDeque::pop_front)
                        .is_some();
                    if !paired {
                        differences.push(EntityDifference::added(EntityKey::Anonymous(fp), entity));
                    }
                }
            }
        }

        let leftover: FxHashSet<usize> = base_anonymous.into_values().flatten().collect();
        for ((index, entity), fp) in base.entities().iter().enumerate().zip(base_fps) {
            match (base_index.identities[index], fp) {
                (Some(name), _) if !source_index.named.contains_key(name) => {
                    differences.push(EntityDifference::removed(
                        EntityKey::Named(name.to_owned()),
                        entity,
                    ));
                }
                (None, Some(fp)) if leftover.contains(&index) => {
                    differences.push(EntityDifference::removed(EntityKey::Anonymous(fp), entity));
                }
                _ => {}
            }
        }

        let result = ComparisonResult::new(self.settings.clone(), differences);
        let summary = result.summary();
        info!(
            added = summary.entities_added,
            removed = summary.entities_removed,
            modified = summary.entities_modified,
            "scene comparison finished"
        );
        Ok(result)
    }

    fn diff_entity(
        &self,
        key: EntityKey,
        source: &Entity,
        base: &Entity,
    ) -> Option<EntityDifference> {
        let classname = source.classname().or_else(|| base.classname());
        let key_values = diff_key_values(source, base);
        let primitives = self.diff_primitives(source, base);
        EntityDifference::modified(key, classname, key_values, primitives)
    }

    /// Multiset difference over primitive fingerprints: removals in base
    /// order, then additions in source order.
    fn diff_primitives(&self, source: &Entity, base: &Entity) -> Vec<PrimitiveDifference> {
        let base_fps: Vec<Fingerprint> = base
            .primitives()
            .iter()
            .map(|p| self.fingerprinter.primitive(p))
            .collect();
        let mut pending = Buckets::default();
        for (index, fp) in base_fps.iter().enumerate() {
            pending.entry(fp.clone()).or_default().push_back(index);
        }

        let mut added = Vec::new();
        for (index, primitive) in source.primitives().iter().enumerate() {
            let fp = self.fingerprinter.primitive(primitive);
            if pending.get_mut(&fp).and_then(VecDeque::pop_front).is_none() {
                added.push(PrimitiveDifference {
                    kind: PrimitiveChange::PrimitiveAdded,
                    index,
                    fingerprint: fp,
                    primitive: primitive.clone(),
                });
            }
        }

        let mut unmatched: Vec<usize> = pending.into_values().flatten().collect();
        unmatched.sort_unstable();
        let mut out: Vec<PrimitiveDifference> = unmatched
            .into_iter()
            .map(|index| PrimitiveDifference {
                kind: PrimitiveChange::PrimitiveRemoved,
                index,
                fingerprint: base_fps[index].clone(),
                primitive: base.primitives()[index].clone(),
            })
            .collect();
        out.extend(added);
        out
    }
}

/// Attribute differences in key order.
fn diff_key_values(source: &Entity, base: &Entity) -> Vec<KeyValueDifference> {
    let keys: BTreeSet<&str> = source
        .key_values
        .keys()
        .chain(base.key_values.keys())
        .map(String::as_str)
        .collect();
    keys.into_iter()
        .filter_map(|key| KeyValueDifference::classify(key, source.key_value(key), base.key_value(key)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::{DifferenceKind, KeyValueChange};
    use mapmerge_dry_tests::{cube_brush, light, patch_grid, worldspawn};
    use mapmerge_scene::{Primitive, SceneError};

    fn compare(source: &SceneRoot, base: &SceneRoot) -> ComparisonResult {
        GraphComparer::default().compare(source, base).unwrap()
    }

    #[test]
    fn identical_scenes_are_equivalent() {
        let scene = SceneRoot::new()
            .with_entity(worldspawn().with_primitive(cube_brush([0.0; 3], 64.0, "stone")))
            .with_entity(light("light_1", "1 1 1"));
        assert!(compare(&scene, &scene.clone()).is_empty());
    }

    #[test]
    fn reordered_entities_are_not_a_change() {
        let a = light("light_1", "1 1 1");
        let b = light("light_2", "0 0 1");
        let source = SceneRoot::new().with_entity(a.clone()).with_entity(b.clone());
        let base = SceneRoot::new().with_entity(b).with_entity(a);
        assert!(compare(&source, &base).is_empty());
    }

    #[test]
    fn changed_key_value() {
        let source = SceneRoot::new().with_entity(light("light_1", "1 0 0"));
        let base = SceneRoot::new().with_entity(light("light_1", "1 1 1"));
        let result = compare(&source, &base);
        assert_eq!(result.len(), 1);
        let diff = &result.differences()[0];
        assert_eq!(diff.kind, DifferenceKind::Modified);
        assert_eq!(diff.key, EntityKey::Named("light_1".into()));
        assert_eq!(diff.key_values.len(), 1);
        let kv = &diff.key_values[0];
        assert_eq!(kv.kind, KeyValueChange::KeyChanged);
        assert_eq!(kv.key, "_color");
        assert_eq!(kv.base_value.as_deref(), Some("1 1 1"));
        assert_eq!(kv.source_value.as_deref(), Some("1 0 0"));
        assert!(diff.primitives.is_empty());
    }

    #[test]
    fn key_differences_follow_key_order() {
        let source = SceneRoot::new().with_entity(
            light("light_1", "1 1 1")
                .with_key_value("spawnflags", "1")
                .with_key_value("angle", "90"),
        );
        let base = SceneRoot::new()
            .with_entity(light("light_1", "1 1 1").with_key_value("target", "door_1"));
        let result = compare(&source, &base);
        let kinds: Vec<(&str, KeyValueChange)> = result.differences()[0]
            .key_values
            .iter()
            .map(|kv| (kv.key.as_str(), kv.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("angle", KeyValueChange::KeyAdded),
                ("spawnflags", KeyValueChange::KeyAdded),
                ("target", KeyValueChange::KeyRemoved),
            ]
        );
    }

    #[test]
    fn added_and_removed_entities_are_ordered() {
        let source = SceneRoot::new()
            .with_entity(worldspawn())
            .with_entity(light("light_new", "1 1 1"));
        let base = SceneRoot::new()
            .with_entity(light("light_old", "1 1 1"))
            .with_entity(worldspawn());
        let result = compare(&source, &base);
        let records: Vec<(DifferenceKind, Option<&str>)> = result
            .iter()
            .map(|d| (d.kind, d.key.name()))
            .collect();
        assert_eq!(
            records,
            vec![
                (DifferenceKind::Added, Some("light_new")),
                (DifferenceKind::Removed, Some("light_old")),
            ]
        );
        assert_eq!(
            result.differences()[0].source_entity(),
            Some(&light("light_new", "1 1 1"))
        );
    }

    #[test]
    fn primitive_multiset_ignores_reordering() {
        let p1 = Primitive::from(cube_brush([0.0; 3], 8.0, "stone"));
        let p2 = Primitive::from(cube_brush([32.0, 0.0, 0.0], 8.0, "stone"));
        let p3 = Primitive::from(patch_grid(3, 3, "water", [0.0, 0.0, 64.0]));
        let p4 = Primitive::from(cube_brush([0.0, 64.0, 0.0], 8.0, "wood"));
        let mut base_world = worldspawn();
        base_world.primitives = vec![p1.clone(), p2.clone(), p3.clone()];
        let mut source_world = worldspawn();
        source_world.primitives = vec![p3, p2, p1, p4.clone()];

        let result = compare(
            &SceneRoot::new().with_entity(source_world),
            &SceneRoot::new().with_entity(base_world),
        );
        assert_eq!(result.len(), 1);
        let prims = &result.differences()[0].primitives;
        assert_eq!(prims.len(), 1);
        assert_eq!(prims[0].kind, PrimitiveChange::PrimitiveAdded);
        assert_eq!(prims[0].index, 3);
        assert_eq!(prims[0].primitive, p4);
    }

    #[test]
    fn modified_primitive_is_remove_plus_add() {
        let before = cube_brush([0.0; 3], 8.0, "stone");
        let mut after = before.clone();
        after.faces[0].plane.dist += 4.0;
        let result = compare(
            &SceneRoot::new().with_entity(worldspawn().with_primitive(after)),
            &SceneRoot::new().with_entity(worldspawn().with_primitive(before)),
        );
        let kinds: Vec<PrimitiveChange> = result.differences()[0]
            .primitives
            .iter()
            .map(|p| p.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![PrimitiveChange::PrimitiveRemoved, PrimitiveChange::PrimitiveAdded]
        );
    }

    #[test]
    fn duplicate_counts_balance() {
        let brush = Primitive::from(cube_brush([0.0; 3], 8.0, "stone"));
        let mut base_world = worldspawn();
        base_world.primitives = vec![brush.clone(), brush.clone(), brush.clone()];
        let mut source_world = worldspawn();
        source_world.primitives = vec![brush];
        let result = compare(
            &SceneRoot::new().with_entity(source_world),
            &SceneRoot::new().with_entity(base_world),
        );
        let prims = &result.differences()[0].primitives;
        assert_eq!(prims.len(), 2);
        assert!(prims.iter().all(|p| p.kind == PrimitiveChange::PrimitiveRemoved));
        assert_eq!(prims[0].index, 1);
        assert_eq!(prims[1].index, 2);
    }

    #[test]
    fn anonymous_entities_pair_by_fingerprint() {
        let spawn = Entity::new("info_player_start").with_key_value("origin", "0 0 0");
        let moved = Entity::new("info_player_start").with_key_value("origin", "0 0 64");
        let source = SceneRoot::new().with_entity(spawn.clone()).with_entity(moved.clone());
        let base = SceneRoot::new().with_entity(spawn);
        let result = compare(&source, &base);
        assert_eq!(result.len(), 1);
        let diff = &result.differences()[0];
        assert_eq!(diff.kind, DifferenceKind::Added);
        assert!(matches!(diff.key, EntityKey::Anonymous(_)));
        assert_eq!(diff.source_entity(), Some(&moved));
    }

    #[test]
    fn duplicate_names_are_never_modified() {
        let source = SceneRoot::new()
            .with_entity(light("dup", "1 0 0"))
            .with_entity(light("dup", "0 1 0"));
        let base = SceneRoot::new().with_entity(light("dup", "1 0 0"));
        let result = compare(&source, &base);
        assert_eq!(result.len(), 1);
        assert_eq!(result.differences()[0].kind, DifferenceKind::Added);
        assert!(result.iter().all(|d| d.kind != DifferenceKind::Modified));
    }

    #[test]
    fn malformed_scene_fails_fast() {
        let mut bad = cube_brush([0.0; 3], 8.0, "stone");
        bad.faces[0].plane.dist = f64::INFINITY;
        let source = SceneRoot::new().with_entity(worldspawn().with_primitive(bad));
        let err = GraphComparer::default()
            .compare(&source, &SceneRoot::new())
            .unwrap_err();
        assert!(err.is_construction());
        assert!(matches!(
            err,
            MergeError::MalformedScene {
                side: SceneSide::Source,
                source: SceneError::NonFiniteValue { .. }
            }
        ));
    }

    #[test]
    fn invalid_settings_fail_fast() {
        let comparer = GraphComparer::new(MergeSettings {
            significant_digits: 99,
            ..MergeSettings::default()
        });
        assert!(matches!(
            comparer.compare(&SceneRoot::new(), &SceneRoot::new()),
            Err(MergeError::InvalidSettings(_))
        ));
    }

    #[test]
    fn subnormal_plane_distances_compare_cleanly() {
        let world_at = |dist: f64| {
            let mut brush = cube_brush([0.0; 3], 8.0, "stone");
            brush.faces[0].plane.dist = dist;
            SceneRoot::new().with_entity(worldspawn().with_primitive(brush))
        };
        let tiny = world_at(-1e-320);
        assert!(compare(&tiny, &tiny.clone()).is_empty());

        let result = compare(&tiny, &world_at(8.0));
        assert_eq!(result.len(), 1);
        assert_eq!(result.differences()[0].primitives.len(), 2);

        let neighbours = compare(&world_at(1e-310), &world_at(1.5e-310));
        assert_eq!(neighbours.len(), 1);
    }

    #[test]
    fn world_name_is_an_attribute_change() {
        let source = SceneRoot::new().with_entity(worldspawn().with_key_value("name", "world"));
        let base = SceneRoot::new().with_entity(worldspawn());
        let result = compare(&source, &base);
        assert_eq!(result.len(), 1);
        let diff = &result.differences()[0];
        assert_eq!(diff.kind, DifferenceKind::Modified);
        assert_eq!(diff.key, EntityKey::Named("worldspawn".into()));
        assert_eq!(diff.key_values.len(), 1);
        assert_eq!(diff.key_values[0].kind, KeyValueChange::KeyAdded);
        assert_eq!(diff.key_values[0].key, "name");
        assert!(diff.primitives.is_empty());

        let reverse = compare(&base, &source);
        assert_eq!(reverse.differences()[0].kind, DifferenceKind::Modified);
        assert_eq!(
            reverse.differences()[0].key_values[0].kind,
            KeyValueChange::KeyRemoved
        );
    }

    #[test]
    fn empty_scenes_are_equivalent() {
        assert!(compare(&SceneRoot::new(), &SceneRoot::new()).is_empty());
    }
}
