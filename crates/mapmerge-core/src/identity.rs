// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cross-scene entity identity.
//!
//! Entities are matched by their identity attribute (`name` by default). The
//! world entity has no name in level files and is identified by its classname.
//! Entities without a usable identity, or whose identity is not unique in both
//! scenes, fall back to their whole-entity fingerprint.

use mapmerge_scene::{Entity, SceneRoot};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::fingerprint::{Fingerprint, Fingerprinter};
use crate::settings::MergeSettings;

/// How an entity is addressed across the two scenes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum EntityKey {
    /// Unique identity attribute value.
    Named(String),
    /// Whole-entity fingerprint (no usable name).
    Anonymous(Fingerprint),
}

impl EntityKey {
    /// The name, for named keys.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Anonymous(_) => None,
        }
    }
}

impl core::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Named(name) => write!(f, "entity {name:?}"),
            Self::Anonymous(fp) => write!(f, "unnamed entity [{fp}]"),
        }
    }
}

/// The identity an entity declares, before uniqueness is taken into account.
///
/// The world is keyed by its classname; a `name` it carries is an ordinary
/// attribute.
pub(crate) fn declared_identity<'a>(entity: &'a Entity, settings: &'a MergeSettings) -> Option<&'a str> {
    let world = settings.world_classname.as_str();
    if entity.classname() == Some(world) {
        return Some(world);
    }
    entity.key_value(&settings.identity_key)
}

/// Identity index over one scene.
pub(crate) struct SceneIndex<'a> {
    /// Name -> entity index, for uniquely named entities.
    pub(crate) named: FxHashMap<&'a str, usize>,
    /// Per-entity identity, in traversal order (`None` = unidentified).
    pub(crate) identities: Vec<Option<&'a str>>,
}

impl<'a> SceneIndex<'a> {
    /// Index `scene`, treating every name in `ambiguous` as unidentified.
    pub(crate) fn build(
        scene: &'a SceneRoot,
        settings: &'a MergeSettings,
        ambiguous: &FxHashSet<&'a str>,
    ) -> Self {
        let mut named = FxHashMap::default();
        let identities = scene
            .entities()
            .iter()
            .enumerate()
            .map(|(index, entity)| {
                let identity =
                    declared_identity(entity, settings).filter(|name| !ambiguous.contains(name));
                if let Some(name) = identity {
                    named.insert(name, index);
                }
                identity
            })
            .collect();
        Self { named, identities }
    }
}

/// Names declared more than once within `scene`.
pub(crate) fn collect_duplicates<'a>(
    scene: &'a SceneRoot,
    settings: &'a MergeSettings,
    out: &mut FxHashSet<&'a str>,
) {
    let mut seen: FxHashMap<&'a str, usize> = FxHashMap::default();
    for entity in scene.entities() {
        if let Some(name) = declared_identity(entity, settings) {
            *seen.entry(name).or_insert(0) += 1;
        }
    }
    out.extend(seen.into_iter().filter(|(_, n)| *n > 1).map(|(name, _)| name));
}

/// Resolve `key` to an entity index in `scene` at apply time.
pub(crate) fn locate(
    scene: &SceneRoot,
    key: &EntityKey,
    settings: &MergeSettings,
    fingerprinter: &Fingerprinter,
) -> Option<usize> {
    match key {
        EntityKey::Named(name) => scene
            .entities()
            .iter()
            .position(|e| declared_identity(e, settings) == Some(name.as_str())),
        EntityKey::Anonymous(fp) => scene
            .entities()
            .iter()
            .position(|e| fingerprinter.entity(e) == *fp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MergeSettings {
        MergeSettings::default()
    }

    #[test]
    fn declared_identity_by_name_or_world_classname() {
        let s = settings();
        let light = Entity::new("light").with_key_value("name", "light_1");
        assert_eq!(declared_identity(&light, &s), Some("light_1"));
        let world = Entity::new("worldspawn");
        assert_eq!(declared_identity(&world, &s), Some("worldspawn"));
        let anon = Entity::new("info_player_start");
        assert_eq!(declared_identity(&anon, &s), None);
    }

    #[test]
    fn world_ignores_its_name() {
        let s = settings();
        let named_world = Entity::new("worldspawn").with_key_value("name", "world");
        assert_eq!(declared_identity(&named_world, &s), Some("worldspawn"));

        let scene = SceneRoot::new().with_entity(named_world);
        let fp = s.fingerprinter();
        assert_eq!(
            locate(&scene, &EntityKey::Named("worldspawn".into()), &s, &fp),
            Some(0)
        );
        assert_eq!(
            locate(&scene, &EntityKey::Named("world".into()), &s, &fp),
            None
        );
    }

    #[test]
    fn duplicates_are_collected() {
        let s = settings();
        let scene = SceneRoot::new()
            .with_entity(Entity::new("light").with_key_value("name", "dup"))
            .with_entity(Entity::new("light").with_key_value("name", "dup"))
            .with_entity(Entity::new("light").with_key_value("name", "solo"));
        let mut dups = FxHashSet::default();
        collect_duplicates(&scene, &s, &mut dups);
        assert!(dups.contains("dup"));
        assert!(!dups.contains("solo"));

        let index = SceneIndex::build(&scene, &s, &dups);
        assert_eq!(index.identities, vec![None, None, Some("solo")]);
        assert_eq!(index.named.get("solo"), Some(&2));
    }

    #[test]
    fn locate_by_name_and_fingerprint() {
        let s = settings();
        let fp = s.fingerprinter();
        let anon = Entity::new("info_player_start").with_key_value("origin", "0 0 0");
        let scene = SceneRoot::new()
            .with_entity(Entity::new("worldspawn"))
            .with_entity(anon.clone());
        assert_eq!(
            locate(&scene, &EntityKey::Named("worldspawn".into()), &s, &fp),
            Some(0)
        );
        assert_eq!(
            locate(&scene, &EntityKey::Anonymous(fp.entity(&anon)), &s, &fp),
            Some(1)
        );
        assert_eq!(
            locate(&scene, &EntityKey::Named("light_9".into()), &s, &fp),
            None
        );
    }

    #[test]
    fn display_names_the_entity() {
        assert_eq!(
            EntityKey::Named("light_1".into()).to_string(),
            "entity \"light_1\""
        );
    }
}
