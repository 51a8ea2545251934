// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Highlight state for merge preview feedback.

/// Emphasis a renderer applies to an entity while a merge is previewed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Highlight {
    /// The entity will be inserted.
    Added,
    /// The entity will be deleted.
    Removed,
    /// Attributes or primitives of the entity will change.
    Changed,
}

/// Highlight sets keyed by whatever the host uses to address entities.
///
/// Renderers use this to tint entities (green/red/yellow, outline, etc.)
/// before the merge is committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightState<K> {
    /// Entities to be inserted.
    pub added: Vec<K>,
    /// Entities to be deleted.
    pub removed: Vec<K>,
    /// Entities to be modified.
    pub changed: Vec<K>,
}

impl<K> Default for HighlightState<K> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            changed: Vec::new(),
        }
    }
}

impl<K: PartialEq> HighlightState<K> {
    /// Add `key` to the set for `highlight`, once.
    pub fn insert(&mut self, key: K, highlight: Highlight) {
        let set = match highlight {
            Highlight::Added => &mut self.added,
            Highlight::Removed => &mut self.removed,
            Highlight::Changed => &mut self.changed,
        };
        if !set.contains(&key) {
            set.push(key);
        }
    }

    /// Highlight for `key`. Insertions and deletions win over changes.
    pub fn highlight_of(&self, key: &K) -> Option<Highlight> {
        if self.added.contains(key) {
            Some(Highlight::Added)
        } else if self.removed.contains(key) {
            Some(Highlight::Removed)
        } else if self.changed.contains(key) {
            Some(Highlight::Changed)
        } else {
            None
        }
    }

    /// True when nothing is highlighted.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}
