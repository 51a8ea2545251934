// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Content fingerprints for primitives and entities.
//!
//! A fingerprint is a BLAKE3 digest over a domain-separated, canonicalized byte
//! stream, rendered as lowercase hex. Floats go through
//! [`canonicalize_f64`] first so editor noise below the configured precision
//! does not change the digest.
//!
//! Ordering rules:
//! - faces, control points and primitives are hashed in stored order;
//! - attributes are hashed in key order (the map is sorted).

use blake3::Hasher;
use mapmerge_scene::{canonicalize_f64, Brush, Entity, Patch, Primitive};
use serde::{Deserialize, Serialize};

use crate::settings::DEFAULT_SIGNIFICANT_DIGITS;

/// Hex-encoded content digest. The empty string is the "no geometry" sentinel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Sentinel for empty brushes, empty patches and empty primitive lists.
    pub const EMPTY: Self = Self(String::new());

    /// Hex digest (empty for the sentinel).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the sentinel.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First 12 hex digits, for logs and reports.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }

    fn from_hasher(hasher: &Hasher) -> Self {
        Self(hex::encode(hasher.finalize().as_bytes()))
    }
}

impl core::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            f.write_str("<empty>")
        } else {
            f.write_str(self.short())
        }
    }
}

/// Computes fingerprints at a fixed precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fingerprinter {
    significant_digits: u32,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNIFICANT_DIGITS)
    }
}

impl Fingerprinter {
    /// Fingerprinter rounding floats to `significant_digits`.
    pub const fn new(significant_digits: u32) -> Self {
        Self { significant_digits }
    }

    /// Configured precision.
    pub const fn significant_digits(&self) -> u32 {
        self.significant_digits
    }

    /// Fingerprint of one primitive.
    pub fn primitive(&self, primitive: &Primitive) -> Fingerprint {
        match primitive {
            Primitive::Brush(brush) => self.brush(brush),
            Primitive::Patch(patch) => self.patch(patch),
        }
    }

    /// Fingerprint of a brush: detail flag, face count, then per face the plane,
    /// material and texture projection.
    pub fn brush(&self, brush: &Brush) -> Fingerprint {
        if brush.is_empty() {
            return Fingerprint::EMPTY;
        }
        let mut h = Hasher::new();
        h.update(b"mapmerge:brush:v1");
        h.update(&[u8::from(brush.detail)]);
        put_len(&mut h, brush.faces.len());
        for face in &brush.faces {
            self.put_floats(&mut h, &face.plane.normal);
            self.put_float(&mut h, face.plane.dist);
            put_str(&mut h, &face.material);
            self.put_floats(&mut h, &face.texture.components());
        }
        Fingerprint::from_hasher(&h)
    }

    /// Fingerprint of a patch: grid size, material, then every control point.
    pub fn patch(&self, patch: &Patch) -> Fingerprint {
        if patch.is_empty() {
            return Fingerprint::EMPTY;
        }
        let mut h = Hasher::new();
        h.update(b"mapmerge:patch:v1");
        put_len(&mut h, patch.width);
        put_len(&mut h, patch.height);
        put_str(&mut h, &patch.material);
        for ctrl in &patch.control_points {
            self.put_floats(&mut h, &ctrl.vertex);
            self.put_floats(&mut h, &ctrl.texcoord);
        }
        Fingerprint::from_hasher(&h)
    }

    /// Fingerprint of a primitive collection: count, then every primitive
    /// fingerprint in stored order. An empty collection yields the sentinel.
    pub fn primitives(&self, primitives: &[Primitive]) -> Fingerprint {
        if primitives.is_empty() {
            return Fingerprint::EMPTY;
        }
        let mut h = Hasher::new();
        h.update(b"mapmerge:primitives:v1");
        put_len(&mut h, primitives.len());
        for primitive in primitives {
            put_str(&mut h, self.primitive(primitive).as_str());
        }
        Fingerprint::from_hasher(&h)
    }

    /// Fingerprint of a whole entity: attributes in key order plus its
    /// primitive collection. Used to pair entities that carry no usable name.
    pub fn entity(&self, entity: &Entity) -> Fingerprint {
        let mut h = Hasher::new();
        h.update(b"mapmerge:entity:v1");
        put_len(&mut h, entity.key_values.len());
        for (key, value) in &entity.key_values {
            put_str(&mut h, key);
            put_str(&mut h, value);
        }
        put_str(&mut h, self.primitives(&entity.primitives).as_str());
        Fingerprint::from_hasher(&h)
    }

    fn put_float(&self, h: &mut Hasher, value: f64) {
        h.update(&canonicalize_f64(value, self.significant_digits).to_le_bytes());
    }

    fn put_floats(&self, h: &mut Hasher, values: &[f64]) {
        for value in values {
            self.put_float(h, *value);
        }
    }
}

fn put_len(h: &mut Hasher, len: usize) {
    h.update(&(len as u64).to_le_bytes());
}

// Length prefix keeps ("ab", "c") and ("a", "bc") apart.
fn put_str(h: &mut Hasher, s: &str) {
    put_len(h, s.len());
    h.update(s.as_bytes());
}

/// Primitive-collection fingerprint of `entity` at the default precision.
pub fn fingerprint(entity: &Entity) -> Fingerprint {
    Fingerprinter::default().primitives(&entity.primitives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapmerge_dry_tests::{cube_brush, patch_grid};
    use mapmerge_scene::{Face, Plane};
    use proptest::prelude::*;

    fn slab(dist: f64) -> Brush {
        Brush::new(vec![
            Face::new(Plane::new([0.0, 0.0, 1.0], dist), "textures/base/floor"),
            Face::new(Plane::new([0.0, 0.0, -1.0], 0.0), "textures/common/caulk"),
        ])
    }

    #[test]
    fn deterministic() {
        let fp = Fingerprinter::default();
        let brush = cube_brush([0.0, 0.0, 0.0], 16.0, "stone");
        assert_eq!(fp.brush(&brush), fp.brush(&brush.clone()));
        assert_eq!(fp.brush(&brush).as_str().len(), 64);
    }

    #[test]
    fn empty_inputs_yield_sentinel() {
        let fp = Fingerprinter::default();
        assert_eq!(fp.brush(&Brush::default()), Fingerprint::EMPTY);
        assert_eq!(fp.patch(&Patch::default()), Fingerprint::EMPTY);
        assert_eq!(fp.primitives(&[]), Fingerprint::EMPTY);
        assert_eq!(fingerprint(&Entity::new("info_player_start")), Fingerprint::EMPTY);
    }

    #[test]
    fn sub_precision_noise_is_ignored() {
        let fp = Fingerprinter::default();
        assert_eq!(fp.brush(&slab(64.0)), fp.brush(&slab(64.000_000_1)));
    }

    #[test]
    fn real_edits_change_the_fingerprint() {
        let fp = Fingerprinter::default();
        assert_ne!(fp.brush(&slab(64.0)), fp.brush(&slab(64.5)));
    }

    #[test]
    fn precision_is_configurable() {
        let coarse = Fingerprinter::new(2);
        let fine = Fingerprinter::new(6);
        assert_eq!(coarse.brush(&slab(64.0)), coarse.brush(&slab(64.2)));
        assert_ne!(fine.brush(&slab(64.0)), fine.brush(&slab(64.2)));
    }

    #[test]
    fn material_and_detail_flag_matter() {
        let fp = Fingerprinter::default();
        let base = cube_brush([0.0, 0.0, 0.0], 8.0, "stone");
        let mut retextured = base.clone();
        retextured.faces[2].material = "wood".to_owned();
        let mut detail = base.clone();
        detail.detail = true;
        assert_ne!(fp.brush(&base), fp.brush(&retextured));
        assert_ne!(fp.brush(&base), fp.brush(&detail));
    }

    #[test]
    fn texture_projection_matters() {
        let fp = Fingerprinter::default();
        let base = slab(32.0);
        let mut shifted = base.clone();
        shifted.faces[0].texture.zx = 0.25;
        assert_ne!(fp.brush(&base), fp.brush(&shifted));
    }

    #[test]
    fn face_order_is_structural() {
        let fp = Fingerprinter::default();
        let base = slab(32.0);
        let mut reversed = base.clone();
        reversed.faces.reverse();
        assert_ne!(fp.brush(&base), fp.brush(&reversed));
    }

    #[test]
    fn primitive_count_always_distinguishes() {
        let fp = Fingerprinter::default();
        let one = vec![Primitive::from(slab(8.0))];
        let two = vec![Primitive::from(slab(8.0)), Primitive::from(slab(8.0))];
        assert_ne!(fp.primitives(&one), fp.primitives(&two));
        assert_ne!(fp.primitives(&[]), fp.primitives(&one));
    }

    #[test]
    fn patches_hash_their_grid() {
        let fp = Fingerprinter::default();
        let patch = patch_grid(3, 3, "water", [0.0, 0.0, 0.0]);
        let mut moved = patch.clone();
        moved.control_points[4].vertex[2] += 4.0;
        assert_ne!(fp.patch(&patch), fp.patch(&moved));
        assert_eq!(fp.patch(&patch), fp.patch(&patch_grid(3, 3, "water", [0.0, 0.0, 0.0])));
    }

    #[test]
    fn brush_and_patch_never_collide() {
        let fp = Fingerprinter::default();
        let brush = Primitive::from(slab(0.0));
        let patch = Primitive::from(patch_grid(1, 1, "textures/base/floor", [0.0, 0.0, 0.0]));
        assert_ne!(fp.primitive(&brush), fp.primitive(&patch));
    }

    #[test]
    fn entity_fingerprint_covers_attributes() {
        let fp = Fingerprinter::default();
        let a = Entity::new("func_static").with_primitive(slab(8.0));
        let b = a.clone().with_key_value("model", "func_static_1");
        assert_ne!(fp.entity(&a), fp.entity(&b));
        assert_eq!(fp.primitives(&a.primitives), fp.primitives(&b.primitives));
    }

    #[test]
    fn display_is_short_or_sentinel() {
        let fp = Fingerprinter::default();
        assert_eq!(Fingerprint::EMPTY.to_string(), "<empty>");
        assert_eq!(fp.brush(&slab(1.0)).to_string().len(), 12);
    }

    proptest! {
        #[test]
        fn primitive_order_is_significant(a in 0i32..8, b in 0i32..8) {
            prop_assume!(a != b);
            let fp = Fingerprinter::default();
            let first = Primitive::from(cube_brush([f64::from(a) * 16.0, 0.0, 0.0], 4.0, "stone"));
            let second = Primitive::from(cube_brush([f64::from(b) * 16.0, 0.0, 0.0], 4.0, "stone"));
            prop_assert_ne!(
                fp.primitives(&[first.clone(), second.clone()]),
                fp.primitives(&[second, first])
            );
        }

        #[test]
        fn attribute_insertion_order_is_irrelevant(keys in prop::collection::btree_set("[a-z]{1,6}", 1..6)) {
            let fp = Fingerprinter::default();
            let mut forward = Entity::new("info_null");
            let mut backward = Entity::new("info_null");
            for key in &keys {
                forward.set_key_value(key.clone(), "1");
            }
            for key in keys.iter().rev() {
                backward.set_key_value(key.clone(), "1");
            }
            prop_assert_eq!(fp.entity(&forward), fp.entity(&backward));
        }
    }
}
