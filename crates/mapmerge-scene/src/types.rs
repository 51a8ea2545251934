// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Primitive geometry values owned by entities.
//!
//! These are pure data. The merge engine treats them as opaque blobs that can
//! be fingerprinted, cloned, and moved between scenes.

use serde::{Deserialize, Serialize};

/// Plane equation `normal · p = dist`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// Unit normal.
    pub normal: [f64; 3],
    /// Distance from the origin along the normal.
    pub dist: f64,
}

impl Plane {
    /// Build a plane from its normal and distance.
    pub const fn new(normal: [f64; 3], dist: f64) -> Self {
        Self { normal, dist }
    }
}

/// Texture projection components of a face (the 2x3 part of the projection matrix).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextureMatrix {
    /// Row 0, column 0.
    pub xx: f64,
    /// Row 1, column 0.
    pub yx: f64,
    /// Translation, column 0.
    pub zx: f64,
    /// Row 0, column 1.
    pub xy: f64,
    /// Row 1, column 1.
    pub yy: f64,
    /// Translation, column 1.
    pub zy: f64,
}

impl TextureMatrix {
    /// Identity projection (no scale, rotation, or shift).
    pub const IDENTITY: Self = Self {
        xx: 1.0,
        yx: 0.0,
        zx: 0.0,
        xy: 0.0,
        yy: 1.0,
        zy: 0.0,
    };

    /// Components in hashing order.
    pub const fn components(&self) -> [f64; 6] {
        [self.xx, self.yx, self.zx, self.xy, self.yy, self.zy]
    }
}

impl Default for TextureMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One brush face.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Face {
    /// Clipping plane of the face.
    pub plane: Plane,
    /// Material (shader) name.
    pub material: String,
    /// Texture projection.
    #[serde(default)]
    pub texture: TextureMatrix,
}

impl Face {
    /// Build a face with the identity texture projection.
    pub fn new(plane: Plane, material: impl Into<String>) -> Self {
        Self {
            plane,
            material: material.into(),
            texture: TextureMatrix::IDENTITY,
        }
    }
}

/// Convex brush described by its face planes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    /// Faces in stored order.
    pub faces: Vec<Face>,
    /// Detail brushes do not seal the level.
    #[serde(default)]
    pub detail: bool,
}

impl Brush {
    /// Build a structural brush.
    pub fn new(faces: Vec<Face>) -> Self {
        Self {
            faces,
            detail: false,
        }
    }

    /// A brush without faces has no geometry.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// One control point of a patch mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchControl {
    /// Position.
    pub vertex: [f64; 3],
    /// Texture coordinate.
    pub texcoord: [f64; 2],
}

/// Bezier patch: a `width` x `height` grid of control points, row-major.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// Columns in the control grid.
    pub width: usize,
    /// Rows in the control grid.
    pub height: usize,
    /// Material (shader) name.
    pub material: String,
    /// Row-major control points.
    pub control_points: Vec<PatchControl>,
}

impl Patch {
    /// Build a patch.
    pub fn new(
        width: usize,
        height: usize,
        material: impl Into<String>,
        control_points: Vec<PatchControl>,
    ) -> Self {
        Self {
            width,
            height,
            material: material.into(),
            control_points,
        }
    }

    /// A patch without control points has no geometry.
    pub fn is_empty(&self) -> bool {
        self.control_points.is_empty()
    }
}

/// Primitive classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    /// A brush.
    Brush,
    /// A patch.
    Patch,
}

impl core::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Brush => f.write_str("brush"),
            Self::Patch => f.write_str("patch"),
        }
    }
}

/// Child geometry owned by an entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Primitive {
    /// Convex brush.
    Brush(Brush),
    /// Curved patch.
    Patch(Patch),
}

impl Primitive {
    /// Classification of this primitive.
    pub const fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Brush(_) => PrimitiveKind::Brush,
            Self::Patch(_) => PrimitiveKind::Patch,
        }
    }

    /// True when the primitive carries no geometry.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Brush(brush) => brush.is_empty(),
            Self::Patch(patch) => patch.is_empty(),
        }
    }
}

impl From<Brush> for Primitive {
    fn from(brush: Brush) -> Self {
        Self::Brush(brush)
    }
}

impl From<Patch> for Primitive {
    fn from(patch: Patch) -> Self {
        Self::Patch(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_json_is_tagged() {
        let prim = Primitive::from(Brush::new(vec![Face::new(
            Plane::new([0.0, 0.0, 1.0], 8.0),
            "textures/common/caulk",
        )]));
        let json = serde_json::to_value(&prim).unwrap();
        assert_eq!(json["type"], "brush");
        let back: Primitive = serde_json::from_value(json).unwrap();
        assert_eq!(back, prim);
    }

    #[test]
    fn missing_texture_defaults_to_identity() {
        let face: Face = serde_json::from_str(
            r#"{"plane":{"normal":[1.0,0.0,0.0],"dist":16.0},"material":"stone"}"#,
        )
        .unwrap();
        assert_eq!(face.texture, TextureMatrix::IDENTITY);
    }

    #[test]
    fn emptiness_follows_geometry() {
        assert!(Primitive::from(Brush::default()).is_empty());
        assert!(Primitive::from(Patch::default()).is_empty());
        let patch = Patch::new(1, 1, "water", vec![PatchControl::default()]);
        assert!(!Primitive::from(patch).is_empty());
    }
}
