// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Brush, patch, entity and scene builders for tests.

use mapmerge_scene::{Brush, Entity, Face, Patch, PatchControl, Plane, Primitive, SceneRoot};

/// Axis-aligned cube of half-extent `half` centred on `origin`, all six faces
/// using `material`.
pub fn cube_brush(origin: [f64; 3], half: f64, material: &str) -> Brush {
    let mut faces = Vec::with_capacity(6);
    for axis in 0..3 {
        for sign in [1.0, -1.0] {
            let mut normal = [0.0; 3];
            normal[axis] = sign;
            let dist = sign * origin[axis] + half;
            faces.push(Face::new(Plane::new(normal, dist), material));
        }
    }
    Brush::new(faces)
}

/// Flat `width` x `height` patch in the XY plane starting at `origin`, with
/// control points 16 units apart and texcoords spanning `0..=1`.
pub fn patch_grid(width: usize, height: usize, material: &str, origin: [f64; 3]) -> Patch {
    let span = |n: usize, i: usize| {
        if n > 1 {
            i as f64 / (n - 1) as f64
        } else {
            0.0
        }
    };
    let mut control_points = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            control_points.push(PatchControl {
                vertex: [
                    origin[0] + 16.0 * col as f64,
                    origin[1] + 16.0 * row as f64,
                    origin[2],
                ],
                texcoord: [span(width, col), span(height, row)],
            });
        }
    }
    Patch::new(width, height, material, control_points)
}

/// Unnamed world entity.
pub fn worldspawn() -> Entity {
    Entity::new("worldspawn")
}

/// Named light with a `_color` attribute.
pub fn light(name: &str, color: &str) -> Entity {
    named("light", name).with_key_value("_color", color)
}

/// Entity of `classname` carrying a `name` attribute.
pub fn named(classname: &str, name: &str) -> Entity {
    Entity::new(classname).with_key_value("name", name)
}

/// Builder for a [`SceneRoot`].
///
/// # Example
///
/// ```
/// use mapmerge_dry_tests::SceneBuilder;
///
/// let scene = SceneBuilder::new()
///     .world_brush([0.0, 0.0, 0.0], 64.0, "stone")
///     .light("light_1", "1 1 1")
///     .build();
///
/// assert_eq!(scene.len(), 2);
/// assert_eq!(scene.primitive_count(), 1);
/// ```
#[derive(Default)]
pub struct SceneBuilder {
    world: Option<Entity>,
    entities: Vec<Entity>,
}

impl SceneBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cube brush to the world entity (created on first use).
    pub fn world_brush(self, origin: [f64; 3], half: f64, material: &str) -> Self {
        self.world_primitive(cube_brush(origin, half, material).into())
    }

    /// Add any primitive to the world entity (created on first use).
    pub fn world_primitive(mut self, primitive: Primitive) -> Self {
        self.world
            .get_or_insert_with(worldspawn)
            .add_primitive(primitive);
        self
    }

    /// Add a named light.
    pub fn light(self, name: &str, color: &str) -> Self {
        self.entity(light(name, color))
    }

    /// Add an arbitrary entity.
    pub fn entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Build the scene; the world entity, if any, comes first.
    pub fn build(self) -> SceneRoot {
        let mut scene = SceneRoot::new();
        if let Some(world) = self.world {
            scene.add_entity(world);
        }
        for entity in self.entities {
            scene.add_entity(entity);
        }
        scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_six_outward_faces() {
        let cube = cube_brush([8.0, 0.0, 0.0], 4.0, "stone");
        assert_eq!(cube.faces.len(), 6);
        assert_eq!(cube.faces[0].plane.normal, [1.0, 0.0, 0.0]);
        assert!((cube.faces[0].plane.dist - 12.0).abs() < f64::EPSILON);
        assert!((cube.faces[1].plane.dist - -4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn patch_grid_is_full() {
        let patch = patch_grid(3, 2, "water", [0.0; 3]);
        assert_eq!(patch.control_points.len(), 6);
        assert_eq!(patch.control_points[5].vertex, [32.0, 16.0, 0.0]);
        assert_eq!(patch.control_points[5].texcoord, [1.0, 1.0]);
    }

    #[test]
    fn builder_puts_world_first() {
        let scene = SceneBuilder::new()
            .light("light_1", "1 1 1")
            .world_brush([0.0; 3], 8.0, "stone")
            .world_brush([32.0, 0.0, 0.0], 8.0, "stone")
            .build();
        assert_eq!(scene.entities()[0].classname(), Some("worldspawn"));
        assert_eq!(scene.entities()[0].primitives().len(), 2);
        assert_eq!(scene.entities()[1].key_value("name"), Some("light_1"));
    }
}
