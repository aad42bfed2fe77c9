//! Parallax groups of depth-stacked image planes.
//!
//! Every base texture becomes one [`Group`] laid out side by side along X.
//! Inside a group, plane 0 is the opaque backdrop and the planes in front of
//! it reuse the same image cut out by the shared alpha mask, so the pointer
//! tilt and the depth "breathing" separate them visually.

use glam::{Mat4, Vec2, Vec3};

use crate::textures::{TextureHandle, TextureSet};

/// Geometry and motion constants for the stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackLayout {
    pub planes_per_group: usize,
    /// Distance between consecutive planes; plane `i` rests at `(i + 1) * depth_spacing`.
    pub depth_spacing: f32,
    /// Lateral distance between groups.
    pub group_spacing: f32,
    pub plane_size: Vec2,
    /// Radians of tilt per unit of smoothed pointer offset.
    pub tilt: f32,
    /// Depth displacement at oscillator = 1.
    pub amplitude: f32,
}

impl Default for StackLayout {
    fn default() -> Self {
        Self {
            planes_per_group: 3,
            depth_spacing: 100.0,
            group_spacing: 2500.0,
            plane_size: Vec2::new(1920.0, 1080.0),
            tilt: 0.1,
            amplitude: 200.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blend {
    Opaque,
    /// Alpha taken from the mask texture's green channel.
    Masked { mask: TextureHandle },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Material {
    pub base: TextureHandle,
    pub blend: Blend,
}

impl Material {
    pub fn is_transparent(&self) -> bool {
        matches!(self.blend, Blend::Masked { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    index: usize,
    base_depth: f32,
    depth: f32,
    material: Material,
}

impl Plane {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn base_depth(&self) -> f32 {
        self.base_depth
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn material(&self) -> &Material {
        &self.material
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    position: Vec3,
    /// (pitch, yaw) in radians.
    rotation: Vec2,
    planes: Vec<Plane>,
}

impl Group {
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec2 {
        self.rotation
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Group transform: translation, then pitch about X, then yaw about Y.
    pub fn transform(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_rotation_x(self.rotation.x)
            * Mat4::from_rotation_y(self.rotation.y)
    }

    /// World transform of one of this group's planes.
    pub fn plane_transform(&self, plane: &Plane) -> Mat4 {
        self.transform() * Mat4::from_translation(Vec3::new(0.0, 0.0, plane.depth))
    }
}

#[derive(Debug, Clone)]
pub struct LayerStack {
    groups: Vec<Group>,
    layout: StackLayout,
    textures: TextureSet,
}

impl LayerStack {
    /// One group per base texture in `textures`, each with
    /// `layout.planes_per_group` planes. Zero bases yields an empty stack.
    pub fn build(textures: TextureSet, layout: StackLayout) -> Self {
        let mask = textures.mask();
        let groups = textures
            .bases()
            .iter()
            .enumerate()
            .map(|(lateral, &base)| Group {
                position: Vec3::new(lateral as f32 * layout.group_spacing, 0.0, 0.0),
                rotation: Vec2::ZERO,
                planes: (0..layout.planes_per_group)
                    .map(|index| {
                        let base_depth = (index + 1) as f32 * layout.depth_spacing;
                        let blend = if index == 0 {
                            Blend::Opaque
                        } else {
                            Blend::Masked { mask }
                        };
                        Plane {
                            index,
                            base_depth,
                            depth: base_depth,
                            material: Material { base, blend },
                        }
                    })
                    .collect(),
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            groups = groups.len(),
            planes_per_group = layout.planes_per_group,
            "built layer stack"
        );

        Self {
            groups,
            layout,
            textures,
        }
    }

    /// Tilts every group toward the pointer and displaces every plane by the
    /// oscillator. No-op on an empty stack.
    pub fn apply_frame(&mut self, pointer: Vec2, oscillator: f32) {
        let rotation = Vec2::new(-pointer.y * self.layout.tilt, -pointer.x * self.layout.tilt);
        let offset = oscillator * self.layout.amplitude;
        for group in &mut self.groups {
            group.rotation = rotation;
            for plane in &mut group.planes {
                plane.depth = plane.base_depth - offset;
            }
        }
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn layout(&self) -> &StackLayout {
        &self.layout
    }

    pub fn textures(&self) -> &TextureSet {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureSet {
        &mut self.textures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_with(bases: usize) -> LayerStack {
        let mut textures = TextureSet::new("mask");
        for index in 0..bases {
            textures.add_base(format!("t{index}"));
        }
        LayerStack::build(textures, StackLayout::default())
    }

    #[test]
    fn single_texture_frame_matches_expected_depths() {
        let mut stack = stack_with(1);
        stack.apply_frame(Vec2::ZERO, 0.5);

        let group = &stack.groups()[0];
        assert_eq!(group.rotation(), Vec2::ZERO);
        let depths: Vec<f32> = group.planes().iter().map(Plane::depth).collect();
        assert_eq!(depths, vec![0.0, 100.0, 200.0]);
    }

    #[test]
    fn only_front_planes_are_masked() {
        let stack = stack_with(2);
        for group in stack.groups() {
            let planes = group.planes();
            assert_eq!(planes[0].material().blend, Blend::Opaque);
            for plane in &planes[1..] {
                assert_eq!(
                    plane.material().blend,
                    Blend::Masked {
                        mask: stack.textures().mask()
                    }
                );
            }
        }
        assert_eq!(stack.groups()[1].position().x, 2500.0);
    }

    #[test]
    fn pointer_tilts_every_group() {
        let mut stack = stack_with(3);
        stack.apply_frame(Vec2::new(0.4, -0.2), 0.0);
        for group in stack.groups() {
            assert!((group.rotation().x - 0.02).abs() < 1e-6);
            assert!((group.rotation().y + 0.04).abs() < 1e-6);
            assert_eq!(group.planes()[2].depth(), 300.0);
        }
    }

    #[test]
    fn empty_stack_ignores_frames() {
        let mut stack = stack_with(0);
        assert!(stack.is_empty());
        stack.apply_frame(Vec2::new(1.0, 1.0), 1.0);
        assert!(stack.groups().is_empty());
    }

    #[test]
    fn plane_transform_places_plane_at_depth() {
        let mut stack = stack_with(2);
        stack.apply_frame(Vec2::ZERO, 0.0);
        let group = &stack.groups()[1];
        let origin = group
            .plane_transform(&group.planes()[1])
            .transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(2500.0, 0.0, 200.0)).length() < 1e-3);
    }
}
