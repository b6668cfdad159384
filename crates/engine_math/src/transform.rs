//! Render-facing spatial component.
//!
//! [`Transform3D`] is what the render view hands out. The simulation only
//! writes it on fixed steps; renderers keep the previous step's value and
//! blend with [`Transform3D::interpolate`] using the loop's alpha.

use engine_component::Component;
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position, rotation, and per-axis scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform3D {
    /// World-space position.
    pub position: Vec3,
    /// Unit quaternion.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Transform3D {
    /// Origin, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Identity rotation and scale at `position`.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Identity rotation and scale at `(x, y, z)`.
    #[must_use]
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self::from_position(Vec3::new(x, y, z))
    }

    /// Model matrix for the renderer.
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Moves the transform by `offset`.
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    /// Blends from `previous` (alpha 0) to `self` (alpha 1).
    ///
    /// Position and scale are interpolated linearly, rotation spherically.
    /// `alpha` is clamped to `[0, 1]`.
    #[must_use]
    pub fn interpolate(&self, previous: &Self, alpha: f32) -> Self {
        let t = alpha.clamp(0.0, 1.0);
        Self {
            position: previous.position.lerp(self.position, t),
            rotation: previous.rotation.slerp(self.rotation, t),
            scale: previous.scale.lerp(self.scale, t),
        }
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Component for Transform3D {
    fn type_name() -> &'static str {
        "Transform3D"
    }
}
