//! # engine_math
//!
//! Math types for the ECS engine. Re-exports [`glam`] for linear algebra and
//! defines [`Transform3D`], the component render consumers read.

pub mod transform;

pub use glam::{Mat4, Quat, Vec2, Vec3};

pub use transform::Transform3D;
