use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use testbed_common::BodyHandle;

/// Geometric shape of a collider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Ball { radius: f32 },
    Cuboid { half_extents: Vec3 },
    /// Capsule aligned with the local `y` axis.
    Capsule { half_height: f32, radius: f32 },
    Polygon { vertices: Vec<Vec3> },
    Triangle { a: Vec3, b: Vec3, c: Vec3 },
    Trimesh { vertices: Vec<Vec3>, indices: Vec<[u32; 3]> },
    HeightField {
        nrows: usize,
        ncols: usize,
        heights: Vec<f32>,
        scale: Vec3,
    },
}

impl Shape {
    /// Enclosed volume. Surface-only shapes have none.
    pub fn volume(&self) -> f32 {
        match self {
            Shape::Ball { radius } => 4.0 / 3.0 * PI * radius.powi(3),
            Shape::Cuboid { half_extents } => 8.0 * half_extents.x * half_extents.y * half_extents.z,
            Shape::Capsule {
                half_height,
                radius,
            } => PI * radius * radius * 2.0 * half_height + 4.0 / 3.0 * PI * radius.powi(3),
            Shape::Polygon { .. }
            | Shape::Triangle { .. }
            | Shape::Trimesh { .. }
            | Shape::HeightField { .. } => 0.0,
        }
    }

    /// Half extents of the local axis-aligned box, for shapes with a closed form.
    pub fn local_half_extents(&self) -> Option<Vec3> {
        match self {
            Shape::Ball { radius } => Some(Vec3::splat(*radius)),
            Shape::Cuboid { half_extents } => Some(*half_extents),
            Shape::Capsule {
                half_height,
                radius,
            } => Some(Vec3::new(*radius, half_height + radius, *radius)),
            _ => None,
        }
    }
}

/// A collider stored in a [`crate::World`], attached to exactly one body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub shape: Shape,
    pub(crate) parent: BodyHandle,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub is_sensor: bool,
}

impl Collider {
    pub fn parent(&self) -> BodyHandle {
        self.parent
    }

    /// Mass this collider adds to its parent body.
    pub fn mass(&self) -> f32 {
        self.density * self.shape.volume()
    }
}

/// Builder for a collider.
#[derive(Debug, Clone, PartialEq)]
pub struct ColliderDesc {
    pub shape: Shape,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub is_sensor: bool,
}

impl ColliderDesc {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            density: 1.0,
            friction: 0.5,
            restitution: 0.0,
            is_sensor: false,
        }
    }

    pub fn ball(radius: f32) -> Self {
        Self::new(Shape::Ball { radius })
    }

    pub fn cuboid(hx: f32, hy: f32, hz: f32) -> Self {
        Self::new(Shape::Cuboid {
            half_extents: Vec3::new(hx, hy, hz),
        })
    }

    pub fn capsule(half_height: f32, radius: f32) -> Self {
        Self::new(Shape::Capsule {
            half_height,
            radius,
        })
    }

    pub fn density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn sensor(mut self, is_sensor: bool) -> Self {
        self.is_sensor = is_sensor;
        self
    }

    pub(crate) fn build(self, parent: BodyHandle) -> Collider {
        Collider {
            shape: self.shape,
            parent,
            density: self.density,
            friction: self.friction,
            restitution: self.restitution,
            is_sensor: self.is_sensor,
        }
    }
}
