use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use testbed_common::ColliderHandle;

/// How a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    /// Never moves.
    Static,
    /// Moved by gravity, contacts and joints.
    Dynamic,
    /// Follows its own velocity, unaffected by forces.
    Kinematic,
}

/// A rigid body stored in a [`crate::World`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub body_type: BodyType,
    pub translation: Vec3,
    pub rotation: Quat,
    pub linvel: Vec3,
    pub angvel: Vec3,
    /// Total mass: explicit mass plus the contribution of every attached collider.
    pub(crate) mass: f32,
    pub(crate) colliders: Vec<ColliderHandle>,
}

impl RigidBody {
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Zero for anything that is not dynamic or has no mass.
    pub fn inv_mass(&self) -> f32 {
        if self.body_type == BodyType::Dynamic && self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    /// Colliders attached to this body, in attachment order.
    pub fn colliders(&self) -> &[ColliderHandle] {
        &self.colliders
    }

    /// Transform a point from body-local space to world space.
    pub fn local_to_world(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * point
    }
}

/// Builder for a rigid body.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyDesc {
    pub body_type: BodyType,
    pub translation: Vec3,
    pub rotation: Quat,
    pub linvel: Vec3,
    pub angvel: Vec3,
    /// Mass added on top of what attached colliders contribute.
    pub additional_mass: f32,
}

impl RigidBodyDesc {
    pub fn new(body_type: BodyType) -> Self {
        Self {
            body_type,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linvel: Vec3::ZERO,
            angvel: Vec3::ZERO,
            additional_mass: 0.0,
        }
    }

    pub fn fixed() -> Self {
        Self::new(BodyType::Static)
    }

    pub fn dynamic() -> Self {
        Self::new(BodyType::Dynamic)
    }

    pub fn kinematic() -> Self {
        Self::new(BodyType::Kinematic)
    }

    pub fn translation(mut self, x: f32, y: f32, z: f32) -> Self {
        self.translation = Vec3::new(x, y, z);
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn linvel(mut self, linvel: Vec3) -> Self {
        self.linvel = linvel;
        self
    }

    pub fn angvel(mut self, angvel: Vec3) -> Self {
        self.angvel = angvel;
        self
    }

    pub fn additional_mass(mut self, mass: f32) -> Self {
        self.additional_mass = mass;
        self
    }

    pub(crate) fn build(self) -> RigidBody {
        RigidBody {
            body_type: self.body_type,
            translation: self.translation,
            rotation: self.rotation,
            linvel: self.linvel,
            angvel: self.angvel,
            mass: self.additional_mass,
            colliders: Vec::new(),
        }
    }
}
