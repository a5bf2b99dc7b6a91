//! Backend-agnostic world description.
//!
//! Produced once per world switch on the foreground side, moved across the
//! boundary by value, and consumed by the background runtime to rebuild an
//! equivalent world. Geometry fields are present only for shapes that define
//! them, so the decoder can tell absence from zero.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use testbed_common::{BodyHandle, ColliderHandle, Rotation, Vector};
use testbed_kernel::{
    BodyType, Collider, ColliderDesc, IntegrationParameters, Joint, JointDesc, JointType,
    RigidBody, RigidBodyDesc, Shape, World,
};

use crate::DecodeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldDescription {
    pub world: WorldParams,
    pub bodies: Vec<BodyRecord>,
    pub colliders: Vec<ColliderRecord>,
    pub joints: Vec<JointRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldParams {
    pub gravity: Vector,
    pub velocity_iterations: u32,
    pub position_iterations: u32,
    pub timestep: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Static,
    Dynamic,
    Kinematic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyRecord {
    pub handle: BodyHandle,
    pub body_type: BodyKind,
    pub translation: Vector,
    #[serde(default, skip_serializing_if = "Rotation::is_identity")]
    pub rotation: Rotation,
    #[serde(default, skip_serializing_if = "Vector::is_zero")]
    pub linvel: Vector,
    #[serde(default, skip_serializing_if = "Vector::is_zero")]
    pub angvel: Vector,
    pub mass: f32,
}

/// Shape vocabulary on the wire. Values this side does not know decode as
/// [`ShapeType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeType {
    Ball,
    Polygon,
    Cuboid,
    Capsule,
    Triangle,
    Trimesh,
    HeightField,
    #[serde(other)]
    Unknown,
}

impl ShapeType {
    pub fn name(self) -> &'static str {
        match self {
            ShapeType::Ball => "Ball",
            ShapeType::Polygon => "Polygon",
            ShapeType::Cuboid => "Cuboid",
            ShapeType::Capsule => "Capsule",
            ShapeType::Triangle => "Triangle",
            ShapeType::Trimesh => "Trimesh",
            ShapeType::HeightField => "HeightField",
            ShapeType::Unknown => "Unknown",
        }
    }

    /// Whether records of this type carry enough geometry to be rebuilt and drawn.
    pub fn has_wire_geometry(self) -> bool {
        matches!(self, ShapeType::Ball | ShapeType::Cuboid | ShapeType::Capsule)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColliderRecord {
    pub handle: ColliderHandle,
    pub parent_handle: BodyHandle,
    pub shape_type: ShapeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half_extents: Option<Vector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half_height: Option<f32>,
    pub density: f32,
    pub friction: f32,
    #[serde(default)]
    pub restitution: f32,
    pub is_sensor: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JointKind {
    Ball,
    Fixed,
    Revolute,
    Prismatic,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JointRecord {
    pub body_handle1: BodyHandle,
    pub body_handle2: BodyHandle,
    pub joint_type: JointKind,
    pub anchor1: Vector,
    pub anchor2: Vector,
    #[serde(default)]
    pub axis1: Vector,
    #[serde(default)]
    pub axis2: Vector,
    #[serde(default)]
    pub frame1: Rotation,
    #[serde(default)]
    pub frame2: Rotation,
}

impl WorldDescription {
    /// Describe a live world. Total: every world the builder API can produce
    /// encodes, and nothing in the result refers back into `world`.
    pub fn encode(world: &World) -> Self {
        let params = world.params();
        Self {
            world: WorldParams {
                gravity: params.gravity.into(),
                velocity_iterations: params.velocity_iterations,
                position_iterations: params.position_iterations,
                timestep: params.timestep,
            },
            bodies: world.bodies().map(|(h, b)| encode_body(h, b)).collect(),
            colliders: world
                .colliders()
                .map(|(h, c)| encode_collider(h, c))
                .collect(),
            joints: world.joints().map(|(_, j)| encode_joint(j)).collect(),
        }
    }

    /// Check that every referenced body exists exactly once.
    pub fn validate(&self) -> Result<(), DecodeError> {
        let mut bodies = BTreeSet::new();
        for body in &self.bodies {
            if !bodies.insert(body.handle) {
                return Err(DecodeError::DuplicateBody(body.handle));
            }
        }
        let mut colliders = BTreeSet::new();
        for collider in &self.colliders {
            if !colliders.insert(collider.handle) {
                return Err(DecodeError::DuplicateCollider(collider.handle));
            }
            if !bodies.contains(&collider.parent_handle) {
                return Err(DecodeError::DanglingCollider {
                    collider: collider.handle,
                    parent: collider.parent_handle,
                });
            }
        }
        for (index, joint) in self.joints.iter().enumerate() {
            for body in [joint.body_handle1, joint.body_handle2] {
                if !bodies.contains(&body) {
                    return Err(DecodeError::DanglingJoint { index, body });
                }
            }
        }
        Ok(())
    }

    /// Rebuild an equivalent live world with the same handles.
    ///
    /// Colliders whose shape has no wire geometry and joints of unknown type
    /// are skipped with a warning; the rest of the world is unaffected.
    pub fn decode(&self) -> Result<World, DecodeError> {
        self.validate()?;
        let mut world = World::with_params(IntegrationParameters {
            gravity: self.world.gravity.into(),
            timestep: self.world.timestep,
            velocity_iterations: self.world.velocity_iterations,
            position_iterations: self.world.position_iterations,
        });

        for body in &self.bodies {
            let mut desc = RigidBodyDesc::new(body.body_type.into())
                .rotation(body.rotation.into())
                .linvel(body.linvel.into())
                .angvel(body.angvel.into());
            desc.translation = body.translation.into();
            world.insert_body_at(body.handle, desc);
        }

        for record in &self.colliders {
            let Some(shape) = decode_shape(record)? else {
                tracing::warn!(
                    collider = record.handle.0,
                    shape = record.shape_type.name(),
                    "skipping collider without wire geometry"
                );
                continue;
            };
            let desc = ColliderDesc::new(shape)
                .density(record.density)
                .friction(record.friction)
                .restitution(record.restitution)
                .sensor(record.is_sensor);
            world
                .insert_collider_at(record.handle, desc, record.parent_handle)
                .map_err(|_| DecodeError::DanglingCollider {
                    collider: record.handle,
                    parent: record.parent_handle,
                })?;
        }

        // Encoded mass is authoritative, whatever the colliders added.
        for body in &self.bodies {
            world.set_mass(body.handle, body.mass);
        }

        for (index, record) in self.joints.iter().enumerate() {
            let Some(desc) = decode_joint(record) else {
                tracing::warn!(index, "skipping joint of unknown type");
                continue;
            };
            world
                .insert_joint(desc, record.body_handle1, record.body_handle2)
                .map_err(|e| match e {
                    testbed_kernel::WorldError::BodyNotFound(body) => {
                        DecodeError::DanglingJoint { index, body }
                    }
                })?;
        }

        Ok(world)
    }

    /// Camera target heuristic: centroid of all dynamic body translations.
    pub fn dynamic_centroid(&self) -> Option<Vector> {
        let dynamic: Vec<Vec3> = self
            .bodies
            .iter()
            .filter(|b| b.body_type == BodyKind::Dynamic)
            .map(|b| Vec3::from(b.translation))
            .collect();
        if dynamic.is_empty() {
            return None;
        }
        let sum: Vec3 = dynamic.iter().copied().sum();
        Some((sum / dynamic.len() as f32).into())
    }
}

impl From<BodyType> for BodyKind {
    fn from(t: BodyType) -> Self {
        match t {
            BodyType::Static => BodyKind::Static,
            BodyType::Dynamic => BodyKind::Dynamic,
            BodyType::Kinematic => BodyKind::Kinematic,
        }
    }
}

impl From<BodyKind> for BodyType {
    fn from(k: BodyKind) -> Self {
        match k {
            BodyKind::Static => BodyType::Static,
            BodyKind::Dynamic => BodyType::Dynamic,
            BodyKind::Kinematic => BodyType::Kinematic,
        }
    }
}

fn encode_body(handle: BodyHandle, body: &RigidBody) -> BodyRecord {
    BodyRecord {
        handle,
        body_type: body.body_type.into(),
        translation: body.translation.into(),
        rotation: body.rotation.into(),
        linvel: body.linvel.into(),
        angvel: body.angvel.into(),
        mass: body.mass(),
    }
}

fn encode_collider(handle: ColliderHandle, collider: &Collider) -> ColliderRecord {
    let mut record = ColliderRecord {
        handle,
        parent_handle: collider.parent(),
        shape_type: ShapeType::Unknown,
        radius: None,
        half_extents: None,
        half_height: None,
        density: collider.density,
        friction: collider.friction,
        restitution: collider.restitution,
        is_sensor: collider.is_sensor,
    };
    match &collider.shape {
        Shape::Ball { radius } => {
            record.shape_type = ShapeType::Ball;
            record.radius = Some(*radius);
        }
        Shape::Cuboid { half_extents } => {
            record.shape_type = ShapeType::Cuboid;
            record.half_extents = Some((*half_extents).into());
        }
        Shape::Capsule {
            half_height,
            radius,
        } => {
            record.shape_type = ShapeType::Capsule;
            record.half_height = Some(*half_height);
            record.radius = Some(*radius);
        }
        other => {
            record.shape_type = match other {
                Shape::Polygon { .. } => ShapeType::Polygon,
                Shape::Triangle { .. } => ShapeType::Triangle,
                Shape::Trimesh { .. } => ShapeType::Trimesh,
                _ => ShapeType::HeightField,
            };
            tracing::warn!(
                collider = handle.0,
                shape = record.shape_type.name(),
                "shape has no wire geometry; encoding generic fields only"
            );
        }
    }
    record
}

fn encode_joint(joint: &Joint) -> JointRecord {
    JointRecord {
        body_handle1: joint.body1(),
        body_handle2: joint.body2(),
        joint_type: match joint.joint_type {
            JointType::Ball => JointKind::Ball,
            JointType::Fixed => JointKind::Fixed,
            JointType::Revolute => JointKind::Revolute,
            JointType::Prismatic => JointKind::Prismatic,
        },
        anchor1: joint.anchor1.into(),
        anchor2: joint.anchor2.into(),
        axis1: joint.axis1.into(),
        axis2: joint.axis2.into(),
        frame1: joint.frame1.into(),
        frame2: joint.frame2.into(),
    }
}

fn decode_shape(record: &ColliderRecord) -> Result<Option<Shape>, DecodeError> {
    let missing = |field| DecodeError::MissingGeometry {
        collider: record.handle,
        shape: record.shape_type.name(),
        field,
    };
    let shape = match record.shape_type {
        ShapeType::Ball => Shape::Ball {
            radius: record.radius.ok_or_else(|| missing("radius"))?,
        },
        ShapeType::Cuboid => Shape::Cuboid {
            half_extents: record
                .half_extents
                .ok_or_else(|| missing("halfExtents"))?
                .into(),
        },
        ShapeType::Capsule => Shape::Capsule {
            half_height: record.half_height.ok_or_else(|| missing("halfHeight"))?,
            radius: record.radius.ok_or_else(|| missing("radius"))?,
        },
        _ => return Ok(None),
    };
    Ok(Some(shape))
}

fn decode_joint(record: &JointRecord) -> Option<JointDesc> {
    let anchor1 = record.anchor1.into();
    let anchor2 = record.anchor2.into();
    let axis1 = record.axis1.into();
    let axis2 = record.axis2.into();
    let desc = match record.joint_type {
        JointKind::Ball => JointDesc::ball(anchor1, anchor2),
        JointKind::Fixed => JointDesc::fixed(
            anchor1,
            Quat::from(record.frame1),
            anchor2,
            Quat::from(record.frame2),
        ),
        JointKind::Revolute => JointDesc::revolute(anchor1, axis1, anchor2, axis2),
        JointKind::Prismatic => JointDesc::prismatic(anchor1, axis1, anchor2, axis2),
        JointKind::Unknown => return None,
    };
    Some(desc)
}
