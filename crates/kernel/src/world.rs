use glam::Vec3;
use serde::{Deserialize, Serialize};
use testbed_common::{Arena, BodyHandle, ColliderHandle, JointHandle};

use crate::{Collider, ColliderDesc, Joint, JointDesc, RigidBody, RigidBodyDesc};

/// Errors from world construction.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum WorldError {
    #[error("body {0:?} not found")]
    BodyNotFound(BodyHandle),
}

/// Solver and integration settings of a world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegrationParameters {
    pub gravity: Vec3,
    /// Fixed timestep in seconds.
    pub timestep: f32,
    pub velocity_iterations: u32,
    pub position_iterations: u32,
}

impl Default for IntegrationParameters {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            timestep: 1.0 / 60.0,
            velocity_iterations: 4,
            position_iterations: 1,
        }
    }
}

/// The live world: bodies, colliders, joints and integration parameters.
///
/// Demo builders construct one on the foreground side; a physics backend owns
/// an equivalent one on the background side. All sets are slot arenas, so
/// iteration is in ascending handle order and handle allocation is a pure
/// function of the serialized state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    params: IntegrationParameters,
    bodies: Arena<RigidBody>,
    colliders: Arena<Collider>,
    joints: Arena<Joint>,
    tick: u64,
}

impl World {
    /// Create an empty world with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: IntegrationParameters) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    pub fn params(&self) -> &IntegrationParameters {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut IntegrationParameters {
        &mut self.params
    }

    /// Number of completed simulation steps.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Record that a backend completed one step.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle.0)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle.0)
    }

    /// Mutable access to two distinct bodies.
    pub fn body_pair_mut(
        &mut self,
        a: BodyHandle,
        b: BodyHandle,
    ) -> Option<(&mut RigidBody, &mut RigidBody)> {
        self.bodies.get2_mut(a.0, b.0)
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle.0)
    }

    pub fn joint(&self, handle: JointHandle) -> Option<&Joint> {
        self.joints.get(handle.0)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.bodies.iter().map(|(i, b)| (BodyHandle(i), b))
    }

    pub fn bodies_mut(&mut self) -> impl Iterator<Item = (BodyHandle, &mut RigidBody)> {
        self.bodies.iter_mut().map(|(i, b)| (BodyHandle(i), b))
    }

    pub fn colliders(&self) -> impl Iterator<Item = (ColliderHandle, &Collider)> {
        self.colliders.iter().map(|(i, c)| (ColliderHandle(i), c))
    }

    pub fn joints(&self) -> impl Iterator<Item = (JointHandle, &Joint)> {
        self.joints.iter().map(|(i, j)| (JointHandle(i), j))
    }

    pub fn insert_body(&mut self, desc: RigidBodyDesc) -> BodyHandle {
        BodyHandle(self.bodies.insert(desc.build()))
    }

    /// Insert a body at a specific handle, replacing any body already there.
    pub fn insert_body_at(&mut self, handle: BodyHandle, desc: RigidBodyDesc) {
        if self.bodies.insert_at(handle.0, desc.build()).is_some() {
            tracing::debug!(?handle, "replaced existing body");
        }
    }

    /// Attach a collider to `parent`, adding its mass to the parent.
    pub fn insert_collider(
        &mut self,
        desc: ColliderDesc,
        parent: BodyHandle,
    ) -> Result<ColliderHandle, WorldError> {
        let body = self
            .bodies
            .get_mut(parent.0)
            .ok_or(WorldError::BodyNotFound(parent))?;
        let collider = desc.build(parent);
        body.mass += collider.mass();
        let handle = ColliderHandle(self.colliders.insert(collider));
        body.colliders.push(handle);
        Ok(handle)
    }

    /// Attach a collider at a specific handle.
    pub fn insert_collider_at(
        &mut self,
        handle: ColliderHandle,
        desc: ColliderDesc,
        parent: BodyHandle,
    ) -> Result<(), WorldError> {
        if !self.bodies.contains(parent.0) {
            return Err(WorldError::BodyNotFound(parent));
        }
        let collider = desc.build(parent);
        let added_mass = collider.mass();
        if let Some(previous) = self.colliders.insert_at(handle.0, collider) {
            self.detach_collider(handle, &previous);
        }
        if let Some(body) = self.bodies.get_mut(parent.0) {
            body.mass += added_mass;
            body.colliders.push(handle);
        }
        Ok(())
    }

    pub fn insert_joint(
        &mut self,
        desc: JointDesc,
        body1: BodyHandle,
        body2: BodyHandle,
    ) -> Result<JointHandle, WorldError> {
        self.check_joint_bodies(body1, body2)?;
        Ok(JointHandle(self.joints.insert(desc.build(body1, body2))))
    }

    pub fn insert_joint_at(
        &mut self,
        handle: JointHandle,
        desc: JointDesc,
        body1: BodyHandle,
        body2: BodyHandle,
    ) -> Result<(), WorldError> {
        self.check_joint_bodies(body1, body2)?;
        self.joints.insert_at(handle.0, desc.build(body1, body2));
        Ok(())
    }

    /// Override the total mass of a body. Returns false if the body does not exist.
    pub fn set_mass(&mut self, handle: BodyHandle, mass: f32) -> bool {
        match self.bodies.get_mut(handle.0) {
            Some(body) => {
                body.mass = mass;
                true
            }
            None => false,
        }
    }

    /// Remove a body together with its colliders and every joint touching it.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let body = self.bodies.remove(handle.0)?;
        for collider in &body.colliders {
            self.colliders.remove(collider.0);
        }
        let attached: Vec<u32> = self
            .joints
            .iter()
            .filter(|(_, j)| j.body1 == handle || j.body2 == handle)
            .map(|(i, _)| i)
            .collect();
        for joint in attached {
            self.joints.remove(joint);
        }
        Some(body)
    }

    /// Remove a collider, taking its mass away from the parent.
    pub fn remove_collider(&mut self, handle: ColliderHandle) -> Option<Collider> {
        let collider = self.colliders.remove(handle.0)?;
        self.detach_collider(handle, &collider);
        Some(collider)
    }

    pub fn remove_joint(&mut self, handle: JointHandle) -> Option<Joint> {
        self.joints.remove(handle.0)
    }

    fn detach_collider(&mut self, handle: ColliderHandle, collider: &Collider) {
        if let Some(body) = self.bodies.get_mut(collider.parent.0) {
            body.mass -= collider.mass();
            body.colliders.retain(|c| *c != handle);
        }
    }

    fn check_joint_bodies(&self, body1: BodyHandle, body2: BodyHandle) -> Result<(), WorldError> {
        for handle in [body1, body2] {
            if !self.bodies.contains(handle.0) {
                return Err(WorldError::BodyNotFound(handle));
            }
        }
        Ok(())
    }

    /// Compute a deterministic hash of the world state for comparison.
    /// Uses ascending handle order.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        let mix_f32s = |h: &mut u64, values: &[f32]| {
            for v in values {
                mix(h, &v.to_le_bytes());
            }
        };
        mix(&mut h, &self.tick.to_le_bytes());
        for (handle, body) in self.bodies() {
            mix(&mut h, &handle.0.to_le_bytes());
            mix_f32s(&mut h, &body.translation.to_array());
            mix_f32s(&mut h, &body.rotation.to_array());
            mix_f32s(&mut h, &body.linvel.to_array());
            mix_f32s(&mut h, &body.angvel.to_array());
        }
        for (handle, collider) in self.colliders() {
            mix(&mut h, &handle.0.to_le_bytes());
            mix(&mut h, &collider.parent.0.to_le_bytes());
        }
        for (handle, joint) in self.joints() {
            mix(&mut h, &handle.0.to_le_bytes());
            mix(&mut h, &joint.body1.0.to_le_bytes());
            mix(&mut h, &joint.body2.0.to_le_bytes());
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BodyType, ColliderDesc, JointDesc, RigidBodyDesc};

    fn two_body_world() -> (World, BodyHandle, BodyHandle) {
        let mut world = World::new();
        let ground = world.insert_body(RigidBodyDesc::fixed());
        let ball = world.insert_body(RigidBodyDesc::dynamic().translation(0.0, 5.0, 0.0));
        world
            .insert_collider(ColliderDesc::cuboid(10.0, 0.1, 10.0), ground)
            .unwrap();
        world.insert_collider(ColliderDesc::ball(0.5), ball).unwrap();
        (world, ground, ball)
    }

    #[test]
    fn world_starts_empty() {
        let w = World::new();
        assert_eq!(w.tick(), 0);
        assert_eq!(w.body_count(), 0);
        assert_eq!(w.params().timestep, 1.0 / 60.0);
    }

    #[test]
    fn insert_and_remove_body() {
        let (mut world, ground, _) = two_body_world();
        assert_eq!(world.body_count(), 2);
        assert_eq!(world.collider_count(), 2);

        let removed = world.remove_body(ground).unwrap();
        assert_eq!(removed.body_type, BodyType::Static);
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.collider_count(), 1);
    }

    #[test]
    fn collider_requires_existing_parent() {
        let mut world = World::new();
        let err = world
            .insert_collider(ColliderDesc::ball(1.0), BodyHandle(3))
            .unwrap_err();
        assert_eq!(err, WorldError::BodyNotFound(BodyHandle(3)));
    }

    #[test]
    fn collider_mass_accumulates_on_parent() {
        let mut world = World::new();
        let body = world.insert_body(RigidBodyDesc::dynamic().additional_mass(1.0));
        let collider = world
            .insert_collider(ColliderDesc::cuboid(0.5, 0.5, 0.5).density(2.0), body)
            .unwrap();
        assert!((world.body(body).unwrap().mass() - 3.0).abs() < 1e-6);

        world.remove_collider(collider);
        assert!((world.body(body).unwrap().mass() - 1.0).abs() < 1e-6);
        assert!(world.body(body).unwrap().colliders().is_empty());
    }

    #[test]
    fn removing_a_body_drops_its_joints() {
        let (mut world, ground, ball) = two_body_world();
        world
            .insert_joint(JointDesc::ball(Vec3::ZERO, Vec3::Y), ground, ball)
            .unwrap();
        assert_eq!(world.joint_count(), 1);
        world.remove_body(ball);
        assert_eq!(world.joint_count(), 0);
    }

    #[test]
    fn insert_at_reproduces_handles() {
        let mut world = World::new();
        world.insert_body_at(BodyHandle(4), RigidBodyDesc::dynamic());
        world
            .insert_collider_at(ColliderHandle(2), ColliderDesc::ball(0.5), BodyHandle(4))
            .unwrap();
        assert!(world.body(BodyHandle(4)).is_some());
        assert_eq!(world.collider(ColliderHandle(2)).unwrap().parent(), BodyHandle(4));
        assert_eq!(world.insert_body(RigidBodyDesc::fixed()), BodyHandle(0));
    }

    #[test]
    fn set_mass_overrides_total() {
        let (mut world, _, ball) = two_body_world();
        assert!(world.set_mass(ball, 7.5));
        assert_eq!(world.body(ball).unwrap().mass(), 7.5);
        assert!(!world.set_mass(BodyHandle(99), 1.0));
    }

    #[test]
    fn state_hash_deterministic() {
        let (w1, _, _) = two_body_world();
        let (w2, _, _) = two_body_world();
        assert_eq!(w1.state_hash(), w2.state_hash());
    }

    #[test]
    fn state_hash_tracks_motion() {
        let (mut world, _, ball) = two_body_world();
        let before = world.state_hash();
        world.body_mut(ball).unwrap().translation.y -= 0.1;
        assert_ne!(before, world.state_hash());
    }

    #[test]
    fn handle_allocation_survives_clone_after_frees() {
        let mut world = World::new();
        let handles: Vec<BodyHandle> = (0..5)
            .map(|_| world.insert_body(RigidBodyDesc::dynamic()))
            .collect();
        world.remove_body(handles[1]);
        world.remove_body(handles[3]);

        let mut restored = world.clone();
        assert_eq!(
            world.insert_body(RigidBodyDesc::dynamic()),
            restored.insert_body(RigidBodyDesc::dynamic())
        );
    }
}
