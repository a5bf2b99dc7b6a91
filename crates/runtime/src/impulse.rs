use serde::{Deserialize, Serialize};
use testbed_kernel::World;
use testbed_persist::{SnapshotBlob, SnapshotError};
use testbed_protocol::BackendKind;

use crate::backend::{PhysicsBackend, StepStats};
use crate::solver::{self, JointRod};

/// Velocity-level solver: impulses first, then positional correction passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SequentialImpulseBackend {
    world: World,
    rods: Vec<JointRod>,
}

impl SequentialImpulseBackend {
    pub fn new(world: World) -> Self {
        let rods = solver::measure_rods(&world);
        Self { world, rods }
    }
}

impl PhysicsBackend for SequentialImpulseBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::SequentialImpulse
    }

    fn world(&self) -> &World {
        &self.world
    }

    fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    fn step(&mut self, velocity_iterations: u32, position_iterations: u32) -> StepStats {
        let dt = self.world.params().timestep;
        solver::apply_gravity(&mut self.world, dt);

        let shapes = solver::contact_shapes(&self.world);
        let contacts = solver::find_contacts(&self.world, &shapes);
        for _ in 0..velocity_iterations.max(1) {
            solver::solve_contact_velocities(&mut self.world, &contacts);
            solver::solve_joint_velocities(&mut self.world, &self.rods, dt);
        }

        solver::integrate_positions(&mut self.world, dt);

        for _ in 0..position_iterations {
            solver::project_contacts(&mut self.world, &shapes);
            solver::project_joints(&mut self.world, &self.rods);
        }

        self.world.advance_tick();
        StepStats {
            contact_pairs: contacts.len(),
        }
    }

    fn take_snapshot(&self) -> Result<SnapshotBlob, SnapshotError> {
        SnapshotBlob::capture(self)
    }

    fn restore_snapshot(&mut self, blob: &SnapshotBlob) -> Result<(), SnapshotError> {
        *self = blob.restore()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use testbed_kernel::{JointDesc, RigidBodyDesc};

    #[test]
    fn pendulum_keeps_rod_length() {
        let mut world = World::new();
        let pivot = world.insert_body(RigidBodyDesc::fixed().translation(0.0, 5.0, 0.0));
        let bob = world.insert_body(
            RigidBodyDesc::dynamic()
                .translation(1.5, 5.0, 0.0)
                .additional_mass(1.0),
        );
        world
            .insert_joint(JointDesc::ball(Vec3::ZERO, Vec3::ZERO), pivot, bob)
            .unwrap();

        let mut backend = SequentialImpulseBackend::new(world);
        for _ in 0..120 {
            backend.step(8, 4);
        }
        let distance = backend
            .world()
            .body(bob)
            .unwrap()
            .translation
            .distance(Vec3::new(0.0, 5.0, 0.0));
        assert!((distance - 1.5).abs() < 0.05, "rod stretched to {distance}");
    }

    #[test]
    fn zero_position_iterations_still_advances() {
        let mut world = World::new();
        let body = world.insert_body(RigidBodyDesc::dynamic().additional_mass(1.0));
        let mut backend = SequentialImpulseBackend::new(world);
        backend.step(1, 0);
        assert!(backend.world().body(body).unwrap().translation.y < 0.0);
        assert_eq!(backend.world().tick(), 1);
    }
}
