use testbed_kernel::World;
use testbed_persist::{SnapshotBlob, SnapshotError};
use testbed_protocol::BackendKind;

use crate::impulse::SequentialImpulseBackend;
use crate::pbd::PositionBasedBackend;

/// What a single step observed, for debug reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepStats {
    pub contact_pairs: usize,
}

/// A physics engine the runtime can drive.
///
/// Backends own their world. Snapshots capture the complete backend state,
/// so restoring one and stepping reproduces the original continuation.
pub trait PhysicsBackend: Send {
    fn kind(&self) -> BackendKind;

    fn world(&self) -> &World;

    fn world_mut(&mut self) -> &mut World;

    /// Advance one timestep using the given iteration counts.
    fn step(&mut self, velocity_iterations: u32, position_iterations: u32) -> StepStats;

    fn take_snapshot(&self) -> Result<SnapshotBlob, SnapshotError>;

    fn restore_snapshot(&mut self, blob: &SnapshotBlob) -> Result<(), SnapshotError>;
}

/// Create a backend of the given kind that takes ownership of `world`.
pub fn instantiate(kind: BackendKind, world: World) -> Box<dyn PhysicsBackend> {
    tracing::debug!(%kind, bodies = world.body_count(), "instantiating backend");
    match kind {
        BackendKind::SequentialImpulse => Box::new(SequentialImpulseBackend::new(world)),
        BackendKind::PositionBased => Box::new(PositionBasedBackend::new(world)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testbed_kernel::{ColliderDesc, RigidBodyDesc};

    fn drop_world() -> World {
        let mut world = World::new();
        let ground = world.insert_body(RigidBodyDesc::fixed());
        world
            .insert_collider(ColliderDesc::cuboid(10.0, 0.5, 10.0), ground)
            .unwrap();
        let ball = world.insert_body(RigidBodyDesc::dynamic().translation(0.0, 3.0, 0.0));
        world.insert_collider(ColliderDesc::ball(0.5), ball).unwrap();
        world
    }

    #[test]
    fn every_backend_reports_its_kind() {
        for kind in BackendKind::ALL {
            assert_eq!(instantiate(kind, World::new()).kind(), kind);
        }
    }

    /// Both backends should let a ball fall and come to rest on the ground.
    #[test]
    fn ball_settles_on_ground() {
        for kind in BackendKind::ALL {
            let mut backend = instantiate(kind, drop_world());
            for _ in 0..240 {
                backend.step(4, 1);
            }
            let ball = backend.world().bodies().nth(1).unwrap().1;
            assert!(
                (ball.translation.y - 1.0).abs() < 0.1,
                "{kind}: ball ended at {}",
                ball.translation.y
            );
            assert_eq!(backend.world().tick(), 240);
        }
    }

    #[test]
    fn restore_reproduces_continuation() {
        for kind in BackendKind::ALL {
            let mut backend = instantiate(kind, drop_world());
            for _ in 0..10 {
                backend.step(4, 1);
            }
            let blob = backend.take_snapshot().unwrap();
            for _ in 0..20 {
                backend.step(4, 1);
            }
            let expected = backend.world().state_hash();

            backend.restore_snapshot(&blob).unwrap();
            assert_eq!(backend.world().tick(), 10);
            for _ in 0..20 {
                backend.step(4, 1);
            }
            assert_eq!(backend.world().state_hash(), expected, "{kind}");
        }
    }
}
