use serde::{Deserialize, Serialize};
use testbed_kernel::World;
use testbed_persist::{SnapshotBlob, SnapshotError};
use testbed_protocol::BackendKind;

use crate::backend::{PhysicsBackend, StepStats};
use crate::solver::{self, JointRod};

/// Position-based solver. The velocity iteration count selects the number of
/// substeps; each substep runs a single projection pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PositionBasedBackend {
    world: World,
    rods: Vec<JointRod>,
}

impl PositionBasedBackend {
    pub fn new(world: World) -> Self {
        let rods = solver::measure_rods(&world);
        Self { world, rods }
    }
}

impl PhysicsBackend for PositionBasedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::PositionBased
    }

    fn world(&self) -> &World {
        &self.world
    }

    fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    fn step(&mut self, velocity_iterations: u32, _position_iterations: u32) -> StepStats {
        let substeps = velocity_iterations.max(1);
        let h = self.world.params().timestep / substeps as f32;
        let shapes = solver::contact_shapes(&self.world);

        let mut contact_pairs = 0;
        for _ in 0..substeps {
            let previous = solver::dynamic_translations(&self.world);
            solver::apply_gravity(&mut self.world, h);
            solver::integrate_positions(&mut self.world, h);
            let pairs = solver::project_contacts(&mut self.world, &shapes);
            contact_pairs = contact_pairs.max(pairs);
            solver::project_joints(&mut self.world, &self.rods);
            solver::derive_velocities(&mut self.world, &previous, h);
        }

        self.world.advance_tick();
        StepStats { contact_pairs }
    }

    fn take_snapshot(&self) -> Result<SnapshotBlob, SnapshotError> {
        SnapshotBlob::capture(self)
    }

    fn restore_snapshot(&mut self, blob: &SnapshotBlob) -> Result<(), SnapshotError> {
        *self = blob.restore()?;
        Ok(())
    }
}
