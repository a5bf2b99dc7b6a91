use std::time::Instant;

use testbed_kernel::{IntegrationParameters, World};
use testbed_persist::{SnapshotBlob, SnapshotError};
use testbed_protocol::{
    ColliderPosition, DebugInfo, SetWorld, Step, StepResult, ToBackground, Token, TransportError,
    WorldParams,
};

use crate::backend::{PhysicsBackend, StepStats, instantiate};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("step received before any world was set")]
    NoWorld,
    #[error("snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("worker thread panicked")]
    WorkerPanicked,
}

impl RuntimeError {
    /// Whether the worker must stop after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RuntimeError::Snapshot(_))
    }
}

/// Background half of the protocol: one backend, one token, one snapshot slot.
#[derive(Default)]
pub struct BackgroundRuntime {
    token: Token,
    backend: Option<Box<dyn PhysicsBackend>>,
    snapshot: Option<SnapshotBlob>,
}

impl BackgroundRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token of the world currently loaded.
    pub fn token(&self) -> Token {
        self.token
    }

    pub fn world(&self) -> Option<&World> {
        self.backend.as_deref().map(|b| b.world())
    }

    /// Process one message. Returns the result to send back, if the message
    /// produces one.
    pub fn handle(&mut self, message: ToBackground) -> Result<Option<StepResult>, RuntimeError> {
        match message {
            ToBackground::SetWorld(set_world) => self.set_world(set_world).map(Some),
            ToBackground::Step(step) => self.step(step).map(Some),
            ToBackground::TakeSnapshot => {
                self.take_snapshot()?;
                Ok(None)
            }
            ToBackground::RestoreSnapshot => {
                self.restore_snapshot()?;
                Ok(None)
            }
        }
    }

    /// Adopt the new token before decoding. A rejected description still
    /// replaces the old world, with an empty one under the described
    /// parameters, so every later reply carries the new token.
    fn set_world(&mut self, message: SetWorld) -> Result<StepResult, RuntimeError> {
        let _span = tracing::info_span!("set_world", token = message.token.0).entered();
        self.token = message.token;
        self.backend = None;
        self.snapshot = None;

        let world = match message.world.decode() {
            Ok(world) => {
                tracing::info!(
                    backend = %message.backend,
                    bodies = message.world.bodies.len(),
                    colliders = message.world.colliders.len(),
                    joints = message.world.joints.len(),
                    "world loaded"
                );
                world
            }
            Err(err) => {
                tracing::warn!(
                    %err,
                    backend = %message.backend,
                    "world rejected, loading empty world"
                );
                World::with_params(empty_params(&message.world.world))
            }
        };
        let params = *world.params();
        self.backend = Some(instantiate(message.backend, world));

        self.step(Step {
            velocity_iterations: params.velocity_iterations,
            position_iterations: params.position_iterations,
            running: true,
            debug_infos: false,
        })
    }

    fn step(&mut self, step: Step) -> Result<StepResult, RuntimeError> {
        let backend = self.backend.as_deref_mut().ok_or(RuntimeError::NoWorld)?;

        let start = Instant::now();
        let stats = if step.running {
            backend.step(step.velocity_iterations, step.position_iterations)
        } else {
            StepStats::default()
        };
        let step_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        let world = backend.world();
        let debug_info = step.debug_infos.then(|| DebugInfo {
            contact_pairs: stats.contact_pairs,
            joints: world.joint_count(),
            active_bodies: world.bodies().filter(|(_, b)| b.is_dynamic()).count(),
            tick: world.tick(),
        });
        tracing::trace!(tick = world.tick(), running = step.running, step_time_ms, "step");

        Ok(StepResult {
            token: self.token,
            positions: collider_positions(world),
            step_time_ms,
            debug_info,
        })
    }

    fn take_snapshot(&mut self) -> Result<(), RuntimeError> {
        let Some(backend) = self.backend.as_deref() else {
            tracing::warn!("takeSnapshot ignored: no world");
            return Ok(());
        };
        let blob = backend.take_snapshot()?;
        tracing::debug!(bytes = blob.len(), tick = backend.world().tick(), "snapshot taken");
        self.snapshot = Some(blob);
        Ok(())
    }

    fn restore_snapshot(&mut self) -> Result<(), RuntimeError> {
        let (Some(backend), Some(blob)) = (self.backend.as_deref_mut(), self.snapshot.as_ref())
        else {
            tracing::warn!("restoreSnapshot ignored: nothing to restore");
            return Ok(());
        };
        backend.restore_snapshot(blob)?;
        tracing::debug!(tick = backend.world().tick(), "snapshot restored");
        Ok(())
    }
}

fn empty_params(params: &WorldParams) -> IntegrationParameters {
    IntegrationParameters {
        gravity: params.gravity.into(),
        timestep: params.timestep,
        velocity_iterations: params.velocity_iterations,
        position_iterations: params.position_iterations,
    }
}

/// World pose of every collider, in ascending handle order.
fn collider_positions(world: &World) -> Vec<ColliderPosition> {
    world
        .colliders()
        .filter_map(|(handle, collider)| {
            let body = world.body(collider.parent())?;
            Some(ColliderPosition {
                handle,
                translation: body.translation.into(),
                rotation: body.rotation.into(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use testbed_common::{ColliderHandle, Vector};
    use testbed_kernel::{ColliderDesc, RigidBodyDesc};
    use testbed_protocol::{BackendKind, WorldDescription};

    fn ground_and_ball() -> WorldDescription {
        let mut world = World::new();
        let ground = world.insert_body(RigidBodyDesc::fixed());
        world
            .insert_collider(ColliderDesc::cuboid(10.0, 0.1, 10.0), ground)
            .unwrap();
        let ball = world.insert_body(RigidBodyDesc::dynamic().translation(0.0, 5.0, 0.0));
        world.insert_collider(ColliderDesc::ball(0.5), ball).unwrap();
        WorldDescription::encode(&world)
    }

    fn set_world(token: u64) -> ToBackground {
        ToBackground::SetWorld(SetWorld {
            backend: BackendKind::SequentialImpulse,
            token: Token(token),
            world: ground_and_ball(),
        })
    }

    fn step(running: bool, debug_infos: bool) -> ToBackground {
        ToBackground::Step(Step {
            velocity_iterations: 4,
            position_iterations: 1,
            running,
            debug_infos,
        })
    }

    #[test]
    fn set_world_replies_with_first_step() {
        let mut runtime = BackgroundRuntime::new();
        let result = runtime.handle(set_world(1)).unwrap().unwrap();
        assert_eq!(result.token, Token(1));
        assert_eq!(result.positions.len(), 2);

        let ground = &result.positions[0];
        assert_eq!(ground.handle, ColliderHandle(0));
        assert_eq!(ground.translation, Vector::ZERO);

        let ball = &result.positions[1];
        assert!(ball.translation.y < 5.0);
        assert!(result.step_time_ms >= 0.0);
        assert!(result.debug_info.is_none());
    }

    #[test]
    fn step_before_set_world_is_fatal() {
        let mut runtime = BackgroundRuntime::new();
        let err = runtime.handle(step(true, false)).unwrap_err();
        assert!(matches!(err, RuntimeError::NoWorld));
        assert!(err.is_fatal());
    }

    #[test]
    fn paused_step_replies_without_advancing() {
        let mut runtime = BackgroundRuntime::new();
        runtime.handle(set_world(1)).unwrap();
        let tick = runtime.world().unwrap().tick();
        let result = runtime.handle(step(false, true)).unwrap().unwrap();
        assert_eq!(runtime.world().unwrap().tick(), tick);
        assert_eq!(result.debug_info.unwrap().tick, tick);
    }

    #[test]
    fn snapshot_messages_produce_no_reply() {
        let mut runtime = BackgroundRuntime::new();
        assert!(runtime.handle(ToBackground::TakeSnapshot).unwrap().is_none());
        runtime.handle(set_world(1)).unwrap();
        assert!(runtime.handle(ToBackground::TakeSnapshot).unwrap().is_none());
        assert!(runtime.handle(ToBackground::RestoreSnapshot).unwrap().is_none());
    }

    /// Restoring and stepping again must reproduce the same positions.
    #[test]
    fn restore_replays_deterministically() {
        let mut runtime = BackgroundRuntime::new();
        runtime.handle(set_world(1)).unwrap();
        runtime.handle(ToBackground::TakeSnapshot).unwrap();
        let first: Vec<_> = (0..5)
            .map(|_| runtime.handle(step(true, false)).unwrap().unwrap().positions)
            .collect();

        runtime.handle(ToBackground::RestoreSnapshot).unwrap();
        let second: Vec<_> = (0..5)
            .map(|_| runtime.handle(step(true, false)).unwrap().unwrap().positions)
            .collect();
        assert_eq!(first, second);
        assert_eq!(runtime.token(), Token(1));
    }

    #[test]
    fn new_world_clears_snapshot() {
        let mut runtime = BackgroundRuntime::new();
        runtime.handle(set_world(1)).unwrap();
        runtime.handle(ToBackground::TakeSnapshot).unwrap();
        runtime.handle(set_world(2)).unwrap();
        let tick = runtime.world().unwrap().tick();
        runtime.handle(ToBackground::RestoreSnapshot).unwrap();
        assert_eq!(runtime.world().unwrap().tick(), tick);
        assert_eq!(runtime.token(), Token(2));
    }

    #[test]
    fn rejected_world_still_adopts_token() {
        let mut runtime = BackgroundRuntime::new();
        runtime.handle(set_world(1)).unwrap();
        runtime.handle(ToBackground::TakeSnapshot).unwrap();

        let mut world = ground_and_ball();
        world.colliders[0].parent_handle = testbed_common::BodyHandle(99);
        let result = runtime
            .handle(ToBackground::SetWorld(SetWorld {
                backend: BackendKind::PositionBased,
                token: Token(2),
                world,
            }))
            .unwrap()
            .unwrap();
        assert_eq!(result.token, Token(2));
        assert!(result.positions.is_empty());

        let result = runtime.handle(step(true, false)).unwrap().unwrap();
        assert_eq!(result.token, Token(2));
        assert!(result.positions.is_empty());
        assert_eq!(runtime.world().unwrap().body_count(), 0);

        // The previous world's snapshot is gone with it.
        runtime.handle(ToBackground::RestoreSnapshot).unwrap();
        assert_eq!(runtime.world().unwrap().body_count(), 0);
    }
}
