use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use testbed_protocol::{
    FromBackground, ToBackground, TransportError, WorkerPort, decode_frame, encode_frame,
};

use crate::runtime::{BackgroundRuntime, RuntimeError};

/// Foreground handle to a runtime on its own thread. Frames cross the thread
/// boundary as JSON text, so nothing is shared between the two sides.
pub struct WorkerHandle {
    to_worker: Sender<String>,
    from_worker: Receiver<String>,
    thread: JoinHandle<Result<(), RuntimeError>>,
}

/// Start a background runtime on a dedicated thread.
pub fn spawn_worker() -> Result<WorkerHandle, RuntimeError> {
    let (to_worker, inbox) = mpsc::channel::<String>();
    let (outbox, from_worker) = mpsc::channel::<String>();
    let thread = thread::Builder::new()
        .name("testbed-runtime".into())
        .spawn(move || run_worker(inbox, outbox))?;
    tracing::debug!("worker spawned");
    Ok(WorkerHandle {
        to_worker,
        from_worker,
        thread,
    })
}

fn run_worker(inbox: Receiver<String>, outbox: Sender<String>) -> Result<(), RuntimeError> {
    let mut runtime = BackgroundRuntime::new();
    // Ends when the foreground drops its sender.
    for frame in inbox {
        let message: ToBackground = match decode_frame(&frame) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(%err, "dropping undecodable frame");
                continue;
            }
        };
        match runtime.handle(message) {
            Ok(Some(result)) => {
                let frame = encode_frame(&FromBackground::StepResult(result))?;
                outbox.send(frame).map_err(|_| TransportError::Disconnected)?;
            }
            Ok(None) => {}
            Err(err) if err.is_fatal() => {
                tracing::error!(%err, "worker stopping");
                return Err(err);
            }
            Err(err) => tracing::warn!(%err, "message rejected"),
        }
    }
    tracing::debug!("worker inbox closed");
    Ok(())
}

impl WorkerHandle {
    /// Block until a message arrives or `timeout` elapses.
    pub fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<FromBackground>, TransportError> {
        match self.from_worker.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(decode_frame(&frame)?)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
        }
    }

    /// Close the inbox and wait for the worker to finish what it has queued.
    pub fn shutdown(self) -> Result<(), RuntimeError> {
        drop(self.to_worker);
        self.thread.join().map_err(|_| RuntimeError::WorkerPanicked)?
    }
}

impl WorkerPort for WorkerHandle {
    fn post(&mut self, message: &ToBackground) -> Result<(), TransportError> {
        let frame = encode_frame(message)?;
        self.to_worker
            .send(frame)
            .map_err(|_| TransportError::Disconnected)
    }

    fn try_recv(&mut self) -> Result<Option<FromBackground>, TransportError> {
        match self.from_worker.try_recv() {
            Ok(frame) => Ok(Some(decode_frame(&frame)?)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testbed_kernel::{ColliderDesc, RigidBodyDesc, World};
    use testbed_protocol::{BackendKind, SetWorld, Step, Token, WorldDescription};

    const WAIT: Duration = Duration::from_secs(5);

    fn description() -> WorldDescription {
        let mut world = World::new();
        let body = world.insert_body(RigidBodyDesc::dynamic().translation(0.0, 5.0, 0.0));
        world.insert_collider(ColliderDesc::ball(0.5), body).unwrap();
        WorldDescription::encode(&world)
    }

    fn step() -> ToBackground {
        ToBackground::Step(Step {
            velocity_iterations: 4,
            position_iterations: 1,
            running: true,
            debug_infos: true,
        })
    }

    fn token_of(message: FromBackground) -> Token {
        let FromBackground::StepResult(result) = message;
        result.token
    }

    #[test]
    fn replies_in_order() {
        let mut worker = spawn_worker().unwrap();
        worker
            .post(&ToBackground::SetWorld(SetWorld {
                backend: BackendKind::PositionBased,
                token: Token(7),
                world: description(),
            }))
            .unwrap();
        worker.post(&step()).unwrap();

        let first = worker.recv_timeout(WAIT).unwrap().unwrap();
        let FromBackground::StepResult(second) = worker.recv_timeout(WAIT).unwrap().unwrap();
        assert_eq!(token_of(first), Token(7));
        assert_eq!(second.token, Token(7));
        assert_eq!(second.debug_info.unwrap().tick, 2);
        worker.shutdown().unwrap();
    }

    #[test]
    fn rejected_world_keeps_worker_replying_under_new_token() {
        let mut worker = spawn_worker().unwrap();
        worker
            .post(&ToBackground::SetWorld(SetWorld {
                backend: BackendKind::SequentialImpulse,
                token: Token(1),
                world: description(),
            }))
            .unwrap();
        let mut broken = description();
        broken.colliders[0].parent_handle = testbed_common::BodyHandle(42);
        worker
            .post(&ToBackground::SetWorld(SetWorld {
                backend: BackendKind::SequentialImpulse,
                token: Token(2),
                world: broken,
            }))
            .unwrap();
        worker.post(&step()).unwrap();

        let tokens: Vec<Token> = (0..3)
            .map(|_| token_of(worker.recv_timeout(WAIT).unwrap().unwrap()))
            .collect();
        assert_eq!(tokens, [Token(1), Token(2), Token(2)]);
        worker.shutdown().unwrap();
    }

    #[test]
    fn step_without_world_stops_worker() {
        let mut worker = spawn_worker().unwrap();
        worker.post(&step()).unwrap();
        assert!(matches!(
            worker.recv_timeout(WAIT),
            Err(TransportError::Disconnected)
        ));
        assert!(matches!(worker.shutdown(), Err(RuntimeError::NoWorld)));
    }

    #[test]
    fn try_recv_is_empty_before_any_reply() {
        let mut worker = spawn_worker().unwrap();
        assert!(worker.try_recv().unwrap().is_none());
        worker.shutdown().unwrap();
    }
}
