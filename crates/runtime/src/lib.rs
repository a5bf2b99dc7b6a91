//! Background runtime: owns the physics backend, processes protocol messages
//! strictly in arrival order, and replies with step results.
//!
//! # Invariants
//! - Every `setWorld` and every `step` produces exactly one result; snapshot
//!   messages produce none.
//! - Results echo the token of the world they were computed for.
//! - A `step` before any `setWorld` stops the worker.

mod backend;
mod impulse;
mod pbd;
mod runtime;
mod solver;
mod worker;

pub use backend::{PhysicsBackend, StepStats, instantiate};
pub use runtime::{BackgroundRuntime, RuntimeError};
pub use worker::{WorkerHandle, spawn_worker};
