//! Foreground session: selects demos and backends, mints tokens, paces step
//! requests against wall-clock time, and forwards accepted results to a
//! presenter.
//!
//! # Invariants
//! - The active token strictly increases, once per world build, and is never reused.
//! - A result whose token differs from the active token never reaches the presenter.
//! - No step is requested sooner than one timestep after the previous dispatch,
//!   and at most one deferred dispatch is pending at a time.
//! - A world is always sent before the first step request.
//!
//! The controller never blocks on the background runtime. All time-dependent
//! calls take the current instant, so the loop driver owns the clock.

mod config;
mod controller;
mod demo;
mod error;
mod pacing;
mod presenter;
mod session;
mod stats;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use demo::{CameraHint, Demo, DemoRegistry, DemoWorld};
pub use error::SessionError;
pub use pacing::{Pacer, Pacing};
pub use presenter::{DebugTextPresenter, Presenter, SceneSetup, TimingReport};
pub use session::{
    RunMode, SessionState, SimulationSession, SolverControlState, SolverControls, SolverParams,
};
pub use stats::StepTimings;
