use serde::{Deserialize, Serialize};
use testbed_protocol::{BackendCapabilities, BackendKind, SolverControl, Token};

/// Controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    /// A demo or backend is being (re)initialized.
    Building,
    Active,
    /// One physics advance requested while paused.
    StepOnce,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    Running,
    SteppingOnce,
    Paused,
}

impl SessionState {
    /// Run mode as seen by a user, if the session has a world.
    pub fn run_mode(self) -> Option<RunMode> {
        match self {
            SessionState::Active => Some(RunMode::Running),
            SessionState::StepOnce => Some(RunMode::SteppingOnce),
            SessionState::Paused => Some(RunMode::Paused),
            SessionState::Idle | SessionState::Building => None,
        }
    }

    /// Whether the step loop runs in this state.
    pub fn is_looping(self) -> bool {
        self.run_mode().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverParams {
    pub velocity_iterations: u32,
    pub position_iterations: u32,
}

impl SolverParams {
    /// Force both counts into what `caps` accepts.
    pub fn constrained(self, caps: BackendCapabilities) -> Self {
        Self {
            velocity_iterations: caps.velocity_iterations.clamp(self.velocity_iterations),
            position_iterations: caps.position_iterations.clamp(self.position_iterations),
        }
    }
}

/// One solver control as a GUI would show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverControlState {
    pub value: u32,
    pub enabled: bool,
    pub min: u32,
    pub max: u32,
}

impl SolverControlState {
    fn new(value: u32, control: SolverControl) -> Self {
        match control {
            SolverControl::Adjustable { min, max } => Self {
                value,
                enabled: true,
                min,
                max,
            },
            SolverControl::Fixed(fixed) => Self {
                value: fixed,
                enabled: false,
                min: fixed,
                max: fixed,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverControls {
    pub velocity_iterations: SolverControlState,
    pub position_iterations: SolverControlState,
}

impl SolverControls {
    pub fn new(params: SolverParams, caps: BackendCapabilities) -> Self {
        Self {
            velocity_iterations: SolverControlState::new(
                params.velocity_iterations,
                caps.velocity_iterations,
            ),
            position_iterations: SolverControlState::new(
                params.position_iterations,
                caps.position_iterations,
            ),
        }
    }
}

/// Foreground session state, mutated in place for the controller's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSession {
    pub active_token: Token,
    pub demo: usize,
    pub backend: BackendKind,
    /// Backend of the previous build; differs from `backend` right after a switch.
    pub previous_backend: Option<BackendKind>,
    pub solver: SolverParams,
    pub timestep_seconds: f32,
    pub state: SessionState,
}

impl SimulationSession {
    pub fn new(demo: usize, backend: BackendKind, solver: SolverParams) -> Self {
        Self {
            active_token: Token::default(),
            demo,
            backend,
            previous_backend: None,
            solver: solver.constrained(backend.capabilities()),
            timestep_seconds: 1.0 / 60.0,
            state: SessionState::Idle,
        }
    }

    pub fn run_mode(&self) -> Option<RunMode> {
        self.state.run_mode()
    }

    pub fn solver_controls(&self) -> SolverControls {
        SolverControls::new(self.solver, self.backend.capabilities())
    }

    /// Whether the last build switched backends.
    pub fn backend_changed(&self) -> bool {
        self.previous_backend.is_some_and(|prev| prev != self.backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_loop_states_have_a_run_mode() {
        assert_eq!(SessionState::Active.run_mode(), Some(RunMode::Running));
        assert_eq!(SessionState::StepOnce.run_mode(), Some(RunMode::SteppingOnce));
        assert_eq!(SessionState::Paused.run_mode(), Some(RunMode::Paused));
        assert!(!SessionState::Idle.is_looping());
        assert!(!SessionState::Building.is_looping());
    }

    #[test]
    fn fixed_control_is_disabled() {
        let session = SimulationSession::new(
            0,
            BackendKind::PositionBased,
            SolverParams {
                velocity_iterations: 40,
                position_iterations: 8,
            },
        );
        let controls = session.solver_controls();
        assert_eq!(controls.velocity_iterations.value, 16);
        assert!(controls.velocity_iterations.enabled);
        assert_eq!(controls.position_iterations.value, 1);
        assert!(!controls.position_iterations.enabled);
    }
}
