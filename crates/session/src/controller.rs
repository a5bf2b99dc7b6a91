use std::collections::VecDeque;
use std::time::{Duration, Instant};

use testbed_protocol::{
    BackendKind, FromBackground, SetWorld, Step, StepResult, ToBackground, Token, WorkerPort,
    WorldDescription,
};

use crate::{
    CameraHint, DemoRegistry, Pacer, Pacing, Presenter, SceneSetup, SessionConfig, SessionError,
    SessionState, SimulationSession, SolverControls, SolverParams, StepTimings, TimingReport,
};

/// Drives one background runtime through `port` and one presenter.
///
/// The loop driver calls [`SessionController::poll`] on every render tick;
/// user controls are plain method calls between ticks.
pub struct SessionController<P: WorkerPort, R: Presenter> {
    port: P,
    presenter: R,
    demos: DemoRegistry,
    config: SessionConfig,
    session: SimulationSession,
    pacer: Pacer,
    timings: StepTimings,
    /// Requests (setWorld or step) sent and not yet answered, oldest first.
    /// Each entry is whether that request advances the world.
    in_flight: VecDeque<bool>,
    /// When the oldest unanswered request was sent.
    awaiting_since: Option<Instant>,
    unresponsive: bool,
    /// Backend the current world was built for.
    built_backend: Option<BackendKind>,
}

impl<P: WorkerPort, R: Presenter> SessionController<P, R> {
    /// Create a controller and immediately build the configured demo.
    pub fn new(
        port: P,
        presenter: R,
        demos: DemoRegistry,
        config: SessionConfig,
        now: Instant,
    ) -> Result<Self, SessionError> {
        if demos.is_empty() {
            return Err(SessionError::NoDemos);
        }
        let demo = match config.demo.as_deref() {
            Some(name) => demos.find(name).unwrap_or_else(|| {
                tracing::warn!(name, "unknown demo, starting with the first one");
                0
            }),
            None => 0,
        };
        let solver = SolverParams {
            velocity_iterations: config.velocity_iterations,
            position_iterations: config.position_iterations,
        };
        let mut controller = Self {
            port,
            presenter,
            session: SimulationSession::new(demo, config.backend, solver),
            pacer: Pacer::new(1.0 / 60.0),
            timings: StepTimings::new(config.timing_history),
            demos,
            config,
            in_flight: VecDeque::new(),
            awaiting_since: None,
            unresponsive: false,
            built_backend: None,
        };
        controller.build(now)?;
        Ok(controller)
    }

    pub fn session(&self) -> &SimulationSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn active_token(&self) -> Token {
        self.session.active_token
    }

    pub fn demos(&self) -> &DemoRegistry {
        &self.demos
    }

    pub fn presenter(&self) -> &R {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut R {
        &mut self.presenter
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Take the port and presenter back, e.g. to shut the worker down.
    pub fn into_parts(self) -> (P, R) {
        (self.port, self.presenter)
    }

    pub fn timings(&self) -> &StepTimings {
        &self.timings
    }

    /// When the armed deferred dispatch is due, if one is armed.
    pub fn pending_dispatch(&self) -> Option<Instant> {
        self.pacer.pending()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether the background has exceeded the configured reply deadline.
    pub fn is_unresponsive(&self) -> bool {
        self.unresponsive
    }

    pub fn solver_controls(&self) -> SolverControls {
        self.session.solver_controls()
    }

    pub fn select_demo(&mut self, index: usize, now: Instant) -> Result<(), SessionError> {
        if self.demos.get(index).is_none() {
            return Err(SessionError::UnknownDemo(index));
        }
        self.session.demo = index;
        self.build(now)
    }

    /// Switch backends. Selecting the current backend does nothing.
    pub fn select_backend(&mut self, backend: BackendKind, now: Instant) -> Result<(), SessionError> {
        if backend == self.session.backend {
            tracing::debug!(%backend, "backend already selected");
            return Ok(());
        }
        self.session.backend = backend;
        self.build(now)
    }

    pub fn pause(&mut self) {
        if matches!(self.session.state, SessionState::Active | SessionState::StepOnce) {
            self.transition(SessionState::Paused);
        }
    }

    pub fn resume(&mut self) {
        if matches!(self.session.state, SessionState::Paused | SessionState::StepOnce) {
            self.transition(SessionState::Active);
        }
    }

    /// Request exactly one physics advance, then pause.
    pub fn step_once(&mut self) {
        if matches!(self.session.state, SessionState::Active | SessionState::Paused) {
            self.transition(SessionState::StepOnce);
        }
    }

    pub fn set_velocity_iterations(&mut self, requested: u32) {
        let control = self.session.backend.capabilities().velocity_iterations;
        let value = control.clamp(requested);
        if value != requested {
            tracing::debug!(requested, value, "velocity iterations clamped");
        }
        self.session.solver.velocity_iterations = value;
    }

    pub fn set_position_iterations(&mut self, requested: u32) {
        let control = self.session.backend.capabilities().position_iterations;
        let value = control.clamp(requested);
        if value != requested {
            tracing::debug!(requested, value, "position iterations clamped");
        }
        self.session.solver.position_iterations = value;
    }

    /// Ask the runtime to snapshot its backend. Token and run state are unchanged.
    pub fn take_snapshot(&mut self) -> Result<(), SessionError> {
        self.port.post(&ToBackground::TakeSnapshot)?;
        tracing::debug!(token = self.session.active_token.0, "snapshot requested");
        Ok(())
    }

    /// Ask the runtime to reload its last snapshot. Token and run state are unchanged.
    pub fn restore_snapshot(&mut self) -> Result<(), SessionError> {
        self.port.post(&ToBackground::RestoreSnapshot)?;
        tracing::debug!(token = self.session.active_token.0, "restore requested");
        Ok(())
    }

    /// Swap in a fresh background and rebuild the current demo on it.
    /// Returns the old port so the caller can shut it down.
    pub fn replace_port(&mut self, port: P, now: Instant) -> Result<P, SessionError> {
        let old = std::mem::replace(&mut self.port, port);
        self.in_flight.clear();
        self.awaiting_since = None;
        self.unresponsive = false;
        tracing::info!("background replaced");
        self.build(now)?;
        Ok(old)
    }

    /// One render tick: drain arrived results, fire the deferred dispatch if
    /// due, and check liveness. Returns the number of results received.
    pub fn poll(&mut self, now: Instant) -> Result<usize, SessionError> {
        let mut received = 0;
        while let Some(message) = self.port.try_recv()? {
            let FromBackground::StepResult(result) = message;
            self.on_result(result, now)?;
            received += 1;
        }

        if self.pacer.fire_due(now) && self.in_flight.is_empty() && self.session.state.is_looping() {
            self.dispatch_step(now)?;
        } else {
            self.schedule_step(now)?;
        }

        self.check_liveness(now);
        Ok(received)
    }

    /// Handle one result from the background, then evaluate the next step.
    pub fn on_result(&mut self, result: StepResult, now: Instant) -> Result<(), SessionError> {
        // Replies come back in request order.
        let advanced = self.in_flight.pop_front().unwrap_or(true);
        self.awaiting_since = (!self.in_flight.is_empty()).then_some(now);
        if self.unresponsive {
            tracing::info!("background responded again");
            self.unresponsive = false;
        }

        if result.token == self.session.active_token {
            self.accept(&result, advanced);
        } else {
            tracing::trace!(
                token = result.token.0,
                active = self.session.active_token.0,
                "discarding stale result"
            );
        }

        self.schedule_step(now)
    }

    fn accept(&mut self, result: &StepResult, advanced: bool) {
        self.presenter.apply_positions(&result.positions);
        if advanced {
            self.timings.record(result.step_time_ms);
        }
        let report = TimingReport {
            step_time_ms: result.step_time_ms,
            average_ms: self.timings.average_ms(),
            min_ms: self.timings.min_ms(),
            max_ms: self.timings.max_ms(),
            samples: self.timings.count(),
            debug_info: result.debug_info,
        };
        self.presenter.show_timing(&report);
    }

    /// Send the next step now or arm the deferred timer, unless a request is
    /// still outstanding.
    fn schedule_step(&mut self, now: Instant) -> Result<(), SessionError> {
        if !self.in_flight.is_empty() || !self.session.state.is_looping() {
            return Ok(());
        }
        match self.pacer.request(now) {
            Pacing::DispatchNow => self.dispatch_step(now),
            Pacing::Deferred(at) => {
                tracing::trace!(in_ms = as_ms(at - now), "step deferred");
                Ok(())
            }
            Pacing::AlreadyPending(_) => Ok(()),
        }
    }

    fn dispatch_step(&mut self, now: Instant) -> Result<(), SessionError> {
        if self.session.active_token == Token::default() {
            return Err(SessionError::NoWorld);
        }
        let solver = self.session.solver;
        let step = Step {
            velocity_iterations: solver.velocity_iterations,
            position_iterations: solver.position_iterations,
            running: self.session.state != SessionState::Paused,
            debug_infos: self.config.debug_infos,
        };
        self.port.post(&ToBackground::Step(step))?;
        self.pacer.record_dispatch(now);
        self.mark_sent(step.running, now);

        if self.session.state == SessionState::StepOnce {
            self.transition(SessionState::Paused);
        }
        Ok(())
    }

    /// Mint a new token, build the selected demo, and send it to the background.
    fn build(&mut self, now: Instant) -> Result<(), SessionError> {
        let index = self.session.demo;
        let demo = self.demos.get(index).ok_or(SessionError::UnknownDemo(index))?;
        let name = demo.name().to_owned();
        let built = demo.build()?;

        self.transition(SessionState::Building);
        self.session.active_token = self.session.active_token.next();
        let token = self.session.active_token;
        let _span = tracing::info_span!("build", token = token.0, demo = %name).entered();

        let description = WorldDescription::encode(&built.world);
        let camera = built
            .camera
            .or_else(|| description.dynamic_centroid().map(CameraHint::looking_at))
            .unwrap_or_default();

        let backend = self.session.backend;
        self.session.previous_backend = self.built_backend.replace(backend);
        if self.session.previous_backend != Some(backend) {
            tracing::info!(%backend, previous = ?self.session.previous_backend, "backend selected");
        }
        self.session.solver = self.session.solver.constrained(backend.capabilities());
        self.session.timestep_seconds = description.world.timestep;
        self.pacer.reset(description.world.timestep);
        self.timings.reset();

        self.presenter.reset(&SceneSetup {
            token,
            demo: name,
            backend,
            camera,
            colliders: description.colliders.clone(),
        });

        self.port.post(&ToBackground::SetWorld(SetWorld {
            backend,
            token,
            world: description,
        }))?;
        self.pacer.record_dispatch(now);
        // The reply carries the implicit first step.
        self.mark_sent(true, now);

        self.transition(SessionState::Active);
        Ok(())
    }

    fn mark_sent(&mut self, advances: bool, now: Instant) {
        self.in_flight.push_back(advances);
        self.awaiting_since.get_or_insert(now);
    }

    fn check_liveness(&mut self, now: Instant) {
        let (Some(limit), Some(since)) = (self.config.unresponsive_after(), self.awaiting_since)
        else {
            return;
        };
        if !self.unresponsive && now.saturating_duration_since(since) >= limit {
            tracing::warn!(
                waited_ms = as_ms(now.saturating_duration_since(since)),
                token = self.session.active_token.0,
                "background unresponsive"
            );
            self.unresponsive = true;
        }
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.session.state;
        if from != to {
            tracing::debug!(?from, ?to, "session state");
            self.session.state = to;
        }
    }
}

fn as_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
