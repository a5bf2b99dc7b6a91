use std::time::{Duration, Instant};

/// Outcome of asking the pacer whether a step may be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Enough wall-clock time has passed; send now.
    DispatchNow,
    /// Too early; a deferred dispatch is armed for this instant.
    Deferred(Instant),
    /// A deferred dispatch was already armed; nothing new was scheduled.
    AlreadyPending(Instant),
}

/// Real-time rate limiter with a single deferred timer.
///
/// The interval is one timestep rounded up to whole milliseconds.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    last_dispatch: Option<Instant>,
    deferred: Option<Instant>,
}

impl Pacer {
    pub fn new(timestep_seconds: f32) -> Self {
        Self {
            interval: interval_for(timestep_seconds),
            last_dispatch: None,
            deferred: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_dispatch(&self) -> Option<Instant> {
        self.last_dispatch
    }

    /// When the armed deferred dispatch is due, if one is armed.
    pub fn pending(&self) -> Option<Instant> {
        self.deferred
    }

    /// Start over for a new world: new interval, timer disarmed.
    pub fn reset(&mut self, timestep_seconds: f32) {
        self.interval = interval_for(timestep_seconds);
        self.deferred = None;
    }

    pub fn request(&mut self, now: Instant) -> Pacing {
        if let Some(at) = self.deferred {
            return Pacing::AlreadyPending(at);
        }
        match self.last_dispatch {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                let at = last + self.interval;
                self.deferred = Some(at);
                Pacing::Deferred(at)
            }
            _ => Pacing::DispatchNow,
        }
    }

    /// Disarm and report the deferred timer if it has come due.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.deferred {
            Some(at) if now >= at => {
                self.deferred = None;
                true
            }
            _ => false,
        }
    }

    pub fn record_dispatch(&mut self, now: Instant) {
        self.last_dispatch = Some(now);
        self.deferred = None;
    }
}

fn interval_for(timestep_seconds: f32) -> Duration {
    let ms = (f64::from(timestep_seconds) * 1000.0).ceil().max(0.0);
    Duration::from_millis(ms as u64)
}
