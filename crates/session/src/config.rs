use std::time::Duration;

use serde::{Deserialize, Serialize};
use testbed_protocol::BackendKind;

/// Session configuration: starting selections, reporting, and liveness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Demo to build first, by name. The first registered demo when unset.
    pub demo: Option<String>,
    pub backend: BackendKind,
    pub velocity_iterations: u32,
    pub position_iterations: u32,
    /// Ask the runtime for debug info with every step.
    pub debug_infos: bool,
    /// Number of step times kept for the timing report.
    pub timing_history: usize,
    /// Flag the background as unresponsive after waiting this long for a result.
    pub unresponsive_after_ms: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            demo: None,
            backend: BackendKind::SequentialImpulse,
            velocity_iterations: 4,
            position_iterations: 1,
            debug_infos: false,
            timing_history: 60,
            unresponsive_after_ms: None,
        }
    }
}

impl SessionConfig {
    pub fn unresponsive_after(&self) -> Option<Duration> {
        self.unresponsive_after_ms.map(Duration::from_millis)
    }
}
