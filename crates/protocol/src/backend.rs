use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a backend exposes one iteration-count control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverControl {
    /// Any value in `min..=max` is accepted.
    Adjustable { min: u32, max: u32 },
    /// The backend always uses this value; the control is shown disabled.
    Fixed(u32),
}

impl SolverControl {
    pub fn is_adjustable(&self) -> bool {
        matches!(self, SolverControl::Adjustable { .. })
    }

    /// The value the backend will actually use for a requested one.
    pub fn clamp(&self, requested: u32) -> u32 {
        match *self {
            SolverControl::Adjustable { min, max } => requested.clamp(min, max),
            SolverControl::Fixed(value) => value,
        }
    }
}

/// Solver controls a backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCapabilities {
    pub velocity_iterations: SolverControl,
    pub position_iterations: SolverControl,
}

/// The physics backends a background runtime can host.
///
/// The foreground never switches on the identity itself; it asks for
/// [`BackendKind::capabilities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Velocity-level sequential impulses with separate positional correction.
    SequentialImpulse,
    /// Position-based relaxation with a single projection pass.
    PositionBased,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::SequentialImpulse, BackendKind::PositionBased];

    pub fn id(self) -> &'static str {
        match self {
            BackendKind::SequentialImpulse => "sequential-impulse",
            BackendKind::PositionBased => "position-based",
        }
    }

    pub fn capabilities(self) -> BackendCapabilities {
        match self {
            BackendKind::SequentialImpulse => BackendCapabilities {
                velocity_iterations: SolverControl::Adjustable { min: 1, max: 16 },
                position_iterations: SolverControl::Adjustable { min: 1, max: 16 },
            },
            BackendKind::PositionBased => BackendCapabilities {
                velocity_iterations: SolverControl::Adjustable { min: 1, max: 16 },
                position_iterations: SolverControl::Fixed(1),
            },
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown backend `{0}`")]
pub struct UnknownBackend(pub String);

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| UnknownBackend(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_control_ignores_requests() {
        let control = SolverControl::Fixed(1);
        assert_eq!(control.clamp(8), 1);
        assert!(!control.is_adjustable());
    }

    #[test]
    fn adjustable_control_clamps_into_range() {
        let control = SolverControl::Adjustable { min: 1, max: 16 };
        assert_eq!(control.clamp(0), 1);
        assert_eq!(control.clamp(40), 16);
        assert_eq!(control.clamp(6), 6);
    }

    #[test]
    fn position_based_backend_fixes_position_iterations() {
        let caps = BackendKind::PositionBased.capabilities();
        assert!(caps.velocity_iterations.is_adjustable());
        assert_eq!(caps.position_iterations, SolverControl::Fixed(1));
    }

    #[test]
    fn ids_parse_back() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.id().parse::<BackendKind>().unwrap(), kind);
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::Value::String(kind.id().into())
            );
        }
        assert!("box2d".parse::<BackendKind>().is_err());
    }
}
