use serde::{Deserialize, Serialize};
use testbed_common::{ColliderHandle, Rotation, Vector};

use crate::{BackendKind, WorldDescription};

/// Generation tag of an accepted world. Minted once per `setWorld`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(pub u64);

impl Token {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Messages from the foreground session to the background runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ToBackground {
    /// Replace the background world. Results echo `token` until superseded.
    SetWorld(SetWorld),
    /// Advance one timestep if `running`, otherwise poll.
    Step(Step),
    /// Serialize backend state into the runtime's snapshot slot.
    TakeSnapshot,
    /// Reload the most recent snapshot.
    RestoreSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetWorld {
    pub backend: BackendKind,
    pub token: Token,
    pub world: WorldDescription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub velocity_iterations: u32,
    pub position_iterations: u32,
    pub running: bool,
    pub debug_infos: bool,
}

/// Messages from the background runtime to the foreground session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FromBackground {
    #[serde(rename = "result")]
    StepResult(StepResult),
}

/// Outcome of one processed `step` (or of `setWorld` and its implicit first step).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub token: Token,
    pub positions: Vec<ColliderPosition>,
    pub step_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
}

/// World-space pose of one rendered collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColliderPosition {
    pub handle: ColliderHandle,
    pub translation: Vector,
    pub rotation: Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub contact_pairs: usize,
    pub joints: usize,
    pub active_bodies: usize,
    pub tick: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorldParams;
    use serde_json::json;

    fn empty_description() -> WorldDescription {
        WorldDescription {
            world: WorldParams {
                gravity: Vector::new(0.0, -9.81, 0.0),
                velocity_iterations: 4,
                position_iterations: 1,
                timestep: 1.0 / 60.0,
            },
            bodies: Vec::new(),
            colliders: Vec::new(),
            joints: Vec::new(),
        }
    }

    #[test]
    fn step_message_wire_shape() {
        let msg = ToBackground::Step(Step {
            velocity_iterations: 4,
            position_iterations: 1,
            running: true,
            debug_infos: false,
        });
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "step",
                "velocityIterations": 4,
                "positionIterations": 1,
                "running": true,
                "debugInfos": false
            })
        );
    }

    #[test]
    fn snapshot_messages_are_bare_discriminators() {
        assert_eq!(
            serde_json::to_value(ToBackground::TakeSnapshot).unwrap(),
            json!({"type": "takeSnapshot"})
        );
        let restore: ToBackground =
            serde_json::from_value(json!({"type": "restoreSnapshot"})).unwrap();
        assert_eq!(restore, ToBackground::RestoreSnapshot);
    }

    #[test]
    fn set_world_carries_backend_token_and_world() {
        let msg = ToBackground::SetWorld(SetWorld {
            backend: BackendKind::PositionBased,
            token: Token(3),
            world: empty_description(),
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "setWorld");
        assert_eq!(value["backend"], "position-based");
        assert_eq!(value["token"], 3);
        assert_eq!(value["world"]["world"]["positionIterations"], 1);

        let back: ToBackground = serde_json::from_value(value).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn result_wire_shape() {
        let msg = FromBackground::StepResult(StepResult {
            token: Token(1),
            positions: vec![ColliderPosition {
                handle: ColliderHandle(0),
                translation: Vector::new(0.0, 4.9, 0.0),
                rotation: Rotation::IDENTITY,
            }],
            step_time_ms: 0.25,
            debug_info: None,
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "result");
        assert_eq!(value["stepTimeMs"], 0.25);
        assert_eq!(value["positions"][0]["rotation"]["w"], 1.0);
        assert!(value.get("debugInfo").is_none());
    }

    #[test]
    fn tokens_increase() {
        let t = Token::default();
        assert!(t.next() > t);
        assert_eq!(t.next().next(), Token(2));
    }
}
