use testbed_common::{BodyHandle, ColliderHandle};

/// Errors from turning a [`crate::WorldDescription`] back into a live world.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DecodeError {
    #[error("body handle {0:?} appears more than once")]
    DuplicateBody(BodyHandle),
    #[error("collider handle {0:?} appears more than once")]
    DuplicateCollider(ColliderHandle),
    #[error("collider {collider:?} references missing body {parent:?}")]
    DanglingCollider {
        collider: ColliderHandle,
        parent: BodyHandle,
    },
    #[error("joint #{index} references missing body {body:?}")]
    DanglingJoint { index: usize, body: BodyHandle },
    #[error("collider {collider:?} is a {shape} without its `{field}` field")]
    MissingGeometry {
        collider: ColliderHandle,
        shape: &'static str,
        field: &'static str,
    },
}

/// Errors from the channel between the two contexts.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("the other side of the channel has hung up")]
    Disconnected,
    #[error("wire framing error: {0}")]
    Framing(#[from] serde_json::Error),
}
