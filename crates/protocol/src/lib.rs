//! Protocol: everything that crosses the boundary between the foreground
//! session and the background simulation runtime.
//!
//! # Invariants
//! - Only plain data crosses the boundary; errors are handled on the side
//!   that produced them.
//! - Every handle referenced by a collider or joint record names a body
//!   record of the same description.
//! - Field names and `type` discriminators are the wire contract.
//!
//! The transport must be a single ordered, lossless channel per direction.
//! Tokens discard stale generations; they do not repair reordering within a
//! generation.

mod backend;
mod description;
mod error;
mod message;
mod transport;

pub use backend::{BackendCapabilities, BackendKind, SolverControl, UnknownBackend};
pub use description::{
    BodyKind, BodyRecord, ColliderRecord, JointKind, JointRecord, ShapeType, WorldDescription,
    WorldParams,
};
pub use error::{DecodeError, TransportError};
pub use message::{
    ColliderPosition, DebugInfo, FromBackground, SetWorld, Step, StepResult, ToBackground, Token,
};
pub use transport::{WorkerPort, decode_frame, encode_frame};
