//! Shared types for the physics testbed: integer handles, math wire shapes,
//! and the deterministic slot arena backing every world set.
//!
//! # Invariants
//! - Handles are plain slot indices; they carry no reference into a live world.
//! - Arena allocation depends only on the arena's own serialized state.

mod arena;
mod types;

pub use arena::Arena;
pub use types::{BodyHandle, ColliderHandle, JointHandle, Rotation, Vector};
