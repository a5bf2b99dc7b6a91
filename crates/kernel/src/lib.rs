//! World Kernel: the live world that demo builders construct and physics
//! backends own.
//!
//! # Invariants
//! - Every collider and joint references a body present in the same world.
//! - Handle allocation is a pure function of the world's serialized state.
//! - All state mutations flow through explicit operations.

mod body;
mod collider;
mod joint;
pub mod world;

pub use body::{BodyType, RigidBody, RigidBodyDesc};
pub use collider::{Collider, ColliderDesc, Shape};
pub use joint::{Joint, JointDesc, JointType};
pub use world::{IntegrationParameters, World, WorldError};
