//! Demo scenes. Each builds a fresh world on every call, so switching back
//! to a demo always starts it over.

mod falling;
mod mixed;
mod pendulum;
mod stack;

use glam::Vec3;
use testbed_kernel::{BodyType, ColliderDesc, RigidBodyDesc, World, WorldError};
use testbed_session::DemoRegistry;

pub use falling::FallingBodies;
pub use mixed::MixedShapes;
pub use pendulum::PendulumChain;
pub use stack::BoxStack;

/// Every built-in demo, in menu order.
pub fn registry() -> DemoRegistry {
    let mut registry = DemoRegistry::new();
    registry
        .register(FallingBodies::default())
        .register(BoxStack::default())
        .register(PendulumChain::default())
        .register(MixedShapes);
    registry
}

/// A static slab whose top face sits at `y = 0`.
pub(crate) fn ground(world: &mut World, half_width: f32) -> Result<(), WorldError> {
    let body = world.insert_body(RigidBodyDesc::fixed().translation(0.0, -0.5, 0.0));
    world.insert_collider(ColliderDesc::cuboid(half_width, 0.5, half_width), body)?;
    Ok(())
}

pub(crate) fn body_at(body_type: BodyType, at: Vec3) -> RigidBodyDesc {
    RigidBodyDesc::new(body_type).translation(at.x, at.y, at.z)
}
