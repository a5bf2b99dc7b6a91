use glam::Vec3;
use testbed_common::Vector;
use testbed_kernel::{BodyType, ColliderDesc, World, WorldError};
use testbed_session::{CameraHint, Demo, DemoWorld};

use crate::{body_at, ground};

/// A pyramid of boxes resting on the ground.
#[derive(Debug, Clone)]
pub struct BoxStack {
    pub base: u32,
}

impl Default for BoxStack {
    fn default() -> Self {
        Self { base: 6 }
    }
}

impl Demo for BoxStack {
    fn name(&self) -> &str {
        "box-stack"
    }

    fn build(&self) -> Result<DemoWorld, WorldError> {
        let mut world = World::new();
        ground(&mut world, 20.0)?;

        let half = 0.5;
        for row in 0..self.base {
            let count = self.base - row;
            let start = -(count as f32 - 1.0) * half;
            for i in 0..count {
                let at = Vec3::new(start + i as f32 * 2.0 * half, half + row as f32 * 2.0 * half, 0.0);
                let body = world.insert_body(body_at(BodyType::Dynamic, at));
                world.insert_collider(ColliderDesc::cuboid(half, half, half).friction(0.8), body)?;
            }
        }

        let height = self.base as f32 * 2.0 * half;
        Ok(DemoWorld {
            world,
            camera: Some(CameraHint {
                eye: Vector::new(0.0, height, height * 2.5),
                target: Vector::new(0.0, height / 2.0, 0.0),
            }),
        })
    }
}
