use glam::Vec3;
use testbed_kernel::{BodyType, ColliderDesc, World, WorldError};
use testbed_session::{Demo, DemoWorld};

use crate::{body_at, ground};

/// A grid of balls dropped onto the ground.
#[derive(Debug, Clone)]
pub struct FallingBodies {
    pub columns: u32,
    pub layers: u32,
}

impl Default for FallingBodies {
    fn default() -> Self {
        Self {
            columns: 4,
            layers: 3,
        }
    }
}

impl Demo for FallingBodies {
    fn name(&self) -> &str {
        "falling-bodies"
    }

    fn build(&self) -> Result<DemoWorld, WorldError> {
        let mut world = World::new();
        ground(&mut world, 20.0)?;

        let offset = (self.columns as f32 - 1.0) * 0.75;
        for layer in 0..self.layers {
            for i in 0..self.columns {
                for k in 0..self.columns {
                    let at = Vec3::new(
                        i as f32 * 1.5 - offset,
                        3.0 + layer as f32 * 1.5,
                        k as f32 * 1.5 - offset,
                    );
                    let body = world.insert_body(body_at(BodyType::Dynamic, at));
                    world.insert_collider(ColliderDesc::ball(0.5).restitution(0.3), body)?;
                }
            }
        }
        tracing::debug!(bodies = world.body_count(), "falling bodies built");
        Ok(world.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_ground_plus_grid() {
        let demo = FallingBodies {
            columns: 2,
            layers: 2,
        };
        let built = demo.build().unwrap();
        assert_eq!(built.world.body_count(), 1 + 8);
        assert_eq!(built.world.collider_count(), 1 + 8);
    }
}
