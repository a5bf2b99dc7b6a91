use glam::Vec3;
use testbed_kernel::{BodyType, ColliderDesc, JointDesc, World, WorldError};
use testbed_session::{Demo, DemoWorld};

use crate::body_at;

/// Balls hanging from a fixed anchor, linked by ball joints and released
/// from horizontal.
#[derive(Debug, Clone)]
pub struct PendulumChain {
    pub links: u32,
    pub spacing: f32,
}

impl Default for PendulumChain {
    fn default() -> Self {
        Self {
            links: 8,
            spacing: 1.2,
        }
    }
}

impl Demo for PendulumChain {
    fn name(&self) -> &str {
        "pendulum-chain"
    }

    fn build(&self) -> Result<DemoWorld, WorldError> {
        let mut world = World::new();
        let top = Vec3::new(0.0, 10.0, 0.0);
        let mut previous = world.insert_body(body_at(BodyType::Static, top));
        world.insert_collider(ColliderDesc::cuboid(0.2, 0.2, 0.2), previous)?;

        for i in 1..=self.links {
            let at = top + Vec3::X * (i as f32 * self.spacing);
            let link = world.insert_body(body_at(BodyType::Dynamic, at));
            world.insert_collider(ColliderDesc::ball(0.3), link)?;
            world.insert_joint(JointDesc::ball(Vec3::ZERO, Vec3::ZERO), previous, link)?;
            previous = link;
        }
        Ok(world.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_joint_per_link() {
        let built = PendulumChain {
            links: 5,
            spacing: 1.0,
        }
        .build()
        .unwrap();
        assert_eq!(built.world.body_count(), 6);
        assert_eq!(built.world.joint_count(), 5);
    }
}
