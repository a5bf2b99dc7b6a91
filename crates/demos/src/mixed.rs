use glam::Vec3;
use testbed_kernel::{BodyType, ColliderDesc, Shape, World, WorldError};
use testbed_session::{Demo, DemoWorld};

use crate::{body_at, ground};

/// One of each shape, a spinning kinematic platform, a sensor, and a
/// triangle mesh that has no drawable geometry on the wire.
#[derive(Debug, Clone, Copy, Default)]
pub struct MixedShapes;

impl Demo for MixedShapes {
    fn name(&self) -> &str {
        "mixed-shapes"
    }

    fn build(&self) -> Result<DemoWorld, WorldError> {
        let mut world = World::new();
        ground(&mut world, 15.0)?;

        let ball = world.insert_body(body_at(BodyType::Dynamic, Vec3::new(-3.0, 4.0, 0.0)));
        world.insert_collider(ColliderDesc::ball(0.5).restitution(0.6), ball)?;

        let cuboid = world.insert_body(body_at(BodyType::Dynamic, Vec3::new(0.0, 4.0, 0.0)));
        world.insert_collider(ColliderDesc::cuboid(0.5, 0.25, 0.75).density(2.0), cuboid)?;

        let capsule = world.insert_body(body_at(BodyType::Dynamic, Vec3::new(3.0, 4.0, 0.0)));
        world.insert_collider(ColliderDesc::capsule(0.5, 0.3), capsule)?;

        let platform = world.insert_body(
            body_at(BodyType::Kinematic, Vec3::new(0.0, 1.0, -4.0)).angvel(Vec3::Y),
        );
        world.insert_collider(ColliderDesc::cuboid(2.0, 0.1, 2.0), platform)?;

        let trigger = world.insert_body(body_at(BodyType::Static, Vec3::new(0.0, 0.5, 4.0)));
        world.insert_collider(ColliderDesc::cuboid(1.0, 0.5, 1.0).sensor(true), trigger)?;

        let mesh = world.insert_body(body_at(BodyType::Static, Vec3::new(6.0, 0.0, 0.0)));
        let ramp = Shape::Trimesh {
            vertices: vec![
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(-1.0, 1.0, 1.0),
            ],
            indices: vec![[0, 1, 2], [0, 2, 3]],
        };
        world.insert_collider(ColliderDesc::new(ramp), mesh)?;

        Ok(world.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testbed_protocol::{ShapeType, WorldDescription};

    #[test]
    fn mesh_is_encoded_without_geometry() {
        let built = MixedShapes.build().unwrap();
        let description = WorldDescription::encode(&built.world);
        let mesh = description
            .colliders
            .iter()
            .find(|c| c.shape_type == ShapeType::Trimesh)
            .unwrap();
        assert!(mesh.radius.is_none());
        assert!(mesh.half_extents.is_none());

        // The runtime side drops it and keeps the rest.
        let decoded = description.decode().unwrap();
        assert_eq!(decoded.collider_count(), built.world.collider_count() - 1);
    }
}
