//! Building blocks shared by the built-in backends.
//!
//! Contacts use axis-aligned boxes around each collider centred on its parent
//! body. Joints are rigid rods between their two anchor points, with the rod
//! length measured when the backend loads the world.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use testbed_common::{BodyHandle, JointHandle};
use testbed_kernel::{BodyType, JointType, World};

/// Gap below which two boxes count as touching.
const CONTACT_MARGIN: f32 = 0.01;
/// Fraction of the rod error fed back into joint velocities per step.
const JOINT_BIAS: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct JointRod {
    pub handle: JointHandle,
    pub rest_length: f32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ContactShape {
    body: BodyHandle,
    half_extents: Vec3,
    friction: f32,
    restitution: f32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Contact {
    a: BodyHandle,
    b: BodyHandle,
    /// Points from `a` to `b`.
    normal: Vec3,
    friction: f32,
    restitution: f32,
}

/// Measure every joint's rod length in the world's current pose.
pub(crate) fn measure_rods(world: &World) -> Vec<JointRod> {
    world
        .joints()
        .filter_map(|(handle, _)| {
            let (p1, p2) = anchor_points(world, handle)?;
            Some(JointRod {
                handle,
                rest_length: p1.distance(p2),
            })
        })
        .collect()
}

/// Colliders that take part in contacts: solid, non-sensor, with a closed-form box.
pub(crate) fn contact_shapes(world: &World) -> Vec<ContactShape> {
    world
        .colliders()
        .filter(|(_, c)| !c.is_sensor)
        .filter_map(|(_, c)| {
            Some(ContactShape {
                body: c.parent(),
                half_extents: c.shape.local_half_extents()?,
                friction: c.friction,
                restitution: c.restitution,
            })
        })
        .collect()
}

pub(crate) fn apply_gravity(world: &mut World, dt: f32) {
    let gravity = world.params().gravity;
    for (_, body) in world.bodies_mut() {
        if body.is_dynamic() {
            body.linvel += gravity * dt;
        }
    }
}

/// Move dynamic and kinematic bodies along their velocities.
pub(crate) fn integrate_positions(world: &mut World, dt: f32) {
    for (_, body) in world.bodies_mut() {
        if body.body_type == BodyType::Static {
            continue;
        }
        body.translation += body.linvel * dt;
        if body.angvel != Vec3::ZERO {
            let spin = Quat::from_xyzw(body.angvel.x, body.angvel.y, body.angvel.z, 0.0);
            let dq = spin * body.rotation * (0.5 * dt);
            body.rotation = (body.rotation + dq).normalize();
        }
    }
}

pub(crate) fn dynamic_translations(world: &World) -> Vec<(BodyHandle, Vec3)> {
    world
        .bodies()
        .filter(|(_, b)| b.is_dynamic())
        .map(|(h, b)| (h, b.translation))
        .collect()
}

/// Set each listed body's velocity from its displacement over `dt`.
pub(crate) fn derive_velocities(world: &mut World, previous: &[(BodyHandle, Vec3)], dt: f32) {
    for (handle, before) in previous {
        if let Some(body) = world.body_mut(*handle) {
            body.linvel = (body.translation - *before) / dt;
        }
    }
}

/// Overlapping or touching pairs with at least one dynamic body.
pub(crate) fn find_contacts(world: &World, shapes: &[ContactShape]) -> Vec<Contact> {
    let mut contacts = Vec::new();
    for (i, sa) in shapes.iter().enumerate() {
        for sb in &shapes[i + 1..] {
            if sa.body == sb.body {
                continue;
            }
            let (Some(a), Some(b)) = (world.body(sa.body), world.body(sb.body)) else {
                continue;
            };
            if !a.is_dynamic() && !b.is_dynamic() {
                continue;
            }
            if let Some((normal, depth)) =
                box_overlap(a.translation, sa.half_extents, b.translation, sb.half_extents)
            {
                if depth > -CONTACT_MARGIN {
                    contacts.push(Contact {
                        a: sa.body,
                        b: sb.body,
                        normal,
                        friction: (sa.friction * sb.friction).sqrt(),
                        restitution: sa.restitution.max(sb.restitution),
                    });
                }
            }
        }
    }
    contacts
}

/// One pass of normal and friction impulses over the given contacts.
pub(crate) fn solve_contact_velocities(world: &mut World, contacts: &[Contact]) {
    for contact in contacts {
        let Some((a, b)) = world.body_pair_mut(contact.a, contact.b) else {
            continue;
        };
        let (wa, wb) = (a.inv_mass(), b.inv_mass());
        let total = wa + wb;
        if total == 0.0 {
            continue;
        }
        let n = contact.normal;
        let relative = b.linvel - a.linvel;
        let vn = relative.dot(n);
        if vn >= 0.0 {
            continue;
        }
        let jn = -(1.0 + contact.restitution) * vn / total;
        a.linvel -= n * jn * wa;
        b.linvel += n * jn * wb;

        let tangent = relative - n * vn;
        let speed = tangent.length();
        if speed > f32::EPSILON {
            let jt = (speed / total).min(contact.friction * jn);
            let dir = tangent / speed;
            a.linvel += dir * jt * wa;
            b.linvel -= dir * jt * wb;
        }
    }
}

/// Push overlapping boxes apart along their axis of least penetration.
/// Returns how many pairs were overlapping.
pub(crate) fn project_contacts(world: &mut World, shapes: &[ContactShape]) -> usize {
    let mut pairs = 0;
    for (i, sa) in shapes.iter().enumerate() {
        for sb in &shapes[i + 1..] {
            if sa.body == sb.body {
                continue;
            }
            let Some((a, b)) = world.body_pair_mut(sa.body, sb.body) else {
                continue;
            };
            let (wa, wb) = (a.inv_mass(), b.inv_mass());
            let total = wa + wb;
            if total == 0.0 {
                continue;
            }
            let Some((normal, depth)) =
                box_overlap(a.translation, sa.half_extents, b.translation, sb.half_extents)
            else {
                continue;
            };
            if depth <= 0.0 {
                continue;
            }
            pairs += 1;
            a.translation -= normal * depth * wa / total;
            b.translation += normal * depth * wb / total;
        }
    }
    pairs
}

/// Drive each rod towards its rest length by moving its bodies.
pub(crate) fn project_joints(world: &mut World, rods: &[JointRod]) {
    for rod in rods {
        let Some(joint) = world.joint(rod.handle).cloned() else {
            continue;
        };
        let Some((p1, p2)) = anchor_points(world, rod.handle) else {
            continue;
        };
        let Some((b1, b2)) = world.body_pair_mut(joint.body1(), joint.body2()) else {
            continue;
        };
        let (w1, w2) = (b1.inv_mass(), b2.inv_mass());
        let total = w1 + w2;
        if total == 0.0 {
            continue;
        }
        let mut error = rod_error(p1, p2, rod.rest_length);
        if joint.joint_type == JointType::Prismatic {
            let axis = (b1.rotation * joint.axis1).normalize_or_zero();
            error -= axis * error.dot(axis);
        }
        b1.translation += error * w1 / total;
        b2.translation -= error * w2 / total;

        if joint.joint_type == JointType::Fixed {
            if b2.is_dynamic() {
                b2.rotation = b1.rotation * joint.frame1 * joint.frame2.inverse();
            } else if b1.is_dynamic() {
                b1.rotation = b2.rotation * joint.frame2 * joint.frame1.inverse();
            }
        }
    }
}

/// Remove relative velocity along each rod, with a bias towards the rest length.
pub(crate) fn solve_joint_velocities(world: &mut World, rods: &[JointRod], dt: f32) {
    for rod in rods {
        let Some(joint) = world.joint(rod.handle).cloned() else {
            continue;
        };
        let Some((p1, p2)) = anchor_points(world, rod.handle) else {
            continue;
        };
        let Some((b1, b2)) = world.body_pair_mut(joint.body1(), joint.body2()) else {
            continue;
        };
        let (w1, w2) = (b1.inv_mass(), b2.inv_mass());
        let total = w1 + w2;
        if total == 0.0 {
            continue;
        }
        let delta = p2 - p1;
        let Some(dir) = delta.try_normalize() else {
            continue;
        };
        let stretch = delta.length() - rod.rest_length;
        let vrel = (b2.linvel - b1.linvel).dot(dir) + JOINT_BIAS * stretch / dt;
        let impulse = vrel / total;
        b1.linvel += dir * impulse * w1;
        b2.linvel -= dir * impulse * w2;
    }
}

fn anchor_points(world: &World, handle: JointHandle) -> Option<(Vec3, Vec3)> {
    let joint = world.joint(handle)?;
    let b1 = world.body(joint.body1())?;
    let b2 = world.body(joint.body2())?;
    Some((
        b1.local_to_world(joint.anchor1),
        b2.local_to_world(joint.anchor2),
    ))
}

/// Correction that, split between the bodies, restores the rod length.
fn rod_error(p1: Vec3, p2: Vec3, rest_length: f32) -> Vec3 {
    let delta = p2 - p1;
    match delta.try_normalize() {
        Some(dir) => dir * (delta.length() - rest_length),
        None => Vec3::ZERO,
    }
}

/// Normal (from `a` to `b`) and depth along the axis of least penetration.
/// Negative depth means the boxes are apart by that much along that axis.
fn box_overlap(ca: Vec3, ha: Vec3, cb: Vec3, hb: Vec3) -> Option<(Vec3, f32)> {
    let d = cb - ca;
    let overlap = (ha + hb) - d.abs();
    if overlap.min_element() <= -CONTACT_MARGIN {
        return None;
    }
    let axis = if overlap.x <= overlap.y && overlap.x <= overlap.z {
        0
    } else if overlap.y <= overlap.z {
        1
    } else {
        2
    };
    let mut normal = Vec3::ZERO;
    normal[axis] = if d[axis] >= 0.0 { 1.0 } else { -1.0 };
    Some((normal, overlap[axis]))
}
