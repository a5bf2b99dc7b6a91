use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use testbed_common::BodyHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JointType {
    Ball,
    Fixed,
    Revolute,
    Prismatic,
}

/// A joint between two bodies of the same [`crate::World`].
///
/// Anchors are expressed in each body's local frame. Fields a joint type does
/// not use stay at their neutral value (zero axis, identity frame).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub(crate) body1: BodyHandle,
    pub(crate) body2: BodyHandle,
    pub joint_type: JointType,
    pub anchor1: Vec3,
    pub anchor2: Vec3,
    pub axis1: Vec3,
    pub axis2: Vec3,
    pub frame1: Quat,
    pub frame2: Quat,
}

impl Joint {
    pub fn body1(&self) -> BodyHandle {
        self.body1
    }

    pub fn body2(&self) -> BodyHandle {
        self.body2
    }
}

/// Builder for a joint.
#[derive(Debug, Clone, PartialEq)]
pub struct JointDesc {
    pub joint_type: JointType,
    pub anchor1: Vec3,
    pub anchor2: Vec3,
    pub axis1: Vec3,
    pub axis2: Vec3,
    pub frame1: Quat,
    pub frame2: Quat,
}

impl JointDesc {
    fn neutral(joint_type: JointType, anchor1: Vec3, anchor2: Vec3) -> Self {
        Self {
            joint_type,
            anchor1,
            anchor2,
            axis1: Vec3::ZERO,
            axis2: Vec3::ZERO,
            frame1: Quat::IDENTITY,
            frame2: Quat::IDENTITY,
        }
    }

    pub fn ball(anchor1: Vec3, anchor2: Vec3) -> Self {
        Self::neutral(JointType::Ball, anchor1, anchor2)
    }

    pub fn fixed(anchor1: Vec3, frame1: Quat, anchor2: Vec3, frame2: Quat) -> Self {
        Self {
            frame1,
            frame2,
            ..Self::neutral(JointType::Fixed, anchor1, anchor2)
        }
    }

    pub fn revolute(anchor1: Vec3, axis1: Vec3, anchor2: Vec3, axis2: Vec3) -> Self {
        Self {
            axis1,
            axis2,
            ..Self::neutral(JointType::Revolute, anchor1, anchor2)
        }
    }

    pub fn prismatic(anchor1: Vec3, axis1: Vec3, anchor2: Vec3, axis2: Vec3) -> Self {
        Self {
            axis1,
            axis2,
            ..Self::neutral(JointType::Prismatic, anchor1, anchor2)
        }
    }

    pub(crate) fn build(self, body1: BodyHandle, body2: BodyHandle) -> Joint {
        Joint {
            body1,
            body2,
            joint_type: self.joint_type,
            anchor1: self.anchor1,
            anchor2: self.anchor2,
            axis1: self.axis1,
            axis2: self.axis2,
            frame1: self.frame1,
            frame2: self.frame2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ball_joint_leaves_axes_and_frames_neutral() {
        let joint = JointDesc::ball(Vec3::Y, Vec3::NEG_Y).build(BodyHandle(0), BodyHandle(1));
        assert_eq!(joint.axis1, Vec3::ZERO);
        assert_eq!(joint.axis2, Vec3::ZERO);
        assert_eq!(joint.frame1, Quat::IDENTITY);
        assert_eq!(joint.frame2, Quat::IDENTITY);
        assert_eq!((joint.body1(), joint.body2()), (BodyHandle(0), BodyHandle(1)));
    }

    #[test]
    fn revolute_joint_keeps_axes() {
        let desc = JointDesc::revolute(Vec3::ZERO, Vec3::Z, Vec3::X, Vec3::Z);
        assert_eq!(desc.joint_type, JointType::Revolute);
        assert_eq!(desc.axis1, Vec3::Z);
        assert_eq!(desc.frame1, Quat::IDENTITY);
    }
}
