//! Joint conversion from descriptions to Rapier, and joint coordinates.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use rapier3d::dynamics::{
    GenericJoint, GenericJointBuilder, ImpulseJoint, JointAxesMask, JointAxis, MotorModel,
    RigidBody, RigidBodySet,
};
use tether_ir::{Joint as JointDesc, JointKind, Vec3};

use crate::colliders::pose_to_isometry;
use crate::error::ConstructError;

/// Joint types supported by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointType {
    /// No relative motion.
    Fixed,
    /// Rotation about the joint X axis.
    Revolute,
    /// Translation along the joint X axis.
    Prismatic,
    /// Free rotation.
    Ball,
}

impl JointType {
    /// Degrees of freedom exposed through joint state features.
    pub fn dof_count(self) -> usize {
        match self {
            JointType::Fixed => 0,
            JointType::Revolute | JointType::Prismatic => 1,
            JointType::Ball => 3,
        }
    }

    /// Rapier axis driven by `dof`, if any.
    pub fn motor_axis(self, dof: usize) -> Option<JointAxis> {
        match (self, dof) {
            (JointType::Revolute, 0) => Some(JointAxis::AngX),
            (JointType::Prismatic, 0) => Some(JointAxis::LinX),
            (JointType::Ball, 0) => Some(JointAxis::AngX),
            (JointType::Ball, 1) => Some(JointAxis::AngY),
            (JointType::Ball, 2) => Some(JointAxis::AngZ),
            _ => None,
        }
    }
}

fn axis_alignment(axis: &Vec3, name: &str) -> Result<Isometry3<f32>, ConstructError> {
    let axis = Vector3::new(axis.x as f32, axis.y as f32, axis.z as f32);
    if axis.norm() <= f32::EPSILON {
        return Err(ConstructError::InvalidJoint {
            name: name.to_string(),
            reason: "axis has zero length".to_string(),
        });
    }
    // rotation_between fails only for opposite vectors.
    let rotation = UnitQuaternion::rotation_between(&Vector3::x(), &axis)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f32::consts::PI));
    Ok(Isometry3::from_parts(Translation3::identity(), rotation))
}

/// Create a Rapier joint from a joint description.
///
/// # Arguments
///
/// * `joint` - The joint description
/// * `parent_pose` - World pose of the parent body (identity for the world)
/// * `child_pose` - World pose of the child body
///
/// The joint frame is aligned so that its X axis is the joint axis, and the
/// joint coordinates are zero in the given configuration.
pub fn description_to_rapier(
    joint: &JointDesc,
    parent_pose: &Isometry3<f32>,
    child_pose: &Isometry3<f32>,
) -> Result<(GenericJoint, JointType), ConstructError> {
    let joint_frame = pose_to_isometry(&joint.pose);
    let child_in_parent = parent_pose.inverse() * child_pose;

    let (mask, kind, align, limits) = match &joint.kind {
        JointKind::Fixed => (
            JointAxesMask::LOCKED_FIXED_AXES,
            JointType::Fixed,
            Isometry3::identity(),
            None,
        ),
        JointKind::Revolute { axis, limits } => (
            JointAxesMask::LOCKED_REVOLUTE_AXES,
            JointType::Revolute,
            axis_alignment(axis, &joint.name)?,
            limits.map(|(l, u)| (JointAxis::AngX, l as f32, u as f32)),
        ),
        JointKind::Prismatic { axis, limits } => (
            JointAxesMask::LOCKED_PRISMATIC_AXES,
            JointType::Prismatic,
            axis_alignment(axis, &joint.name)?,
            limits.map(|(l, u)| (JointAxis::LinX, l as f32, u as f32)),
        ),
        JointKind::Ball => (
            JointAxesMask::LOCKED_SPHERICAL_AXES,
            JointType::Ball,
            Isometry3::identity(),
            None,
        ),
    };

    if let Some((_, lower, upper)) = limits {
        if lower > upper {
            return Err(ConstructError::InvalidJoint {
                name: joint.name.clone(),
                reason: format!("lower limit {lower} exceeds upper limit {upper}"),
            });
        }
    }

    let mut builder = GenericJointBuilder::new(mask)
        .local_frame1(child_in_parent * joint_frame * align)
        .local_frame2(joint_frame * align);
    if let Some((axis, lower, upper)) = limits {
        builder = builder.limits(axis, [lower, upper]);
    }

    Ok((builder.build(), kind))
}

/// Fixed joint holding `child` at its current pose relative to `parent`.
pub fn fixed_joint_between(parent_pose: &Isometry3<f32>, child_pose: &Isometry3<f32>) -> GenericJoint {
    GenericJointBuilder::new(JointAxesMask::LOCKED_FIXED_AXES)
        .local_frame1(parent_pose.inverse() * child_pose)
        .local_frame2(Isometry3::identity())
        .build()
}

/// Configure a velocity servo on `axis`.
pub fn set_velocity_servo(data: &mut GenericJoint, axis: JointAxis, velocity: f32, damping: f32, max_force: f32) {
    data.set_motor_model(axis, MotorModel::AccelerationBased);
    data.set_motor_velocity(axis, velocity, damping);
    data.set_motor_max_force(axis, max_force);
}

/// World-frame joint frames attached to body 1 and body 2.
pub fn joint_frames(joint: &ImpulseJoint, bodies: &RigidBodySet) -> Option<(Isometry3<f32>, Isometry3<f32>)> {
    let body1 = bodies.get(joint.body1)?;
    let body2 = bodies.get(joint.body2)?;
    Some((
        body1.position() * joint.data.local_frame1,
        body2.position() * joint.data.local_frame2,
    ))
}

/// Joint coordinate `dof` given the two world-frame joint frames.
pub fn coordinate(kind: JointType, frame1: &Isometry3<f32>, frame2: &Isometry3<f32>, dof: usize) -> Option<f32> {
    let relative = frame1.inverse() * frame2;
    match (kind, dof) {
        (JointType::Revolute, 0) => Some(relative.rotation.scaled_axis().x),
        (JointType::Prismatic, 0) => Some(relative.translation.vector.x),
        (JointType::Ball, d @ 0..=2) => Some(relative.rotation.scaled_axis()[d]),
        _ => None,
    }
}

/// Joint velocity `dof`, measured in frame 1.
pub fn coordinate_rate(
    kind: JointType,
    frame1: &Isometry3<f32>,
    body1: &RigidBody,
    body2: &RigidBody,
    dof: usize,
) -> Option<f32> {
    let to_frame1 = frame1.rotation.inverse();
    let angular = to_frame1 * (body2.angvel() - body1.angvel());
    let linear = to_frame1 * (body2.linvel() - body1.linvel());
    match (kind, dof) {
        (JointType::Revolute, 0) => Some(angular.x),
        (JointType::Prismatic, 0) => Some(linear.x),
        (JointType::Ball, d @ 0..=2) => Some(angular[d]),
        _ => None,
    }
}

/// World pose body 2 must take for coordinate `dof` to equal `value`.
///
/// Other coordinates keep their current values.
pub fn body2_pose_for_coordinate(
    kind: JointType,
    joint: &ImpulseJoint,
    frame1: &Isometry3<f32>,
    frame2: &Isometry3<f32>,
    dof: usize,
    value: f32,
) -> Option<Isometry3<f32>> {
    let relative = frame1.inverse() * frame2;
    let target = match (kind, dof) {
        (JointType::Revolute, 0) => Isometry3::rotation(Vector3::x() * value),
        (JointType::Prismatic, 0) => Isometry3::translation(value, 0.0, 0.0),
        (JointType::Ball, d @ 0..=2) => {
            let mut scaled = relative.rotation.scaled_axis();
            scaled[d] = value;
            Isometry3::rotation(scaled)
        }
        _ => return None,
    };
    Some(frame1 * target * joint.data.local_frame2.inverse())
}
