//! Kinematic snapshots of links.

use nalgebra::{Isometry3, Vector3};

/// Pose, velocity and acceleration of a body relative to a reference frame.
///
/// Derived on demand from engine state; never stored by adapters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameData {
    /// Pose of the body frame.
    pub pose: Isometry3<f64>,
    /// Linear velocity of the body origin.
    pub linear_velocity: Vector3<f64>,
    /// Angular velocity.
    pub angular_velocity: Vector3<f64>,
    /// Linear acceleration over the last step.
    pub linear_acceleration: Vector3<f64>,
    /// Angular acceleration over the last step.
    pub angular_acceleration: Vector3<f64>,
}

impl Default for FrameData {
    fn default() -> Self {
        Self {
            pose: Isometry3::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            linear_acceleration: Vector3::zeros(),
            angular_acceleration: Vector3::zeros(),
        }
    }
}

impl FrameData {
    /// Whether every velocity and acceleration component is within `tol` of zero.
    pub fn is_at_rest(&self, tol: f64) -> bool {
        [
            self.linear_velocity,
            self.angular_velocity,
            self.linear_acceleration,
            self.angular_acceleration,
        ]
        .iter()
        .all(|v| v.amax() <= tol)
    }
}
