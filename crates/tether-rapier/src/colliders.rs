//! Collision shape generation from collision descriptions.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, UnitVector3, Vector3};
use parry3d::shape::SharedShape;
use rapier3d::geometry::{Collider, ColliderBuilder};
use rapier3d::pipeline::ActiveHooks;
use tether_ir::{Collision, Geometry, Pose};

use crate::error::ConstructError;

/// Slip compliance stored in a collider's `user_data`.
///
/// The low 64 bits hold the primary compliance, the high 64 bits the
/// secondary one, both as raw `f64` bits so values read back exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SlipCompliance {
    /// Compliance along the primary friction direction.
    pub primary: f64,
    /// Compliance along the secondary friction direction.
    pub secondary: f64,
}

impl SlipCompliance {
    /// Decode from collider user data.
    pub fn from_user_data(data: u128) -> Self {
        Self {
            primary: f64::from_bits(data as u64),
            secondary: f64::from_bits((data >> 64) as u64),
        }
    }

    /// Encode as collider user data.
    pub fn to_user_data(self) -> u128 {
        (self.primary.to_bits() as u128) | ((self.secondary.to_bits() as u128) << 64)
    }

    /// Read the compliance of a collider.
    pub fn of(collider: &Collider) -> Self {
        Self::from_user_data(collider.user_data)
    }

    /// Whether either direction is compliant.
    pub fn is_compliant(&self) -> bool {
        self.primary != 0.0 || self.secondary != 0.0
    }
}

/// Convert a description pose into an isometry.
pub fn pose_to_isometry(pose: &Pose) -> Isometry3<f32> {
    let translation = Translation3::new(
        pose.position.x as f32,
        pose.position.y as f32,
        pose.position.z as f32,
    );
    let rotation = UnitQuaternion::from_euler_angles(
        pose.rotation.x as f32,
        pose.rotation.y as f32,
        pose.rotation.z as f32,
    );
    Isometry3::from_parts(translation, rotation)
}

/// Generate a shape and its placement correction for a geometry.
///
/// Cylinders and capsules are Y-aligned in parry, so Z-aligned descriptions
/// get a quarter turn about X.
fn geometry_to_shape(geometry: &Geometry, name: &str) -> Result<(SharedShape, Isometry3<f32>), ConstructError> {
    let z_up = Isometry3::rotation(Vector3::x() * std::f32::consts::FRAC_PI_2);
    match geometry {
        Geometry::Box { size } => Ok((
            SharedShape::cuboid(size.x as f32 / 2.0, size.y as f32 / 2.0, size.z as f32 / 2.0),
            Isometry3::identity(),
        )),
        Geometry::Sphere { radius } => Ok((SharedShape::ball(*radius as f32), Isometry3::identity())),
        Geometry::Cylinder { radius, length } => Ok((
            SharedShape::cylinder(*length as f32 / 2.0, *radius as f32),
            z_up,
        )),
        Geometry::Capsule { radius, length } => Ok((
            SharedShape::capsule_y(*length as f32 / 2.0, *radius as f32),
            z_up,
        )),
        Geometry::Plane { normal } => {
            let axis = Vector3::new(normal.x as f32, normal.y as f32, normal.z as f32);
            let normal = UnitVector3::try_new(axis, f32::EPSILON).ok_or_else(|| {
                ConstructError::CollisionShape {
                    name: name.to_string(),
                    reason: "plane normal has zero length".to_string(),
                }
            })?;
            Ok((SharedShape::halfspace(normal), Isometry3::identity()))
        }
    }
}

/// Build a massless collider for a collision description.
///
/// Mass comes from the parent link's inertial, so colliders carry zero
/// density. Every collider opts into solver-contact modification so slip
/// compliance can be honored.
pub fn collision_to_collider(collision: &Collision) -> Result<Collider, ConstructError> {
    let (shape, correction) = geometry_to_shape(&collision.geometry, &collision.name)?;
    let slip = SlipCompliance {
        primary: collision.surface.slip1,
        secondary: collision.surface.slip2,
    };

    Ok(ColliderBuilder::new(shape)
        .position(pose_to_isometry(&collision.pose) * correction)
        .density(0.0)
        .friction(collision.surface.friction as f32)
        .restitution(collision.surface.restitution as f32)
        .active_hooks(ActiveHooks::MODIFY_SOLVER_CONTACTS)
        .user_data(slip.to_user_data())
        .build())
}

/// Principal moments of inertia of a solid geometry with the given mass.
///
/// Planes are unbounded and report zero inertia.
pub fn principal_inertia(geometry: &Geometry, mass: f64) -> Vector3<f64> {
    match geometry {
        Geometry::Box { size } => {
            let (x2, y2, z2) = (size.x * size.x, size.y * size.y, size.z * size.z);
            Vector3::new(y2 + z2, x2 + z2, x2 + y2) * (mass / 12.0)
        }
        Geometry::Sphere { radius } => Vector3::repeat(0.4 * mass * radius * radius),
        Geometry::Cylinder { radius, length } | Geometry::Capsule { radius, length } => {
            // Capsules use the cylinder of the same overall length.
            let (r2, l2) = (radius * radius, length * length);
            let lateral = mass * (3.0 * r2 + l2) / 12.0;
            Vector3::new(lateral, lateral, 0.5 * mass * r2)
        }
        Geometry::Plane { .. } => Vector3::zeros(),
    }
}
