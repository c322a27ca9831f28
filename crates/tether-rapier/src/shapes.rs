//! Shape features: slip compliance, friction and placement.

use nalgebra::{Isometry3, Point3};
use rapier3d::geometry::Collider;
use tether_core::{
    GetShapeFrictionPyramidSlipCompliance, GetShapeGeometry, Identity,
    SetShapeFrictionPyramidSlipCompliance, ShapeFriction,
};

use crate::colliders::SlipCompliance;
use crate::convert::{isometry_to_f64, point_to_f64};
use crate::engine::RapierEngine;

impl RapierEngine {
    fn collider(&self, shape: Identity) -> Option<&Collider> {
        let (w, c) = self.shape_handle(shape)?;
        self.worlds.get(w)?.colliders.get(c)
    }

    fn collider_mut(&mut self, shape: Identity) -> Option<&mut Collider> {
        let (w, c) = self.shape_handle(shape)?;
        self.worlds.get_mut(w)?.colliders.get_mut(c)
    }

    fn update_slip(&mut self, shape: Identity, update: impl FnOnce(&mut SlipCompliance)) -> bool {
        let Some(collider) = self.collider_mut(shape) else {
            return false;
        };
        let mut slip = SlipCompliance::of(collider);
        update(&mut slip);
        collider.user_data = slip.to_user_data();
        true
    }
}

impl GetShapeFrictionPyramidSlipCompliance for RapierEngine {
    fn primary_slip_compliance(&self, shape: Identity) -> Option<f64> {
        self.collider(shape).map(|c| SlipCompliance::of(c).primary)
    }

    fn secondary_slip_compliance(&self, shape: Identity) -> Option<f64> {
        self.collider(shape).map(|c| SlipCompliance::of(c).secondary)
    }
}

impl SetShapeFrictionPyramidSlipCompliance for RapierEngine {
    fn set_primary_slip_compliance(&mut self, shape: Identity, value: f64) -> bool {
        self.update_slip(shape, |slip| slip.primary = value)
    }

    fn set_secondary_slip_compliance(&mut self, shape: Identity, value: f64) -> bool {
        self.update_slip(shape, |slip| slip.secondary = value)
    }
}

impl ShapeFriction for RapierEngine {
    fn friction(&self, shape: Identity) -> Option<f64> {
        self.collider(shape).map(|c| c.friction() as f64)
    }

    fn set_friction(&mut self, shape: Identity, friction: f64) -> bool {
        match self.collider_mut(shape) {
            Some(collider) => {
                collider.set_friction(friction as f32);
                true
            }
            None => false,
        }
    }
}

impl GetShapeGeometry for RapierEngine {
    fn shape_pose(&self, shape: Identity) -> Option<Isometry3<f64>> {
        let collider = self.collider(shape)?;
        let pose = collider
            .position_wrt_parent()
            .copied()
            .unwrap_or(*collider.position());
        Some(isometry_to_f64(&pose))
    }

    fn shape_bounding_box(&self, shape: Identity) -> Option<(Point3<f64>, Point3<f64>)> {
        let aabb = self.collider(shape)?.compute_aabb();
        Some((point_to_f64(&aabb.mins), point_to_f64(&aabb.maxs)))
    }
}
