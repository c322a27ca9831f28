//! Link features: kinematic state and external loads.

use nalgebra::{Point3, Vector3};
use tether_core::{AddLinkExternalForceTorque, FrameData, Identity, LinkFrameSemantics};

use crate::convert::{isometry_to_f64, vector_to_f32, vector_to_f64};
use crate::engine::RapierEngine;

impl LinkFrameSemantics for RapierEngine {
    fn frame_data_relative_to_world(&self, link: Identity) -> Option<FrameData> {
        let (w, handle) = self.link_handle(link)?;
        let world = self.worlds.get(w)?;
        let body = world.bodies.get(handle)?;
        let origin = Point3::from(body.translation().clone_owned());
        let (linear_acceleration, angular_acceleration) = world.acceleration(handle);

        Some(FrameData {
            pose: isometry_to_f64(body.position()),
            linear_velocity: vector_to_f64(&body.velocity_at_point(&origin)),
            angular_velocity: vector_to_f64(body.angvel()),
            linear_acceleration: vector_to_f64(&linear_acceleration),
            angular_acceleration: vector_to_f64(&angular_acceleration),
        })
    }
}

impl AddLinkExternalForceTorque for RapierEngine {
    fn add_external_force(
        &mut self,
        link: Identity,
        force: Vector3<f64>,
        offset: Vector3<f64>,
    ) -> bool {
        let Some((w, handle)) = self.link_handle(link) else {
            return false;
        };
        let Some(body) = self.worlds.get_mut(w).and_then(|pw| pw.bodies.get_mut(handle)) else {
            return false;
        };
        let point = Point3::from(body.translation() + vector_to_f32(&offset));
        body.add_force_at_point(vector_to_f32(&force), point, true);
        true
    }

    fn add_external_torque(&mut self, link: Identity, torque: Vector3<f64>) -> bool {
        let Some((w, handle)) = self.link_handle(link) else {
            return false;
        };
        let Some(body) = self.worlds.get_mut(w).and_then(|pw| pw.bodies.get_mut(handle)) else {
            return false;
        };
        body.add_torque(vector_to_f32(&torque), true);
        true
    }
}
