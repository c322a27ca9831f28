//! Stepping and world-level dynamics settings.

use nalgebra::{Point3, Vector3};
use tether_core::{
    ContactRecord, ForwardStep, Identity, LinkPose, StepInput, StepOutput, StepState,
    WorldGravity,
};
use tracing::{trace, warn};

use crate::convert::{isometry_to_f64, point_to_f64, vector_to_f32, vector_to_f64};
use crate::engine::{Native, RapierEngine};

const POSE_EPSILON: f32 = 1.0e-7;

impl ForwardStep for RapierEngine {
    fn world_forward_step(
        &mut self,
        world: Identity,
        output: &mut StepOutput,
        state: &mut StepState,
        input: &StepInput,
    ) -> bool {
        let Some(w) = self.world_key(world) else {
            return false;
        };

        // Resolve wrench targets before borrowing the world mutably.
        let mut wrenches = Vec::with_capacity(input.wrenches.len());
        for wrench in &input.wrenches {
            match self.link_handle(wrench.link) {
                Some((lw, body)) if lw == w => wrenches.push((body, wrench)),
                _ => warn!(link = %wrench.link, "ignoring wrench on a link outside this world"),
            }
        }

        let Some(physics) = self.worlds.get_mut(w) else {
            return false;
        };
        let dt = input.time_step.unwrap_or(physics.time_step);
        if !(dt > 0.0 && dt.is_finite()) {
            warn!(dt, "refusing to step with a non-positive time step");
            return false;
        }

        for (handle, wrench) in wrenches {
            if let Some(body) = physics.bodies.get_mut(handle) {
                let point = Point3::from(body.translation() + vector_to_f32(&wrench.offset));
                body.add_force_at_point(vector_to_f32(&wrench.force), point, true);
                body.add_torque(vector_to_f32(&wrench.torque), true);
            }
        }

        let before = physics.link_poses();
        physics.step(dt as f32);

        output.clear();
        for pair in physics.narrow_phase.contact_pairs() {
            if !pair.has_any_active_contact {
                continue;
            }
            let shape1 = self.table.identity_of(&Native::Shape(w, pair.collider1));
            let shape2 = self.table.identity_of(&Native::Shape(w, pair.collider2));
            let (Some(shape1), Some(shape2)) = (shape1, shape2) else {
                continue;
            };
            for manifold in &pair.manifolds {
                for contact in &manifold.data.solver_contacts {
                    output.contacts.push(ContactRecord {
                        shape1,
                        shape2,
                        point: point_to_f64(&contact.point),
                        normal: vector_to_f64(&manifold.data.normal),
                        depth: -f64::from(contact.dist),
                    });
                }
            }
        }

        for (handle, old) in before {
            let Some(body) = physics.bodies.get(handle) else {
                continue;
            };
            let new = body.position();
            let moved = (new.translation.vector - old.translation.vector).norm() > POSE_EPSILON
                || new.rotation.angle_to(&old.rotation) > POSE_EPSILON;
            if !moved {
                continue;
            }
            if let Some(link) = self.table.identity_of(&Native::Link(w, handle)) {
                output.changed_poses.push(LinkPose {
                    link,
                    pose: isometry_to_f64(new),
                });
            }
        }

        state.iterations += 1;
        state.sim_time += dt;
        trace!(iteration = state.iterations, contacts = output.contacts.len(), "stepped");
        true
    }
}

impl WorldGravity for RapierEngine {
    fn gravity(&self, world: Identity) -> Option<Vector3<f64>> {
        let physics = self.worlds.get(self.world_key(world)?)?;
        Some(vector_to_f64(&physics.gravity()))
    }

    fn set_gravity(&mut self, world: Identity, gravity: Vector3<f64>) -> bool {
        let Some(w) = self.world_key(world) else {
            return false;
        };
        match self.worlds.get_mut(w) {
            Some(physics) => {
                physics.set_gravity(vector_to_f32(&gravity));
                true
            }
            None => false,
        }
    }
}
