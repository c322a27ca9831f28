//! Slip-compliant friction and contact reporting.
//!
//! Rapier has no notion of slip compliance. A contact pair whose shapes
//! carry a non-zero compliance is made frictionless in the solver (through
//! [`SlipComplianceHooks`]) and its friction is supplied as an explicit
//! force before the step instead. Along a direction with compliance `s` the
//! force is `-v_t / s`, so a body pushed with a steady tangential force `F`
//! slides at `v = s * F`. Directions with zero compliance get a force that
//! cancels the tangential velocity within one step. The total is bounded by
//! the Coulomb cone `mu * N`, with `N` taken from the previous step's
//! normal impulses.

use nalgebra::{Point3, Vector3};
use rapier3d::dynamics::{RigidBodyHandle, RigidBodySet};
use rapier3d::geometry::{ColliderHandle, ColliderSet, ContactPair, NarrowPhase};
use rapier3d::pipeline::{ContactModificationContext, PhysicsHooks};

use crate::colliders::SlipCompliance;

/// Solver hooks disabling Rapier friction on slip-compliant contacts.
#[derive(Debug, Default, Clone, Copy)]
pub struct SlipComplianceHooks;

impl PhysicsHooks for SlipComplianceHooks {
    fn modify_solver_contacts(&self, context: &mut ContactModificationContext) {
        let compliant = [context.collider1, context.collider2]
            .iter()
            .filter_map(|h| context.colliders.get(*h))
            .any(|c| SlipCompliance::of(c).is_compliant());
        if compliant {
            for contact in context.solver_contacts.iter_mut() {
                contact.friction = 0.0;
            }
        }
    }
}

/// Friction force to apply to a body before the next step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlipLoad {
    /// Body receiving the force.
    pub body: RigidBodyHandle,
    /// Force in the world frame.
    pub force: Vector3<f32>,
}

/// Unit vector of `direction` projected onto the plane with unit `normal`.
///
/// Falls back to an arbitrary in-plane direction when `direction` is
/// parallel to the normal.
pub fn tangent_direction(direction: &Vector3<f32>, normal: &Vector3<f32>) -> Vector3<f32> {
    let projected = direction - normal * direction.dot(normal);
    if let Some(unit) = projected.try_normalize(1.0e-6) {
        return unit;
    }
    let fallback = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    (fallback - normal * fallback.dot(normal)).normalize()
}

fn pair_point(pair: &ContactPair) -> Option<(Vector3<f32>, Point3<f32>, f32)> {
    let manifold = pair.manifolds.iter().find(|m| !m.data.solver_contacts.is_empty())?;
    let contacts = &manifold.data.solver_contacts;
    let sum = contacts
        .iter()
        .fold(Vector3::zeros(), |acc, c| acc + c.point.coords);
    let point = Point3::from(sum / contacts.len() as f32);
    let normal_impulse: f32 = pair
        .manifolds
        .iter()
        .flat_map(|m| m.points.iter())
        .map(|p| p.data.impulse)
        .sum();
    Some((manifold.data.normal, point, normal_impulse))
}

/// Compute slip-compliant friction forces for every compliant contact pair.
///
/// `fdir1` maps a collider to its primary friction direction (world frame);
/// `None` selects the world X axis.
pub fn slip_loads(
    narrow_phase: &NarrowPhase,
    bodies: &RigidBodySet,
    colliders: &ColliderSet,
    dt: f32,
    fdir1: impl Fn(ColliderHandle) -> Option<Vector3<f32>>,
) -> Vec<SlipLoad> {
    let mut loads = Vec::new();

    for pair in narrow_phase.contact_pairs() {
        if !pair.has_any_active_contact {
            continue;
        }
        let (Some(c1), Some(c2)) = (colliders.get(pair.collider1), colliders.get(pair.collider2)) else {
            continue;
        };
        let (s1, s2) = (SlipCompliance::of(c1), SlipCompliance::of(c2));
        if !s1.is_compliant() && !s2.is_compliant() {
            continue;
        }
        // Compliances of the two surfaces act in series.
        let primary = (s1.primary + s2.primary) as f32;
        let secondary = (s1.secondary + s2.secondary) as f32;

        let Some((normal, point, normal_impulse)) = pair_point(pair) else {
            continue;
        };

        let body1 = c1.parent().and_then(|h| bodies.get(h).map(|b| (h, b)));
        let body2 = c2.parent().and_then(|h| bodies.get(h).map(|b| (h, b)));
        let dyn1 = body1.filter(|(_, b)| b.is_dynamic());
        let dyn2 = body2.filter(|(_, b)| b.is_dynamic());
        if dyn1.is_none() && dyn2.is_none() {
            continue;
        }

        let v1 = body1
            .map(|(_, b)| b.velocity_at_point(&point))
            .unwrap_or_else(Vector3::zeros);
        let v2 = body2
            .map(|(_, b)| b.velocity_at_point(&point))
            .unwrap_or_else(Vector3::zeros);
        let relative = v2 - v1;

        let effective_mass = match (dyn1, dyn2) {
            (Some((_, a)), Some((_, b))) => a.mass() * b.mass() / (a.mass() + b.mass()),
            (Some((_, a)), None) => a.mass(),
            (None, Some((_, b))) => b.mass(),
            (None, None) => continue,
        };

        let direction = fdir1(pair.collider1)
            .or_else(|| fdir1(pair.collider2))
            .unwrap_or_else(Vector3::x);
        let d1 = tangent_direction(&direction, &normal);
        let d2 = normal.cross(&d1);

        let mut force = Vector3::zeros();
        for (dir, compliance) in [(d1, primary), (d2, secondary)] {
            let slip_rate = relative.dot(&dir);
            let magnitude = if compliance > 0.0 {
                -slip_rate / compliance
            } else {
                -effective_mass * slip_rate / dt
            };
            force += dir * magnitude;
        }

        let mu = 0.5 * (c1.friction() + c2.friction());
        let limit = mu * normal_impulse.max(0.0) / dt;
        let norm = force.norm();
        if norm > limit {
            force = if limit > 0.0 {
                force * (limit / norm)
            } else {
                Vector3::zeros()
            };
        }

        // `force` acts on body 2; body 1 receives the reaction.
        if let Some((handle, _)) = dyn2 {
            loads.push(SlipLoad {
                body: handle,
                force,
            });
        }
        if let Some((handle, _)) = dyn1 {
            loads.push(SlipLoad {
                body: handle,
                force: -force,
            });
        }
    }

    loads
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tangent_projects_onto_contact_plane() {
        let normal = Vector3::z();
        let t = tangent_direction(&Vector3::new(1.0, 0.0, 1.0), &normal);
        assert!((t - Vector3::x()).norm() < 1e-6);
    }

    #[test]
    fn tangent_falls_back_when_parallel_to_normal() {
        let normal = Vector3::z();
        let t = tangent_direction(&Vector3::z(), &normal);
        assert!((t.norm() - 1.0).abs() < 1e-6);
        assert!(t.dot(&normal).abs() < 1e-6);
    }

    #[test]
    fn secondary_direction_completes_right_handed_basis() {
        let normal = Vector3::z();
        let d1 = tangent_direction(&Vector3::x(), &normal);
        let d2 = normal.cross(&d1);
        assert!((d2 - Vector3::y()).norm() < 1e-6);
    }
}
