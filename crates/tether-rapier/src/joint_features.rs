//! Joint features: state, servo commands and runtime attachment.

use nalgebra::Vector3;
use rapier3d::dynamics::ImpulseJointHandle;
use tether_core::{
    AttachFixedJoint, DetachJoint, EntityKind, GetBasicJointState, Identity, RevoluteJointCast,
    SetBasicJointState, SetJointVelocityCommand,
};
use tracing::debug;

use crate::convert::vector_to_f64;
use crate::engine::{Native, RapierEngine, WorldKey};
use crate::joints::{
    body2_pose_for_coordinate, coordinate, coordinate_rate, fixed_joint_between, joint_frames,
    set_velocity_servo, JointType,
};
use crate::world::{JointData, PhysicsWorld};

impl RapierEngine {
    fn joint_entry(&self, joint: Identity) -> Option<(WorldKey, ImpulseJointHandle, JointType)> {
        let (w, handle) = self.joint_handle(joint)?;
        let (_, data) = self.worlds.get(w)?.find_joint(handle)?;
        Some((w, handle, data.kind))
    }
}

impl GetBasicJointState for RapierEngine {
    fn joint_dof_count(&self, joint: Identity) -> Option<usize> {
        self.joint_entry(joint).map(|(_, _, kind)| kind.dof_count())
    }

    fn joint_position(&self, joint: Identity, dof: usize) -> Option<f64> {
        let (w, handle, kind) = self.joint_entry(joint)?;
        let world = self.worlds.get(w)?;
        let rapier_joint = world.impulse_joints.get(handle)?;
        let (f1, f2) = joint_frames(rapier_joint, &world.bodies)?;
        coordinate(kind, &f1, &f2, dof).map(f64::from)
    }

    fn joint_velocity(&self, joint: Identity, dof: usize) -> Option<f64> {
        let (w, handle, kind) = self.joint_entry(joint)?;
        let world = self.worlds.get(w)?;
        let rapier_joint = world.impulse_joints.get(handle)?;
        let (f1, _) = joint_frames(rapier_joint, &world.bodies)?;
        let body1 = world.bodies.get(rapier_joint.body1)?;
        let body2 = world.bodies.get(rapier_joint.body2)?;
        coordinate_rate(kind, &f1, body1, body2, dof).map(f64::from)
    }
}

impl SetBasicJointState for RapierEngine {
    fn set_joint_position(&mut self, joint: Identity, dof: usize, value: f64) -> bool {
        let Some((w, handle, kind)) = self.joint_entry(joint) else {
            return false;
        };
        let Some(world) = self.worlds.get_mut(w) else {
            return false;
        };
        let Some(rapier_joint) = world.impulse_joints.get(handle) else {
            return false;
        };
        let Some((f1, f2)) = joint_frames(rapier_joint, &world.bodies) else {
            return false;
        };
        let Some(pose) = body2_pose_for_coordinate(kind, rapier_joint, &f1, &f2, dof, value as f32)
        else {
            return false;
        };
        let child = rapier_joint.body2;
        match world.bodies.get_mut(child) {
            Some(body) => {
                body.set_position(pose, true);
                true
            }
            None => false,
        }
    }

    fn set_joint_velocity(&mut self, joint: Identity, dof: usize, value: f64) -> bool {
        let Some((w, handle, kind)) = self.joint_entry(joint) else {
            return false;
        };
        let Some(world) = self.worlds.get_mut(w) else {
            return false;
        };
        let Some(current) = joint_rate(world, handle, kind, dof) else {
            return false;
        };
        let Some(rapier_joint) = world.impulse_joints.get(handle) else {
            return false;
        };
        let Some((f1, _)) = joint_frames(rapier_joint, &world.bodies) else {
            return false;
        };
        let mut local = Vector3::zeros();
        local[if kind == JointType::Ball { dof } else { 0 }] = 1.0;
        let delta = f1.rotation * local * (value as f32 - current);

        let child = rapier_joint.body2;
        let Some(body) = world.bodies.get_mut(child) else {
            return false;
        };
        if kind == JointType::Prismatic {
            let linvel = body.linvel() + delta;
            body.set_linvel(linvel, true);
        } else {
            let angvel = body.angvel() + delta;
            body.set_angvel(angvel, true);
        }
        true
    }
}

fn joint_rate(world: &PhysicsWorld, handle: ImpulseJointHandle, kind: JointType, dof: usize) -> Option<f32> {
    let rapier_joint = world.impulse_joints.get(handle)?;
    let (f1, _) = joint_frames(rapier_joint, &world.bodies)?;
    let body1 = world.bodies.get(rapier_joint.body1)?;
    let body2 = world.bodies.get(rapier_joint.body2)?;
    coordinate_rate(kind, &f1, body1, body2, dof)
}

impl SetJointVelocityCommand for RapierEngine {
    fn set_joint_velocity_command(&mut self, joint: Identity, dof: usize, velocity: f64) -> bool {
        let Some((w, handle, kind)) = self.joint_entry(joint) else {
            return false;
        };
        let Some(axis) = kind.motor_axis(dof) else {
            return false;
        };
        let damping = self.config.velocity_servo_damping as f32;
        let max_force = self.config.velocity_servo_max_force as f32;
        let Some(rapier_joint) = self
            .worlds
            .get_mut(w)
            .and_then(|pw| pw.impulse_joints.get_mut(handle, true))
        else {
            return false;
        };
        set_velocity_servo(&mut rapier_joint.data, axis, velocity as f32, damping, max_force);
        true
    }
}

impl RevoluteJointCast for RapierEngine {
    fn revolute_axis(&self, joint: Identity) -> Option<Vector3<f64>> {
        let (w, handle, kind) = self.joint_entry(joint)?;
        if kind != JointType::Revolute {
            return None;
        }
        let rapier_joint = self.worlds.get(w)?.impulse_joints.get(handle)?;
        Some(vector_to_f64(&(rapier_joint.data.local_frame1.rotation * Vector3::x())))
    }
}

impl AttachFixedJoint for RapierEngine {
    fn attach_fixed_joint(&mut self, child: Identity, parent: Option<Identity>, name: &str) -> Identity {
        let Some((w, child_body)) = self.link_handle(child) else {
            return Identity::invalid();
        };
        let parent_body = match parent {
            Some(p) => match self.link_handle(p) {
                Some((pw, body)) if pw == w => Some(body),
                _ => return Identity::invalid(),
            },
            None => None,
        };
        let Some(world) = self.worlds.get_mut(w) else {
            return Identity::invalid();
        };
        let Some((model, _)) = world.find_link(child_body) else {
            return Identity::invalid();
        };
        let parent_body = parent_body.unwrap_or(world.ground);
        let (Some(p), Some(c)) = (world.bodies.get(parent_body), world.bodies.get(child_body)) else {
            return Identity::invalid();
        };
        let data = fixed_joint_between(p.position(), c.position());
        let handle = world.impulse_joints.insert(parent_body, child_body, data, true);
        let Some(model_data) = world.model_mut(model) else {
            return Identity::invalid();
        };
        model_data.joints.push(JointData {
            name: name.to_string(),
            handle,
            kind: JointType::Fixed,
        });

        let id = self.table.register(EntityKind::Joint, Native::Joint(w, handle));
        debug!(joint = name, %id, "attached fixed joint");
        id
    }
}

impl DetachJoint for RapierEngine {
    fn detach_joint(&mut self, joint: Identity) -> bool {
        let Some((w, handle, _)) = self.joint_entry(joint) else {
            return false;
        };
        let Some(world) = self.worlds.get_mut(w) else {
            return false;
        };
        let Some((model, _)) = world.find_joint(handle) else {
            return false;
        };
        world.impulse_joints.remove(handle, true);
        if let Some(model_data) = world.model_mut(model) {
            model_data.joints.retain(|j| j.handle != handle);
        }
        self.table.invalidate(joint);
        debug!(%joint, "detached joint");
        true
    }
}
