//! Inputs, persistent state and outputs of a forward step.

use nalgebra::{Isometry3, Point3, Vector3};

use crate::identity::Identity;

/// External force/torque applied to a link for a single step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExternalWrench {
    /// Target link.
    pub link: Identity,
    /// Force in the world frame.
    pub force: Vector3<f64>,
    /// Torque in the world frame.
    pub torque: Vector3<f64>,
    /// Application point relative to the link origin, in the world frame.
    pub offset: Vector3<f64>,
}

impl ExternalWrench {
    /// A pure force through the link origin.
    pub fn force(link: Identity, force: Vector3<f64>) -> Self {
        Self {
            link,
            force,
            torque: Vector3::zeros(),
            offset: Vector3::zeros(),
        }
    }
}

/// Values consumed by one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepInput {
    /// Override of the world time step, in seconds.
    pub time_step: Option<f64>,
    /// Wrenches applied during this step only.
    pub wrenches: Vec<ExternalWrench>,
}

/// Simulation state carried across steps by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepState {
    /// Number of completed steps.
    pub iterations: u64,
    /// Simulated time in seconds.
    pub sim_time: f64,
}

/// A contact between two shapes at the end of a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactRecord {
    /// First shape.
    pub shape1: Identity,
    /// Second shape.
    pub shape2: Identity,
    /// Contact point in the world frame.
    pub point: Point3<f64>,
    /// World-frame normal pointing from `shape1` toward `shape2`.
    pub normal: Vector3<f64>,
    /// Penetration depth (positive when overlapping).
    pub depth: f64,
}

/// World pose of a link after a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkPose {
    /// Link identity.
    pub link: Identity,
    /// Pose in the world frame.
    pub pose: Isometry3<f64>,
}

/// Diagnostics produced by one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutput {
    /// Active contacts.
    pub contacts: Vec<ContactRecord>,
    /// Links whose pose changed during the step.
    pub changed_poses: Vec<LinkPose>,
}

impl StepOutput {
    /// Drop the previous step's records.
    pub fn clear(&mut self) {
        self.contacts.clear();
        self.changed_poses.clear();
    }

    /// Contacts involving `shape`.
    pub fn contacts_of(&self, shape: Identity) -> impl Iterator<Item = &ContactRecord> + '_ {
        self.contacts
            .iter()
            .filter(move |c| c.shape1 == shape || c.shape2 == shape)
    }
}
