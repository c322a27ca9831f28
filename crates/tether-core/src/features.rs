//! Feature traits: the operations an engine may expose.
//!
//! Each trait is one independently composable capability. An engine exposes
//! a capability by implementing its trait; code that needs a capability
//! bounds on the trait, so calling an operation an engine does not support
//! is a compile error rather than a runtime failure.
//!
//! Lookup misses are reported with `false`, `None` or an invalid
//! [`Identity`], never with a panic.

use nalgebra::{Isometry3, Point3, Vector3};

use crate::frame::FrameData;
use crate::identity::Identity;
use crate::step::{StepInput, StepOutput, StepState};

/// Tag naming a feature, used to advertise an engine's capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// [`ConstructEmptyWorld`].
    ConstructEmptyWorld,
    /// [`RemoveModelFromWorld`].
    RemoveModelFromWorld,
    /// [`RemoveWorld`].
    RemoveWorld,
    /// [`GetEntities`].
    GetEntities,
    /// [`ForwardStep`].
    ForwardStep,
    /// [`WorldGravity`].
    WorldGravity,
    /// [`GetShapeFrictionPyramidSlipCompliance`].
    GetShapeFrictionPyramidSlipCompliance,
    /// [`SetShapeFrictionPyramidSlipCompliance`].
    SetShapeFrictionPyramidSlipCompliance,
    /// [`ShapeFriction`].
    ShapeFriction,
    /// [`GetShapeGeometry`].
    GetShapeGeometry,
    /// [`LinkFrameSemantics`].
    LinkFrameSemantics,
    /// [`AddLinkExternalForceTorque`].
    AddLinkExternalForceTorque,
    /// [`GetBasicJointState`].
    GetBasicJointState,
    /// [`SetBasicJointState`].
    SetBasicJointState,
    /// [`SetJointVelocityCommand`].
    SetJointVelocityCommand,
    /// [`RevoluteJointCast`].
    RevoluteJointCast,
    /// [`AttachFixedJoint`].
    AttachFixedJoint,
    /// [`DetachJoint`].
    DetachJoint,
    /// [`ConstructFromDescription`].
    ConstructFromDescription,
}

impl Feature {
    /// Every feature tag.
    pub const ALL: &'static [Feature] = &[
        Feature::ConstructEmptyWorld,
        Feature::RemoveModelFromWorld,
        Feature::RemoveWorld,
        Feature::GetEntities,
        Feature::ForwardStep,
        Feature::WorldGravity,
        Feature::GetShapeFrictionPyramidSlipCompliance,
        Feature::SetShapeFrictionPyramidSlipCompliance,
        Feature::ShapeFriction,
        Feature::GetShapeGeometry,
        Feature::LinkFrameSemantics,
        Feature::AddLinkExternalForceTorque,
        Feature::GetBasicJointState,
        Feature::SetBasicJointState,
        Feature::SetJointVelocityCommand,
        Feature::RevoluteJointCast,
        Feature::AttachFixedJoint,
        Feature::DetachJoint,
        Feature::ConstructFromDescription,
    ];

    /// Stable name of the feature.
    pub fn name(&self) -> &'static str {
        match self {
            Feature::ConstructEmptyWorld => "construct_empty_world",
            Feature::RemoveModelFromWorld => "remove_model_from_world",
            Feature::RemoveWorld => "remove_world",
            Feature::GetEntities => "get_entities",
            Feature::ForwardStep => "forward_step",
            Feature::WorldGravity => "world_gravity",
            Feature::GetShapeFrictionPyramidSlipCompliance => {
                "get_shape_friction_pyramid_slip_compliance"
            }
            Feature::SetShapeFrictionPyramidSlipCompliance => {
                "set_shape_friction_pyramid_slip_compliance"
            }
            Feature::ShapeFriction => "shape_friction",
            Feature::GetShapeGeometry => "get_shape_geometry",
            Feature::LinkFrameSemantics => "link_frame_semantics",
            Feature::AddLinkExternalForceTorque => "add_link_external_force_torque",
            Feature::GetBasicJointState => "get_basic_joint_state",
            Feature::SetBasicJointState => "set_basic_joint_state",
            Feature::SetJointVelocityCommand => "set_joint_velocity_command",
            Feature::RevoluteJointCast => "revolute_joint_cast",
            Feature::AttachFixedJoint => "attach_fixed_joint",
            Feature::DetachJoint => "detach_joint",
            Feature::ConstructFromDescription => "construct_from_description",
        }
    }
}

/// Capability set advertised by an engine.
///
/// `FEATURES` must list exactly the feature traits the engine implements.
pub trait Implements {
    /// Engine name.
    const NAME: &'static str;
    /// Implemented features.
    const FEATURES: &'static [Feature];

    /// Whether `feature` is in the advertised set.
    fn implements(feature: Feature) -> bool {
        Self::FEATURES.contains(&feature)
    }
}

/// Create worlds with no contents.
pub trait ConstructEmptyWorld {
    /// Create and register an empty world. Returns an invalid identity only
    /// when `engine` does not resolve.
    fn construct_empty_world(&mut self, engine: Identity, name: &str) -> Identity;
}

/// Remove models from a world.
pub trait RemoveModelFromWorld {
    /// Remove the model at `index` in the world's current model order.
    fn remove_model_by_index(&mut self, world: Identity, index: usize) -> bool;

    /// Remove the first model (in construction order) named `name`.
    fn remove_model_by_name(&mut self, world: Identity, name: &str) -> bool;

    /// Remove a model by identity. False if it is not live.
    fn remove_model(&mut self, model: Identity) -> bool;

    /// True when `model` was live once and has since been removed.
    fn model_removed(&self, model: Identity) -> bool;
}

/// Destroy whole worlds.
pub trait RemoveWorld {
    /// Destroy `world` and everything it contains.
    fn remove_world(&mut self, world: Identity) -> bool;
}

/// Navigate the entity hierarchy.
pub trait GetEntities {
    /// Identity of the engine itself.
    fn engine(&self) -> Identity;
    /// Number of live worlds.
    fn world_count(&self) -> usize;
    /// World at `index` in construction order.
    fn world_by_index(&self, index: usize) -> Option<Identity>;
    /// First world named `name`.
    fn world_by_name(&self, name: &str) -> Option<Identity>;
    /// Number of models in `world`.
    fn model_count(&self, world: Identity) -> Option<usize>;
    /// Model at `index` in `world`.
    fn model_by_index(&self, world: Identity, index: usize) -> Option<Identity>;
    /// First model named `name` in `world`.
    fn model_by_name(&self, world: Identity, name: &str) -> Option<Identity>;
    /// Number of links in `model`.
    fn link_count(&self, model: Identity) -> Option<usize>;
    /// Link at `index` in `model`.
    fn link_by_index(&self, model: Identity, index: usize) -> Option<Identity>;
    /// Link named `name` in `model`.
    fn link_by_name(&self, model: Identity, name: &str) -> Option<Identity>;
    /// Number of shapes on `link`.
    fn shape_count(&self, link: Identity) -> Option<usize>;
    /// Shape at `index` on `link`.
    fn shape_by_index(&self, link: Identity, index: usize) -> Option<Identity>;
    /// Shape named `name` on `link`.
    fn shape_by_name(&self, link: Identity, name: &str) -> Option<Identity>;
    /// Number of joints in `model`.
    fn joint_count(&self, model: Identity) -> Option<usize>;
    /// Joint named `name` in `model`.
    fn joint_by_name(&self, model: Identity, name: &str) -> Option<Identity>;
    /// Name of any live entity.
    fn entity_name(&self, entity: Identity) -> Option<String>;
    /// Containing entity: world of a model, model of a link, and so on.
    fn parent_of(&self, entity: Identity) -> Option<Identity>;
}

/// Advance a world by one time step.
pub trait ForwardStep {
    /// Step `world` once, consuming `input`, updating `state` and filling
    /// `output`. False if `world` does not resolve.
    fn world_forward_step(
        &mut self,
        world: Identity,
        output: &mut StepOutput,
        state: &mut StepState,
        input: &StepInput,
    ) -> bool;
}

/// Read and change world gravity.
pub trait WorldGravity {
    /// Gravity of `world`.
    fn gravity(&self, world: Identity) -> Option<Vector3<f64>>;
    /// Set gravity of `world`.
    fn set_gravity(&mut self, world: Identity, gravity: Vector3<f64>) -> bool;
}

/// Read friction-pyramid slip compliance of a shape.
pub trait GetShapeFrictionPyramidSlipCompliance {
    /// Compliance along the primary friction direction (0.0 if never set).
    fn primary_slip_compliance(&self, shape: Identity) -> Option<f64>;
    /// Compliance along the secondary friction direction (0.0 if never set).
    fn secondary_slip_compliance(&self, shape: Identity) -> Option<f64>;
}

/// Change friction-pyramid slip compliance of a shape.
///
/// Values are stored as given; the new value is used from the next step.
pub trait SetShapeFrictionPyramidSlipCompliance {
    /// Set compliance along the primary friction direction.
    fn set_primary_slip_compliance(&mut self, shape: Identity, value: f64) -> bool;
    /// Set compliance along the secondary friction direction.
    fn set_secondary_slip_compliance(&mut self, shape: Identity, value: f64) -> bool;
}

/// Coulomb friction coefficient of a shape.
pub trait ShapeFriction {
    /// Friction coefficient.
    fn friction(&self, shape: Identity) -> Option<f64>;
    /// Set the friction coefficient.
    fn set_friction(&mut self, shape: Identity, friction: f64) -> bool;
}

/// Placement and extent of a shape.
pub trait GetShapeGeometry {
    /// Pose of the shape relative to its link.
    fn shape_pose(&self, shape: Identity) -> Option<Isometry3<f64>>;
    /// World-frame axis-aligned bounds as (min, max).
    fn shape_bounding_box(&self, shape: Identity) -> Option<(Point3<f64>, Point3<f64>)>;
}

/// Kinematic state of links.
pub trait LinkFrameSemantics {
    /// Frame data of `link` relative to the world frame.
    fn frame_data_relative_to_world(&self, link: Identity) -> Option<FrameData>;
}

/// Queue external loads on a link for the next step.
pub trait AddLinkExternalForceTorque {
    /// Apply `force` (world frame) at `offset` from the link origin.
    fn add_external_force(
        &mut self,
        link: Identity,
        force: Vector3<f64>,
        offset: Vector3<f64>,
    ) -> bool;
    /// Apply `torque` (world frame).
    fn add_external_torque(&mut self, link: Identity, torque: Vector3<f64>) -> bool;
}

/// Read joint coordinates.
pub trait GetBasicJointState {
    /// Degrees of freedom of `joint`.
    fn joint_dof_count(&self, joint: Identity) -> Option<usize>;
    /// Position of degree of freedom `dof`.
    fn joint_position(&self, joint: Identity, dof: usize) -> Option<f64>;
    /// Velocity of degree of freedom `dof`.
    fn joint_velocity(&self, joint: Identity, dof: usize) -> Option<f64>;
}

/// Write joint coordinates directly.
pub trait SetBasicJointState {
    /// Move the child link so that `dof` has position `value`.
    fn set_joint_position(&mut self, joint: Identity, dof: usize, value: f64) -> bool;
    /// Set the child link velocity so that `dof` has velocity `value`.
    fn set_joint_velocity(&mut self, joint: Identity, dof: usize, value: f64) -> bool;
}

/// Servo a joint to a target velocity.
pub trait SetJointVelocityCommand {
    /// Command `dof` of `joint` to track `velocity` from the next step on.
    fn set_joint_velocity_command(&mut self, joint: Identity, dof: usize, velocity: f64)
        -> bool;
}

/// Revolute-specific joint queries.
pub trait RevoluteJointCast {
    /// Rotation axis in the parent frame, or `None` if `joint` is not revolute.
    fn revolute_axis(&self, joint: Identity) -> Option<Vector3<f64>>;
}

/// Rigidly attach links at runtime.
pub trait AttachFixedJoint {
    /// Attach `child` to `parent` (or to the world when `None`) with a fixed
    /// joint in the child's model. Returns an invalid identity on failure.
    fn attach_fixed_joint(
        &mut self,
        child: Identity,
        parent: Option<Identity>,
        name: &str,
    ) -> Identity;
}

/// Remove joints at runtime.
pub trait DetachJoint {
    /// Remove `joint`, leaving its links free.
    fn detach_joint(&mut self, joint: Identity) -> bool;
}

/// Build entities from declarative descriptions.
pub trait ConstructFromDescription {
    /// Error raised for descriptions the engine cannot build.
    type Error: std::error::Error;

    /// Construct a world and all its models.
    fn construct_world(
        &mut self,
        engine: Identity,
        desc: &tether_ir::World,
    ) -> Result<Identity, Self::Error>;

    /// Construct a model inside `world`.
    fn construct_model(
        &mut self,
        world: Identity,
        desc: &tether_ir::Model,
    ) -> Result<Identity, Self::Error>;

    /// Construct a link inside `model`.
    fn construct_link(
        &mut self,
        model: Identity,
        desc: &tether_ir::Link,
    ) -> Result<Identity, Self::Error>;
}

/// Entity creation, lookup and removal.
pub trait EntityManagementFeatureList:
    ConstructEmptyWorld + RemoveModelFromWorld + RemoveWorld + GetEntities
{
}
impl<T> EntityManagementFeatureList for T where
    T: ConstructEmptyWorld + RemoveModelFromWorld + RemoveWorld + GetEntities
{
}

/// Contact parameters of shapes.
pub trait ShapeFeatureList:
    GetShapeFrictionPyramidSlipCompliance
    + SetShapeFrictionPyramidSlipCompliance
    + ShapeFriction
    + GetShapeGeometry
{
}
impl<T> ShapeFeatureList for T where
    T: GetShapeFrictionPyramidSlipCompliance
        + SetShapeFrictionPyramidSlipCompliance
        + ShapeFriction
        + GetShapeGeometry
{
}

/// Joint state and control.
pub trait JointFeatureList:
    GetBasicJointState
    + SetBasicJointState
    + SetJointVelocityCommand
    + RevoluteJointCast
    + AttachFixedJoint
    + DetachJoint
{
}
impl<T> JointFeatureList for T where
    T: GetBasicJointState
        + SetBasicJointState
        + SetJointVelocityCommand
        + RevoluteJointCast
        + AttachFixedJoint
        + DetachJoint
{
}

/// Stepping plus the link queries needed to observe a simulation.
pub trait SimulationFeatureList:
    ForwardStep + WorldGravity + LinkFrameSemantics + AddLinkExternalForceTorque
{
}
impl<T> SimulationFeatureList for T where
    T: ForwardStep + WorldGravity + LinkFrameSemantics + AddLinkExternalForceTorque
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct StepOnly;

    impl Implements for StepOnly {
        const NAME: &'static str = "step-only";
        const FEATURES: &'static [Feature] = &[Feature::ForwardStep];
    }

    #[test]
    fn feature_names_are_unique() {
        let names: HashSet<_> = Feature::ALL.iter().map(Feature::name).collect();
        assert_eq!(names.len(), Feature::ALL.len());
    }

    #[test]
    fn implements_reflects_advertised_set() {
        assert!(StepOnly::implements(Feature::ForwardStep));
        assert!(!StepOnly::implements(Feature::RemoveModelFromWorld));
    }
}
