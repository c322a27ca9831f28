//! Physics world management using Rapier3d.
//!
//! Rapier has no model object, so a [`PhysicsWorld`] keeps the model, link,
//! shape and joint bookkeeping next to the Rapier sets it owns.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use nalgebra::{Isometry3, Vector3};
use rapier3d::dynamics::{
    CCDSolver, ImpulseJointHandle, ImpulseJointSet, IntegrationParameters, IslandManager,
    MultibodyJointSet, RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};
use rapier3d::geometry::{BroadPhaseMultiSap, ColliderHandle, ColliderSet, NarrowPhase};
use rapier3d::pipeline::{PhysicsPipeline, QueryPipeline};
use slotmap::{new_key_type, SlotMap};

use crate::config::EngineConfig;
use crate::contact::{slip_loads, SlipComplianceHooks};
use crate::joints::JointType;

new_key_type! {
    /// Key of a model inside its world.
    pub struct ModelKey;
}

/// A collision shape attached to a link.
#[derive(Debug, Clone)]
pub struct ShapeData {
    /// Name, unique within the link.
    pub name: String,
    /// Rapier collider.
    pub collider: ColliderHandle,
    /// Primary friction direction in the world frame.
    pub fdir1: Option<Vector3<f32>>,
}

/// A link, backed by one rigid body.
#[derive(Debug, Clone)]
pub struct LinkData {
    /// Name, unique within the model.
    pub name: String,
    /// Rapier body.
    pub body: RigidBodyHandle,
    /// Attached shapes in construction order.
    pub shapes: Vec<ShapeData>,
}

/// A joint owned by a model.
#[derive(Debug, Clone)]
pub struct JointData {
    /// Name, unique within the model.
    pub name: String,
    /// Rapier joint.
    pub handle: ImpulseJointHandle,
    /// Joint type.
    pub kind: JointType,
}

/// A model: a named group of links and joints.
#[derive(Debug, Clone)]
pub struct ModelData {
    /// Model name. Not required to be unique.
    pub name: String,
    /// Model frame in the world.
    pub pose: Isometry3<f32>,
    /// Static models are made of fixed bodies.
    pub is_static: bool,
    /// Links in construction order.
    pub links: Vec<LinkData>,
    /// Joints in construction order.
    pub joints: Vec<JointData>,
}

impl ModelData {
    /// Create an empty model.
    pub fn new(name: impl Into<String>, pose: Isometry3<f32>, is_static: bool) -> Self {
        Self {
            name: name.into(),
            pose,
            is_static,
            links: Vec::new(),
            joints: Vec::new(),
        }
    }

    /// Link named `name`.
    pub fn link(&self, name: &str) -> Option<&LinkData> {
        self.links.iter().find(|l| l.name == name)
    }
}

/// Native handles released by a model removal.
#[derive(Debug, Clone, Default)]
pub struct RemovedModel {
    /// Bodies of the model's links.
    pub bodies: Vec<RigidBodyHandle>,
    /// Colliders of the model's shapes.
    pub colliders: Vec<ColliderHandle>,
    /// Joints of the model, plus joints of other models that were attached
    /// to one of its links.
    pub joints: Vec<ImpulseJointHandle>,
}

/// Physics simulation world.
pub struct PhysicsWorld {
    /// World name.
    pub name: String,
    /// Default step size in seconds.
    pub time_step: f64,

    // Rapier components
    pipeline: PhysicsPipeline,
    pub(crate) gravity: Vector3<f32>,
    integration_params: IntegrationParameters,
    pub(crate) islands: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    pub(crate) narrow_phase: NarrowPhase,
    pub(crate) bodies: RigidBodySet,
    pub(crate) colliders: ColliderSet,
    pub(crate) impulse_joints: ImpulseJointSet,
    pub(crate) multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,

    /// Fixed body standing in for the world frame.
    pub(crate) ground: RigidBodyHandle,
    models: SlotMap<ModelKey, ModelData>,
    model_order: Vec<ModelKey>,
    accelerations: HashMap<RigidBodyHandle, (Vector3<f32>, Vector3<f32>)>,
}

impl PhysicsWorld {
    /// Create an empty physics world using the engine defaults.
    pub fn new(name: impl Into<String>, config: &EngineConfig) -> Self {
        let mut integration_params = IntegrationParameters::default();
        integration_params.dt = config.time_step as f32;
        integration_params.num_solver_iterations =
            NonZeroUsize::new(config.solver_iterations).unwrap_or(NonZeroUsize::MIN);

        let mut bodies = RigidBodySet::new();
        let ground = bodies.insert(RigidBodyBuilder::fixed().position(Isometry3::identity()).build());

        Self {
            name: name.into(),
            time_step: config.time_step,
            pipeline: PhysicsPipeline::new(),
            gravity: Vector3::from(config.gravity).cast::<f32>(),
            integration_params,
            islands: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            ground,
            models: SlotMap::with_key(),
            model_order: Vec::new(),
            accelerations: HashMap::new(),
        }
    }

    /// Set gravity vector.
    pub fn set_gravity(&mut self, gravity: Vector3<f32>) {
        self.gravity = gravity;
    }

    /// Gravity vector.
    pub fn gravity(&self) -> Vector3<f32> {
        self.gravity
    }

    /// Number of models.
    pub fn model_count(&self) -> usize {
        self.model_order.len()
    }

    /// Model keys in construction order.
    pub fn model_keys(&self) -> &[ModelKey] {
        &self.model_order
    }

    /// Model by key.
    pub fn model(&self, key: ModelKey) -> Option<&ModelData> {
        self.models.get(key)
    }

    /// Mutable model by key.
    pub fn model_mut(&mut self, key: ModelKey) -> Option<&mut ModelData> {
        self.models.get_mut(key)
    }

    /// Key of the model at `index` in construction order.
    pub fn model_key_by_index(&self, index: usize) -> Option<ModelKey> {
        self.model_order.get(index).copied()
    }

    /// Key of the first model named `name`.
    pub fn model_key_by_name(&self, name: &str) -> Option<ModelKey> {
        self.model_order
            .iter()
            .copied()
            .find(|key| self.models.get(*key).is_some_and(|m| m.name == name))
    }

    /// Add a fully built model.
    pub fn insert_model(&mut self, model: ModelData) -> ModelKey {
        let key = self.models.insert(model);
        self.model_order.push(key);
        key
    }

    /// Remove a model with all its bodies, colliders and joints.
    pub fn remove_model(&mut self, key: ModelKey) -> Option<RemovedModel> {
        let model = self.models.remove(key)?;
        self.model_order.retain(|k| *k != key);

        let mut removed = RemovedModel::default();
        for joint in &model.joints {
            self.impulse_joints.remove(joint.handle, true);
            removed.joints.push(joint.handle);
        }
        for link in &model.links {
            removed.colliders.extend(link.shapes.iter().map(|s| s.collider));
            removed.bodies.push(link.body);
            self.remove_body(link.body);
        }

        // Rapier drops joints attached to removed bodies; forget them too.
        let joints = &self.impulse_joints;
        for other in self.models.values_mut() {
            other.joints.retain(|j| {
                let alive = joints.get(j.handle).is_some();
                if !alive {
                    removed.joints.push(j.handle);
                }
                alive
            });
        }

        Some(removed)
    }

    /// Remove a body together with its colliders and attached joints.
    pub(crate) fn remove_body(&mut self, body: RigidBodyHandle) {
        self.bodies.remove(
            body,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.accelerations.remove(&body);
    }

    /// Locate the link backed by `body`.
    pub fn find_link(&self, body: RigidBodyHandle) -> Option<(ModelKey, &LinkData)> {
        self.model_order.iter().find_map(|key| {
            let model = self.models.get(*key)?;
            model.links.iter().find(|l| l.body == body).map(|l| (*key, l))
        })
    }

    /// Locate the shape backed by `collider`, with its link's body.
    pub fn find_shape(&self, collider: ColliderHandle) -> Option<(RigidBodyHandle, &ShapeData)> {
        self.models.values().find_map(|model| {
            model.links.iter().find_map(|link| {
                link.shapes
                    .iter()
                    .find(|s| s.collider == collider)
                    .map(|s| (link.body, s))
            })
        })
    }

    /// Locate the joint backed by `handle`.
    pub fn find_joint(&self, handle: ImpulseJointHandle) -> Option<(ModelKey, &JointData)> {
        self.model_order.iter().find_map(|key| {
            let model = self.models.get(*key)?;
            model.joints.iter().find(|j| j.handle == handle).map(|j| (*key, j))
        })
    }

    /// Primary friction direction of a collider, if one was given.
    pub fn fdir1(&self, collider: ColliderHandle) -> Option<Vector3<f32>> {
        self.find_shape(collider)?.1.fdir1
    }

    /// Linear and angular acceleration of `body` over the last step.
    pub fn acceleration(&self, body: RigidBodyHandle) -> (Vector3<f32>, Vector3<f32>) {
        self.accelerations
            .get(&body)
            .copied()
            .unwrap_or((Vector3::zeros(), Vector3::zeros()))
    }

    /// World poses of every link body, keyed by body.
    pub fn link_poses(&self) -> Vec<(RigidBodyHandle, Isometry3<f32>)> {
        self.model_order
            .iter()
            .filter_map(|key| self.models.get(*key))
            .flat_map(|m| m.links.iter())
            .filter_map(|l| self.bodies.get(l.body).map(|b| (l.body, *b.position())))
            .collect()
    }

    /// Step the physics simulation by dt seconds.
    ///
    /// Slip-compliant friction is applied first; user forces and torques are
    /// cleared afterwards so they last exactly one step.
    pub fn step(&mut self, dt: f32) {
        self.integration_params.dt = dt;
        self.apply_slip_loads(dt);

        let before: Vec<_> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.is_dynamic())
            .map(|(h, b)| (h, *b.linvel(), *b.angvel()))
            .collect();

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &SlipComplianceHooks,
            &(),
        );

        self.accelerations.clear();
        for (handle, linvel, angvel) in before {
            if let Some(body) = self.bodies.get(handle) {
                self.accelerations
                    .insert(handle, ((body.linvel() - linvel) / dt, (body.angvel() - angvel) / dt));
            }
        }

        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(false);
            body.reset_torques(false);
        }
    }

    fn apply_slip_loads(&mut self, dt: f32) {
        let loads = slip_loads(&self.narrow_phase, &self.bodies, &self.colliders, dt, |h| {
            self.fdir1(h)
        });
        for load in loads {
            if let Some(body) = self.bodies.get_mut(load.body) {
                body.add_force(load.force, true);
            }
        }
    }
}
