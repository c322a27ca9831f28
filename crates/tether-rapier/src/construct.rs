//! Building worlds, models and links from descriptions.

use nalgebra::{Isometry3, Point3, Vector3};
use rapier3d::dynamics::{MassProperties, RigidBodyBuilder, RigidBodyHandle};
use tether_core::{ConstructFromDescription, EntityKind, Identity};
use tether_ir::{Geometry, Link, Model, World, WORLD_FRAME};
use tracing::{debug, warn};

use crate::colliders::{collision_to_collider, pose_to_isometry, principal_inertia};
use crate::config::EngineConfig;
use crate::engine::{Native, RapierEngine, WorldKey};
use crate::error::ConstructError;
use crate::joints::description_to_rapier;
use crate::world::{JointData, LinkData, ModelData, PhysicsWorld, ShapeData};

fn mass_properties(link: &Link) -> MassProperties {
    let solid = link
        .collisions
        .iter()
        .map(|c| &c.geometry)
        .find(|g| !matches!(g, Geometry::Plane { .. }));

    let (mass, com, inertia) = match &link.inertial {
        Some(inertial) => {
            let inertia = match (&inertial.inertia, solid) {
                (Some(i), _) => Vector3::new(i.x, i.y, i.z),
                (None, Some(geometry)) => principal_inertia(geometry, inertial.mass),
                (None, None) => Vector3::repeat(inertial.mass),
            };
            let c = &inertial.center_of_mass;
            (inertial.mass, Point3::new(c.x, c.y, c.z), inertia)
        }
        // Unit mass and inertia when nothing is specified.
        None => (1.0, Point3::origin(), Vector3::repeat(1.0)),
    };

    MassProperties::new(com.cast::<f32>(), mass as f32, inertia.cast::<f32>())
}

/// Create a body and colliders for a link. Nothing is left behind on error.
fn build_link(
    world: &mut PhysicsWorld,
    model_pose: &Isometry3<f32>,
    is_static: bool,
    link: &Link,
) -> Result<LinkData, ConstructError> {
    let pose = model_pose * pose_to_isometry(&link.pose);
    let builder = if is_static {
        RigidBodyBuilder::fixed()
    } else {
        RigidBodyBuilder::dynamic()
    };
    let body = world.bodies.insert(
        builder
            .position(pose)
            .additional_mass_properties(mass_properties(link))
            .build(),
    );

    let mut shapes = Vec::with_capacity(link.collisions.len());
    for collision in &link.collisions {
        let collider = match collision_to_collider(collision) {
            Ok(collider) => collider,
            Err(err) => {
                world.remove_body(body);
                return Err(err);
            }
        };
        let handle = world
            .colliders
            .insert_with_parent(collider, body, &mut world.bodies);
        let fdir1 = collision
            .surface
            .fdir1
            .map(|d| Vector3::new(d.x as f32, d.y as f32, d.z as f32));
        shapes.push(ShapeData {
            name: collision.name.clone(),
            collider: handle,
            fdir1,
        });
    }

    Ok(LinkData {
        name: link.name.clone(),
        body,
        shapes,
    })
}

fn populate_model(
    world: &mut PhysicsWorld,
    desc: &Model,
    data: &mut ModelData,
) -> Result<(), ConstructError> {
    for link in &desc.links {
        let built = build_link(world, &data.pose, data.is_static, link)?;
        data.links.push(built);
    }

    for joint in &desc.joints {
        let body_of = |name: &str| -> Result<RigidBodyHandle, ConstructError> {
            if name == WORLD_FRAME {
                return Ok(world.ground);
            }
            data.link(name)
                .map(|l| l.body)
                .ok_or_else(|| ConstructError::MissingLink {
                    model: desc.name.clone(),
                    link: name.to_string(),
                })
        };
        let parent = body_of(&joint.parent)?;
        let child = body_of(&joint.child)?;

        let parent_pose = *world.bodies[parent].position();
        let child_pose = *world.bodies[child].position();
        let (rapier_joint, kind) = description_to_rapier(joint, &parent_pose, &child_pose)?;
        let handle = world.impulse_joints.insert(parent, child, rapier_joint, true);
        data.joints.push(JointData {
            name: joint.name.clone(),
            handle,
            kind,
        });
    }
    Ok(())
}

fn discard_model(world: &mut PhysicsWorld, data: &ModelData) {
    for joint in &data.joints {
        world.impulse_joints.remove(joint.handle, true);
    }
    for link in &data.links {
        world.remove_body(link.body);
    }
}

impl RapierEngine {
    fn register_link(&mut self, world: WorldKey, link: &LinkData) -> Identity {
        for shape in &link.shapes {
            self.table
                .register(EntityKind::Shape, Native::Shape(world, shape.collider));
        }
        self.table
            .register(EntityKind::Link, Native::Link(world, link.body))
    }
}

impl ConstructFromDescription for RapierEngine {
    type Error = ConstructError;

    fn construct_world(&mut self, engine: Identity, desc: &World) -> Result<Identity, ConstructError> {
        if self.table.resolve_kind(engine, EntityKind::Engine).is_none() {
            return Err(ConstructError::UnknownEntity(engine));
        }
        desc.validate()?;

        let config = EngineConfig {
            gravity: [desc.gravity.x, desc.gravity.y, desc.gravity.z],
            time_step: desc.time_step.unwrap_or(self.config.time_step),
            ..self.config.clone()
        };
        let (key, world) = self.insert_world(PhysicsWorld::new(&desc.name, &config));
        debug!(world = %desc.name, models = desc.models.len(), "constructing world");

        for model in &desc.models {
            if let Err(err) = self.construct_model(world, model) {
                self.remove_world_key(key);
                return Err(err);
            }
        }
        Ok(world)
    }

    fn construct_model(&mut self, world: Identity, desc: &Model) -> Result<Identity, ConstructError> {
        let key = self
            .world_key(world)
            .ok_or(ConstructError::UnknownEntity(world))?;
        desc.validate()?;
        let physics = self
            .worlds
            .get_mut(key)
            .ok_or(ConstructError::UnknownEntity(world))?;

        if physics.model_key_by_name(&desc.name).is_some() {
            warn!(model = %desc.name, world = %physics.name, "duplicate model name; lookups by name return the first");
        }

        let mut data = ModelData::new(&desc.name, pose_to_isometry(&desc.pose), desc.is_static);
        if let Err(err) = populate_model(physics, desc, &mut data) {
            discard_model(physics, &data);
            return Err(err);
        }
        let model = physics.insert_model(data);
        let id = self.register_model(key, model);
        debug!(model = %desc.name, %id, "constructed model");
        Ok(id)
    }

    fn construct_link(&mut self, model: Identity, desc: &Link) -> Result<Identity, ConstructError> {
        let (w, m) = self
            .model_key(model)
            .ok_or(ConstructError::UnknownEntity(model))?;
        desc.validate()?;
        let physics = self
            .worlds
            .get_mut(w)
            .ok_or(ConstructError::UnknownEntity(model))?;
        let (pose, is_static) = match physics.model(m) {
            Some(data) if data.link(&desc.name).is_some() => {
                return Err(ConstructError::DuplicateLink {
                    model: data.name.clone(),
                    link: desc.name.clone(),
                })
            }
            Some(data) => (data.pose, data.is_static),
            None => return Err(ConstructError::UnknownEntity(model)),
        };

        let link = build_link(physics, &pose, is_static, desc)?;
        let id = self.register_link(w, &link);
        if let Some(data) = self.worlds.get_mut(w).and_then(|pw| pw.model_mut(m)) {
            data.links.push(link);
        }
        debug!(link = %desc.name, %id, "constructed link");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{ConstructEmptyWorld, ForwardStep, GetEntities, RemoveModelFromWorld};
    use tether_core::{StepInput, StepOutput, StepState};
    use tether_ir::{Collision, Inertial, Joint, JointKind, Pose, Vec3};

    fn pendulum() -> Model {
        let mut base = Link::new("base");
        base.collisions.push(Collision::new(
            "base_box",
            Geometry::Box {
                size: Vec3::new(0.2, 0.2, 0.2),
            },
        ));
        let mut arm = Link::new("arm");
        arm.pose = Pose::from_position(0.0, 0.0, -0.5);
        arm.inertial = Some(Inertial {
            mass: 2.0,
            center_of_mass: Vec3::zero(),
            inertia: None,
        });
        arm.collisions.push(Collision::new(
            "arm_rod",
            Geometry::Cylinder {
                radius: 0.05,
                length: 1.0,
            },
        ));

        let mut model = Model::new("pendulum");
        model.pose = Pose::from_position(0.0, 0.0, 2.0);
        model.links = vec![base, arm];
        model.joints = vec![
            Joint {
                name: "anchor".to_string(),
                parent: WORLD_FRAME.to_string(),
                child: "base".to_string(),
                pose: Pose::identity(),
                kind: JointKind::Fixed,
            },
            Joint {
                name: "hinge".to_string(),
                parent: "base".to_string(),
                child: "arm".to_string(),
                pose: Pose::from_position(0.0, 0.0, 0.5),
                kind: JointKind::Revolute {
                    axis: Vec3::new(1.0, 0.0, 0.0),
                    limits: None,
                },
            },
        ];
        model
    }

    #[test]
    fn model_entities_are_registered() {
        let mut engine = RapierEngine::new();
        let world = empty_world(&mut engine);
        let model = engine.construct_model(world, &pendulum()).unwrap();

        assert_eq!(engine.link_count(model), Some(2));
        assert_eq!(engine.joint_count(model), Some(2));
        let arm = engine.link_by_name(model, "arm").unwrap();
        assert_eq!(engine.shape_count(arm), Some(1));
        assert_eq!(engine.parent_of(arm), Some(model));
        let rod = engine.shape_by_name(arm, "arm_rod").unwrap();
        assert_eq!(engine.parent_of(rod), Some(arm));

        let physics = engine.physics_world(world).unwrap();
        let body = physics.model(physics.model_keys()[0]).unwrap().links[1].body;
        assert!((physics.bodies[body].translation().z - 1.5).abs() < 1e-6);

        // Mass properties are settled by the first step.
        let (mut output, mut state) = (StepOutput::default(), StepState::default());
        assert!(engine.world_forward_step(world, &mut output, &mut state, &StepInput::default()));
        let physics = engine.physics_world(world).unwrap();
        assert!((physics.bodies[body].mass() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn failed_joint_leaves_world_unchanged() {
        let mut engine = RapierEngine::new();
        let world = empty_world(&mut engine);
        let mut model = pendulum();
        model.joints[1].kind = JointKind::Revolute {
            axis: Vec3::new(1.0, 0.0, 0.0),
            limits: Some((1.0, -1.0)),
        };

        let err = engine.construct_model(world, &model).unwrap_err();
        assert!(matches!(err, ConstructError::InvalidJoint { .. }));
        assert_eq!(engine.model_count(world), Some(0));
        let physics = engine.physics_world(world).unwrap();
        // Only the ground body remains.
        assert_eq!(physics.bodies.len(), 1);
        assert_eq!(physics.colliders.len(), 0);
        assert_eq!(physics.impulse_joints.len(), 0);
    }

    #[test]
    fn unknown_joint_link_is_a_description_error() {
        let mut engine = RapierEngine::new();
        let world = empty_world(&mut engine);
        let mut model = pendulum();
        model.joints[1].child = "ghost".to_string();

        let err = engine.construct_model(world, &model).unwrap_err();
        assert!(matches!(err, ConstructError::Description(_)));
    }

    #[test]
    fn duplicate_link_is_rejected() {
        let mut engine = RapierEngine::new();
        let world = empty_world(&mut engine);
        let model = engine.construct_model(world, &pendulum()).unwrap();
        let err = engine.construct_link(model, &Link::new("arm")).unwrap_err();
        assert!(matches!(err, ConstructError::DuplicateLink { .. }));

        let extra = engine.construct_link(model, &Link::new("extra")).unwrap();
        assert_eq!(engine.link_count(model), Some(3));
        assert!(engine.remove_model(model));
        assert_eq!(engine.entity_name(extra), None);
    }

    fn empty_world(engine: &mut RapierEngine) -> Identity {
        let id = engine.engine();
        engine.construct_empty_world(id, "test")
    }
}
