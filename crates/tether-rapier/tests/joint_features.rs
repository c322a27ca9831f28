//! Joint state, servo commands and runtime attachment.

use approx::assert_relative_eq;
use nalgebra::Vector3;
use tether_core::{
    AttachFixedJoint, ConstructFromDescription, DetachJoint, ForwardStep, GetBasicJointState,
    GetEntities, Identity, LinkFrameSemantics, RevoluteJointCast, SetBasicJointState,
    SetJointVelocityCommand, StepInput, StepOutput, StepState, WorldGravity,
};
use tether_ir::{
    Collision, Geometry, Inertial, Joint, JointKind, Link, Model, Pose, Vec3, World, WORLD_FRAME,
};
use tether_rapier::RapierEngine;

fn rod(name: &str, z: f64) -> Link {
    let mut link = Link::new(name);
    link.pose = Pose::from_position(0.0, 0.0, z);
    link.inertial = Some(Inertial {
        mass: 1.0,
        center_of_mass: Vec3::zero(),
        inertia: None,
    });
    link.collisions.push(Collision::new(
        format!("{name}_shape"),
        Geometry::Capsule {
            radius: 0.05,
            length: 0.5,
        },
    ));
    link
}

/// A single link hinged to the world about the world Y axis.
fn hinge_world() -> (RapierEngine, Identity, Identity) {
    let mut model = Model::new("arm");
    model.links.push(rod("link", 1.0));
    model.joints.push(Joint {
        name: "hinge".to_string(),
        parent: WORLD_FRAME.to_string(),
        child: "link".to_string(),
        pose: Pose::identity(),
        kind: JointKind::Revolute {
            axis: Vec3::new(0.0, 1.0, 0.0),
            limits: None,
        },
    });
    let mut desc = World::new("joints");
    desc.gravity = Vec3::zero();
    desc.models.push(model);

    let mut engine = RapierEngine::new();
    let engine_id = engine.engine();
    let world = engine.construct_world(engine_id, &desc).expect("construct");
    let model = engine.model_by_name(world, "arm").unwrap();
    let joint = engine.joint_by_name(model, "hinge").unwrap();
    (engine, world, joint)
}

fn step(engine: &mut RapierEngine, world: Identity, steps: usize) {
    let (mut output, mut state) = (StepOutput::default(), StepState::default());
    for _ in 0..steps {
        assert!(engine.world_forward_step(world, &mut output, &mut state, &StepInput::default()));
    }
}

#[test]
fn revolute_joint_reports_axis_and_dofs() {
    let (engine, world, joint) = hinge_world();
    assert_eq!(engine.gravity(world), Some(Vector3::zeros()));
    assert_eq!(engine.joint_dof_count(joint), Some(1));

    let axis = engine.revolute_axis(joint).unwrap();
    assert_relative_eq!(axis, Vector3::y(), epsilon = 1e-6);
    assert_relative_eq!(engine.joint_position(joint, 0).unwrap(), 0.0, epsilon = 1e-6);
    assert_eq!(engine.joint_position(joint, 1), None);
}

#[test]
fn set_joint_position_moves_child() {
    let (mut engine, _, joint) = hinge_world();
    assert!(engine.set_joint_position(joint, 0, 0.5));
    assert_relative_eq!(engine.joint_position(joint, 0).unwrap(), 0.5, epsilon = 1e-5);
    assert!(!engine.set_joint_position(joint, 3, 0.5));
}

#[test]
fn set_joint_velocity_is_read_back() {
    let (mut engine, _, joint) = hinge_world();
    assert!(engine.set_joint_velocity(joint, 0, 1.25));
    assert_relative_eq!(engine.joint_velocity(joint, 0).unwrap(), 1.25, epsilon = 1e-5);
}

#[test]
fn velocity_command_drives_joint() {
    let (mut engine, world, joint) = hinge_world();
    assert!(engine.set_joint_velocity_command(joint, 0, 1.0));
    step(&mut engine, world, 500);

    let velocity = engine.joint_velocity(joint, 0).unwrap();
    assert_relative_eq!(velocity, 1.0, epsilon = 0.05);
    assert!(engine.joint_position(joint, 0).unwrap() > 0.3);
}

#[test]
fn attach_and_detach_fixed_joint() {
    let mut desc = World::new("attach");
    let mut model = Model::new("free");
    model.links.push(rod("link", 2.0));
    desc.models.push(model);

    let mut engine = RapierEngine::new();
    let engine_id = engine.engine();
    let world = engine.construct_world(engine_id, &desc).unwrap();
    let model = engine.model_by_name(world, "free").unwrap();
    let link = engine.link_by_name(model, "link").unwrap();

    let weld = engine.attach_fixed_joint(link, None, "weld");
    assert!(weld.is_valid());
    assert_eq!(engine.joint_count(model), Some(1));
    assert_eq!(engine.joint_dof_count(weld), Some(0));
    assert_eq!(engine.revolute_axis(weld), None);

    step(&mut engine, world, 200);
    let held = engine.frame_data_relative_to_world(link).unwrap();
    assert_relative_eq!(held.pose.translation.vector.z, 2.0, epsilon = 1e-2);

    assert!(engine.detach_joint(weld));
    assert!(!engine.detach_joint(weld));
    assert_eq!(engine.joint_count(model), Some(0));

    step(&mut engine, world, 200);
    let falling = engine.frame_data_relative_to_world(link).unwrap();
    assert!(falling.linear_velocity.z < -1.0);
}

#[test]
fn attach_rejects_unknown_links() {
    let (mut engine, _, joint) = hinge_world();
    assert!(!engine
        .attach_fixed_joint(Identity::invalid(), None, "bad")
        .is_valid());
    // A joint identity is not a link.
    assert!(!engine.attach_fixed_joint(joint, None, "bad").is_valid());
}
