//! Slip-compliance conformance: a box pushed across a plane slides at
//! `v = s * F` along the compliant direction.

use approx::assert_relative_eq;
use nalgebra::Vector3;
use tether_core::{
    AddLinkExternalForceTorque, ConstructFromDescription, ExternalWrench, ForwardStep,
    GetEntities, GetShapeFrictionPyramidSlipCompliance, Identity, LinkFrameSemantics,
    SetShapeFrictionPyramidSlipCompliance, StepInput, StepOutput, StepState,
};
use tether_ir::Root;
use tether_rapier::RapierEngine;

const STEPS: usize = 10_000;
const TOLERANCE: f64 = 1e-4;

struct Scene {
    engine: RapierEngine,
    world: Identity,
    link: Identity,
    shape: Identity,
}

fn load_scene() -> Scene {
    let root = Root::from_json(include_str!("worlds/slip_compliance.json")).expect("fixture");
    let mut engine = RapierEngine::new();
    let engine_id = engine.engine();
    let world = engine
        .construct_world(engine_id, &root.worlds[0])
        .expect("construct world");

    let model = engine.model_by_name(world, "box").expect("box model");
    let link = engine.link_by_name(model, "box_link").expect("box link");
    let shape = engine.shape_by_name(link, "box_collision").expect("box shape");
    Scene {
        engine,
        world,
        link,
        shape,
    }
}

#[test]
fn box_starts_at_rest() {
    let scene = load_scene();
    let frame = scene
        .engine
        .frame_data_relative_to_world(scene.link)
        .expect("frame data");
    assert!(frame.is_at_rest(1e-12));
    assert_relative_eq!(frame.pose.translation.vector.z, 0.5, epsilon = 1e-6);
}

#[test]
fn slip_compliance_defaults_and_read_after_write() {
    let mut scene = load_scene();
    let engine = &mut scene.engine;

    assert_eq!(engine.primary_slip_compliance(scene.shape), Some(0.0));
    assert_eq!(engine.secondary_slip_compliance(scene.shape), Some(0.0));

    assert!(engine.set_primary_slip_compliance(scene.shape, 0.5));
    assert_eq!(engine.primary_slip_compliance(scene.shape), Some(0.5));
    assert_eq!(engine.secondary_slip_compliance(scene.shape), Some(0.0));

    assert!(engine.set_secondary_slip_compliance(scene.shape, 0.25));
    assert_eq!(engine.secondary_slip_compliance(scene.shape), Some(0.25));

    // Values are stored unvalidated.
    assert!(engine.set_primary_slip_compliance(scene.shape, -1.5));
    assert_eq!(engine.primary_slip_compliance(scene.shape), Some(-1.5));
}

#[test]
fn slip_compliance_on_dead_shape_is_a_miss() {
    let mut scene = load_scene();
    assert!(!scene
        .engine
        .set_primary_slip_compliance(Identity::invalid(), 0.5));
    assert_eq!(scene.engine.primary_slip_compliance(scene.link), None);
}

#[test]
fn primary_slip_sets_sliding_velocity() {
    let mut scene = load_scene();
    let slip = 0.5;
    let force = Vector3::new(1.0, 0.0, 0.0);
    assert!(scene.engine.set_primary_slip_compliance(scene.shape, slip));

    let (mut output, mut state) = (StepOutput::default(), StepState::default());
    for _ in 0..STEPS {
        assert!(scene
            .engine
            .add_external_force(scene.link, force, Vector3::zeros()));
        assert!(scene.engine.world_forward_step(
            scene.world,
            &mut output,
            &mut state,
            &StepInput::default()
        ));
    }

    assert_eq!(state.iterations, STEPS as u64);
    assert_relative_eq!(state.sim_time, STEPS as f64 * 0.001, epsilon = 1e-9);
    assert!(output.contacts_of(scene.shape).next().is_some());

    let frame = scene
        .engine
        .frame_data_relative_to_world(scene.link)
        .expect("frame data");
    assert_relative_eq!(frame.linear_velocity.x, slip * force.x, epsilon = TOLERANCE);
}

#[test]
fn secondary_slip_sets_sliding_velocity() {
    let mut scene = load_scene();
    let slip = 0.25;
    let force = Vector3::new(0.0, 1.0, 0.0);
    assert!(scene.engine.set_secondary_slip_compliance(scene.shape, slip));

    let input = StepInput {
        time_step: None,
        wrenches: vec![ExternalWrench::force(scene.link, force)],
    };
    let (mut output, mut state) = (StepOutput::default(), StepState::default());
    for _ in 0..STEPS {
        scene
            .engine
            .world_forward_step(scene.world, &mut output, &mut state, &input);
    }

    let frame = scene
        .engine
        .frame_data_relative_to_world(scene.link)
        .expect("frame data");
    assert_relative_eq!(frame.linear_velocity.y, slip * force.y, epsilon = TOLERANCE);
    // The primary direction has no compliance, so the box does not drift along X.
    assert!(frame.linear_velocity.x.abs() < TOLERANCE);
}

#[test]
fn rigid_friction_holds_the_box() {
    let mut scene = load_scene();
    let input = StepInput {
        time_step: None,
        wrenches: vec![ExternalWrench::force(scene.link, Vector3::new(1.0, 0.0, 0.0))],
    };
    let (mut output, mut state) = (StepOutput::default(), StepState::default());
    for _ in 0..1000 {
        scene
            .engine
            .world_forward_step(scene.world, &mut output, &mut state, &input);
    }

    let frame = scene
        .engine
        .frame_data_relative_to_world(scene.link)
        .expect("frame data");
    assert!(frame.linear_velocity.x.abs() < 1e-3);
}
