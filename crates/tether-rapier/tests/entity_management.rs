//! Model construction, lookup and removal through the entity features.

use tether_core::{
    ConstructEmptyWorld, ConstructFromDescription, EntityManagementFeatureList, GetEntities,
    Identity, RemoveModelFromWorld, RemoveWorld,
};
use tether_ir::{Collision, Geometry, Inertial, Link, Model, Vec3, World};
use tether_rapier::RapierEngine;

fn sphere_model(name: &str) -> Model {
    let mut link = Link::new("body");
    link.inertial = Some(Inertial {
        mass: 0.5,
        center_of_mass: Vec3::zero(),
        inertia: None,
    });
    link.collisions
        .push(Collision::new("ball", Geometry::Sphere { radius: 0.1 }));
    let mut model = Model::new(name);
    model.links.push(link);
    model
}

fn world_with(names: &[&str]) -> (RapierEngine, Identity) {
    let mut desc = World::new("default");
    desc.models = names.iter().map(|n| sphere_model(n)).collect();
    let mut engine = RapierEngine::new();
    let engine_id = engine.engine();
    let world = engine.construct_world(engine_id, &desc).expect("construct");
    (engine, world)
}

/// World descriptions reject duplicate model names, so models are added one
/// at a time to an empty world instead.
fn world_with_models_added(names: &[&str]) -> (RapierEngine, Identity) {
    let mut engine = RapierEngine::new();
    let world = engine.construct_empty_world(engine.engine(), "default");
    for name in names {
        engine
            .construct_model(world, &sphere_model(name))
            .expect("construct model");
    }
    (engine, world)
}

/// Generic over the feature set, the way plugin consumers use it.
fn model_names<E: EntityManagementFeatureList>(engine: &E, world: Identity) -> Vec<String> {
    let count = engine.model_count(world).unwrap_or(0);
    (0..count)
        .filter_map(|i| engine.model_by_index(world, i))
        .filter_map(|m| engine.entity_name(m))
        .collect()
}

#[test]
fn remove_by_identity_invalidates_contents() {
    let (mut engine, world) = world_with(&["sphere", "other"]);
    let model = engine.model_by_name(world, "sphere").unwrap();
    let link = engine.link_by_name(model, "body").unwrap();
    let shape = engine.shape_by_name(link, "ball").unwrap();

    assert!(!engine.model_removed(model));
    assert!(engine.remove_model(model));
    assert!(engine.model_removed(model));

    assert_eq!(engine.model_count(world), Some(1));
    assert_eq!(engine.link_count(model), None);
    assert_eq!(engine.entity_name(link), None);
    assert_eq!(engine.entity_name(shape), None);
    assert_eq!(model_names(&engine, world), vec!["other".to_string()]);

    // Removing twice is a miss, and the identity stays removed.
    assert!(!engine.remove_model(model));
    assert!(engine.model_removed(model));
}

#[test]
fn remove_by_index_uses_construction_order() {
    let (mut engine, world) = world_with(&["a", "b", "c"]);
    let b = engine.model_by_index(world, 1).unwrap();

    assert!(engine.remove_model_by_index(world, 1));
    assert!(engine.model_removed(b));
    assert_eq!(model_names(&engine, world), vec!["a".to_string(), "c".to_string()]);

    assert!(!engine.remove_model_by_index(world, 2));
    assert_eq!(engine.model_count(world), Some(2));
}

#[test]
fn out_of_range_index_keeps_identities() {
    let (mut engine, world) = world_with(&["a", "b"]);
    let model = engine.model_by_index(world, 0).unwrap();
    let link = engine.link_by_name(model, "body").unwrap();
    let shape = engine.shape_by_name(link, "ball").unwrap();
    let other = engine.model_by_index(world, 1).unwrap();

    assert!(!engine.remove_model_by_index(world, 2));

    assert_eq!(engine.model_by_index(world, 0), Some(model));
    assert_eq!(engine.model_by_index(world, 1), Some(other));
    assert_eq!(engine.link_by_name(model, "body"), Some(link));
    assert_eq!(engine.shape_by_name(link, "ball"), Some(shape));
    assert_eq!(engine.entity_name(model).as_deref(), Some("a"));
    assert_eq!(engine.entity_name(link).as_deref(), Some("body"));
    assert_eq!(engine.entity_name(shape).as_deref(), Some("ball"));
    assert!(!engine.model_removed(model));
    assert!(!engine.model_removed(other));
}

#[test]
fn remove_by_name_takes_first_duplicate() {
    let (mut engine, world) = world_with_models_added(&["twin", "solo", "twin"]);
    let first = engine.model_by_index(world, 0).unwrap();
    let last = engine.model_by_index(world, 2).unwrap();

    assert!(engine.remove_model_by_name(world, "twin"));
    assert!(engine.model_removed(first));
    assert!(!engine.model_removed(last));
    assert_eq!(engine.model_by_name(world, "twin"), Some(last));

    assert!(engine.remove_model_by_name(world, "twin"));
    assert!(!engine.remove_model_by_name(world, "twin"));
    assert_eq!(model_names(&engine, world), vec!["solo".to_string()]);
}

#[test]
fn model_removed_is_false_for_foreign_identities() {
    let (engine, world) = world_with(&["a"]);
    assert!(!engine.model_removed(Identity::invalid()));
    assert!(!engine.model_removed(world));
    let live = engine.model_by_index(world, 0).unwrap();
    assert!(!engine.model_removed(live));
}

#[test]
fn removing_a_world_cascades() {
    let (mut engine, world) = world_with(&["a", "b"]);
    let model = engine.model_by_index(world, 0).unwrap();
    let other = engine.construct_empty_world(engine.engine(), "spare");

    assert!(engine.remove_world(world));
    assert!(engine.model_removed(model));
    assert_eq!(engine.world_count(), 1);
    assert_eq!(engine.world_by_index(0), Some(other));
    assert!(!engine.remove_model_by_index(world, 0));
}

#[test]
fn empty_world_accepts_models() {
    let mut engine = RapierEngine::new();
    let world = engine.construct_empty_world(engine.engine(), "empty");
    assert_eq!(engine.model_count(world), Some(0));

    let model = engine.construct_model(world, &sphere_model("late")).unwrap();
    assert_eq!(engine.model_count(world), Some(1));
    assert_eq!(engine.parent_of(model), Some(world));
    assert!(engine.remove_model_by_index(world, 0));
    assert_eq!(engine.model_count(world), Some(0));
}
