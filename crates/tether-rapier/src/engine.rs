//! The Rapier engine plugin and its identity bookkeeping.

use rapier3d::dynamics::{ImpulseJointHandle, RigidBodyHandle};
use rapier3d::geometry::ColliderHandle;
use slotmap::{new_key_type, SlotMap};
use tether_core::{EntityKind, Feature, Identity, IdentityTable, Implements};
use tracing::debug;

use crate::config::EngineConfig;
use crate::world::{ModelKey, PhysicsWorld, RemovedModel};

new_key_type! {
    /// Key of a world inside the engine.
    pub struct WorldKey;
}

/// Native handle behind an [`Identity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Native {
    Engine,
    World(WorldKey),
    Model(WorldKey, ModelKey),
    Link(WorldKey, RigidBodyHandle),
    Shape(WorldKey, ColliderHandle),
    Joint(WorldKey, ImpulseJointHandle),
}

impl Native {
    fn world(&self) -> Option<WorldKey> {
        match *self {
            Native::Engine => None,
            Native::World(w)
            | Native::Model(w, _)
            | Native::Link(w, _)
            | Native::Shape(w, _)
            | Native::Joint(w, _) => Some(w),
        }
    }
}

/// Rigid-body engine plugin backed by Rapier3d.
///
/// # Threading
///
/// The engine does no internal locking. An instance and all of its worlds
/// must be driven from one thread at a time; every mutating feature takes
/// `&mut self`, so the borrow checker enforces this within safe code.
pub struct RapierEngine {
    pub(crate) config: EngineConfig,
    pub(crate) table: IdentityTable<Native>,
    pub(crate) engine_id: Identity,
    pub(crate) worlds: SlotMap<WorldKey, PhysicsWorld>,
    pub(crate) world_order: Vec<WorldKey>,
}

impl Default for RapierEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierEngine {
    /// Create an engine with default settings.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with the given defaults.
    pub fn with_config(config: EngineConfig) -> Self {
        let mut table = IdentityTable::new();
        let engine_id = table.register(EntityKind::Engine, Native::Engine);
        Self {
            config,
            table,
            engine_id,
            worlds: SlotMap::with_key(),
            world_order: Vec::new(),
        }
    }

    /// Engine defaults.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Direct access to a world's native state.
    pub fn physics_world(&self, world: Identity) -> Option<&PhysicsWorld> {
        self.worlds.get(self.world_key(world)?)
    }

    pub(crate) fn world_key(&self, world: Identity) -> Option<WorldKey> {
        match self.table.resolve_kind(world, EntityKind::World)? {
            Native::World(key) => Some(key),
            _ => None,
        }
    }

    pub(crate) fn model_key(&self, model: Identity) -> Option<(WorldKey, ModelKey)> {
        match self.table.resolve_kind(model, EntityKind::Model)? {
            Native::Model(w, m) => Some((w, m)),
            _ => None,
        }
    }

    pub(crate) fn link_handle(&self, link: Identity) -> Option<(WorldKey, RigidBodyHandle)> {
        match self.table.resolve_kind(link, EntityKind::Link)? {
            Native::Link(w, b) => Some((w, b)),
            _ => None,
        }
    }

    pub(crate) fn shape_handle(&self, shape: Identity) -> Option<(WorldKey, ColliderHandle)> {
        match self.table.resolve_kind(shape, EntityKind::Shape)? {
            Native::Shape(w, c) => Some((w, c)),
            _ => None,
        }
    }

    pub(crate) fn joint_handle(&self, joint: Identity) -> Option<(WorldKey, ImpulseJointHandle)> {
        match self.table.resolve_kind(joint, EntityKind::Joint)? {
            Native::Joint(w, j) => Some((w, j)),
            _ => None,
        }
    }

    /// Create and register an empty world.
    pub(crate) fn insert_world(&mut self, world: PhysicsWorld) -> (WorldKey, Identity) {
        let key = self.worlds.insert(world);
        self.world_order.push(key);
        let id = self.table.register(EntityKind::World, Native::World(key));
        (key, id)
    }

    /// Register identities for a model and everything it contains.
    pub(crate) fn register_model(&mut self, world: WorldKey, model: ModelKey) -> Identity {
        let id = self.table.register(EntityKind::Model, Native::Model(world, model));
        let Some(data) = self.worlds.get(world).and_then(|w| w.model(model)) else {
            return id;
        };
        for link in &data.links {
            self.table.register(EntityKind::Link, Native::Link(world, link.body));
            for shape in &link.shapes {
                self.table
                    .register(EntityKind::Shape, Native::Shape(world, shape.collider));
            }
        }
        for joint in &data.joints {
            self.table
                .register(EntityKind::Joint, Native::Joint(world, joint.handle));
        }
        id
    }

    /// Remove a model from its world and retire all of its identities.
    pub(crate) fn remove_model_key(&mut self, world: WorldKey, model: ModelKey) -> bool {
        let Some(removed) = self.worlds.get_mut(world).and_then(|w| w.remove_model(model)) else {
            return false;
        };
        let RemovedModel {
            bodies,
            colliders,
            joints,
        } = removed;
        let retired = self.table.invalidate_where(|native| match native {
            Native::Model(w, m) => *w == world && *m == model,
            Native::Link(w, b) => *w == world && bodies.contains(b),
            Native::Shape(w, c) => *w == world && colliders.contains(c),
            Native::Joint(w, j) => *w == world && joints.contains(j),
            _ => false,
        });
        debug!(retired = retired.len(), "removed model");
        true
    }

    /// Destroy a world and retire every identity inside it.
    pub(crate) fn remove_world_key(&mut self, world: WorldKey) -> bool {
        let Some(removed) = self.worlds.remove(world) else {
            return false;
        };
        self.world_order.retain(|k| *k != world);
        let retired = self
            .table
            .invalidate_where(|native| native.world() == Some(world));
        debug!(world = %removed.name, retired = retired.len(), "removed world");
        true
    }
}

impl Implements for RapierEngine {
    const NAME: &'static str = "rapier";
    const FEATURES: &'static [Feature] = Feature::ALL;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{
        ConstructFromDescription, EntityManagementFeatureList, JointFeatureList, ShapeFeatureList,
        SimulationFeatureList,
    };

    #[test]
    fn engine_identity_resolves() {
        let engine = RapierEngine::new();
        assert!(engine.engine_id.is_valid());
        assert_eq!(engine.table.resolve(engine.engine_id), Some(Native::Engine));
        assert_eq!(engine.world_key(engine.engine_id), None);
    }

    fn implements_every_feature<E>()
    where
        E: Implements
            + EntityManagementFeatureList
            + ShapeFeatureList
            + JointFeatureList
            + SimulationFeatureList
            + ConstructFromDescription,
    {
        for feature in Feature::ALL {
            assert!(E::implements(*feature), "{} not advertised", feature.name());
        }
    }

    #[test]
    fn every_feature_is_implemented_and_advertised() {
        implements_every_feature::<RapierEngine>();
    }

    #[test]
    fn removing_a_world_twice_fails() {
        let mut engine = RapierEngine::new();
        let world = PhysicsWorld::new("w", &EngineConfig::default());
        let (key, id) = engine.insert_world(world);
        assert!(engine.remove_world_key(key));
        assert!(!engine.remove_world_key(key));
        assert!(engine.table.is_retired(id));
    }
}
