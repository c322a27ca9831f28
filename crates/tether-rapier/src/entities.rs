//! Entity management features: world creation, model removal and lookup.

use tether_core::{
    ConstructEmptyWorld, EntityKind, GetEntities, Identity, Implements, RemoveModelFromWorld,
    RemoveWorld,
};
use tracing::debug;

use crate::engine::{Native, RapierEngine};
use crate::world::{LinkData, ModelData, PhysicsWorld};

impl RapierEngine {
    fn model_data(&self, model: Identity) -> Option<(&PhysicsWorld, &ModelData)> {
        let (w, m) = self.model_key(model)?;
        let world = self.worlds.get(w)?;
        Some((world, world.model(m)?))
    }

    fn link_data(&self, link: Identity) -> Option<&LinkData> {
        let (w, body) = self.link_handle(link)?;
        self.worlds.get(w)?.find_link(body).map(|(_, l)| l)
    }
}

impl ConstructEmptyWorld for RapierEngine {
    fn construct_empty_world(&mut self, engine: Identity, name: &str) -> Identity {
        if self.table.resolve_kind(engine, EntityKind::Engine).is_none() {
            return Identity::invalid();
        }
        let world = PhysicsWorld::new(name, &self.config);
        let (_, id) = self.insert_world(world);
        debug!(world = name, %id, "constructed empty world");
        id
    }
}

impl RemoveModelFromWorld for RapierEngine {
    fn remove_model_by_index(&mut self, world: Identity, index: usize) -> bool {
        let Some(w) = self.world_key(world) else {
            return false;
        };
        let Some(m) = self.worlds.get(w).and_then(|pw| pw.model_key_by_index(index)) else {
            return false;
        };
        self.remove_model_key(w, m)
    }

    fn remove_model_by_name(&mut self, world: Identity, name: &str) -> bool {
        let Some(w) = self.world_key(world) else {
            return false;
        };
        let Some(m) = self.worlds.get(w).and_then(|pw| pw.model_key_by_name(name)) else {
            return false;
        };
        self.remove_model_key(w, m)
    }

    fn remove_model(&mut self, model: Identity) -> bool {
        match self.model_key(model) {
            Some((w, m)) => self.remove_model_key(w, m),
            None => false,
        }
    }

    fn model_removed(&self, model: Identity) -> bool {
        model.kind() == EntityKind::Model && self.table.is_retired(model)
    }
}

impl RemoveWorld for RapierEngine {
    fn remove_world(&mut self, world: Identity) -> bool {
        match self.world_key(world) {
            Some(key) => self.remove_world_key(key),
            None => false,
        }
    }
}

impl GetEntities for RapierEngine {
    fn engine(&self) -> Identity {
        self.engine_id
    }

    fn world_count(&self) -> usize {
        self.world_order.len()
    }

    fn world_by_index(&self, index: usize) -> Option<Identity> {
        let key = self.world_order.get(index)?;
        self.table.identity_of(&Native::World(*key))
    }

    fn world_by_name(&self, name: &str) -> Option<Identity> {
        let key = self
            .world_order
            .iter()
            .find(|k| self.worlds.get(**k).is_some_and(|w| w.name == name))?;
        self.table.identity_of(&Native::World(*key))
    }

    fn model_count(&self, world: Identity) -> Option<usize> {
        Some(self.worlds.get(self.world_key(world)?)?.model_count())
    }

    fn model_by_index(&self, world: Identity, index: usize) -> Option<Identity> {
        let w = self.world_key(world)?;
        let m = self.worlds.get(w)?.model_key_by_index(index)?;
        self.table.identity_of(&Native::Model(w, m))
    }

    fn model_by_name(&self, world: Identity, name: &str) -> Option<Identity> {
        let w = self.world_key(world)?;
        let m = self.worlds.get(w)?.model_key_by_name(name)?;
        self.table.identity_of(&Native::Model(w, m))
    }

    fn link_count(&self, model: Identity) -> Option<usize> {
        self.model_data(model).map(|(_, m)| m.links.len())
    }

    fn link_by_index(&self, model: Identity, index: usize) -> Option<Identity> {
        let (w, _) = self.model_key(model)?;
        let link = self.model_data(model)?.1.links.get(index)?;
        self.table.identity_of(&Native::Link(w, link.body))
    }

    fn link_by_name(&self, model: Identity, name: &str) -> Option<Identity> {
        let (w, _) = self.model_key(model)?;
        let link = self.model_data(model)?.1.link(name)?;
        self.table.identity_of(&Native::Link(w, link.body))
    }

    fn shape_count(&self, link: Identity) -> Option<usize> {
        self.link_data(link).map(|l| l.shapes.len())
    }

    fn shape_by_index(&self, link: Identity, index: usize) -> Option<Identity> {
        let (w, _) = self.link_handle(link)?;
        let shape = self.link_data(link)?.shapes.get(index)?;
        self.table.identity_of(&Native::Shape(w, shape.collider))
    }

    fn shape_by_name(&self, link: Identity, name: &str) -> Option<Identity> {
        let (w, _) = self.link_handle(link)?;
        let shape = self.link_data(link)?.shapes.iter().find(|s| s.name == name)?;
        self.table.identity_of(&Native::Shape(w, shape.collider))
    }

    fn joint_count(&self, model: Identity) -> Option<usize> {
        self.model_data(model).map(|(_, m)| m.joints.len())
    }

    fn joint_by_name(&self, model: Identity, name: &str) -> Option<Identity> {
        let (w, _) = self.model_key(model)?;
        let joint = self.model_data(model)?.1.joints.iter().find(|j| j.name == name)?;
        self.table.identity_of(&Native::Joint(w, joint.handle))
    }

    fn entity_name(&self, entity: Identity) -> Option<String> {
        let name = match self.table.resolve(entity)? {
            Native::Engine => Self::NAME,
            Native::World(w) => self.worlds.get(w)?.name.as_str(),
            Native::Model(w, m) => self.worlds.get(w)?.model(m)?.name.as_str(),
            Native::Link(w, b) => self.worlds.get(w)?.find_link(b)?.1.name.as_str(),
            Native::Shape(w, c) => self.worlds.get(w)?.find_shape(c)?.1.name.as_str(),
            Native::Joint(w, j) => self.worlds.get(w)?.find_joint(j)?.1.name.as_str(),
        };
        Some(name.to_string())
    }

    fn parent_of(&self, entity: Identity) -> Option<Identity> {
        let parent = match self.table.resolve(entity)? {
            Native::Engine => return None,
            Native::World(_) => Native::Engine,
            Native::Model(w, _) => Native::World(w),
            Native::Link(w, b) => Native::Model(w, self.worlds.get(w)?.find_link(b)?.0),
            Native::Shape(w, c) => Native::Link(w, self.worlds.get(w)?.find_shape(c)?.0),
            Native::Joint(w, j) => Native::Model(w, self.worlds.get(w)?.find_joint(j)?.0),
        };
        self.table.identity_of(&parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_world_requires_a_live_engine() {
        let mut engine = RapierEngine::new();
        assert!(!engine
            .construct_empty_world(Identity::invalid(), "w")
            .is_valid());

        let world = engine.construct_empty_world(engine.engine(), "w");
        assert!(world.is_valid());
        assert_eq!(engine.world_count(), 1);
        assert_eq!(engine.model_count(world), Some(0));
        assert_eq!(engine.world_by_name("w"), Some(world));
        assert_eq!(engine.parent_of(world), Some(engine.engine()));
        assert_eq!(engine.entity_name(world).as_deref(), Some("w"));
    }

    #[test]
    fn removal_on_empty_world_is_a_miss() {
        let mut engine = RapierEngine::new();
        let world = engine.construct_empty_world(engine.engine(), "w");
        assert!(!engine.remove_model_by_index(world, 0));
        assert!(!engine.remove_model_by_name(world, "none"));
        assert!(!engine.remove_model(world));
        assert!(!engine.model_removed(world));
    }

    #[test]
    fn removed_world_stops_resolving() {
        let mut engine = RapierEngine::new();
        let world = engine.construct_empty_world(engine.engine(), "w");
        assert!(engine.remove_world(world));
        assert_eq!(engine.world_count(), 0);
        assert_eq!(engine.model_count(world), None);
        assert!(!engine.remove_world(world));
    }
}
