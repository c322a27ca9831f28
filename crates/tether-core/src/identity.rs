//! Opaque entity identities and the table mapping them to native handles.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use slotmap::{Key, SlotMap};

slotmap::new_key_type! {
    /// Generation-checked slot key backing an [`Identity`].
    pub struct EntityKey;
}

/// Kind of entity an [`Identity`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A physics engine instance.
    Engine,
    /// A simulation world.
    World,
    /// A model inside a world.
    Model,
    /// A rigid body inside a model.
    Link,
    /// A collision shape attached to a link.
    Shape,
    /// A joint inside a model.
    Joint,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Engine => "engine",
            EntityKind::World => "world",
            EntityKind::Model => "model",
            EntityKind::Link => "link",
            EntityKind::Shape => "shape",
            EntityKind::Joint => "joint",
        };
        f.write_str(name)
    }
}

/// Opaque handle to one native physics object.
///
/// Identities are only meaningful to the engine that issued them. Once the
/// object is destroyed the identity stops resolving; its slot may be reused
/// but with a new generation, so a stale identity never aliases a new object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity {
    kind: EntityKind,
    key: EntityKey,
}

impl Identity {
    /// The null identity. Never resolves.
    pub fn invalid() -> Self {
        Self {
            kind: EntityKind::Engine,
            key: EntityKey::null(),
        }
    }

    /// Whether this identity was issued by a table (it may still be stale).
    pub fn is_valid(&self) -> bool {
        !self.key.is_null()
    }

    /// Kind of entity this identity refers to.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Underlying slot key.
    pub fn key(&self) -> EntityKey {
        self.key
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}#{:x}", self.kind, self.key.data().as_ffi())
        } else {
            f.write_str("invalid")
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry<N> {
    kind: EntityKind,
    native: N,
}

/// Mapping between issued identities and native handles.
///
/// Every live identity maps to exactly one native handle and every
/// registered native handle maps back to exactly one identity. Entries are
/// inserted by [`register`](Self::register) and removed by
/// [`invalidate`](Self::invalidate); they are never rewritten.
#[derive(Debug, Clone)]
pub struct IdentityTable<N> {
    entries: SlotMap<EntityKey, Entry<N>>,
    reverse: HashMap<N, Identity>,
    retired: HashSet<Identity>,
}

impl<N> Default for IdentityTable<N> {
    fn default() -> Self {
        Self {
            entries: SlotMap::with_key(),
            reverse: HashMap::new(),
            retired: HashSet::new(),
        }
    }
}

impl<N: Copy + Eq + Hash> IdentityTable<N> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh identity for `native`.
    ///
    /// Registering a handle that already has an identity retires the old
    /// identity first.
    pub fn register(&mut self, kind: EntityKind, native: N) -> Identity {
        if let Some(previous) = self.reverse.get(&native).copied() {
            self.invalidate(previous);
        }
        let key = self.entries.insert(Entry { kind, native });
        let id = Identity { kind, key };
        self.reverse.insert(native, id);
        id
    }

    /// Native handle behind `id`, or `None` if it is unknown, stale or of a
    /// different kind.
    pub fn resolve(&self, id: Identity) -> Option<N> {
        self.entries
            .get(id.key)
            .filter(|entry| entry.kind == id.kind)
            .map(|entry| entry.native)
    }

    /// Like [`resolve`](Self::resolve), but also requires `id` to be of `kind`.
    pub fn resolve_kind(&self, id: Identity, kind: EntityKind) -> Option<N> {
        if id.kind != kind {
            return None;
        }
        self.resolve(id)
    }

    /// Stop resolving `id`. Invalidating a dead identity is a no-op.
    ///
    /// Only worlds and models are remembered as retired; links, shapes and
    /// joints are simply dropped.
    pub fn invalidate(&mut self, id: Identity) {
        let live = matches!(self.entries.get(id.key), Some(entry) if entry.kind == id.kind);
        if !live {
            return;
        }
        if let Some(entry) = self.entries.remove(id.key) {
            self.reverse.remove(&entry.native);
            if matches!(id.kind, EntityKind::World | EntityKind::Model) {
                self.retired.insert(id);
            }
        }
    }

    /// Invalidate every entry whose native handle matches `pred`.
    ///
    /// Returns the identities that were invalidated.
    pub fn invalidate_where(&mut self, mut pred: impl FnMut(&N) -> bool) -> Vec<Identity> {
        let doomed: Vec<Identity> = self
            .entries
            .iter()
            .filter(|(_, entry)| pred(&entry.native))
            .map(|(key, entry)| Identity {
                kind: entry.kind,
                key,
            })
            .collect();
        for id in &doomed {
            self.invalidate(*id);
        }
        doomed
    }

    /// Identity currently assigned to `native`.
    pub fn identity_of(&self, native: &N) -> Option<Identity> {
        self.reverse.get(native).copied()
    }

    /// Whether `id` was once live in this table and has been invalidated.
    pub fn is_retired(&self, id: Identity) -> bool {
        self.retired.contains(&id)
    }

    /// Whether `id` currently resolves.
    pub fn contains(&self, id: Identity) -> bool {
        self.resolve(id).is_some()
    }

    /// Number of live identities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no identity is live.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live identities and their native handles, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Identity, N)> + '_ {
        self.entries.iter().map(|(key, entry)| {
            (
                Identity {
                    kind: entry.kind,
                    key,
                },
                entry.native,
            )
        })
    }
}
