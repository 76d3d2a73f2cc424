//! Entity registry
//!
//! A dense sorted map keyed by `EntityId`, holding every live entity's
//! record. Spawning inserts; despawning is deferred - gameplay marks the
//! record, and the scene sweeps marked entities at end of frame so no
//! system ever iterates over a half-destroyed entity.

use super::dense_map::{DenseMap, DenseMapError};
use super::entity::{EntityId, EntityRecord};

/// Entries the registry can hold before its first regrowth.
pub const REGISTRY_CAPACITY: usize = 256;

pub struct Registry {
    entities: DenseMap<EntityId, EntityRecord>,
    /// Serial for transient ids (bullets, flashes). Wraps; transients
    /// live well under a wrap's worth of frames.
    serial: u16,
}

impl Registry {
    pub fn new() -> Result<Self, DenseMapError> {
        Ok(Self {
            entities: DenseMap::with_capacity(REGISTRY_CAPACITY)?,
            serial: 0,
        })
    }

    /// Add an entity. A duplicate id is rejected and logged; the
    /// existing entry is kept.
    pub fn add(&mut self, id: EntityId, record: EntityRecord) -> bool {
        if self.entities.insert(id, record).is_some() {
            true
        } else {
            println!("registry: duplicate entity id {}, keeping existing", id);
            false
        }
    }

    /// Fresh id for a short-lived entity under `tag`.
    pub fn next_transient(&mut self, tag: &str) -> EntityId {
        self.serial = self.serial.wrapping_add(1);
        EntityId::new(tag, self.serial)
    }

    pub fn get(&self, id: &EntityId) -> Option<&EntityRecord> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut EntityRecord> {
        self.entities.get_mut(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains(id)
    }

    /// Flag an entity for the end-of-frame sweep. Unknown ids are
    /// ignored (already destroyed this frame).
    pub fn mark_destroy(&mut self, id: &EntityId) {
        if let Some(record) = self.entities.get_mut(id) {
            record.mark_destroy();
        }
    }

    /// Ids flagged for destruction, in key order.
    pub fn collect_marked(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, record)| record.is_marked_destroy())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Remove and return a record. The caller owns releasing the
    /// record's physics body and component slots first.
    pub fn remove(&mut self, id: &EntityId) -> Option<EntityRecord> {
        self.entities.remove(id)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&EntityId, &EntityRecord)> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = (&EntityId, &mut EntityRecord)> {
        self.entities.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
