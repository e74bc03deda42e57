// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Tracking sets
//!
//! Sets are keyed by entity ID so iteration order is deterministic.

use crate::entity::{EntityId, EntityPointer, SimEntity};
use crate::time::{Timestamp, IMMORTAL};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// A set of entities keyed by ID
#[derive(Clone, Default)]
pub struct SetOfEntities {
    entities: BTreeMap<EntityId, EntityPointer>,
}

impl SetOfEntities {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert; returns false if the entity was already present
    pub fn insert(&mut self, entity: EntityPointer) -> bool {
        self.entities.insert(entity.id(), entity).is_none()
    }

    /// Remove by ID
    pub fn remove(&mut self, id: EntityId) -> Option<EntityPointer> {
        self.entities.remove(&id)
    }

    /// Look up by ID
    pub fn get(&self, id: EntityId) -> Option<&EntityPointer> {
        self.entities.get(&id)
    }

    /// Whether the set holds `id`
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate in ID order
    pub fn iter(&self) -> impl Iterator<Item = &EntityPointer> {
        self.entities.values()
    }

    /// IDs in order
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Keep only the entities for which `keep` returns true
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&EntityPointer) -> bool,
    {
        self.entities.retain(|_, entity| keep(entity));
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.entities.clear();
    }
}

impl fmt::Debug for SetOfEntities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entities.keys()).finish()
    }
}

impl Extend<EntityPointer> for SetOfEntities {
    fn extend<I: IntoIterator<Item = EntityPointer>>(&mut self, iter: I) {
        for entity in iter {
            self.insert(entity);
        }
    }
}

impl FromIterator<EntityPointer> for SetOfEntities {
    fn from_iter<I: IntoIterator<Item = EntityPointer>>(iter: I) -> Self {
        let mut set = SetOfEntities::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for SetOfEntities {
    type Item = EntityPointer;
    type IntoIter = btree_map::IntoValues<EntityId, EntityPointer>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_values()
    }
}

/// The tracking sets of one simulation
///
/// Domains receive these in their hooks and may move entities between the
/// simple-kinematic and sort-pending sets.
#[derive(Debug)]
pub struct EntitySets {
    /// Entities with a finite expiry
    pub mortals: SetOfEntities,
    /// Entities whose update hook has work to do
    pub to_update: SetOfEntities,
    /// Entities whose bounds changed since the last tree pass
    pub to_sort: SetOfEntities,
    /// Entities moved by local extrapolation
    pub simple_kinematic: SetOfEntities,
    /// Every simulated entity
    pub all: SetOfEntities,
    /// Entities killed and waiting for their owner
    pub dead: SetOfEntities,
    next_expiry: Timestamp,
}

impl Default for EntitySets {
    fn default() -> Self {
        EntitySets {
            mortals: SetOfEntities::new(),
            to_update: SetOfEntities::new(),
            to_sort: SetOfEntities::new(),
            simple_kinematic: SetOfEntities::new(),
            all: SetOfEntities::new(),
            dead: SetOfEntities::new(),
            next_expiry: IMMORTAL,
        }
    }
}

impl EntitySets {
    /// Earliest expiry that may be due; [`IMMORTAL`] when nothing is
    pub fn next_expiry(&self) -> Timestamp {
        self.next_expiry
    }

    pub(crate) fn track_mortal(&mut self, entity: &EntityPointer) {
        let expiry = entity.expiry();
        self.mortals.insert(entity.clone());
        self.next_expiry = self.next_expiry.min(expiry);
    }

    pub(crate) fn set_next_expiry(&mut self, expiry: Timestamp) {
        self.next_expiry = expiry;
    }

    /// Drop an entity from every set except the dead set
    pub(crate) fn detach(&mut self, entity: &EntityPointer) {
        let id = entity.id();
        self.mortals.remove(id);
        self.to_update.remove(id);
        self.to_sort.remove(id);
        self.simple_kinematic.remove(id);
        self.all.remove(id);
        entity.set_simulated(false);
    }

    /// Empty the per-tree sets and reset the expiry watermark
    pub(crate) fn reset_tracking(&mut self) {
        self.mortals.clear();
        self.next_expiry = IMMORTAL;
        self.to_update.clear();
        self.to_sort.clear();
        self.simple_kinematic.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityItem;

    fn entity(id: u64) -> EntityPointer {
        EntityItem::shape(EntityId::new(id), 0).shared()
    }

    #[test]
    fn test_set_is_ordered_and_unique() {
        let mut set: SetOfEntities = [entity(3), entity(1), entity(2)].into_iter().collect();
        assert!(!set.insert(entity(2)));
        assert_eq!(set.ids().collect::<Vec<_>>(), vec![EntityId::new(1), EntityId::new(2), EntityId::new(3)]);

        set.retain(|e| e.id() != EntityId::new(1));
        assert_eq!(set.len(), 2);
        assert!(set.remove(EntityId::new(3)).is_some());
        assert!(!set.contains(EntityId::new(3)));
    }

    #[test]
    fn test_track_mortal_lowers_watermark() {
        let mut sets = EntitySets::default();
        assert_eq!(sets.next_expiry(), IMMORTAL);
        let mortal: EntityPointer = EntityItem::shape(EntityId::new(1), 100).with_lifetime(1.0).shared();
        sets.track_mortal(&mortal);
        assert_eq!(sets.next_expiry(), 1_000_100);

        sets.reset_tracking();
        assert!(sets.mortals.is_empty());
        assert_eq!(sets.next_expiry(), IMMORTAL);
    }

    #[test]
    fn test_detach_clears_simulated() {
        let mut sets = EntitySets::default();
        let e = entity(9);
        e.set_simulated(true);
        sets.all.insert(e.clone());
        sets.to_sort.insert(e.clone());
        sets.detach(&e);
        assert!(!e.is_simulated());
        assert!(sets.all.is_empty() && sets.to_sort.is_empty());
    }
}
