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
//! Simulation domains
//!
//! A domain supplies the per-kind behavior of a simulation: which entities
//! are simple kinematics, what happens to rigid bodies, and how queued
//! actions are applied. Every hook runs with the membership lock held.

use crate::entity::{DirtyFlags, EntityPointer, SimEntity};
use crate::physics::{DynamicId, DynamicPointer};
use crate::simulation::EntitySets;
use crate::time::Timestamp;
use std::collections::BTreeSet;

/// Action adds and removals waiting for the next apply pass
#[derive(Debug, Default)]
pub struct DynamicChanges {
    /// Actions to attach
    pub to_add: Vec<DynamicPointer>,
    /// Actions to detach
    pub to_remove: BTreeSet<DynamicId>,
}

impl DynamicChanges {
    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Drop everything queued
    pub fn clear(&mut self) {
        self.to_add.clear();
        self.to_remove.clear();
    }
}

/// Hooks a simulation calls into
pub trait SimulationDomain: Send {
    /// An entity was registered
    fn add_entity(&mut self, _entity: &EntityPointer, _sets: &mut EntitySets) {}

    /// A simulated entity reported changes; the hook clears the flags it
    /// consumes
    fn change_entity(&mut self, _entity: &EntityPointer, _sets: &mut EntitySets) {}

    /// An entity is leaving the simulation
    fn remove_entity(&mut self, _entity: &EntityPointer, _sets: &mut EntitySets) {}

    /// Per-frame work after kinematic movement and before the tree pass
    fn update_entities(&mut self, _now: Timestamp, _sets: &mut EntitySets) {}

    /// Apply queued action changes; whatever is left in `changes` stays
    /// queued for the next pass
    fn apply_dynamic_changes(&mut self, changes: &mut DynamicChanges, _sets: &EntitySets) {
        changes.clear();
    }

    /// Every entity is being dropped
    fn clear(&mut self, _sets: &mut EntitySets) {}
}

/// Flags that change where an entity sits in the tree
pub(crate) const SORT_FLAGS: DirtyFlags =
    DirtyFlags::from_bits(DirtyFlags::POSITION.bits() | DirtyFlags::SHAPE.bits() | DirtyFlags::PARENT.bits());

/// Non-physical simulation
///
/// Moving entities are extrapolated by the kinematic mover; actions are
/// discarded.
#[derive(Debug, Default)]
pub struct SimpleDomain;

impl SimpleDomain {
    /// Create a simple domain
    pub fn new() -> Self {
        SimpleDomain
    }
}

impl SimulationDomain for SimpleDomain {
    fn add_entity(&mut self, entity: &EntityPointer, sets: &mut EntitySets) {
        if entity.is_moving_relative_to_parent() && entity.physics_info().is_none() {
            sets.simple_kinematic.insert(entity.clone());
        }
    }

    fn change_entity(&mut self, entity: &EntityPointer, sets: &mut EntitySets) {
        if entity.is_moving_relative_to_parent() && entity.physics_info().is_none() {
            sets.simple_kinematic.insert(entity.clone());
        } else {
            sets.simple_kinematic.remove(entity.id());
        }
        if entity.dirty_flags().intersects(SORT_FLAGS) {
            sets.to_sort.insert(entity.clone());
        }
        entity.clear_dirty_flags(DirtyFlags::ALL);
    }
}
