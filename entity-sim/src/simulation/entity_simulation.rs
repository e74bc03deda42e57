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
//! Entity simulation core
//!
//! # Frame order
//!
//! [`EntitySimulation::update_entities`] runs, under the membership lock:
//!
//! 1. expire mortals whose expiry has passed
//! 2. call the update hook of entities that need it
//! 3. move simple kinematics
//! 4. run the domain's per-frame update
//! 5. reposition moved entities in the tree, killing any that left the
//!    domain bounds
//!
//! # Locking
//!
//! Two mutexes guard disjoint state: membership (tracking sets, dead set,
//! tree handle, domain) and the queue of pending action changes. When both
//! are needed the membership lock is taken first.

use crate::config::SimulationConfig;
use crate::entity::{DirtyFlags, EntityId, EntityPointer, SimEntity};
use crate::physics::{DynamicId, DynamicPointer};
use crate::simulation::domain::{DynamicChanges, SimulationDomain};
use crate::simulation::kinematic::move_simple_kinematics;
use crate::simulation::{EntitySets, SetOfEntities};
use crate::spatial::{AaCube, MovingEntitiesOperator, SharedEntityTree};
use crate::time::{Timestamp, IMMORTAL};
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace, trace_span, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Which tracking sets hold an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Membership {
    /// In the mortal set
    pub mortal: bool,
    /// In the update-needed set
    pub to_update: bool,
    /// In the sort-pending set
    pub to_sort: bool,
    /// In the simple-kinematic set
    pub simple_kinematic: bool,
    /// In the set of all simulated entities
    pub all: bool,
    /// In the dead set
    pub dead: bool,
}

impl Membership {
    /// Whether the entity is in no set at all
    pub fn is_untracked(&self) -> bool {
        *self == Membership::default()
    }
}

struct SimulationState<D> {
    sets: EntitySets,
    tree: Option<SharedEntityTree>,
    domain: D,
    last_frame: Timestamp,
}

/// Owns the lifecycle of simulated entities for one world
pub struct EntitySimulation<D: SimulationDomain> {
    state: Mutex<SimulationState<D>>,
    dynamics: Mutex<DynamicChanges>,
    domain_bounds: AaCube,
}

/// Report a broken calling-order contract: fatal in debug builds, logged and
/// skipped in release builds
macro_rules! contract_violation {
    ($($arg:tt)+) => {{
        debug_assert!(false, $($arg)+);
        warn!($($arg)+);
    }};
}

impl<D: SimulationDomain> EntitySimulation<D> {
    /// Create a simulation over the configured world domain
    pub fn new(config: &SimulationConfig, domain: D) -> Self {
        EntitySimulation {
            state: Mutex::new(SimulationState {
                sets: EntitySets::default(),
                tree: None,
                domain,
                last_frame: 0,
            }),
            dynamics: Mutex::new(DynamicChanges::default()),
            domain_bounds: config.domain_bounds(),
        }
    }

    /// Attach a tree before first use
    pub fn with_tree(self, tree: SharedEntityTree) -> Self {
        self.set_entity_tree(tree);
        self
    }

    /// Fixed bounds of the simulated world
    pub fn domain_bounds(&self) -> AaCube {
        self.domain_bounds
    }

    fn lock(&self) -> MutexGuard<'_, SimulationState<D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_dynamics(&self) -> MutexGuard<'_, DynamicChanges> {
        self.dynamics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap the tree; switching to a different tree drops every per-tree
    /// tracking set
    pub fn set_entity_tree(&self, tree: SharedEntityTree) {
        let mut state = self.lock();
        if let Some(current) = &state.tree {
            if !Arc::ptr_eq(current, &tree) {
                debug!("entity tree replaced; resetting tracking sets");
                state.sets.reset_tracking();
            }
        }
        state.tree = Some(tree);
    }

    /// The attached tree
    pub fn entity_tree(&self) -> Option<SharedEntityTree> {
        self.lock().tree.clone()
    }

    /// Advance every tracked entity to `now`
    pub fn update_entities(&self, now: Timestamp) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let _span = trace_span!("update_entities", now).entered();
        state.last_frame = state.last_frame.max(now);

        self.expire_mortal_entities(now, state);
        call_update_on_entities_that_need_it(now, &mut state.sets);
        {
            let _span = trace_span!("move_simple_kinematics").entered();
            move_simple_kinematics(now, &mut state.sets);
        }
        state.domain.update_entities(now, &mut state.sets);
        self.sort_entities_that_moved(state);
    }

    fn expire_mortal_entities(&self, now: Timestamp, state: &mut SimulationState<D>) {
        if now <= state.sets.next_expiry() {
            return;
        }
        let _span = trace_span!("expire_mortals", mortals = state.sets.mortals.len()).entered();

        let mut next_expiry = IMMORTAL;
        let mut expired = Vec::new();
        for entity in state.sets.mortals.iter() {
            let expiry = entity.expiry();
            if expiry < now {
                expired.push(entity.clone());
            } else {
                next_expiry = next_expiry.min(expiry);
            }
        }
        for entity in expired {
            state.sets.mortals.remove(entity.id());
            trace!(entity = %entity.id(), "lifetime expired");
            entity.die();
            prepare_entity_for_delete_locked(state, &entity);
        }

        if state.sets.mortals.is_empty() {
            next_expiry = IMMORTAL;
        }
        state.sets.set_next_expiry(next_expiry);
    }

    fn sort_entities_that_moved(&self, state: &mut SimulationState<D>) {
        let moved: Vec<EntityPointer> = mem::take(&mut state.sets.to_sort).into_iter().collect();
        if moved.is_empty() {
            return;
        }
        let _span = trace_span!("sort_tree", moved = moved.len()).entered();

        #[cfg(feature = "parallel")]
        let cubes: Vec<Option<AaCube>> = moved.par_iter().map(|entity| entity.query_aa_cube()).collect();
        #[cfg(not(feature = "parallel"))]
        let cubes: Vec<Option<AaCube>> = moved.iter().map(|entity| entity.query_aa_cube()).collect();

        let mut operator = MovingEntitiesOperator::with_capacity(moved.len());
        for (entity, cube) in moved.iter().zip(cubes) {
            match cube {
                Some(cube) if !self.domain_bounds.touches(&cube) => {
                    debug!(entity = %entity.id(), "entity moved out of domain bounds");
                    entity.die();
                    prepare_entity_for_delete_locked(state, entity);
                }
                Some(cube) => operator.add_entity_to_move_list(entity.id(), cube),
                None => trace!(entity = %entity.id(), "placement unresolved; not sorted"),
            }
        }

        if operator.has_moving_entities() {
            if let Some(tree) = &state.tree {
                let mut tree = tree.write().unwrap_or_else(PoisonError::into_inner);
                let relocated = tree.recurse_tree_with_operator(&mut operator);
                trace!(relocated, "tree pass complete");
            }
        }
    }

    /// Start simulating an entity
    pub fn add_entity(&self, entity: EntityPointer) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.sets.all.contains(entity.id()) {
            contract_violation!("entity {} added twice", entity.id());
            return;
        }

        if entity.is_mortal() {
            state.sets.track_mortal(&entity);
        }
        if entity.needs_to_call_update() {
            state.sets.to_update.insert(entity.clone());
        }
        state.domain.add_entity(&entity, &mut state.sets);
        if state.sets.simple_kinematic.contains(entity.id()) {
            entity.restart_simulation_clock(state.last_frame);
        }

        state.sets.all.insert(entity.clone());
        entity.set_simulated(true);
        // Registration establishes ground truth; earlier edits are moot.
        entity.clear_dirty_flags(DirtyFlags::ALL);
        trace!(entity = %entity.id(), "added entity");
    }

    /// Reconcile an entity's dirty flags
    ///
    /// No-op for entities that are not simulated, so late edits to a
    /// detached or dying entity are ignored.
    pub fn change_entity(&self, entity: &EntityPointer) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if !entity.is_simulated() {
            trace!(entity = %entity.id(), "change ignored; entity not simulated");
            return;
        }

        let flags = entity.dirty_flags();
        if flags.contains(DirtyFlags::POSITION) {
            if let Some(cube) = entity.query_aa_cube() {
                if !self.domain_bounds.touches(&cube) {
                    debug!(entity = %entity.id(), "entity moved out of domain bounds");
                    entity.die();
                    prepare_entity_for_delete_locked(state, entity);
                    return;
                }
            }
        }

        if flags.contains(DirtyFlags::LIFETIME) {
            if entity.is_mortal() {
                state.sets.track_mortal(entity);
            } else {
                state.sets.mortals.remove(entity.id());
            }
            entity.clear_dirty_flags(DirtyFlags::LIFETIME);
        }
        if entity.needs_to_call_update() {
            state.sets.to_update.insert(entity.clone());
        } else {
            state.sets.to_update.remove(entity.id());
        }
        let was_kinematic = state.sets.simple_kinematic.contains(entity.id());
        state.domain.change_entity(entity, &mut state.sets);
        // Time spent still or under a body is not extrapolated
        if !was_kinematic && state.sets.simple_kinematic.contains(entity.id()) {
            entity.restart_simulation_clock(state.last_frame);
        }
    }

    /// Hand the dead set to the caller, leaving it empty
    ///
    /// The caller removes the entities from the tree.
    pub fn take_dead_entities(&self) -> SetOfEntities {
        mem::take(&mut self.lock().sets.dead)
    }

    /// Detach an entity that was killed from outside the simulation
    pub fn prepare_entity_for_delete(&self, entity: &EntityPointer) {
        let mut guard = self.lock();
        prepare_entity_for_delete_locked(&mut guard, entity);
    }

    /// Drop every entity
    pub fn clear_entities(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.sets.reset_tracking();
        state.domain.clear(&mut state.sets);
        for entity in state.sets.all.iter() {
            entity.set_simulated(false);
        }
        state.sets.all.clear();
        state.sets.dead.clear();
        debug!("cleared all entities");
    }

    /// Queue an action for the next [`apply_dynamic_changes`](Self::apply_dynamic_changes)
    pub fn add_dynamic(&self, dynamic: DynamicPointer) {
        self.lock_dynamics().to_add.push(dynamic);
    }

    /// Queue an action removal
    pub fn remove_dynamic(&self, id: DynamicId) {
        self.lock_dynamics().to_remove.insert(id);
    }

    /// Queue several action removals
    pub fn remove_dynamics<I>(&self, ids: I)
    where
        I: IntoIterator<Item = DynamicId>,
    {
        self.lock_dynamics().to_remove.extend(ids);
    }

    /// Hand queued action changes to the domain
    pub fn apply_dynamic_changes(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let mut changes = self.lock_dynamics();
        state.domain.apply_dynamic_changes(&mut changes, &state.sets);
    }

    /// Number of queued action adds and removals
    pub fn pending_dynamic_count(&self) -> usize {
        let changes = self.lock_dynamics();
        changes.to_add.len() + changes.to_remove.len()
    }

    /// Where an entity is tracked
    pub fn membership(&self, id: EntityId) -> Membership {
        let state = self.lock();
        let sets = &state.sets;
        Membership {
            mortal: sets.mortals.contains(id),
            to_update: sets.to_update.contains(id),
            to_sort: sets.to_sort.contains(id),
            simple_kinematic: sets.simple_kinematic.contains(id),
            all: sets.all.contains(id),
            dead: sets.dead.contains(id),
        }
    }

    /// Number of simulated entities
    pub fn entity_count(&self) -> usize {
        self.lock().sets.all.len()
    }

    /// Number of entities waiting in the dead set
    pub fn dead_count(&self) -> usize {
        self.lock().sets.dead.len()
    }

    /// Current expiry watermark
    pub fn next_expiry(&self) -> Timestamp {
        self.lock().sets.next_expiry()
    }

    /// Run `f` with the domain
    pub fn with_domain<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        f(&self.lock().domain)
    }
}

fn call_update_on_entities_that_need_it(now: Timestamp, sets: &mut EntitySets) {
    let _span = trace_span!("update_callbacks", entities = sets.to_update.len()).entered();
    sets.to_update.retain(|entity| {
        if entity.needs_to_call_update() {
            entity.update(now);
            true
        } else {
            false
        }
    });
}

fn prepare_entity_for_delete_locked<D: SimulationDomain>(state: &mut SimulationState<D>, entity: &EntityPointer) {
    if !entity.is_dead() {
        contract_violation!("entity {} prepared for delete while alive", entity.id());
        return;
    }
    if entity.is_simulated() {
        state.domain.remove_entity(entity, &mut state.sets);
        state.sets.detach(entity);
        state.sets.dead.insert(entity.clone());
    }
}
