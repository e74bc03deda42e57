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
//! Physical simulation domain
//!
//! Entities that ask for physics get a rigid body in a shared
//! [`DynamicsWorld`](crate::physics::DynamicsWorld). The world is stepped once
//! per frame from the elapsed frame time; placements flow back through
//! [`EntityMotionState`]s and every entity the sync touched is queued for
//! the tree pass.

use crate::entity::{DirtyFlags, EntityId, EntityPointer, SimEntity, Velocity};
use crate::physics::{EntityMotionState, MotionState, SharedDynamicsWorld};
use crate::simulation::domain::{DynamicChanges, SimulationDomain, SORT_FLAGS};
use crate::simulation::EntitySets;
use crate::time::{elapsed_seconds, Timestamp};
use std::collections::BTreeMap;
use std::sync::{Arc, MutexGuard, PoisonError};
use tracing::{debug, trace, trace_span};

/// Flags that require the body to be rebuilt
const REBUILD_FLAGS: DirtyFlags = DirtyFlags::from_bits(
    DirtyFlags::MOTION_TYPE.bits() | DirtyFlags::SHAPE.bits() | DirtyFlags::MASS_PROPERTIES.bits(),
);

/// Simulation domain backed by a dynamics world
#[derive(Debug)]
pub struct PhysicalDomain {
    world: SharedDynamicsWorld,
    motion_states: BTreeMap<EntityId, Arc<EntityMotionState>>,
    last_step: Option<Timestamp>,
    substeps_last_frame: u32,
}

impl PhysicalDomain {
    /// Create a domain over `world`
    pub fn new(world: SharedDynamicsWorld) -> Self {
        PhysicalDomain {
            world,
            motion_states: BTreeMap::new(),
            last_step: None,
            substeps_last_frame: 0,
        }
    }

    /// The dynamics world
    pub fn world(&self) -> SharedDynamicsWorld {
        self.world.clone()
    }

    /// Whether an entity currently owns a body here
    pub fn has_body(&self, id: EntityId) -> bool {
        self.motion_states.contains_key(&id)
    }

    /// Number of bodies owned on behalf of entities
    pub fn body_count(&self) -> usize {
        self.motion_states.len()
    }

    /// Substeps taken by the last frame
    pub fn substeps_last_frame(&self) -> u32 {
        self.substeps_last_frame
    }

    fn lock_world(&self) -> MutexGuard<'_, crate::physics::DynamicsWorld> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a body if the entity wants one; otherwise track it as a simple
    /// kinematic when it moves
    fn add_body_or_kinematic(&mut self, entity: &EntityPointer, sets: &mut EntitySets) {
        match entity.body_descriptor() {
            Some(desc) => {
                let state = Arc::new(EntityMotionState::new(entity.clone()));
                let handle = self.lock_world().add_body(&desc, Some(state.clone() as Arc<dyn MotionState>));
                entity.set_physics_info(Some(handle));
                self.motion_states.insert(entity.id(), state);
                sets.simple_kinematic.remove(entity.id());
                debug!(entity = %entity.id(), body = %handle, "created body");
            }
            None => {
                if entity.is_moving_relative_to_parent() {
                    sets.simple_kinematic.insert(entity.clone());
                }
            }
        }
    }

    fn remove_body(&mut self, entity: &EntityPointer) {
        if self.motion_states.remove(&entity.id()).is_none() {
            return;
        }
        if let Some(handle) = entity.physics_info() {
            self.lock_world().remove_body(handle);
            trace!(entity = %entity.id(), body = %handle, "removed body");
        }
        entity.set_physics_info(None);
    }
}

impl SimulationDomain for PhysicalDomain {
    fn add_entity(&mut self, entity: &EntityPointer, sets: &mut EntitySets) {
        self.add_body_or_kinematic(entity, sets);
    }

    fn change_entity(&mut self, entity: &EntityPointer, sets: &mut EntitySets) {
        let flags = entity.dirty_flags();
        if flags.intersects(REBUILD_FLAGS) {
            self.remove_body(entity);
            sets.simple_kinematic.remove(entity.id());
            self.add_body_or_kinematic(entity, sets);
        } else if let Some(handle) = entity.physics_info() {
            let mut world = self.lock_world();
            if let Some(body) = world.body_mut(handle) {
                if flags.intersects(DirtyFlags::TRANSFORM | DirtyFlags::PARENT) {
                    if let Some(transform) = entity.world_transform() {
                        body.set_transform(transform);
                    }
                }
                if flags.intersects(DirtyFlags::VELOCITIES | DirtyFlags::PARENT) {
                    body.set_velocity(entity.world_velocity());
                }
                body.activate();
            }
        } else if entity.is_moving_relative_to_parent() {
            sets.simple_kinematic.insert(entity.clone());
        } else {
            sets.simple_kinematic.remove(entity.id());
        }

        if flags.intersects(SORT_FLAGS) {
            sets.to_sort.insert(entity.clone());
        }
        entity.clear_dirty_flags(DirtyFlags::ALL);
    }

    fn remove_entity(&mut self, entity: &EntityPointer, _sets: &mut EntitySets) {
        self.remove_body(entity);
    }

    fn update_entities(&mut self, now: Timestamp, sets: &mut EntitySets) {
        let _span = trace_span!("step_physics").entered();
        let dt = self.last_step.map_or(0.0, |last| elapsed_seconds(last, now));
        self.last_step = Some(now);

        let mut world = self.world.lock().unwrap_or_else(PoisonError::into_inner);
        let (max_substeps, fixed) = (world.config().max_substeps, world.config().fixed_substep);
        self.substeps_last_frame = world.step_with_substep_callback(dt, max_substeps, fixed, || {});
        world.synchronize_motion_states(false);

        for state in world.changed_motion_states() {
            if let Some(entity) = state.entity() {
                // The body carried the entity up to now
                entity.restart_simulation_clock(now);
                if sets.all.contains(entity.id()) {
                    sets.to_sort.insert(entity);
                }
            }
        }
        for state in world.deactivated_motion_states() {
            if let Some(entity) = state.entity() {
                if let Some(transform) = entity.world_transform() {
                    entity.set_physics_state(&transform, &Velocity::zero());
                }
            }
        }
    }

    fn apply_dynamic_changes(&mut self, changes: &mut DynamicChanges, sets: &EntitySets) {
        let to_remove = std::mem::take(&mut changes.to_remove);
        let mut world = self.lock_world();
        for id in &to_remove {
            world.remove_action(*id);
        }

        let mut pending = Vec::new();
        for action in changes.to_add.drain(..) {
            if to_remove.contains(&action.id()) {
                continue;
            }
            let handle = sets.all.get(action.owner()).and_then(|entity| entity.physics_info());
            match handle {
                Some(handle) => {
                    if let Err(action) = world.add_action(handle, action) {
                        pending.push(action);
                    }
                }
                None => pending.push(action),
            }
        }
        changes.to_add = pending;
    }

    fn clear(&mut self, sets: &mut EntitySets) {
        let mut world = self.world.lock().unwrap_or_else(PoisonError::into_inner);
        for (id, _) in std::mem::take(&mut self.motion_states) {
            if let Some(entity) = sets.all.get(id) {
                if let Some(handle) = entity.physics_info() {
                    world.remove_body(handle);
                }
                entity.set_physics_info(None);
            }
        }
        self.last_step = None;
    }
}
