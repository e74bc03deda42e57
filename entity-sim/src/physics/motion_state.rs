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
//! Motion states
//!
//! A motion state is the bridge through which the dynamics world reports a
//! body's placement to its owner, and through which a kinematic body reads
//! the placement its owner wants. Synchronization writes into motion states
//! without taking any lock of its own.

use crate::entity::{EntityId, EntityPointer, Transform, Velocity};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Bridge between a rigid body and whatever owns it
pub trait MotionState: Send + Sync + fmt::Debug {
    /// Receive the body's (interpolated) world placement
    fn set_world_transform(&self, transform: &Transform, velocity: &Velocity);

    /// Placement a kinematic body should move to over the next `time_step`
    ///
    /// `None` leaves the body where it is.
    fn kinematic_target(&self, _time_step: f64) -> Option<Transform> {
        None
    }

    /// Whether a kinematic body was moved by the solver side since the last
    /// synchronization
    fn has_internal_kinematic_changes(&self) -> bool;

    /// Raise the internal kinematic change flag
    fn mark_internal_kinematic_changes(&self);

    /// Clear the internal kinematic change flag
    fn clear_internal_kinematic_changes(&self);

    /// Entity this motion state mirrors, if any
    fn entity(&self) -> Option<EntityPointer> {
        None
    }
}

/// Motion state that mirrors a body into a simulated entity
#[derive(Debug)]
pub struct EntityMotionState {
    entity: EntityPointer,
    internal_kinematic_changes: AtomicBool,
}

impl EntityMotionState {
    /// Create a motion state for `entity`
    pub fn new(entity: EntityPointer) -> Self {
        EntityMotionState {
            entity,
            internal_kinematic_changes: AtomicBool::new(false),
        }
    }

    /// ID of the mirrored entity
    pub fn owner(&self) -> EntityId {
        self.entity.id()
    }
}

impl MotionState for EntityMotionState {
    fn set_world_transform(&self, transform: &Transform, velocity: &Velocity) {
        self.entity.set_physics_state(transform, velocity);
    }

    fn kinematic_target(&self, time_step: f64) -> Option<Transform> {
        if self.entity.is_moving_relative_to_parent() {
            self.entity.step_kinematic_motion(time_step);
        }
        self.entity.world_transform()
    }

    fn has_internal_kinematic_changes(&self) -> bool {
        self.internal_kinematic_changes.load(Ordering::Acquire)
    }

    fn mark_internal_kinematic_changes(&self) {
        self.internal_kinematic_changes.store(true, Ordering::Release);
    }

    fn clear_internal_kinematic_changes(&self) {
        self.internal_kinematic_changes.store(false, Ordering::Release);
    }

    fn entity(&self) -> Option<EntityPointer> {
        Some(self.entity.clone())
    }
}

/// Stand-alone motion state that records the last placement it received
#[derive(Debug, Default)]
pub struct DefaultMotionState {
    placement: Mutex<(Transform, Velocity)>,
    kinematic_target: Mutex<Option<Transform>>,
    internal_kinematic_changes: AtomicBool,
    updates: AtomicUsize,
}

impl DefaultMotionState {
    /// Create a motion state starting at `transform`
    pub fn new(transform: Transform) -> Self {
        DefaultMotionState {
            placement: Mutex::new((transform, Velocity::zero())),
            ..Default::default()
        }
    }

    /// Last transform received
    pub fn transform(&self) -> Transform {
        self.placement.lock().unwrap_or_else(PoisonError::into_inner).0
    }

    /// Last velocity received
    pub fn velocity(&self) -> Velocity {
        self.placement.lock().unwrap_or_else(PoisonError::into_inner).1
    }

    /// Number of placements received
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::Acquire)
    }

    /// Ask a kinematic body to move on its next step
    pub fn set_kinematic_target(&self, transform: Transform) {
        *self.kinematic_target.lock().unwrap_or_else(PoisonError::into_inner) = Some(transform);
    }
}

impl MotionState for DefaultMotionState {
    fn set_world_transform(&self, transform: &Transform, velocity: &Velocity) {
        *self.placement.lock().unwrap_or_else(PoisonError::into_inner) = (*transform, *velocity);
        self.updates.fetch_add(1, Ordering::AcqRel);
    }

    fn kinematic_target(&self, _time_step: f64) -> Option<Transform> {
        self.kinematic_target.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn has_internal_kinematic_changes(&self) -> bool {
        self.internal_kinematic_changes.load(Ordering::Acquire)
    }

    fn mark_internal_kinematic_changes(&self) {
        self.internal_kinematic_changes.store(true, Ordering::Release);
    }

    fn clear_internal_kinematic_changes(&self) {
        self.internal_kinematic_changes.store(false, Ordering::Release);
    }
}
