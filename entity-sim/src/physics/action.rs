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
//! Entity dynamics (actions)
//!
//! An action is attached to the body of its owner entity and runs once per
//! substep before integration.

use crate::entity::{EntityId, Transform, Velocity};
use crate::physics::RigidBody;
use glam::DQuat;
use std::fmt;
use uuid::Uuid;

/// Identifier of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DynamicId(Uuid);

impl DynamicId {
    /// Fresh random ID
    pub fn new() -> Self {
        DynamicId(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        DynamicId(id)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DynamicId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DynamicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dynamic({})", self.0)
    }
}

/// Behavior that acts on a body every substep
pub trait EntityDynamic: Send + Sync + fmt::Debug {
    /// Action ID
    fn id(&self) -> DynamicId;

    /// Entity whose body this acts on
    fn owner(&self) -> EntityId;

    /// Act on the owner's body for one substep of `dt` seconds
    fn update_action(&mut self, body: &mut RigidBody, dt: f64);
}

/// Owned action
pub type DynamicPointer = Box<dyn EntityDynamic>;

/// Pulls a body toward a target transform
///
/// Dynamic bodies get the velocity that would close the gap in `timescale`
/// seconds. Kinematic bodies are moved onto the target directly.
#[derive(Debug, Clone)]
pub struct SpringAction {
    id: DynamicId,
    owner: EntityId,
    target: Transform,
    linear_timescale: f64,
    angular_timescale: f64,
}

impl SpringAction {
    /// Spring toward `target` with the given linear timescale
    pub fn new(owner: EntityId, target: Transform, linear_timescale: f64) -> Self {
        SpringAction {
            id: DynamicId::new(),
            owner,
            target,
            linear_timescale,
            angular_timescale: f64::INFINITY,
        }
    }

    /// Also pull the rotation, closing the gap in `timescale` seconds
    pub fn with_angular_timescale(mut self, timescale: f64) -> Self {
        self.angular_timescale = timescale;
        self
    }

    /// Current target
    pub fn target(&self) -> Transform {
        self.target
    }

    /// Move the target
    pub fn set_target(&mut self, target: Transform) {
        self.target = target;
    }
}

impl EntityDynamic for SpringAction {
    fn id(&self) -> DynamicId {
        self.id
    }

    fn owner(&self) -> EntityId {
        self.owner
    }

    fn update_action(&mut self, body: &mut RigidBody, dt: f64) {
        if body.is_static() || dt <= 0.0 {
            return;
        }

        if body.is_kinematic() {
            body.move_kinematic(self.target);
            if let Some(motion_state) = body.motion_state() {
                motion_state.mark_internal_kinematic_changes();
            }
            return;
        }

        let current = *body.transform();
        let mut velocity = *body.velocity();
        if self.linear_timescale.is_finite() {
            velocity.linear = (self.target.translation - current.translation) / self.linear_timescale.max(dt);
        }
        if self.angular_timescale.is_finite() {
            let mut delta: DQuat = (self.target.rotation * current.rotation.inverse()).normalize();
            if delta.w < 0.0 {
                delta = -delta;
            }
            velocity.angular = delta.to_scaled_axis() / self.angular_timescale.max(dt);
        }
        body.set_velocity(Velocity::new(velocity.linear, velocity.angular));
        body.activate();
    }
}
