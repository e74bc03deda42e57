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
//! Entity records
//!
//! The simulation core only ever talks to entities through [`SimEntity`].
//! [`EntityItem`] is the concrete record used by the rest of the engine;
//! tests are free to provide their own implementations.

mod components;
mod dirty;
mod id;
mod item;
mod nestable;

pub use components::{Transform, Velocity, MIN_ANGULAR_SPEED_SQUARED, MIN_LINEAR_SPEED_SQUARED};
pub use dirty::DirtyFlags;
pub use id::EntityId;
pub use item::{EntityItem, EntityKind, PhysicsMotion, MAX_PARENTING_CHAIN_SIZE};
pub use nestable::{AvatarAnchor, NestableType, ParentLink};

use crate::physics::{BodyDescriptor, BodyHandle};
use crate::spatial::AaCube;
use crate::time::{Timestamp, IMMORTAL};
use std::fmt;
use std::sync::Arc;

/// Shared handle to a simulated entity
pub type EntityPointer = Arc<dyn SimEntity>;

/// Capabilities the simulation core needs from an entity
///
/// Every method takes `&self`: entities are shared between the simulation
/// thread and the threads that edit them, so implementations use interior
/// mutability.
pub trait SimEntity: Send + Sync + fmt::Debug {
    /// Stable identifier
    fn id(&self) -> EntityId;

    /// Time after which the entity expires; [`IMMORTAL`] if never
    fn expiry(&self) -> Timestamp;

    /// Whether the entity has a finite expiry
    fn is_mortal(&self) -> bool {
        self.expiry() != IMMORTAL
    }

    /// Mark the entity dead
    fn die(&self);

    /// Whether [`die`](Self::die) has been called
    fn is_dead(&self) -> bool;

    /// Whether the per-frame update hook has work to do
    fn needs_to_call_update(&self) -> bool;

    /// Per-frame update hook
    fn update(&self, now: Timestamp);

    /// Whether the entity moves in its parent's frame
    fn is_moving_relative_to_parent(&self) -> bool;

    /// Extrapolate local motion up to `now`
    fn simulate(&self, now: Timestamp);

    /// Count the next extrapolation from `now` rather than from the last
    /// step; never moves the clock backwards
    fn restart_simulation_clock(&self, now: Timestamp);

    /// Extrapolate local motion by `dt` seconds
    fn step_kinematic_motion(&self, dt: f64);

    /// Whether any ancestor is of the given type
    fn has_ancestor_of_type(&self, nestable: NestableType) -> bool;

    /// Link to the parent, if any
    fn parent_link(&self) -> Option<ParentLink>;

    /// Transform in the parent's frame
    fn local_transform(&self) -> Transform;

    /// Velocity in the parent's frame
    fn local_velocity(&self) -> Velocity;

    /// Transform in world space; `None` if an ancestor cannot be resolved
    fn world_transform(&self) -> Option<Transform>;

    /// Velocity in world space
    fn world_velocity(&self) -> Velocity;

    /// Bounding cube used by the spatial index; `None` if placement is unknown
    fn query_aa_cube(&self) -> Option<AaCube>;

    /// Handle of the rigid body owned on this entity's behalf
    fn physics_info(&self) -> Option<BodyHandle>;

    /// Record or clear the rigid body handle
    fn set_physics_info(&self, handle: Option<BodyHandle>);

    /// Description of the body this entity wants, if any
    fn body_descriptor(&self) -> Option<BodyDescriptor>;

    /// Accept a world-space placement computed by the dynamics world
    ///
    /// Does not raise dirty flags.
    fn set_physics_state(&self, transform: &Transform, velocity: &Velocity);

    /// Flags raised since the last reconciliation
    fn dirty_flags(&self) -> DirtyFlags;

    /// Clear the flags in `mask`
    fn clear_dirty_flags(&self, mask: DirtyFlags);

    /// Record whether the entity is tracked by a simulation
    fn set_simulated(&self, simulated: bool);

    /// Whether the entity is tracked by a simulation
    fn is_simulated(&self) -> bool;
}
