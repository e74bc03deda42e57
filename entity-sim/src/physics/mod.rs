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
//! Rigid-body dynamics
//!
//! The [`DynamicsWorld`] owns every [`RigidBody`]; entities hold only a
//! [`BodyHandle`]. Placements flow back to entities through
//! [`MotionState`]s during [`DynamicsWorld::synchronize_motion_states`].

mod action;
mod body;
mod dynamics_world;
pub mod integrate;
mod motion_state;

pub use action::{DynamicId, DynamicPointer, EntityDynamic, SpringAction};
pub use body::{ActivationState, BodyDescriptor, BodyHandle, BodyType, RigidBody};
pub use dynamics_world::{DynamicsWorld, SharedDynamicsWorld};
pub use integrate::{integrate_transform, validate_timestep, Integrator, SemiImplicitEuler, VelocityVerlet};
pub use motion_state::{DefaultMotionState, EntityMotionState, MotionState};
