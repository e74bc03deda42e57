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
//! Rigid bodies
//!
//! Bodies are owned by the [`DynamicsWorld`](super::DynamicsWorld). Entities
//! refer to them only through an opaque [`BodyHandle`].

use crate::entity::{Transform, Velocity};
use crate::physics::MotionState;
use glam::{DQuat, DVec3};
use std::fmt;
use std::sync::Arc;

/// Opaque handle of a body inside a dynamics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyHandle(u64);

impl BodyHandle {
    /// Create a handle from a raw value
    pub fn new(raw: u64) -> Self {
        BodyHandle(raw)
    }

    /// Get the raw value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// How the solver treats a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyType {
    /// Never moves
    Static,
    /// Moved by its owner; the solver only reads its motion
    Kinematic,
    /// Moved by forces and integration
    Dynamic,
}

/// Sleep state of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationState {
    /// Simulated this step
    Active,
    /// Skipped until something wakes it
    Sleeping,
    /// Never allowed to sleep
    AlwaysActive,
}

/// Everything needed to create a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDescriptor {
    /// Solver treatment
    pub body_type: BodyType,
    /// Mass in kilograms; ignored unless dynamic
    pub mass: f64,
    /// Initial world transform
    pub transform: Transform,
    /// Initial world velocity
    pub velocity: Velocity,
    /// Gravity acceleration applied to this body
    pub gravity: DVec3,
    /// Fraction of linear velocity lost per second
    pub linear_damping: f64,
    /// Fraction of angular velocity lost per second
    pub angular_damping: f64,
}

impl BodyDescriptor {
    /// A dynamic body of the given mass
    pub fn dynamic(transform: Transform, mass: f64) -> Self {
        BodyDescriptor {
            body_type: BodyType::Dynamic,
            mass,
            transform,
            velocity: Velocity::zero(),
            gravity: DVec3::ZERO,
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }

    /// A kinematic body
    pub fn kinematic(transform: Transform) -> Self {
        BodyDescriptor {
            body_type: BodyType::Kinematic,
            mass: 0.0,
            ..Self::dynamic(transform, 0.0)
        }
    }

    /// A static body
    pub fn fixed(transform: Transform) -> Self {
        BodyDescriptor {
            body_type: BodyType::Static,
            ..Self::kinematic(transform)
        }
    }

    /// Set the initial velocity
    pub fn with_velocity(mut self, velocity: Velocity) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the gravity acceleration
    pub fn with_gravity(mut self, gravity: DVec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the damping fractions
    pub fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }
}

/// A rigid body under the solver's control
pub struct RigidBody {
    handle: BodyHandle,
    body_type: BodyType,
    transform: Transform,
    velocity: Velocity,
    interpolation_transform: Transform,
    interpolation_velocity: Velocity,
    inverse_mass: f64,
    gravity: DVec3,
    total_force: DVec3,
    linear_damping: f64,
    angular_damping: f64,
    activation: ActivationState,
    deactivation_time: f64,
    hit_fraction: f64,
    motion_state: Option<Arc<dyn MotionState>>,
}

impl RigidBody {
    /// Create a body from a descriptor
    pub fn new(handle: BodyHandle, desc: &BodyDescriptor, motion_state: Option<Arc<dyn MotionState>>) -> Self {
        let inverse_mass = match desc.body_type {
            BodyType::Dynamic if desc.mass > 0.0 && desc.mass.is_finite() => 1.0 / desc.mass,
            _ => 0.0,
        };
        let velocity = match desc.body_type {
            BodyType::Static => Velocity::zero(),
            _ => desc.velocity,
        };
        RigidBody {
            handle,
            body_type: desc.body_type,
            transform: desc.transform,
            velocity,
            interpolation_transform: desc.transform,
            interpolation_velocity: velocity,
            inverse_mass,
            gravity: desc.gravity,
            total_force: DVec3::ZERO,
            linear_damping: desc.linear_damping.clamp(0.0, 1.0),
            angular_damping: desc.angular_damping.clamp(0.0, 1.0),
            activation: ActivationState::Active,
            deactivation_time: 0.0,
            hit_fraction: 1.0,
            motion_state,
        }
    }

    /// This body's handle
    pub fn handle(&self) -> BodyHandle {
        self.handle
    }

    /// Solver treatment
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Whether the body never moves
    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    /// Whether the body is moved by its owner
    pub fn is_kinematic(&self) -> bool {
        self.body_type == BodyType::Kinematic
    }

    /// Whether the body is integrated by the solver
    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    /// Whether the body takes part in the current step
    pub fn is_active(&self) -> bool {
        matches!(self.activation, ActivationState::Active | ActivationState::AlwaysActive)
    }

    /// Current sleep state
    pub fn activation_state(&self) -> ActivationState {
        self.activation
    }

    /// Force a sleep state
    pub fn set_activation_state(&mut self, state: ActivationState) {
        self.activation = state;
        if state != ActivationState::Sleeping {
            self.deactivation_time = 0.0;
        }
    }

    /// Wake the body; static bodies stay asleep
    pub fn activate(&mut self) {
        if self.is_static() {
            return;
        }
        if self.activation == ActivationState::Sleeping {
            self.activation = ActivationState::Active;
        }
        self.deactivation_time = 0.0;
    }

    /// Current world transform
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Teleport the body, resetting its interpolation origin too
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.interpolation_transform = transform;
    }

    /// Move a kinematic body without touching its interpolation origin
    ///
    /// The next [`save_kinematic_state`](Self::save_kinematic_state) turns the
    /// move into a velocity.
    pub fn move_kinematic(&mut self, transform: Transform) {
        if !self.is_kinematic() {
            return;
        }
        self.transform = transform;
        self.activate();
    }

    /// Current velocity
    pub fn velocity(&self) -> &Velocity {
        &self.velocity
    }

    /// Replace the velocity
    pub fn set_velocity(&mut self, velocity: Velocity) {
        if self.is_static() {
            return;
        }
        self.velocity = velocity;
        self.interpolation_velocity = velocity;
    }

    /// Transform the motion state is interpolated from
    pub fn interpolation_transform(&self) -> &Transform {
        &self.interpolation_transform
    }

    /// Velocity the motion state is interpolated with
    pub fn interpolation_velocity(&self) -> &Velocity {
        &self.interpolation_velocity
    }

    /// Fraction of the last step completed before a time-of-impact stop
    pub fn hit_fraction(&self) -> f64 {
        self.hit_fraction
    }

    /// Set the time-of-impact fraction
    pub fn set_hit_fraction(&mut self, fraction: f64) {
        self.hit_fraction = fraction.clamp(0.0, 1.0);
    }

    /// Inverse mass; zero for immovable bodies
    pub fn inverse_mass(&self) -> f64 {
        self.inverse_mass
    }

    /// Mass; infinite for immovable bodies
    pub fn mass(&self) -> f64 {
        if self.inverse_mass > 0.0 {
            1.0 / self.inverse_mass
        } else {
            f64::INFINITY
        }
    }

    /// Gravity acceleration
    pub fn gravity(&self) -> DVec3 {
        self.gravity
    }

    /// Replace the gravity acceleration
    pub fn set_gravity(&mut self, gravity: DVec3) {
        self.gravity = gravity;
    }

    /// Linear and angular damping fractions
    pub fn damping(&self) -> (f64, f64) {
        (self.linear_damping, self.angular_damping)
    }

    /// Accumulate a force through the center of mass
    pub fn apply_central_force(&mut self, force: DVec3) {
        if self.is_dynamic() {
            self.total_force += force;
        }
    }

    /// Accumulate this body's weight
    pub fn apply_gravity(&mut self) {
        if self.is_dynamic() && self.inverse_mass > 0.0 {
            self.total_force += self.gravity / self.inverse_mass;
        }
    }

    /// Forces accumulated since the last clear
    pub fn total_force(&self) -> DVec3 {
        self.total_force
    }

    /// Drop accumulated forces
    pub fn clear_forces(&mut self) {
        self.total_force = DVec3::ZERO;
    }

    /// Motion state that mirrors this body to its owner
    pub fn motion_state(&self) -> Option<&Arc<dyn MotionState>> {
        self.motion_state.as_ref()
    }

    /// Commit an integrated transform as the new interpolation origin
    pub fn proceed_to_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.interpolation_transform = transform;
        self.interpolation_velocity = self.velocity;
    }

    /// Derive the kinematic velocity from the move since the last save
    ///
    /// A kinematic body is teleported by its owner; the solver needs a
    /// velocity that spans the move over `time_step`.
    pub fn save_kinematic_state(&mut self, time_step: f64) {
        if time_step != 0.0 {
            let from = self.interpolation_transform;
            let linear = (self.transform.translation - from.translation) / time_step;
            let delta = (self.transform.rotation * from.rotation.inverse()).normalize();
            let angular = shortest_arc(delta).to_scaled_axis() / time_step;
            self.velocity = Velocity::new(linear, angular);
            self.interpolation_transform = self.transform;
            self.interpolation_velocity = self.velocity;
        }
    }

    /// Advance the sleep timer and put the body to sleep once it has been
    /// slow for long enough
    pub fn update_deactivation(&mut self, time_step: f64, linear_threshold: f64, angular_threshold: f64, time_to_sleep: f64) {
        if self.is_static() || self.activation != ActivationState::Active {
            return;
        }
        let slow = self.velocity.linear.length_squared() < linear_threshold * linear_threshold
            && self.velocity.angular.length_squared() < angular_threshold * angular_threshold;
        if !slow {
            self.deactivation_time = 0.0;
            return;
        }
        self.deactivation_time += time_step;
        if self.deactivation_time >= time_to_sleep {
            self.activation = ActivationState::Sleeping;
            self.velocity = Velocity::zero();
            self.interpolation_velocity = Velocity::zero();
        }
    }
}

impl fmt::Debug for RigidBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RigidBody")
            .field("handle", &self.handle)
            .field("body_type", &self.body_type)
            .field("transform", &self.transform)
            .field("velocity", &self.velocity)
            .field("activation", &self.activation)
            .field("has_motion_state", &self.motion_state.is_some())
            .finish()
    }
}

fn shortest_arc(rotation: DQuat) -> DQuat {
    if rotation.w < 0.0 {
        -rotation
    } else {
        rotation
    }
}
