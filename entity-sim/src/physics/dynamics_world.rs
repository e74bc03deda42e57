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
//! Deterministic substepping dynamics world
//!
//! # Stepping
//!
//! In fixed mode (`max_sub_steps > 0`) elapsed time accumulates in a carry
//! buffer and is consumed in whole `fixed_time_step` substeps. The number of
//! substeps per call is clamped; time owed beyond the clamp is dropped so a
//! long stall cannot trigger an unbounded catch-up. In variable mode
//! (`max_sub_steps == 0`) the whole delta is one substep.
//!
//! # Synchronization
//!
//! Stepping never touches motion states. The caller invokes
//! [`DynamicsWorld::synchronize_motion_states`] once per frame, at a point
//! where it already holds whatever lock guards the consumer-visible state.

use crate::config::PhysicsConfig;
use crate::entity::Velocity;
use crate::id_allocator::IdAllocator;
use crate::physics::integrate::{integrate_transform, Integrator, SemiImplicitEuler};
use crate::physics::{BodyDescriptor, BodyHandle, DynamicId, DynamicPointer, MotionState, RigidBody};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace, trace_span, warn};

/// Dynamics world shared between the stepping thread and its owners
pub type SharedDynamicsWorld = Arc<Mutex<DynamicsWorld>>;

struct AttachedAction {
    body: BodyHandle,
    action: DynamicPointer,
}

/// Rigid-body world with fixed/variable substepping and deferred
/// motion-state synchronization
pub struct DynamicsWorld {
    config: PhysicsConfig,
    integrator: Box<dyn Integrator>,
    bodies: BTreeMap<BodyHandle, RigidBody>,
    handles: IdAllocator,
    actions: BTreeMap<DynamicId, AttachedAction>,
    local_time: f64,
    fixed_time_step: f64,
    num_substeps: u64,
    active: BTreeSet<BodyHandle>,
    last_active: BTreeSet<BodyHandle>,
    changed_states: Vec<Arc<dyn MotionState>>,
    activated_states: Vec<Arc<dyn MotionState>>,
    deactivated_states: Vec<Arc<dyn MotionState>>,
}

impl DynamicsWorld {
    /// Create an empty world
    pub fn new(config: PhysicsConfig) -> Self {
        DynamicsWorld {
            fixed_time_step: config.fixed_substep,
            config,
            integrator: Box::new(SemiImplicitEuler),
            bodies: BTreeMap::new(),
            handles: IdAllocator::new(1),
            actions: BTreeMap::new(),
            local_time: 0.0,
            num_substeps: 0,
            active: BTreeSet::new(),
            last_active: BTreeSet::new(),
            changed_states: Vec::new(),
            activated_states: Vec::new(),
            deactivated_states: Vec::new(),
        }
    }

    /// Replace the integrator
    pub fn with_integrator(mut self, integrator: Box<dyn Integrator>) -> Self {
        self.integrator = integrator;
        self
    }

    /// Wrap in a mutex for sharing
    pub fn shared(self) -> SharedDynamicsWorld {
        Arc::new(Mutex::new(self))
    }

    /// Configuration in use
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Name of the integrator in use
    pub fn integrator_name(&self) -> &str {
        self.integrator.name()
    }

    /// Interpolate motion states one fixed step in the past
    pub fn set_latency_interpolation(&mut self, enabled: bool) {
        self.config.latency_interpolation = enabled;
    }

    /// Synchronize every body instead of only active ones
    pub fn set_synchronize_all_motion_states(&mut self, enabled: bool) {
        self.config.synchronize_all_motion_states = enabled;
    }

    /// Total substeps taken since creation
    pub fn num_substeps(&self) -> u64 {
        self.num_substeps
    }

    /// Time carried into the next step (fixed mode) or the last delta
    /// (variable mode)
    pub fn local_time(&self) -> f64 {
        self.local_time
    }

    /// Fixed step used by the last call; zero after a variable step
    pub fn fixed_time_step(&self) -> f64 {
        self.fixed_time_step
    }

    /// Create a body and return its handle
    pub fn add_body(&mut self, desc: &BodyDescriptor, motion_state: Option<Arc<dyn MotionState>>) -> BodyHandle {
        let handle = BodyHandle::new(self.handles.allocate());
        self.bodies.insert(handle, RigidBody::new(handle, desc, motion_state));
        trace!(body = %handle, body_type = ?desc.body_type, "added body");
        handle
    }

    /// Destroy a body, detaching every action that acts on it
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let body = self.bodies.remove(&handle)?;
        self.actions.retain(|_, attached| attached.body != handle);
        self.active.remove(&handle);
        self.last_active.remove(&handle);
        self.handles.release(handle.raw());
        trace!(body = %handle, "removed body");
        Some(body)
    }

    /// Look up a body
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(&handle)
    }

    /// Look up a body for modification
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(&handle)
    }

    /// Number of bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Attach an action to a body; hands the action back if the body does
    /// not exist
    pub fn add_action(&mut self, body: BodyHandle, action: DynamicPointer) -> Result<(), DynamicPointer> {
        if !self.bodies.contains_key(&body) {
            return Err(action);
        }
        let id = action.id();
        if self.actions.insert(id, AttachedAction { body, action }).is_some() {
            debug!(action = %id, "replaced action");
        }
        Ok(())
    }

    /// Detach an action
    pub fn remove_action(&mut self, id: DynamicId) -> Option<DynamicPointer> {
        self.actions.remove(&id).map(|attached| attached.action)
    }

    /// Whether an action is attached
    pub fn has_action(&self, id: DynamicId) -> bool {
        self.actions.contains_key(&id)
    }

    /// Number of attached actions
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Step using the configured fixed substep and clamp
    pub fn step_simulation(&mut self, time_step: f64) -> u32 {
        let (max_sub_steps, fixed) = (self.config.max_substeps, self.config.fixed_substep);
        self.step_with_substep_callback(time_step, max_sub_steps, fixed, || {})
    }

    /// Advance the world by `time_step` seconds
    ///
    /// `callback` runs after every substep. Returns the number of substeps
    /// actually taken, after clamping to `max_sub_steps`.
    pub fn step_with_substep_callback<F>(
        &mut self,
        time_step: f64,
        mut max_sub_steps: u32,
        mut fixed_time_step: f64,
        mut callback: F,
    ) -> u32
    where
        F: FnMut(),
    {
        if !time_step.is_finite() || time_step < 0.0 {
            warn!(time_step, "ignoring invalid time step");
            return 0;
        }
        let _span = trace_span!("step_simulation", time_step, max_sub_steps).entered();

        let mut sub_steps: u32 = 0;
        if max_sub_steps > 0 {
            if !(fixed_time_step > 0.0 && fixed_time_step.is_finite()) {
                warn!(fixed_time_step, "ignoring invalid fixed substep");
                return 0;
            }
            self.fixed_time_step = fixed_time_step;
            self.local_time += time_step;
            if self.local_time >= fixed_time_step {
                let owed = (self.local_time / fixed_time_step).floor();
                self.local_time -= owed * fixed_time_step;
                sub_steps = if owed >= u32::MAX as f64 { u32::MAX } else { owed as u32 };
            }
        } else {
            fixed_time_step = time_step;
            self.local_time = if self.config.latency_interpolation { 0.0 } else { time_step };
            self.fixed_time_step = 0.0;
            if time_step.abs() < f64::EPSILON {
                max_sub_steps = 0;
            } else {
                sub_steps = 1;
                max_sub_steps = 1;
            }
        }

        let clamped = sub_steps.min(max_sub_steps);
        if clamped > 0 {
            if clamped < sub_steps {
                debug!(owed = sub_steps, taken = clamped, "dropping simulation time beyond substep clamp");
            }
            self.num_substeps += u64::from(clamped);
            self.save_kinematic_state(fixed_time_step * f64::from(clamped));
            self.apply_gravity();
            for _ in 0..clamped {
                self.internal_single_step(fixed_time_step);
                callback();
            }
        }
        self.clear_forces();
        clamped
    }

    fn save_kinematic_state(&mut self, time_step: f64) {
        for body in self.bodies.values_mut() {
            if !body.is_kinematic() || !body.is_active() {
                continue;
            }
            let target = body.motion_state().and_then(|state| state.kinematic_target(time_step));
            if let Some(target) = target {
                body.move_kinematic(target);
            }
            body.save_kinematic_state(time_step);
        }
    }

    fn apply_gravity(&mut self) {
        for body in self.bodies.values_mut() {
            if body.is_active() {
                body.apply_gravity();
            }
        }
    }

    fn clear_forces(&mut self) {
        for body in self.bodies.values_mut() {
            body.clear_forces();
        }
    }

    fn internal_single_step(&mut self, dt: f64) {
        for attached in self.actions.values_mut() {
            if let Some(body) = self.bodies.get_mut(&attached.body) {
                attached.action.update_action(body, dt);
            }
        }

        let config = &self.config;
        for body in self.bodies.values_mut() {
            if body.is_dynamic() && body.is_active() {
                self.integrator.integrate(body, dt);
            }
            body.update_deactivation(
                dt,
                config.linear_sleep_threshold,
                config.angular_sleep_threshold,
                config.time_to_sleep,
            );
        }
    }

    /// Push body placements into their motion states
    ///
    /// With `force_all` (or when configured to), every body with a motion
    /// state is synchronized. Otherwise only active non-static bodies are,
    /// and the activated/deactivated sets are recomputed against the
    /// previous call.
    pub fn synchronize_motion_states(&mut self, force_all: bool) {
        let _span = trace_span!("sync_motion_states", force_all).entered();
        self.changed_states.clear();

        if force_all || self.config.synchronize_all_motion_states {
            for body in self.bodies.values() {
                if let Some(state) = body.motion_state() {
                    self.synchronize_single(body, state);
                    self.changed_states.push(state.clone());
                }
            }
            return;
        }

        self.active.clear();
        self.activated_states.clear();
        self.deactivated_states.clear();
        for (handle, body) in &self.bodies {
            if body.is_static() {
                continue;
            }
            let Some(state) = body.motion_state() else {
                continue;
            };
            if body.is_active() {
                self.synchronize_single(body, state);
                self.changed_states.push(state.clone());
                self.active.insert(*handle);
                if !self.last_active.contains(handle) {
                    self.activated_states.push(state.clone());
                }
            } else if self.last_active.contains(handle) {
                self.deactivated_states.push(state.clone());
            }
        }
        mem::swap(&mut self.active, &mut self.last_active);
    }

    fn synchronize_single(&self, body: &RigidBody, state: &Arc<dyn MotionState>) {
        if body.is_static() {
            return;
        }
        if body.is_kinematic() {
            if state.has_internal_kinematic_changes() {
                state.clear_internal_kinematic_changes();
                state.set_world_transform(body.transform(), body.velocity());
            }
            return;
        }
        let window = if self.config.latency_interpolation && self.fixed_time_step != 0.0 {
            self.local_time - self.fixed_time_step
        } else {
            self.local_time * body.hit_fraction()
        };
        let velocity: &Velocity = body.interpolation_velocity();
        let interpolated = integrate_transform(body.interpolation_transform(), velocity.linear, velocity.angular, window);
        state.set_world_transform(&interpolated, body.velocity());
    }

    /// Motion states written by the last synchronization
    pub fn changed_motion_states(&self) -> &[Arc<dyn MotionState>] {
        &self.changed_states
    }

    /// Motion states whose bodies became active since the previous
    /// active-only synchronization
    pub fn activated_motion_states(&self) -> &[Arc<dyn MotionState>] {
        &self.activated_states
    }

    /// Motion states whose bodies were active at the previous active-only
    /// synchronization and are asleep now
    pub fn deactivated_motion_states(&self) -> &[Arc<dyn MotionState>] {
        &self.deactivated_states
    }

    /// Bodies found active by the last active-only synchronization
    pub fn active_bodies(&self) -> &BTreeSet<BodyHandle> {
        // Swapped at the end of the pass, so this holds the latest set.
        &self.last_active
    }
}

impl fmt::Debug for DynamicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicsWorld")
            .field("integrator", &self.integrator.name())
            .field("bodies", &self.bodies.len())
            .field("actions", &self.actions.len())
            .field("local_time", &self.local_time)
            .field("num_substeps", &self.num_substeps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Transform;
    use crate::physics::{ActivationState, DefaultMotionState, SpringAction};
    use crate::entity::EntityId;
    use crate::physics::action::EntityDynamic;
    use glam::DVec3;

    fn world() -> DynamicsWorld {
        DynamicsWorld::new(PhysicsConfig::new(0.25, 10))
    }

    #[test]
    fn test_fixed_step_carries_remainder() {
        let mut world = world();
        let taken = world.step_with_substep_callback(0.625, 10, 0.25, || {});
        assert_eq!(taken, 2);
        assert_eq!(world.local_time(), 0.125);
        assert_eq!(world.num_substeps(), 2);
    }

    #[test]
    fn test_clamp_drops_backlog() {
        let mut world = world();
        let mut calls = 0;
        let taken = world.step_with_substep_callback(250.0, 4, 0.25, || calls += 1);
        assert_eq!(taken, 4);
        assert_eq!(calls, 4);
        assert_eq!(world.local_time(), 0.0);

        // The dropped time is gone, not owed.
        assert_eq!(world.step_with_substep_callback(0.125, 4, 0.25, || {}), 0);
    }

    #[test]
    fn test_variable_step() {
        let mut world = world();
        assert_eq!(world.step_with_substep_callback(0.1, 0, 0.25, || {}), 1);
        assert_eq!(world.fixed_time_step(), 0.0);
        assert_eq!(world.local_time(), 0.1);
        assert_eq!(world.step_with_substep_callback(0.0, 0, 0.25, || {}), 0);
        assert_eq!(world.num_substeps(), 1);
    }

    #[test]
    fn test_invalid_time_step_is_ignored() {
        let mut world = world();
        assert_eq!(world.step_with_substep_callback(f64::NAN, 4, 0.25, || {}), 0);
        assert_eq!(world.step_with_substep_callback(-1.0, 4, 0.25, || {}), 0);
        assert_eq!(world.step_with_substep_callback(1.0, 4, 0.0, || {}), 0);
        assert_eq!(world.num_substeps(), 0);
    }

    #[test]
    fn test_gravity_integrated_per_substep() {
        let mut world = world();
        let desc = BodyDescriptor::dynamic(Transform::IDENTITY, 1.0).with_gravity(DVec3::new(0.0, -8.0, 0.0));
        let handle = world.add_body(&desc, None);
        world.step_simulation(0.5);
        let body = world.body(handle).unwrap();
        assert!((body.velocity().linear.y + 4.0).abs() < 1e-12);
        assert_eq!(body.total_force(), DVec3::ZERO);
    }

    #[test]
    fn test_sync_reports_activation_changes() {
        let mut world = DynamicsWorld::new(PhysicsConfig::new(0.25, 10).with_sleep_thresholds(0.8, 1.0, 0.5));
        let state = Arc::new(DefaultMotionState::new(Transform::IDENTITY));
        let handle = world.add_body(&BodyDescriptor::dynamic(Transform::IDENTITY, 1.0), Some(state.clone()));

        world.synchronize_motion_states(false);
        assert_eq!(world.changed_motion_states().len(), 1);
        assert_eq!(world.activated_motion_states().len(), 1);
        assert!(world.active_bodies().contains(&handle));

        world.step_simulation(0.5);
        assert_eq!(world.body(handle).unwrap().activation_state(), ActivationState::Sleeping);
        world.synchronize_motion_states(false);
        assert!(world.changed_motion_states().is_empty());
        assert_eq!(world.deactivated_motion_states().len(), 1);

        world.synchronize_motion_states(false);
        assert!(world.deactivated_motion_states().is_empty());

        world.synchronize_motion_states(true);
        assert_eq!(world.changed_motion_states().len(), 1);
    }

    #[test]
    fn test_remove_body_detaches_actions() {
        let mut world = world();
        let handle = world.add_body(&BodyDescriptor::dynamic(Transform::IDENTITY, 1.0), None);
        let spring = SpringAction::new(EntityId::new(1), Transform::IDENTITY, 1.0);
        let id = spring.id();
        assert!(world.add_action(handle, Box::new(spring)).is_ok());
        assert!(world.has_action(id));

        world.remove_body(handle);
        assert!(!world.has_action(id));
        assert!(world.add_action(handle, Box::new(SpringAction::new(EntityId::new(1), Transform::IDENTITY, 1.0))).is_err());
    }
}
