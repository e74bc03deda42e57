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
//! Substep stepping and motion-state synchronization tests
//!
//! Fixed steps are powers of two so carries are exact in f64.

use entity_sim::config::PhysicsConfig;
use entity_sim::entity::{EntityId, Transform, Velocity};
use entity_sim::physics::{
    BodyDescriptor, DefaultMotionState, DynamicsWorld, EntityDynamic, MotionState, SpringAction, VelocityVerlet,
};
use glam::DVec3;
use std::sync::Arc;

const FIXED: f64 = 0.25;

fn world() -> DynamicsWorld {
    DynamicsWorld::new(PhysicsConfig::new(FIXED, 10))
}

#[test]
fn test_two_and_a_half_steps_carry_half() {
    let mut world = world();
    let mut calls = 0;
    let taken = world.step_with_substep_callback(2.5 * FIXED, 10, FIXED, || calls += 1);
    assert_eq!(taken, 2);
    assert_eq!(calls, 2);
    assert_eq!(world.local_time(), 0.5 * FIXED);

    // The carried half step completes on the next call.
    assert_eq!(world.step_with_substep_callback(0.5 * FIXED, 10, FIXED, || {}), 1);
    assert_eq!(world.local_time(), 0.0);
}

#[test]
fn test_one_and_a_half_steps_alternate() {
    let mut world = world();
    let taken: Vec<u32> = (0..8)
        .map(|_| world.step_with_substep_callback(1.5 * FIXED, 10, FIXED, || {}))
        .collect();
    assert_eq!(taken, vec![1, 2, 1, 2, 1, 2, 1, 2]);
    assert_eq!(world.num_substeps(), 12);
}

#[test]
fn test_clamp_bounds_backlog() {
    let mut world = world();
    let mut calls = 0;
    let taken = world.step_with_substep_callback(1000.0 * FIXED, 4, FIXED, || calls += 1);
    assert_eq!(taken, 4);
    assert_eq!(calls, 4);
    assert_eq!(world.num_substeps(), 4);

    // Backlog beyond the clamp was dropped.
    assert_eq!(world.step_with_substep_callback(0.5 * FIXED, 4, FIXED, || {}), 0);
}

#[test]
fn test_variable_mode_single_step() {
    let mut world = world();
    let mut calls = 0;
    assert_eq!(world.step_with_substep_callback(0.37, 0, FIXED, || calls += 1), 1);
    assert_eq!(world.step_with_substep_callback(0.0, 0, FIXED, || calls += 1), 0);
    assert_eq!(calls, 1);
    assert_eq!(world.fixed_time_step(), 0.0);
}

#[test]
fn test_callback_sees_each_substep() {
    let mut world = world();
    let state = Arc::new(DefaultMotionState::new(Transform::IDENTITY));
    let desc = BodyDescriptor::dynamic(Transform::IDENTITY, 1.0).with_velocity(Velocity::linear(DVec3::new(4.0, 0.0, 0.0)));
    world.add_body(&desc, Some(state.clone()));

    let mut seen = Vec::new();
    let mut index = 0;
    let taken = world.step_with_substep_callback(3.0 * FIXED, 10, FIXED, || {
        seen.push(index);
        index += 1;
    });
    assert_eq!(taken, 3);
    assert_eq!(seen, vec![0, 1, 2]);
    // Nothing is pushed to motion states until synchronization.
    assert_eq!(state.update_count(), 0);

    world.synchronize_motion_states(false);
    assert_eq!(state.update_count(), 1);
    assert!((state.transform().translation.x - 3.0).abs() < 1e-12);
}

#[test]
fn test_sync_interpolates_carried_time() {
    let mut world = world();
    let state = Arc::new(DefaultMotionState::new(Transform::IDENTITY));
    let desc = BodyDescriptor::dynamic(Transform::IDENTITY, 1.0).with_velocity(Velocity::linear(DVec3::new(4.0, 0.0, 0.0)));
    let handle = world.add_body(&desc, Some(state.clone()));

    world.step_with_substep_callback(2.5 * FIXED, 10, FIXED, || {});
    world.synchronize_motion_states(false);
    // Two whole substeps plus half a step of extrapolation.
    assert!((world.body(handle).unwrap().transform().translation.x - 2.0).abs() < 1e-12);
    assert!((state.transform().translation.x - 2.5).abs() < 1e-12);
}

#[test]
fn test_latency_interpolation_lags_one_step() {
    let mut world = DynamicsWorld::new(PhysicsConfig::new(FIXED, 10).with_latency_interpolation());
    let state = Arc::new(DefaultMotionState::new(Transform::IDENTITY));
    let desc = BodyDescriptor::dynamic(Transform::IDENTITY, 1.0).with_velocity(Velocity::linear(DVec3::new(4.0, 0.0, 0.0)));
    world.add_body(&desc, Some(state.clone()));

    world.step_with_substep_callback(2.5 * FIXED, 10, FIXED, || {});
    world.synchronize_motion_states(false);
    // Window is local_time - fixed = -0.5 step.
    assert!((state.transform().translation.x - 1.5).abs() < 1e-12);
}

#[test]
fn test_kinematic_sync_only_on_internal_change() {
    let mut world = world();
    let state = Arc::new(DefaultMotionState::new(Transform::IDENTITY));
    let handle = world.add_body(&BodyDescriptor::kinematic(Transform::IDENTITY), Some(state.clone()));

    world.step_with_substep_callback(FIXED, 10, FIXED, || {});
    world.synchronize_motion_states(false);
    assert_eq!(state.update_count(), 0);

    let target = Transform::from_translation(DVec3::new(0.0, 2.0, 0.0));
    let spring = SpringAction::new(EntityId::new(1), target, 1.0);
    assert!(world.add_action(handle, Box::new(spring)).is_ok());
    world.step_with_substep_callback(FIXED, 10, FIXED, || {});
    world.synchronize_motion_states(false);
    assert_eq!(state.update_count(), 1);
    assert_eq!(state.transform(), target);
    assert!(!state.has_internal_kinematic_changes());
}

#[test]
fn test_kinematic_target_read_once_per_batch() {
    let mut world = world();
    let state = Arc::new(DefaultMotionState::new(Transform::IDENTITY));
    let handle = world.add_body(&BodyDescriptor::kinematic(Transform::IDENTITY), Some(state.clone()));

    state.set_kinematic_target(Transform::from_translation(DVec3::new(1.0, 0.0, 0.0)));
    world.step_with_substep_callback(4.0 * FIXED, 10, FIXED, || {});
    let body = world.body(handle).unwrap();
    assert_eq!(body.transform().translation, DVec3::new(1.0, 0.0, 0.0));
    // The move spans the whole four-substep batch.
    assert!((body.velocity().linear.x - 1.0).abs() < 1e-12);
}

#[test]
fn test_sleeping_body_reported_once() {
    let config = PhysicsConfig::new(FIXED, 10).with_sleep_thresholds(0.8, 1.0, 1.0);
    let mut world = DynamicsWorld::new(config);
    let resting = Arc::new(DefaultMotionState::new(Transform::IDENTITY));
    let moving = Arc::new(DefaultMotionState::new(Transform::IDENTITY));
    world.add_body(&BodyDescriptor::dynamic(Transform::IDENTITY, 1.0), Some(resting.clone()));
    world.add_body(
        &BodyDescriptor::dynamic(Transform::IDENTITY, 1.0).with_velocity(Velocity::linear(DVec3::new(5.0, 0.0, 0.0))),
        Some(moving.clone()),
    );

    world.synchronize_motion_states(false);
    assert_eq!(world.activated_motion_states().len(), 2);

    world.step_with_substep_callback(4.0 * FIXED, 10, FIXED, || {});
    world.synchronize_motion_states(false);
    assert_eq!(world.changed_motion_states().len(), 1);
    assert!(world.activated_motion_states().is_empty());
    let deactivated = world.deactivated_motion_states();
    assert_eq!(deactivated.len(), 1);
    let resting_dyn: Arc<dyn MotionState> = resting.clone();
    assert!(Arc::ptr_eq(&deactivated[0], &resting_dyn));

    world.step_with_substep_callback(FIXED, 10, FIXED, || {});
    world.synchronize_motion_states(false);
    assert!(world.deactivated_motion_states().is_empty());
}

#[test]
fn test_verlet_world_matches_free_fall() {
    let mut world = DynamicsWorld::new(PhysicsConfig::new(FIXED, 10)).with_integrator(Box::new(VelocityVerlet));
    assert_eq!(world.integrator_name(), "Velocity Verlet");
    let desc = BodyDescriptor::dynamic(Transform::IDENTITY, 3.0).with_gravity(DVec3::new(0.0, -8.0, 0.0));
    let handle = world.add_body(&desc, None);
    for _ in 0..4 {
        world.step_simulation(FIXED);
    }
    let body = world.body(handle).unwrap();
    assert!((body.transform().translation.y + 4.0).abs() < 1e-12);
}

#[test]
fn test_spring_action_pulls_dynamic_body() {
    let mut world = world();
    let handle = world.add_body(&BodyDescriptor::dynamic(Transform::IDENTITY, 1.0), None);
    let spring = SpringAction::new(EntityId::new(1), Transform::from_translation(DVec3::new(1.0, 0.0, 0.0)), FIXED);
    let id = spring.id();
    assert!(world.add_action(handle, Box::new(spring)).is_ok());

    world.step_with_substep_callback(FIXED, 10, FIXED, || {});
    let x = world.body(handle).unwrap().transform().translation.x;
    assert!((x - 1.0).abs() < 1e-12);

    assert!(world.remove_action(id).is_some());
    assert_eq!(world.action_count(), 0);
}
