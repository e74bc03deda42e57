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
//! Concrete entity record
//!
//! [`EntityItem`] is the one concrete [`SimEntity`]. The handful of entity
//! kinds differ only in what their update hook does, so they are a closed
//! [`EntityKind`] enum instead of separate types.

use super::{
    DirtyFlags, EntityId, NestableType, ParentLink, SimEntity, Transform, Velocity, MIN_ANGULAR_SPEED_SQUARED,
    MIN_LINEAR_SPEED_SQUARED,
};
use crate::physics::{integrate_transform, BodyDescriptor, BodyHandle};
use crate::spatial::AaCube;
use crate::time::{elapsed_seconds, seconds_to_usecs, Timestamp, IMMORTAL};
use glam::{DQuat, DVec3};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Longest parent chain that is followed before giving up
pub const MAX_PARENTING_CHAIN_SIZE: usize = 30;

/// Squared acceleration below which a slow entity is allowed to come to rest
const MIN_ACCELERATION_SQUARED: f64 = 1.0e-4;

/// Entity kinds and their per-kind update state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityKind {
    /// Static or moving primitive
    Shape,
    /// Point or spot light
    Light,
    /// Animated model
    Model {
        /// Playback rate; zero pauses the animation
        animation_fps: f64,
        /// Current animation frame
        frame: f64,
    },
    /// Particle emitter
    ParticleEffect {
        /// Particles per second; zero stops emission
        emit_rate: f64,
        /// Fractional particle owed from previous updates
        carry: f64,
        /// Particles emitted so far
        emitted: u64,
    },
}

impl EntityKind {
    /// An animated model playing at `animation_fps`
    pub fn model(animation_fps: f64) -> Self {
        EntityKind::Model {
            animation_fps,
            frame: 0.0,
        }
    }

    /// A particle emitter emitting `emit_rate` particles per second
    pub fn particle_effect(emit_rate: f64) -> Self {
        EntityKind::ParticleEffect {
            emit_rate,
            carry: 0.0,
            emitted: 0,
        }
    }

    fn needs_update(&self) -> bool {
        match *self {
            EntityKind::Model { animation_fps, .. } => animation_fps > 0.0,
            EntityKind::ParticleEffect { emit_rate, .. } => emit_rate > 0.0,
            EntityKind::Shape | EntityKind::Light => false,
        }
    }

    fn advance(&mut self, dt: f64) {
        match self {
            EntityKind::Model { animation_fps, frame } => {
                *frame += *animation_fps * dt;
            }
            EntityKind::ParticleEffect {
                emit_rate,
                carry,
                emitted,
            } => {
                *carry += *emit_rate * dt;
                let whole = carry.floor();
                *carry -= whole;
                *emitted += whole as u64;
            }
            EntityKind::Shape | EntityKind::Light => {}
        }
    }
}

/// How an entity participates in rigid-body dynamics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PhysicsMotion {
    /// Moved by local extrapolation or not at all
    #[default]
    NonPhysical,
    /// Has a kinematic body that follows the entity
    Kinematic,
    /// Has a dynamic body the entity follows
    Dynamic,
}

#[derive(Debug, Clone)]
struct EntityState {
    kind: EntityKind,
    local: Transform,
    velocity: Velocity,
    gravity: DVec3,
    damping: f64,
    angular_damping: f64,
    dimensions: DVec3,
    mass: f64,
    lifetime: Option<f64>,
    parent: Option<ParentLink>,
    motion: PhysicsMotion,
    physics: Option<BodyHandle>,
    last_simulated: Timestamp,
    last_updated: Timestamp,
}

/// A simulated world object
///
/// Mutable state sits behind an `RwLock` so that network or script threads
/// can edit an entity while the simulation thread reads it. Setters raise
/// [`DirtyFlags`]; the owner then calls `change_entity` so the simulation
/// can reconcile.
///
/// # Examples
///
/// ```
/// use entity_sim::entity::{EntityId, EntityItem, SimEntity};
/// use glam::DVec3;
///
/// let ball = EntityItem::shape(EntityId::new(7), 0)
///     .with_position(DVec3::new(1.0, 2.0, 3.0))
///     .with_lifetime(10.0);
/// assert!(ball.is_mortal());
/// assert_eq!(ball.expiry(), 10_000_000);
/// ```
#[derive(Debug)]
pub struct EntityItem {
    id: EntityId,
    created: Timestamp,
    state: RwLock<EntityState>,
    dirty: AtomicU32,
    simulated: AtomicBool,
    dead: AtomicBool,
}

impl EntityItem {
    /// Create an entity of the given kind, created at `now`
    pub fn new(id: EntityId, kind: EntityKind, now: Timestamp) -> Self {
        EntityItem {
            id,
            created: now,
            state: RwLock::new(EntityState {
                kind,
                local: Transform::IDENTITY,
                velocity: Velocity::zero(),
                gravity: DVec3::ZERO,
                damping: 0.0,
                angular_damping: 0.0,
                dimensions: DVec3::splat(0.1),
                mass: 1.0,
                lifetime: None,
                parent: None,
                motion: PhysicsMotion::NonPhysical,
                physics: None,
                last_simulated: now,
                last_updated: now,
            }),
            dirty: AtomicU32::new(DirtyFlags::NONE.bits()),
            simulated: AtomicBool::new(false),
            dead: AtomicBool::new(false),
        }
    }

    /// Create a shape entity
    pub fn shape(id: EntityId, now: Timestamp) -> Self {
        Self::new(id, EntityKind::Shape, now)
    }

    /// Wrap in an `Arc` for sharing with the simulation
    pub fn shared(self) -> Arc<EntityItem> {
        Arc::new(self)
    }

    /// Set the local position
    pub fn with_position(self, position: DVec3) -> Self {
        self.write().local.translation = position;
        self
    }

    /// Set the local rotation
    pub fn with_rotation(self, rotation: DQuat) -> Self {
        self.write().local.rotation = rotation;
        self
    }

    /// Set the local velocity
    pub fn with_velocity(self, velocity: Velocity) -> Self {
        self.write().velocity = velocity;
        self
    }

    /// Set the constant acceleration
    pub fn with_gravity(self, gravity: DVec3) -> Self {
        self.write().gravity = gravity;
        self
    }

    /// Set linear and angular damping
    pub fn with_damping(self, damping: f64, angular_damping: f64) -> Self {
        {
            let mut state = self.write();
            state.damping = damping.clamp(0.0, 1.0);
            state.angular_damping = angular_damping.clamp(0.0, 1.0);
        }
        self
    }

    /// Set the bounding dimensions
    pub fn with_dimensions(self, dimensions: DVec3) -> Self {
        self.write().dimensions = dimensions;
        self
    }

    /// Set a lifetime in seconds from creation
    pub fn with_lifetime(self, seconds: f64) -> Self {
        self.write().lifetime = Some(seconds);
        self
    }

    /// Attach to a parent
    pub fn with_parent(self, parent: ParentLink) -> Self {
        self.write().parent = Some(parent);
        self
    }

    /// Request a rigid body
    pub fn with_physics(self, motion: PhysicsMotion) -> Self {
        self.write().motion = motion;
        self
    }

    /// Set the mass used for a dynamic body
    pub fn with_mass(self, mass: f64) -> Self {
        self.write().mass = mass;
        self
    }

    /// Creation time
    pub fn created(&self) -> Timestamp {
        self.created
    }

    /// Current kind and kind-specific state
    pub fn kind(&self) -> EntityKind {
        self.read().kind
    }

    /// Lifetime in seconds, if mortal
    pub fn lifetime(&self) -> Option<f64> {
        self.read().lifetime
    }

    /// Requested physics participation
    pub fn motion(&self) -> PhysicsMotion {
        self.read().motion
    }

    /// Time of the last kinematic step
    pub fn last_simulated(&self) -> Timestamp {
        self.read().last_simulated
    }

    /// Move to a new local position
    pub fn set_position(&self, position: DVec3) {
        self.write().local.translation = position;
        self.mark_dirty(DirtyFlags::POSITION);
    }

    /// Rotate to a new local rotation
    pub fn set_rotation(&self, rotation: DQuat) {
        self.write().local.rotation = rotation;
        self.mark_dirty(DirtyFlags::ROTATION);
    }

    /// Replace the local velocity
    pub fn set_velocity(&self, velocity: Velocity) {
        self.write().velocity = velocity;
        self.mark_dirty(DirtyFlags::VELOCITIES);
    }

    /// Replace the constant acceleration
    pub fn set_gravity(&self, gravity: DVec3) {
        self.write().gravity = gravity;
        self.mark_dirty(DirtyFlags::MASS_PROPERTIES);
    }

    /// Replace the bounding dimensions
    pub fn set_dimensions(&self, dimensions: DVec3) {
        self.write().dimensions = dimensions;
        self.mark_dirty(DirtyFlags::SHAPE | DirtyFlags::POSITION);
    }

    /// Replace the lifetime; `None` makes the entity immortal
    pub fn set_lifetime(&self, seconds: Option<f64>) {
        self.write().lifetime = seconds;
        self.mark_dirty(DirtyFlags::LIFETIME);
    }

    /// Replace the parent
    pub fn set_parent(&self, parent: Option<ParentLink>) {
        self.write().parent = parent;
        self.mark_dirty(DirtyFlags::PARENT | DirtyFlags::POSITION);
    }

    /// Switch physics participation
    pub fn set_motion(&self, motion: PhysicsMotion) {
        self.write().motion = motion;
        self.mark_dirty(DirtyFlags::MOTION_TYPE);
    }

    /// Replace the kind, e.g. to start or stop an animation
    pub fn set_kind(&self, kind: EntityKind) {
        self.write().kind = kind;
    }

    /// Raise dirty flags
    pub fn mark_dirty(&self, flags: DirtyFlags) {
        self.dirty.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    fn read(&self) -> RwLockReadGuard<'_, EntityState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EntityState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolve the world frame of the object `link` points at
///
/// Walks up at most [`MAX_PARENTING_CHAIN_SIZE`] entity links. Returns `None`
/// when a link dangles, an avatar has no known placement, or the chain is too
/// deep (which also catches cycles).
fn resolve_parent_frame(mut link: Option<ParentLink>) -> Option<(Transform, Velocity)> {
    let mut chain = Vec::new();
    let mut frame = (Transform::IDENTITY, Velocity::zero());
    loop {
        match link {
            None => break,
            Some(ParentLink::Avatar(weak)) => {
                frame = (weak.upgrade()?.transform()?, Velocity::zero());
                break;
            }
            Some(ParentLink::Entity(weak)) => {
                if chain.len() >= MAX_PARENTING_CHAIN_SIZE {
                    return None;
                }
                let parent = weak.upgrade()?;
                chain.push((parent.local_transform(), parent.local_velocity()));
                link = parent.parent_link();
            }
        }
    }
    for (local, velocity) in chain.iter().rev() {
        frame = compose_frame(&frame, local, velocity);
    }
    Some(frame)
}

fn compose_frame(parent: &(Transform, Velocity), local: &Transform, velocity: &Velocity) -> (Transform, Velocity) {
    let (parent_transform, parent_velocity) = parent;
    let offset = parent_transform.rotation * local.translation;
    (
        parent_transform.compose(local),
        Velocity::new(
            parent_velocity.linear + parent_velocity.angular.cross(offset) + parent_transform.rotation * velocity.linear,
            parent_velocity.angular + parent_transform.rotation * velocity.angular,
        ),
    )
}

/// Extrapolate local motion by `dt` seconds: damping first, then constant
/// acceleration. Speeds that decay below the motion thresholds snap to zero.
fn step_state(state: &mut EntityState, dt: f64) {
    let mut linear = state.velocity.linear;
    let mut angular = state.velocity.angular;

    if angular.length_squared() > MIN_ANGULAR_SPEED_SQUARED {
        angular *= (1.0 - state.angular_damping).powf(dt);
        if angular.length_squared() < MIN_ANGULAR_SPEED_SQUARED {
            angular = DVec3::ZERO;
        } else {
            state.local = integrate_transform(&state.local, DVec3::ZERO, angular, dt);
        }
    }

    let gravity = state.gravity;
    if linear.length_squared() > MIN_LINEAR_SPEED_SQUARED || gravity.length_squared() > MIN_ACCELERATION_SQUARED {
        linear *= (1.0 - state.damping).powf(dt);
        state.local.translation += linear * dt + 0.5 * gravity * dt * dt;
        linear += gravity * dt;
        if linear.length_squared() < MIN_LINEAR_SPEED_SQUARED && gravity.length_squared() < MIN_ACCELERATION_SQUARED {
            linear = DVec3::ZERO;
        }
    }

    state.velocity = Velocity::new(linear, angular);
}

impl SimEntity for EntityItem {
    fn id(&self) -> EntityId {
        self.id
    }

    fn expiry(&self) -> Timestamp {
        match self.read().lifetime {
            Some(seconds) if seconds >= 0.0 => self.created.saturating_add(seconds_to_usecs(seconds)),
            Some(_) => self.created,
            None => IMMORTAL,
        }
    }

    fn die(&self) {
        self.dead.store(true, Ordering::Release);
    }

    fn is_dead(&self) -> bool {
        self.dead.load(Ordering::Acquire)
    }

    fn needs_to_call_update(&self) -> bool {
        self.read().kind.needs_update()
    }

    fn update(&self, now: Timestamp) {
        let mut state = self.write();
        let dt = elapsed_seconds(state.last_updated, now);
        state.kind.advance(dt);
        state.last_updated = now;
    }

    fn is_moving_relative_to_parent(&self) -> bool {
        let state = self.read();
        state.velocity.is_moving() || state.gravity.length_squared() > MIN_ACCELERATION_SQUARED
    }

    fn simulate(&self, now: Timestamp) {
        let mut state = self.write();
        let dt = elapsed_seconds(state.last_simulated, now);
        if dt > 0.0 {
            step_state(&mut state, dt);
        }
        state.last_simulated = state.last_simulated.max(now);
    }

    fn restart_simulation_clock(&self, now: Timestamp) {
        let mut state = self.write();
        state.last_simulated = state.last_simulated.max(now);
    }

    fn step_kinematic_motion(&self, dt: f64) {
        step_state(&mut self.write(), dt);
    }

    fn has_ancestor_of_type(&self, nestable: NestableType) -> bool {
        let mut link = self.read().parent.clone();
        for _ in 0..MAX_PARENTING_CHAIN_SIZE {
            let Some(current) = link else {
                return false;
            };
            if current.nestable_type() == nestable {
                return true;
            }
            link = match current {
                ParentLink::Entity(weak) => match weak.upgrade() {
                    Some(parent) => parent.parent_link(),
                    None => return false,
                },
                ParentLink::Avatar(_) => return false,
            };
        }
        false
    }

    fn parent_link(&self) -> Option<ParentLink> {
        self.read().parent.clone()
    }

    fn local_transform(&self) -> Transform {
        self.read().local
    }

    fn local_velocity(&self) -> Velocity {
        self.read().velocity
    }

    fn world_transform(&self) -> Option<Transform> {
        let (parent, _) = resolve_parent_frame(self.parent_link())?;
        Some(parent.compose(&self.local_transform()))
    }

    fn world_velocity(&self) -> Velocity {
        let (local, velocity) = {
            let state = self.read();
            (state.local, state.velocity)
        };
        match resolve_parent_frame(self.parent_link()) {
            Some(parent) => compose_frame(&parent, &local, &velocity).1,
            None => velocity,
        }
    }

    fn query_aa_cube(&self) -> Option<AaCube> {
        let world = self.world_transform()?;
        let dimensions = self.read().dimensions;
        let cube = AaCube::centered(world.translation, dimensions.length());
        cube.is_valid().then_some(cube)
    }

    fn physics_info(&self) -> Option<BodyHandle> {
        self.read().physics
    }

    fn set_physics_info(&self, handle: Option<BodyHandle>) {
        self.write().physics = handle;
    }

    fn body_descriptor(&self) -> Option<BodyDescriptor> {
        let motion = self.motion();
        if motion == PhysicsMotion::NonPhysical {
            return None;
        }
        let world = self.world_transform()?;
        let velocity = self.world_velocity();
        let state = self.read();
        let desc = match motion {
            PhysicsMotion::Dynamic => BodyDescriptor::dynamic(world, state.mass)
                .with_gravity(state.gravity)
                .with_damping(state.damping, state.angular_damping),
            _ => BodyDescriptor::kinematic(world),
        };
        Some(desc.with_velocity(velocity))
    }

    fn set_physics_state(&self, transform: &Transform, velocity: &Velocity) {
        let Some((parent, parent_velocity)) = resolve_parent_frame(self.parent_link()) else {
            return;
        };
        let inverse = parent.inverse();
        let local = inverse.compose(transform);
        let linear = inverse.rotation * (velocity.linear - parent_velocity.linear);
        let angular = inverse.rotation * (velocity.angular - parent_velocity.angular);
        let mut state = self.write();
        state.local = local;
        state.velocity = Velocity::new(linear, angular);
    }

    fn dirty_flags(&self) -> DirtyFlags {
        DirtyFlags::from_bits(self.dirty.load(Ordering::Acquire))
    }

    fn clear_dirty_flags(&self, mask: DirtyFlags) {
        self.dirty.fetch_and(!mask.bits(), Ordering::AcqRel);
    }

    fn set_simulated(&self, simulated: bool) {
        self.simulated.store(simulated, Ordering::Release);
    }

    fn is_simulated(&self) -> bool {
        self.simulated.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{AvatarAnchor, EntityPointer};
    use crate::time::USECS_PER_SECOND;

    #[test]
    fn test_expiry_from_lifetime() {
        let item = EntityItem::shape(EntityId::new(1), 500);
        assert_eq!(item.expiry(), IMMORTAL);
        assert!(!item.is_mortal());

        item.set_lifetime(Some(2.0));
        assert_eq!(item.expiry(), 500 + 2 * USECS_PER_SECOND);
        assert!(item.dirty_flags().contains(DirtyFlags::LIFETIME));

        item.set_lifetime(Some(f64::INFINITY));
        assert_eq!(item.expiry(), IMMORTAL);
    }

    #[test]
    fn test_kinematic_step_with_gravity() {
        let item = EntityItem::shape(EntityId::new(1), 0).with_gravity(DVec3::new(0.0, -10.0, 0.0));
        item.simulate(USECS_PER_SECOND);
        let local = item.local_transform();
        assert!((local.translation.y + 5.0).abs() < 1e-9);
        assert!((item.local_velocity().linear.y + 10.0).abs() < 1e-9);
        assert_eq!(item.last_simulated(), USECS_PER_SECOND);
    }

    #[test]
    fn test_restarted_clock_skips_idle_time() {
        let item = EntityItem::shape(EntityId::new(1), 0);
        item.set_velocity(Velocity::linear(DVec3::X));
        item.restart_simulation_clock(10 * USECS_PER_SECOND);
        item.simulate(10 * USECS_PER_SECOND + USECS_PER_SECOND / 2);
        assert!((item.local_transform().translation.x - 0.5).abs() < 1e-9);

        // An older frame time leaves the clock alone
        item.restart_simulation_clock(USECS_PER_SECOND);
        assert_eq!(item.last_simulated(), 10 * USECS_PER_SECOND + USECS_PER_SECOND / 2);
    }

    #[test]
    fn test_concurrent_simulate_steps_once() {
        let item = EntityItem::shape(EntityId::new(1), 0)
            .with_velocity(Velocity::linear(DVec3::new(2.0, 0.0, 0.0)))
            .shared();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let item = item.clone();
                scope.spawn(move || item.simulate(USECS_PER_SECOND));
            }
        });
        assert!((item.local_transform().translation.x - 2.0).abs() < 1e-9);
        assert_eq!(item.last_simulated(), USECS_PER_SECOND);
    }

    #[test]
    fn test_motion_threshold() {
        let item = EntityItem::shape(EntityId::new(1), 0).with_velocity(Velocity::linear(DVec3::new(2e-3, 0.0, 0.0)));
        assert!(item.is_moving_relative_to_parent());
        let slow = EntityItem::shape(EntityId::new(2), 0).with_velocity(Velocity::linear(DVec3::new(1e-4, 0.0, 0.0)));
        assert!(!slow.is_moving_relative_to_parent());
    }

    #[test]
    fn test_parent_cycle_is_unresolvable() {
        let a = EntityItem::shape(EntityId::new(1), 0).shared();
        let b = EntityItem::shape(EntityId::new(2), 0).shared();
        let a_ptr: EntityPointer = a.clone();
        let b_ptr: EntityPointer = b.clone();
        a.set_parent(Some(ParentLink::entity(&b_ptr)));
        b.set_parent(Some(ParentLink::entity(&a_ptr)));
        assert!(a.world_transform().is_none());
        assert!(!a.has_ancestor_of_type(NestableType::Avatar));
    }

    #[test]
    fn test_world_transform_follows_parent() {
        let parent: EntityPointer = EntityItem::shape(EntityId::new(1), 0)
            .with_position(DVec3::new(10.0, 0.0, 0.0))
            .shared();
        let child = EntityItem::shape(EntityId::new(2), 0)
            .with_position(DVec3::new(0.0, 1.0, 0.0))
            .with_parent(ParentLink::entity(&parent));
        let world = child.world_transform().unwrap();
        assert_eq!(world.translation, DVec3::new(10.0, 1.0, 0.0));
        assert!(child.has_ancestor_of_type(NestableType::Entity));
        assert!(!child.has_ancestor_of_type(NestableType::Avatar));

        drop(parent);
        assert!(child.world_transform().is_none());
        assert!(child.query_aa_cube().is_none());
    }

    #[test]
    fn test_avatar_ancestor_detected_through_chain() {
        let avatar = AvatarAnchor::shared(EntityId::new(100));
        let holder: EntityPointer = EntityItem::shape(EntityId::new(1), 0)
            .with_parent(ParentLink::avatar(&avatar))
            .shared();
        let held = EntityItem::shape(EntityId::new(2), 0).with_parent(ParentLink::entity(&holder));
        assert!(held.has_ancestor_of_type(NestableType::Avatar));

        // No placement has arrived for the avatar yet.
        assert!(held.world_transform().is_none());
        avatar.set_transform(Some(Transform::from_translation(DVec3::new(0.0, 0.0, 5.0))));
        assert_eq!(held.world_transform().unwrap().translation, DVec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_update_advances_kind() {
        let model = EntityItem::new(EntityId::new(1), EntityKind::model(30.0), 0);
        assert!(model.needs_to_call_update());
        model.update(USECS_PER_SECOND / 2);
        assert_eq!(model.kind(), EntityKind::Model { animation_fps: 30.0, frame: 15.0 });

        let emitter = EntityItem::new(EntityId::new(2), EntityKind::particle_effect(3.0), 0);
        emitter.update(USECS_PER_SECOND / 2);
        match emitter.kind() {
            EntityKind::ParticleEffect { emitted, carry, .. } => {
                assert_eq!(emitted, 1);
                assert!((carry - 0.5).abs() < 1e-12);
            }
            other => panic!("unexpected kind {:?}", other),
        }

        emitter.set_kind(EntityKind::particle_effect(0.0));
        assert!(!emitter.needs_to_call_update());
    }

    #[test]
    fn test_physics_state_converted_to_local() {
        let parent: EntityPointer = EntityItem::shape(EntityId::new(1), 0)
            .with_position(DVec3::new(5.0, 0.0, 0.0))
            .shared();
        let child = EntityItem::shape(EntityId::new(2), 0)
            .with_parent(ParentLink::entity(&parent))
            .with_physics(PhysicsMotion::Dynamic);
        child.set_physics_state(&Transform::from_translation(DVec3::new(6.0, 2.0, 0.0)), &Velocity::linear(DVec3::Y));
        assert_eq!(child.local_transform().translation, DVec3::new(1.0, 2.0, 0.0));
        assert_eq!(child.world_velocity().linear, DVec3::Y);
        assert!(child.dirty_flags().is_empty());

        let desc = child.body_descriptor().unwrap();
        assert_eq!(desc.transform.translation, DVec3::new(6.0, 2.0, 0.0));
    }

    #[test]
    fn test_dirty_flags_cleared_by_mask() {
        let item = EntityItem::shape(EntityId::new(1), 0);
        item.set_position(DVec3::ONE);
        item.set_lifetime(Some(1.0));
        item.clear_dirty_flags(DirtyFlags::POSITION);
        assert_eq!(item.dirty_flags(), DirtyFlags::LIFETIME);
    }
}
