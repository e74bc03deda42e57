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
//! Numerical integration of rigid bodies
//!
//! The dynamics world advances every awake dynamic body through an
//! [`Integrator`] once per substep. Two schemes are provided:
//!
//! - **Semi-implicit Euler**: velocity first, then position with the new
//!   velocity. Cheap and stable for stiff contact-free motion.
//! - **Velocity Verlet**: position with the old velocity plus half the
//!   acceleration term. Exact for constant forces such as gravity.
//!
//! # Timestep Guidelines
//!
//! - Too small: precision loss with f64
//! - Too large: springs overshoot and explode
//! - Recommended: 1/90 s or 1/60 s fixed substeps

use crate::entity::{Transform, Velocity};
use crate::error::ConfigError;
use crate::physics::RigidBody;
use glam::{DQuat, DVec3};

/// Below this angle per step the exponential map uses its Taylor expansion
const ANGULAR_MOTION_THRESHOLD: f64 = 0.25 * std::f64::consts::PI;

/// Validate a fixed substep for stability
///
/// Extremely small timesteps lose precision, large ones make springs and
/// damping unstable.
pub fn validate_timestep(dt: f64) -> Result<(), ConfigError> {
    if dt <= 0.0 || !dt.is_finite() {
        return Err(ConfigError::InvalidTimestep(dt));
    }
    if dt < 1e-9 {
        return Err(ConfigError::TimestepTooSmall(dt));
    }
    if dt > 1.0 {
        return Err(ConfigError::TimestepTooLarge(dt));
    }
    Ok(())
}

/// Advance a transform by constant linear and angular velocity
///
/// Rotation uses the exponential map of `angular * dt`; the angle is
/// clamped so a single step never turns more than a quarter turn.
pub fn integrate_transform(transform: &Transform, linear: DVec3, angular: DVec3, dt: f64) -> Transform {
    let translation = transform.translation + linear * dt;

    let mut rate = angular.length();
    if rate * dt > ANGULAR_MOTION_THRESHOLD {
        rate = ANGULAR_MOTION_THRESHOLD / dt;
    }
    if rate < f64::EPSILON || !rate.is_finite() {
        return Transform::new(translation, transform.rotation);
    }
    let axis = angular / angular.length();
    let delta = DQuat::from_axis_angle(axis, rate * dt);
    Transform::new(translation, (delta * transform.rotation).normalize())
}

/// Scale velocity by `(1 - damping)^dt` for linear and angular parts
pub fn apply_damping(velocity: &Velocity, linear_damping: f64, angular_damping: f64, dt: f64) -> Velocity {
    Velocity::new(
        velocity.linear * (1.0 - linear_damping).powf(dt),
        velocity.angular * (1.0 - angular_damping).powf(dt),
    )
}

/// Kinetic energy of the translational motion
///
/// KE = 0.5 * m * v²
pub fn kinetic_energy(body: &RigidBody) -> f64 {
    if body.inverse_mass() <= 0.0 {
        return 0.0;
    }
    0.5 * body.mass() * body.velocity().linear.length_squared()
}

/// Trait for numerical integration methods
///
/// Implementations consume the body's accumulated force and commit the new
/// transform with [`RigidBody::proceed_to_transform`].
pub trait Integrator: Send + Sync {
    /// Get the name of this integrator
    fn name(&self) -> &str;

    /// Advance one dynamic body by `dt`
    fn integrate(&self, body: &mut RigidBody, dt: f64);
}

/// Semi-implicit (symplectic) Euler
#[derive(Debug, Clone, Copy, Default)]
pub struct SemiImplicitEuler;

impl Integrator for SemiImplicitEuler {
    fn name(&self) -> &str {
        "Semi-implicit Euler"
    }

    fn integrate(&self, body: &mut RigidBody, dt: f64) {
        let acceleration = body.total_force() * body.inverse_mass();
        let (linear_damping, angular_damping) = body.damping();
        let mut velocity = *body.velocity();
        velocity.linear += acceleration * dt;
        let velocity = apply_damping(&velocity, linear_damping, angular_damping, dt);
        body.set_velocity(velocity);

        let next = integrate_transform(body.transform(), velocity.linear, velocity.angular, dt);
        body.proceed_to_transform(next);
    }
}

/// Velocity Verlet
///
/// ```text
/// x(t + dt) = x(t) + v(t)*dt + 0.5*a*dt²
/// v(t + dt) = v(t) + a*dt
/// ```
///
/// Forces are sampled once per substep, so `a` is constant across the step.
#[derive(Debug, Clone, Copy, Default)]
pub struct VelocityVerlet;

impl Integrator for VelocityVerlet {
    fn name(&self) -> &str {
        "Velocity Verlet"
    }

    fn integrate(&self, body: &mut RigidBody, dt: f64) {
        let acceleration = body.total_force() * body.inverse_mass();
        let (linear_damping, angular_damping) = body.damping();
        let velocity = *body.velocity();

        let mut next = integrate_transform(body.transform(), velocity.linear, velocity.angular, dt);
        next.translation += 0.5 * acceleration * dt * dt;

        let advanced = Velocity::new(velocity.linear + acceleration * dt, velocity.angular);
        body.set_velocity(apply_damping(&advanced, linear_damping, angular_damping, dt));
        body.proceed_to_transform(next);
    }
}
