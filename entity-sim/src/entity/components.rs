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
//! Kinematic state components
//!
//! Rigid transforms and velocities shared by entities and rigid bodies.
//! Double precision throughout so positions near the domain edge keep
//! millimeter resolution.

use glam::{DQuat, DVec3};

/// Squared linear speed (m²/s²) below which an entity counts as at rest
pub const MIN_LINEAR_SPEED_SQUARED: f64 = 1.0e-6;

/// Squared angular speed (rad²/s²) below which an entity counts as not spinning
pub const MIN_ANGULAR_SPEED_SQUARED: f64 = 1.0e-6;

/// Rigid transform: rotation followed by translation
///
/// # Examples
///
/// ```
/// use entity_sim::entity::Transform;
/// use glam::DVec3;
///
/// let parent = Transform::from_translation(DVec3::new(10.0, 0.0, 0.0));
/// let child = Transform::from_translation(DVec3::new(0.0, 2.0, 0.0));
/// assert_eq!(parent.compose(&child).translation, DVec3::new(10.0, 2.0, 0.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in meters
    pub translation: DVec3,
    /// Orientation
    pub rotation: DQuat,
}

impl Transform {
    /// Identity transform
    pub const IDENTITY: Transform = Transform {
        translation: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    /// Create a transform from translation and rotation
    pub fn new(translation: DVec3, rotation: DQuat) -> Self {
        Transform { translation, rotation }
    }

    /// Create a pure translation
    pub fn from_translation(translation: DVec3) -> Self {
        Transform::new(translation, DQuat::IDENTITY)
    }

    /// Apply `local` in the frame of `self` (parent ∘ child)
    pub fn compose(&self, local: &Transform) -> Transform {
        Transform {
            translation: self.translation + self.rotation * local.translation,
            rotation: (self.rotation * local.rotation).normalize(),
        }
    }

    /// Inverse transform
    pub fn inverse(&self) -> Transform {
        let rotation = self.rotation.inverse();
        Transform {
            translation: rotation * -self.translation,
            rotation,
        }
    }

    /// Map a point from local space into this transform's parent space
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.translation + self.rotation * point
    }

    /// Check that all components are finite
    pub fn is_valid(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}

/// Linear (m/s) and angular (rad/s, axis-scaled) velocity
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    /// Linear velocity
    pub linear: DVec3,
    /// Angular velocity as axis × rate
    pub angular: DVec3,
}

impl Velocity {
    /// Create a velocity
    pub fn new(linear: DVec3, angular: DVec3) -> Self {
        Velocity { linear, angular }
    }

    /// Create a zero velocity (at rest)
    pub fn zero() -> Self {
        Velocity::default()
    }

    /// Create a purely linear velocity
    pub fn linear(linear: DVec3) -> Self {
        Velocity::new(linear, DVec3::ZERO)
    }

    /// Linear speed
    pub fn speed(&self) -> f64 {
        self.linear.length()
    }

    /// Whether either component exceeds the at-rest thresholds
    pub fn is_moving(&self) -> bool {
        self.linear.length_squared() > MIN_LINEAR_SPEED_SQUARED
            || self.angular.length_squared() > MIN_ANGULAR_SPEED_SQUARED
    }

    /// Check that all components are finite
    pub fn is_valid(&self) -> bool {
        self.linear.is_finite() && self.angular.is_finite()
    }
}
