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
//! Simulation configuration
//!
//! Configuration is plain data with `Default` values matching a deployed
//! world, builder-style setters, and optional loading from TOML:
//!
//! ```toml
//! tree_scale = 32768.0
//!
//! [physics]
//! fixed_substep = 0.011111111
//! max_substeps = 6
//!
//! [octree]
//! max_depth = 10
//! ```

use crate::error::ConfigError;
use crate::physics::integrate::validate_timestep;
use crate::spatial::AaCube;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound on `max_substeps`
pub const MAX_SUBSTEP_LIMIT: u32 = 128;

/// Top-level configuration for one simulated world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Edge length of the cubic world domain in meters, centered on the origin
    pub tree_scale: f64,
    /// Octree subdivision limits
    pub octree: OctreeConfig,
    /// Rigid-body stepping parameters
    pub physics: PhysicsConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            tree_scale: 32768.0,
            octree: OctreeConfig::default(),
            physics: PhysicsConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check every field for values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tree_scale > 0.0 && self.tree_scale.is_finite()) {
            return Err(ConfigError::InvalidTreeScale(self.tree_scale));
        }
        self.octree.validate()?;
        self.physics.validate()
    }

    /// Set the world edge length
    pub fn with_tree_scale(mut self, tree_scale: f64) -> Self {
        self.tree_scale = tree_scale;
        self
    }

    /// Replace the physics parameters
    pub fn with_physics(mut self, physics: PhysicsConfig) -> Self {
        self.physics = physics;
        self
    }

    /// Replace the octree limits
    pub fn with_octree(mut self, octree: OctreeConfig) -> Self {
        self.octree = octree;
        self
    }

    /// Half the world edge length
    pub fn half_tree_scale(&self) -> f64 {
        self.tree_scale * 0.5
    }

    /// The cube entities must keep touching to stay alive
    pub fn domain_bounds(&self) -> AaCube {
        AaCube::domain(self.tree_scale)
    }
}

/// Octree subdivision limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Deepest level a node may be split to (root is depth 0)
    pub max_depth: u8,
    /// Elements a node holds before it splits
    pub max_elements_per_node: usize,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        OctreeConfig {
            max_depth: 12,
            max_elements_per_node: 16,
        }
    }
}

impl OctreeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_elements_per_node == 0 {
            return Err(ConfigError::InvalidOctree(
                "max_elements_per_node must be at least 1".to_string(),
            ));
        }
        if self.max_depth > 21 {
            return Err(ConfigError::InvalidOctree(format!(
                "max_depth {} exceeds 21",
                self.max_depth
            )));
        }
        Ok(())
    }
}

/// Parameters for the substepping dynamics world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Fixed substep length in seconds
    pub fixed_substep: f64,
    /// Substep clamp per frame; zero selects variable-step mode
    pub max_substeps: u32,
    /// Linear speed below which a body starts counting toward sleep (m/s)
    pub linear_sleep_threshold: f64,
    /// Angular speed below which a body starts counting toward sleep (rad/s)
    pub angular_sleep_threshold: f64,
    /// Seconds a body must stay below both thresholds before it sleeps
    pub time_to_sleep: f64,
    /// Interpolate motion states one fixed step in the past
    pub latency_interpolation: bool,
    /// Synchronize every body instead of only active ones
    pub synchronize_all_motion_states: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            fixed_substep: 1.0 / 90.0,
            max_substeps: 6,
            linear_sleep_threshold: 0.8,
            angular_sleep_threshold: 1.0,
            time_to_sleep: 2.0,
            latency_interpolation: false,
            synchronize_all_motion_states: false,
        }
    }
}

impl PhysicsConfig {
    /// Create a fixed-step configuration
    pub fn new(fixed_substep: f64, max_substeps: u32) -> Self {
        PhysicsConfig {
            fixed_substep,
            max_substeps,
            ..PhysicsConfig::default()
        }
    }

    /// Switch to variable-step mode
    pub fn variable_step(mut self) -> Self {
        self.max_substeps = 0;
        self
    }

    /// Set the sleep thresholds
    pub fn with_sleep_thresholds(mut self, linear: f64, angular: f64, time_to_sleep: f64) -> Self {
        self.linear_sleep_threshold = linear;
        self.angular_sleep_threshold = angular;
        self.time_to_sleep = time_to_sleep;
        self
    }

    /// Enable latency-compensated interpolation
    pub fn with_latency_interpolation(mut self) -> Self {
        self.latency_interpolation = true;
        self
    }

    /// Whether stepping uses fixed substeps
    pub fn is_fixed_step(&self) -> bool {
        self.max_substeps > 0
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.is_fixed_step() {
            validate_timestep(self.fixed_substep)?;
        }
        if self.max_substeps > MAX_SUBSTEP_LIMIT {
            return Err(ConfigError::ExcessiveSubsteps(self.max_substeps, MAX_SUBSTEP_LIMIT));
        }
        for (name, value) in [
            ("linear_sleep_threshold", self.linear_sleep_threshold),
            ("angular_sleep_threshold", self.angular_sleep_threshold),
            ("time_to_sleep", self.time_to_sleep),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::InvalidSleepThreshold { name, value });
            }
        }
        Ok(())
    }
}
