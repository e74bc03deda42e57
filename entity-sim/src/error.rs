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
//! Error types
//!
//! Only configuration can fail. The simulation and physics paths report
//! degraded conditions through counts, flags and the dead-entity set.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that was being read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML for the expected schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A timestep is non-positive, NaN or infinite
    #[error("invalid timestep {0}: must be positive and finite")]
    InvalidTimestep(f64),

    /// A timestep is valid but so small it will lose precision
    #[error("timestep {0} is extremely small and may cause precision loss")]
    TimestepTooSmall(f64),

    /// A timestep is valid but large enough to destabilise integration
    #[error("timestep {0} is large and may cause instability")]
    TimestepTooLarge(f64),

    /// The world extent is non-positive or not finite
    #[error("invalid tree scale {0}: must be positive and finite")]
    InvalidTreeScale(f64),

    /// A substep clamp so high that a stall could never be caught up
    #[error("max_substeps {0} exceeds the catch-up limit of {1}")]
    ExcessiveSubsteps(u32, u32),

    /// Octree limits that would prevent any insertion
    #[error("invalid octree limits: {0}")]
    InvalidOctree(String),

    /// Sleep thresholds must be non-negative and finite
    #[error("invalid sleep threshold {name} = {value}")]
    InvalidSleepThreshold {
        /// Which threshold was rejected
        name: &'static str,
        /// The rejected value
        value: f64,
    },
}
