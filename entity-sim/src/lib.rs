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
//! # Entity Simulation
//!
//! The lifecycle core of a shared virtual world: entities are registered,
//! expired, extrapolated or handed to a rigid-body world, and kept sorted in
//! an octree as they move.
//!
//! ## Features
//!
//! - **Lifecycle tracking**: mortal, update-needed, sort-pending and
//!   simple-kinematic sets with a dead-entity handoff
//! - **Spatial index**: loose octree with batched relocation
//! - **Substepping dynamics**: fixed or variable steps with a per-substep
//!   callback and deferred motion-state synchronization
//! - **Parallelization**: optional Rayon integration for the tree pass
//!
//! ## Example
//!
//! ```rust
//! use entity_sim::config::SimulationConfig;
//! use entity_sim::entity::{EntityId, EntityItem, SimEntity};
//! use entity_sim::simulation::{EntitySimulation, SimpleDomain};
//! use entity_sim::spatial::EntityTree;
//!
//! let config = SimulationConfig::default();
//! let tree = EntityTree::shared(config.domain_bounds(), config.octree.clone());
//! let simulation = EntitySimulation::new(&config, SimpleDomain::new()).with_tree(tree);
//!
//! let spark = EntityItem::shape(EntityId::new(1), 0).with_lifetime(0.5).shared();
//! simulation.add_entity(spark.clone());
//! simulation.update_entities(1_000_000);
//!
//! assert!(spark.is_dead());
//! assert_eq!(simulation.take_dead_entities().len(), 1);
//! ```

#![warn(missing_docs)]

/// Configuration loading and validation
pub mod config;

/// Entity records and the capability trait the simulation consumes
pub mod entity;

/// Configuration errors
pub mod error;

/// Recycling ID allocation
pub mod id_allocator;

/// Rigid-body dynamics world
pub mod physics;

/// Entity lifecycle simulation
pub mod simulation;

/// Octree spatial index
pub mod spatial;

/// Microsecond timestamps
pub mod time;

pub use config::SimulationConfig;
pub use entity::{EntityId, EntityItem, EntityPointer, SimEntity};
pub use error::ConfigError;
pub use simulation::EntitySimulation;
