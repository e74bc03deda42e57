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
//! Entity lifecycle simulation
//!
//! [`EntitySimulation`] tracks entities in typed sets and drives them each
//! frame. Per-kind behavior lives in a [`SimulationDomain`]:
//! [`SimpleDomain`] for pure extrapolation and [`PhysicalDomain`] for worlds
//! with rigid bodies.

mod domain;
mod entity_simulation;
pub mod kinematic;
mod physical;
mod sets;

pub use domain::{DynamicChanges, SimpleDomain, SimulationDomain};
pub use entity_simulation::{EntitySimulation, Membership};
pub use kinematic::move_simple_kinematics;
pub use physical::PhysicalDomain;
pub use sets::{EntitySets, SetOfEntities};
