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
//! Spatial index
//!
//! This module provides the octree that indexes entities by their query cube:
//! - [`AaCube`] bounding volumes and the inclusive `touches` test
//! - [`EntityTree`] insertion, removal and queries
//! - [`MovingEntitiesOperator`] for batched relocation once per frame

mod cube;
mod octree;
mod operator;

pub use cube::AaCube;
pub use octree::{EntityTree, SharedEntityTree};
pub use operator::MovingEntitiesOperator;
