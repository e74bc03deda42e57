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
//! Batched tree relocation

use crate::entity::EntityId;
use crate::spatial::AaCube;

/// Accumulates entities whose bounds changed so the tree can reposition them
/// in one pass
#[derive(Debug, Default)]
pub struct MovingEntitiesOperator {
    moves: Vec<(EntityId, AaCube)>,
}

impl MovingEntitiesOperator {
    /// Create an empty move list
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty move list with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        MovingEntitiesOperator {
            moves: Vec::with_capacity(capacity),
        }
    }

    /// Queue an entity for relocation to `new_cube`
    pub fn add_entity_to_move_list(&mut self, id: EntityId, new_cube: AaCube) {
        self.moves.push((id, new_cube));
    }

    /// Whether anything is queued
    pub fn has_moving_entities(&self) -> bool {
        !self.moves.is_empty()
    }

    /// Number of queued moves
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Whether the move list is empty
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub(crate) fn take_moves(&mut self) -> Vec<(EntityId, AaCube)> {
        std::mem::take(&mut self.moves)
    }
}
