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
//! Simple kinematic mover

use crate::entity::{NestableType, SimEntity};
use crate::simulation::EntitySets;
use crate::time::Timestamp;
use tracing::trace;

/// Extrapolate every simple-kinematic entity up to `now`
///
/// An entity is moved and queued for sorting only while it is still moving,
/// has no rigid body, has a resolvable ancestry and no avatar ancestor.
/// Anything else leaves the set; avatars are placed by their clients, so
/// their children are never predicted locally.
///
/// Returns the number of entities moved.
pub fn move_simple_kinematics(now: Timestamp, sets: &mut EntitySets) -> usize {
    let mut moved = Vec::new();
    sets.simple_kinematic.retain(|entity| {
        let ancestry_is_known = entity.world_transform().is_some();
        let has_avatar_ancestor = entity.has_ancestor_of_type(NestableType::Avatar);
        if entity.is_moving_relative_to_parent()
            && entity.physics_info().is_none()
            && ancestry_is_known
            && !has_avatar_ancestor
        {
            entity.simulate(now);
            moved.push(entity.clone());
            true
        } else {
            trace!(entity = %entity.id(), "no longer simple kinematic");
            false
        }
    });
    let count = moved.len();
    sets.to_sort.extend(moved);
    count
}
