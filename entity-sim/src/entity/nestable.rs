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
//! Parenting
//!
//! Entities may be attached to another entity or to an avatar. Links are weak:
//! a child never keeps its parent alive, and a dangling link makes the child's
//! world placement unresolvable.

use super::{EntityId, EntityPointer, SimEntity, Transform};
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Kind of object an entity can be parented to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NestableType {
    /// Another simulated entity
    Entity,
    /// An avatar whose placement is owned by a remote client
    Avatar,
}

/// An avatar as seen by the simulation
///
/// The transform is authoritative elsewhere; it is `None` until the first
/// remote update arrives (and may be reset to `None` when the avatar is lost).
#[derive(Debug)]
pub struct AvatarAnchor {
    id: EntityId,
    transform: RwLock<Option<Transform>>,
}

impl AvatarAnchor {
    /// Create an anchor with no known placement
    pub fn new(id: EntityId) -> Self {
        AvatarAnchor {
            id,
            transform: RwLock::new(None),
        }
    }

    /// Create a shared anchor
    pub fn shared(id: EntityId) -> Arc<AvatarAnchor> {
        Arc::new(Self::new(id))
    }

    /// Avatar ID
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Last placement received from the owning client
    pub fn transform(&self) -> Option<Transform> {
        *self.transform.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a placement received from the owning client
    pub fn set_transform(&self, transform: Option<Transform>) {
        *self.transform.write().unwrap_or_else(PoisonError::into_inner) = transform;
    }
}

/// Weak reference from a child entity to its parent
#[derive(Debug, Clone)]
pub enum ParentLink {
    /// Parented to another entity
    Entity(Weak<dyn SimEntity>),
    /// Parented to an avatar
    Avatar(Weak<AvatarAnchor>),
}

impl ParentLink {
    /// Link to an entity parent
    pub fn entity(parent: &EntityPointer) -> Self {
        ParentLink::Entity(Arc::downgrade(parent))
    }

    /// Link to an avatar parent
    pub fn avatar(avatar: &Arc<AvatarAnchor>) -> Self {
        ParentLink::Avatar(Arc::downgrade(avatar))
    }

    /// The kind of parent this link points at
    pub fn nestable_type(&self) -> NestableType {
        match self {
            ParentLink::Entity(_) => NestableType::Entity,
            ParentLink::Avatar(_) => NestableType::Avatar,
        }
    }
}
