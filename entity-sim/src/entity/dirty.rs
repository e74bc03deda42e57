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
//! Dirty flags
//!
//! External edits to an entity raise bits here; the simulation reads and
//! clears them in `change_entity`.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Bit set describing what changed on an entity since it was last reconciled
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DirtyFlags(u32);

impl DirtyFlags {
    /// Nothing changed
    pub const NONE: DirtyFlags = DirtyFlags(0);
    /// Position changed
    pub const POSITION: DirtyFlags = DirtyFlags(1 << 0);
    /// Rotation changed
    pub const ROTATION: DirtyFlags = DirtyFlags(1 << 1);
    /// Linear velocity changed
    pub const LINEAR_VELOCITY: DirtyFlags = DirtyFlags(1 << 2);
    /// Angular velocity changed
    pub const ANGULAR_VELOCITY: DirtyFlags = DirtyFlags(1 << 3);
    /// Lifetime (and therefore expiry) changed
    pub const LIFETIME: DirtyFlags = DirtyFlags(1 << 4);
    /// Whether the entity wants a rigid body changed
    pub const MOTION_TYPE: DirtyFlags = DirtyFlags(1 << 5);
    /// Dimensions changed
    pub const SHAPE: DirtyFlags = DirtyFlags(1 << 6);
    /// Mass, gravity or damping changed
    pub const MASS_PROPERTIES: DirtyFlags = DirtyFlags(1 << 7);
    /// Parent changed
    pub const PARENT: DirtyFlags = DirtyFlags(1 << 8);

    /// Position and rotation
    pub const TRANSFORM: DirtyFlags = DirtyFlags(Self::POSITION.0 | Self::ROTATION.0);
    /// Linear and angular velocity
    pub const VELOCITIES: DirtyFlags = DirtyFlags(Self::LINEAR_VELOCITY.0 | Self::ANGULAR_VELOCITY.0);
    /// Everything a rigid body mirrors
    pub const PHYSICS: DirtyFlags = DirtyFlags(
        Self::TRANSFORM.0 | Self::VELOCITIES.0 | Self::MOTION_TYPE.0 | Self::SHAPE.0 | Self::MASS_PROPERTIES.0,
    );
    /// Every flag
    pub const ALL: DirtyFlags = DirtyFlags(u32::MAX);

    /// Build from raw bits
    pub const fn from_bits(bits: u32) -> Self {
        DirtyFlags(bits)
    }

    /// Raw bits
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Whether no bit is set
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `other` is set
    pub const fn contains(&self, other: DirtyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit of `other` is set
    pub const fn intersects(&self, other: DirtyFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// Set the bits of `other`
    pub fn insert(&mut self, other: DirtyFlags) {
        self.0 |= other.0;
    }

    /// Clear the bits of `other`
    pub fn remove(&mut self, other: DirtyFlags) {
        self.0 &= !other.0;
    }
}

impl BitOr for DirtyFlags {
    type Output = DirtyFlags;

    fn bitor(self, rhs: DirtyFlags) -> DirtyFlags {
        DirtyFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for DirtyFlags {
    fn bitor_assign(&mut self, rhs: DirtyFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for DirtyFlags {
    type Output = DirtyFlags;

    fn bitand(self, rhs: DirtyFlags) -> DirtyFlags {
        DirtyFlags(self.0 & rhs.0)
    }
}

impl Not for DirtyFlags {
    type Output = DirtyFlags;

    fn not(self) -> DirtyFlags {
        DirtyFlags(!self.0)
    }
}

impl fmt::Debug for DirtyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DirtyFlags({:#011b})", self.0)
    }
}
