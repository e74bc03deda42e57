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
//! Axis-aligned cubes
//!
//! Every bounding volume in the spatial index is a cube described by its
//! minimum corner and edge length.

use glam::DVec3;

/// Axis-aligned cube given by its minimum corner and edge length
///
/// # Examples
///
/// ```
/// use entity_sim::spatial::AaCube;
/// use glam::DVec3;
///
/// let domain = AaCube::domain(100.0);
/// let edge = AaCube::centered(DVec3::new(55.0, 0.0, 0.0), 10.0);
/// assert!(domain.touches(&edge)); // face contact counts
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AaCube {
    corner: DVec3,
    scale: f64,
}

impl AaCube {
    /// Create a cube from its minimum corner and edge length
    pub fn new(corner: DVec3, scale: f64) -> Self {
        AaCube { corner, scale }
    }

    /// Create a cube of the given edge length centered on `center`
    pub fn centered(center: DVec3, scale: f64) -> Self {
        AaCube::new(center - DVec3::splat(scale * 0.5), scale)
    }

    /// The world domain: a cube of edge `tree_scale` centered on the origin
    pub fn domain(tree_scale: f64) -> Self {
        AaCube::new(DVec3::splat(-tree_scale * 0.5), tree_scale)
    }

    /// Minimum corner
    pub fn corner(&self) -> DVec3 {
        self.corner
    }

    /// Maximum corner
    pub fn far_corner(&self) -> DVec3 {
        self.corner + DVec3::splat(self.scale)
    }

    /// Edge length
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Center point
    pub fn center(&self) -> DVec3 {
        self.corner + DVec3::splat(self.scale * 0.5)
    }

    /// Whether every coordinate is finite and the scale non-negative
    pub fn is_valid(&self) -> bool {
        self.corner.is_finite() && self.scale.is_finite() && self.scale >= 0.0
    }

    /// Whether the two cubes overlap or share any boundary point
    pub fn touches(&self, other: &AaCube) -> bool {
        let relative_center = self.corner - other.corner + DVec3::splat((self.scale - other.scale) * 0.5);
        let total_half_scale = 0.5 * (self.scale + other.scale);
        relative_center.x.abs() <= total_half_scale
            && relative_center.y.abs() <= total_half_scale
            && relative_center.z.abs() <= total_half_scale
    }

    /// Whether `other` lies entirely inside this cube (boundaries inclusive)
    pub fn contains(&self, other: &AaCube) -> bool {
        let far = self.far_corner();
        let other_far = other.far_corner();
        other.corner.cmpge(self.corner).all() && other_far.cmple(far).all()
    }

    /// Whether a point lies inside this cube (boundaries inclusive)
    pub fn contains_point(&self, point: DVec3) -> bool {
        point.cmpge(self.corner).all() && point.cmple(self.far_corner()).all()
    }

    /// The `index`-th octant, bit 0 selecting +x, bit 1 +y, bit 2 +z
    pub fn octant(&self, index: usize) -> AaCube {
        let half = self.scale * 0.5;
        let offset = DVec3::new(
            if index & 1 != 0 { half } else { 0.0 },
            if index & 2 != 0 { half } else { 0.0 },
            if index & 4 != 0 { half } else { 0.0 },
        );
        AaCube::new(self.corner + offset, half)
    }
}
