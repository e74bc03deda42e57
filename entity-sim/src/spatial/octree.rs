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
//! Octree over the world domain
//!
//! Each entity is stored in the deepest node whose cube fully contains the
//! entity's query cube. Leaves split once they hold more than
//! `max_elements_per_node` entities, and octants that end up empty are folded
//! back into their parent. Nodes live in an index arena so a node handle stays
//! valid across unrelated insertions and removals.

use crate::config::OctreeConfig;
use crate::entity::EntityId;
use crate::spatial::{AaCube, MovingEntitiesOperator};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::trace;

/// Tree shared between the simulation (single writer during reconciliation)
/// and the world owner
pub type SharedEntityTree = Arc<RwLock<EntityTree>>;

const ROOT: usize = 0;

#[derive(Debug, Clone)]
struct OctreeNode {
    cube: AaCube,
    depth: u8,
    parent: Option<usize>,
    children: Option<[usize; 8]>,
    elements: Vec<EntityId>,
}

impl OctreeNode {
    fn new(cube: AaCube, depth: u8, parent: Option<usize>) -> Self {
        OctreeNode {
            cube,
            depth,
            parent,
            children: None,
            elements: Vec::new(),
        }
    }

    fn is_empty_leaf(&self) -> bool {
        self.children.is_none() && self.elements.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Element {
    node: usize,
    cube: AaCube,
}

/// Octree index of entity bounding cubes
///
/// # Examples
///
/// ```
/// use entity_sim::config::OctreeConfig;
/// use entity_sim::entity::EntityId;
/// use entity_sim::spatial::{AaCube, EntityTree};
/// use glam::DVec3;
///
/// let mut tree = EntityTree::new(AaCube::domain(1024.0), OctreeConfig::default());
/// let id = EntityId::new(7);
/// tree.add_entity(id, AaCube::centered(DVec3::new(10.0, 0.0, 0.0), 1.0));
/// assert!(tree.contains(id));
/// ```
#[derive(Debug)]
pub struct EntityTree {
    config: OctreeConfig,
    nodes: Vec<OctreeNode>,
    free_nodes: Vec<usize>,
    elements: HashMap<EntityId, Element>,
}

impl EntityTree {
    /// Create an empty tree spanning `domain`
    pub fn new(domain: AaCube, config: OctreeConfig) -> Self {
        EntityTree {
            config,
            nodes: vec![OctreeNode::new(domain, 0, None)],
            free_nodes: Vec::new(),
            elements: HashMap::new(),
        }
    }

    /// Wrap a new tree for sharing with a simulation
    pub fn shared(domain: AaCube, config: OctreeConfig) -> SharedEntityTree {
        Arc::new(RwLock::new(Self::new(domain, config)))
    }

    /// The cube covered by the root node
    pub fn domain(&self) -> AaCube {
        self.nodes[ROOT].cube
    }

    /// Number of entities in the tree
    pub fn entity_count(&self) -> usize {
        self.elements.len()
    }

    /// Number of live nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_nodes.len()
    }

    /// Whether the entity is indexed
    pub fn contains(&self, id: EntityId) -> bool {
        self.elements.contains_key(&id)
    }

    /// The cube the entity was last indexed with
    pub fn element_cube(&self, id: EntityId) -> Option<AaCube> {
        self.elements.get(&id).map(|e| e.cube)
    }

    /// The cube of the node currently holding the entity
    pub fn containing_cube(&self, id: EntityId) -> Option<AaCube> {
        self.elements.get(&id).map(|e| self.nodes[e.node].cube)
    }

    /// Depth of the node currently holding the entity
    pub fn element_depth(&self, id: EntityId) -> Option<u8> {
        self.elements.get(&id).map(|e| self.nodes[e.node].depth)
    }

    /// Insert an entity, or relocate it if already present
    ///
    /// Returns `true` when the entity was newly added.
    pub fn add_entity(&mut self, id: EntityId, cube: AaCube) -> bool {
        if self.elements.contains_key(&id) {
            self.relocate(id, cube);
            return false;
        }
        self.insert_element(id, cube);
        true
    }

    /// Remove an entity, returning the cube it was indexed with
    pub fn remove_entity(&mut self, id: EntityId) -> Option<AaCube> {
        let element = self.elements.remove(&id)?;
        self.detach_from_node(id, element.node);
        Some(element.cube)
    }

    /// Remove a batch of entities, returning how many were present
    pub fn delete_entities<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = EntityId>,
    {
        ids.into_iter()
            .filter(|id| self.remove_entity(*id).is_some())
            .count()
    }

    /// Apply every queued move, returning how many entities changed node
    ///
    /// Entities that are no longer in the tree are skipped.
    pub fn recurse_tree_with_operator(&mut self, operator: &mut MovingEntitiesOperator) -> usize {
        let mut relocated = 0;
        for (id, cube) in operator.take_moves() {
            if !self.elements.contains_key(&id) {
                trace!(entity = %id, "move skipped, entity not in tree");
                continue;
            }
            if self.relocate(id, cube) {
                relocated += 1;
            }
        }
        relocated
    }

    /// Entities whose indexed cube touches `query`
    pub fn find_entities_in_cube(&self, query: &AaCube) -> Vec<EntityId> {
        let mut found = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            // The root may hold entities outside its own cube.
            if index != ROOT && !node.cube.touches(query) {
                continue;
            }
            found.extend(
                node.elements
                    .iter()
                    .filter(|id| self.elements[*id].cube.touches(query))
                    .copied(),
            );
            if let Some(children) = node.children {
                stack.extend(children);
            }
        }
        found.sort_unstable();
        found
    }

    /// Remove every entity and collapse to a single root
    pub fn clear(&mut self) {
        let domain = self.domain();
        self.nodes = vec![OctreeNode::new(domain, 0, None)];
        self.free_nodes.clear();
        self.elements.clear();
    }

    /// Returns `true` when the entity had to change node
    fn relocate(&mut self, id: EntityId, cube: AaCube) -> bool {
        let node = match self.elements.get(&id) {
            Some(element) => element.node,
            None => return false,
        };
        if self.node_still_fits(node, &cube) {
            if let Some(element) = self.elements.get_mut(&id) {
                element.cube = cube;
            }
            return false;
        }
        self.elements.remove(&id);
        self.detach_from_node(id, node);
        self.insert_element(id, cube);
        true
    }

    fn node_still_fits(&self, index: usize, cube: &AaCube) -> bool {
        let node = &self.nodes[index];
        if index != ROOT && !node.cube.contains(cube) {
            return false;
        }
        match node.children {
            Some(children) => !children.iter().any(|&c| self.nodes[c].cube.contains(cube)),
            None => true,
        }
    }

    fn insert_element(&mut self, id: EntityId, cube: AaCube) {
        let index = self.find_target_node(&cube);
        self.nodes[index].elements.push(id);
        self.elements.insert(id, Element { node: index, cube });
    }

    fn find_target_node(&mut self, cube: &AaCube) -> usize {
        let mut index = ROOT;
        loop {
            if let Some(children) = self.nodes[index].children {
                match children.iter().find(|&&c| self.nodes[c].cube.contains(cube)) {
                    Some(&child) => {
                        index = child;
                        continue;
                    }
                    None => return index,
                }
            }

            let node = &self.nodes[index];
            let fits_in_octant = (0..8).any(|i| node.cube.octant(i).contains(cube));
            if node.elements.len() < self.config.max_elements_per_node
                || node.depth >= self.config.max_depth
                || !fits_in_octant
            {
                return index;
            }
            self.split(index);
        }
    }

    fn split(&mut self, index: usize) {
        let cube = self.nodes[index].cube;
        let depth = self.nodes[index].depth + 1;
        let mut children = [0usize; 8];
        for (octant, slot) in children.iter_mut().enumerate() {
            *slot = self.alloc_node(OctreeNode::new(cube.octant(octant), depth, Some(index)));
        }
        self.nodes[index].children = Some(children);

        let residents = std::mem::take(&mut self.nodes[index].elements);
        for id in residents {
            let element_cube = self.elements[&id].cube;
            let target = children
                .iter()
                .copied()
                .find(|&c| self.nodes[c].cube.contains(&element_cube))
                .unwrap_or(index);
            self.nodes[target].elements.push(id);
            if let Some(element) = self.elements.get_mut(&id) {
                element.node = target;
            }
        }
        trace!(node = index, depth, "octree node split");
    }

    fn detach_from_node(&mut self, id: EntityId, index: usize) {
        self.nodes[index].elements.retain(|e| *e != id);
        self.prune_from(index);
    }

    fn prune_from(&mut self, mut index: usize) {
        loop {
            if let Some(children) = self.nodes[index].children {
                if !children.iter().all(|&c| self.nodes[c].is_empty_leaf()) {
                    return;
                }
                for child in children {
                    self.free_node(child);
                }
                self.nodes[index].children = None;
            }
            if !self.nodes[index].elements.is_empty() {
                return;
            }
            match self.nodes[index].parent {
                Some(parent) => index = parent,
                None => return,
            }
        }
    }

    fn alloc_node(&mut self, node: OctreeNode) -> usize {
        match self.free_nodes.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn free_node(&mut self, index: usize) {
        let node = &mut self.nodes[index];
        node.children = None;
        node.elements.clear();
        self.free_nodes.push(index);
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        for (id, element) in &self.elements {
            let node = &self.nodes[element.node];
            assert!(!self.free_nodes.contains(&element.node), "{} held by freed node", id);
            assert!(node.elements.contains(id));
            if element.node != ROOT {
                assert!(node.cube.contains(&element.cube));
            }
        }
        let held: usize = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.free_nodes.contains(i))
            .map(|(_, n)| n.elements.len())
            .sum();
        assert_eq!(held, self.elements.len());
    }
}
