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
//! Kinematic extrapolation through the simulation frame

use entity_sim::config::SimulationConfig;
use entity_sim::entity::{AvatarAnchor, EntityId, EntityItem, EntityPointer, ParentLink, SimEntity, Transform, Velocity};
use entity_sim::physics::BodyHandle;
use entity_sim::simulation::{EntitySimulation, SimpleDomain};
use entity_sim::spatial::{EntityTree, SharedEntityTree};
use entity_sim::time::USECS_PER_SECOND;
use glam::DVec3;
use std::sync::Arc;

fn setup() -> (EntitySimulation<SimpleDomain>, SharedEntityTree) {
    let config = SimulationConfig::default().with_tree_scale(1024.0);
    let tree = EntityTree::shared(config.domain_bounds(), config.octree.clone());
    let simulation = EntitySimulation::new(&config, SimpleDomain::new()).with_tree(tree.clone());
    (simulation, tree)
}

fn spawn(simulation: &EntitySimulation<SimpleDomain>, tree: &SharedEntityTree, item: EntityItem) -> Arc<EntityItem> {
    let item = item.shared();
    if let Some(cube) = item.query_aa_cube() {
        tree.write().unwrap().add_entity(item.id(), cube);
    }
    simulation.add_entity(item.clone());
    item
}

fn moving(id: u64) -> EntityItem {
    EntityItem::shape(EntityId::new(id), 0).with_velocity(Velocity::linear(DVec3::new(1.0, 0.0, 0.0)))
}

#[test]
fn test_child_of_entity_moves_in_parent_frame() {
    let (simulation, tree) = setup();
    let parent = spawn(
        &simulation,
        &tree,
        EntityItem::shape(EntityId::new(1), 0).with_position(DVec3::new(10.0, 0.0, 0.0)),
    );
    let parent_ptr: EntityPointer = parent.clone();
    let child = spawn(
        &simulation,
        &tree,
        moving(2)
            .with_position(DVec3::new(1.0, 0.0, 0.0))
            .with_parent(ParentLink::entity(&parent_ptr)),
    );
    assert!(simulation.membership(EntityId::new(2)).simple_kinematic);
    assert!(!simulation.membership(EntityId::new(1)).simple_kinematic);

    simulation.update_entities(USECS_PER_SECOND);
    assert!((child.local_transform().translation.x - 2.0).abs() < 1e-12);
    let world = child.world_transform().unwrap();
    assert!((world.translation.x - 12.0).abs() < 1e-12);

    let cube = tree.read().unwrap().element_cube(EntityId::new(2)).unwrap();
    assert!((cube.center().x - 12.0).abs() < 1e-9);
}

#[test]
fn test_avatar_child_is_not_predicted() {
    let (simulation, tree) = setup();
    let avatar = AvatarAnchor::shared(EntityId::new(100));
    avatar.set_transform(Some(Transform::from_translation(DVec3::new(0.0, 5.0, 0.0))));
    let child = spawn(&simulation, &tree, moving(3).with_parent(ParentLink::avatar(&avatar)));
    assert!(simulation.membership(EntityId::new(3)).simple_kinematic);

    simulation.update_entities(USECS_PER_SECOND);
    let membership = simulation.membership(EntityId::new(3));
    assert!(!membership.simple_kinematic);
    assert!(membership.all);
    assert_eq!(child.local_transform().translation, DVec3::ZERO);
}

#[test]
fn test_dangling_parent_leaves_kinematic_set() {
    let (simulation, tree) = setup();
    let parent: EntityPointer = EntityItem::shape(EntityId::new(1), 0).shared();
    let child = spawn(&simulation, &tree, moving(2).with_parent(ParentLink::entity(&parent)));
    drop(parent);

    simulation.update_entities(USECS_PER_SECOND);
    assert!(!simulation.membership(EntityId::new(2)).simple_kinematic);
    assert_eq!(child.local_transform().translation, DVec3::ZERO);
    assert!(!child.is_dead());
}

#[test]
fn test_entity_with_body_is_not_extrapolated() {
    let (simulation, tree) = setup();
    let item = spawn(&simulation, &tree, moving(4));
    item.set_physics_info(Some(BodyHandle::new(9)));

    simulation.update_entities(USECS_PER_SECOND);
    assert!(!simulation.membership(EntityId::new(4)).simple_kinematic);
    assert_eq!(item.local_transform().translation, DVec3::ZERO);
}

#[test]
fn test_gravity_alone_counts_as_motion() {
    let (simulation, tree) = setup();
    let item = spawn(
        &simulation,
        &tree,
        EntityItem::shape(EntityId::new(5), 0).with_gravity(DVec3::new(0.0, -2.0, 0.0)),
    );
    assert!(simulation.membership(EntityId::new(5)).simple_kinematic);

    simulation.update_entities(USECS_PER_SECOND);
    assert!((item.local_transform().translation.y + 1.0).abs() < 1e-12);
    assert!((item.local_velocity().linear.y + 2.0).abs() < 1e-12);
}

#[test]
fn test_stopping_removes_from_kinematic_set() {
    let (simulation, tree) = setup();
    let item = spawn(&simulation, &tree, moving(6));
    let entity: EntityPointer = item.clone();

    item.set_velocity(Velocity::zero());
    simulation.change_entity(&entity);
    assert!(!simulation.membership(EntityId::new(6)).simple_kinematic);

    simulation.update_entities(USECS_PER_SECOND);
    assert_eq!(item.local_transform().translation, DVec3::ZERO);
}

#[test]
fn test_velocity_set_late_moves_from_last_frame() {
    let (simulation, tree) = setup();
    let item = spawn(&simulation, &tree, EntityItem::shape(EntityId::new(20), 0));
    assert!(!simulation.membership(EntityId::new(20)).simple_kinematic);
    for second in 1..=10 {
        simulation.update_entities(second * USECS_PER_SECOND);
    }

    let entity: EntityPointer = item.clone();
    item.set_velocity(Velocity::linear(DVec3::new(1.0, 0.0, 0.0)));
    simulation.change_entity(&entity);
    assert!(simulation.membership(EntityId::new(20)).simple_kinematic);

    simulation.update_entities(10 * USECS_PER_SECOND + USECS_PER_SECOND / 10);
    assert!((item.local_transform().translation.x - 0.1).abs() < 1e-9);
}

#[test]
fn test_restarted_entity_skips_time_spent_stopped() {
    let (simulation, tree) = setup();
    let item = spawn(&simulation, &tree, moving(21));
    let entity: EntityPointer = item.clone();
    simulation.update_entities(USECS_PER_SECOND);
    assert!((item.local_transform().translation.x - 1.0).abs() < 1e-9);

    item.set_velocity(Velocity::zero());
    simulation.change_entity(&entity);
    simulation.update_entities(5 * USECS_PER_SECOND);

    item.set_velocity(Velocity::linear(DVec3::new(1.0, 0.0, 0.0)));
    simulation.change_entity(&entity);
    simulation.update_entities(6 * USECS_PER_SECOND);
    assert!((item.local_transform().translation.x - 2.0).abs() < 1e-9);
}
