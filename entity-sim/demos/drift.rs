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
//! Drifting entities in a small world
//!
//! Spawns a mix of short-lived, drifting and physical entities, runs the
//! simulation at 60 frames per second of simulated time, and releases dead
//! entities from the tree the way a world owner would.
//!
//! ```text
//! cargo run --example drift [config.toml]
//! RUST_LOG=entity_sim=debug LOG_FORMAT=json cargo run --example drift
//! ```

use entity_sim::config::SimulationConfig;
use entity_sim::entity::{EntityId, EntityItem, EntityKind, PhysicsMotion, SimEntity, Transform, Velocity};
use entity_sim::id_allocator::IdAllocator;
use entity_sim::physics::{DynamicsWorld, SpringAction};
use entity_sim::simulation::{EntitySimulation, PhysicalDomain};
use entity_sim::spatial::EntityTree;
use entity_sim::time::USECS_PER_SECOND;
use entity_sim::ConfigError;
use glam::DVec3;
use tracing::info;

const FRAMES: u64 = 600;
const FRAME_USECS: u64 = USECS_PER_SECOND / 60;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

fn load_config() -> Result<SimulationConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => SimulationConfig::load(path),
        None => Ok(SimulationConfig::default().with_tree_scale(256.0)),
    }
}

fn main() -> Result<(), ConfigError> {
    init_tracing();
    let config = load_config()?;
    info!(tree_scale = config.tree_scale, fixed_substep = config.physics.fixed_substep, "starting");

    let tree = EntityTree::shared(config.domain_bounds(), config.octree.clone());
    let world = DynamicsWorld::new(config.physics.clone()).shared();
    let simulation = EntitySimulation::new(&config, PhysicalDomain::new(world.clone())).with_tree(tree.clone());
    let ids = IdAllocator::new(1);

    let spawn = |item: EntityItem| {
        let item = item.shared();
        if let Some(cube) = item.query_aa_cube() {
            tree.write().unwrap().add_entity(item.id(), cube);
        }
        simulation.add_entity(item.clone());
        item
    };

    // Sparks: short-lived, spread out on a ring
    for i in 0..32 {
        let angle = i as f64 * std::f64::consts::TAU / 32.0;
        let direction = DVec3::new(angle.cos(), 0.0, angle.sin());
        spawn(
            EntityItem::new(EntityId::allocate(&ids), EntityKind::particle_effect(20.0), 0)
                .with_position(direction * 4.0)
                .with_velocity(Velocity::linear(direction * 3.0))
                .with_lifetime(1.0 + i as f64 * 0.1),
        );
    }

    // Drifters: immortal, headed for the edge of the world
    let half = config.half_tree_scale();
    for i in 0..8 {
        let speed = half / (2.0 + i as f64);
        spawn(
            EntityItem::shape(EntityId::allocate(&ids), 0)
                .with_velocity(Velocity::linear(DVec3::new(speed, 0.0, 0.0)))
                .with_damping(0.05, 0.0),
        );
    }

    // A physical body pulled toward a point above the origin
    let anchor = spawn(
        EntityItem::shape(EntityId::allocate(&ids), 0)
            .with_physics(PhysicsMotion::Dynamic)
            .with_mass(2.0)
            .with_position(DVec3::new(0.0, -10.0, 0.0)),
    );
    let target = Transform::from_translation(DVec3::new(0.0, 10.0, 0.0));
    simulation.add_dynamic(Box::new(SpringAction::new(anchor.id(), target, 0.5)));

    println!("Spawned {} entities", simulation.entity_count());

    let mut released = 0;
    for frame in 1..=FRAMES {
        let now = frame * FRAME_USECS;
        simulation.apply_dynamic_changes();
        simulation.update_entities(now);

        let dead = simulation.take_dead_entities();
        if !dead.is_empty() {
            released += tree.write().unwrap().delete_entities(dead.ids());
            for entity in dead {
                ids.release(entity.id().raw());
            }
        }

        if frame % 60 == 0 {
            info!(
                second = frame / 60,
                alive = simulation.entity_count(),
                released,
                substeps = simulation.with_domain(|domain| domain.substeps_last_frame()),
                "frame"
            );
        }
    }

    let anchor_position = anchor.world_transform().map(|t| t.translation).unwrap_or(DVec3::NAN);
    println!("\nAfter {} s of simulated time:", FRAMES / 60);
    println!("  alive entities:   {}", simulation.entity_count());
    println!("  released:         {}", released);
    println!("  bodies in world:  {}", world.lock().unwrap().body_count());
    println!("  spring anchor at: {:.3?}", anchor_position);
    Ok(())
}
