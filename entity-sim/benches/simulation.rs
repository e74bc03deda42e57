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
//! Benchmarks for the entity simulation frame
//!
//! These benchmarks measure:
//! - Frame cost with many moving entities (extrapolation plus tree pass)
//! - Expiry scanning with a large mortal population
//! - Octree relocation in isolation

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use entity_sim::config::SimulationConfig;
use entity_sim::entity::{EntityId, EntityItem, SimEntity, Velocity};
use entity_sim::simulation::{EntitySimulation, SimpleDomain};
use entity_sim::spatial::{AaCube, EntityTree, MovingEntitiesOperator};
use entity_sim::time::USECS_PER_SECOND;
use glam::DVec3;

const FRAME: u64 = USECS_PER_SECOND / 60;

// Spread entities on a grid so the tree has real structure
fn grid_position(i: usize) -> DVec3 {
    let side = 32;
    DVec3::new(
        (i % side) as f64 * 8.0 - 128.0,
        ((i / side) % side) as f64 * 8.0 - 128.0,
        (i / (side * side)) as f64 * 8.0 - 128.0,
    )
}

fn populated_simulation(entity_count: usize, lifetime: Option<f64>) -> EntitySimulation<SimpleDomain> {
    let config = SimulationConfig::default().with_tree_scale(4096.0);
    let tree = EntityTree::shared(config.domain_bounds(), config.octree.clone());
    let simulation = EntitySimulation::new(&config, SimpleDomain::new()).with_tree(tree.clone());

    for i in 0..entity_count {
        let mut item = EntityItem::shape(EntityId::new(i as u64 + 1), 0)
            .with_position(grid_position(i))
            .with_velocity(Velocity::linear(DVec3::new(0.5, 0.25, 0.0)));
        if let Some(seconds) = lifetime {
            item = item.with_lifetime(seconds + i as f64);
        }
        let item = item.shared();
        if let Some(cube) = item.query_aa_cube() {
            tree.write().unwrap().add_entity(item.id(), cube);
        }
        simulation.add_entity(item);
    }
    simulation
}

fn bench_moving_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("moving_frame");

    for entity_count in [100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*entity_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(entity_count), entity_count, |b, &entity_count| {
            let simulation = populated_simulation(entity_count, None);
            let mut now = 0;
            b.iter(|| {
                now += FRAME;
                simulation.update_entities(black_box(now));
            });
        });
    }

    group.finish();
}

fn bench_expiry_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("expiry_scan");
    group.sample_size(20);

    // Every frame crosses the watermark, so every frame rescans
    group.bench_function("mortal_10000", |b| {
        b.iter_batched(
            || populated_simulation(10000, Some(0.0)),
            |simulation| {
                for second in 1..=5 {
                    simulation.update_entities(second * USECS_PER_SECOND);
                }
                black_box(simulation.take_dead_entities().len())
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

fn bench_tree_relocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_relocation");

    for entity_count in [1000, 10000].iter() {
        group.throughput(Throughput::Elements(*entity_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(entity_count), entity_count, |b, &entity_count| {
            let domain = SimulationConfig::default().with_tree_scale(4096.0).domain_bounds();
            let mut tree = EntityTree::new(domain, Default::default());
            for i in 0..entity_count {
                tree.add_entity(EntityId::new(i as u64 + 1), AaCube::centered(grid_position(i), 1.0));
            }
            let mut offset = 0.0;
            b.iter(|| {
                offset = if offset == 0.0 { 3.0 } else { 0.0 };
                let mut operator = MovingEntitiesOperator::with_capacity(entity_count);
                for i in 0..entity_count {
                    let center = grid_position(i) + DVec3::splat(offset);
                    operator.add_entity_to_move_list(EntityId::new(i as u64 + 1), AaCube::centered(center, 1.0));
                }
                black_box(tree.recurse_tree_with_operator(&mut operator))
            });
        });
    }

    group.finish();
}

criterion_group!(simulation_benches, bench_moving_frame, bench_expiry_scan, bench_tree_relocation);
criterion_main!(simulation_benches);
