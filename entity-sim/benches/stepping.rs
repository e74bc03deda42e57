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
//! Benchmarks for the substepping dynamics world
//!
//! These benchmarks measure:
//! - Substep throughput per integrator for different body counts
//! - Cost of motion-state synchronization, active-only vs. forced

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use entity_sim::config::PhysicsConfig;
use entity_sim::entity::{Transform, Velocity};
use entity_sim::physics::{
    BodyDescriptor, DefaultMotionState, DynamicsWorld, Integrator, SemiImplicitEuler, VelocityVerlet,
};
use glam::DVec3;
use std::sync::Arc;

const FIXED: f64 = 1.0 / 90.0;

fn populated_world(body_count: usize, integrator: Box<dyn Integrator>) -> DynamicsWorld {
    let config = PhysicsConfig::new(FIXED, 6).with_sleep_thresholds(0.0, 0.0, f64::INFINITY);
    let mut world = DynamicsWorld::new(config).with_integrator(integrator);
    for i in 0..body_count {
        let transform = Transform::from_translation(DVec3::new(i as f64, 0.0, 0.0));
        let desc = BodyDescriptor::dynamic(transform, 1.0 + i as f64 * 0.01)
            .with_velocity(Velocity::new(DVec3::new(0.0, 1.0, 0.0), DVec3::new(0.0, 0.0, 0.5)))
            .with_gravity(DVec3::new(0.0, -9.8, 0.0))
            .with_damping(0.1, 0.1);
        world.add_body(&desc, Some(Arc::new(DefaultMotionState::new(transform))));
    }
    world
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_frame");

    for body_count in [100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*body_count as u64));

        group.bench_with_input(BenchmarkId::new("euler", body_count), body_count, |b, &body_count| {
            let mut world = populated_world(body_count, Box::new(SemiImplicitEuler));
            b.iter(|| world.step_simulation(black_box(1.0 / 60.0)));
        });

        group.bench_with_input(BenchmarkId::new("verlet", body_count), body_count, |b, &body_count| {
            let mut world = populated_world(body_count, Box::new(VelocityVerlet));
            b.iter(|| world.step_simulation(black_box(1.0 / 60.0)));
        });
    }

    group.finish();
}

fn bench_synchronize(c: &mut Criterion) {
    let mut group = c.benchmark_group("synchronize_motion_states");

    for body_count in [1000, 10000].iter() {
        group.throughput(Throughput::Elements(*body_count as u64));

        group.bench_with_input(BenchmarkId::new("active", body_count), body_count, |b, &body_count| {
            let mut world = populated_world(body_count, Box::new(SemiImplicitEuler));
            world.step_simulation(1.5 * FIXED);
            b.iter(|| {
                world.synchronize_motion_states(false);
                black_box(world.changed_motion_states().len())
            });
        });

        group.bench_with_input(BenchmarkId::new("forced", body_count), body_count, |b, &body_count| {
            let mut world = populated_world(body_count, Box::new(SemiImplicitEuler));
            world.step_simulation(1.5 * FIXED);
            b.iter(|| {
                world.synchronize_motion_states(true);
                black_box(world.changed_motion_states().len())
            });
        });
    }

    group.finish();
}

criterion_group!(stepping_benches, bench_step, bench_synchronize);
criterion_main!(stepping_benches);
