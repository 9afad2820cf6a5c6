//! RHS and Jacobian throughput on a small hand-built network: the two
//! hot paths every solver call repeats at every integrator step.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use gridfire::engine::GraphEngine;
use gridfire::reaction::rate::RateCoefficients;
use gridfire::reaction::{LogicalReactionSet, Reaction};
use gridfire::species::Species;
use gridfire::Engine;

/// p-p-chain-shaped toy network: p, d, he3, he4, each species feeding the
/// next through a single two-body capture, so the RHS and Jacobian touch a
/// representative number of reactions without needing a real REACLIB blob.
fn pp_chain_network() -> GraphEngine {
    let p = Species::new(1, 1);
    let d = Species::new(1, 2);
    let he3 = Species::new(2, 3);
    let he4 = Species::new(2, 4);

    let mut set = LogicalReactionSet::new();
    set.insert_or_merge(
        &Reaction::new(
            "p(p,g)d",
            2,
            vec![p, p],
            vec![d],
            1.44,
            "reaclib",
            RateCoefficients::new([-3.5, 0.0, 0.0, 0.0, -0.1, 0.0, 0.0]),
            false,
        )
        .unwrap(),
    )
    .unwrap();
    set.insert_or_merge(
        &Reaction::new(
            "d(p,g)he3",
            2,
            vec![p, d],
            vec![he3],
            5.49,
            "reaclib",
            RateCoefficients::new([10.0, 0.0, 0.0, 0.0, -0.2, 0.0, 0.0]),
            false,
        )
        .unwrap(),
    )
    .unwrap();
    set.insert_or_merge(
        &Reaction::new(
            "he3(he3,pp)he4",
            3,
            vec![he3, he3],
            vec![he4, p, p],
            12.86,
            "reaclib",
            RateCoefficients::new([8.0, 0.0, 0.0, 0.0, -0.5, 0.0, 0.0]),
            false,
        )
        .unwrap(),
    )
    .unwrap();

    GraphEngine::new(set).unwrap()
}

fn bench_rhs(c: &mut Criterion) {
    let mut engine = pp_chain_network();
    let y = vec![0.7, 1e-6, 1e-4, 1e-3];
    c.bench_function("rhs_pp_chain", |b| {
        b.iter(|| engine.calculate_rhs_and_energy(&y, 0.015, 100.0));
    });
}

fn bench_jacobian(c: &mut Criterion) {
    let mut engine = pp_chain_network();
    let y = vec![0.7, 1e-6, 1e-4, 1e-3];
    c.bench_function("jacobian_pp_chain", |b| {
        b.iter(|| engine.generate_jacobian(&y, 0.015, 100.0));
    });
}

fn bench_rhs_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("rhs_repeat_evaluation");
    for steps in [10usize, 100, 1_000] {
        let mut engine = pp_chain_network();
        let y = vec![0.7, 1e-6, 1e-4, 1e-3];
        group.bench_with_input(BenchmarkId::from_parameter(steps), &steps, |b, &steps| {
            b.iter(|| {
                for _ in 0..steps {
                    engine.calculate_rhs_and_energy(&y, 0.015, 100.0);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rhs, bench_jacobian, bench_rhs_scaling);
criterion_main!(benches);
