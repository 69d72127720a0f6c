//! Benchmarks for evolution operators and generation steps.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use param_evolution::{
    compute::SequentialBackend,
    compute::evolution::{
        AdaptiveGaussianMutation, BlendCrossover, EvalFn, Evaluation, EvolutionEngine, GenomeRng,
        Individual, IndividualGenerator, Mating, Mutation, ParentSelection, RankSelection,
        UniformGenerator, WorkUnit,
    },
    schema::{EvolutionConfig, ParameterSpace, PopulationConfig},
};

fn space(dimensions: usize) -> ParameterSpace {
    ParameterSpace::new((0..dimensions).map(|i| (format!("p{i}"), (-5.0, 5.0))))
        .expect("valid benchmark space")
}

fn sphere() -> EvalFn {
    Arc::new(|unit: &WorkUnit| Evaluation::new(vec![unit.genome.iter().map(|x| x * x).sum()]))
}

fn bench_operators(c: &mut Criterion) {
    let mut group = c.benchmark_group("operators");

    for dimensions in [4, 16, 64] {
        let space = space(dimensions);
        let mut rng = GenomeRng::new(42);
        let first = UniformGenerator.generate(&space, &mut rng);
        let second = UniformGenerator.generate(&space, &mut rng);

        group.bench_with_input(
            BenchmarkId::new("blend_crossover", dimensions),
            &dimensions,
            |b, _| {
                b.iter(|| {
                    BlendCrossover::default().mate(
                        black_box(first.clone()),
                        black_box(second.clone()),
                        &mut rng,
                    )
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("adaptive_gaussian_mutation", dimensions),
            &dimensions,
            |b, _| {
                b.iter(|| {
                    AdaptiveGaussianMutation::default().mutate(
                        black_box(first.clone()),
                        &space,
                        &mut rng,
                    )
                });
            },
        );
    }

    group.finish();
}

fn bench_rank_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_selection");

    for size in [20, 100, 500] {
        let space = space(8);
        let mut rng = GenomeRng::new(7);
        let mut engine = EvolutionEngine::new(
            EvolutionConfig {
                population: PopulationConfig {
                    initial_size: size,
                    size,
                    generations: 0,
                },
                random_seed: Some(7),
                ..Default::default()
            },
            space,
            sphere(),
        )
        .expect("valid benchmark config")
        .with_backend(SequentialBackend);
        engine.run_initial().expect("initial population");
        let population: Vec<Individual> = engine.population().to_vec();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| RankSelection::default().select(black_box(&population), size, &mut rng));
        });
    }

    group.finish();
}

fn bench_generations(c: &mut Criterion) {
    let mut group = c.benchmark_group("ten_generations");
    group.sample_size(20);

    for size in [20, 80] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let config = EvolutionConfig {
                    population: PopulationConfig {
                        initial_size: size,
                        size,
                        generations: 10,
                    },
                    random_seed: Some(1),
                    ..Default::default()
                };
                let mut engine = EvolutionEngine::new(config, space(16), sphere())
                    .expect("valid benchmark config")
                    .with_backend(SequentialBackend);
                engine.run().expect("benchmark run")
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_operators,
    bench_rank_selection,
    bench_generations
);
criterion_main!(benches);
