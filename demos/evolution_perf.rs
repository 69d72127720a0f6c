//! Quick evolution performance test

use std::sync::Arc;
use std::time::Instant;

use param_evolution::{
    EvolutionConfig, EvolutionEngine,
    compute::evolution::{EvalFn, Evaluation, WorkUnit},
    schema::{EvaluationConfig, ParameterSpace, PopulationConfig},
};

/// Rastrigin with a configurable amount of busy work per evaluation.
fn objective(work: usize) -> EvalFn {
    Arc::new(move |unit: &WorkUnit| {
        let mut value = 10.0 * unit.genome.len() as f64;
        for _ in 0..work.max(1) {
            value = 10.0 * unit.genome.len() as f64
                + unit
                    .genome
                    .iter()
                    .map(|x| x * x - 10.0 * (2.0 * std::f64::consts::PI * x).cos())
                    .sum::<f64>();
        }
        Evaluation::new(vec![value])
    })
}

fn space(dimensions: usize) -> Result<ParameterSpace, Box<dyn std::error::Error>> {
    Ok(ParameterSpace::new(
        (0..dimensions).map(|i| (format!("x{i}"), (-5.12, 5.12))),
    )?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Evolution Performance Test ===\n");

    // Test different worker counts
    for workers in [1, 2, 4, 0] {
        println!(
            "Workers: {}",
            if workers == 0 { "auto".to_string() } else { workers.to_string() }
        );

        let mut config = EvolutionConfig {
            population: PopulationConfig {
                initial_size: 64,
                size: 32,
                generations: 10,
            },
            evaluation: EvaluationConfig { workers },
            random_seed: Some(42),
            ..Default::default()
        };
        config.objectives.weights = vec![-1.0];

        let start = Instant::now();
        let mut engine = EvolutionEngine::new(config, space(8)?, objective(20_000))?;
        let result = engine.run()?;
        let elapsed = start.elapsed();

        let total_evals = result.stats.total_evaluations;
        let evals_per_sec = total_evals as f64 / elapsed.as_secs_f64();

        println!("  Generations:    {}", result.stats.generations);
        println!("  Evaluations:    {}", total_evals);
        println!("  Elapsed:        {:.2}s", elapsed.as_secs_f64());
        println!("  Evals/sec:      {:.1}", evals_per_sec);
        println!(
            "  Best score:     {:.4}",
            result.stats.best_score.unwrap_or(f64::NAN)
        );
        println!();
    }

    println!("=== Scalability Test (cheap objective, 16 parameters) ===\n");

    // Test different population sizes
    for pop_size in [10, 20, 40, 80] {
        let mut config = EvolutionConfig {
            population: PopulationConfig {
                initial_size: pop_size * 2,
                size: pop_size,
                generations: 20,
            },
            random_seed: Some(42),
            ..Default::default()
        };
        config.objectives.weights = vec![-1.0];

        let start = Instant::now();
        let mut engine = EvolutionEngine::new(config, space(16)?, objective(1))?;
        let result = engine.run()?;
        let elapsed = start.elapsed();

        let total_evals = result.stats.total_evaluations;
        let evals_per_sec = total_evals as f64 / elapsed.as_secs_f64();

        println!(
            "Population {}: {} evals in {:.2}s ({:.1} evals/sec), best {:.4}",
            pop_size,
            total_evals,
            elapsed.as_secs_f64(),
            evals_per_sec,
            result.stats.best_score.unwrap_or(f64::NAN)
        );
    }

    Ok(())
}
