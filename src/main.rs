//! Param Evolution CLI - Run an evolutionary search on a benchmark objective.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use param_evolution::{
    compute::evolution::{EvalFn, Evaluation, EvolutionEngine, ProgressCallback, WorkUnit},
    schema::{EvolutionConfig, EvolutionProgress, ParameterSpace},
    storage::JsonLinesStore,
};

/// Benchmark objectives, all minimized at zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Objective {
    /// Sum of squares.
    Sphere,
    /// Highly multimodal, global minimum at the origin.
    Rastrigin,
    /// Four equal minima; uses the first two parameters.
    Himmelblau,
}

impl Objective {
    fn value(self, genome: &[f64]) -> f64 {
        match self {
            Self::Sphere => genome.iter().map(|x| x * x).sum(),
            Self::Rastrigin => {
                10.0 * genome.len() as f64
                    + genome
                        .iter()
                        .map(|x| x * x - 10.0 * (2.0 * std::f64::consts::PI * x).cos())
                        .sum::<f64>()
            }
            Self::Himmelblau => match genome {
                [x, y, ..] => (x * x + y - 11.0).powi(2) + (x + y * y - 7.0).powi(2),
                _ => f64::NAN,
            },
        }
    }
}

/// Contents of a run file.
#[derive(Debug, Serialize, Deserialize)]
struct RunFile {
    #[serde(default)]
    evolution: EvolutionConfig,
    parameters: ParameterSpace,
    objective: Objective,
    /// Optional JSON-lines file receiving every stored generation.
    #[serde(default)]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <run.json>", args[0]);
        eprintln!();
        eprintln!("Run an evolutionary parameter search on a benchmark objective.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  run.json  Evolution config, parameter space and objective");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let run: RunFile = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = execute(run) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn execute(run: RunFile) -> Result<(), Box<dyn std::error::Error>> {
    let objective = run.objective;
    let eval_fn: EvalFn = Arc::new(move |unit: &WorkUnit| {
        let value = objective.value(&unit.genome);
        Evaluation::with_output(vec![value], serde_json::json!({ "objective": value }))
    });

    println!("Param Evolution");
    println!("===============");
    println!("Objective: {:?}", objective);
    println!(
        "Parameters: {}",
        run.parameters.names().collect::<Vec<_>>().join(", ")
    );
    println!(
        "Population: {} (initial {}), generations: {}",
        run.evolution.population.size,
        run.evolution.population.initial_size,
        run.evolution.population.generations
    );
    println!("Weights: {:?}", run.evolution.objectives.weights);
    println!();

    let mut engine = EvolutionEngine::new(run.evolution, run.parameters, eval_fn)?;
    if let Some(path) = &run.output {
        engine = engine.with_store(JsonLinesStore::create(path)?);
        println!("Writing generations to {}", path.display());
    }

    let start = Instant::now();
    let callback: ProgressCallback = Box::new(move |progress: &EvolutionProgress| {
        if let Some(report) = progress.reports.last() {
            println!(
                "  Generation {}/{}: best={:.6}, mean={:.6}, valid={}, {:.1} evals/s",
                report.generation,
                progress.total_generations,
                report.best_score.unwrap_or(f64::NAN),
                report.mean_score.unwrap_or(f64::NAN),
                report.valid_survivors,
                progress.evaluations as f64 / start.elapsed().as_secs_f64().max(1e-9)
            );
        }
    });

    let result = engine.run_with_callback(&callback)?;

    println!();
    println!("Best individual (id {}):", result.best.id);
    for (name, value) in &result.best.params {
        println!("  {name} = {value:.6}");
    }
    println!("  score = {:.6}", result.best.score.unwrap_or(f64::NAN));
    println!("  lineage depth = {}", engine.genealogy().ancestors(result.best.id).len());
    println!();
    println!(
        "Evaluations: {} ({:.1}/s)",
        result.stats.total_evaluations, result.stats.evaluations_per_second
    );
    println!(
        "Time: {:.2}s initial, {:.2}s evolution",
        result.stats.initial_seconds, result.stats.evolution_seconds
    );

    Ok(())
}

fn print_example_config() {
    let mut evolution = EvolutionConfig::default();
    evolution.objectives.weights = vec![-1.0];
    evolution.random_seed = Some(42);

    let parameters = match ParameterSpace::new([("x", (-5.12, 5.12)), ("y", (-5.12, 5.12))]) {
        Ok(space) => space,
        Err(e) => {
            eprintln!("Error building example parameter space: {}", e);
            std::process::exit(1);
        }
    };

    let run = RunFile {
        evolution,
        parameters,
        objective: Objective::Rastrigin,
        output: Some(PathBuf::from("evolution.jsonl")),
    };

    match serde_json::to_string_pretty(&run) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing example: {}", e),
    }
}
