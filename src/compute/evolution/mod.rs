//! Evolutionary parameter search.
//!
//! # Overview
//!
//! - **Individuals** (`individual`): genome, identity, lineage and fitness
//! - **Operators** (`operators`): generation, parent selection, mating,
//!   mutation and survivor selection behind swappable traits
//! - **Dispatch** (`dispatch`): batch evaluation through a worker pool,
//!   results correlated by id
//! - **Generation step** (`generation`): replace, breed, evaluate, record,
//!   select and persist
//! - **Genealogy** (`genealogy`): parent links across generations
//! - **Engine** (`engine`): owns the population and drives the run
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use param_evolution::compute::evolution::{EvolutionEngine, Evaluation, WorkUnit};
//! use param_evolution::schema::{EvolutionConfig, ParameterSpace};
//!
//! let space = ParameterSpace::new([("x", (-5.0, 5.0)), ("y", (-5.0, 5.0))])?;
//! let sphere = Arc::new(|unit: &WorkUnit| {
//!     let (x, y) = (unit.params["x"], unit.params["y"]);
//!     Evaluation::new(vec![-(x * x + y * y)])
//! });
//!
//! let mut engine = EvolutionEngine::new(EvolutionConfig::default(), space, sphere)?;
//! let result = engine.run_with_callback(|progress| {
//!     println!("Generation {}: {} valid", progress.generation, progress.valid);
//! })?;
//!
//! println!("Best score: {:?}", result.best.score);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod dispatch;
mod engine;
mod error;
mod genealogy;
mod generation;
mod individual;
mod operators;
mod rng;

pub use dispatch::{DispatchError, EvalFn, Evaluation, EvaluationDispatcher, WorkUnit};
pub use engine::{EvolutionEngine, ProgressCallback};
pub use error::EvolutionError;
pub use genealogy::{Genealogy, GenealogyExport};
pub use generation::{GenerationController, GenerationOutcome, History, RunContext};
pub use individual::{Individual, ParentIds, weighted_score};
pub use operators::{
    AdaptiveGaussianMutation, BestSelection, BlendCrossover, IndividualGenerator, Mating,
    Mutation, OperatorSet, ParentSelection, RankSelection, SurvivorSelection,
    TournamentSelection, UniformGenerator, initial_step_sizes, mutate_until_valid,
};
pub use rng::GenomeRng;
