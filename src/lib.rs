//! Param Evolution - Evolutionary search over bounded parameter spaces.
//!
//! This crate searches a space of named, bounded parameters for vectors
//! that score well under a user-supplied evaluation function. Each
//! generation breeds offspring from the current population, evaluates them
//! in parallel, and keeps the best. Every individual's id and parents are
//! recorded so the full genealogy can be inspected afterwards.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Configuration, parameter space and report types
//! - `compute`: Worker pools and the evolution engine
//! - `storage`: Persistence of per-generation results
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use param_evolution::{
//!     compute::evolution::{Evaluation, EvolutionEngine, WorkUnit},
//!     schema::{EvolutionConfig, ParameterSpace},
//!     storage::MemoryStore,
//! };
//!
//! let space = ParameterSpace::new([("a", (0.0, 1.0)), ("b", (-2.0, 2.0))])?;
//! let objective = Arc::new(|unit: &WorkUnit| {
//!     let a = unit.params["a"];
//!     let b = unit.params["b"];
//!     Evaluation::new(vec![-(a - 0.3).powi(2) - (b - 1.0).powi(2)])
//! });
//!
//! let store = MemoryStore::new();
//! let mut engine = EvolutionEngine::new(EvolutionConfig::default(), space, objective)?
//!     .with_store(store.clone());
//! let result = engine.run()?;
//!
//! println!("Best: {:?} (score {:?})", result.best.params, result.best.score);
//! println!("Stored generations: {:?}", store.generation_indices());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compute;
pub mod schema;
pub mod storage;

// Re-export commonly used types
pub use compute::evolution::{EvalFn, Evaluation, EvolutionEngine, EvolutionError, WorkUnit};
pub use schema::{EvolutionConfig, ParameterSpace};
