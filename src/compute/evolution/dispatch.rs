//! Evaluation dispatch: hand a batch of tagged individuals to the worker
//! pool and write the results back by id.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::compute::ExecutionBackend;

use super::{EvolutionError, Individual, weighted_score};

/// Evaluation function shared with the worker threads.
pub type EvalFn = Arc<dyn Fn(&WorkUnit) -> Evaluation + Send + Sync>;

/// One individual as seen by the evaluation function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkUnit {
    pub id: u64,
    pub generation: usize,
    pub genome: Vec<f64>,
    /// Named parameter values, keyed and ordered by name. `genome` holds
    /// the same values in the parameter space's field order.
    pub params: BTreeMap<String, f64>,
}

/// What the evaluation function returns for one individual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// One value per objective. NaN/Inf marks the individual invalid.
    pub fitness: Vec<f64>,
    /// Opaque payload attached to the individual verbatim.
    pub output: serde_json::Value,
}

impl Evaluation {
    pub fn new(fitness: Vec<f64>) -> Self {
        Self {
            fitness,
            output: serde_json::Value::Null,
        }
    }

    pub fn with_output(fitness: Vec<f64>, output: serde_json::Value) -> Self {
        Self { fitness, output }
    }
}

/// Broken contract between the dispatcher and the worker pool or the
/// evaluation function.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Worker pool returned no results for {expected} submitted individuals")]
    NoResults { expected: usize },
    #[error("Worker pool returned {received} results for {expected} submitted individuals")]
    CountMismatch { expected: usize, received: usize },
    #[error("Result for unknown individual id {0}")]
    UnknownId(u64),
    #[error("More than one result for individual id {0}")]
    DuplicateResult(u64),
    #[error("Individual {0} was submitted twice")]
    DuplicateSubmission(u64),
    #[error("Individual {id} is already evaluated")]
    AlreadyEvaluated { id: u64 },
    #[error("Individual {id} returned {got} fitness values, expected {expected}")]
    FitnessShape { id: u64, expected: usize, got: usize },
}

/// Sends populations to the worker pool and correlates results by id.
pub struct EvaluationDispatcher {
    backend: Box<dyn ExecutionBackend>,
    eval_fn: EvalFn,
    weights: Vec<f64>,
    evaluations: u64,
}

impl EvaluationDispatcher {
    pub fn new(backend: Box<dyn ExecutionBackend>, eval_fn: EvalFn, weights: Vec<f64>) -> Self {
        Self {
            backend,
            eval_fn,
            weights,
            evaluations: 0,
        }
    }

    /// Replace the worker pool.
    pub fn set_backend(&mut self, backend: Box<dyn ExecutionBackend>) {
        self.backend = backend;
    }

    /// Total individuals evaluated so far.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Evaluate every individual and write fitness, score and output back.
    ///
    /// Returns the number of individuals whose fitness came back invalid.
    /// On error no individual is modified.
    pub fn dispatch(
        &mut self,
        population: &mut [Individual],
        generation: usize,
    ) -> Result<usize, EvolutionError> {
        let mut slots = HashMap::with_capacity(population.len());
        let mut units = Vec::with_capacity(population.len());

        for (index, individual) in population.iter().enumerate() {
            let id = individual.id().ok_or(EvolutionError::Untagged)?;
            if individual.is_evaluated() {
                return Err(DispatchError::AlreadyEvaluated { id }.into());
            }
            if slots.insert(id, index).is_some() {
                return Err(DispatchError::DuplicateSubmission(id).into());
            }
            units.push(WorkUnit {
                id,
                generation,
                genome: individual.genome.clone(),
                params: individual.params().clone(),
            });
        }

        if units.is_empty() {
            return Ok(0);
        }

        let expected = units.len();
        log::debug!(
            "Dispatching {expected} individuals of generation {generation} to {} backend",
            self.backend.name()
        );
        let results = self.backend.map(&self.eval_fn, units);

        let mut seen = HashSet::with_capacity(results.len());
        for (id, evaluation) in &results {
            if !slots.contains_key(id) {
                return Err(DispatchError::UnknownId(*id).into());
            }
            if !seen.insert(*id) {
                return Err(DispatchError::DuplicateResult(*id).into());
            }
            if evaluation.fitness.len() != self.weights.len() {
                return Err(DispatchError::FitnessShape {
                    id: *id,
                    expected: self.weights.len(),
                    got: evaluation.fitness.len(),
                }
                .into());
            }
        }
        if results.is_empty() {
            return Err(DispatchError::NoResults { expected }.into());
        }
        if results.len() != expected {
            return Err(DispatchError::CountMismatch {
                expected,
                received: results.len(),
            }
            .into());
        }

        let mut invalid = 0;
        for (id, evaluation) in results {
            let individual = &mut population[slots[&id]];
            let score = weighted_score(&evaluation.fitness, &self.weights);
            individual.set_evaluation(evaluation.fitness, score, evaluation.output);
            if !individual.is_valid() {
                invalid += 1;
            }
        }

        self.evaluations += expected as u64;
        if invalid > 0 {
            log::info!("Generation {generation}: {invalid} of {expected} evaluations were invalid");
        }

        Ok(invalid)
    }
}
