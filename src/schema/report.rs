//! Progress and result types handed to reporting code.
//!
//! These are read-only snapshots: nothing in them refers back into the engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `Some(value)` if `value` is finite. JSON has no NaN or infinity, so
/// report fields that may hold them are optional.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Snapshot of an individual for reporting and serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndividualSnapshot {
    /// Unique identifier.
    pub id: u64,
    /// Generation the individual was created in.
    pub generation: usize,
    /// Parent IDs (for genealogy).
    pub parents: Vec<u64>,
    /// Decoded named parameters.
    pub params: BTreeMap<String, f64>,
    /// Raw fitness vector; non-finite values are `None`.
    pub fitness: Vec<Option<f64>>,
    /// Weighted score, `None` before evaluation.
    pub score: Option<f64>,
    /// Whether every fitness component is finite.
    pub valid: bool,
}

/// Summary of one completed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Generation index.
    pub generation: usize,
    /// Individuals submitted for evaluation.
    pub evaluated: usize,
    /// Invalid individuals from the previous population that were replaced.
    pub replaced: usize,
    /// Newly evaluated individuals that came back invalid.
    pub invalid_results: usize,
    /// Size of the candidate pool survivor selection chose from.
    pub candidates: usize,
    /// Valid individuals among the survivors.
    pub valid_survivors: usize,
    /// Best surviving individual.
    pub best_id: Option<u64>,
    /// Best surviving score.
    pub best_score: Option<f64>,
    /// Mean score of valid survivors, `None` if none are valid.
    pub mean_score: Option<f64>,
}

/// One row of the population table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationRow {
    pub id: u64,
    pub params: BTreeMap<String, f64>,
    pub score: Option<f64>,
    pub fitness: Vec<Option<f64>>,
}

/// Current phase of the run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EvolutionPhase {
    /// Initial population not evaluated yet.
    #[default]
    Initializing,
    /// Generational loop in progress.
    Evolving,
    /// Last requested generation finished.
    Complete,
}

/// Progress update for live reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Last completed generation.
    pub generation: usize,
    /// Generations requested per run.
    pub total_generations: usize,
    /// Evaluations performed so far.
    pub evaluations: u64,
    /// Best individual of the current population.
    pub best: Option<IndividualSnapshot>,
    /// Top N individuals for display.
    pub top: Vec<IndividualSnapshot>,
    /// Valid individuals in the current population.
    pub valid: usize,
    /// Per-generation summaries so far.
    pub reports: Vec<GenerationReport>,
    /// Current phase.
    pub phase: EvolutionPhase,
}

/// Final result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Best individual of the final population.
    pub best: IndividualSnapshot,
    /// Statistics from the run.
    pub stats: EvolutionStats,
    /// Per-generation summaries, including the initial generation.
    pub reports: Vec<GenerationReport>,
}

/// Statistics from a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations completed after the initial one.
    pub generations: usize,
    /// Total evaluations performed.
    pub total_evaluations: u64,
    /// Best score of the final population.
    pub best_score: Option<f64>,
    /// Mean score of the valid final population.
    pub final_mean_score: Option<f64>,
    /// Time spent on the initial population (seconds).
    pub initial_seconds: f64,
    /// Time spent in the generational loop (seconds).
    pub evolution_seconds: f64,
    /// Evaluations per second over the whole run.
    pub evaluations_per_second: f64,
}
