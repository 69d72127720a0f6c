//! Individuals: a genome plus identity, lineage and fitness metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::{IndividualSnapshot, ParameterSpace, PopulationRow, finite};

use super::EvolutionError;

/// Immediate ancestors of an individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParentIds {
    /// Random initial or replacement individual.
    #[default]
    None,
    /// Carried through without a mate.
    One(u64),
    /// Produced by mating.
    Two(u64, u64),
}

impl ParentIds {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn to_vec(&self) -> Vec<u64> {
        match *self {
            Self::None => Vec::new(),
            Self::One(a) => vec![a],
            Self::Two(a, b) => vec![a, b],
        }
    }
}

/// A candidate parameter vector.
///
/// The genome is fixed once the individual is tagged; identity is assigned
/// exactly once by [`Individual::tag`] and fitness exactly once by evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Individual {
    /// Gene values, one per parameter of the space.
    pub genome: Vec<f64>,
    /// Self-adaptive mutation step size per gene.
    pub step_sizes: Vec<f64>,
    id: Option<u64>,
    generation: Option<usize>,
    parent_ids: ParentIds,
    params: BTreeMap<String, f64>,
    fitness: Option<Vec<f64>>,
    score: Option<f64>,
    output: Option<serde_json::Value>,
    simulation_stored: bool,
}

impl Individual {
    /// Create an untagged, unevaluated individual.
    pub fn new(genome: Vec<f64>, step_sizes: Vec<f64>) -> Self {
        Self {
            genome,
            step_sizes,
            ..Default::default()
        }
    }

    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn generation(&self) -> Option<usize> {
        self.generation
    }

    pub fn parent_ids(&self) -> ParentIds {
        self.parent_ids
    }

    /// Named parameter values, available after tagging.
    pub fn params(&self) -> &BTreeMap<String, f64> {
        &self.params
    }

    /// Named parameter value, available after tagging.
    pub fn param(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }

    pub fn fitness(&self) -> Option<&[f64]> {
        self.fitness.as_deref()
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// Opaque payload returned by the evaluation function.
    pub fn output(&self) -> Option<&serde_json::Value> {
        self.output.as_ref()
    }

    /// Whether this individual's generation has been handed to persistence.
    pub fn simulation_stored(&self) -> bool {
        self.simulation_stored
    }

    pub fn is_tagged(&self) -> bool {
        self.id.is_some()
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    /// True iff fitness is set and has no NaN/Inf component.
    pub fn is_valid(&self) -> bool {
        self.fitness
            .as_ref()
            .is_some_and(|f| f.iter().all(|v| v.is_finite()))
    }

    /// Assign identity and materialize named parameters.
    pub fn tag(
        &mut self,
        id: u64,
        generation: usize,
        space: &ParameterSpace,
    ) -> Result<(), EvolutionError> {
        if let Some(existing) = self.id {
            return Err(EvolutionError::AlreadyTagged { id: existing });
        }
        self.id = Some(id);
        self.generation = Some(generation);
        self.simulation_stored = false;
        self.params = space.decode(&self.genome);
        Ok(())
    }

    /// Drop fitness state copied from a parent.
    pub fn clear_fitness(&mut self) {
        self.fitness = None;
        self.score = None;
        self.output = None;
    }

    /// Drop identity copied from a parent so the individual can be re-tagged.
    pub(crate) fn clear_identity(&mut self) {
        self.id = None;
        self.generation = None;
        self.params.clear();
        self.simulation_stored = false;
    }

    pub(crate) fn set_parents(&mut self, parents: ParentIds) {
        self.parent_ids = parents;
    }

    pub(crate) fn set_evaluation(
        &mut self,
        fitness: Vec<f64>,
        score: f64,
        output: serde_json::Value,
    ) {
        self.fitness = Some(fitness);
        self.score = Some(score);
        self.output = Some(output);
    }

    pub(crate) fn mark_stored(&mut self) {
        self.simulation_stored = true;
    }

    /// Convert to snapshot for reporting.
    ///
    /// Untagged or unevaluated fields are reported as 0 / empty / NaN.
    pub fn to_snapshot(&self) -> IndividualSnapshot {
        IndividualSnapshot {
            id: self.id.unwrap_or_default(),
            generation: self.generation.unwrap_or_default(),
            parents: self.parent_ids.to_vec(),
            params: self.params.clone(),
            fitness: self.finite_fitness(),
            score: self.score.and_then(finite),
            valid: self.is_valid(),
        }
    }

    pub(crate) fn to_row(&self) -> PopulationRow {
        PopulationRow {
            id: self.id.unwrap_or_default(),
            params: self.params.clone(),
            score: self.score.and_then(finite),
            fitness: self.finite_fitness(),
        }
    }

    fn finite_fitness(&self) -> Vec<Option<f64>> {
        self.fitness
            .iter()
            .flatten()
            .map(|&value| finite(value))
            .collect()
    }
}

/// Weighted score: mean of `fitness[i] * weights[i]` over all objectives,
/// with non-finite products counted as zero.
pub fn weighted_score(fitness: &[f64], weights: &[f64]) -> f64 {
    if weights.is_empty() {
        return 0.0;
    }
    let sum: f64 = fitness
        .iter()
        .zip(weights)
        .map(|(f, w)| f * w)
        .filter(|v| v.is_finite())
        .sum();
    sum / weights.len() as f64
}
