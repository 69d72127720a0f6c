//! Lineage tracking across generations.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::{History, Individual, ParentIds};

/// Parent links, generations and scores of every recorded individual.
///
/// Append-only: the first record of an id wins, and since ids are never
/// reused every later record of the same id carries the same data.
#[derive(Debug, Clone, Default)]
pub struct Genealogy {
    parents: BTreeMap<u64, ParentIds>,
    generations: BTreeMap<u64, usize>,
    scores: BTreeMap<u64, f64>,
}

/// Serializable view of a genealogy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenealogyExport {
    /// `(parent, child)` pairs.
    pub edges: Vec<(u64, u64)>,
    pub generations: BTreeMap<u64, usize>,
    pub scores: BTreeMap<u64, f64>,
}

impl Genealogy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a run history.
    pub fn from_history(history: &History) -> Self {
        let mut genealogy = Self::new();
        for (generation, population) in history.iter() {
            genealogy.record(generation, population);
        }
        genealogy
    }

    /// Record a population. Untagged individuals are skipped.
    pub fn record(&mut self, generation: usize, population: &[Individual]) {
        for individual in population {
            let Some(id) = individual.id() else {
                continue;
            };
            self.parents.entry(id).or_insert(individual.parent_ids());
            self.generations
                .entry(id)
                .or_insert(individual.generation().unwrap_or(generation));
            if let Some(score) = individual.score() {
                self.scores.entry(id).or_insert(score);
            }
        }
    }

    /// Number of recorded individuals.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.parents.contains_key(&id)
    }

    pub fn parents(&self, id: u64) -> Option<ParentIds> {
        self.parents.get(&id).copied()
    }

    pub fn generation_of(&self, id: u64) -> Option<usize> {
        self.generations.get(&id).copied()
    }

    pub fn score_of(&self, id: u64) -> Option<f64> {
        self.scores.get(&id).copied()
    }

    /// Every ancestor of `id`, nearest first, each listed once.
    pub fn ancestors(&self, id: u64) -> Vec<u64> {
        let mut seen = BTreeSet::from([id]);
        let mut queue = VecDeque::from([id]);
        let mut ancestors = Vec::new();

        while let Some(current) = queue.pop_front() {
            let Some(parents) = self.parents.get(&current) else {
                continue;
            };
            for parent in parents.to_vec() {
                if seen.insert(parent) {
                    ancestors.push(parent);
                    queue.push_back(parent);
                }
            }
        }

        ancestors
    }

    /// Individuals recorded without parents.
    pub fn roots(&self) -> Vec<u64> {
        self.parents
            .iter()
            .filter(|(_, parents)| parents.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Individuals that list `id` as a parent.
    pub fn children(&self, id: u64) -> Vec<u64> {
        self.parents
            .iter()
            .filter(|(_, parents)| parents.to_vec().contains(&id))
            .map(|(child, _)| *child)
            .collect()
    }

    pub fn export(&self) -> GenealogyExport {
        let edges = self
            .parents
            .iter()
            .flat_map(|(child, parents)| {
                parents
                    .to_vec()
                    .into_iter()
                    .map(move |parent| (parent, *child))
            })
            .collect();

        GenealogyExport {
            edges,
            generations: self.generations.clone(),
            scores: self.scores.clone(),
        }
    }
}
