//! In-memory store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::{PersistenceAdapter, StorageError};

/// Genomes and scores of one stored generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredGeneration {
    pub genomes: Vec<Vec<f64>>,
    pub scores: Vec<f64>,
}

#[derive(Debug, Default)]
struct Inner {
    generations: BTreeMap<usize, StoredGeneration>,
    default_params: BTreeMap<String, f64>,
    flushes: usize,
}

/// Keeps every stored generation in memory.
///
/// Clones share the same storage, so a handle can be kept for analysis
/// after another is moved into the engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A stored generation, if present.
    pub fn generation(&self, index: usize) -> Option<StoredGeneration> {
        self.lock().generations.get(&index).cloned()
    }

    /// Indices of the stored generations in ascending order.
    pub fn generation_indices(&self) -> Vec<usize> {
        self.lock().generations.keys().copied().collect()
    }

    pub fn default_params(&self) -> BTreeMap<String, f64> {
        self.lock().default_params.clone()
    }

    /// Number of times the store was flushed.
    pub fn flush_count(&self) -> usize {
        self.lock().flushes
    }

    /// Scores of every stored generation in order, optionally skipping
    /// generation 0 (the full initial population).
    pub fn scores_during_evolution(&self, drop_first: bool) -> Vec<(usize, Vec<f64>)> {
        self.lock()
            .generations
            .iter()
            .filter(|(index, _)| !(drop_first && **index == 0))
            .map(|(index, generation)| (*index, generation.scores.clone()))
            .collect()
    }
}

impl PersistenceAdapter for MemoryStore {
    fn add_generation(
        &mut self,
        index: usize,
        genomes: &[Vec<f64>],
        scores: &[f64],
    ) -> Result<(), StorageError> {
        self.lock().generations.insert(
            index,
            StoredGeneration {
                genomes: genomes.to_vec(),
                scores: scores.to_vec(),
            },
        );
        Ok(())
    }

    fn add_default_params(&mut self, params: &BTreeMap<String, f64>) -> Result<(), StorageError> {
        self.lock().default_params = params.clone();
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        self.lock().flushes += 1;
        Ok(())
    }
}
