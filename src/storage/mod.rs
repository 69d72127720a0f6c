//! Persistence of per-generation genomes and scores.
//!
//! The engine only writes through [`PersistenceAdapter`]; it never reads a
//! store back during a run.

mod jsonl;
mod memory;

use std::collections::BTreeMap;
use std::io;

pub use jsonl::{JsonLinesStore, StoreRecord};
pub use memory::{MemoryStore, StoredGeneration};

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Sink for run results.
pub trait PersistenceAdapter: Send {
    /// Store the genomes and scores of one generation.
    ///
    /// `scores[i]` belongs to `genomes[i]`; unevaluated individuals are
    /// reported as NaN.
    fn add_generation(
        &mut self,
        index: usize,
        genomes: &[Vec<f64>],
        scores: &[f64],
    ) -> Result<(), StorageError>;

    /// Store the fixed parameters the search runs against.
    fn add_default_params(&mut self, params: &BTreeMap<String, f64>) -> Result<(), StorageError>;

    fn flush(&mut self) -> Result<(), StorageError>;
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl PersistenceAdapter for NullStore {
    fn add_generation(&mut self, _: usize, _: &[Vec<f64>], _: &[f64]) -> Result<(), StorageError> {
        Ok(())
    }

    fn add_default_params(&mut self, _: &BTreeMap<String, f64>) -> Result<(), StorageError> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}
