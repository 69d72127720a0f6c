//! Error types for evolution runs.

use crate::schema::{EvolutionConfigError, ParameterSpaceError};
use crate::storage::StorageError;

use super::dispatch::DispatchError;

/// Errors that abort an evolution run.
///
/// Invalid (NaN/Inf) fitness values are not errors; they are handled by the
/// generation loop.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Configuration error: {0}")]
    Config(#[from] EvolutionConfigError),
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Failed to build evaluation worker pool: {0}")]
    Backend(#[from] rayon::ThreadPoolBuildError),
    #[error("Individual already has id {id}, refusing to overwrite it")]
    AlreadyTagged { id: u64 },
    #[error("Individual has not been tagged with an id")]
    Untagged,
    #[error("Mutation did not produce a genome within bounds after {retries} attempts")]
    MutationRetriesExhausted { retries: usize, genome: Vec<f64> },
    #[error("Survivor selection returned {got} individuals, expected {expected}")]
    SurvivorCount { expected: usize, got: usize },
    #[error("Generation {0} is already recorded in the history")]
    GenerationAlreadyRecorded(usize),
    #[error("Initial population has not been evaluated yet")]
    NotInitialized,
}

impl From<ParameterSpaceError> for EvolutionError {
    fn from(err: ParameterSpaceError) -> Self {
        Self::Config(EvolutionConfigError::from(err))
    }
}
