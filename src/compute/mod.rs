//! Compute module - Evaluation worker pools and the evolutionary search.

mod pool;

pub mod evolution;

pub use pool::*;
