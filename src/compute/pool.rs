//! Worker pools that run the evaluation function over a batch of work units.

use rayon::prelude::*;

use super::evolution::{EvalFn, Evaluation, WorkUnit};

/// Runs an evaluation function over a batch of work units.
///
/// Results are returned keyed by work unit id; their order is not
/// significant.
pub trait ExecutionBackend: Send + Sync {
    fn map(&self, f: &EvalFn, units: Vec<WorkUnit>) -> Vec<(u64, Evaluation)>;

    /// Number of worker threads.
    fn workers(&self) -> usize;

    fn name(&self) -> &str;
}

/// Dedicated rayon thread pool.
pub struct RayonBackend {
    pool: rayon::ThreadPool,
}

impl RayonBackend {
    /// Build a pool with `workers` threads; `0` uses the available
    /// hardware parallelism.
    pub fn new(workers: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            workers
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("evaluator-{i}"))
            .build()?;

        Ok(Self { pool })
    }
}

impl ExecutionBackend for RayonBackend {
    fn map(&self, f: &EvalFn, units: Vec<WorkUnit>) -> Vec<(u64, Evaluation)> {
        self.pool.install(|| {
            units
                .into_par_iter()
                .map(|unit| (unit.id, f(&unit)))
                .collect()
        })
    }

    fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn name(&self) -> &str {
        "rayon"
    }
}

/// Evaluates on the calling thread, in submission order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialBackend;

impl ExecutionBackend for SequentialBackend {
    fn map(&self, f: &EvalFn, units: Vec<WorkUnit>) -> Vec<(u64, Evaluation)> {
        units.into_iter().map(|unit| (unit.id, f(&unit))).collect()
    }

    fn workers(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "sequential"
    }
}
