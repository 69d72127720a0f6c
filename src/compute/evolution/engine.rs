//! Run controller: owns the population and drives the generational loop.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::compute::{ExecutionBackend, RayonBackend};
use crate::schema::{
    EvolutionConfig, EvolutionPhase, EvolutionProgress, EvolutionResult, EvolutionStats,
    GenerationReport, IndividualSnapshot, ParameterSpace, PopulationRow, finite,
};
use crate::storage::{NullStore, PersistenceAdapter};

use super::generation::{GenerationController, RunContext, persist, summarize};
use super::operators::survival_order;
use super::{
    EvalFn, EvaluationDispatcher, EvolutionError, Genealogy, GenomeRng, History, Individual,
    OperatorSet,
};

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(&EvolutionProgress) + Send + Sync>;

/// Number of individuals listed in [`EvolutionProgress::top`].
const TOP_N: usize = 5;

/// Evolution engine that runs the search.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    space: ParameterSpace,
    operators: OperatorSet,
    dispatcher: EvaluationDispatcher,
    store: Box<dyn PersistenceAdapter>,
    default_params: Option<BTreeMap<String, f64>>,
    ctx: RunContext,
    population: Vec<Individual>,
    history: History,
    genealogy: Genealogy,
    reports: Vec<GenerationReport>,
    phase: EvolutionPhase,
    initial_seconds: f64,
    evolution_seconds: f64,
}

impl EvolutionEngine {
    /// Create a new evolution engine.
    ///
    /// Evaluation runs on a rayon pool sized by `config.evaluation.workers`
    /// and results are discarded unless a store is attached.
    pub fn new(
        config: EvolutionConfig,
        space: ParameterSpace,
        eval_fn: EvalFn,
    ) -> Result<Self, EvolutionError> {
        config.validate()?;
        space.validate()?;

        let seed = config.random_seed.unwrap_or_else(rand::random);
        let backend = RayonBackend::new(config.evaluation.workers)?;
        let operators = OperatorSet::from_config(&config.operators);

        log::info!(
            "Evolution engine: {} parameters, population {} (initial {}), {} generations, seed {seed}",
            space.len(),
            config.population.size,
            config.population.initial_size,
            config.population.generations,
        );
        log::info!("Operators: {operators:?}");
        log::info!(
            "Evaluating on {} backend with {} workers",
            backend.name(),
            backend.workers()
        );

        let dispatcher =
            EvaluationDispatcher::new(Box::new(backend), eval_fn, config.objectives.weights.clone());

        Ok(Self {
            config,
            space,
            operators,
            dispatcher,
            store: Box::new(NullStore),
            default_params: None,
            ctx: RunContext::new(GenomeRng::new(seed)),
            population: Vec::new(),
            history: History::new(),
            genealogy: Genealogy::new(),
            reports: Vec::new(),
            phase: EvolutionPhase::Initializing,
            initial_seconds: 0.0,
            evolution_seconds: 0.0,
        })
    }

    /// Replace the default operators.
    pub fn with_operators(mut self, operators: OperatorSet) -> Self {
        log::info!("Operators: {operators:?}");
        self.operators = operators;
        self
    }

    /// Replace the evaluation worker pool.
    pub fn with_backend(mut self, backend: impl ExecutionBackend + 'static) -> Self {
        log::info!(
            "Evaluating on {} backend with {} workers",
            backend.name(),
            backend.workers()
        );
        self.dispatcher.set_backend(Box::new(backend));
        self
    }

    /// Persist results to `store`.
    pub fn with_store(mut self, store: impl PersistenceAdapter + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    /// Fixed parameters stored alongside the results.
    pub fn with_default_params(mut self, params: BTreeMap<String, f64>) -> Self {
        self.default_params = Some(params);
        self
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn operators(&self) -> &OperatorSet {
        &self.operators
    }

    /// Last completed generation.
    pub fn generation(&self) -> usize {
        self.ctx.generation()
    }

    fn is_initialized(&self) -> bool {
        self.history.get(0).is_some()
    }

    /// Generate, evaluate and reduce the initial population (generation 0).
    ///
    /// The full initial population is persisted; history and genealogy
    /// only see the survivors.
    pub fn run_initial(&mut self) -> Result<(), EvolutionError> {
        if self.is_initialized() {
            return Err(EvolutionError::GenerationAlreadyRecorded(0));
        }
        let start = Instant::now();

        if let Some(params) = &self.default_params {
            self.store.add_default_params(params)?;
        }

        let initial_size = self.config.population.initial_size;
        let mut population: Vec<Individual> = (0..initial_size)
            .map(|_| self.operators.generator().generate(&self.space, self.ctx.rng()))
            .collect();
        self.ctx.tag_all(&mut population, 0, &self.space)?;

        log::info!("Evaluating initial population of {initial_size}");
        let invalid = self.dispatcher.dispatch(&mut population, 0)?;

        let size = self.config.population.size;
        let mut survivors = self
            .operators
            .survivor_selection()
            .select(&population, size);
        if survivors.len() != size {
            return Err(EvolutionError::SurvivorCount {
                expected: size,
                got: survivors.len(),
            });
        }
        persist(self.store.as_mut(), 0, &mut population)?;
        survivors.iter_mut().for_each(Individual::mark_stored);

        self.genealogy.record(0, &survivors);
        self.history.record(0, survivors.clone())?;

        let report = summarize(0, initial_size, 0, invalid, initial_size, &survivors);
        log::info!(
            "Generation 0: best score {:.6}, mean score {:.6}, {} valid",
            report.best_score.unwrap_or(f64::NAN),
            report.mean_score.unwrap_or(f64::NAN),
            report.valid_survivors
        );
        self.reports.push(report);
        self.population = survivors;
        self.phase = EvolutionPhase::Evolving;
        self.initial_seconds += start.elapsed().as_secs_f64();

        Ok(())
    }

    /// Run `generations` more generations, reporting after each one.
    pub fn run_evolution<F>(&mut self, callback: F) -> Result<(), EvolutionError>
    where
        F: Fn(&EvolutionProgress),
    {
        if !self.is_initialized() {
            return Err(EvolutionError::NotInitialized);
        }
        let start = Instant::now();
        self.phase = EvolutionPhase::Evolving;

        for _ in 0..self.config.population.generations {
            let mut controller = GenerationController {
                space: &self.space,
                operators: &self.operators,
                dispatcher: &mut self.dispatcher,
                store: self.store.as_mut(),
                population_size: self.config.population.size,
                max_mutation_retries: self.config.operators.max_mutation_retries,
            };
            let outcome = controller.step(
                &mut self.ctx,
                &self.population,
                &mut self.history,
                &mut self.genealogy,
            )?;

            let report = outcome.report;
            log::info!(
                "Generation {}: best score {:.6} (id {}), mean score {:.6}, {} invalid of {} evaluated",
                report.generation,
                report.best_score.unwrap_or(f64::NAN),
                report.best_id.unwrap_or_default(),
                report.mean_score.unwrap_or(f64::NAN),
                report.invalid_results,
                report.evaluated
            );
            self.population = outcome.population;
            self.reports.push(report);

            callback(&self.progress());
        }

        self.store.flush()?;
        self.phase = EvolutionPhase::Complete;
        self.evolution_seconds += start.elapsed().as_secs_f64();

        if let Some(best) = self.best() {
            log::info!(
                "Best individual {} with score {:.6}: {:?}",
                best.id().unwrap_or_default(),
                best.score().unwrap_or(f64::NAN),
                best.params()
            );
        }

        Ok(())
    }

    /// Run evolution with progress callback.
    ///
    /// Evaluates the initial population on the first call; every call then
    /// runs another `generations` generations.
    pub fn run_with_callback<F>(&mut self, callback: F) -> Result<EvolutionResult, EvolutionError>
    where
        F: Fn(&EvolutionProgress),
    {
        if !self.is_initialized() {
            self.run_initial()?;
            callback(&self.progress());
        }

        self.run_evolution(&callback)?;

        let best = self
            .best()
            .map(Individual::to_snapshot)
            .ok_or(EvolutionError::NotInitialized)?;
        let total_evaluations = self.dispatcher.evaluations();
        let elapsed = self.initial_seconds + self.evolution_seconds;

        Ok(EvolutionResult {
            stats: EvolutionStats {
                generations: self.ctx.generation(),
                total_evaluations,
                best_score: best.score,
                final_mean_score: mean(&self.valid_scores()),
                initial_seconds: self.initial_seconds,
                evolution_seconds: self.evolution_seconds,
                evaluations_per_second: if elapsed > 0.0 {
                    total_evaluations as f64 / elapsed
                } else {
                    0.0
                },
            },
            best,
            reports: self.reports.clone(),
        })
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> Result<EvolutionResult, EvolutionError> {
        self.run_with_callback(|_| {})
    }

    /// Current population in the order survivor selection returned it.
    /// The default [`BestSelection`](super::BestSelection) returns it best first.
    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn genealogy(&self) -> &Genealogy {
        &self.genealogy
    }

    pub fn reports(&self) -> &[GenerationReport] {
        &self.reports
    }

    /// Best individual of the current population. Valid individuals
    /// always rank ahead of invalid ones.
    pub fn best(&self) -> Option<&Individual> {
        self.population.iter().min_by(|a, b| survival_order(a, b))
    }

    /// Scores of the valid individuals in the current population.
    pub fn valid_scores(&self) -> Vec<f64> {
        self.population
            .iter()
            .filter(|ind| ind.is_valid())
            .filter_map(Individual::score)
            .collect()
    }

    /// One row per individual of the current population.
    pub fn population_table(&self) -> Vec<PopulationRow> {
        self.population.iter().map(Individual::to_row).collect()
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        let mut ranked: Vec<&Individual> = self.population.iter().collect();
        ranked.sort_by(|a, b| survival_order(a, b));
        let top: Vec<IndividualSnapshot> = ranked
            .iter()
            .take(TOP_N)
            .map(|ind| ind.to_snapshot())
            .collect();

        EvolutionProgress {
            generation: self.ctx.generation(),
            total_generations: self.config.population.generations,
            evaluations: self.dispatcher.evaluations(),
            best: top.first().cloned(),
            top,
            valid: self.population.iter().filter(|ind| ind.is_valid()).count(),
            reports: self.reports.clone(),
            phase: self.phase,
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        finite(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::SequentialBackend;
    use crate::compute::evolution::{DispatchError, Evaluation, ParentIds, WorkUnit};
    use crate::schema::{EvolutionConfigError, ObjectiveConfig, PopulationConfig};
    use crate::storage::MemoryStore;
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn space() -> ParameterSpace {
        ParameterSpace::new([("x", (-5.0, 5.0)), ("y", (-5.0, 5.0))]).unwrap()
    }

    fn config(initial_size: usize, size: usize, generations: usize) -> EvolutionConfig {
        EvolutionConfig {
            population: PopulationConfig {
                initial_size,
                size,
                generations,
            },
            random_seed: Some(42),
            ..Default::default()
        }
    }

    fn sphere() -> EvalFn {
        Arc::new(|unit: &WorkUnit| {
            let (x, y) = (unit.params["x"], unit.params["y"]);
            Evaluation::new(vec![-(x * x + y * y)])
        })
    }

    fn engine(config: EvolutionConfig, eval_fn: EvalFn) -> EvolutionEngine {
        EvolutionEngine::new(config, space(), eval_fn)
            .unwrap()
            .with_backend(SequentialBackend)
    }

    /// Drops the last result of every batch after the first.
    struct FailsAfterFirst {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl ExecutionBackend for FailsAfterFirst {
        fn map(&self, f: &EvalFn, units: Vec<WorkUnit>) -> Vec<(u64, Evaluation)> {
            let call = self
                .calls
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            let keep = if call == 0 { units.len() } else { units.len() - 1 };
            units.iter().take(keep).map(|u| (u.id, f(u))).collect()
        }

        fn workers(&self) -> usize {
            1
        }

        fn name(&self) -> &str {
            "fails-after-first"
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = EvolutionEngine::new(config(4, 3, 1), space(), sphere()).err();
        assert!(matches!(
            err,
            Some(EvolutionError::Config(EvolutionConfigError::OddPopulation { .. }))
        ));

        let mut cfg = config(4, 4, 1);
        cfg.objectives = ObjectiveConfig { weights: Vec::new() };
        let err = EvolutionEngine::new(cfg, space(), sphere()).err();
        assert!(matches!(
            err,
            Some(EvolutionError::Config(EvolutionConfigError::NoObjectives))
        ));
    }

    #[test]
    fn test_all_valid_initial_generation() {
        let store = MemoryStore::new();
        let mut engine = engine(config(4, 4, 1), sphere()).with_store(store.clone());
        engine.run_initial().unwrap();

        let initial = engine.history().get(0).unwrap();
        assert_eq!(initial.len(), 4);
        assert!(initial.iter().all(Individual::is_valid));
        assert_eq!(engine.population().len(), 4);
        assert_eq!(engine.reports()[0].replaced, 0);
        assert_eq!(engine.reports()[0].valid_survivors, 4);
        assert_eq!(store.generation(0).unwrap().genomes.len(), 4);
    }

    #[test]
    fn test_initial_population_persisted_in_full() {
        let store = MemoryStore::new();
        let mut engine = engine(config(8, 4, 1), sphere()).with_store(store.clone());
        engine.run_initial().unwrap();

        assert_eq!(store.generation(0).unwrap().genomes.len(), 8);
        assert_eq!(engine.history().get(0).unwrap().len(), 4);
        assert_eq!(engine.population().len(), 4);
        assert_eq!(engine.genealogy().len(), 4);

        // Survivors are the best of the initial population
        let scores = store.generation(0).unwrap().scores;
        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| b.total_cmp(a));
        let survivor_scores = engine.valid_scores();
        assert_eq!(survivor_scores, sorted[..4].to_vec());
    }

    #[test]
    fn test_invalid_individuals_replaced_with_fresh_ones() {
        let eval: EvalFn = Arc::new(|unit: &WorkUnit| {
            if unit.id < 2 {
                Evaluation::new(vec![f64::NAN])
            } else {
                Evaluation::new(vec![-unit.genome[0].abs()])
            }
        });
        let mut engine = engine(config(4, 4, 1), eval);
        engine.run_initial().unwrap();
        assert_eq!(engine.valid_scores().len(), 2);

        engine.run_evolution(|_| {}).unwrap();
        let report = &engine.reports()[1];
        assert_eq!(report.replaced, 2);
        assert_eq!(report.evaluated, 4 + 2);
        assert_eq!(report.candidates, 2 + 4 + 2);

        let generation_one = engine.history().get(1).unwrap();
        assert_eq!(generation_one.len(), 8);
        let fresh = generation_one
            .iter()
            .filter(|ind| ind.generation() == Some(1) && ind.parent_ids() == ParentIds::None)
            .count();
        assert_eq!(fresh, 2);
        assert!(generation_one.iter().all(|ind| ind.id() > Some(1)));
    }

    #[test]
    fn test_short_result_batch_aborts_without_persisting() {
        let store = MemoryStore::new();
        let mut engine = engine(config(4, 4, 3), sphere())
            .with_backend(FailsAfterFirst {
                calls: Default::default(),
            })
            .with_store(store.clone());
        engine.run_initial().unwrap();
        let before: Vec<_> = engine.population().iter().map(Individual::id).collect();

        let err = engine.run_evolution(|_| {}).unwrap_err();
        assert!(matches!(
            err,
            EvolutionError::Dispatch(DispatchError::CountMismatch {
                expected: 4,
                received: 3
            })
        ));
        assert!(store.generation(1).is_none());
        assert!(engine.history().get(1).is_none());
        assert_eq!(engine.generation(), 0);
        let after: Vec<_> = engine.population().iter().map(Individual::id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_run_improves_and_reports() {
        let store = MemoryStore::new();
        let mut engine = engine(config(40, 20, 15), sphere()).with_store(store.clone());
        let calls = Cell::new(0);
        let result = engine
            .run_with_callback(|progress| {
                calls.set(calls.get() + 1);
                assert!(progress.top.len() <= TOP_N);
            })
            .unwrap();

        // One report after the initial population plus one per generation
        assert_eq!(calls.get(), 16);
        assert_eq!(result.stats.generations, 15);
        assert_eq!(result.reports.len(), 16);
        assert_eq!(result.stats.total_evaluations, 40 + 15 * 20);
        assert!(result.best.score.unwrap() >= result.reports[0].best_score.unwrap());
        assert_eq!(engine.progress().phase, EvolutionPhase::Complete);
        assert_eq!(store.flush_count(), 1);
        assert_eq!(store.scores_during_evolution(true).len(), 15);
        assert_eq!(engine.history().len(), 16);
    }

    #[test]
    fn test_ids_unique_and_parents_known() {
        let mut engine = engine(config(10, 10, 6), sphere());
        engine.run().unwrap();

        let mut seen = HashSet::new();
        let mut earlier: HashSet<u64> = HashSet::new();
        for (generation, population) in engine.history().iter() {
            let mut current = Vec::new();
            for ind in population {
                let id = ind.id().unwrap();
                if ind.generation() == Some(generation) {
                    assert!(seen.insert(id));
                    for parent in ind.parent_ids().to_vec() {
                        assert!(earlier.contains(&parent));
                    }
                }
                current.push(id);
            }
            earlier.extend(current);
        }

        let rebuilt = Genealogy::from_history(engine.history()).export();
        let recorded = engine.genealogy().export();
        assert_eq!(rebuilt.edges, recorded.edges);
        assert_eq!(rebuilt.generations, recorded.generations);
        assert_eq!(rebuilt.scores, recorded.scores);

        for ind in engine.population() {
            let id = ind.id().unwrap();
            for ancestor in engine.genealogy().ancestors(id) {
                assert!(engine.genealogy().generation_of(ancestor) < ind.generation());
            }
        }
    }

    #[test]
    fn test_all_invalid_result_survives_json() {
        let eval: EvalFn = Arc::new(|_: &WorkUnit| Evaluation::new(vec![f64::NAN]));
        let mut engine = engine(config(4, 4, 1), eval);
        let result = engine.run().unwrap();

        assert_eq!(result.best.fitness, vec![None]);
        assert_eq!(result.stats.final_mean_score, None);
        assert_eq!(result.reports[1].mean_score, None);

        let json = serde_json::to_string(&result).unwrap();
        let parsed: EvolutionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.best.fitness, vec![None]);
        assert_eq!(parsed.best.score, result.best.score);
        assert_eq!(parsed.reports.len(), 2);
    }

    #[test]
    fn test_run_again_continues() {
        let mut engine = engine(config(4, 4, 2), sphere());
        engine.run().unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.stats.generations, 4);
        assert_eq!(engine.history().len(), 5);
    }

    #[test]
    fn test_evolution_requires_initial_population() {
        let mut engine = engine(config(4, 4, 1), sphere());
        let err = engine.run_evolution(|_| {}).unwrap_err();
        assert!(matches!(err, EvolutionError::NotInitialized));

        engine.run_initial().unwrap();
        let err = engine.run_initial().unwrap_err();
        assert!(matches!(err, EvolutionError::GenerationAlreadyRecorded(0)));
    }

    #[test]
    fn test_seed_reproducible() {
        let run = || {
            let mut engine = engine(config(8, 4, 3), sphere());
            engine.run().unwrap();
            engine
                .population()
                .iter()
                .map(|ind| ind.genome.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_default_params_and_table() {
        let store = MemoryStore::new();
        let params = BTreeMap::from([("dt".to_string(), 0.1)]);
        let mut engine = engine(config(4, 4, 1), sphere())
            .with_store(store.clone())
            .with_default_params(params.clone());
        engine.run().unwrap();

        assert_eq!(store.default_params(), params);
        let table = engine.population_table();
        assert_eq!(table.len(), 4);
        assert!(table.iter().all(|row| row.params.contains_key("x")));
        let ids: Vec<_> = engine.population().iter().filter_map(Individual::id).collect();
        assert_eq!(table.iter().map(|row| row.id).collect::<Vec<_>>(), ids);
        let best = engine.best().and_then(Individual::id).unwrap();
        assert!(ids.contains(&best));
    }
}
