//! Evolution operators: individual generation, parent selection, mating,
//! mutation and survivor selection.
//!
//! Each operator kind is a trait so callers can swap in their own
//! implementation; [`OperatorSet`] bundles one of each. Operators are pure
//! over their inputs: they take individuals by reference or by value and
//! return new ones, never touching the population they were drawn from.

use std::cmp::Ordering;
use std::fmt;

use crate::schema::{
    MatingMethod, MutationMethod, OperatorConfig, ParameterSpace, ParentSelectionMethod,
    SurvivorSelectionMethod,
};

use super::{EvolutionError, GenomeRng, Individual};

/// Creates fresh random individuals.
pub trait IndividualGenerator: Send + Sync {
    fn generate(&self, space: &ParameterSpace, rng: &mut GenomeRng) -> Individual;

    fn name(&self) -> &str;
}

/// Chooses `k` parents (as clones) from a population.
pub trait ParentSelection: Send + Sync {
    fn select(&self, population: &[Individual], k: usize, rng: &mut GenomeRng)
    -> Vec<Individual>;

    fn name(&self) -> &str;
}

/// Recombines two parents into two children.
pub trait Mating: Send + Sync {
    fn mate(
        &self,
        first: Individual,
        second: Individual,
        rng: &mut GenomeRng,
    ) -> (Individual, Individual);

    fn name(&self) -> &str;
}

/// Perturbs one individual.
pub trait Mutation: Send + Sync {
    fn mutate(
        &self,
        individual: Individual,
        space: &ParameterSpace,
        rng: &mut GenomeRng,
    ) -> Individual;

    fn name(&self) -> &str;
}

/// Chooses the `k` individuals that form the next population.
pub trait SurvivorSelection: Send + Sync {
    fn select(&self, population: &[Individual], k: usize) -> Vec<Individual>;

    fn name(&self) -> &str;
}

// ============================================================================
// Defaults
// ============================================================================

/// Genes drawn uniformly within bounds; step sizes start at a third of each
/// parameter's range.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformGenerator;

impl IndividualGenerator for UniformGenerator {
    fn generate(&self, space: &ParameterSpace, rng: &mut GenomeRng) -> Individual {
        let genome = space
            .parameters()
            .iter()
            .map(|p| rng.uniform(p.lower, p.upper))
            .collect();
        Individual::new(genome, initial_step_sizes(space))
    }

    fn name(&self) -> &str {
        "UniformGenerator"
    }
}

/// Initial self-adaptive step sizes for a space.
pub fn initial_step_sizes(space: &ParameterSpace) -> Vec<f64> {
    space.parameters().iter().map(|p| p.range() / 3.0).collect()
}

/// Linear rank selection.
///
/// Individuals are ranked by ascending score (rank 0 is the worst) and drawn
/// with replacement with probability proportional to
/// `2 - s + 2 (s - 1) rank / (n - 1)`.
#[derive(Debug, Clone, Copy)]
pub struct RankSelection {
    pub s: f64,
}

impl Default for RankSelection {
    fn default() -> Self {
        Self { s: 1.5 }
    }
}

impl RankSelection {
    /// Selection weight of each rank for a population of `n`.
    pub fn rank_weights(&self, n: usize) -> Vec<f64> {
        if n < 2 {
            return vec![1.0; n];
        }
        let s = self.s;
        (0..n)
            .map(|rank| 2.0 - s + 2.0 * (s - 1.0) * rank as f64 / (n - 1) as f64)
            .collect()
    }
}

impl ParentSelection for RankSelection {
    fn select(
        &self,
        population: &[Individual],
        k: usize,
        rng: &mut GenomeRng,
    ) -> Vec<Individual> {
        if population.is_empty() {
            return Vec::new();
        }

        let mut order: Vec<usize> = (0..population.len()).collect();
        order.sort_by(|&a, &b| score_key(&population[a]).total_cmp(&score_key(&population[b])));

        let weights = self.rank_weights(order.len());
        rng.weighted_indices(&weights, k)
            .into_iter()
            .map(|rank| population[order[rank]].clone())
            .collect()
    }

    fn name(&self) -> &str {
        "RankSelection"
    }
}

/// Tournament selection: best score out of `size` uniform draws.
#[derive(Debug, Clone, Copy)]
pub struct TournamentSelection {
    pub size: usize,
}

impl ParentSelection for TournamentSelection {
    fn select(
        &self,
        population: &[Individual],
        k: usize,
        rng: &mut GenomeRng,
    ) -> Vec<Individual> {
        if population.is_empty() {
            return Vec::new();
        }

        (0..k)
            .map(|_| {
                let mut best_idx = rng.index(population.len());
                for _ in 1..self.size.max(1) {
                    let idx = rng.index(population.len());
                    if score_key(&population[idx]) > score_key(&population[best_idx]) {
                        best_idx = idx;
                    }
                }
                population[best_idx].clone()
            })
            .collect()
    }

    fn name(&self) -> &str {
        "TournamentSelection"
    }
}

/// Blend crossover (BLX-alpha).
///
/// For each gene pair `(x, y)` every child draws independently from
/// `[min - alpha |x - y|, max + alpha |x - y|]`, which allows mild
/// extrapolation beyond the parents. Step sizes are drawn between the
/// parents' step sizes without extrapolation so they stay positive.
#[derive(Debug, Clone, Copy)]
pub struct BlendCrossover {
    pub alpha: f64,
}

impl Default for BlendCrossover {
    fn default() -> Self {
        Self { alpha: 0.5 }
    }
}

impl Mating for BlendCrossover {
    fn mate(
        &self,
        mut first: Individual,
        mut second: Individual,
        rng: &mut GenomeRng,
    ) -> (Individual, Individual) {
        let genes = first.genome.len().min(second.genome.len());
        for i in 0..genes {
            let (x, y) = (first.genome[i], second.genome[i]);
            first.genome[i] = blend(x, y, self.alpha, rng);
            second.genome[i] = blend(x, y, self.alpha, rng);
        }

        let steps = first.step_sizes.len().min(second.step_sizes.len());
        for i in 0..steps {
            let (x, y) = (first.step_sizes[i], second.step_sizes[i]);
            first.step_sizes[i] = blend(x, y, 0.0, rng);
            second.step_sizes[i] = blend(x, y, 0.0, rng);
        }

        (first, second)
    }

    fn name(&self) -> &str {
        "BlendCrossover"
    }
}

/// Draw one blended gene.
fn blend(x: f64, y: f64, alpha: f64, rng: &mut GenomeRng) -> f64 {
    let (lower, upper) = if x <= y { (x, y) } else { (y, x) };
    let spread = alpha * (upper - lower);
    rng.uniform(
        (lower - spread).max(f64::MIN),
        (upper + spread).min(f64::MAX),
    )
}

/// Self-adaptive Gaussian mutation with n step sizes (Eiben & Smith p.60).
///
/// `N0 = tau' N(0,1)` is shared by all genes; each gene then updates
/// `sigma_i = max(sigma_i exp(N0 + tau N_i(0,1)), eps)` and
/// `x_i += sigma_i N(0,1)`.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveGaussianMutation {
    pub global_learning_rate: Option<f64>,
    pub learning_rate: Option<f64>,
    pub min_step_size: f64,
}

impl Default for AdaptiveGaussianMutation {
    fn default() -> Self {
        Self {
            global_learning_rate: None,
            learning_rate: None,
            min_step_size: 0.01,
        }
    }
}

impl Mutation for AdaptiveGaussianMutation {
    fn mutate(
        &self,
        mut individual: Individual,
        space: &ParameterSpace,
        rng: &mut GenomeRng,
    ) -> Individual {
        let n = individual.genome.len();
        if n == 0 {
            return individual;
        }
        if individual.step_sizes.len() != n {
            individual.step_sizes = initial_step_sizes(space);
            individual.step_sizes.resize(n, self.min_step_size);
        }

        let n_f = n as f64;
        let tau_global = self
            .global_learning_rate
            .unwrap_or_else(|| 1.0 / (2.0 * n_f).sqrt());
        let tau = self
            .learning_rate
            .unwrap_or_else(|| 1.0 / (2.0 * n_f.sqrt()).sqrt());

        let common = tau_global * rng.standard_normal();
        for (gene, step) in individual
            .genome
            .iter_mut()
            .zip(individual.step_sizes.iter_mut())
        {
            let sigma =
                (*step * (common + tau * rng.standard_normal()).exp()).max(self.min_step_size);
            *step = sigma;
            *gene += sigma * rng.standard_normal();
        }

        individual
    }

    fn name(&self) -> &str {
        "AdaptiveGaussianMutation"
    }
}

/// Best-score truncation.
///
/// Valid individuals rank ahead of invalid ones, then higher scores first;
/// the sort is stable so ties keep insertion order. Invalid individuals only
/// survive when there are fewer than `k` valid ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestSelection;

impl SurvivorSelection for BestSelection {
    fn select(&self, population: &[Individual], k: usize) -> Vec<Individual> {
        let mut ranked: Vec<&Individual> = population.iter().collect();
        ranked.sort_by(|a, b| survival_order(a, b));
        ranked.into_iter().take(k).cloned().collect()
    }

    fn name(&self) -> &str {
        "BestSelection"
    }
}

/// Ordering used for survival: `Less` means `a` survives before `b`.
pub(crate) fn survival_order(a: &Individual, b: &Individual) -> Ordering {
    b.is_valid()
        .cmp(&a.is_valid())
        .then_with(|| score_key(b).total_cmp(&score_key(a)))
}

fn score_key(individual: &Individual) -> f64 {
    individual.score().unwrap_or(f64::NEG_INFINITY)
}

/// Mutate a clone of `individual` until its genome lies within the
/// parameter bounds, restarting from the unmutated individual on every
/// attempt.
pub fn mutate_until_valid(
    individual: Individual,
    space: &ParameterSpace,
    mutation: &dyn Mutation,
    rng: &mut GenomeRng,
    max_attempts: usize,
) -> Result<Individual, EvolutionError> {
    for attempt in 1..=max_attempts {
        let candidate = mutation.mutate(individual.clone(), space, rng);
        if space.contains(&candidate.genome) {
            if attempt > 1 {
                log::debug!("Mutation landed within bounds after {attempt} attempts");
            }
            return Ok(candidate);
        }
    }

    Err(EvolutionError::MutationRetriesExhausted {
        retries: max_attempts,
        genome: individual.genome,
    })
}

// ============================================================================
// Operator set
// ============================================================================

/// One operator of each kind.
pub struct OperatorSet {
    generator: Box<dyn IndividualGenerator>,
    parent_selection: Box<dyn ParentSelection>,
    mating: Box<dyn Mating>,
    mutation: Box<dyn Mutation>,
    survivor_selection: Box<dyn SurvivorSelection>,
}

impl OperatorSet {
    /// Build the operators described by a configuration.
    pub fn from_config(config: &OperatorConfig) -> Self {
        let parent_selection: Box<dyn ParentSelection> = match config.parent_selection {
            ParentSelectionMethod::Rank { s } => Box::new(RankSelection { s }),
            ParentSelectionMethod::Tournament { size } => Box::new(TournamentSelection { size }),
        };

        let mating: Box<dyn Mating> = match config.mating {
            MatingMethod::Blend { alpha } => Box::new(BlendCrossover { alpha }),
        };

        let mutation: Box<dyn Mutation> = match config.mutation {
            MutationMethod::AdaptiveGaussian {
                global_learning_rate,
                learning_rate,
                min_step_size,
            } => Box::new(AdaptiveGaussianMutation {
                global_learning_rate,
                learning_rate,
                min_step_size,
            }),
        };

        let survivor_selection: Box<dyn SurvivorSelection> = match config.survivor_selection {
            SurvivorSelectionMethod::Best => Box::new(BestSelection),
        };

        Self {
            generator: Box::new(UniformGenerator),
            parent_selection,
            mating,
            mutation,
            survivor_selection,
        }
    }

    pub fn with_generator(mut self, generator: impl IndividualGenerator + 'static) -> Self {
        self.generator = Box::new(generator);
        self
    }

    pub fn with_parent_selection(mut self, selection: impl ParentSelection + 'static) -> Self {
        self.parent_selection = Box::new(selection);
        self
    }

    pub fn with_mating(mut self, mating: impl Mating + 'static) -> Self {
        self.mating = Box::new(mating);
        self
    }

    pub fn with_mutation(mut self, mutation: impl Mutation + 'static) -> Self {
        self.mutation = Box::new(mutation);
        self
    }

    pub fn with_survivor_selection(mut self, selection: impl SurvivorSelection + 'static) -> Self {
        self.survivor_selection = Box::new(selection);
        self
    }

    pub fn generator(&self) -> &dyn IndividualGenerator {
        self.generator.as_ref()
    }

    pub fn parent_selection(&self) -> &dyn ParentSelection {
        self.parent_selection.as_ref()
    }

    pub fn mating(&self) -> &dyn Mating {
        self.mating.as_ref()
    }

    pub fn mutation(&self) -> &dyn Mutation {
        self.mutation.as_ref()
    }

    pub fn survivor_selection(&self) -> &dyn SurvivorSelection {
        self.survivor_selection.as_ref()
    }
}

impl Default for OperatorSet {
    fn default() -> Self {
        Self::from_config(&OperatorConfig::default())
    }
}

impl fmt::Debug for OperatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorSet")
            .field("generator", &self.generator.name())
            .field("parent_selection", &self.parent_selection.name())
            .field("mating", &self.mating.name())
            .field("mutation", &self.mutation.name())
            .field("survivor_selection", &self.survivor_selection.name())
            .finish()
    }
}
