//! One generational step: replace invalid individuals, breed offspring,
//! evaluate, record and select survivors.

use std::collections::BTreeMap;

use crate::schema::{GenerationReport, ParameterSpace, finite};
use crate::storage::PersistenceAdapter;

use super::operators::{OperatorSet, mutate_until_valid, survival_order};
use super::{EvaluationDispatcher, EvolutionError, Genealogy, GenomeRng, Individual, ParentIds};

/// Run-scoped counters and randomness.
pub struct RunContext {
    next_id: u64,
    generation: usize,
    rng: GenomeRng,
}

impl RunContext {
    pub fn new(rng: GenomeRng) -> Self {
        Self {
            next_id: 0,
            generation: 0,
            rng,
        }
    }

    /// Id the next tagged individual will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Last completed generation.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn set_generation(&mut self, generation: usize) {
        self.generation = generation;
    }

    pub fn rng(&mut self) -> &mut GenomeRng {
        &mut self.rng
    }

    /// Give every individual a fresh id, in order.
    pub fn tag_all(
        &mut self,
        population: &mut [Individual],
        generation: usize,
        space: &ParameterSpace,
    ) -> Result<(), EvolutionError> {
        for individual in population {
            individual.tag(self.next_id, generation, space)?;
            self.next_id += 1;
        }
        Ok(())
    }
}

/// Evaluated individuals per generation.
#[derive(Debug, Clone, Default)]
pub struct History {
    generations: BTreeMap<usize, Vec<Individual>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a generation. Each generation is recorded once.
    pub fn record(
        &mut self,
        generation: usize,
        population: Vec<Individual>,
    ) -> Result<(), EvolutionError> {
        if self.generations.contains_key(&generation) {
            return Err(EvolutionError::GenerationAlreadyRecorded(generation));
        }
        self.generations.insert(generation, population);
        Ok(())
    }

    pub fn get(&self, generation: usize) -> Option<&[Individual]> {
        self.generations.get(&generation).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    /// Generations in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Individual])> {
        self.generations
            .iter()
            .map(|(generation, population)| (*generation, population.as_slice()))
    }
}

/// Next population plus a summary of how it was produced.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub population: Vec<Individual>,
    pub report: GenerationReport,
}

/// Drives a single generation against borrowed run state.
pub struct GenerationController<'a> {
    pub space: &'a ParameterSpace,
    pub operators: &'a OperatorSet,
    pub dispatcher: &'a mut EvaluationDispatcher,
    pub store: &'a mut dyn PersistenceAdapter,
    pub population_size: usize,
    pub max_mutation_retries: usize,
}

impl GenerationController<'_> {
    /// Produce generation `ctx.generation() + 1` from `population`.
    ///
    /// `population` itself is never modified; every operator works on
    /// clones.
    pub fn step(
        &mut self,
        ctx: &mut RunContext,
        population: &[Individual],
        history: &mut History,
        genealogy: &mut Genealogy,
    ) -> Result<GenerationOutcome, EvolutionError> {
        let generation = ctx.generation() + 1;

        let (valid, invalid): (Vec<Individual>, Vec<Individual>) =
            population.iter().cloned().partition(Individual::is_valid);

        let mut replacements: Vec<Individual> = (0..invalid.len())
            .map(|_| self.operators.generator().generate(self.space, ctx.rng()))
            .collect();
        if !replacements.is_empty() {
            log::warn!(
                "Generation {generation}: replacing {} invalid individuals with random ones",
                replacements.len()
            );
        }

        let parents =
            self.operators
                .parent_selection()
                .select(population, self.population_size, ctx.rng());
        let offspring = self.recombine(parents, ctx.rng())?;

        let mut offspring = offspring
            .into_iter()
            .map(|child| {
                mutate_until_valid(
                    child,
                    self.space,
                    self.operators.mutation(),
                    ctx.rng(),
                    self.max_mutation_retries,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        ctx.tag_all(&mut offspring, generation, self.space)?;
        ctx.tag_all(&mut replacements, generation, self.space)?;

        let mut new_individuals = offspring;
        new_individuals.append(&mut replacements);
        let invalid_results = self.dispatcher.dispatch(&mut new_individuals, generation)?;
        let evaluated = new_individuals.len();

        let mut candidates = valid;
        candidates.extend(new_individuals);

        let mut survivors = self
            .operators
            .survivor_selection()
            .select(&candidates, self.population_size);
        if survivors.len() != self.population_size {
            return Err(EvolutionError::SurvivorCount {
                expected: self.population_size,
                got: survivors.len(),
            });
        }
        if history.get(generation).is_some() {
            return Err(EvolutionError::GenerationAlreadyRecorded(generation));
        }

        persist(&mut *self.store, generation, &mut survivors)?;

        // Commit only once every fallible phase has succeeded.
        genealogy.record(generation, &candidates);
        history.record(generation, candidates.clone())?;
        ctx.set_generation(generation);

        let report = summarize(
            generation,
            evaluated,
            invalid.len(),
            invalid_results,
            candidates.len(),
            &survivors,
        );

        Ok(GenerationOutcome {
            population: survivors,
            report,
        })
    }

    /// Mate parents pairwise. Children lose the parents' fitness and
    /// identity and record both parents; an unpaired last parent passes
    /// through with itself as the only parent. Every parent must be tagged.
    fn recombine(
        &self,
        parents: Vec<Individual>,
        rng: &mut GenomeRng,
    ) -> Result<Vec<Individual>, EvolutionError> {
        let mut offspring = Vec::with_capacity(parents.len());
        let mut parents = parents.into_iter();

        while let Some(first) = parents.next() {
            let first_id = first.id().ok_or(EvolutionError::Untagged)?;
            match parents.next() {
                Some(second) => {
                    let second_id = second.id().ok_or(EvolutionError::Untagged)?;
                    let (a, b) = self.operators.mating().mate(first, second, rng);
                    for mut child in [a, b] {
                        reset_lineage(&mut child, ParentIds::Two(first_id, second_id));
                        offspring.push(child);
                    }
                }
                None => {
                    let mut child = first;
                    reset_lineage(&mut child, ParentIds::One(first_id));
                    offspring.push(child);
                }
            }
        }

        Ok(offspring)
    }
}

fn reset_lineage(child: &mut Individual, parents: ParentIds) {
    child.clear_fitness();
    child.clear_identity();
    child.set_parents(parents);
}

/// Hand a population's genomes and scores to the store and mark it stored.
pub(crate) fn persist(
    store: &mut dyn PersistenceAdapter,
    generation: usize,
    population: &mut [Individual],
) -> Result<(), EvolutionError> {
    let genomes: Vec<Vec<f64>> = population.iter().map(|ind| ind.genome.clone()).collect();
    let scores: Vec<f64> = population
        .iter()
        .map(|ind| ind.score().unwrap_or(f64::NAN))
        .collect();
    store.add_generation(generation, &genomes, &scores)?;

    for individual in population {
        individual.mark_stored();
    }
    Ok(())
}

pub(crate) fn summarize(
    generation: usize,
    evaluated: usize,
    replaced: usize,
    invalid_results: usize,
    candidates: usize,
    survivors: &[Individual],
) -> GenerationReport {
    let best = survivors.iter().min_by(|a, b| survival_order(a, b));
    let valid_scores: Vec<f64> = survivors
        .iter()
        .filter(|ind| ind.is_valid())
        .filter_map(Individual::score)
        .collect();
    let mean_score = if valid_scores.is_empty() {
        None
    } else {
        finite(valid_scores.iter().sum::<f64>() / valid_scores.len() as f64)
    };

    GenerationReport {
        generation,
        evaluated,
        replaced,
        invalid_results,
        candidates,
        valid_survivors: valid_scores.len(),
        best_id: best.and_then(Individual::id),
        best_score: best.and_then(Individual::score).and_then(finite),
        mean_score,
    }
}
