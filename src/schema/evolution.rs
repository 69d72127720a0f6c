//! Evolution configuration types for evolutionary parameter search.
//!
//! This module provides the serde-backed configuration for a run: population
//! sizes, objective weights, operator selection and evaluation backend settings.

use serde::{Deserialize, Serialize};

use super::ParameterSpaceError;

/// Top-level configuration for an evolutionary parameter search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Objective weights for multi-objective optimization.
    #[serde(default)]
    pub objectives: ObjectiveConfig,
    /// Evolution operators and their parameters.
    #[serde(default)]
    pub operators: OperatorConfig,
    /// Evaluation settings (worker pool size).
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Size of the random initial population. It is evaluated once and
    /// reduced to `size` before the generational loop starts.
    #[serde(default = "default_initial_size")]
    pub initial_size: usize,
    /// Number of individuals carried from one generation to the next.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Number of generations per call to `run`.
    #[serde(default = "default_generations")]
    pub generations: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial_size: default_initial_size(),
            size: default_population_size(),
            generations: default_generations(),
        }
    }
}

fn default_initial_size() -> usize {
    100
}
fn default_population_size() -> usize {
    20
}
fn default_generations() -> usize {
    10
}

/// Objective weights.
///
/// The length defines the dimensionality of the fitness vector the evaluation
/// function must return. Positive weights maximize, negative weights minimize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveConfig {
    #[serde(default = "default_weights")]
    pub weights: Vec<f64>,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            weights: default_weights(),
        }
    }
}

fn default_weights() -> Vec<f64> {
    vec![1.0]
}

/// Operator selection and parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// How parents are drawn from the current population.
    #[serde(default)]
    pub parent_selection: ParentSelectionMethod,
    /// How two parents are recombined.
    #[serde(default)]
    pub mating: MatingMethod,
    /// How offspring are perturbed.
    #[serde(default)]
    pub mutation: MutationMethod,
    /// How the next population is chosen from the candidate pool.
    #[serde(default)]
    pub survivor_selection: SurvivorSelectionMethod,
    /// Mutation attempts per offspring before the run is aborted because the
    /// mutated genome never landed inside the parameter bounds.
    #[serde(default = "default_max_mutation_retries")]
    pub max_mutation_retries: usize,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            parent_selection: ParentSelectionMethod::default(),
            mating: MatingMethod::default(),
            mutation: MutationMethod::default(),
            survivor_selection: SurvivorSelectionMethod::default(),
            max_mutation_retries: default_max_mutation_retries(),
        }
    }
}

fn default_max_mutation_retries() -> usize {
    1000
}

/// Parent selection method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method")]
pub enum ParentSelectionMethod {
    /// Linear rank selection (Eiben & Smith p.81).
    Rank {
        /// Selection pressure, 1.0 (uniform) to 2.0 (maximal).
        #[serde(default = "default_rank_pressure")]
        s: f64,
    },
    /// Tournament selection with configurable size.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
}

impl Default for ParentSelectionMethod {
    fn default() -> Self {
        Self::Rank {
            s: default_rank_pressure(),
        }
    }
}

fn default_rank_pressure() -> f64 {
    1.5
}
fn default_tournament_size() -> usize {
    3
}

/// Mating (crossover) method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method")]
pub enum MatingMethod {
    /// Blend crossover (BLX-alpha).
    Blend {
        #[serde(default = "default_blend_alpha")]
        alpha: f64,
    },
}

impl Default for MatingMethod {
    fn default() -> Self {
        Self::Blend {
            alpha: default_blend_alpha(),
        }
    }
}

fn default_blend_alpha() -> f64 {
    0.5
}

/// Mutation method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method")]
pub enum MutationMethod {
    /// Self-adaptive Gaussian mutation with one step size per gene.
    AdaptiveGaussian {
        /// Global learning rate. Defaults to `1 / sqrt(2n)`.
        #[serde(default)]
        global_learning_rate: Option<f64>,
        /// Per-gene learning rate. Defaults to `1 / sqrt(2 sqrt(n))`.
        #[serde(default)]
        learning_rate: Option<f64>,
        /// Lower bound for every step size.
        #[serde(default = "default_min_step_size")]
        min_step_size: f64,
    },
}

impl Default for MutationMethod {
    fn default() -> Self {
        Self::AdaptiveGaussian {
            global_learning_rate: None,
            learning_rate: None,
            min_step_size: default_min_step_size(),
        }
    }
}

fn default_min_step_size() -> f64 {
    0.01
}

/// Survivor selection method.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "method")]
pub enum SurvivorSelectionMethod {
    /// Truncation to the best weighted scores, ties broken by insertion order.
    #[default]
    Best,
}

/// Evaluation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Number of parallel evaluation workers (0 = auto-detect).
    #[serde(default)]
    pub workers: usize,
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 2, got {0}")]
    PopulationTooSmall(usize),
    #[error("{name} must be even, got {value}")]
    OddPopulation { name: &'static str, value: usize },
    #[error("Initial population ({initial}) must not be smaller than population size ({size})")]
    InitialPopulationTooSmall { initial: usize, size: usize },
    #[error("No objective weights specified")]
    NoObjectives,
    #[error("Invalid objective weight at index {index}: {weight}")]
    InvalidWeight { index: usize, weight: f64 },
    #[error("Invalid operator configuration: {0}")]
    InvalidOperator(String),
    #[error("Invalid parameter space: {0}")]
    InvalidParameterSpace(#[from] ParameterSpaceError),
}

impl EvolutionConfig {
    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        let population = &self.population;

        if population.size < 2 {
            return Err(EvolutionConfigError::PopulationTooSmall(population.size));
        }
        if population.size % 2 != 0 {
            return Err(EvolutionConfigError::OddPopulation {
                name: "Population size",
                value: population.size,
            });
        }
        if population.initial_size % 2 != 0 {
            return Err(EvolutionConfigError::OddPopulation {
                name: "Initial population size",
                value: population.initial_size,
            });
        }
        if population.initial_size < population.size {
            return Err(EvolutionConfigError::InitialPopulationTooSmall {
                initial: population.initial_size,
                size: population.size,
            });
        }

        if self.objectives.weights.is_empty() {
            return Err(EvolutionConfigError::NoObjectives);
        }
        for (index, &weight) in self.objectives.weights.iter().enumerate() {
            if !weight.is_finite() {
                return Err(EvolutionConfigError::InvalidWeight { index, weight });
            }
        }

        self.operators.validate()
    }
}

impl OperatorConfig {
    /// Validate operator parameters.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        let invalid = |msg: String| Err(EvolutionConfigError::InvalidOperator(msg));

        match self.parent_selection {
            ParentSelectionMethod::Rank { s } if !(1.0..=2.0).contains(&s) => {
                return invalid(format!("rank selection pressure {s} outside [1, 2]"));
            }
            ParentSelectionMethod::Tournament { size: 0 } => {
                return invalid("tournament size must be positive".to_string());
            }
            _ => {}
        }

        let MatingMethod::Blend { alpha } = self.mating;
        if !alpha.is_finite() || alpha < 0.0 {
            return invalid(format!("blend alpha {alpha} must be finite and non-negative"));
        }

        let MutationMethod::AdaptiveGaussian {
            global_learning_rate,
            learning_rate,
            min_step_size,
        } = self.mutation;
        if !(min_step_size.is_finite() && min_step_size > 0.0) {
            return invalid(format!("minimum step size {min_step_size} must be positive"));
        }
        for rate in [global_learning_rate, learning_rate].into_iter().flatten() {
            if !rate.is_finite() || rate < 0.0 {
                return invalid(format!("learning rate {rate} must be finite and non-negative"));
            }
        }

        if self.max_mutation_retries == 0 {
            return invalid("max_mutation_retries must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = EvolutionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.population.initial_size, 100);
        assert_eq!(config.population.size, 20);
        assert_eq!(config.objectives.weights, vec![1.0]);
    }

    #[test]
    fn test_odd_population_rejected() {
        let mut config = EvolutionConfig::default();
        config.population.size = 5;
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::OddPopulation { value: 5, .. })
        ));

        let mut config = EvolutionConfig::default();
        config.population.initial_size = 21;
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::OddPopulation { value: 21, .. })
        ));
    }

    #[test]
    fn test_initial_population_must_cover_size() {
        let mut config = EvolutionConfig::default();
        config.population.initial_size = 10;
        config.population.size = 20;
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::InitialPopulationTooSmall { .. })
        ));
    }

    #[test]
    fn test_weights_validated() {
        let mut config = EvolutionConfig::default();
        config.objectives.weights.clear();
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::NoObjectives)
        ));

        config.objectives.weights = vec![1.0, f64::NAN];
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::InvalidWeight { index: 1, .. })
        ));
    }

    #[test]
    fn test_operator_parameters_validated() {
        let mut config = EvolutionConfig::default();
        config.operators.parent_selection = ParentSelectionMethod::Rank { s: 2.5 };
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::InvalidOperator(_))
        ));

        let mut config = EvolutionConfig::default();
        config.operators.mating = MatingMethod::Blend { alpha: -0.1 };
        assert!(config.validate().is_err());

        let mut config = EvolutionConfig::default();
        config.operators.max_mutation_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialization() {
        let config = EvolutionConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EvolutionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.population.size, config.population.size);
        assert_eq!(parsed.operators.mating, config.operators.mating);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "population": { "size": 8 },
            "operators": { "parent_selection": { "method": "Tournament" } }
        }"#;
        let parsed: EvolutionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.population.size, 8);
        assert_eq!(parsed.population.initial_size, 100);
        assert_eq!(
            parsed.operators.parent_selection,
            ParentSelectionMethod::Tournament { size: 3 }
        );
        assert_eq!(
            parsed.operators.mating,
            MatingMethod::Blend { alpha: 0.5 }
        );
    }
}
