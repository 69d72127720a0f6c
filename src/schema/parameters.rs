//! Parameter space: the ordered, named and bounded fields a genome maps onto.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Bounds of a single named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterBounds {
    /// Parameter name (unique within a space).
    pub name: String,
    /// Inclusive lower bound.
    pub lower: f64,
    /// Inclusive upper bound.
    pub upper: f64,
}

impl ParameterBounds {
    /// Width of the interval.
    #[inline]
    pub fn range(&self) -> f64 {
        self.upper - self.lower
    }

    /// Check whether a value lies inside the bounds.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Ordered parameter space. Gene `i` of every genome is the value of
/// parameter `i` of the space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpace {
    parameters: Vec<ParameterBounds>,
}

impl ParameterSpace {
    /// Build a space from `(name, (lower, upper))` pairs, in gene order.
    pub fn new<I, S>(parameters: I) -> Result<Self, ParameterSpaceError>
    where
        I: IntoIterator<Item = (S, (f64, f64))>,
        S: Into<String>,
    {
        let space = Self {
            parameters: parameters
                .into_iter()
                .map(|(name, (lower, upper))| ParameterBounds {
                    name: name.into(),
                    lower,
                    upper,
                })
                .collect(),
        };
        space.validate()?;
        Ok(space)
    }

    /// Validate the space. Deserialized spaces are not validated implicitly.
    pub fn validate(&self) -> Result<(), ParameterSpaceError> {
        if self.parameters.is_empty() {
            return Err(ParameterSpaceError::Empty);
        }

        let mut seen = HashSet::with_capacity(self.parameters.len());
        for p in &self.parameters {
            if !seen.insert(p.name.as_str()) {
                return Err(ParameterSpaceError::DuplicateName(p.name.clone()));
            }
            if !(p.upper - p.lower).is_finite() || p.lower > p.upper {
                return Err(ParameterSpaceError::InvalidBounds {
                    name: p.name.clone(),
                    lower: p.lower,
                    upper: p.upper,
                });
            }
        }

        Ok(())
    }

    /// Number of parameters (genome length).
    #[inline]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// All parameter bounds in gene order.
    pub fn parameters(&self) -> &[ParameterBounds] {
        &self.parameters
    }

    /// Parameter names in gene order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    /// Bounds of a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParameterBounds> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Check that a genome has the right length and every gene is within bounds.
    pub fn contains(&self, genome: &[f64]) -> bool {
        genome.len() == self.parameters.len()
            && self
                .parameters
                .iter()
                .zip(genome)
                .all(|(bounds, &value)| bounds.contains(value))
    }

    /// Decode a genome into named parameter values.
    ///
    /// Extra genes beyond the space's length are ignored.
    pub fn decode(&self, genome: &[f64]) -> BTreeMap<String, f64> {
        self.parameters
            .iter()
            .zip(genome)
            .map(|(bounds, &value)| (bounds.name.clone(), value))
            .collect()
    }
}

/// Parameter space validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ParameterSpaceError {
    #[error("Parameter space has no parameters")]
    Empty,
    #[error("Duplicate parameter name: {0}")]
    DuplicateName(String),
    #[error("Parameter {name} has invalid bounds [{lower}, {upper}]")]
    InvalidBounds { name: String, lower: f64, upper: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> ParameterSpace {
        ParameterSpace::new([("x", (-1.0, 1.0)), ("y", (0.0, 10.0))]).unwrap()
    }

    #[test]
    fn test_decode_follows_field_order() {
        let params = space().decode(&[0.5, 7.0]);
        assert_eq!(params["x"], 0.5);
        assert_eq!(params["y"], 7.0);
        assert_eq!(space().names().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn test_contains() {
        let space = space();
        assert!(space.contains(&[-1.0, 10.0]));
        assert!(!space.contains(&[-1.1, 5.0]));
        assert!(!space.contains(&[0.0]));
    }

    #[test]
    fn test_invalid_spaces() {
        assert!(matches!(
            ParameterSpace::new(Vec::<(String, (f64, f64))>::new()),
            Err(ParameterSpaceError::Empty)
        ));
        assert!(matches!(
            ParameterSpace::new([("a", (0.0, 1.0)), ("a", (0.0, 2.0))]),
            Err(ParameterSpaceError::DuplicateName(_))
        ));
        assert!(matches!(
            ParameterSpace::new([("a", (2.0, 1.0))]),
            Err(ParameterSpaceError::InvalidBounds { .. })
        ));
        assert!(matches!(
            ParameterSpace::new([("a", (f64::NEG_INFINITY, 1.0))]),
            Err(ParameterSpaceError::InvalidBounds { .. })
        ));
        assert!(matches!(
            ParameterSpace::new([("a", (-1e308, 1e308))]),
            Err(ParameterSpaceError::InvalidBounds { .. })
        ));
        assert!(ParameterSpace::new([("a", (-1e307, 1e307))]).is_ok());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&space()).unwrap();
        let parsed: ParameterSpace = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, space());
    }
}
