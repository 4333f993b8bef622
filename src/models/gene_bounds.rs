use super::Gene;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeneBoundError {
    #[error("InvalidBounds: lower bound must not exceed upper. lower={lower}, upper={upper}")]
    InvalidBound { lower: f64, upper: f64 },
    #[error("NonPositiveLower: lower bound must be greater than zero. lower={lower}")]
    NonPositiveLower { lower: f64 },
    #[error("NonFinite: bounds must be finite. lower={lower}, upper={upper}")]
    NonFinite { lower: f64, upper: f64 },
}

/// Closed range a traffic share gene may take during search.
///
/// Zero is excluded so no server is ever switched off entirely while searching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneBounds {
    pub(crate) lower: f64,
    pub(crate) upper: f64,
}

impl Default for GeneBounds {
    fn default() -> Self {
        Self {
            lower: 0.1,
            upper: 1.0,
        }
    }
}

impl GeneBounds {
    #[instrument(level = "debug", fields(lower = lower, upper = upper))]
    pub fn new(lower: f64, upper: f64) -> Result<Self, GeneBoundError> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(GeneBoundError::NonFinite { lower, upper });
        }
        if lower <= 0.0 {
            return Err(GeneBoundError::NonPositiveLower { lower });
        }
        if lower > upper {
            return Err(GeneBoundError::InvalidBound { lower, upper });
        }

        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Uniform draw within the bounds.
    pub fn random<R: Rng>(&self, rng: &mut R) -> Gene {
        if self.lower == self.upper {
            return self.lower;
        }
        rng.random_range(self.lower..=self.upper)
    }

    /// Maps a unit-interval sample onto the bounds.
    pub(crate) fn from_sample(&self, sample: f64) -> Gene {
        let sample = sample.clamp(0.0, 1.0);
        self.lower + sample * (self.upper - self.lower)
    }

    pub fn contains(&self, gene: Gene) -> bool {
        (self.lower..=self.upper).contains(&gene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn it_validates_bounds() {
        assert!(GeneBounds::new(0.1, 1.0).is_ok());
        assert!(GeneBounds::new(0.5, 0.5).is_ok());
        assert_eq!(
            GeneBounds::new(1.0, 0.1),
            Err(GeneBoundError::InvalidBound {
                lower: 1.0,
                upper: 0.1
            })
        );
        assert_eq!(
            GeneBounds::new(0.0, 1.0),
            Err(GeneBoundError::NonPositiveLower { lower: 0.0 })
        );
        assert!(GeneBounds::new(0.1, f64::INFINITY).is_err());
    }

    #[test]
    fn it_draws_within_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let bounds = GeneBounds::default();

        for _ in 0..1000 {
            assert!(bounds.contains(bounds.random(&mut rng)));
        }
    }

    #[test]
    fn it_maps_samples_onto_bounds() {
        let bounds = GeneBounds::new(0.2, 1.2).unwrap();

        assert_eq!(bounds.from_sample(0.0), 0.2);
        assert_eq!(bounds.from_sample(1.0), 1.2);
        assert!((bounds.from_sample(0.5) - 0.7).abs() < 1e-12);
        assert_eq!(bounds.from_sample(2.0), 1.2); // Clamped
    }
}
