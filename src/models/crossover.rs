use crate::models::{Gene, Genotype};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Performs uniform crossover by selecting genes from each parent with the given probability.
#[instrument(level = "debug", skip(rng, lhs, rhs), fields(genome_length = lhs.genome().len(), probability = probability))]
fn crossover_uniform<R: Rng>(
    rng: &mut R,
    lhs: &Genotype,
    rhs: &Genotype,
    probability: f64,
) -> Vec<Gene> {
    lhs.genome()
        .iter()
        .zip(rhs.genome().iter())
        .map(|(&lhs, &rhs)| {
            if rng.random_bool(probability) {
                lhs
            } else {
                rhs
            }
        })
        .collect()
}

/// Performs single-point crossover at the specified cut point.
#[instrument(level = "debug", skip(lhs, rhs), fields(genome_length = lhs.genome().len(), cut_point = point))]
fn crossover_single_point(lhs: &Genotype, rhs: &Genotype, point: usize) -> Vec<Gene> {
    let lhs_genome = lhs.genome();
    let rhs_genome = rhs.genome();
    let mut genome = Vec::with_capacity(lhs_genome.len());

    genome.extend_from_slice(&lhs_genome[..point]); // First part from lhs
    genome.extend_from_slice(&rhs_genome[point..]); // Second part from rhs
    genome
}

/// Crossover strategy for combining the traffic shares of two parents.
///
/// # Strategies
///
/// ## Single-Point Crossover
/// Cuts both genomes at a random position and joins the head of the first
/// parent with the tail of the second. Both parents always contribute at
/// least one gene when there are two or more servers.
///
/// ## Uniform Crossover
/// Picks every gene independently from either parent. The `probability` is
/// the chance of taking the gene from the first parent.
///
/// # Examples
///
/// ```rust
/// use traffic_ga::models::Crossover;
///
/// let uniform = Crossover::uniform(0.5)?;
/// let single_point = Crossover::single_point();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Crossover {
    Uniform {
        /// Probability of selecting each gene from the first parent (0.0 to 1.0)
        probability: f64,
    },
    #[default]
    SinglePoint,
}

/// Error returned when attempting to create uniform crossover with invalid probability.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("uniform crossover probability must be between 0.0 and 1.0, got {0}")]
pub struct ProbabilityOutOfRangeError(pub(crate) f64);

impl Crossover {
    /// Creates a uniform crossover strategy with specified selection probability.
    pub fn uniform(probability: f64) -> Result<Self, ProbabilityOutOfRangeError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ProbabilityOutOfRangeError(probability));
        }

        Ok(Self::Uniform { probability })
    }

    pub fn single_point() -> Self {
        Self::SinglePoint
    }

    /// Re-checks a deserialized strategy.
    pub(crate) fn validate(&self) -> Result<(), ProbabilityOutOfRangeError> {
        match *self {
            Self::Uniform { probability } => Self::uniform(probability).map(|_| ()),
            Self::SinglePoint => Ok(()),
        }
    }

    /// Applies the crossover operation to two parent genotypes, producing a new genome.
    #[instrument(level = "debug", skip(self, rng, lhs, rhs), fields(crossover_type = ?self, genome_length = lhs.genome().len()))]
    pub(crate) fn apply<R: Rng>(&self, rng: &mut R, lhs: &Genotype, rhs: &Genotype) -> Vec<Gene> {
        match self {
            Self::Uniform { probability } => crossover_uniform(rng, lhs, rhs, *probability),
            Self::SinglePoint => {
                let length = lhs.genome().len().min(rhs.genome().len());
                if length < 2 {
                    // Nothing to cut with a single server
                    return lhs.genome().to_vec();
                }
                let point = rng.random_range(1..length); // Cut point
                crossover_single_point(lhs, rhs, point)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn create_test_genotype(genome: Vec<Gene>) -> Genotype {
        Genotype::new(genome, 1)
    }

    #[test]
    fn it_performs_uniform_crossover() {
        let mut rng = StdRng::seed_from_u64(42);
        let parent_a = create_test_genotype(vec![0.1, 0.2, 0.3, 0.4, 0.5]);
        let parent_b = create_test_genotype(vec![0.6, 0.7, 0.8, 0.9, 1.0]);

        let child_genome = crossover_uniform(&mut rng, &parent_a, &parent_b, 0.5);

        assert_eq!(child_genome.len(), 5);
        for (i, &gene) in child_genome.iter().enumerate() {
            assert!(gene == parent_a.genome()[i] || gene == parent_b.genome()[i]);
        }
    }

    #[test]
    fn it_performs_single_point_crossover() {
        let parent_a = create_test_genotype(vec![0.1, 0.2, 0.3, 0.4]);
        let parent_b = create_test_genotype(vec![0.6, 0.7, 0.8, 0.9]);

        assert_eq!(
            crossover_single_point(&parent_a, &parent_b, 1),
            vec![0.1, 0.7, 0.8, 0.9]
        );
        assert_eq!(
            crossover_single_point(&parent_a, &parent_b, 3),
            vec![0.1, 0.2, 0.3, 0.9]
        );
    }

    #[test]
    fn it_handles_single_point_crossover_via_enum() {
        let mut rng = StdRng::seed_from_u64(42);
        let parent_a = create_test_genotype(vec![0.1, 0.2, 0.3, 0.4, 0.5]);
        let parent_b = create_test_genotype(vec![0.6, 0.7, 0.8, 0.9, 1.0]);

        let child = Crossover::SinglePoint.apply(&mut rng, &parent_a, &parent_b);
        assert_eq!(child.len(), 5);

        // Exactly one switch from parent A to parent B
        let from_a: Vec<bool> = (0..child.len())
            .map(|i| child[i] == parent_a.genome()[i])
            .collect();
        let transitions = from_a.windows(2).filter(|pair| pair[0] != pair[1]).count();
        assert_eq!(transitions, 1);
        assert_eq!(child[0], 0.1);
        assert_eq!(child[4], 1.0);
    }

    #[test]
    fn it_clones_single_server_genomes() {
        let mut rng = StdRng::seed_from_u64(42);
        let parent_a = create_test_genotype(vec![0.4]);
        let parent_b = create_test_genotype(vec![0.9]);

        let child = Crossover::SinglePoint.apply(&mut rng, &parent_a, &parent_b);
        assert_eq!(child, vec![0.4]);
    }

    #[test]
    fn it_handles_uniform_crossover_extreme_probabilities() {
        let mut rng = StdRng::seed_from_u64(42);
        let parent_a = create_test_genotype(vec![0.1, 0.2, 0.3]);
        let parent_b = create_test_genotype(vec![0.4, 0.5, 0.6]);

        let child = Crossover::Uniform { probability: 0.0 }.apply(&mut rng, &parent_a, &parent_b);
        assert_eq!(child, parent_b.genome());

        let child = Crossover::Uniform { probability: 1.0 }.apply(&mut rng, &parent_a, &parent_b);
        assert_eq!(child, parent_a.genome());
    }

    #[test]
    fn it_validates_uniform_crossover_probability() {
        assert!(Crossover::uniform(-0.1).is_err());
        assert!(Crossover::uniform(1.5).is_err());
        assert!(Crossover::uniform(0.5).is_ok());
        assert!(Crossover::Uniform { probability: 2.0 }.validate().is_err());
        assert!(Crossover::SinglePoint.validate().is_ok());
    }
}
