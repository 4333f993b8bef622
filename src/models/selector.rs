//! Parent selection strategies.
//!
//! A selector fills the mating pool for the next generation from the evaluated
//! population. Offspring are then bred from consecutive pairs of that pool.
//!
//! # Selection Methods
//!
//! ## Tournament Selection
//!
//! Each pool slot goes to the fittest of `size` distinct, randomly drawn
//! individuals. Pressure grows with the tournament size and does not depend on
//! how fitness values are scaled, which suits the signed scores produced by the
//! traffic-split objective.
//!
//! ## Roulette Wheel Selection
//!
//! Individuals are drawn with probability proportional to their fitness. Scores
//! are shifted so the worst individual weighs zero; when the whole population
//! scores the same, every individual is equally likely.
//!
//! ```rust
//! use traffic_ga::models::Selector;
//!
//! let tournament = Selector::tournament(3)?;
//! let roulette = Selector::roulette();
//! # Ok::<(), traffic_ga::models::SelectionError>(())
//! ```

use crate::models::Genotype;
use rand::Rng;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Performs a single roulette wheel spin to select a candidate index.
fn spin_roulette(
    weights: &[f64],
    total_weight: f64,
    rng: &mut impl Rng,
) -> Result<usize, SelectionError> {
    let spin = rng.random_range(0.0..total_weight);
    let mut cumulative = 0.0;

    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if cumulative > spin {
            return Ok(index);
        }
    }

    // Rounding can leave the cumulative sum a hair below the spin
    weights
        .iter()
        .rposition(|&weight| weight > 0.0)
        .ok_or(SelectionError::RouletteSelectionFailed)
}

/// Fills the mating pool with fitness-proportionate roulette wheel selection.
#[instrument(level = "debug", skip(candidates, rng), fields(num_parents = num_parents, num_candidates = candidates.len()))]
fn roulette_selection(
    num_parents: usize,
    candidates: &[(Genotype, f64)],
    rng: &mut impl Rng,
) -> Result<Vec<usize>, SelectionError> {
    if candidates.is_empty() {
        return Err(SelectionError::NoValidParents);
    }

    let min_fitness = candidates
        .iter()
        .map(|(_, fitness)| *fitness)
        .fold(f64::INFINITY, f64::min);

    // Shift so the worst candidate weighs nothing and everything is non-negative
    let weights: Vec<f64> = candidates
        .iter()
        .map(|(_, fitness)| fitness - min_fitness)
        .collect();
    let total_weight: f64 = weights.iter().sum();

    if !(total_weight > 0.0 && total_weight.is_finite()) {
        // Flat landscape: nothing to prefer
        return Ok((0..num_parents)
            .map(|_| rng.random_range(0..candidates.len()))
            .collect());
    }

    (0..num_parents)
        .map(|_| spin_roulette(&weights, total_weight, rng))
        .collect()
}

/// Fills the mating pool with tournament selection of the given size.
#[instrument(level = "debug", skip(candidates, rng), fields(num_parents = num_parents, tournament_size = tournament_size, num_candidates = candidates.len()))]
fn tournament_selection(
    num_parents: usize,
    tournament_size: usize,
    candidates: &[(Genotype, f64)],
    rng: &mut impl Rng,
) -> Result<Vec<usize>, SelectionError> {
    if candidates.is_empty() {
        return Err(SelectionError::NoValidParents);
    }
    if candidates.len() < tournament_size {
        return Err(SelectionError::InvalidSampleSize {
            min_required: tournament_size,
            provided: candidates.len(),
        });
    }

    let mut pool = Vec::with_capacity(num_parents);
    for _ in 0..num_parents {
        let mut contenders = index::sample(rng, candidates.len(), tournament_size).into_iter();

        // First contender seeds the tournament, strict improvement replaces it
        let mut winner = contenders.next().ok_or(SelectionError::NoValidParents)?;
        for idx in contenders {
            if candidates[idx].1 > candidates[winner].1 {
                winner = idx;
            }
        }

        pool.push(winner);
    }

    Ok(pool)
}

/// Parent selection method.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// Best of `size` randomly drawn individuals wins each slot.
    ///
    /// **Tournament size guidelines**:
    /// - Size 2-3: Low to moderate selection pressure, good exploration
    /// - Size 4-5: Moderate selection pressure, balanced exploration/exploitation
    /// - Size 6+: High selection pressure, strong exploitation
    Tournament { size: usize },

    /// Fitness-proportionate selection on shifted scores.
    Roulette,
}

impl Default for Selector {
    fn default() -> Self {
        Self::Tournament { size: 3 }
    }
}

/// Errors that can occur during parent selection.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    /// The population handed to the selector is empty.
    #[error("No valid parents available for selection")]
    NoValidParents,

    /// Tournament size must be at least one.
    #[error("Tournament size must be at least 1")]
    EmptyTournament,

    /// The population is smaller than a single tournament.
    #[error("Population must be >= tournament_size. Min required: {min_required}, got {provided}")]
    InvalidSampleSize {
        min_required: usize,
        provided: usize,
    },

    /// Internal roulette wheel algorithm failure.
    #[error("Internal error: roulette wheel failed to select candidate")]
    RouletteSelectionFailed,
}

impl Selector {
    pub fn tournament(tournament_size: usize) -> Result<Self, SelectionError> {
        if tournament_size == 0 {
            return Err(SelectionError::EmptyTournament);
        }

        Ok(Self::Tournament {
            size: tournament_size,
        })
    }

    pub fn roulette() -> Self {
        Self::Roulette
    }

    /// Checks the selector can run against a population of `population_size`.
    pub(crate) fn validate(&self, population_size: usize) -> Result<(), SelectionError> {
        match *self {
            Self::Tournament { size: 0 } => Err(SelectionError::EmptyTournament),
            Self::Tournament { size } if size > population_size => {
                Err(SelectionError::InvalidSampleSize {
                    min_required: size,
                    provided: population_size,
                })
            }
            _ => Ok(()),
        }
    }

    /// Picks `num_parents` indices into `candidates`. Repeats are allowed.
    pub(crate) fn select_parents<R: Rng>(
        &self,
        num_parents: usize,
        candidates: &[(Genotype, f64)],
        rng: &mut R,
    ) -> Result<Vec<usize>, SelectionError> {
        match *self {
            Self::Tournament { size: 0 } => Err(SelectionError::EmptyTournament),
            Self::Tournament { size } => tournament_selection(num_parents, size, candidates, rng),
            Self::Roulette => roulette_selection(num_parents, candidates, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    const TOLERANCE: f64 = 0.07;

    fn candidates(scores: &[f64]) -> Vec<(Genotype, f64)> {
        scores
            .iter()
            .map(|&score| (Genotype::new(vec![0.5, 0.5], 1), score))
            .collect()
    }

    #[test]
    fn it_spins_the_roulette() {
        let weights = [0.1, 0.3, 0.6];
        let mut counts = [0; 3];
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..1000 {
            counts[spin_roulette(&weights, 1.0, &mut rng).unwrap()] += 1;
        }

        assert!((counts[0] as f64 / 1000.0 - 0.1).abs() < TOLERANCE);
        assert!((counts[1] as f64 / 1000.0 - 0.3).abs() < TOLERANCE);
        assert!((counts[2] as f64 / 1000.0 - 0.6).abs() < TOLERANCE);
    }

    #[test]
    fn it_fails_spin_without_positive_weight() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(
            spin_roulette(&[0.0, 0.0], 1.0, &mut rng),
            Err(SelectionError::RouletteSelectionFailed)
        );
    }

    #[test]
    fn test_tournament_constructor() {
        assert_eq!(
            Selector::tournament(3).unwrap(),
            Selector::Tournament { size: 3 }
        );
        assert_eq!(Selector::tournament(0), Err(SelectionError::EmptyTournament));
    }

    #[test]
    fn test_validate_against_population() {
        assert!(Selector::tournament(3).unwrap().validate(3).is_ok());
        assert_eq!(
            Selector::tournament(4).unwrap().validate(3),
            Err(SelectionError::InvalidSampleSize {
                min_required: 4,
                provided: 3
            })
        );
        assert!(Selector::roulette().validate(1).is_ok());
    }

    #[test]
    fn test_tournament_of_whole_population_picks_the_best() {
        let mut rng = StdRng::seed_from_u64(1);
        let candidates = candidates(&[-4.0, 2.0, -1.0, 0.5]);

        let pool = Selector::tournament(4)
            .unwrap()
            .select_parents(6, &candidates, &mut rng)
            .unwrap();

        assert_eq!(pool, vec![1; 6]);
    }

    #[test]
    fn test_tournament_never_picks_the_worst_with_size_two() {
        let mut rng = StdRng::seed_from_u64(5);
        let candidates = candidates(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        let pool = Selector::tournament(2)
            .unwrap()
            .select_parents(200, &candidates, &mut rng)
            .unwrap();

        assert_eq!(pool.len(), 200);
        assert!(pool.iter().all(|&idx| idx != 0));
    }

    #[test]
    fn test_tournament_insufficient_candidates() {
        let mut rng = StdRng::seed_from_u64(1);
        let candidates = candidates(&[1.0, 2.0]);

        assert_eq!(
            Selector::Tournament { size: 3 }.select_parents(1, &candidates, &mut rng),
            Err(SelectionError::InvalidSampleSize {
                min_required: 3,
                provided: 2
            })
        );
    }

    #[test]
    fn test_roulette_handles_negative_fitness() {
        let mut rng = StdRng::seed_from_u64(9);
        let candidates = candidates(&[-300.0, -100.0, -200.0]);

        let pool = Selector::roulette()
            .select_parents(100, &candidates, &mut rng)
            .unwrap();

        // The worst candidate weighs zero after shifting
        assert!(pool.iter().all(|&idx| idx != 0));
        assert!(pool.contains(&1));
    }

    #[test]
    fn test_roulette_on_flat_landscape() {
        let mut rng = StdRng::seed_from_u64(3);
        let candidates = candidates(&[-7.0, -7.0, -7.0]);

        let pool = Selector::roulette()
            .select_parents(300, &candidates, &mut rng)
            .unwrap();

        for idx in 0..3 {
            assert!(pool.contains(&idx));
        }
    }

    #[test]
    fn test_roulette_no_valid_parents() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            Selector::roulette().select_parents(2, &[], &mut rng),
            Err(SelectionError::NoValidParents)
        );
    }
}
