use super::Genotype;

/// A fully evaluated generation: every genotype paired with its fitness score.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub struct Population {
    pub(crate) generation_id: u32,
    pub(crate) scored: Vec<(Genotype, f64)>,
}

impl Population {
    pub(crate) fn new(generation_id: u32, scored: Vec<(Genotype, f64)>) -> Self {
        Self {
            generation_id,
            scored,
        }
    }

    pub fn generation_id(&self) -> u32 {
        self.generation_id
    }

    pub fn len(&self) -> usize {
        self.scored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scored.is_empty()
    }

    pub fn scored(&self) -> &[(Genotype, f64)] {
        &self.scored
    }

    /// Best individual of the generation.
    ///
    /// Ties are broken by position: the first individual holding the maximum
    /// score wins. Because the population order itself comes from random
    /// breeding, which of several equally fit individuals is reported is
    /// effectively arbitrary across runs.
    pub fn best(&self) -> Option<&(Genotype, f64)> {
        self.scored.iter().fold(None, |best, candidate| match best {
            Some(current) if current.1 >= candidate.1 => Some(current),
            _ => Some(candidate),
        })
    }

    /// The `n` fittest individuals, best first. Stable for equal scores.
    pub(crate) fn elite(&self, n: usize) -> Vec<&Genotype> {
        let mut ranked: Vec<&(Genotype, f64)> = self.scored.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.into_iter().take(n).map(|(genotype, _)| genotype).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population(scores: &[f64]) -> Population {
        Population::new(
            1,
            scores
                .iter()
                .enumerate()
                .map(|(i, &score)| (Genotype::new(vec![i as f64 + 1.0], 1), score))
                .collect(),
        )
    }

    #[test]
    fn it_finds_the_best_individual() {
        let population = population(&[-3.0, 7.5, 2.0]);

        let (genotype, score) = population.best().unwrap();
        assert_eq!(*score, 7.5);
        assert_eq!(genotype.genome(), &[2.0]);
    }

    #[test]
    fn it_breaks_ties_by_first_position() {
        let population = population(&[1.0, 4.0, 4.0, 0.0]);

        let (genotype, _) = population.best().unwrap();
        assert_eq!(genotype.genome(), &[2.0]);
    }

    #[test]
    fn it_returns_none_when_empty() {
        assert!(population(&[]).best().is_none());
    }

    #[test]
    fn it_ranks_elite() {
        let population = population(&[1.0, 9.0, 5.0, 9.0]);

        let elite: Vec<f64> = population.elite(3).iter().map(|g| g.genome()[0]).collect();
        assert_eq!(elite, vec![2.0, 4.0, 3.0]);
    }
}
