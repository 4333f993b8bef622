use crate::models::{Gene, Morphology};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// How the first generation is spread over the search space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    #[default]
    Random,
    LatinHypercube,
}

impl Distribution {
    pub(crate) fn distribute<R: Rng>(
        &self,
        population_size: usize,
        morphology: &Morphology,
        rng: &mut R,
    ) -> Vec<Vec<Gene>> {
        match self {
            Distribution::Random => random_distribution(population_size, morphology, rng),
            Distribution::LatinHypercube => latin_hypercube(population_size, morphology, rng),
        }
    }
}

fn random_distribution<R: Rng>(
    n_samples: usize,
    morphology: &Morphology,
    rng: &mut R,
) -> Vec<Vec<Gene>> {
    (0..n_samples).map(|_| morphology.random(rng)).collect()
}

fn latin_hypercube<R: Rng>(
    n_samples: usize,
    morphology: &Morphology,
    rng: &mut R,
) -> Vec<Vec<Gene>> {
    let mut genomes: Vec<Vec<Gene>> = (0..n_samples)
        .map(|_| Vec::with_capacity(morphology.len()))
        .collect();

    for gene_bound in &morphology.gene_bounds {
        // One jittered sample per stratum, shuffled to decorrelate dimensions
        let mut samples: Vec<f64> = (0..n_samples)
            .map(|i| (i as f64 + rng.random_range(0.0..1.0)) / n_samples as f64)
            .collect();
        samples.shuffle(rng);

        for (genome, sample) in genomes.iter_mut().zip(samples) {
            genome.push(gene_bound.from_sample(sample));
        }
    }

    genomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeneBounds;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn it_distributes_randomly_within_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let morphology = Morphology::uniform(3, GeneBounds::default());

        let genomes = Distribution::Random.distribute(20, &morphology, &mut rng);

        assert_eq!(genomes.len(), 20);
        assert!(genomes.iter().all(|genome| genome.len() == 3));
        assert!(genomes.iter().flatten().all(|&gene| (0.1..=1.0).contains(&gene)));
    }

    #[test]
    fn it_covers_every_stratum_with_latin_hypercube() {
        let mut rng = StdRng::seed_from_u64(7);
        let bounds = GeneBounds::new(0.1, 1.1).unwrap();
        let morphology = Morphology::uniform(2, bounds);

        let genomes = Distribution::LatinHypercube.distribute(4, &morphology, &mut rng);
        assert_eq!(genomes.len(), 4);

        for dim in 0..2 {
            let mut strata: Vec<usize> = genomes
                .iter()
                .map(|genome| (((genome[dim] - 0.1) / 0.25).floor() as usize).min(3))
                .collect();
            strata.sort();
            assert_eq!(strata, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn it_is_reproducible_with_a_seed() {
        let morphology = Morphology::uniform(2, GeneBounds::default());

        let a = Distribution::Random.distribute(5, &morphology, &mut StdRng::seed_from_u64(1));
        let b = Distribution::Random.distribute(5, &morphology, &mut StdRng::seed_from_u64(1));

        assert_eq!(a, b);
    }
}
