use crate::models::{Crossover, Genotype, Morphology, Mutagen};
use tracing::instrument;

pub(crate) struct Breeder<'a> {
    crossover: &'a Crossover,
    mutagen: &'a Mutagen,
    morphology: &'a Morphology,
}

impl<'a> Breeder<'a> {
    pub(crate) fn new(
        crossover: &'a Crossover,
        mutagen: &'a Mutagen,
        morphology: &'a Morphology,
    ) -> Self {
        Self {
            crossover,
            mutagen,
            morphology,
        }
    }

    fn breed_child(
        &self,
        parent1: &Genotype,
        parent2: &Genotype,
        next_generation_id: u32,
        rng: &mut impl rand::Rng,
    ) -> Genotype {
        let genome = self.crossover.apply(rng, parent1, parent2);
        let mut child = Genotype::new(genome, next_generation_id);
        self.mutagen.mutate(rng, &mut child, self.morphology);
        child
    }

    /// Breeds `num_offspring` children from consecutive pairs of the mating pool.
    ///
    /// Child `k` has parents `pool[k % n]` and `pool[(k + 1) % n]`, wrapping
    /// around the pool as often as needed.
    #[instrument(level = "debug", skip(self, pool, candidates, rng), fields(pool_size = pool.len(), num_offspring = num_offspring, next_generation_id = next_generation_id))]
    pub(crate) fn breed_batch(
        &self,
        pool: &[usize],
        candidates: &[(Genotype, f64)],
        num_offspring: usize,
        next_generation_id: u32,
        rng: &mut impl rand::Rng,
    ) -> Vec<Genotype> {
        if pool.is_empty() {
            return Vec::new();
        }

        (0..num_offspring)
            .map(|k| {
                let lhs = pool[k % pool.len()];
                let rhs = pool[(k + 1) % pool.len()];
                self.breed_child(
                    &candidates[lhs].0,
                    &candidates[rhs].0,
                    next_generation_id,
                    rng,
                )
            })
            .collect()
    }
}
