use crate::models::{Genotype, Morphology};
use rand::Rng;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Share of genes re-sampled in every offspring, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MutationRate {
    percent: f64,
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("mutation percentage must be between 0.0 and 100.0, got: {0}")]
pub struct MutationRateOutOfRange(f64);

impl MutationRate {
    pub fn percent(percent: f64) -> Result<Self, MutationRateOutOfRange> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(MutationRateOutOfRange(percent));
        }

        Ok(Self { percent })
    }

    /// Number of genes to mutate in a genome of `genome_length`.
    ///
    /// Any positive percentage mutates at least one gene.
    pub(crate) fn genes_to_mutate(&self, genome_length: usize) -> usize {
        if self.percent == 0.0 || genome_length == 0 {
            return 0;
        }
        let count = (self.percent * genome_length as f64 / 100.0).floor() as usize;
        count.clamp(1, genome_length)
    }
}

/// Random-resetting mutation: chosen genes are redrawn uniformly within their bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mutagen {
    mutation_rate: MutationRate,
}

impl Mutagen {
    pub fn new(mutation_rate: MutationRate) -> Self {
        Self { mutation_rate }
    }

    pub fn percent(percent: f64) -> Result<Self, MutationRateOutOfRange> {
        Ok(Self::new(MutationRate::percent(percent)?))
    }

    #[instrument(level = "debug", skip(self, rng, genotype, morphology), fields(genome_length = genotype.genome.len()))]
    pub(crate) fn mutate<R: Rng>(
        &self,
        rng: &mut R,
        genotype: &mut Genotype,
        morphology: &Morphology,
    ) {
        let length = genotype.genome.len().min(morphology.gene_bounds.len());
        let amount = self.mutation_rate.genes_to_mutate(length);

        for position in index::sample(rng, length, amount).into_iter() {
            genotype.genome[position] = morphology.gene_bounds[position].random(rng);
        }
    }
}
