use crate::models::{Gene, GeneBounds};
use rand::Rng;
use tracing::instrument;

/// Shape of the search space: one gene per server, each with its bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Morphology {
    pub(crate) gene_bounds: Vec<GeneBounds>,
}

impl Morphology {
    pub fn new(gene_bounds: Vec<GeneBounds>) -> Self {
        Self { gene_bounds }
    }

    /// Same bounds for each of `num_servers` genes.
    pub fn uniform(num_servers: usize, bounds: GeneBounds) -> Self {
        Self {
            gene_bounds: vec![bounds; num_servers],
        }
    }

    pub fn len(&self) -> usize {
        self.gene_bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gene_bounds.is_empty()
    }

    #[instrument(level = "debug", skip(rng), fields(gene_bounds_count = self.gene_bounds.len()))]
    pub fn random<R: Rng>(&self, rng: &mut R) -> Vec<Gene> {
        self.gene_bounds
            .iter()
            .map(|gene_bound| gene_bound.random(rng))
            .collect()
    }
}
