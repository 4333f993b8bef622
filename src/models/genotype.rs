use super::Allocation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

/// Raw traffic share for one server.
pub type Gene = f64;

/// One candidate allocation as seen by the search: raw, unnormalized shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genotype {
    pub(crate) id: Uuid,
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) genome: Vec<Gene>,
    pub(crate) generation_id: u32,
}

impl Genotype {
    #[instrument(level = "debug", skip(genome), fields(genome_length = genome.len(), generation_id = generation_id))]
    pub(crate) fn new(genome: Vec<Gene>, generation_id: u32) -> Self {
        Self {
            id: Uuid::now_v7(),
            generated_at: Utc::now(),
            genome,
            generation_id,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn genome(&self) -> &[Gene] {
        &self.genome
    }

    pub fn generation_id(&self) -> u32 {
        self.generation_id
    }

    /// The traffic split this genotype encodes.
    pub fn allocation(&self) -> Allocation {
        Allocation::normalize(&self.genome)
    }
}
