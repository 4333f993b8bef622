mod allocation;
mod breeder;
mod crossover;
mod distribution;
mod evaluator;
mod gene_bounds;
mod genotype;
mod load_history;
mod morphology;
mod mutagen;
mod observation;
mod population;
mod schedule;
mod search_state;
mod selector;
mod server_model;

pub use allocation::Allocation;
pub use crossover::{Crossover, ProbabilityOutOfRangeError};
pub use distribution::Distribution;
pub use evaluator::Evaluator;
pub use gene_bounds::{GeneBoundError, GeneBounds};
pub use genotype::{Gene, Genotype};
pub use load_history::{DEFAULT_HISTORY_CAPACITY, LoadHistory};
pub use morphology::Morphology;
pub use mutagen::{Mutagen, MutationRate, MutationRateOutOfRange};
pub use observation::{Observation, WORST_CASE_LATENCY_MS};
pub use population::Population;
pub use schedule::{Conclusion, Schedule, ScheduleDecision};
pub use search_state::SearchState;
pub use selector::{SelectionError, Selector};
pub use server_model::{
    InvalidInputError, InvalidModelConfigError, ServerModel, ServerModelConfig, ServerResponse, ServerStatus,
    coerce_traffic, validate_traffic,
};

pub(crate) use allocation::mean;
pub(crate) use breeder::Breeder;
