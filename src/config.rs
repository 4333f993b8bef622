//! Run configuration.
//!
//! Loaded once before a run from a file (format picked by extension) layered
//! with `TRAFFIC_GA__*` environment overrides, e.g.
//! `TRAFFIC_GA__GA__POPULATION_SIZE=40`. A configuration that fails
//! [`Configuration::validate`] never reaches the search loop.
//!
//! ```yaml
//! servers:
//!   - http://server-1:80/serve
//!   - http://server-2:80/serve
//! weights:
//!   throughput: 1.0
//!   latency: 0.1
//!   error_rate: 1.0
//!   load_variance: 1.0
//! ga:
//!   generations: 50
//!   population_size: 10
//!   parents_mating: 4
//!   mutation_percent: 10
//!   selection:
//!     tournament:
//!       size: 3
//! timeout_secs: 2
//! ```

use crate::fitness::{DEFAULT_TOTAL_TRAFFIC, FitnessWeights, PenaltyScales};
use crate::models::{
    Crossover, Distribution, GeneBoundError, GeneBounds, InvalidModelConfigError, Morphology,
    Mutagen, MutationRateOutOfRange, ProbabilityOutOfRangeError, Schedule, SelectionError,
    Selector,
};
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

const ENV_PREFIX: &str = "TRAFFIC_GA";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Load: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("NoServers: at least one server is required")]
    NoServers,
    #[error("NonFinite: {field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("OutOfRange: {field} {reason}")]
    OutOfRange { field: &'static str, reason: String },
    #[error("GeneBounds: {0}")]
    GeneBounds(#[from] GeneBoundError),
    #[error("Selection: {0}")]
    Selection(#[from] SelectionError),
    #[error("Crossover: {0}")]
    Crossover(#[from] ProbabilityOutOfRangeError),
    #[error("MutationRate: {0}")]
    MutationRate(#[from] MutationRateOutOfRange),
    #[error("ServerModel: {0}")]
    ServerModel(#[from] InvalidModelConfigError),
}

impl ConfigError {
    fn out_of_range(field: &'static str, reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            field,
            reason: reason.into(),
        }
    }
}

fn default_patience() -> u32 {
    20
}

fn default_gene_low() -> f64 {
    0.1
}

fn default_gene_high() -> f64 {
    1.0
}

fn default_evaluation_concurrency() -> usize {
    1
}

fn default_timeout_secs() -> f64 {
    2.0
}

fn default_total_traffic() -> f64 {
    DEFAULT_TOTAL_TRAFFIC
}

/// Search hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaConfig {
    /// Maximum number of generations, the initial population included.
    pub generations: u32,
    pub population_size: usize,
    /// Size of the mating pool drawn by the selector each generation.
    pub parents_mating: usize,
    /// Share of genes re-sampled in each offspring, in percent.
    pub mutation_percent: f64,
    #[serde(default = "default_patience")]
    pub patience: u32,
    /// Best individuals copied unchanged into the next generation.
    #[serde(default)]
    pub elitism: usize,
    #[serde(default)]
    pub selection: Selector,
    #[serde(default)]
    pub crossover: Crossover,
    #[serde(default)]
    pub distribution: Distribution,
    #[serde(default = "default_gene_low")]
    pub gene_low: f64,
    #[serde(default = "default_gene_high")]
    pub gene_high: f64,
    /// Individuals evaluated at the same time within a generation.
    #[serde(default = "default_evaluation_concurrency")]
    pub evaluation_concurrency: usize,
}

impl GaConfig {
    pub fn new(
        generations: u32,
        population_size: usize,
        parents_mating: usize,
        mutation_percent: f64,
    ) -> Self {
        Self {
            generations,
            population_size,
            parents_mating,
            mutation_percent,
            patience: default_patience(),
            elitism: 0,
            selection: Selector::default(),
            crossover: Crossover::default(),
            distribution: Distribution::default(),
            gene_low: default_gene_low(),
            gene_high: default_gene_high(),
            evaluation_concurrency: default_evaluation_concurrency(),
        }
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::new(self.generations, self.patience)
    }

    pub fn gene_bounds(&self) -> Result<GeneBounds, GeneBoundError> {
        GeneBounds::new(self.gene_low, self.gene_high)
    }

    pub fn mutagen(&self) -> Result<Mutagen, MutationRateOutOfRange> {
        Mutagen::percent(self.mutation_percent)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::out_of_range(
                "ga.population_size",
                format!("must be at least 2, got {}", self.population_size),
            ));
        }
        if !(2..=self.population_size).contains(&self.parents_mating) {
            return Err(ConfigError::out_of_range(
                "ga.parents_mating",
                format!(
                    "must be between 2 and population_size ({}), got {}",
                    self.population_size, self.parents_mating
                ),
            ));
        }
        if self.generations < 1 {
            return Err(ConfigError::out_of_range("ga.generations", "must be at least 1"));
        }
        if self.patience < 1 {
            return Err(ConfigError::out_of_range("ga.patience", "must be at least 1"));
        }
        if self.elitism >= self.population_size {
            return Err(ConfigError::out_of_range(
                "ga.elitism",
                format!(
                    "must be below population_size ({}), got {}",
                    self.population_size, self.elitism
                ),
            ));
        }
        if self.evaluation_concurrency < 1 {
            return Err(ConfigError::out_of_range(
                "ga.evaluation_concurrency",
                "must be at least 1",
            ));
        }

        self.mutagen()?;
        self.gene_bounds()?;
        self.selection.validate(self.population_size)?;
        self.crossover.validate()?;

        Ok(())
    }
}

/// Everything a run needs, validated before the search starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Server identifiers, in allocation order. URLs of `/serve` endpoints
    /// unless the run is simulated in-process.
    pub servers: Vec<String>,
    pub weights: FitnessWeights,
    #[serde(default)]
    pub penalties: PenaltyScales,
    pub ga: GaConfig,
    /// Per-query timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
    /// Traffic units split across the servers per evaluation.
    #[serde(default = "default_total_traffic")]
    pub total_traffic: f64,
    /// Seed of the search randomness. Drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Configuration {
    pub fn new(servers: Vec<String>, weights: FitnessWeights, ga: GaConfig) -> Self {
        Self {
            servers,
            weights,
            penalties: PenaltyScales::default(),
            ga,
            timeout_secs: default_timeout_secs(),
            total_traffic: default_total_traffic(),
            seed: None,
        }
    }

    /// Loads `path` with environment overrides and validates the result.
    #[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let configuration: Self = settings.try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    /// Parses and validates an inline YAML document.
    pub fn from_yaml(document: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(document, FileFormat::Yaml))
            .build()?;

        let configuration: Self = settings.try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }

    pub fn morphology(&self) -> Result<Morphology, GeneBoundError> {
        Ok(Morphology::uniform(self.servers.len(), self.ga.gene_bounds()?))
    }

    /// Checks every field; the first problem found is reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::NoServers);
        }

        let finite = [
            ("weights.throughput", self.weights.throughput),
            ("weights.latency", self.weights.latency),
            ("weights.error_rate", self.weights.error_rate),
            ("weights.load_variance", self.weights.load_variance),
            ("penalties.error_scale", self.penalties.error_scale),
            ("penalties.variance_scale", self.penalties.variance_scale),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
        }

        if !(self.timeout_secs.is_finite() && self.timeout_secs > 0.0) {
            return Err(ConfigError::out_of_range(
                "timeout_secs",
                format!("must be a positive number of seconds, got {}", self.timeout_secs),
            ));
        }
        if !(self.total_traffic.is_finite() && self.total_traffic > 0.0) {
            return Err(ConfigError::out_of_range(
                "total_traffic",
                format!("must be positive, got {}", self.total_traffic),
            ));
        }

        self.ga.validate()
    }
}
