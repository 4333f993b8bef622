use crate::config::{ConfigError, Configuration};
use crate::feedback::{FeedbackChannel, FeedbackUnavailableError, LocalChannel, RemoteChannel};
use crate::fitness::FitnessEvaluator;
use crate::models::{ServerModel, ServerModelConfig};
use crate::service::{self, Optimizer};
use rand::SeedableRng;
use rand::rngs::StdRng;
use reqwest::ClientBuilder;
use std::sync::Arc;
use tracing::instrument;

/// Where the feedback of each configured server comes from.
#[derive(Debug, Clone, Default)]
pub enum Backend {
    /// POST to each server URL.
    #[default]
    Remote,
    /// One in-process server model per configured server.
    Simulated {
        model: ServerModelConfig,
        /// Seeds server `i` with `seed + i`.
        seed: Option<u64>,
        simulate_latency: bool,
    },
}

#[instrument(
    level = "debug",
    skip(config),
    fields(num_servers = config.servers.len(), backend = ?backend)
)]
pub fn build_channels(
    config: &Configuration,
    backend: &Backend,
) -> Result<Vec<Arc<dyn FeedbackChannel>>, service::Error> {
    match backend {
        Backend::Remote => {
            let client = ClientBuilder::new()
                .timeout(config.timeout())
                .build()
                .map_err(FeedbackUnavailableError::Transport)?;

            Ok(config
                .servers
                .iter()
                .map(|url| {
                    Arc::new(RemoteChannel::with_client(url, client.clone(), config.timeout()))
                        as Arc<dyn FeedbackChannel>
                })
                .collect())
        }
        Backend::Simulated {
            model,
            seed,
            simulate_latency,
        } => {
            model.validate().map_err(ConfigError::from)?;

            Ok(config
                .servers
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    let rng = match seed {
                        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
                        None => StdRng::from_os_rng(),
                    };
                    let channel = LocalChannel::new(id, ServerModel::new(model.clone(), rng))
                        .with_simulated_latency(*simulate_latency);
                    Arc::new(channel) as Arc<dyn FeedbackChannel>
                })
                .collect())
        }
    }
}

pub fn build_evaluator(
    config: &Configuration,
    backend: &Backend,
) -> Result<FitnessEvaluator, service::Error> {
    Ok(
        FitnessEvaluator::new(build_channels(config, backend)?, config.weights, config.timeout())
            .with_penalties(config.penalties)
            .with_total_traffic(config.total_traffic),
    )
}

/// Validates `config` and wires an optimizer over the configured servers.
#[instrument(level = "info", skip(config), fields(num_servers = config.servers.len()))]
pub fn bootstrap_optimizer(
    config: &Configuration,
    backend: &Backend,
) -> Result<Optimizer, service::Error> {
    config.validate()?;

    let morphology = config.morphology().map_err(ConfigError::from)?;
    let evaluator = build_evaluator(config, backend)?;

    Optimizer::builder(config.ga.clone())
        .with_evaluator(evaluator)
        .with_morphology(morphology)
        .with_seed(config.seed)
        .build()
}
