//! Fitness of a traffic split.
//!
//! The score of an allocation is
//!
//! ```text
//! avg_throughput * W_throughput
//!     - avg_latency * W_latency
//!     - avg_error * error_scale * W_error
//!     - variance(weights) * variance_scale * W_variance
//! ```
//!
//! where the averages run over one observation per server and the variance is
//! the sample variance of the normalized allocation itself. `error_scale` (20)
//! and `variance_scale` (10) bring the error and imbalance penalties to the
//! magnitude of typical throughput and latency figures.

use crate::feedback::FeedbackChannel;
use crate::models::{Allocation, Evaluator, Gene, Observation, mean};
use futures::future::{BoxFuture, join_all};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Traffic units split across the servers for every evaluation.
pub const DEFAULT_TOTAL_TRAFFIC: f64 = 100.0;

/// Relative importance of each term of the score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessWeights {
    pub throughput: f64,
    pub latency: f64,
    pub error_rate: f64,
    pub load_variance: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            throughput: 1.0,
            latency: 0.1,
            error_rate: 1.0,
            load_variance: 1.0,
        }
    }
}

/// Fixed multipliers applied on top of the error and imbalance weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyScales {
    pub error_scale: f64,
    pub variance_scale: f64,
}

impl Default for PenaltyScales {
    fn default() -> Self {
        Self {
            error_scale: 20.0,
            variance_scale: 10.0,
        }
    }
}

/// Scores a set of per-server observations taken for `allocation`.
pub fn score(
    observations: &[Observation],
    allocation: &Allocation,
    weights: &FitnessWeights,
    penalties: &PenaltyScales,
) -> f64 {
    let latencies: Vec<f64> = observations.iter().map(|o| o.latency_ms).collect();
    let throughputs: Vec<f64> = observations.iter().map(|o| o.throughput_mbps).collect();
    let error_rates: Vec<f64> = observations.iter().map(|o| o.error_rate).collect();

    let score = mean(&throughputs) * weights.throughput
        - mean(&latencies) * weights.latency
        - mean(&error_rates) * penalties.error_scale * weights.error_rate
        - allocation.variance() * penalties.variance_scale * weights.load_variance;

    if score.is_nan() {
        return f64::MIN;
    }
    score.clamp(f64::MIN, f64::MAX)
}

/// Result of one evaluation, kept for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub allocation: Allocation,
    pub observations: Vec<Observation>,
    pub score: f64,
    /// The raw shares carried no usable ratio for the configured servers and
    /// were replaced by a uniform split.
    pub degenerate: bool,
}

/// Turns an allocation into a score by querying every server's channel.
#[derive(Clone)]
pub struct FitnessEvaluator {
    channels: Vec<Arc<dyn FeedbackChannel>>,
    weights: FitnessWeights,
    penalties: PenaltyScales,
    total_traffic: f64,
    timeout: Duration,
}

impl std::fmt::Debug for FitnessEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FitnessEvaluator")
            .field("servers", &self.server_ids())
            .field("weights", &self.weights)
            .field("penalties", &self.penalties)
            .field("total_traffic", &self.total_traffic)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl FitnessEvaluator {
    pub fn new(
        channels: Vec<Arc<dyn FeedbackChannel>>,
        weights: FitnessWeights,
        timeout: Duration,
    ) -> Self {
        Self {
            channels,
            weights,
            penalties: PenaltyScales::default(),
            total_traffic: DEFAULT_TOTAL_TRAFFIC,
            timeout,
        }
    }

    pub fn with_penalties(mut self, penalties: PenaltyScales) -> Self {
        self.penalties = penalties;
        self
    }

    pub fn with_total_traffic(mut self, total_traffic: f64) -> Self {
        self.total_traffic = total_traffic;
        self
    }

    pub fn num_servers(&self) -> usize {
        self.channels.len()
    }

    pub fn server_ids(&self) -> Vec<&str> {
        self.channels.iter().map(|channel| channel.id()).collect()
    }

    /// Queries one server, containing every failure as a worst-case observation.
    async fn observe(&self, channel: &dyn FeedbackChannel, traffic_load: f64) -> Observation {
        match tokio::time::timeout(self.timeout, channel.inject(traffic_load)).await {
            Ok(Ok(observation)) => observation,
            Ok(Err(err)) => {
                warn!(
                    server = channel.id(),
                    error = %err,
                    "Feedback unavailable, assuming worst case"
                );
                Observation::worst_case()
            }
            Err(_) => {
                warn!(
                    server = channel.id(),
                    timeout = ?self.timeout,
                    "Feedback timed out, assuming worst case"
                );
                Observation::worst_case()
            }
        }
    }

    /// Normalizes `raw` over the configured servers.
    ///
    /// Shares without a ratio (empty, all zero) and vectors whose length does
    /// not match the server list fall back to a uniform split across all servers.
    fn allocate(&self, raw: &[f64]) -> (Allocation, bool) {
        let num_servers = self.channels.len();
        match Allocation::try_normalize(raw) {
            Some(allocation) if allocation.len() == num_servers => (allocation, false),
            _ => {
                warn!(
                    allocation_len = raw.len(),
                    num_servers,
                    "Degenerate allocation, falling back to a uniform split"
                );
                (Allocation::uniform(num_servers), true)
            }
        }
    }

    /// Normalizes `raw`, injects each share of the traffic budget and scores the result.
    ///
    /// Servers are queried concurrently. Never fails: unreachable servers count
    /// as worst case.
    #[instrument(level = "debug", skip(self, raw), fields(num_servers = self.channels.len()))]
    pub async fn evaluate_detailed(&self, raw: &[f64]) -> Evaluation {
        let (allocation, degenerate) = self.allocate(raw);

        let observations = join_all(
            self.channels
                .iter()
                .zip(allocation.weights())
                .map(|(channel, share)| self.observe(channel.as_ref(), share * self.total_traffic)),
        )
        .await;

        let score = score(&observations, &allocation, &self.weights, &self.penalties);
        debug!(score = score, degenerate = degenerate, "Evaluated allocation");

        Evaluation {
            allocation,
            observations,
            score,
            degenerate,
        }
    }

    pub async fn evaluate(&self, raw: &[f64]) -> f64 {
        self.evaluate_detailed(raw).await.score
    }
}

impl Evaluator for FitnessEvaluator {
    fn fitness<'a>(&'a self, genome: &'a [Gene]) -> BoxFuture<'a, f64> {
        Box::pin(self.evaluate(genome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{FeedbackUnavailableError, LocalChannel};
    use crate::models::{ServerModel, ServerModelConfig};

    const EPSILON: f64 = 1e-9;

    fn observation(latency_ms: f64, throughput_mbps: f64, error_rate: f64) -> Observation {
        Observation::new(latency_ms, throughput_mbps, error_rate)
    }

    fn local_channels(n: usize, cap: f64) -> Vec<Arc<dyn FeedbackChannel>> {
        (0..n)
            .map(|i| {
                let config = ServerModelConfig::default().with_cap(cap).deterministic();
                let model = ServerModel::seeded(config, i as u64);
                Arc::new(LocalChannel::new(format!("server-{i}"), model))
                    as Arc<dyn FeedbackChannel>
            })
            .collect()
    }

    /// Never answers.
    struct StalledChannel;

    impl FeedbackChannel for StalledChannel {
        fn id(&self) -> &str {
            "stalled"
        }

        fn inject(
            &self,
            _traffic_load: f64,
        ) -> BoxFuture<'_, Result<Observation, FeedbackUnavailableError>> {
            Box::pin(futures::future::pending())
        }
    }

    #[test]
    fn it_applies_the_scaling_factors() {
        let weights = FitnessWeights {
            throughput: 1.0,
            latency: 1.0,
            error_rate: 1.0,
            load_variance: 1.0,
        };
        let observations = [observation(100.0, 50.0, 0.5), observation(200.0, 30.0, 0.0)];
        let allocation = Allocation::normalize(&[0.7, 0.3]);

        let score = score(&observations, &allocation, &weights, &PenaltyScales::default());

        // 40 - 150 - 0.25 * 20 - 0.08 * 10
        assert!((score - (-115.8)).abs() < EPSILON);
    }

    #[test]
    fn it_decreases_with_error_rate() {
        let weights = FitnessWeights::default();
        let allocation = Allocation::uniform(3);
        let penalties = PenaltyScales::default();

        let mut previous = f64::INFINITY;
        for error_rate in [0.0, 0.1, 0.5, 0.9, 1.0] {
            let observations = [
                observation(120.0, 20.0, 0.0),
                observation(120.0, 20.0, error_rate),
                observation(120.0, 20.0, 0.0),
            ];
            let current = score(&observations, &allocation, &weights, &penalties);
            assert!(current < previous);
            previous = current;
        }
    }

    #[test]
    fn it_penalizes_imbalance() {
        let weights = FitnessWeights::default();
        let penalties = PenaltyScales::default();
        let observations = [observation(120.0, 20.0, 0.0), observation(120.0, 20.0, 0.0)];

        let score_of = |raw: &[f64]| {
            score(&observations, &Allocation::normalize(raw), &weights, &penalties)
        };

        let even = score_of(&[0.5, 0.5]);
        let skewed = score_of(&[0.6, 0.4]);
        let extreme = score_of(&[0.95, 0.05]);

        assert!(even >= skewed);
        assert!(skewed >= extreme);
        assert!(even > extreme);
    }

    #[test]
    fn it_ignores_imbalance_for_a_single_server() {
        let weights = FitnessWeights::default();
        let observations = [observation(100.0, 10.0, 0.0)];

        let allocation = Allocation::normalize(&[0.4]);

        let score = score(&observations, &allocation, &weights, &PenaltyScales::default());

        assert!((score - (10.0 - 10.0)).abs() < EPSILON);
    }

    #[tokio::test]
    async fn it_prefers_a_split_that_keeps_one_server_under_cap() {
        let weights = FitnessWeights {
            throughput: 0.01,
            latency: 0.0,
            error_rate: 10.0,
            load_variance: 1.0,
        };

        let timeout = Duration::from_secs(2);

        let even = FitnessEvaluator::new(local_channels(2, 40.0), weights, timeout)
            .evaluate_detailed(&[0.5, 0.5])
            .await;
        let uneven = FitnessEvaluator::new(local_channels(2, 40.0), weights, timeout)
            .evaluate_detailed(&[0.7, 0.3])
            .await;

        assert!(even.observations.iter().all(|o| o.error_rate == 1.0));
        assert_eq!(uneven.observations[0].error_rate, 1.0);
        assert_eq!(uneven.observations[1].error_rate, 0.0);
        assert!(even.score < uneven.score);
    }

    #[tokio::test(start_paused = true)]
    async fn it_contains_a_stalled_server() {
        let mut channels = local_channels(2, 80.0);
        channels.insert(1, Arc::new(StalledChannel));
        let evaluator =
            FitnessEvaluator::new(channels, FitnessWeights::default(), Duration::from_millis(50));

        let evaluation = evaluator.evaluate_detailed(&[1.0, 1.0, 1.0]).await;

        assert!(evaluation.score.is_finite());
        assert_eq!(evaluation.observations[1], Observation::worst_case());
        assert!(evaluation.observations[0].error_rate < 1.0);
    }

    fn evaluator(n: usize) -> FitnessEvaluator {
        FitnessEvaluator::new(
            local_channels(n, 40.0),
            FitnessWeights::default(),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn it_falls_back_to_uniform_for_degenerate_input() {
        let evaluation = evaluator(2).evaluate_detailed(&[0.0, 0.0]).await;

        assert_eq!(evaluation.allocation.weights(), &[0.5, 0.5]);
        assert!(evaluation.degenerate);
        assert!(evaluation.score.is_finite());
    }

    #[tokio::test]
    async fn it_spreads_an_empty_allocation_over_every_server() {
        let empty = evaluator(3).evaluate_detailed(&[]).await;
        let even = evaluator(3).evaluate_detailed(&[1.0; 3]).await;

        assert!(empty.degenerate);
        assert!(!even.degenerate);
        assert_eq!(empty.observations.len(), 3);
        assert_eq!(empty.allocation, even.allocation);
        assert_eq!(empty.observations, even.observations);
        assert!((empty.score - even.score).abs() < EPSILON);
    }

    #[tokio::test]
    async fn it_spreads_a_mismatched_allocation_over_every_server() {
        let short = evaluator(3).evaluate_detailed(&[1.0]).await;
        let long = evaluator(3).evaluate_detailed(&[1.0, 2.0, 3.0, 4.0]).await;
        let even = evaluator(3).evaluate(&[1.0; 3]).await;

        for evaluation in [short, long] {
            assert!(evaluation.degenerate);
            assert_eq!(evaluation.observations.len(), 3);
            assert_eq!(evaluation.allocation, Allocation::uniform(3));
            assert!((evaluation.score - even).abs() < EPSILON);
        }
    }

    #[tokio::test]
    async fn it_flags_only_degenerate_allocations() {
        let evaluation = evaluator(2).evaluate_detailed(&[0.7, 0.3]).await;

        assert!(!evaluation.degenerate);
        assert_eq!(evaluation.observations.len(), 2);
    }
}
