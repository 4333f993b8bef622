//! Feedback-generating model of a single backend server.
//!
//! The model turns an injected traffic magnitude into latency, throughput and
//! error-rate signals. It remembers the most recent loads it was given, so two
//! calls with the same magnitude generally answer differently: the rolling
//! history and the wall-clock phase of the latency cycle both move between calls.
//!
//! ```text
//! latency    = base * (1 + avg_load * degradation) + A * sin(2πt / T) + max(0, load - cap) * penalty
//! error_rate = 0                                  load <  0.8 cap
//!            = 0.5 * (load - 0.8 cap) / 0.2 cap    0.8 cap <= load < cap
//!            = 1                                  load >= cap
//! throughput = min(load, cap) - max(0, load - 0.8 cap) * congestion + noise, floored at 0
//! ```

use super::{LoadHistory, Observation};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::instrument;

/// Fraction of the cap at which errors and congestion start.
const SATURATION_RATIO: f64 = 0.8;
/// Error rate reached just below the cap.
const ERROR_RATE_AT_CAP: f64 = 0.5;

/// Rejected traffic magnitude. The history is left untouched.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
#[error("invalid traffic magnitude: {reason}")]
pub struct InvalidInputError {
    reason: String,
}

impl InvalidInputError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A model parameter outside the range the response formulas are defined for.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
#[error("InvalidModelConfig: {field} {reason}")]
pub struct InvalidModelConfigError {
    field: &'static str,
    reason: &'static str,
}

/// Validates a raw magnitude: it must be finite and non-negative.
pub fn validate_traffic(traffic: f64) -> Result<f64, InvalidInputError> {
    if !traffic.is_finite() {
        return Err(InvalidInputError::new(format!("{traffic} is not finite")));
    }
    if traffic < 0.0 {
        return Err(InvalidInputError::new(format!("{traffic} is negative")));
    }
    Ok(traffic)
}

/// Coerces a JSON value into a traffic magnitude.
///
/// Numbers and numeric strings are accepted, everything else is rejected.
pub fn coerce_traffic(value: &serde_json::Value) -> Result<f64, InvalidInputError> {
    let traffic = match value {
        serde_json::Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| InvalidInputError::new(format!("{number} is not representable")))?,
        serde_json::Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| InvalidInputError::new(format!("{text:?} is not a number")))?,
        serde_json::Value::Null => return Err(InvalidInputError::new("traffic_load is missing")),
        other => {
            return Err(InvalidInputError::new(format!("{other} is not a number")));
        }
    };

    validate_traffic(traffic)
}

/// Response shape of one server under load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerModelConfig {
    /// Traffic threshold beyond which requests fail outright.
    pub cap: f64,
    /// Latency of an idle server, in milliseconds.
    pub base_latency_ms: f64,
    /// Relative latency increase per unit of rolling average load.
    pub load_degradation: f64,
    /// Amplitude of the cyclical latency term, in milliseconds.
    pub fluctuation_amplitude_ms: f64,
    /// Period of the cyclical latency term, in seconds.
    pub fluctuation_period_secs: f64,
    /// Extra latency per unit of traffic above the cap, in milliseconds.
    pub overload_penalty_ms: f64,
    /// Throughput lost per unit of traffic above the saturation point.
    pub congestion_factor: f64,
    /// Half-width of the symmetric throughput noise, in Mbps.
    pub throughput_noise_mbps: f64,
    pub history_capacity: usize,
}

impl Default for ServerModelConfig {
    fn default() -> Self {
        Self {
            cap: 80.0,
            base_latency_ms: 100.0,
            load_degradation: 0.01,
            fluctuation_amplitude_ms: 10.0,
            fluctuation_period_secs: 60.0,
            overload_penalty_ms: 5.0,
            congestion_factor: 2.0,
            throughput_noise_mbps: 1.0,
            history_capacity: super::load_history::DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl ServerModelConfig {
    pub fn with_cap(mut self, cap: f64) -> Self {
        self.cap = cap;
        self
    }

    /// Checks that every parameter is finite and in range.
    pub fn validate(&self) -> Result<(), InvalidModelConfigError> {
        let positive = [
            ("cap", self.cap),
            ("fluctuation_period_secs", self.fluctuation_period_secs),
        ];
        let non_negative = [
            ("base_latency_ms", self.base_latency_ms),
            ("load_degradation", self.load_degradation),
            ("fluctuation_amplitude_ms", self.fluctuation_amplitude_ms),
            ("overload_penalty_ms", self.overload_penalty_ms),
            ("congestion_factor", self.congestion_factor),
            ("throughput_noise_mbps", self.throughput_noise_mbps),
        ];

        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(InvalidModelConfigError {
                    field,
                    reason: "must be finite and positive",
                });
            }
        }
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(InvalidModelConfigError {
                    field,
                    reason: "must be finite and non-negative",
                });
            }
        }
        Ok(())
    }

    /// Removes the cyclical latency term and the throughput noise, leaving a
    /// model whose output depends only on its input and history.
    pub fn deterministic(mut self) -> Self {
        self.fluctuation_amplitude_ms = 0.0;
        self.throughput_noise_mbps = 0.0;
        self
    }
}

/// Everything a server reports for one injection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse {
    #[serde(flatten)]
    pub observation: Observation,
    pub handled_traffic: f64,
    pub avg_load: f64,
    pub load_variance: f64,
}

/// Read-only summary of a server's recent state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub avg_load: f64,
    pub latency_estimate_ms: f64,
    pub recent_loads: Vec<f64>,
}

/// A simulated server with memory of its recent load.
#[derive(Debug)]
pub struct ServerModel<R = StdRng> {
    config: ServerModelConfig,
    history: LoadHistory,
    rng: R,
}

impl ServerModel<StdRng> {
    /// Model with a reproducible noise source.
    pub fn seeded(config: ServerModelConfig, seed: u64) -> Self {
        Self::new(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ServerModel<R> {
    pub fn new(config: ServerModelConfig, rng: R) -> Self {
        let history = LoadHistory::new(config.history_capacity);
        Self {
            config,
            history,
            rng,
        }
    }

    pub fn config(&self) -> &ServerModelConfig {
        &self.config
    }

    pub fn history(&self) -> &LoadHistory {
        &self.history
    }

    /// Injects `traffic` now.
    pub fn respond(&mut self, traffic: f64) -> Result<ServerResponse, InvalidInputError> {
        self.respond_at(traffic, Utc::now())
    }

    /// Injects `traffic` as if the wall clock read `at`.
    #[instrument(level = "debug", skip(self), fields(cap = self.config.cap, history_len = self.history.len()))]
    pub fn respond_at(
        &mut self,
        traffic: f64,
        at: DateTime<Utc>,
    ) -> Result<ServerResponse, InvalidInputError> {
        let traffic = validate_traffic(traffic)?;

        self.history.push(traffic);
        let avg_load = self.history.average();
        let load_variance = self.history.variance();

        let latency_ms = self.base_latency(avg_load)
            + self.fluctuation(at)
            + self.overload_penalty(traffic);
        let error_rate = self.error_rate(traffic);
        let throughput_mbps = self.throughput(traffic);

        Ok(ServerResponse {
            observation: Observation::new(latency_ms, throughput_mbps, error_rate),
            handled_traffic: traffic,
            avg_load,
            load_variance,
        })
    }

    /// Summary without touching the history.
    pub fn status(&self) -> ServerStatus {
        let avg_load = self.history.average();
        let latency = self.base_latency(avg_load) + self.overload_penalty(avg_load);
        ServerStatus {
            avg_load,
            latency_estimate_ms: latency.clamp(0.0, f64::MAX),
            recent_loads: self.history.recent(5),
        }
    }

    fn base_latency(&self, avg_load: f64) -> f64 {
        self.config.base_latency_ms * (1.0 + avg_load * self.config.load_degradation)
    }

    fn fluctuation(&self, at: DateTime<Utc>) -> f64 {
        if self.config.fluctuation_amplitude_ms == 0.0 || self.config.fluctuation_period_secs <= 0.0
        {
            return 0.0;
        }
        let seconds = at.timestamp_millis() as f64 / 1000.0;
        let period = self.config.fluctuation_period_secs;
        let phase = (seconds % period) / period;
        self.config.fluctuation_amplitude_ms * (2.0 * PI * phase).sin()
    }

    fn overload_penalty(&self, traffic: f64) -> f64 {
        (traffic - self.config.cap).max(0.0) * self.config.overload_penalty_ms
    }

    fn error_rate(&self, traffic: f64) -> f64 {
        let cap = self.config.cap;
        let saturation = SATURATION_RATIO * cap;

        if traffic >= cap {
            1.0
        } else if traffic < saturation {
            0.0
        } else {
            ERROR_RATE_AT_CAP * (traffic - saturation) / (cap - saturation)
        }
    }

    fn throughput(&mut self, traffic: f64) -> f64 {
        let cap = self.config.cap;
        let saturation = SATURATION_RATIO * cap;

        let mut throughput = traffic.min(cap);
        if traffic > saturation {
            throughput -= (traffic - saturation) * self.config.congestion_factor;
        }

        let noise = self.config.throughput_noise_mbps;
        if noise > 0.0 && noise.is_finite() {
            throughput += self.rng.random_range(-noise..=noise);
        }

        throughput.max(0.0)
    }
}
