use serde::{Deserialize, Serialize};

/// Latency reported for a server that could not be reached.
pub const WORST_CASE_LATENCY_MS: f64 = 1000.0;

/// One server's response to an injected traffic magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Milliseconds, never negative.
    pub latency_ms: f64,
    /// Mbps, never negative.
    pub throughput_mbps: f64,
    /// Fraction of failed requests in [0, 1].
    pub error_rate: f64,
}

impl Observation {
    /// Builds an observation, clamping every field into its domain.
    ///
    /// Non-finite values collapse to the worst end of their range.
    pub fn new(latency_ms: f64, throughput_mbps: f64, error_rate: f64) -> Self {
        Self {
            latency_ms: if latency_ms.is_nan() {
                WORST_CASE_LATENCY_MS
            } else {
                latency_ms.clamp(0.0, f64::MAX)
            },
            throughput_mbps: if throughput_mbps.is_nan() {
                0.0
            } else {
                throughput_mbps.clamp(0.0, f64::MAX)
            },
            error_rate: if error_rate.is_nan() {
                1.0
            } else {
                error_rate.clamp(0.0, 1.0)
            },
        }
    }

    /// Stand-in for a server whose feedback could not be obtained.
    pub fn worst_case() -> Self {
        Self {
            latency_ms: WORST_CASE_LATENCY_MS,
            throughput_mbps: 0.0,
            error_rate: 1.0,
        }
    }
}
