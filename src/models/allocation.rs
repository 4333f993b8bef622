use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Traffic-split proportions across the configured servers.
///
/// Positions map to the externally supplied server list. An `Allocation` built
/// through [`Allocation::normalize`] always sums to 1.0 (within floating
/// tolerance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    weights: Vec<f64>,
}

impl Allocation {
    /// Normalizes raw shares into proportions summing to 1.0.
    ///
    /// All-zero or empty input has no meaningful ratio, so it degrades to a
    /// uniform split. That case is reported as a warning and never fails.
    /// Negative and non-finite shares are treated as zero.
    #[instrument(level = "debug", skip(raw), fields(len = raw.len()))]
    pub fn normalize(raw: &[f64]) -> Self {
        Self::try_normalize(raw).unwrap_or_else(|| {
            tracing::warn!(
                len = raw.len(),
                "Degenerate allocation, falling back to a uniform split"
            );
            Self::uniform(raw.len())
        })
    }

    /// Like [`Allocation::normalize`], but `None` when the shares carry no ratio.
    pub fn try_normalize(raw: &[f64]) -> Option<Self> {
        let cleaned: Vec<f64> = raw
            .iter()
            .map(|&share| if share.is_finite() && share > 0.0 { share } else { 0.0 })
            .collect();
        let total: f64 = cleaned.iter().sum();

        (total > 0.0 && total.is_finite()).then(|| Self {
            weights: cleaned.iter().map(|share| share / total).collect(),
        })
    }

    /// Equal shares for `n` servers. Empty when `n` is zero.
    pub fn uniform(n: usize) -> Self {
        Self {
            weights: vec![1.0 / n as f64; n],
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Sample variance of the proportions, measuring how uneven the split is.
    /// Zero when fewer than two servers are allocated.
    pub fn variance(&self) -> f64 {
        sample_variance(&self.weights)
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator). Zero for fewer than two values.
pub(crate) fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean(values);
    let squares: f64 = values.iter().map(|value| (value - mean).powi(2)).sum();
    squares / (values.len() - 1) as f64
}
