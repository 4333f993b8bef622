use crate::models::Conclusion;
use crate::service::Outcome;
use serde::Serialize;
use std::fmt;

/// Shares as percentages of their sum, rounded to two decimals.
///
/// Everything is 0 when the shares sum to 0.
pub fn scale_to_percent(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    values
        .iter()
        .map(|value| {
            if total == 0.0 {
                0.0
            } else {
                (value / total * 100.0 * 100.0).round() / 100.0
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerShare {
    pub server: String,
    pub percent: f64,
}

/// Summary of a finished run, for people and for plotting tools.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub allocation: Vec<ServerShare>,
    pub best_fitness: f64,
    pub generations: u32,
    pub conclusion: Conclusion,
    /// Best fitness of every generation, in order.
    pub history: Vec<f64>,
    pub seed: Option<u64>,
}

impl Report {
    /// Pairs the best allocation of `outcome` with the server list it was searched over.
    pub fn new<S: AsRef<str>>(servers: &[S], outcome: &Outcome) -> Self {
        let allocation = servers
            .iter()
            .zip(scale_to_percent(outcome.best_allocation.weights()))
            .map(|(server, percent)| ServerShare {
                server: server.as_ref().to_string(),
                percent,
            })
            .collect();

        Self {
            allocation,
            best_fitness: outcome.best_fitness,
            generations: outcome.generations,
            conclusion: outcome.conclusion,
            history: outcome.history.clone(),
            seed: outcome.seed,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Best Traffic Allocation:")?;
        for (i, share) in self.allocation.iter().enumerate() {
            writeln!(f, "Server {} ({}): {}%", i + 1, share.server, share.percent)?;
        }
        writeln!(f)?;
        writeln!(f, "Best Fitness Score: {:.3}", self.best_fitness)?;
        match self.seed {
            Some(seed) => write!(
                f,
                "Generations: {} ({}, seed {seed})",
                self.generations, self.conclusion
            ),
            None => write!(f, "Generations: {} ({})", self.generations, self.conclusion),
        }
    }
}
