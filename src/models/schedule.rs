use super::SearchState;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Controls when the search stops.
///
/// The schedule is consulted once per generation, after the generation has been
/// fully evaluated and recorded into the [`SearchState`]. There is no earlier
/// cancellation point: an in-flight generation always finishes.
///
/// # Termination
///
/// - **Generation budget**: the generation just recorded is the `max_generations`-th.
/// - **Stagnation**: `patience` consecutive generations went by without a strict
///   improvement of the best fitness seen so far.
///
/// When both fire on the same generation the budget is reported.
///
/// # Examples
///
/// ```rust
/// use traffic_ga::models::Schedule;
///
/// // At most 100 generations, stop after 20 without improvement
/// let schedule = Schedule::new(100, 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Schedule {
    /// Maximum number of generations, the initial population included.
    pub max_generations: u32,
    /// Generations without strict improvement tolerated before stopping early.
    pub patience: u32,
}

/// Why a run ended. Both are normal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    /// The configured number of generations was evaluated.
    GenerationBudget,
    /// The best fitness stopped improving for `patience` generations.
    Stagnated,
}

impl std::fmt::Display for Conclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GenerationBudget => write!(f, "generation budget reached"),
            Self::Stagnated => write!(f, "stagnated"),
        }
    }
}

/// Decision taken between two generations.
#[derive(Debug, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// Breed and evaluate another generation.
    Continue,
    /// Stop and report the best individual of the whole run.
    Terminate(Conclusion),
}

impl Schedule {
    pub fn new(max_generations: u32, patience: u32) -> Self {
        Self {
            max_generations,
            patience,
        }
    }

    #[instrument(level = "debug", skip(self, state), fields(generation = state.generation(), stagnation = state.stagnation()))]
    pub fn decide(&self, state: &SearchState) -> ScheduleDecision {
        if state.generation() >= self.max_generations {
            return ScheduleDecision::Terminate(Conclusion::GenerationBudget);
        }
        if state.stagnation() >= self.patience {
            return ScheduleDecision::Terminate(Conclusion::Stagnated);
        }
        ScheduleDecision::Continue
    }
}
