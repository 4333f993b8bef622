use super::{Allocation, Genotype, Population};
use tracing::{debug, instrument};

/// Everything the search carries from one generation to the next.
///
/// Threaded explicitly through the run loop: each evaluated generation is
/// folded in with [`SearchState::record`], and the [`Schedule`](super::Schedule)
/// reads it to decide whether to go on.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    generation: u32,
    best: Option<(Genotype, f64)>,
    stagnation: u32,
    history: Vec<f64>,
}

impl SearchState {
    /// Number of generations recorded so far.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Consecutive generations without strict improvement.
    pub fn stagnation(&self) -> u32 {
        self.stagnation
    }

    /// Best score of every recorded generation, in order.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Best individual seen over the whole run.
    pub fn best(&self) -> Option<&(Genotype, f64)> {
        self.best.as_ref()
    }

    pub fn best_fitness(&self) -> Option<f64> {
        self.best.as_ref().map(|(_, fitness)| *fitness)
    }

    pub fn best_allocation(&self) -> Option<Allocation> {
        self.best.as_ref().map(|(genotype, _)| genotype.allocation())
    }

    /// Folds an evaluated generation into the state.
    ///
    /// Returns `true` when the generation strictly improved on the best so far.
    /// Only a strict improvement replaces the tracked best and resets the
    /// stagnation counter.
    #[instrument(level = "debug", skip(self, population), fields(generation_id = population.generation_id(), population_size = population.len()))]
    pub(crate) fn record(&mut self, population: &Population) -> bool {
        self.generation += 1;

        let Some((genotype, fitness)) = population.best() else {
            self.stagnation += 1;
            return false;
        };
        self.history.push(*fitness);

        let improved = match &self.best {
            Some((_, best_fitness)) => fitness > best_fitness,
            None => true,
        };

        if improved {
            debug!(fitness = *fitness, "New best fitness");
            self.best = Some((genotype.clone(), *fitness));
            self.stagnation = 0;
        } else {
            self.stagnation += 1;
        }

        improved
    }
}
