use super::Error;
use crate::builder::{Set, Unset};
use crate::config::GaConfig;
use crate::models::{
    Allocation, Breeder, Conclusion, Evaluator, Genotype, Morphology, Mutagen, Population,
    ScheduleDecision, SearchState,
};
use futures::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Result of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    /// Best individual of the whole run.
    pub best: Genotype,
    pub best_allocation: Allocation,
    pub best_fitness: f64,
    /// Best score of each generation, in order.
    pub history: Vec<f64>,
    pub generations: u32,
    pub conclusion: Conclusion,
    /// Seed of the generator drawn by [`Optimizer::run`]. `None` when the
    /// caller supplied the generator through [`Optimizer::run_with_rng`].
    pub seed: Option<u64>,
}

// optimization driver
pub struct Optimizer {
    evaluator: Arc<dyn Evaluator>,
    morphology: Morphology,
    ga: GaConfig,
    mutagen: Mutagen,
    seed: Option<u64>,
}

pub struct OptimizerBuilder<E, M> {
    evaluator: E,
    morphology: M,
    ga: GaConfig,
    seed: Option<u64>,
}

impl OptimizerBuilder<Unset<Arc<dyn Evaluator>>, Unset<Morphology>> {
    fn new(ga: GaConfig) -> Self {
        Self {
            evaluator: Unset::new(),
            morphology: Unset::new(),
            ga,
            seed: None,
        }
    }
}

impl<E, M> OptimizerBuilder<E, M> {
    pub fn with_evaluator(
        self,
        evaluator: impl Evaluator + 'static,
    ) -> OptimizerBuilder<Set<Arc<dyn Evaluator>>, M> {
        self.with_shared_evaluator(Arc::new(evaluator))
    }

    pub fn with_shared_evaluator(
        self,
        evaluator: Arc<dyn Evaluator>,
    ) -> OptimizerBuilder<Set<Arc<dyn Evaluator>>, M> {
        OptimizerBuilder {
            evaluator: Set::new(evaluator),
            morphology: self.morphology,
            ga: self.ga,
            seed: self.seed,
        }
    }

    pub fn with_morphology(self, morphology: Morphology) -> OptimizerBuilder<E, Set<Morphology>> {
        OptimizerBuilder {
            evaluator: self.evaluator,
            morphology: Set::new(morphology),
            ga: self.ga,
            seed: self.seed,
        }
    }

    /// Fixes the random source of the search. Drawn from the OS otherwise.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

impl OptimizerBuilder<Set<Arc<dyn Evaluator>>, Set<Morphology>> {
    #[instrument(level = "debug", skip(self), fields(population_size = self.ga.population_size, num_genes = self.morphology.as_ref_inner().len()))]
    pub fn build(self) -> Result<Optimizer, Error> {
        self.ga.validate()?;

        let morphology = self.morphology.into_inner();
        if morphology.is_empty() {
            return Err(Error::EmptyMorphology);
        }

        let mutagen = self
            .ga
            .mutagen()
            .map_err(|err| Error::ConfigurationError(err.into()))?;

        Ok(Optimizer {
            evaluator: self.evaluator.into_inner(),
            morphology,
            ga: self.ga,
            mutagen,
            seed: self.seed,
        })
    }
}

impl Optimizer {
    pub fn builder(ga: GaConfig) -> OptimizerBuilder<Unset<Arc<dyn Evaluator>>, Unset<Morphology>> {
        OptimizerBuilder::new(ga)
    }

    /// Runs the search until the generation budget is spent or the best
    /// fitness stagnates.
    pub async fn run(&self) -> Result<Outcome, Error> {
        let seed = self.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut outcome = self.run_with_rng(&mut rng).await?;
        outcome.seed = Some(seed);
        Ok(outcome)
    }

    /// Runs the search drawing every random decision from `rng`.
    ///
    /// Generations are strictly sequential: the next one is bred only after the
    /// current one is fully evaluated and recorded.
    #[instrument(level = "info", skip(self, rng), fields(population_size = self.ga.population_size, max_generations = self.ga.generations, patience = self.ga.patience, num_genes = self.morphology.len()))]
    pub async fn run_with_rng<R: Rng>(&self, rng: &mut R) -> Result<Outcome, Error> {
        let schedule = self.ga.schedule();
        let mut state = SearchState::default();

        let mut generation_id = 1;
        let mut genotypes = self.generate_initial_population(rng);

        let conclusion = loop {
            let population = self.evaluate_generation(generation_id, genotypes).await;
            state.record(&population);

            info!(
                generation = generation_id,
                generation_best = state.history().last().copied(),
                best_fitness = state.best_fitness(),
                stagnation = state.stagnation(),
                "Generation evaluated"
            );

            if let ScheduleDecision::Terminate(conclusion) = schedule.decide(&state) {
                break conclusion;
            }

            generation_id += 1;
            genotypes = self.breed_next_generation(&population, generation_id, rng)?;
        };

        let (best, best_fitness) = state
            .best()
            .cloned()
            .ok_or(Error::NoEvaluatedIndividuals)?;

        info!(
            best_fitness = best_fitness,
            generations = state.generation(),
            conclusion = %conclusion,
            "Optimization terminated"
        );

        Ok(Outcome {
            best_allocation: best.allocation(),
            best,
            best_fitness,
            history: state.history().to_vec(),
            generations: state.generation(),
            conclusion,
            seed: None,
        })
    }

    #[instrument(level = "debug", skip(self, rng), fields(population_size = self.ga.population_size, distribution = ?self.ga.distribution))]
    fn generate_initial_population<R: Rng>(&self, rng: &mut R) -> Vec<Genotype> {
        self.ga
            .distribution
            .distribute(self.ga.population_size, &self.morphology, rng)
            .into_iter()
            .map(|genome| Genotype::new(genome, 1))
            .collect()
    }

    /// Scores every genotype, keeping population order.
    #[instrument(level = "debug", skip(self, genotypes), fields(generation_id = generation_id, population_size = genotypes.len(), concurrency = self.ga.evaluation_concurrency))]
    async fn evaluate_generation(
        &self,
        generation_id: u32,
        genotypes: Vec<Genotype>,
    ) -> Population {
        let scores: Vec<f64> = stream::iter(genotypes.iter())
            .map(|genotype| self.evaluator.fitness(genotype.genome()))
            .buffered(self.ga.evaluation_concurrency.max(1))
            .collect()
            .await;

        Population::new(generation_id, genotypes.into_iter().zip(scores).collect())
    }

    /// Selects a mating pool, breeds offspring and carries over the elite.
    #[instrument(level = "debug", skip(self, population, rng), fields(next_generation_id = next_generation_id, parents_mating = self.ga.parents_mating, elitism = self.ga.elitism))]
    fn breed_next_generation<R: Rng>(
        &self,
        population: &Population,
        next_generation_id: u32,
        rng: &mut R,
    ) -> Result<Vec<Genotype>, Error> {
        let pool = self
            .ga
            .selection
            .select_parents(self.ga.parents_mating, population.scored(), rng)?;

        let num_offspring = self.ga.population_size.saturating_sub(self.ga.elitism);
        let breeder = Breeder::new(&self.ga.crossover, &self.mutagen, &self.morphology);
        let offspring = breeder.breed_batch(
            &pool,
            population.scored(),
            num_offspring,
            next_generation_id,
            rng,
        );

        let mut next_generation: Vec<Genotype> = population
            .elite(self.ga.elitism)
            .into_iter()
            .cloned()
            .collect();
        next_generation.extend(offspring);

        Ok(next_generation)
    }
}
