use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use traffic_ga::config::GaConfig;
use traffic_ga::feedback::{FeedbackChannel, LocalChannel};
use traffic_ga::fitness::{FitnessEvaluator, FitnessWeights};
use traffic_ga::models::{
    Conclusion, Evaluator, Gene, GeneBounds, Morphology, ServerModel, ServerModelConfig,
};
use traffic_ga::service::{Optimizer, Outcome};

const POPULATION_SIZE: usize = 10;

/// Scores every individual by the generation it is evaluated in.
///
/// Generations are inferred from the call count, so evaluation must be
/// sequential and without elitism shortcuts.
struct ByGeneration<F> {
    calls: AtomicUsize,
    score: F,
}

impl<F: Fn(usize) -> f64 + Send + Sync> ByGeneration<F> {
    fn new(score: F) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            score,
        }
    }
}

impl<F: Fn(usize) -> f64 + Send + Sync> Evaluator for ByGeneration<F> {
    fn fitness<'a>(&'a self, _genome: &'a [Gene]) -> BoxFuture<'a, f64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let generation = call / POPULATION_SIZE + 1;
        let score = (self.score)(generation);
        Box::pin(async move { score })
    }
}

async fn run(ga: GaConfig, evaluator: impl Evaluator + 'static) -> Outcome {
    Optimizer::builder(ga)
        .with_evaluator(evaluator)
        .with_morphology(Morphology::uniform(3, GeneBounds::default()))
        .with_seed(Some(7))
        .build()
        .unwrap()
        .run()
        .await
        .unwrap()
}

fn ga(generations: u32, patience: u32) -> GaConfig {
    let mut ga = GaConfig::new(generations, POPULATION_SIZE, 4, 10.0);
    ga.patience = patience;
    ga
}

#[tokio::test]
async fn test_stops_after_patience_generations_without_improvement() {
    let outcome = run(
        ga(100, 20),
        ByGeneration::new(|generation| generation.min(5) as f64),
    )
    .await;

    assert_eq!(outcome.conclusion, Conclusion::Stagnated);
    assert_eq!(outcome.generations, 25);
    assert_eq!(outcome.history.len(), 25);
    assert_eq!(outcome.best_fitness, 5.0);
    // First reached in generation 5, never replaced by an equal score
    assert_eq!(outcome.best.generation_id(), 5);
    assert!(outcome.history[4..].iter().all(|&fitness| fitness == 5.0));
}

#[tokio::test]
async fn test_stops_on_generation_budget() {
    let outcome = run(ga(7, 20), ByGeneration::new(|generation| generation as f64)).await;

    assert_eq!(outcome.conclusion, Conclusion::GenerationBudget);
    assert_eq!(outcome.generations, 7);
    assert_eq!(outcome.history, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    assert_eq!(outcome.best.generation_id(), 7);
}

#[tokio::test]
async fn test_reports_the_best_of_the_whole_run() {
    let outcome = run(
        ga(8, 20),
        ByGeneration::new(|generation| -((generation as f64) - 3.0).powi(2)),
    )
    .await;

    assert_eq!(outcome.generations, 8);
    assert_eq!(outcome.best_fitness, 0.0);
    assert_eq!(outcome.best.generation_id(), 3);
    assert!(outcome.history.last().copied().unwrap() < outcome.best_fitness);
}

#[tokio::test]
async fn test_optimizes_against_simulated_servers() {
    let channels: Vec<Arc<dyn FeedbackChannel>> = (0..2)
        .map(|i| {
            let config = ServerModelConfig::default().with_cap(40.0).deterministic();
            let model = ServerModel::seeded(config, i);
            Arc::new(LocalChannel::new(format!("server-{i}"), model)) as Arc<dyn FeedbackChannel>
        })
        .collect();
    let weights = FitnessWeights {
        throughput: 0.01,
        latency: 0.0,
        error_rate: 10.0,
        load_variance: 1.0,
    };
    let evaluator = FitnessEvaluator::new(channels, weights, Duration::from_secs(1));

    let mut ga = GaConfig::new(10, 8, 4, 50.0);
    ga.evaluation_concurrency = 4;
    let outcome = Optimizer::builder(ga)
        .with_evaluator(evaluator)
        .with_morphology(Morphology::uniform(2, GeneBounds::default()))
        .with_seed(Some(3))
        .build()
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(outcome.best_fitness.is_finite());
    assert_eq!(outcome.best_allocation.len(), 2);
    assert!((outcome.best_allocation.weights().iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!(outcome.history.iter().all(|&fitness| fitness <= outcome.best_fitness));
}
