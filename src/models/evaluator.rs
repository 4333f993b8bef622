use super::Gene;
use futures::future::BoxFuture;

/// Objective function returning the fitness of one raw genome. Higher is better.
///
/// Evaluation is infallible from the search's point of view: implementations
/// contain their own failures and always resolve to a finite score.
pub trait Evaluator: Send + Sync {
    fn fitness<'a>(&'a self, genome: &'a [Gene]) -> BoxFuture<'a, f64>;
}
