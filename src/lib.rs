mod builder;

pub mod bootstrap;
pub mod config;
pub mod feedback;
pub mod fitness;
pub mod models;
pub mod report;
pub mod server;
pub mod service;

pub use config::Configuration;
pub use fitness::FitnessEvaluator;
pub use service::{Optimizer, Outcome};
