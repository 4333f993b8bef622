mod errors;
mod service;

pub use errors::Error;
pub use service::{Optimizer, OptimizerBuilder, Outcome};
