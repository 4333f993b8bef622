//! Traffic injection channels.
//!
//! A channel delivers one traffic magnitude to one server and brings back the
//! server's [`Observation`]. The fitness evaluator holds one channel per
//! configured server, in the configured order.

mod local;
mod remote;

use crate::models::{InvalidInputError, Observation};
use futures::future::BoxFuture;
use std::time::Duration;

pub use local::{LocalChannel, SharedModel};
pub use remote::RemoteChannel;

/// A server's feedback could not be obtained.
///
/// Never fatal to a search: the evaluator substitutes a worst-case observation.
#[derive(Debug, thiserror::Error)]
pub enum FeedbackUnavailableError {
    #[error("Timeout: no response within {0:?}")]
    Timeout(Duration),
    #[error("Transport: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Status: server answered {0}")]
    Status(reqwest::StatusCode),
    #[error("Decode: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("InvalidInput: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

/// One server's feedback channel.
///
/// Queries to the same channel must reach the server one at a time, in the
/// order they were issued, because the server's load history is order
/// sensitive.
pub trait FeedbackChannel: Send + Sync {
    /// Identifier used in logs and reports, usually the server URL.
    fn id(&self) -> &str;

    fn inject(
        &self,
        traffic_load: f64,
    ) -> BoxFuture<'_, Result<Observation, FeedbackUnavailableError>>;
}
