use super::{FeedbackChannel, FeedbackUnavailableError};
use crate::models::{Observation, ServerModel, WORST_CASE_LATENCY_MS};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::Instrument;

/// A server model that several tasks can query, one writer at a time.
pub type SharedModel = Arc<Mutex<ServerModel>>;

/// In-process channel backed by a [`ServerModel`].
#[derive(Debug, Clone)]
pub struct LocalChannel {
    id: String,
    model: SharedModel,
    simulate_latency: bool,
}

impl LocalChannel {
    pub fn new(id: impl Into<String>, model: ServerModel) -> Self {
        Self::from_shared(id, Arc::new(Mutex::new(model)))
    }

    pub fn from_shared(id: impl Into<String>, model: SharedModel) -> Self {
        Self {
            id: id.into(),
            model,
            simulate_latency: false,
        }
    }

    /// Sleep for the reported latency after each query, outside the lock.
    pub fn with_simulated_latency(mut self, simulate_latency: bool) -> Self {
        self.simulate_latency = simulate_latency;
        self
    }

    pub fn model(&self) -> &SharedModel {
        &self.model
    }
}

impl FeedbackChannel for LocalChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn inject(
        &self,
        traffic_load: f64,
    ) -> BoxFuture<'_, Result<Observation, FeedbackUnavailableError>> {
        Box::pin(async move {
            let response = {
                let mut model = self.model.lock().await;
                model.respond(traffic_load)?
            };

            if self.simulate_latency {
                let latency_ms = response.observation.latency_ms.min(WORST_CASE_LATENCY_MS);
                tokio::time::sleep(Duration::from_secs_f64(latency_ms / 1000.0)).await;
            }

            Ok(response.observation)
        }
        .instrument(tracing::debug_span!("inject", server = %self.id, traffic_load)))
    }
}
