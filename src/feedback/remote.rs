use super::{FeedbackChannel, FeedbackUnavailableError};
use crate::models::{Observation, WORST_CASE_LATENCY_MS, validate_traffic};
use futures::future::BoxFuture;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::Instrument;

fn worst_latency() -> f64 {
    WORST_CASE_LATENCY_MS
}

fn worst_error_rate() -> f64 {
    1.0
}

/// Observation fields of a server reply. Anything missing counts against the server.
#[derive(Debug, Deserialize)]
struct ObservationBody {
    #[serde(default = "worst_latency")]
    latency_ms: f64,
    #[serde(default)]
    throughput_mbps: f64,
    #[serde(default = "worst_error_rate")]
    error_rate: f64,
}

/// Channel to a server reachable over HTTP.
///
/// Each query is a `POST` of `{"traffic_load": x}` to the server URL.
#[derive(Debug, Clone)]
pub struct RemoteChannel {
    url: String,
    client: Client,
    timeout: Duration,
}

impl RemoteChannel {
    /// Channel whose queries give up after `timeout`.
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FeedbackUnavailableError> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(FeedbackUnavailableError::Transport)?;

        Ok(Self::with_client(url, client, timeout))
    }

    /// Channel sharing an existing client and its connection pool.
    pub fn with_client(url: impl Into<String>, client: Client, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client,
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn query(&self, traffic_load: f64) -> Result<Observation, FeedbackUnavailableError> {
        let traffic_load = validate_traffic(traffic_load)?;

        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "traffic_load": traffic_load }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    FeedbackUnavailableError::Timeout(self.timeout)
                } else {
                    FeedbackUnavailableError::Transport(err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedbackUnavailableError::Status(status));
        }

        let body: ObservationBody = response
            .json()
            .await
            .map_err(FeedbackUnavailableError::Decode)?;

        Ok(Observation::new(
            body.latency_ms,
            body.throughput_mbps,
            body.error_rate,
        ))
    }
}

impl FeedbackChannel for RemoteChannel {
    fn id(&self) -> &str {
        &self.url
    }

    fn inject(
        &self,
        traffic_load: f64,
    ) -> BoxFuture<'_, Result<Observation, FeedbackUnavailableError>> {
        Box::pin(
            self.query(traffic_load)
                .instrument(tracing::debug_span!("inject", server = %self.url, traffic_load)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_defaults_missing_fields_to_worst_case() {
        let body: ObservationBody = serde_json::from_str(r#"{"handled_traffic": 12.0}"#).unwrap();

        assert_eq!(
            Observation::new(body.latency_ms, body.throughput_mbps, body.error_rate),
            Observation::worst_case()
        );
    }

    #[test]
    fn it_ignores_extra_fields() {
        let body: ObservationBody = serde_json::from_value(serde_json::json!({
            "latency_ms": 120.5,
            "throughput_mbps": 30.0,
            "error_rate": 0.1,
            "avg_load": 40.0,
        }))
        .unwrap();

        assert_eq!(body.latency_ms, 120.5);
        assert_eq!(body.throughput_mbps, 30.0);
        assert_eq!(body.error_rate, 0.1);
    }

    #[tokio::test]
    async fn it_rejects_negative_traffic_before_sending() {
        let channel =
            RemoteChannel::new("http://127.0.0.1:9/serve", Duration::from_millis(50)).unwrap();

        let result = channel.inject(-3.0).await;

        assert!(matches!(result, Err(FeedbackUnavailableError::InvalidInput(_))));
    }
}
