use crate::models::ServerResponse;
use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};

/// Gauges of the last answered injection plus request counters.
#[derive(Clone)]
pub struct ServerMetrics {
    registry: Registry,
    pub traffic_load: Gauge,
    pub avg_load: Gauge,
    pub latency_ms: Gauge,
    pub throughput_mbps: Gauge,
    pub error_rate: Gauge,
    pub requests_total: IntCounter,
    pub invalid_requests_total: IntCounter,
    pub overloaded_total: IntCounter,
}

impl ServerMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let metrics = Self {
            registry: Registry::new(),
            traffic_load: Gauge::new("traffic_load", "Traffic injected by the last request")?,
            avg_load: Gauge::new("avg_load", "Rolling average of recent traffic")?,
            latency_ms: Gauge::new("latency_ms", "Latency reported for the last request")?,
            throughput_mbps: Gauge::new(
                "throughput_mbps",
                "Throughput reported for the last request",
            )?,
            error_rate: Gauge::new("error_rate", "Error rate reported for the last request")?,
            requests_total: IntCounter::new("requests_total", "Injection requests received")?,
            invalid_requests_total: IntCounter::new(
                "invalid_requests_total",
                "Injection requests rejected as malformed",
            )?,
            overloaded_total: IntCounter::new(
                "overloaded_total",
                "Injection requests answered as overloaded",
            )?,
        };

        metrics.registry.register(Box::new(metrics.traffic_load.clone()))?;
        metrics.registry.register(Box::new(metrics.avg_load.clone()))?;
        metrics.registry.register(Box::new(metrics.latency_ms.clone()))?;
        metrics.registry.register(Box::new(metrics.throughput_mbps.clone()))?;
        metrics.registry.register(Box::new(metrics.error_rate.clone()))?;
        metrics.registry.register(Box::new(metrics.requests_total.clone()))?;
        metrics.registry.register(Box::new(metrics.invalid_requests_total.clone()))?;
        metrics.registry.register(Box::new(metrics.overloaded_total.clone()))?;

        Ok(metrics)
    }

    pub fn observe(&self, response: &ServerResponse) {
        self.traffic_load.set(response.handled_traffic);
        self.avg_load.set(response.avg_load);
        self.latency_ms.set(response.observation.latency_ms);
        self.throughput_mbps.set(response.observation.throughput_mbps);
        self.error_rate.set(response.observation.error_rate);
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}
