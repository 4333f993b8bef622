use super::AppState;
use crate::models::{ServerStatus, WORST_CASE_LATENCY_MS, coerce_traffic};
use axum::{
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

#[derive(Serialize)]
struct StatusBody {
    status: &'static str,
    #[serde(flatten)]
    server: ServerStatus,
}

fn bad_request(reason: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response()
}

/// `POST /serve` with `{"traffic_load": <number>}`.
#[instrument(level = "debug", skip(state, body), fields(body_len = body.len()))]
pub(crate) async fn serve(State(state): State<AppState>, body: Bytes) -> Response {
    state.metrics.requests_total.inc();

    let traffic = serde_json::from_slice::<Value>(&body)
        .map_err(|err| err.to_string())
        .and_then(|body| {
            coerce_traffic(body.get("traffic_load").unwrap_or(&Value::Null))
                .map_err(|err| err.to_string())
        });
    let traffic = match traffic {
        Ok(traffic) => traffic,
        Err(reason) => {
            warn!(reason = %reason, "Rejected injection");
            state.metrics.invalid_requests_total.inc();
            return bad_request(reason);
        }
    };

    let response = {
        let mut model = state.model.lock().await;
        model.respond(traffic)
    };
    let response = match response {
        Ok(response) => response,
        Err(err) => {
            state.metrics.invalid_requests_total.inc();
            return bad_request(err.to_string());
        }
    };
    state.metrics.observe(&response);

    if state.simulate_latency {
        let latency_ms = response.observation.latency_ms.min(WORST_CASE_LATENCY_MS);
        tokio::time::sleep(Duration::from_secs_f64(latency_ms / 1000.0)).await;
    }

    if response.observation.error_rate >= 1.0 {
        state.metrics.overloaded_total.inc();
        debug!(traffic = traffic, "Overloaded");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Overloaded", "error_rate": 1.0 })),
        )
            .into_response();
    }

    (StatusCode::OK, Json(response)).into_response()
}

/// `GET /status`. Never touches the history.
pub(crate) async fn status(State(state): State<AppState>) -> Json<impl Serialize> {
    let server = state.model.lock().await.status();
    Json(StatusBody {
        status: "ok",
        server,
    })
}

/// `GET /metrics` in the Prometheus text format.
pub(crate) async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
