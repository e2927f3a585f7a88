use crate::server::SharedState;
use axum::{extract::State, response::IntoResponse};
use prometheus::{Encoder, TextEncoder};

pub async fn metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let metric_families = state.metrics.registry.gather();

    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new().into_response();
    }

    String::from_utf8_lossy(&buffer).into_owned().into_response()
}
