//! Metrics endpoint handler for Prometheus scraping.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use prometheus::{Encoder, TextEncoder};
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Buffer capacity for metrics encoding.
const BUFFER_CAP: usize = 16 * 1024;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response()
    }
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(State(state): State<SharedState>) -> Result<String, MetricsError> {
    let start = Instant::now();
    debug!("Processing /metrics request");

    let stats = state.service.stats();
    let (last_read_ms, _, _, _, _) = stats.read_duration_ms.snapshot();
    state.metrics.update(
        &stats.snapshot(),
        state.service.session().current_selection(),
        last_read_ms,
        state.start_time.elapsed().as_secs(),
    );

    let families = state.registry.gather();
    let mut buffer = Vec::with_capacity(BUFFER_CAP);
    let encoder = TextEncoder::new();

    if encoder.encode(&families, &mut buffer).is_err() {
        error!("Failed to encode Prometheus metrics");
        return Err(MetricsError::EncodingFailed);
    }

    state.metrics.scrape_duration.set(start.elapsed().as_secs_f64());
    debug!(
        "Metrics request completed: {} bytes, {:.3}ms",
        buffer.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    String::from_utf8(buffer).map_err(|e| {
        error!("Prometheus encoder produced invalid UTF-8: {}", e);
        MetricsError::EncodingFailed
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_state;

    #[tokio::test]
    async fn test_metrics_reflect_queries() {
        let state = test_state(vec![]);
        state.service.write(b"9").unwrap();
        state.service.read();
        assert!(state.service.write(b"zero").is_err());

        let text = metrics_handler(State(state)).await.unwrap();
        assert!(text.contains("herakles_process_info_selected_pid 9"));
        assert!(text.contains("herakles_process_info_reads{outcome=\"not_found\"} 1"));
        assert!(text.contains("herakles_process_info_writes{result=\"invalid\"} 1"));
    }
}
