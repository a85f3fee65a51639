//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! service uptime and query statistics.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::SharedState;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str = "Project: https://github.com/cansp-dev/herakles-process-info - More info: https://www.herakles.now - Support: exporter@herakles.now";

/// Formats an uptime in the largest sensible unit.
pub fn format_uptime(uptime_seconds: u64) -> String {
    let uptime_hours = uptime_seconds as f64 / SECONDS_PER_HOUR;
    if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    }
}

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let stats = state.service.stats();
    let uptime_str = format_uptime(stats.get_uptime_seconds());
    let table = stats.render_table();
    let selected = state.service.session().current_selection();
    let selection = if state.service.session().is_selected() {
        selected.to_string()
    } else {
        "none".to_string()
    };

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "OK\n\nUptime: {uptime_str}\nSelected PID: {selection}\nCommand line mode: {}\n\n{table}\n{FOOTER_TEXT}",
            state.service.options().command_line_mode
        ),
    )
}
