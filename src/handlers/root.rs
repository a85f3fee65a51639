//! Root endpoint handler for the landing page.
//!
//! This module provides the `/` endpoint handler that displays
//! a landing page with the available endpoints and the current selection.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tracing::{debug, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");
    let build = option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown");

    // Calculate actual uptime from service start time
    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;
    let uptime_str = format!("{}h {}m {}s", hours, minutes, seconds);

    let session = state.service.session();
    let selected = if session.is_selected() {
        session.current_selection().to_string()
    } else {
        "none".to_string()
    };

    let mut endpoints = String::from(
        r#"        <li>
            <a href="/process_info">/process_info</a>
            <div class="endpoint-desc">GET reads the report for the selected PID; PUT or POST a PID to select it</div>
        </li>
"#,
    );
    if state.config.enable_metrics.unwrap_or(true) {
        endpoints.push_str(
            r#"        <li>
            <a href="/metrics">/metrics</a>
            <div class="endpoint-desc">Prometheus-compatible query counters</div>
        </li>
"#,
        );
    }
    if state.config.enable_health.unwrap_or(true) {
        endpoints.push_str(
            r#"        <li>
            <a href="/health">/health</a>
            <div class="endpoint-desc">Service uptime and query statistics (text)</div>
        </li>
"#,
        );
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Herakles Process Info</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 0;
            padding: 20px;
            background: #f5f5f5;
            line-height: 1.6;
        }}
        .container {{
            max-width: 900px;
            margin: 0 auto;
            background: white;
            padding: 40px;
            border-radius: 8px;
            box-shadow: 0 2px 8px rgba(0,0,0,0.1);
        }}
        h1 {{ color: #333; border-bottom: 3px solid #007bff; padding-bottom: 15px; }}
        .info {{ background: #e9ecef; padding: 15px; border-radius: 4px; display: flex; justify-content: space-around; flex-wrap: wrap; }}
        .info-label {{ font-weight: 600; color: #555; display: block; font-size: 0.9em; }}
        .info-value {{ font-size: 1.2em; color: #007bff; }}
        .endpoint-list {{ list-style: none; padding: 0; }}
        .endpoint-list li {{ margin: 20px 0; padding: 15px; background: #f8f9fa; border-left: 4px solid #007bff; border-radius: 4px; }}
        .endpoint-list a {{ color: #007bff; text-decoration: none; font-weight: 600; }}
        .endpoint-desc {{ color: #666; margin-top: 5px; }}
        .footer {{ margin-top: 40px; padding-top: 20px; border-top: 1px solid #ddd; color: #666; font-size: 0.9em; text-align: center; }}
        code {{ background: #e9ecef; padding: 2px 6px; border-radius: 3px; font-family: 'Courier New', monospace; }}
    </style>
</head>
<body>
<div class="container">
    <h1>Herakles Process Info</h1>
    <p>Select a process with <code>curl -X PUT --data 1 /process_info</code>, then read it back.</p>

    <div class="info">
        <div><span class="info-label">Version</span><span class="info-value">{version}</span></div>
        <div><span class="info-label">Built</span><span class="info-value">{build}</span></div>
        <div><span class="info-label">Uptime</span><span class="info-value">{uptime}</span></div>
        <div><span class="info-label">Selected PID</span><span class="info-value">{selected}</span></div>
    </div>

    <h2>Available Endpoints</h2>
    <ul class="endpoint-list">
{endpoints}    </ul>

    <div class="footer">
        <p>{footer}</p>
    </div>
</div>
</body>
</html>"#,
        version = version,
        build = build,
        uptime = uptime_str,
        selected = selected,
        endpoints = endpoints,
        footer = FOOTER_TEXT
    );

    Html(html)
}
