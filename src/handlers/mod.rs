//! HTTP endpoint handlers for the query service.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/process_info`: The query file (GET reads, PUT/POST selects a PID)
//! - `/metrics`: Prometheus metrics endpoint
//! - `/health`: Health check endpoint
//! - `/`: Landing page

pub mod health;
pub mod metrics;
pub mod process_info;
pub mod root;

// Re-export handlers
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use process_info::{read_handler, write_handler};
pub use root::root_handler;

#[cfg(test)]
pub(crate) fn test_state(
    records: Vec<herakles_process_info::ProcessRecord>,
) -> crate::state::SharedState {
    use herakles_process_info::{
        ExtractOptions, InMemoryTable, ProcessInfoService, QuerySession,
    };
    use std::sync::Arc;

    let table: InMemoryTable = records.into_iter().collect();
    let service = ProcessInfoService::new(
        Arc::new(table),
        Arc::new(QuerySession::new()),
        ExtractOptions::default(),
    );
    let registry = prometheus::Registry::new();
    let metrics = crate::metrics::QueryMetrics::new(&registry).expect("metrics registration");

    Arc::new(crate::state::AppState {
        service: Arc::new(service),
        registry,
        metrics,
        config: Arc::new(crate::config::Config::default()),
        start_time: std::time::Instant::now(),
    })
}
