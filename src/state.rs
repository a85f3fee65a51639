//! Application state management for the query service.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers.

use herakles_process_info::ProcessInfoService;
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::metrics::QueryMetrics;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    pub service: Arc<ProcessInfoService>,
    pub registry: Registry,
    pub metrics: QueryMetrics,
    pub config: Arc<Config>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}
