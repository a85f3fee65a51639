//! Prometheus metrics definitions for herakles-process-info.
//!
//! The gauges mirror the service's query counters and are refreshed from a
//! counter snapshot on every scrape.

use herakles_process_info::{StatsSnapshot, UNSELECTED};
use prometheus::{Gauge, GaugeVec, Opts, Registry};

/// Collection of Prometheus metrics for the query service.
#[derive(Clone)]
pub struct QueryMetrics {
    pub writes: GaugeVec, // labels: result
    pub reads: GaugeVec,  // labels: outcome
    pub degraded_fields: Gauge,
    pub read_duration_seconds: Gauge,
    pub selected_pid: Gauge,
    pub uptime_seconds: Gauge,
    pub scrape_duration: Gauge,
}

impl QueryMetrics {
    /// Creates and registers all Prometheus metrics with the registry.
    pub fn new(registry: &Registry) -> Result<Self, Box<dyn std::error::Error>> {
        let writes = GaugeVec::new(
            Opts::new(
                "herakles_process_info_writes",
                "PID writes by result (accepted, invalid, fault)",
            ),
            &["result"],
        )?;
        let reads = GaugeVec::new(
            Opts::new(
                "herakles_process_info_reads",
                "Reads by outcome (found, not_found, no_selection)",
            ),
            &["outcome"],
        )?;
        let degraded_fields = Gauge::new(
            "herakles_process_info_unknown_fields",
            "Attributes reported as Unknown across all reads",
        )?;
        let read_duration_seconds = Gauge::new(
            "herakles_process_info_read_duration_seconds",
            "Duration of the most recent read",
        )?;
        let selected_pid = Gauge::new(
            "herakles_process_info_selected_pid",
            "Currently selected PID (-1 when nothing is selected)",
        )?;
        let uptime_seconds = Gauge::new(
            "herakles_process_info_uptime_seconds",
            "Seconds since the service started",
        )?;
        let scrape_duration = Gauge::new(
            "herakles_process_info_scrape_duration_seconds",
            "Time spent serving /metrics request",
        )?;

        registry.register(Box::new(writes.clone()))?;
        registry.register(Box::new(reads.clone()))?;
        registry.register(Box::new(degraded_fields.clone()))?;
        registry.register(Box::new(read_duration_seconds.clone()))?;
        registry.register(Box::new(selected_pid.clone()))?;
        registry.register(Box::new(uptime_seconds.clone()))?;
        registry.register(Box::new(scrape_duration.clone()))?;

        Ok(Self {
            writes,
            reads,
            degraded_fields,
            read_duration_seconds,
            selected_pid,
            uptime_seconds,
            scrape_duration,
        })
    }

    /// Copies a counter snapshot into the gauges.
    pub fn update(
        &self,
        stats: &StatsSnapshot,
        selected: i32,
        last_read_ms: f64,
        uptime_secs: u64,
    ) {
        let invalid = stats.writes_rejected.saturating_sub(stats.access_faults);
        self.writes
            .with_label_values(&["accepted"])
            .set(stats.writes_accepted as f64);
        self.writes.with_label_values(&["invalid"]).set(invalid as f64);
        self.writes
            .with_label_values(&["fault"])
            .set(stats.access_faults as f64);

        self.reads
            .with_label_values(&["found"])
            .set(stats.reads_found as f64);
        self.reads
            .with_label_values(&["not_found"])
            .set(stats.reads_not_found as f64);
        self.reads
            .with_label_values(&["no_selection"])
            .set(stats.reads_no_selection as f64);

        self.degraded_fields.set(stats.degraded_fields as f64);
        self.read_duration_seconds.set(last_read_ms / 1000.0);
        self.selected_pid.set(if selected > 0 {
            selected as f64
        } else {
            UNSELECTED as f64
        });
        self.uptime_seconds.set(uptime_secs as f64);
    }
}
