//! Query statistics for the process info service.
//!
//! Counters are observational only; nothing in the query path reads them.

use serde::Serialize;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns (last, avg, max, min, count).
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub writes_accepted: u64,
    pub writes_rejected: u64,
    pub access_faults: u64,
    pub reads_found: u64,
    pub reads_not_found: u64,
    pub reads_no_selection: u64,
    pub degraded_fields: u64,
}

impl StatsSnapshot {
    pub fn reads_total(&self) -> u64 {
        self.reads_found + self.reads_not_found + self.reads_no_selection
    }
}

pub struct QueryStats {
    writes_accepted: AtomicU64,
    writes_rejected: AtomicU64,
    access_faults: AtomicU64,
    reads_found: AtomicU64,
    reads_not_found: AtomicU64,
    reads_no_selection: AtomicU64,
    degraded_fields: AtomicU64,
    pub read_duration_ms: Stat,
    pub start_time: Instant,
}

impl Default for QueryStats {
    fn default() -> Self {
        Self {
            writes_accepted: AtomicU64::new(0),
            writes_rejected: AtomicU64::new(0),
            access_faults: AtomicU64::new(0),
            reads_found: AtomicU64::new(0),
            reads_not_found: AtomicU64::new(0),
            reads_no_selection: AtomicU64::new(0),
            degraded_fields: AtomicU64::new(0),
            read_duration_ms: Stat::default(),
            start_time: Instant::now(),
        }
    }
}

impl QueryStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_write_accepted(&self) {
        self.writes_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_rejected(&self) {
        self.writes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_access_fault(&self) {
        self.access_faults.fetch_add(1, Ordering::Relaxed);
        self.writes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_found(&self, unknown_fields: usize) {
        self.reads_found.fetch_add(1, Ordering::Relaxed);
        self.degraded_fields
            .fetch_add(unknown_fields as u64, Ordering::Relaxed);
    }

    pub fn record_read_not_found(&self) {
        self.reads_not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_no_selection(&self) {
        self.reads_no_selection.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_duration_ms(&self, duration_ms: f64) {
        self.read_duration_ms.add_sample(duration_ms);
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            writes_accepted: self.writes_accepted.load(Ordering::Relaxed),
            writes_rejected: self.writes_rejected.load(Ordering::Relaxed),
            access_faults: self.access_faults.load(Ordering::Relaxed),
            reads_found: self.reads_found.load(Ordering::Relaxed),
            reads_not_found: self.reads_not_found.load(Ordering::Relaxed),
            reads_no_selection: self.reads_no_selection.load(Ordering::Relaxed),
            degraded_fields: self.degraded_fields.load(Ordering::Relaxed),
        }
    }

    pub fn render_table(&self) -> String {
        let s = self.snapshot();
        let (rd_cur, rd_avg, rd_max, rd_min, _) = self.read_duration_ms.snapshot();

        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();
        writeln!(out, "QUERY STATISTICS").ok();
        writeln!(out, "================").ok();
        writeln!(out).ok();

        let counters = [
            ("writes_accepted", s.writes_accepted),
            ("writes_rejected", s.writes_rejected),
            ("access_faults", s.access_faults),
            ("reads_found", s.reads_found),
            ("reads_not_found", s.reads_not_found),
            ("reads_no_selection", s.reads_no_selection),
            ("degraded_fields", s.degraded_fields),
        ];
        for (name, value) in counters {
            writeln!(out, "{:left$} | {:>col$}", name, value, left = left_col, col = col_w).ok();
        }

        writeln!(out).ok();
        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();
        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "read_duration (ms)",
            format!("{:.3}", rd_cur),
            format!("{:.3}", rd_avg),
            format!("{:.3}", rd_max),
            format!("{:.3}", rd_min),
            left = left_col,
            col = col_w
        )
        .ok();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stat() {
        let mut stat = RunningStat::default();
        assert_eq!(stat.avg(), 0.0);
        stat.add(2.0);
        stat.add(4.0);
        stat.add(0.0);
        assert_eq!(stat.count, 3);
        assert_eq!(stat.avg(), 2.0);
        assert_eq!(stat.min, 0.0);
        assert_eq!(stat.max, 4.0);
        assert_eq!(stat.last, 0.0);
    }

    #[test]
    fn test_counters() {
        let stats = QueryStats::new();
        stats.record_write_accepted();
        stats.record_write_rejected();
        stats.record_access_fault();
        stats.record_read_found(2);
        stats.record_read_not_found();
        stats.record_read_no_selection();

        let s = stats.snapshot();
        assert_eq!(s.writes_accepted, 1);
        assert_eq!(s.writes_rejected, 2);
        assert_eq!(s.access_faults, 1);
        assert_eq!(s.degraded_fields, 2);
        assert_eq!(s.reads_total(), 3);
    }

    #[test]
    fn test_render_table_lists_counters() {
        let stats = QueryStats::new();
        stats.record_read_not_found();
        let table = stats.render_table();
        assert!(table.starts_with("QUERY STATISTICS"));
        assert!(table.contains("reads_not_found"));
        assert!(table.contains("read_duration (ms)"));
    }
}
