//! Query command implementation.
//!
//! Runs a single write-then-read cycle against the configured proc root
//! and prints the report.

use anyhow::{Context, Result};
use herakles_process_info::{
    ExtractOptions, ProcessInfoService, ProcfsTable, QuerySession,
};
use std::io::{self, Write};
use std::sync::Arc;

use crate::config::Config;

/// Builds the report for `pid` the same way the HTTP endpoint does.
pub fn query_report(pid: &str, config: &Config) -> Result<String> {
    let service = ProcessInfoService::new(
        Arc::new(ProcfsTable::new(config.proc_root())),
        Arc::new(QuerySession::new()),
        ExtractOptions::with_mode(config.command_line_mode()),
    );

    service
        .write(pid.as_bytes())
        .with_context(|| format!("invalid PID '{}'", pid))?;
    Ok(service.read())
}

/// Selects `pid`, reads the report once and writes it to stdout.
pub fn command_query(pid: &str, config: &Config) -> Result<()> {
    let report = query_report(pid, config)?;
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(report.as_bytes())
        .context("failed to write report")?;
    Ok(())
}
