//! Attribute snapshots and their textual rendering.
//!
//! `render` is the only place where an absent attribute becomes `Unknown` or
//! where a missing argument block becomes the no-data marker.

use std::fmt::Write as FmtWrite;

use crate::process::Pid;

/// Rendered for any attribute that could not be obtained.
pub const UNKNOWN: &str = "Unknown";

/// Rendered when a process has no argument block to describe.
pub const NO_COMMAND_LINE_DATA: &str = "[no command line data]";

/// Command-line attribute of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Bounded, human-readable summary of the argument block.
    Summary(String),
    /// The process has no argument block (or no address space at all).
    NoData,
}

/// Result of one query. Every field starts out absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSnapshot {
    pub owner_id: Option<u32>,
    pub executable_path: Option<String>,
    pub command_line: Option<CommandLine>,
}

impl AttributeSnapshot {
    /// Number of fields that will render as `Unknown`.
    pub fn unknown_fields(&self) -> usize {
        [
            self.owner_id.is_none(),
            self.executable_path.is_none(),
            self.command_line.is_none(),
        ]
        .into_iter()
        .filter(|&absent| absent)
        .count()
    }
}

/// Renders the report for `pid`.
///
/// Non-positive identifiers mean nothing is selected; `None` means the
/// process was not found. Both produce a single line.
pub fn render(pid: Pid, snapshot: Option<&AttributeSnapshot>) -> String {
    if pid <= 0 {
        return "No valid PID provided\n".to_string();
    }
    let Some(snapshot) = snapshot else {
        return format!("Process with PID {pid} not found\n");
    };

    let uid = snapshot
        .owner_id
        .map(|uid| uid.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let executable = snapshot.executable_path.as_deref().unwrap_or(UNKNOWN);
    let command_line = match &snapshot.command_line {
        Some(CommandLine::Summary(summary)) => summary.as_str(),
        Some(CommandLine::NoData) => NO_COMMAND_LINE_DATA,
        None => UNKNOWN,
    };

    let mut out = String::new();
    writeln!(out, "PID: {pid}").ok();
    writeln!(out, "UID: {uid}").ok();
    writeln!(out, "Executable: {executable}").ok();
    writeln!(out, "Command line: {command_line}").ok();
    out
}
