//! Herakles Process Info Library
//!
//! A single-slot query service that resolves a PID to three facts about the
//! running process: the owning uid, the executable path and a summary of its
//! command line. Writing a PID selects the process; reading renders a
//! snapshot of it at the time of the read.
//!
//! # Features
//!
//! - **Scoped Locking**: Lookups run under a table guard, memory-map handles
//!   and locks are released by `Drop` on every path
//! - **Graceful Degradation**: Exited processes, kernel threads and unreadable
//!   attributes produce marker text instead of errors
//! - **Pluggable Tables**: The live `/proc` table or an in-memory table
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use herakles_process_info::{
//!     ExtractOptions, InMemoryTable, ProcessInfoService, ProcessRecord, QuerySession,
//! };
//!
//! let table: InMemoryTable = [ProcessRecord::new(1, 0, None)].into_iter().collect();
//! let service = ProcessInfoService::new(
//!     Arc::new(table),
//!     Arc::new(QuerySession::new()),
//!     ExtractOptions::default(),
//! );
//!
//! service.write(b"1").unwrap();
//! let report = service.read();
//! assert!(report.starts_with("PID: 1\nUID: 0\n"));
//!
//! service.write(b"999999999").unwrap();
//! assert_eq!(service.read(), "Process with PID 999999999 not found\n");
//! ```

pub mod error;
pub mod process;
pub mod service;
pub mod session;
pub mod snapshot;
pub mod stats;

// Re-export main types for convenience
pub use error::{WriteError, WriteErrorKind};
pub use process::{
    CommandLineMode, ExtractOptions, InMemoryTable, Pid, ProcessRecord, ProcessTable, ProcfsTable,
};
pub use service::{parse_pid, ProcessInfoFile, ProcessInfoService, MAX_PID_INPUT_LEN};
pub use session::{QuerySession, UNSELECTED};
pub use snapshot::{render, AttributeSnapshot, CommandLine};
pub use stats::{QueryStats, StatsSnapshot};
