//! Process lookup and attribute extraction.
//!
//! This module provides:
//! - `table`: the process table seam, lookup guards and memory-map handles
//! - `locator`: resolving a selected PID under a guard
//! - `extractor`: owner, executable path and command-line extraction
//! - `procfs`: the live table read from /proc
//! - `memory_table`: an in-memory table for tests and demos

pub mod extractor;
pub mod locator;
pub mod memory_table;
pub mod procfs;
pub mod table;

// Re-export commonly used types
pub use extractor::{extract, CommandLineMode, ExtractOptions, ParseModeError, PAGE_SIZE, PATH_MAX};
pub use locator::{find, Lookup};
pub use memory_table::InMemoryTable;
pub use procfs::{parse_real_uid, parse_stat, ProcfsError, ProcfsTable, StatFields, DEFAULT_PROC_ROOT};
pub use table::{
    ArgSource, MapLayout, MemoryMap, MmRef, Pid, ProcessRecord, ProcessTable, TableGuard,
    TableView,
};
