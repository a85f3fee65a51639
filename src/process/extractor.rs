//! Attribute extraction from a located process record.
//!
//! Each attribute is obtained independently. A failure in one degrades only
//! that field of the snapshot; `extract` itself cannot fail.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as FmtWrite;
use std::os::unix::ffi::OsStrExt;
use std::str::FromStr;
use tracing::debug;

use super::table::{MmRef, ProcessRecord};
use crate::snapshot::{AttributeSnapshot, CommandLine};

/// Maximum length of a resolved executable path, terminator included.
pub const PATH_MAX: usize = libc::PATH_MAX as usize;

/// Get the system page size (usually 4096).
fn get_page_size() -> usize {
    // SAFETY: sysconf is safe to call with _SC_PAGESIZE
    // Returns -1 on error - handled by the > 0 check
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}

/// System page size, the capacity of the command-line working buffer.
pub static PAGE_SIZE: Lazy<usize> = Lazy::new(get_page_size);

/// How the command-line attribute is produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandLineMode {
    /// Report only the size of the argument block.
    #[default]
    Placeholder,
    /// Copy the argument bytes out of the target, bounded to the buffer.
    Argv,
}

impl fmt::Display for CommandLineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLineMode::Placeholder => f.write_str("placeholder"),
            CommandLineMode::Argv => f.write_str("argv"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid command line mode '{0}', expected 'placeholder' or 'argv'")]
pub struct ParseModeError(String);

impl FromStr for CommandLineMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placeholder" => Ok(CommandLineMode::Placeholder),
            "argv" => Ok(CommandLineMode::Argv),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Limits and mode for one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub command_line_mode: CommandLineMode,
    /// Paths of this many bytes or more are reported as unknown.
    pub max_path_len: usize,
    /// Command-line working buffer; the last byte is reserved.
    pub buffer_capacity: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            command_line_mode: CommandLineMode::default(),
            max_path_len: PATH_MAX,
            buffer_capacity: *PAGE_SIZE,
        }
    }
}

impl ExtractOptions {
    pub fn with_mode(mode: CommandLineMode) -> Self {
        Self {
            command_line_mode: mode,
            ..Self::default()
        }
    }
}

/// Collects owner, executable path and command line for `record`.
///
/// Must be called while the table guard that produced `record` is held.
pub fn extract(record: &ProcessRecord, opts: &ExtractOptions) -> AttributeSnapshot {
    let mut snapshot = AttributeSnapshot {
        owner_id: Some(record.uid()),
        ..AttributeSnapshot::default()
    };

    let Some(mm) = record.get_mm() else {
        debug!(pid = record.pid(), "no address space, skipping exe and cmdline");
        snapshot.command_line = Some(CommandLine::NoData);
        return snapshot;
    };

    snapshot.executable_path = executable_path(&mm, opts.max_path_len);
    snapshot.command_line = command_line(&mm, opts);
    if snapshot.unknown_fields() > 0 {
        debug!(pid = record.pid(), "snapshot degraded: {:?}", snapshot);
    }

    drop(mm);
    snapshot
}

fn executable_path(mm: &MmRef, max_len: usize) -> Option<String> {
    let layout = mm.read();
    let exe = layout.exe_file.as_ref()?;
    let bytes = exe.as_os_str().as_bytes();
    if !exe.is_absolute() || bytes.len() >= max_len {
        debug!("unresolvable executable path ({} bytes)", bytes.len());
        return None;
    }

    let mut path = String::new();
    path.try_reserve_exact(bytes.len()).ok()?;
    path.push_str(&String::from_utf8_lossy(bytes));
    Some(path)
}

fn command_line(mm: &MmRef, opts: &ExtractOptions) -> Option<CommandLine> {
    let arg_len = match mm.read().arg_len {
        Some(0) => return Some(CommandLine::NoData),
        Some(len) => len,
        None => {
            debug!("argument block length unknown");
            return None;
        }
    };

    let limit = opts.buffer_capacity.saturating_sub(1);
    let mut buffer = String::new();
    if buffer.try_reserve_exact(opts.buffer_capacity).is_err() {
        debug!("command line buffer allocation failed");
        return None;
    }

    if opts.command_line_mode == CommandLineMode::Argv {
        match mm.read_args(limit) {
            Ok(bytes) => {
                append_arguments(&mut buffer, &bytes);
                if !buffer.is_empty() {
                    truncate_at_char_boundary(&mut buffer, limit);
                    return Some(CommandLine::Summary(buffer));
                }
            }
            Err(e) => debug!("argument bytes unreadable, using placeholder: {}", e),
        }
    }

    let shown = arg_len.min(limit as u64);
    write!(buffer, "[command line of {shown} bytes]").ok();
    truncate_at_char_boundary(&mut buffer, limit);
    Some(CommandLine::Summary(buffer))
}

/// Joins NUL-separated arguments with spaces.
fn append_arguments(out: &mut String, raw: &[u8]) {
    let args = raw
        .split(|&b| b == 0)
        .filter(|arg| !arg.is_empty())
        .map(String::from_utf8_lossy);
    for (i, arg) in args.enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&arg);
    }
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}
