//! Live process table backed by the procfs filesystem.
//!
//! A record is assembled from `/proc/<pid>/stat`, `/proc/<pid>/status` and the
//! `/proc/<pid>/exe` link each time it is looked up. The kernel already maps
//! the uid in `status` into the reader's user namespace and zeroes the
//! argument bounds in `stat` when the reader may not inspect the target.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::table::{
    ArgSource, MapLayout, MemoryMap, Pid, ProcessRecord, ProcessTable, TableGuard, TableView,
};

/// Default procfs mount point.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Fields of `/proc/<pid>/stat` the table needs, by field number (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFields {
    /// (3) Process state character.
    pub state: char,
    /// (9) Kernel flags word (`PF_*`).
    pub flags: u64,
    /// (23) Virtual memory size in bytes; zero when there is no address space.
    pub vsize: u64,
    /// (48) Start of the argument block. Zero when hidden or on old kernels.
    pub arg_start: u64,
    /// (49) End of the argument block.
    pub arg_end: u64,
}

/// `PF_KTHREAD` from `include/linux/sched.h`.
const PF_KTHREAD: u64 = 0x0020_0000;

impl StatFields {
    /// True if the process currently owns an address space.
    pub fn has_address_space(&self) -> bool {
        self.vsize > 0 && self.flags & PF_KTHREAD == 0 && !matches!(self.state, 'Z' | 'X')
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcfsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed {file}: {reason}")]
    Malformed { file: &'static str, reason: String },
}

impl ProcfsError {
    fn io(path: PathBuf, source: io::Error) -> Self {
        ProcfsError::Io { path, source }
    }

    fn malformed(file: &'static str, reason: &str) -> Self {
        ProcfsError::Malformed {
            file,
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProcfsError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Parses the fields after the `comm` field of `/proc/<pid>/stat`.
///
/// `comm` may itself contain spaces and parentheses, so parsing starts after
/// the last `)`.
pub fn parse_stat(content: &str) -> Result<StatFields, ProcfsError> {
    let close = content
        .rfind(')')
        .ok_or_else(|| ProcfsError::malformed("stat", "missing comm terminator"))?;
    // Index 0 is field 3 (state).
    let fields: Vec<&str> = content[close + 1..].split_whitespace().collect();
    if fields.len() <= 20 {
        return Err(ProcfsError::malformed("stat", "too few fields"));
    }

    let state = fields[0]
        .chars()
        .next()
        .ok_or_else(|| ProcfsError::malformed("stat", "empty state field"))?;
    let number = |idx: usize, name: &str| -> Result<u64, ProcfsError> {
        fields[idx]
            .parse()
            .map_err(|_| ProcfsError::malformed("stat", &format!("invalid {name} field")))
    };
    let flags = number(6, "flags")?;
    let vsize = number(20, "vsize")?;

    // The argument bounds only exist on Linux >= 3.5.
    let (arg_start, arg_end) = if fields.len() > 46 {
        (number(45, "arg_start")?, number(46, "arg_end")?)
    } else {
        (0, 0)
    };

    Ok(StatFields {
        state,
        flags,
        vsize,
        arg_start,
        arg_end,
    })
}

/// Extracts the real uid from the `Uid:` line of `/proc/<pid>/status`.
pub fn parse_real_uid(status: &str) -> Result<u32, ProcfsError> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Uid:"))
        .and_then(|rest| rest.split_whitespace().next())
        .ok_or_else(|| ProcfsError::malformed("status", "missing Uid"))?
        .parse()
        .map_err(|_| ProcfsError::malformed("status", "invalid Uid"))
}

/// Process table reading from a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcfsTable {
    root: PathBuf,
}

impl Default for ProcfsTable {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcfsTable {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Builds a record for `pid`, or fails if the process does not exist.
    pub fn load(&self, pid: Pid) -> Result<ProcessRecord, ProcfsError> {
        let dir = self.root.join(pid.to_string());

        let stat_path = dir.join("stat");
        let stat = fs::read_to_string(&stat_path).map_err(|e| ProcfsError::io(stat_path, e))?;
        let stat = parse_stat(&stat)?;

        let status_path = dir.join("status");
        let status =
            fs::read_to_string(&status_path).map_err(|e| ProcfsError::io(status_path, e))?;
        let uid = parse_real_uid(&status)?;

        if !stat.has_address_space() {
            debug!(pid, state = %stat.state, "process has no address space");
            return Ok(ProcessRecord::new(pid, uid, None));
        }

        // A failing readlink (permission, exited, anonymous exe) leaves the
        // executable unknown; it does not hide the process.
        let exe_file = match fs::read_link(dir.join("exe")) {
            Ok(path) => Some(path),
            Err(e) => {
                debug!(pid, "exe link unreadable: {}", e);
                None
            }
        };

        let cmdline_path = dir.join("cmdline");
        let layout = if stat.arg_start == 0 && stat.arg_end == 0 {
            // Bounds are zeroed for readers that fail the ptrace check; the
            // cmdline file still carries the block itself.
            MapLayout {
                exe_file,
                arg_len: cmdline_len(&cmdline_path),
            }
        } else {
            MapLayout::from_bounds(exe_file, stat.arg_start, stat.arg_end)
        };
        let mm = MemoryMap::new(layout, ArgSource::Procfs(cmdline_path));
        Ok(ProcessRecord::new(pid, uid, Some(Arc::new(mm))))
    }
}

/// Length of a procfs `cmdline` file. procfs reports size zero in metadata,
/// so the bytes are counted by reading.
fn cmdline_len(path: &Path) -> Option<u64> {
    let counted = fs::File::open(path).and_then(|mut file| io::copy(&mut file, &mut io::sink()));
    match counted {
        Ok(len) => Some(len),
        Err(e) => {
            debug!("argument block length unknown, {} unreadable: {}", path.display(), e);
            None
        }
    }
}

struct ProcfsView<'a> {
    table: &'a ProcfsTable,
}

impl TableView for ProcfsView<'_> {
    fn find(&self, pid: Pid) -> Option<Cow<'_, ProcessRecord>> {
        match self.table.load(pid) {
            Ok(record) => Some(Cow::Owned(record)),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                debug!(pid, "treating process as absent: {}", e);
                None
            }
        }
    }
}

impl ProcessTable for ProcfsTable {
    fn read(&self) -> TableGuard<'_> {
        TableGuard::new(ProcfsView { table: self })
    }
}
