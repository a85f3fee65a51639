//! Process table abstraction.
//!
//! This module defines the seams between the query core and whatever owns the
//! process table:
//! - `ProcessTable`: hands out a lookup-scoped `TableGuard`
//! - `ProcessRecord`: a borrowed view of one live process, valid while the guard is held
//! - `MmRef`: a counted reference to a process's `MemoryMap`, released on drop
//!
//! Lock order is always table guard -> memory-map handle -> memory-map lock,
//! and every level is released by `Drop` in reverse order.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

/// Process identifier as supplied by callers (`pid_t`).
pub type Pid = i32;

/// Source of live process records.
pub trait ProcessTable: Send + Sync {
    /// Acquires the read-side lookup guard over the table.
    fn read(&self) -> TableGuard<'_>;
}

/// Read-side view over a process table, alive for as long as its guard.
pub trait TableView {
    fn find(&self, pid: Pid) -> Option<Cow<'_, ProcessRecord>>;
}

/// Lookup-scoped guard. Records returned by `find` borrow from the guard
/// and cannot outlive it.
pub struct TableGuard<'a> {
    view: Box<dyn TableView + 'a>,
}

impl<'a> TableGuard<'a> {
    pub fn new(view: impl TableView + 'a) -> Self {
        trace!("process table guard acquired");
        Self {
            view: Box::new(view),
        }
    }

    pub fn find(&self, pid: Pid) -> Option<Cow<'_, ProcessRecord>> {
        self.view.find(pid)
    }
}

impl Drop for TableGuard<'_> {
    fn drop(&mut self) {
        trace!("process table guard released");
    }
}

/// Descriptor of a live process as seen through a table guard.
#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pid: Pid,
    uid: u32,
    mm: Option<Arc<MemoryMap>>,
}

impl ProcessRecord {
    /// `uid` must already be mapped into the reader's user namespace.
    pub fn new(pid: Pid, uid: u32, mm: Option<Arc<MemoryMap>>) -> Self {
        Self { pid, uid, mm }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Real uid of the process owner.
    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Takes a reference on the process's address space, if it has one.
    ///
    /// Kernel threads and exited-but-unreaped processes have no address
    /// space; that is a normal state, not an error.
    pub fn get_mm(&self) -> Option<MmRef> {
        self.mm.as_ref().map(MmRef::acquire)
    }
}

/// Layout fields of an address space that the extractor reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapLayout {
    pub exe_file: Option<PathBuf>,
    /// Byte length of the argument block; `None` when it could not be determined.
    pub arg_len: Option<u64>,
}

impl MapLayout {
    /// Builds a layout from the argument block bounds. Empty or inverted
    /// bounds give a known-empty block.
    pub fn from_bounds(exe_file: Option<PathBuf>, arg_start: u64, arg_end: u64) -> Self {
        Self {
            exe_file,
            arg_len: Some(arg_end.saturating_sub(arg_start)),
        }
    }
}

/// Where the raw bytes of the argument block can be read from.
#[derive(Debug, Clone, Default)]
pub enum ArgSource {
    #[default]
    Unavailable,
    Inline(Vec<u8>),
    /// A procfs `cmdline` file; the kernel applies its own permission checks.
    Procfs(PathBuf),
}

/// Per-process address-space descriptor.
#[derive(Debug)]
pub struct MemoryMap {
    layout: RwLock<MapLayout>,
    args: ArgSource,
}

impl MemoryMap {
    pub fn new(layout: MapLayout, args: ArgSource) -> Self {
        Self {
            layout: RwLock::new(layout),
            args,
        }
    }

    /// Exclusive access for the owner of the table (exec, argument rewrite).
    pub fn write(&self) -> RwLockWriteGuard<'_, MapLayout> {
        self.layout.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counted reference to a `MemoryMap`. Not `Clone`: each acquisition is
/// released exactly once, when the value is dropped.
#[derive(Debug)]
pub struct MmRef {
    inner: Arc<MemoryMap>,
}

impl MmRef {
    fn acquire(mm: &Arc<MemoryMap>) -> Self {
        trace!("memory map reference acquired");
        Self {
            inner: Arc::clone(mm),
        }
    }

    /// Scoped read-only lock on the layout.
    pub fn read(&self) -> RwLockReadGuard<'_, MapLayout> {
        self.inner.layout.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads at most `limit` bytes of the argument block.
    pub fn read_args(&self, limit: usize) -> io::Result<Vec<u8>> {
        match &self.inner.args {
            ArgSource::Unavailable => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "argument bytes are not readable for this process",
            )),
            ArgSource::Inline(bytes) => {
                let len = bytes.len().min(limit);
                let mut out = Vec::new();
                out.try_reserve_exact(len)
                    .map_err(|_| io::Error::from(io::ErrorKind::OutOfMemory))?;
                out.extend_from_slice(&bytes[..len]);
                Ok(out)
            }
            ArgSource::Procfs(path) => {
                let mut out = Vec::new();
                out.try_reserve_exact(limit)
                    .map_err(|_| io::Error::from(io::ErrorKind::OutOfMemory))?;
                File::open(path)?
                    .take(limit as u64)
                    .read_to_end(&mut out)?;
                Ok(out)
            }
        }
    }
}

impl Drop for MmRef {
    fn drop(&mut self) {
        trace!("memory map reference released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mm() -> Arc<MemoryMap> {
        Arc::new(MemoryMap::new(
            MapLayout::from_bounds(Some(PathBuf::from("/usr/bin/sleep")), 0x1000, 0x1010),
            ArgSource::Inline(b"sleep\x00100\x00".to_vec()),
        ))
    }

    #[test]
    fn test_arg_len_handles_inverted_bounds() {
        let layout = MapLayout::from_bounds(None, 200, 100);
        assert_eq!(layout.arg_len, Some(0));
        assert_eq!(MapLayout::from_bounds(None, 100, 142).arg_len, Some(42));
        assert_eq!(MapLayout::default().arg_len, None);
    }

    #[test]
    fn test_mm_ref_released_exactly_once() {
        let mm = sample_mm();
        let record = ProcessRecord::new(42, 1000, Some(Arc::clone(&mm)));
        assert_eq!(Arc::strong_count(&mm), 2);

        let first = record.get_mm().expect("record has an address space");
        let second = record.get_mm().expect("record has an address space");
        assert_eq!(Arc::strong_count(&mm), 4);

        drop(first);
        assert_eq!(Arc::strong_count(&mm), 3);
        drop(second);
        assert_eq!(Arc::strong_count(&mm), 2);
    }

    #[test]
    fn test_record_without_mm() {
        let record = ProcessRecord::new(2, 0, None);
        assert!(record.get_mm().is_none());
        assert_eq!(record.uid(), 0);
    }

    #[test]
    fn test_read_args_respects_limit() {
        let mm = sample_mm();
        let record = ProcessRecord::new(42, 1000, Some(mm));
        let handle = record.get_mm().unwrap();
        assert_eq!(handle.read_args(5).unwrap(), b"sleep");
        assert_eq!(handle.read_args(1024).unwrap(), b"sleep\x00100\x00");
    }

    #[test]
    fn test_read_args_unavailable() {
        let mm = Arc::new(MemoryMap::new(MapLayout::default(), ArgSource::Unavailable));
        let record = ProcessRecord::new(7, 0, Some(mm));
        let handle = record.get_mm().unwrap();
        let err = handle.read_args(16).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn test_write_lock_blocks_until_reader_releases() {
        let mm = sample_mm();
        let record = ProcessRecord::new(42, 1000, Some(Arc::clone(&mm)));
        let handle = record.get_mm().unwrap();

        let reader = handle.read();
        assert!(mm.layout.try_write().is_err());
        drop(reader);

        mm.write().arg_len = Some(0);
        assert_eq!(handle.read().arg_len, Some(0));
    }
}
