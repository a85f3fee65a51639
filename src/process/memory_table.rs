//! In-memory process table.
//!
//! Holds records behind a reader/writer lock so that the lookup guard is a
//! real read lock: table mutators block while a query holds it.

use ahash::AHashMap as HashMap;
use std::borrow::Cow;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use super::table::{Pid, ProcessRecord, ProcessTable, TableGuard, TableView};

#[derive(Default)]
pub struct InMemoryTable {
    processes: RwLock<HashMap<Pid, ProcessRecord>>,
}

impl InMemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record for `record.pid()`.
    pub fn insert(&self, record: ProcessRecord) -> Option<ProcessRecord> {
        let mut processes = self
            .processes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        processes.insert(record.pid(), record)
    }

    /// Removes a process, as if it had been reaped.
    pub fn remove(&self, pid: Pid) -> Option<ProcessRecord> {
        let mut processes = self
            .processes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        processes.remove(&pid)
    }

    pub fn len(&self) -> usize {
        self.processes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when no lookup guard is currently held.
    pub fn is_unlocked(&self) -> bool {
        self.processes.try_write().is_ok()
    }
}

impl FromIterator<ProcessRecord> for InMemoryTable {
    fn from_iter<I: IntoIterator<Item = ProcessRecord>>(records: I) -> Self {
        let table = Self::new();
        for record in records {
            table.insert(record);
        }
        table
    }
}

struct InMemoryView<'a> {
    processes: RwLockReadGuard<'a, HashMap<Pid, ProcessRecord>>,
}

impl TableView for InMemoryView<'_> {
    fn find(&self, pid: Pid) -> Option<Cow<'_, ProcessRecord>> {
        self.processes.get(&pid).map(Cow::Borrowed)
    }
}

impl ProcessTable for InMemoryTable {
    fn read(&self) -> TableGuard<'_> {
        let processes = self
            .processes
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        TableGuard::new(InMemoryView { processes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_holds_read_lock() {
        let table: InMemoryTable = [ProcessRecord::new(1, 0, None)].into_iter().collect();
        assert!(table.is_unlocked());

        let guard = table.read();
        assert!(guard.find(1).is_some());
        assert!(guard.find(2).is_none());
        assert!(!table.is_unlocked());

        drop(guard);
        assert!(table.is_unlocked());
    }

    #[test]
    fn test_insert_replace_remove() {
        let table = InMemoryTable::new();
        assert!(table.is_empty());
        assert!(table.insert(ProcessRecord::new(10, 1000, None)).is_none());
        let previous = table.insert(ProcessRecord::new(10, 0, None));
        assert_eq!(previous.map(|r| r.uid()), Some(1000));
        assert_eq!(table.len(), 1);

        assert!(table.remove(10).is_some());
        assert!(table.read().find(10).is_none());
    }
}
