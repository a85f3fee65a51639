//! Process lookup under a table guard.

use std::borrow::Cow;
use tracing::debug;

use super::table::{Pid, ProcessRecord, TableGuard};

/// Outcome of resolving a selected identifier.
#[derive(Debug)]
pub enum Lookup<'g> {
    /// The identifier is not positive; no lookup was attempted.
    NoSelection,
    NotFound(Pid),
    /// Borrowed from the guard; unusable once the guard is dropped.
    Found(Cow<'g, ProcessRecord>),
}

/// Resolves `pid` through an already-acquired guard.
pub fn find<'g>(guard: &'g TableGuard<'_>, pid: Pid) -> Lookup<'g> {
    if pid <= 0 {
        return Lookup::NoSelection;
    }
    match guard.find(pid) {
        Some(record) => Lookup::Found(record),
        None => {
            debug!(pid, "process not found");
            Lookup::NotFound(pid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{InMemoryTable, ProcessTable};

    #[test]
    fn test_find_outcomes() {
        let table: InMemoryTable = [ProcessRecord::new(1, 0, None)].into_iter().collect();
        let guard = table.read();

        assert!(matches!(find(&guard, 0), Lookup::NoSelection));
        assert!(matches!(find(&guard, -5), Lookup::NoSelection));
        assert!(matches!(find(&guard, 31337), Lookup::NotFound(31337)));
        match find(&guard, 1) {
            Lookup::Found(record) => assert_eq!(record.pid(), 1),
            other => panic!("expected Found, got {other:?}"),
        }
    }
}
