//! Query session state: the single currently selected PID.
//!
//! The session is one shared cell. Concurrent `select` calls are not ordered
//! beyond last-writer-wins, and nothing ties a `select` to the next read:
//! a reader sees whichever selection was stored most recently.

use std::sync::atomic::{AtomicI32, Ordering};

use crate::process::Pid;

/// Selection value before any successful write.
pub const UNSELECTED: Pid = -1;

#[derive(Debug)]
pub struct QuerySession {
    selected: AtomicI32,
}

impl Default for QuerySession {
    fn default() -> Self {
        Self::new()
    }
}

impl QuerySession {
    pub fn new() -> Self {
        Self {
            selected: AtomicI32::new(UNSELECTED),
        }
    }

    /// Overwrites the selection. No validation happens here.
    pub fn select(&self, pid: Pid) {
        self.selected.store(pid, Ordering::Release);
    }

    pub fn current_selection(&self) -> Pid {
        self.selected.load(Ordering::Acquire)
    }

    pub fn is_selected(&self) -> bool {
        self.current_selection() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_initially_unselected() {
        let session = QuerySession::new();
        assert_eq!(session.current_selection(), UNSELECTED);
        assert!(!session.is_selected());
    }

    #[test]
    fn test_select_overwrites() {
        let session = QuerySession::new();
        session.select(1);
        session.select(42);
        assert_eq!(session.current_selection(), 42);
        assert!(session.is_selected());
    }

    #[test]
    fn test_concurrent_selects_last_writer_wins() {
        let session = Arc::new(QuerySession::new());
        let handles: Vec<_> = (1..=8)
            .map(|pid| {
                let session = Arc::clone(&session);
                thread::spawn(move || session.select(pid))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // Which writer wins is unspecified; the value is always one of theirs.
        let winner = session.current_selection();
        assert!((1..=8).contains(&winner), "unexpected selection {winner}");
    }
}
