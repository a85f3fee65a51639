//! Errors surfaced to writers of the query file.
//!
//! Reads never fail; only the write path reports errors.

use std::io;

use crate::service::MAX_PID_INPUT_LEN;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("PID payload of {0} bytes exceeds the {max} byte limit", max = MAX_PID_INPUT_LEN)]
    TooLong(usize),

    #[error("Malformed PID {0:?}")]
    Malformed(String),

    #[error("PID {0} is out of range")]
    OutOfRange(String),

    #[error("PID {0} is not positive")]
    NotPositive(i32),

    #[error("Failed to copy PID from caller: {0}")]
    AccessFault(#[source] io::Error),
}

/// Error classes as seen by the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteErrorKind {
    InvalidInput,
    AccessFault,
}

impl WriteError {
    pub fn kind(&self) -> WriteErrorKind {
        match self {
            WriteError::AccessFault(_) => WriteErrorKind::AccessFault,
            _ => WriteErrorKind::InvalidInput,
        }
    }

    /// The errno a file-backed write would fail with.
    pub fn errno(&self) -> i32 {
        match self.kind() {
            WriteErrorKind::InvalidInput => libc::EINVAL,
            WriteErrorKind::AccessFault => libc::EFAULT,
        }
    }
}
