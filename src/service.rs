//! The process info query file.
//!
//! `ProcessInfoService` ties the pieces together: a write selects a PID in
//! the shared session, a read locates that process under a table guard,
//! extracts its attributes and renders them. Reads always produce text.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

use crate::error::WriteError;
use crate::process::{extract, find, ExtractOptions, Lookup, Pid, ProcessTable};
use crate::session::QuerySession;
use crate::snapshot::render;
use crate::stats::QueryStats;

/// Longest accepted write payload in bytes.
pub const MAX_PID_INPUT_LEN: usize = 31;

/// Parses a decimal PID the way `kstrtol(s, 10, ..)` does: optional sign,
/// digits, at most one trailing newline. Only positive values are accepted.
pub fn parse_pid(input: &[u8]) -> Result<Pid, WriteError> {
    if input.len() > MAX_PID_INPUT_LEN {
        return Err(WriteError::TooLong(input.len()));
    }
    let malformed = || WriteError::Malformed(String::from_utf8_lossy(input).into_owned());

    let text = std::str::from_utf8(input).map_err(|_| malformed())?;
    let text = text.strip_suffix('\n').unwrap_or(text);
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    let magnitude: i64 = digits
        .parse()
        .map_err(|_| WriteError::OutOfRange(text.to_string()))?;
    let value = if negative { -magnitude } else { magnitude };
    let pid = Pid::try_from(value).map_err(|_| WriteError::OutOfRange(text.to_string()))?;
    if pid <= 0 {
        return Err(WriteError::NotPositive(pid));
    }
    Ok(pid)
}

pub struct ProcessInfoService {
    table: Arc<dyn ProcessTable>,
    session: Arc<QuerySession>,
    options: ExtractOptions,
    stats: QueryStats,
}

impl ProcessInfoService {
    /// The session is owned by the caller; services sharing one session
    /// share one selection.
    pub fn new(
        table: Arc<dyn ProcessTable>,
        session: Arc<QuerySession>,
        options: ExtractOptions,
    ) -> Self {
        Self {
            table,
            session,
            options,
            stats: QueryStats::new(),
        }
    }

    pub fn session(&self) -> &QuerySession {
        &self.session
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    pub fn stats(&self) -> &QueryStats {
        &self.stats
    }

    /// Selects the PID written in `payload`. Returns the bytes consumed.
    pub fn write(&self, payload: &[u8]) -> Result<usize, WriteError> {
        self.write_from(payload, payload.len())
    }

    /// Copies `len` bytes from `src` and selects the PID they contain.
    ///
    /// A failing copy is an access fault; the selection is only changed
    /// after the payload has been fully read and parsed.
    #[instrument(skip(self, src))]
    pub fn write_from<R: Read>(&self, mut src: R, len: usize) -> Result<usize, WriteError> {
        if len > MAX_PID_INPUT_LEN {
            debug!("rejecting oversized PID payload of {} bytes", len);
            self.stats.record_write_rejected();
            return Err(WriteError::TooLong(len));
        }

        let mut buf = [0u8; MAX_PID_INPUT_LEN];
        if let Err(e) = src.read_exact(&mut buf[..len]) {
            return Err(self.access_fault(e));
        }

        match parse_pid(&buf[..len]) {
            Ok(pid) => {
                self.session.select(pid);
                self.stats.record_write_accepted();
                debug!(pid, "selected process");
                Ok(len)
            }
            Err(e) => {
                debug!("rejecting PID payload: {}", e);
                self.stats.record_write_rejected();
                Err(e)
            }
        }
    }

    /// Records and returns an access fault for a payload that could not be
    /// copied from the caller.
    pub fn access_fault(&self, source: io::Error) -> WriteError {
        debug!("failed to copy PID payload: {}", source);
        self.stats.record_access_fault();
        WriteError::AccessFault(source)
    }

    /// Renders the report for the current selection.
    pub fn read(&self) -> String {
        let start = Instant::now();
        let pid = self.session.current_selection();
        let out = self.render_for(pid);
        self.stats
            .record_read_duration_ms(start.elapsed().as_secs_f64() * 1000.0);
        out
    }

    fn render_for(&self, pid: Pid) -> String {
        let guard = self.table.read();
        let snapshot = match find(&guard, pid) {
            Lookup::NoSelection => {
                self.stats.record_read_no_selection();
                None
            }
            Lookup::NotFound(_) => {
                self.stats.record_read_not_found();
                None
            }
            Lookup::Found(record) => {
                let snapshot = extract(&record, &self.options);
                self.stats.record_read_found(snapshot.unknown_fields());
                Some(snapshot)
            }
        };
        drop(guard);
        render(pid, snapshot.as_ref())
    }

    /// Opens a readable, seekable handle on the query file.
    pub fn open(&self) -> ProcessInfoFile<'_> {
        ProcessInfoFile {
            service: self,
            buffer: None,
            pos: 0,
        }
    }
}

/// Open handle on the query file.
///
/// The report is rendered on the first read. Seeking discards it, so the
/// next read renders again against the then-current selection.
pub struct ProcessInfoFile<'a> {
    service: &'a ProcessInfoService,
    buffer: Option<Vec<u8>>,
    pos: u64,
}

impl Read for ProcessInfoFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let service = self.service;
        let content = self
            .buffer
            .get_or_insert_with(|| service.read().into_bytes());
        let start = (self.pos as usize).min(content.len());
        let n = (content.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&content[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for ProcessInfoFile<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "seeking from the end is not supported",
                ))
            }
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "invalid seek to a negative offset")
        })?;
        self.buffer = None;
        self.pos = target;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WriteErrorKind;
    use crate::process::{InMemoryTable, ProcessRecord};

    fn service_with(records: Vec<ProcessRecord>) -> ProcessInfoService {
        let table: InMemoryTable = records.into_iter().collect();
        ProcessInfoService::new(
            Arc::new(table),
            Arc::new(QuerySession::new()),
            ExtractOptions::default(),
        )
    }

    // -------------------------------------------------------------------------
    // Tests for parse_pid
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_pid_accepts_kstrtol_forms() {
        assert_eq!(parse_pid(b"1").unwrap(), 1);
        assert_eq!(parse_pid(b"1234\n").unwrap(), 1234);
        assert_eq!(parse_pid(b"+42").unwrap(), 42);
        assert_eq!(parse_pid(b"007").unwrap(), 7);
        assert_eq!(parse_pid(b"2147483647").unwrap(), i32::MAX);
    }

    #[test]
    fn test_parse_pid_rejects_malformed() {
        for input in [
            &b""[..],
            b"\n",
            b"abc",
            b" 1",
            b"1 ",
            b"1\n\n",
            b"12a",
            b"-",
            b"+-1",
            b"0x10",
            b"\xff\xfe",
        ] {
            let err = parse_pid(input).unwrap_err();
            assert_eq!(err.kind(), WriteErrorKind::InvalidInput, "input {input:?}");
            assert!(matches!(err, WriteError::Malformed(_)), "input {input:?}: {err}");
        }
    }

    #[test]
    fn test_parse_pid_rejects_non_positive() {
        assert!(matches!(parse_pid(b"0"), Err(WriteError::NotPositive(0))));
        assert!(matches!(parse_pid(b"-1\n"), Err(WriteError::NotPositive(-1))));
    }

    #[test]
    fn test_parse_pid_rejects_out_of_range() {
        assert!(matches!(parse_pid(b"2147483648"), Err(WriteError::OutOfRange(_))));
        assert!(matches!(
            parse_pid(b"99999999999999999999999"),
            Err(WriteError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_parse_pid_rejects_too_long() {
        let input = vec![b'1'; MAX_PID_INPUT_LEN + 1];
        assert!(matches!(parse_pid(&input), Err(WriteError::TooLong(32))));
    }

    // -------------------------------------------------------------------------
    // Tests for write/read
    // -------------------------------------------------------------------------

    #[test]
    fn test_write_then_read() {
        let service = service_with(vec![ProcessRecord::new(1, 0, None)]);
        assert_eq!(service.read(), "No valid PID provided\n");

        assert_eq!(service.write(b"1\n").unwrap(), 2);
        assert_eq!(
            service.read(),
            "PID: 1\nUID: 0\nExecutable: Unknown\nCommand line: [no command line data]\n"
        );

        let stats = service.stats().snapshot();
        assert_eq!(stats.writes_accepted, 1);
        assert_eq!(stats.reads_no_selection, 1);
        assert_eq!(stats.reads_found, 1);
        assert_eq!(stats.degraded_fields, 1);
    }

    #[test]
    fn test_write_access_fault_keeps_selection() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::PermissionDenied))
            }
        }

        let service = service_with(vec![]);
        service.write(b"5").unwrap();
        let err = service.write_from(FailingReader, 3).unwrap_err();
        assert_eq!(err.kind(), WriteErrorKind::AccessFault);
        assert_eq!(service.session().current_selection(), 5);

        // A short source is a fault too.
        let err = service.write_from(&b"12"[..], 3).unwrap_err();
        assert_eq!(err.kind(), WriteErrorKind::AccessFault);
        assert_eq!(service.stats().snapshot().access_faults, 2);
    }

    #[test]
    fn test_oversized_write_checked_before_copy() {
        let service = service_with(vec![]);
        let err = service.write_from(&b""[..], 64).unwrap_err();
        assert!(matches!(err, WriteError::TooLong(64)));
    }

    #[test]
    fn test_guard_released_after_read() {
        let table = Arc::new(
            [ProcessRecord::new(3, 1000, None)]
                .into_iter()
                .collect::<InMemoryTable>(),
        );
        let service = ProcessInfoService::new(
            Arc::clone(&table) as Arc<dyn ProcessTable>,
            Arc::new(QuerySession::new()),
            ExtractOptions::default(),
        );
        service.write(b"3").unwrap();
        service.read();
        service.write(b"4").unwrap();
        service.read();
        assert!(table.is_unlocked());
    }

    // -------------------------------------------------------------------------
    // Tests for ProcessInfoFile
    // -------------------------------------------------------------------------

    #[test]
    fn test_file_read_and_rewind() {
        let service = service_with(vec![]);
        service.write(b"77").unwrap();

        let mut file = service.open();
        let mut first = String::new();
        file.read_to_string(&mut first).unwrap();
        assert_eq!(first, "Process with PID 77 not found\n");

        file.seek(SeekFrom::Start(0)).unwrap();
        let mut second = String::new();
        file.read_to_string(&mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_file_partial_reads_use_one_rendering() {
        let service = service_with(vec![]);
        service.write(b"77").unwrap();

        let mut file = service.open();
        let mut head = [0u8; 8];
        file.read_exact(&mut head).unwrap();

        // A selection change between chunks must not splice two reports.
        service.write(b"78").unwrap();
        let mut rest = String::new();
        file.read_to_string(&mut rest).unwrap();
        assert_eq!(
            format!("{}{}", std::str::from_utf8(&head).unwrap(), rest),
            "Process with PID 77 not found\n"
        );

        // Seeking re-renders against the new selection.
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut again = String::new();
        file.read_to_string(&mut again).unwrap();
        assert_eq!(again, "Process with PID 78 not found\n");
    }

    #[test]
    fn test_file_seek_bounds() {
        let service = service_with(vec![]);
        let mut file = service.open();
        assert!(file.seek(SeekFrom::End(0)).is_err());
        assert!(file.seek(SeekFrom::Current(-1)).is_err());
        assert_eq!(file.seek(SeekFrom::Start(1000)).unwrap(), 1000);
        let mut buf = [0u8; 4];
        assert_eq!(file.read(&mut buf).unwrap(), 0);
    }
}
