//! Concurrency tests for the shared selection slot.
//!
//! Writers and readers share one session. A read may observe any writer's
//! selection, but every report must be one complete, consistent rendering.

use herakles_process_info::process::{ArgSource, MapLayout, MemoryMap};
use herakles_process_info::{
    ExtractOptions, InMemoryTable, ProcessInfoService, ProcessRecord, ProcessTable, QuerySession,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;

const WRITERS: usize = 4;
const READERS: usize = 4;
const ITERATIONS: usize = 2_000;

fn record(pid: i32) -> ProcessRecord {
    let mm = MemoryMap::new(
        MapLayout::from_bounds(
            Some(PathBuf::from(format!("/opt/bin/worker-{pid}"))),
            0,
            pid as u64 * 10,
        ),
        ArgSource::Unavailable,
    );
    ProcessRecord::new(pid, 1000 + pid as u32, Some(Arc::new(mm)))
}

fn expected(pid: i32) -> String {
    format!(
        "PID: {pid}\nUID: {}\nExecutable: /opt/bin/worker-{pid}\nCommand line: [command line of {} bytes]\n",
        1000 + pid,
        pid * 10
    )
}

#[test]
fn test_concurrent_reads_never_mix_reports() {
    let pids: Vec<i32> = (1..=WRITERS as i32).collect();
    let table: InMemoryTable = pids.iter().map(|&pid| record(pid)).collect();
    let table = Arc::new(table);
    let service = Arc::new(ProcessInfoService::new(
        Arc::clone(&table) as Arc<dyn ProcessTable>,
        Arc::new(QuerySession::new()),
        ExtractOptions::default(),
    ));

    let mut valid: HashSet<String> = pids.iter().map(|&pid| expected(pid)).collect();
    valid.insert("No valid PID provided\n".to_string());
    let valid = Arc::new(valid);

    let barrier = Arc::new(Barrier::new(WRITERS + READERS));
    let mut handles = Vec::new();

    for &pid in &pids {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            let payload = pid.to_string();
            for _ in 0..ITERATIONS {
                service.write(payload.as_bytes()).unwrap();
            }
        }));
    }

    for _ in 0..READERS {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        let valid = Arc::clone(&valid);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..ITERATIONS {
                let report = service.read();
                assert!(valid.contains(&report), "garbled report: {report:?}");
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(table.is_unlocked());
    let stats = service.stats().snapshot();
    assert_eq!(stats.writes_accepted, (WRITERS * ITERATIONS) as u64);
    assert_eq!(stats.reads_total(), (READERS * ITERATIONS) as u64);
}

#[test]
fn test_last_writer_wins_across_callers() {
    let table: InMemoryTable = [record(1), record(2)].into_iter().collect();
    let service = ProcessInfoService::new(
        Arc::new(table),
        Arc::new(QuerySession::new()),
        ExtractOptions::default(),
    );

    // Caller A selects 1, caller B selects 2 before A reads. A sees B's
    // selection: there is no per-caller isolation.
    service.write(b"1").unwrap();
    service.write(b"2").unwrap();
    assert_eq!(service.read(), expected(2));
}

#[test]
fn test_table_mutation_during_reads() {
    let table = Arc::new(InMemoryTable::new());
    table.insert(record(3));
    let service = Arc::new(ProcessInfoService::new(
        Arc::clone(&table) as Arc<dyn ProcessTable>,
        Arc::new(QuerySession::new()),
        ExtractOptions::default(),
    ));
    service.write(b"3").unwrap();

    let mutator = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            for i in 0..ITERATIONS {
                if i % 2 == 0 {
                    table.remove(3);
                } else {
                    table.insert(record(3));
                }
            }
        })
    };

    for _ in 0..ITERATIONS {
        let report = service.read();
        assert!(
            report == expected(3) || report == "Process with PID 3 not found\n",
            "unexpected report: {report:?}"
        );
    }
    mutator.join().unwrap();
    assert!(table.is_unlocked());
}
