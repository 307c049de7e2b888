// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use job_pool_core::{run, RunConfig};
use serde::{Serialize, Serializer};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Collects formatted log lines in memory
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = SharedBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs `f` with logs of the current thread captured
fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = SharedBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    (value, buffer.contents())
}

struct CannotTransfer;

impl Serialize for CannotTransfer {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("not transferable"))
    }
}

impl<'de> serde::Deserialize<'de> for CannotTransfer {
    fn deserialize<D: serde::Deserializer<'de>>(_deserializer: D) -> Result<Self, D::Error> {
        Err(serde::de::Error::custom("not transferable"))
    }
}

fn echo((x,): (u32,)) -> Result<u32, String> {
    Ok(x)
}

#[test]
fn test_logs_worker_count() {
    let (result, logs) = capture_logs(|| {
        run(echo, (0..10).map(|i| (i,)), &RunConfig::new(2)).unwrap()
    });
    assert!(result.success);
    assert!(logs.contains("Spawning 2 workers for 10 jobs"), "logs: {}", logs);
}

#[test]
fn test_logs_clamped_worker_count() {
    let (_, logs) = capture_logs(|| {
        run(echo, (0..2).map(|i| (i,)), &RunConfig::new(10)).unwrap()
    });
    assert!(logs.contains("Spawning 2 workers for 2 jobs"), "logs: {}", logs);
}

#[test]
fn test_logs_missing_timeout() {
    let (_, logs) = capture_logs(|| {
        run(echo, (0..2).map(|i| (i,)), &RunConfig::new(1).timeout(None)).unwrap()
    });
    assert!(logs.contains("No collector timeout set"), "logs: {}", logs);
}

#[test]
fn test_logs_invalid_argument_path() {
    let (result, logs) = capture_logs(|| {
        run(
            |_args: (u32, CannotTransfer)| Ok::<_, String>(()),
            vec![(1, CannotTransfer)],
            &RunConfig::new(1),
        )
    });
    assert!(result.is_err());
    assert!(logs.contains("Invalid value at args[1]: not transferable"), "logs: {}", logs);
}

#[test]
fn test_logs_failed_worker_exit_code() {
    let (_, logs) = capture_logs(|| {
        run(
            |(x,): (u32,)| if x == 0 { Err("boom") } else { Ok(()) },
            vec![(0,)],
            &RunConfig::new(1),
        )
        .unwrap()
    });
    assert!(logs.contains("exit code: 1"), "logs: {}", logs);
}

// ============================================================
// Worker events
// ============================================================

fn reject_three((x,): (u32,)) -> Result<u32, String> {
    if x == 3 {
        Err("three is not allowed".to_string())
    } else {
        Ok(x)
    }
}

fn run_with_logs(config: RunConfig) -> String {
    let (result, logs) =
        capture_logs(|| run(reject_three, (0..6).map(|i| (i,)), &config).unwrap());
    assert_eq!(result.unsuccessful_jobs, vec![(3,)]);
    logs
}

#[test]
fn test_trace_logs_job_failure() {
    let logs = run_with_logs(RunConfig::new(2).fail_early(false).trace(true));
    assert!(logs.contains("Job #3 failed: three is not allowed"), "logs: {}", logs);
}

#[test]
fn test_no_trace_hides_job_failure() {
    let logs = run_with_logs(RunConfig::new(2).fail_early(false).trace(false));
    assert!(!logs.contains("Job #3 failed"), "logs: {}", logs);
}

#[test]
fn test_level_caps_worker_events() {
    let logs = run_with_logs(RunConfig::new(2).fail_early(false).level(Level::ERROR));
    assert!(!logs.contains("Job #3 failed"), "logs: {}", logs);
    assert!(!logs.contains("Worker exiting"), "logs: {}", logs);
}

#[test]
fn test_level_info_reports_worker_exit() {
    let quiet = run_with_logs(RunConfig::new(1).fail_early(false));
    assert!(!quiet.contains("Worker exiting"), "logs: {}", quiet);

    let logs = run_with_logs(RunConfig::new(1).fail_early(false).level(Level::INFO));
    assert!(logs.contains("Worker exiting, 6 jobs, success = false"), "logs: {}", logs);
}
