// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! A job that panics takes its worker down without a sentinel, the way an
//! out-of-memory kill takes down a worker process.

use job_pool_core::{run, RunConfig};
use std::thread;
use std::time::{Duration, Instant};

const N_PROC: usize = 2;
const N_JOBS: usize = 16;

fn crash_when((kill,): (bool,)) -> Result<(), String> {
    // Make each job take a non-zero amount of time
    thread::sleep(Duration::from_millis(10));
    if kill {
        panic!("worker killed");
    }
    Ok(())
}

#[test]
fn test_kill_worker_single() {
    let kill_at = 7;
    let values: Vec<_> = (0..N_JOBS).map(|i| (i == kill_at,)).collect();

    let result = run(
        crash_when,
        values,
        &RunConfig::new(N_PROC).timeout(Some(Duration::from_secs(1))),
    )
    .unwrap();

    assert!(!result.success);
    assert_eq!(result.num_successful(), N_JOBS - 1);
    assert_eq!(result.unsuccessful_jobs, vec![(true,)]);
    assert_eq!(result.failed_worker_count, 1);
}

#[test]
fn test_kill_worker_all() {
    let kill_from = 7;
    let values: Vec<_> = (0..N_JOBS).map(|i| (i >= kill_from,)).collect();

    let result = run(
        crash_when,
        values,
        &RunConfig::new(N_PROC).timeout(Some(Duration::from_secs(1))),
    )
    .unwrap();

    assert!(!result.success);
    assert!(result.num_successful() <= kill_from);
    assert!(result.num_unsuccessful() >= N_JOBS - kill_from);
    assert_eq!(result.failed_worker_count, N_PROC);
    assert_eq!(result.num_successful() + result.num_unsuccessful(), N_JOBS);
}

#[test]
fn test_kill_terminates_within_bounded_time() {
    let timeout = Duration::from_millis(200);
    let values: Vec<_> = (0..N_JOBS).map(|i| (i == 3,)).collect();

    let started = Instant::now();
    let config = RunConfig::new(N_PROC).timeout(Some(timeout));
    let result = run(crash_when, values, &config).unwrap();

    assert!(!result.success);
    assert_eq!(result.failed_worker_count, 1);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_kill_without_timeout_does_not_hang_once_all_workers_end() {
    let values: Vec<_> = (0..N_JOBS).map(|i| (i >= 2,)).collect();

    let result = run(crash_when, values, &RunConfig::new(N_PROC).timeout(None)).unwrap();

    assert!(!result.success);
    assert_eq!(result.failed_worker_count, N_PROC);
}
