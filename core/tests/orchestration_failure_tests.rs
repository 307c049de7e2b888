// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use job_pool_core::{Orchestrator, RunConfig, ThreadRuntime, WorkerRuntime};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Runtime that cannot start any worker
struct FailingRuntime;

impl WorkerRuntime for FailingRuntime {
    type Handle = ();

    fn spawn<F>(&self, name: String, _f: F) -> io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        Err(io::Error::other(format!("cannot start {}", name)))
    }

    fn join(&self, _handle: ()) {}
}

/// Thread runtime that runs out of threads after `limit` workers
struct LimitedRuntime {
    limit: usize,
    spawned: AtomicUsize,
}

impl WorkerRuntime for LimitedRuntime {
    type Handle = <ThreadRuntime as WorkerRuntime>::Handle;

    fn spawn<F>(&self, name: String, f: F) -> io::Result<Self::Handle>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.spawned.fetch_add(1, Ordering::SeqCst) >= self.limit {
            return Err(io::Error::other("out of threads"));
        }
        ThreadRuntime.spawn(name, f)
    }

    fn join(&self, handle: Self::Handle) {
        ThreadRuntime.join(handle)
    }
}

#[test]
fn test_no_worker_can_start() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let result = Orchestrator::with_runtime(FailingRuntime)
        .run(
            move |(x,): (u32,)| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(x)
            },
            (0..6).map(|i| (i,)),
            &RunConfig::new(2),
        )
        .unwrap();

    assert!(!result.success);
    assert!(!result.interrupted);
    assert_eq!(result.num_successful(), 0);
    assert_eq!(result.unsuccessful_jobs, (0..6).map(|i| (i,)).collect::<Vec<_>>());
    assert_eq!(result.failed_worker_count, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_worker_start_fails_midway() {
    let runtime = LimitedRuntime {
        limit: 1,
        spawned: AtomicUsize::new(0),
    };

    let result = Orchestrator::with_runtime(runtime)
        .run(
            |(_x,): (u32,)| {
                thread::sleep(Duration::from_millis(10));
                Ok::<_, String>(())
            },
            (0..10).map(|i| (i,)),
            &RunConfig::new(3),
        )
        .unwrap();

    assert!(!result.success);
    // Nothing was collected, and the started worker was told to stop
    assert_eq!(result.num_successful(), 0);
    assert_eq!(result.num_unsuccessful(), 10);
    assert_eq!(result.failed_worker_count, 1);
}
