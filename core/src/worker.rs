// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::JobError;
use crate::job::{InputEntry, Job, OutputEntry};
use crate::stop_signal::StopSignal;
use crate::worker_runtime::WorkerRuntime;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt::Display;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread;
use tracing::{dispatcher, Dispatch, Level};

/// Emits a worker event only when the run's configured level allows it
macro_rules! worker_event {
    ($cap:expr, $level:expr, $($arg:tt)+) => {
        if $level <= $cap {
            tracing::event!($level, $($arg)+);
        }
    };
}

/// How a worker ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// Drained its sentinel without any job failing
    Completed,
    /// A job failed, or the pool was stopped early
    Failed,
    /// Told to stop by the orchestrator after an interrupt; sent no sentinel
    Terminated,
    /// A job panicked and took the worker down; sent no sentinel
    Crashed(String),
}

impl WorkerExit {
    /// Process-style exit code: 0 on success, 1 on failure, -15 when
    /// terminated, 101 (the code of a panicking Rust process) when crashed
    pub fn code(&self) -> i32 {
        match self {
            WorkerExit::Completed => 0,
            WorkerExit::Failed => 1,
            WorkerExit::Terminated => -15,
            WorkerExit::Crashed(_) => 101,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkerExit::Completed)
    }

    /// Whether the worker put its sentinel on the output channel before exiting
    pub fn sent_sentinel(&self) -> bool {
        matches!(self, WorkerExit::Completed | WorkerExit::Failed)
    }
}

/// Read-only bundle handed to every worker
pub struct WorkerConfig<F, R> {
    pub func: Arc<F>,
    pub jobs: Receiver<InputEntry>,
    pub completions: Sender<OutputEntry<R>>,
    /// Raised by the first failing worker when `fail_early` is set
    pub stop: StopSignal,
    /// Raised by the orchestrator to abandon the run
    pub terminate: StopSignal,
    pub fail_early: bool,
    pub trace: bool,
    pub collect_results: bool,
    pub level: Level,
}

impl<F, R> Clone for WorkerConfig<F, R> {
    fn clone(&self) -> Self {
        Self {
            func: self.func.clone(),
            jobs: self.jobs.clone(),
            completions: self.completions.clone(),
            stop: self.stop.clone(),
            terminate: self.terminate.clone(),
            fail_early: self.fail_early,
            trace: self.trace,
            collect_results: self.collect_results,
            level: self.level,
        }
    }
}

/// Pulls jobs until it drains a sentinel or the pool is stopped
pub struct Worker<A, R, E, F> {
    id: usize,
    config: WorkerConfig<F, R>,
    _job: PhantomData<fn(A) -> E>,
}

impl<A, R, E, F> Worker<A, R, E, F>
where
    A: DeserializeOwned,
    E: Display,
    F: Fn(A) -> Result<R, E>,
{
    pub fn new(id: usize, config: WorkerConfig<F, R>) -> Self {
        Self {
            id,
            config,
            _job: PhantomData,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Runs the worker loop on the current thread and returns its exit status.
    ///
    /// Unless terminated, the last thing the worker does is send exactly one
    /// `WorkerExited` entry.
    pub fn run(self) -> WorkerExit {
        let level = self.config.level;
        let mut status_ok = true;
        let mut counter = 0usize;

        loop {
            if self.config.terminate.is_raised() {
                worker_event!(level, Level::DEBUG, worker = self.id, "Worker terminated");
                return WorkerExit::Terminated;
            }
            if self.config.stop.is_raised() {
                worker_event!(level, Level::DEBUG, worker = self.id, "Worker stopping early");
                status_ok = false;
                break;
            }

            let Job { id: job_id, payload } = match self.config.jobs.try_recv() {
                Ok(InputEntry::Job(job)) => job,
                Ok(InputEntry::Sentinel) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {
                    thread::yield_now();
                    continue;
                }
            };

            counter += 1;
            worker_event!(
                level,
                Level::DEBUG,
                worker = self.id,
                "Worker received job #{}",
                job_id
            );
            let outcome = self.execute(payload);

            if self.config.terminate.is_raised() {
                // The orchestrator has stopped listening; the outcome is abandoned
                return WorkerExit::Terminated;
            }

            let entry = match outcome {
                Ok(result) => {
                    worker_event!(
                        level,
                        Level::DEBUG,
                        worker = self.id,
                        "Worker finished job #{}",
                        job_id
                    );
                    let result = if self.config.collect_results {
                        Some(result)
                    } else {
                        None
                    };
                    OutputEntry::Completed { job_id, result }
                }
                Err(error) => {
                    if self.config.trace {
                        worker_event!(
                            level,
                            Level::WARN,
                            worker = self.id,
                            "Job #{} failed: {}",
                            job_id,
                            error
                        );
                    }
                    status_ok = false;
                    OutputEntry::Failed { job_id, error }
                }
            };
            let failed = matches!(entry, OutputEntry::Failed { .. });

            if self.config.completions.send(entry).is_err() {
                worker_event!(level, Level::DEBUG, worker = self.id, "Output channel closed");
                return WorkerExit::Terminated;
            }

            if failed && self.config.fail_early {
                if self.config.stop.raise() {
                    worker_event!(
                        level,
                        Level::DEBUG,
                        worker = self.id,
                        "Will stop workers early"
                    );
                }
                break;
            }
        }

        worker_event!(level, Level::DEBUG, worker = self.id, "Worker sending sentinel");
        let _ = self
            .config
            .completions
            .send(OutputEntry::WorkerExited { worker_id: self.id });
        worker_event!(
            level,
            Level::INFO,
            worker = self.id,
            "Worker exiting, {} jobs, success = {}",
            counter,
            status_ok
        );

        if status_ok {
            WorkerExit::Completed
        } else {
            WorkerExit::Failed
        }
    }

    fn execute(&self, payload: serde_json::Value) -> Result<R, JobError> {
        let args: A = serde_json::from_value(payload)
            .map_err(|e| JobError::new(format!("Cannot decode job arguments: {}", e)))?;
        (self.config.func)(args).map_err(|e| JobError::new(e.to_string()))
    }
}

/// A started worker as seen by the orchestrator
pub(crate) struct WorkerHandle<H> {
    pub(crate) id: usize,
    pub(crate) name: String,
    handle: H,
    exit: Arc<OnceLock<WorkerExit>>,
}

impl<H> WorkerHandle<H> {
    /// Exit status, if the worker has already ended. Never blocks.
    pub(crate) fn exit_status(&self) -> Option<&WorkerExit> {
        self.exit.get()
    }

    /// Waits for the worker and returns its final status
    pub(crate) fn join<RT>(self, runtime: &RT) -> WorkerExit
    where
        RT: WorkerRuntime<Handle = H>,
    {
        runtime.join(self.handle);
        self.exit.get().cloned().unwrap_or_else(|| {
            WorkerExit::Crashed("worker ended without an exit status".to_string())
        })
    }
}

/// Starts a worker on the runtime.
///
/// A panic escaping a job is contained here: the worker dies without sending
/// its sentinel and its handle reports `WorkerExit::Crashed`. The worker logs
/// to the subscriber that is current on the calling thread.
pub(crate) fn spawn_worker<RT, A, R, E, F>(
    runtime: &RT,
    worker: Worker<A, R, E, F>,
) -> std::io::Result<WorkerHandle<RT::Handle>>
where
    RT: WorkerRuntime,
    A: DeserializeOwned + 'static,
    R: Send + 'static,
    E: Display + 'static,
    F: Fn(A) -> Result<R, E> + Send + Sync + 'static,
{
    let id = worker.id();
    let name = format!("job-pool-{}", id + 1);
    let exit = Arc::new(OnceLock::new());
    let exit_cell = exit.clone();
    let dispatch = dispatcher::get_default(Dispatch::clone);

    let handle = runtime.spawn(name.clone(), move || {
        dispatcher::with_default(&dispatch, || {
            let status = match panic::catch_unwind(AssertUnwindSafe(move || worker.run())) {
                Ok(status) => status,
                Err(payload) => WorkerExit::Crashed(panic_message(payload.as_ref())),
            };
            let _ = exit_cell.set(status);
        })
    })?;

    Ok(WorkerHandle {
        id,
        name,
        handle,
        exit,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
