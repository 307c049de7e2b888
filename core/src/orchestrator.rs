// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::batch_result::BatchResult;
use crate::collector::{collect_completions, Collected};
use crate::error::{RunError, SubmissionError};
use crate::interrupt::InterruptSignal;
use crate::job::OutputEntry;
use crate::job_table::build_job_queue;
use crate::run_config::RunConfig;
use crate::stop_signal::StopSignal;
use crate::thread_runtime::ThreadRuntime;
use crate::worker::{spawn_worker, Worker, WorkerConfig, WorkerExit, WorkerHandle};
use crate::worker_runtime::WorkerRuntime;
use crossbeam_channel::{unbounded, Receiver};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Orchestrator runs a batch of jobs on a pool of workers
/// Generic over the runtime the workers execute on
pub struct Orchestrator<RT: WorkerRuntime = ThreadRuntime> {
    runtime: RT,
    interrupt: Option<InterruptSignal>,
}

impl Orchestrator<ThreadRuntime> {
    pub fn new() -> Self {
        Self::with_runtime(ThreadRuntime)
    }
}

impl Default for Orchestrator<ThreadRuntime> {
    fn default() -> Self {
        Self::new()
    }
}

impl<RT: WorkerRuntime> Orchestrator<RT> {
    pub fn with_runtime(runtime: RT) -> Self {
        Self {
            runtime,
            interrupt: None,
        }
    }

    /// Cancels runs when the signal is triggered
    pub fn with_interrupt(mut self, interrupt: InterruptSignal) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Runs `func` once per job on `config.n_proc` workers.
    ///
    /// Only submission problems are returned as errors, before any worker is
    /// started. Failed jobs, crashed workers, interrupts and orchestration
    /// failures all end in a `BatchResult` with `success == false`.
    pub fn run<A, R, E, F, I>(
        &self,
        func: F,
        jobs: I,
        config: &RunConfig,
    ) -> Result<BatchResult<A, R>, SubmissionError>
    where
        A: Serialize + DeserializeOwned + 'static,
        R: Send + 'static,
        E: Display + 'static,
        F: Fn(A) -> Result<R, E> + Send + Sync + 'static,
        I: IntoIterator<Item = A>,
    {
        if config.timeout.is_none() {
            warn!("No collector timeout set; a worker that vanishes can stall the run");
        }

        let (queue, n_jobs, job_table) = build_job_queue(jobs, config.queue_capacity)?;
        // No idle workers
        let n_proc = config.n_proc.min(n_jobs);
        queue.push_sentinels(n_proc)?;

        let (done_tx, done_rx) = unbounded();
        let terminate = StopSignal::new();
        let worker_config = WorkerConfig {
            func: Arc::new(func),
            jobs: queue.into_receiver(),
            completions: done_tx,
            stop: StopSignal::new(),
            terminate: terminate.clone(),
            fail_early: config.fail_early,
            trace: config.trace,
            collect_results: config.collect_results,
            level: config.level,
        };

        info!("Spawning {} workers for {} jobs", n_proc, n_jobs);
        let mut workers = Vec::with_capacity(n_proc);
        let started = self.start_and_collect::<A, R, E, F>(
            n_proc,
            worker_config,
            &mut workers,
            &done_rx,
            config,
        );
        let collected = match started {
            Ok(collected) => collected,
            Err(e) => {
                error!("{}", e);
                Collected::new(config.collect_results)
            }
        };

        if collected.interrupted {
            info!("Received interrupt, terminating {} workers", workers.len());
        }
        if collected.interrupted || workers.len() < n_proc {
            terminate.raise();
        }

        let Collected {
            successful,
            results,
            errors,
            interrupted,
        } = collected;
        let n_done = successful.len();
        let (successful_jobs, unsuccessful_jobs) = job_table.partition(&successful);

        let failed_worker_count = self.join_workers(workers);

        Ok(BatchResult {
            success: !interrupted && n_done == n_jobs,
            job_count: n_jobs,
            successful_jobs,
            unsuccessful_jobs,
            failed_worker_count,
            job_results: results,
            job_errors: errors,
            interrupted,
        })
    }

    fn start_and_collect<A, R, E, F>(
        &self,
        n_proc: usize,
        worker_config: WorkerConfig<F, R>,
        workers: &mut Vec<WorkerHandle<RT::Handle>>,
        done_rx: &Receiver<OutputEntry<R>>,
        config: &RunConfig,
    ) -> Result<Collected<R>, RunError>
    where
        A: Serialize + DeserializeOwned + 'static,
        R: Send + 'static,
        E: Display + 'static,
        F: Fn(A) -> Result<R, E> + Send + Sync + 'static,
    {
        for worker_id in 0..n_proc {
            let worker: Worker<A, R, E, F> = Worker::new(worker_id, worker_config.clone());
            let handle = spawn_worker(&self.runtime, worker).map_err(|source| RunError::Spawn {
                name: format!("job-pool-{}", worker_id + 1),
                source,
            })?;
            workers.push(handle);
        }
        debug!("Started all workers");

        // Only workers may hold senders, so a closed channel means they are all gone
        drop(worker_config);

        Ok(collect_completions(
            workers,
            done_rx,
            config.collect_results,
            config.timeout,
            self.interrupt.as_ref(),
        ))
    }

    /// Joins every worker and counts those that exited with a non-zero status
    fn join_workers(&self, workers: Vec<WorkerHandle<RT::Handle>>) -> usize {
        let mut failed_worker_count = 0;
        for worker in workers {
            let name = worker.name.clone();
            let exit = worker.join(&self.runtime);
            if let WorkerExit::Crashed(message) = &exit {
                info!("Worker {} crashed: {}", name, message);
            }
            if !exit.is_success() {
                info!("Worker {} exit code: {}", name, exit.code());
                failed_worker_count += 1;
            }
        }
        debug!("Joined all workers");
        failed_worker_count
    }
}

/// Runs a batch on OS threads without an interrupt signal.
///
/// ```
/// use job_pool_core::{run, RunConfig};
///
/// let jobs = (0..8).map(|i| (i,));
/// let result = run(|(x,): (u32,)| Ok::<_, String>(x * 2), jobs, &RunConfig::new(2)).unwrap();
/// assert!(result.is_success());
/// assert_eq!(result.num_successful(), 8);
/// ```
pub fn run<A, R, E, F, I>(
    func: F,
    jobs: I,
    config: &RunConfig,
) -> Result<BatchResult<A, R>, SubmissionError>
where
    A: Serialize + DeserializeOwned + 'static,
    R: Send + 'static,
    E: Display + 'static,
    F: Fn(A) -> Result<R, E> + Send + Sync + 'static,
    I: IntoIterator<Item = A>,
{
    Orchestrator::new().run(func, jobs, config)
}
