// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::interrupt::InterruptSignal;
use crate::job::{JobId, OutputEntry};
use crate::worker::WorkerHandle;
use crossbeam_channel::{never, Receiver, Select};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, info};

/// Everything the collector learned from the output channel
#[derive(Debug)]
pub struct Collected<R> {
    pub successful: BTreeSet<JobId>,
    /// Present only when results are collected
    pub results: Option<HashMap<JobId, R>>,
    pub errors: BTreeMap<JobId, String>,
    pub interrupted: bool,
}

impl<R> Collected<R> {
    pub fn new(collect_results: bool) -> Self {
        Self {
            successful: BTreeSet::new(),
            results: collect_results.then(HashMap::new),
            errors: BTreeMap::new(),
            interrupted: false,
        }
    }

    /// Records one entry; returns true for a worker sentinel
    fn record(&mut self, entry: OutputEntry<R>) -> bool {
        match entry {
            OutputEntry::Completed { job_id, result } => {
                debug!("Received completed job #{}", job_id);
                self.successful.insert(job_id);
                if let (Some(results), Some(result)) = (self.results.as_mut(), result) {
                    results.insert(job_id, result);
                }
                false
            }
            OutputEntry::Failed { job_id, error } => {
                debug!("Received failed job #{}", job_id);
                self.errors.insert(job_id, error.to_string());
                false
            }
            OutputEntry::WorkerExited { worker_id } => {
                debug!("Received sentinel of worker {}", worker_id);
                true
            }
        }
    }
}

enum Wait<R> {
    Entry(OutputEntry<R>),
    Idle,
    Closed,
}

/// Drains the output channel until every worker is accounted for.
///
/// A worker is accounted for once its sentinel arrives, or once its handle
/// shows it ended without sending one. Waits on the channel are bounded by
/// `timeout` so that vanished workers are noticed; with `None` a worker that
/// vanishes while others keep the channel open stalls collection.
pub(crate) fn collect_completions<H, R>(
    workers: &[WorkerHandle<H>],
    completions: &Receiver<OutputEntry<R>>,
    collect_results: bool,
    timeout: Option<Duration>,
    interrupt: Option<&InterruptSignal>,
) -> Collected<R> {
    let mut collected = Collected::new(collect_results);
    let no_interrupt = never();
    let wake = interrupt.map_or(&no_interrupt, |signal| signal.wake_receiver());
    let mut sentinels = 0usize;
    let mut vanished = BTreeSet::new();

    loop {
        if interrupt.is_some_and(|signal| signal.is_triggered()) {
            collected.interrupted = true;
            return collected;
        }

        // Workers may die at any time, so look again on every pass
        for worker in workers {
            if let Some(exit) = worker.exit_status() {
                if !exit.sent_sentinel() && vanished.insert(worker.id) {
                    info!(
                        "Worker {} ended without a sentinel (exit code {})",
                        worker.name,
                        exit.code()
                    );
                }
            }
        }
        if sentinels >= workers.len() - vanished.len() {
            break;
        }

        match wait_for_entry(completions, wake, timeout) {
            Wait::Entry(entry) => {
                if collected.record(entry) {
                    sentinels += 1;
                    debug!("Received {} sentinel(s)", sentinels);
                }
            }
            Wait::Idle => {}
            Wait::Closed => {
                debug!("Every worker has released the output channel");
                break;
            }
        }
    }

    // Every worker is accounted for; pick up what crashed workers sent before dying
    for entry in completions.try_iter() {
        collected.record(entry);
    }

    debug!("Received {} successful jobs", collected.successful.len());
    collected
}

fn wait_for_entry<R>(
    completions: &Receiver<OutputEntry<R>>,
    wake: &Receiver<()>,
    timeout: Option<Duration>,
) -> Wait<R> {
    let mut select = Select::new();
    let completions_idx = select.recv(completions);
    select.recv(wake);

    let oper = match timeout {
        Some(timeout) => match select.select_timeout(timeout) {
            Ok(oper) => oper,
            Err(_) => return Wait::Idle,
        },
        None => select.select(),
    };

    if oper.index() == completions_idx {
        match oper.recv(completions) {
            Ok(entry) => Wait::Entry(entry),
            Err(_) => Wait::Closed,
        }
    } else {
        let _ = oper.recv(wake);
        Wait::Idle
    }
}
