// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::arg_check::check_transfer;
use crate::error::SubmissionError;
use crate::job::{InputEntry, Job, JobId};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeSet;

/// Original arguments of every submitted job, indexed by job id
pub struct JobTable<A> {
    args: Vec<A>,
}

impl<A> JobTable<A> {
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get(&self, job_id: JobId) -> Option<&A> {
        self.args.get(job_id)
    }

    /// Splits the arguments into (successful, unsuccessful), both in job id order
    pub fn partition(self, successful: &BTreeSet<JobId>) -> (Vec<A>, Vec<A>) {
        let mut done = Vec::with_capacity(successful.len());
        let mut not_done = Vec::new();
        for (job_id, args) in self.args.into_iter().enumerate() {
            if successful.contains(&job_id) {
                done.push(args);
            } else {
                not_done.push(args);
            }
        }
        (done, not_done)
    }
}

/// FIFO input channel shared by all workers
pub struct JobQueue {
    tx: Sender<InputEntry>,
    rx: Receiver<InputEntry>,
}

impl JobQueue {
    pub fn new(capacity: Option<usize>) -> Self {
        let (tx, rx) = match capacity {
            Some(cap) => bounded(cap),
            None => unbounded(),
        };
        Self { tx, rx }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    fn try_push(&self, entry: InputEntry) -> Result<(), TrySendError<InputEntry>> {
        self.tx.try_send(entry)
    }

    /// Appends one end-of-work sentinel per worker
    pub fn push_sentinels(&self, n_proc: usize) -> Result<(), SubmissionError> {
        for _ in 0..n_proc {
            self.try_push(InputEntry::Sentinel)
                .map_err(|_| SubmissionError::NoRoomForSentinels { n_proc })?;
        }
        Ok(())
    }

    /// Closes the queue for writing and hands out the worker side
    pub fn into_receiver(self) -> Receiver<InputEntry> {
        self.rx
    }
}

/// Validates, numbers and enqueues every job.
///
/// Fails on the first job whose arguments cannot be transferred intact or
/// that does not fit into the queue. Returns the queue, the job count and the
/// table mapping job ids back to their arguments.
pub fn build_job_queue<A, I>(
    jobs: I,
    capacity: Option<usize>,
) -> Result<(JobQueue, usize, JobTable<A>), SubmissionError>
where
    A: Serialize + DeserializeOwned,
    I: IntoIterator<Item = A>,
{
    let queue = JobQueue::new(capacity);
    let mut args = Vec::new();

    for (job_id, job_args) in jobs.into_iter().enumerate() {
        let payload = check_transfer(&job_args)
            .map_err(|leaves| SubmissionError::InvalidArguments { job_id, leaves })?;
        queue
            .try_push(InputEntry::Job(Job {
                id: job_id,
                payload,
            }))
            .map_err(|_| SubmissionError::QueueFull { job_id })?;
        args.push(job_args);
    }

    let n_jobs = args.len();
    Ok((queue, n_jobs, JobTable { args }))
}
