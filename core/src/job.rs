// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::JobError;

/// Dense job identifier, assigned from 0 in submission order
pub type JobId = usize;

/// One unit of work as it travels to a worker
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    /// Encoded arguments, decoded by the worker that runs the job
    pub payload: serde_json::Value,
}

/// Entries of the input channel
#[derive(Debug)]
pub enum InputEntry {
    Job(Job),
    /// No more work for the worker that pulls it
    Sentinel,
}

/// Entries of the output channel
#[derive(Debug)]
pub enum OutputEntry<R> {
    /// The job returned successfully; `result` is only set when results are collected
    Completed { job_id: JobId, result: Option<R> },
    /// The job returned an error or its arguments could not be decoded
    Failed { job_id: JobId, error: JobError },
    /// Last message of a worker that exited on its own
    WorkerExited { worker_id: usize },
}
