// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::arg_check::InvalidArg;
use crate::job::JobId;
use thiserror::Error;

/// Errors raised while building the job queue, before any worker exists.
///
/// These are the only errors that cross the [`run`](crate::run) boundary.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The arguments of a job cannot be transferred to a worker
    #[error("Invalid arguments for job {job_id}: {}", describe_leaves(.leaves))]
    InvalidArguments {
        job_id: JobId,
        leaves: Vec<InvalidArg>,
    },

    /// The input queue has no room left for a job
    #[error("Cannot add job {job_id} to the queue")]
    QueueFull { job_id: JobId },

    /// The input queue has no room left for the end-of-work sentinels
    #[error("Cannot add {n_proc} worker sentinels to the queue")]
    NoRoomForSentinels { n_proc: usize },
}

fn describe_leaves(leaves: &[InvalidArg]) -> String {
    leaves
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Diagnostic carried back from a job that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct JobError {
    message: String,
}

impl JobError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failures of the orchestration itself; logged, never returned.
#[derive(Debug, Error)]
pub(crate) enum RunError {
    #[error("Failed to spawn worker {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
