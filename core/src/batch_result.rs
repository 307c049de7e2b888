// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::job::JobId;
use std::collections::{BTreeMap, HashMap};

/// Final account of a run
///
/// ```
/// use job_pool_core::BatchResult;
///
/// let good: BatchResult<(i32,), ()> = BatchResult::new(true, 0, vec![], vec![], 0);
/// assert!(bool::from(&good));
/// let bad: BatchResult<(i32,), ()> = BatchResult::new(false, 0, vec![], vec![], 0);
/// assert!(!bool::from(&bad));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult<A, R> {
    /// Whether every submitted job completed
    pub success: bool,
    pub job_count: usize,
    /// Arguments of the completed jobs, in submission order
    pub successful_jobs: Vec<A>,
    /// Arguments of the jobs that did not complete, in submission order
    pub unsuccessful_jobs: Vec<A>,
    /// Workers that exited with a non-zero status
    pub failed_worker_count: usize,
    /// Return value of every completed job, if results were collected
    pub job_results: Option<HashMap<JobId, R>>,
    /// Diagnostic of every job that reported a failure
    pub job_errors: BTreeMap<JobId, String>,
    /// Whether the run was cut short by an interrupt
    pub interrupted: bool,
}

impl<A, R> BatchResult<A, R> {
    pub fn new(
        success: bool,
        job_count: usize,
        successful_jobs: Vec<A>,
        unsuccessful_jobs: Vec<A>,
        failed_worker_count: usize,
    ) -> Self {
        Self {
            success,
            job_count,
            successful_jobs,
            unsuccessful_jobs,
            failed_worker_count,
            job_results: None,
            job_errors: BTreeMap::new(),
            interrupted: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn num_successful(&self) -> usize {
        self.successful_jobs.len()
    }

    pub fn num_unsuccessful(&self) -> usize {
        self.unsuccessful_jobs.len()
    }
}

impl<A, R> From<&BatchResult<A, R>> for bool {
    fn from(result: &BatchResult<A, R>) -> Self {
        result.success
    }
}
