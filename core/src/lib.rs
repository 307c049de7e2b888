// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! A crash-tolerant parallel job pool.
//!
//! [`run`] hands every job to a fixed pool of workers and returns a
//! [`BatchResult`] describing which jobs completed, which did not, and how many
//! workers exited abnormally. Only submission problems are reported as errors;
//! job failures, crashed workers and interrupts are captured in the result.

pub mod arg_check;
pub use arg_check::{
    check_transfer, encode_args, find_invalid_args, ArgPath, InvalidArg, PathSegment,
};

mod batch_result;
pub use batch_result::BatchResult;

mod collector;

mod error;
pub use error::{JobError, SubmissionError};

mod interrupt;
pub use interrupt::InterruptSignal;

mod job;
pub use job::{InputEntry, Job, JobId, OutputEntry};

mod job_table;
pub use job_table::{build_job_queue, JobQueue, JobTable};

mod orchestrator;
pub use orchestrator::{run, Orchestrator};

mod run_config;
pub use run_config::{RunConfig, DEFAULT_TIMEOUT};

mod stop_signal;
pub use stop_signal::StopSignal;

pub mod thread_runtime;
pub use thread_runtime::ThreadRuntime;

mod worker;
pub use worker::{Worker, WorkerConfig, WorkerExit};

pub mod worker_runtime;
pub use worker_runtime::WorkerRuntime;
