// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::worker_runtime::WorkerRuntime;
use std::thread::{self, JoinHandle};

/// Thread-based runtime: one named OS thread per worker
#[derive(Clone, Copy, Default)]
pub struct ThreadRuntime;

impl WorkerRuntime for ThreadRuntime {
    type Handle = JoinHandle<()>;

    fn spawn<F>(&self, name: String, f: F) -> std::io::Result<Self::Handle>
    where
        F: FnOnce() + Send + 'static,
    {
        thread::Builder::new().name(name).spawn(f)
    }

    fn join(&self, handle: Self::Handle) {
        // Panics are contained inside the worker before the thread ends
        let _ = handle.join();
    }
}
