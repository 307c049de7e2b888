// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use job_pool_core::WorkerRuntime;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// Tokio-based runtime: workers run on the blocking pool of an existing runtime
///
/// Joining blocks the calling thread, so a run using this runtime must not be
/// started from inside an async task; use `spawn_blocking` for that.
#[derive(Clone)]
pub struct TokioRuntime {
    handle: Handle,
}

impl TokioRuntime {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is running in.
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl WorkerRuntime for TokioRuntime {
    type Handle = JoinHandle<()>;

    fn spawn<F>(&self, name: String, f: F) -> std::io::Result<Self::Handle>
    where
        F: FnOnce() + Send + 'static,
    {
        debug!("Starting {} on the blocking pool", name);
        Ok(self.handle.spawn_blocking(f))
    }

    fn join(&self, handle: Self::Handle) {
        if let Err(e) = self.handle.block_on(handle) {
            debug!("Blocking task failed: {}", e);
        }
    }
}
