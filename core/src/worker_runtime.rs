// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

/// Trait for abstracting where workers execute (OS threads, a blocking pool, ...)
///
/// A worker publishes its own exit status, so the runtime only has to start
/// it and wait for it.
pub trait WorkerRuntime: Send + Sync {
    type Handle: Send;

    /// Start a worker under the given name
    fn spawn<F>(&self, name: String, f: F) -> std::io::Result<Self::Handle>
    where
        F: FnOnce() + Send + 'static;

    /// Wait for the worker to finish
    fn join(&self, handle: Self::Handle);
}
