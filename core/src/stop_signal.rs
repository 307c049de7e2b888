// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Pool-wide flag shared by the orchestrator and every worker.
///
/// Once raised it stays raised for the lifetime of the run.
#[derive(Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Returns true only for the caller that raised it first.
    pub fn raise(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
