// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// External cancellation of a run (typically Ctrl+C).
///
/// Only the orchestrating thread reacts to it: the completion collector wakes
/// up as soon as it is triggered, and the orchestrator then terminates the
/// workers. Once triggered it stays triggered, so a signal shared between runs
/// cancels every later run as well.
#[derive(Clone)]
pub struct InterruptSignal {
    flag: Arc<AtomicBool>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl InterruptSignal {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            wake_tx,
            wake_rx,
        }
    }

    /// Creates a signal triggered by Ctrl+C.
    ///
    /// The handler is process-wide, so this can succeed only once per process.
    pub fn install_ctrlc() -> Result<Self, ctrlc::Error> {
        let signal = Self::new();
        let handler = signal.clone();
        ctrlc::set_handler(move || handler.trigger())?;
        Ok(signal)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        // A pending wake-up is as good as a new one
        let _ = self.wake_tx.try_send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub(crate) fn wake_receiver(&self) -> &Receiver<()> {
        &self.wake_rx
    }
}

impl Default for InterruptSignal {
    fn default() -> Self {
        Self::new()
    }
}
