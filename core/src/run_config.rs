// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::time::Duration;
use tracing::Level;

/// Default polling bound of the completion collector
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration of a single run
///
/// ```
/// use job_pool_core::RunConfig;
/// use std::time::Duration;
///
/// let config = RunConfig::new(4)
///     .fail_early(false)
///     .collect_results(true)
///     .timeout(Some(Duration::from_secs(1)));
/// assert_eq!(config.n_proc, 4);
/// ```
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Requested number of workers, clamped down to the job count
    pub n_proc: usize,
    /// Stop the whole pool on the first job failure
    pub fail_early: bool,
    /// Emit the diagnostic of every failed job
    pub trace: bool,
    /// Most verbose level of worker-side events
    pub level: Level,
    /// Send job return values back to the caller
    pub collect_results: bool,
    /// Longest single wait of the completion collector; `None` waits forever
    pub timeout: Option<Duration>,
    /// Bound of the input queue; `None` is unbounded
    pub queue_capacity: Option<usize>,
}

impl RunConfig {
    pub fn new(n_proc: usize) -> Self {
        Self {
            n_proc,
            fail_early: true,
            trace: true,
            level: Level::WARN,
            collect_results: false,
            timeout: Some(DEFAULT_TIMEOUT),
            queue_capacity: None,
        }
    }

    pub fn fail_early(mut self, fail_early: bool) -> Self {
        self.fail_early = fail_early;
        self
    }

    pub fn trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn collect_results(mut self, collect_results: bool) -> Self {
        self.collect_results = collect_results;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn queue_capacity(mut self, capacity: Option<usize>) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::new(2);
        assert_eq!(config.n_proc, 2);
        assert!(config.fail_early);
        assert!(config.trace);
        assert_eq!(config.level, Level::WARN);
        assert!(!config.collect_results);
        assert_eq!(config.timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.queue_capacity, None);
    }

    #[test]
    fn test_builder_overrides() {
        let config = RunConfig::new(3)
            .fail_early(false)
            .trace(false)
            .level(Level::DEBUG)
            .collect_results(true)
            .timeout(None)
            .queue_capacity(Some(64));
        assert!(!config.fail_early);
        assert!(!config.trace);
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.collect_results);
        assert_eq!(config.timeout, None);
        assert_eq!(config.queue_capacity, Some(64));
    }
}
