// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

mod fastrand_random;
mod random;
mod square_job;

use clap::Parser;
use fastrand_random::FastrandRandom;
use job_pool_core::{InterruptSignal, Orchestrator, RunConfig};
use random::Random;
use serde::Deserialize;
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    jobs: u64,
    workers: usize,
    failure_rate: f32,
    fail_early: bool,
    collect_results: bool,
    /// Zero disables the collector timeout
    timeout_secs: u64,
    max_delay_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jobs: 100,
            workers: 4,
            failure_rate: 0.0,
            fail_early: true,
            collect_results: false,
            timeout_secs: 10,
            max_delay_ms: 20,
        }
    }
}

impl Config {
    fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }
}

#[derive(Parser, Debug)]
#[command(name = "job-pool-demo")]
#[command(about = "Squares integers on a pool of workers", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(long, default_value = "config.json")]
    config: String,

    /// Number of jobs to submit
    #[arg(long)]
    jobs: Option<u64>,

    /// Number of workers
    #[arg(long)]
    workers: Option<usize>,

    /// Probability that a job fails
    #[arg(long)]
    failure_rate: Option<f32>,

    /// Keep running the remaining jobs after a failure
    #[arg(long)]
    fail_late: bool,

    /// Collect the squares
    #[arg(long)]
    collect: bool,

    /// Collector timeout in seconds, 0 to wait indefinitely
    #[arg(long)]
    timeout: Option<u64>,

    /// Log worker events down to debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(rate) = self.failure_rate {
            config.failure_rate = rate;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        config.fail_early &= !self.fail_late;
        config.collect_results |= self.collect;
    }
}

fn main() -> ExitCode {
    // Respects RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let start_time = Instant::now();
    let args = Args::parse();

    let mut config = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load {}: {}", args.config, e);
            eprintln!("Using default configuration...");
            Config::default()
        }
    };
    args.apply(&mut config);

    println!("=== JOB POOL DEMO ===");
    println!("Configuration:");
    println!("  - Jobs: {}", config.jobs);
    println!("  - Workers: {}", config.workers);
    println!("  - Failure rate: {}", config.failure_rate);
    println!("  - Fail early: {}", config.fail_early);
    println!("  - Collect results: {}", config.collect_results);
    println!("  - Timeout: {}s", config.timeout_secs);

    let mut orchestrator = Orchestrator::new();
    match InterruptSignal::install_ctrlc() {
        Ok(signal) => orchestrator = orchestrator.with_interrupt(signal),
        Err(e) => warn!("Cannot listen for Ctrl+C: {}", e),
    }

    let run_config = RunConfig::new(config.workers)
        .fail_early(config.fail_early)
        .collect_results(config.collect_results)
        .timeout((config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs)))
        .level(if args.verbose { Level::DEBUG } else { Level::INFO });

    let random: Arc<dyn Random> = Arc::new(FastrandRandom);
    let failure_rate = config.failure_rate;
    let max_delay_ms = config.max_delay_ms;

    println!("\nRunning...");
    let result = orchestrator.run(
        move |(x,): (u64,)| square_job::square(random.as_ref(), x, failure_rate, max_delay_ms),
        (0..config.jobs).map(|x| (x,)),
        &run_config,
    );
    let result = match result {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Cannot submit jobs: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("\n=== RESULTS ===");
    println!("Successful jobs: {}", result.num_successful());
    println!("Unsuccessful jobs: {}", result.num_unsuccessful());
    println!("Failed workers: {}", result.failed_worker_count);
    if result.interrupted {
        println!("Run was interrupted");
    }
    for (job_id, error) in result.job_errors.iter().take(10) {
        println!("  job #{}: {}", job_id, error);
    }
    if let Some(results) = &result.job_results {
        match results.values().try_fold(0u64, |total, v| total.checked_add(*v)) {
            Some(total) => println!("Sum of squares: {}", total),
            None => println!("Sum of squares: does not fit in 64 bits"),
        }
    }

    println!("\nTotal time: {:.2}s", start_time.elapsed().as_secs_f64());
    if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
