//! Test-plan driver: turns the configured plan into worker threads.
//!
//! Every runnable row gets its own rendezvous barrier sized to the row's
//! DUT list, and every DUT in the row gets its own thread. All threads
//! across all rows are spawned before any is joined, so rows execute
//! concurrently the way the lab schedules them. The fold over joined
//! results is what ultimately drives the process exit code.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use faraday_common::Config;
use faraday_remote::exec::CommandRunner;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::barrier::Rendezvous;
use crate::console;
use crate::pool::SnifferPool;
use crate::worker::{Worker, WorkerResult};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no runnable test rows after filtering")]
    EmptyPlan,
}

/// Fold of every worker outcome in the run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub panicked: usize,
    pub results: Vec<WorkerResult>,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.panicked == 0
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.panicked
    }
}

/// Run every non-skipped row of the plan, optionally restricted to the
/// test names in `filter` (empty means run everything).
pub fn run_plan(
    config: &Config,
    runner: Arc<dyn CommandRunner>,
    local_runner: Arc<dyn CommandRunner>,
    filter: &[String],
) -> Result<RunSummary, DriverError> {
    let pool = SnifferPool::new(config.sniffers.clone());
    let flags = Arc::new(config.flags.clone());
    let channels: Arc<BTreeMap<_, _>> = Arc::new(config.channels.clone());
    let phase_timeout = Duration::from_secs(config.flags.phase_timeout_secs);

    let mut handles = Vec::new();
    for row in &config.tests {
        if row.skip {
            info!(test = %row.name, "row marked skip");
            continue;
        }
        if !filter.is_empty() && !filter.iter().any(|f| f == &row.name) {
            continue;
        }

        console::step(&format!(
            "=== test '{}' on {} DUT(s) ===",
            row.name,
            row.duts.len()
        ));
        let row = Arc::new(row.clone());
        let barrier = Arc::new(Rendezvous::new(row.duts.len(), phase_timeout));
        for dut in &row.duts {
            let worker = Worker {
                dut: dut.clone(),
                row: Arc::clone(&row),
                flags: Arc::clone(&flags),
                channels: Arc::clone(&channels),
                pool: Arc::clone(&pool),
                barrier: Arc::clone(&barrier),
                runner: Arc::clone(&runner),
                local_runner: Arc::clone(&local_runner),
            };
            let name = format!("worker-{dut}");
            handles.push((row.name.clone(), dut.clone(), spawn_worker(name, worker)));
        }
    }

    if handles.is_empty() {
        return Err(DriverError::EmptyPlan);
    }

    let mut summary = RunSummary::default();
    for (test, dut, handle) in handles {
        match handle.join() {
            Ok(result) => {
                if result.passed {
                    summary.passed += 1;
                } else {
                    summary.failed += 1;
                }
                summary.results.push(result);
            }
            Err(_) => {
                // Row siblings of a panicked worker are released by the
                // phase timeout, not by poisoning.
                error!(test = %test, dut = %dut, "worker thread panicked");
                console::error(&format!("[{dut}] worker thread panicked"));
                summary.panicked += 1;
            }
        }
    }

    report(&summary);
    Ok(summary)
}

fn spawn_worker(name: String, worker: Worker) -> thread::JoinHandle<WorkerResult> {
    let fallback = worker.clone();
    match thread::Builder::new().name(name).spawn(move || worker.run()) {
        Ok(handle) => handle,
        // Spawn without a name only if the named spawn failed.
        Err(e) => {
            warn!(error = %e, "named thread spawn failed, retrying unnamed");
            thread::spawn(move || fallback.run())
        }
    }
}

fn report(summary: &RunSummary) {
    console::step(&format!(
        "run complete: {} passed, {} failed, {} panicked",
        summary.passed, summary.failed, summary.panicked
    ));
    for result in &summary.results {
        let mark = if result.passed { "✅" } else { "❌" };
        match &result.archive {
            Some(path) => info!(
                test = %result.test,
                dut = %result.dut,
                passed = result.passed,
                archive = %path.display(),
                "{mark} worker finished"
            ),
            None => info!(
                test = %result.test,
                dut = %result.dut,
                passed = result.passed,
                "{mark} worker finished"
            ),
        }
    }
}
