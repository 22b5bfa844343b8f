//! Traffic strategies — the per-traffic-type test logic.
//!
//! Dispatch is a closed-enum match: the plan loader already rejected
//! unknown tags, so there is nothing to resolve at run time. Every
//! strategy aligns with its row siblings on the shared rendezvous before
//! any state-changing operation.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use faraday_common::{GlobalFlags, TestCaseRow, TrafficType};
use faraday_remote::exec::CommandRunner;
use faraday_remote::{wlan, AdapterError};
use thiserror::Error;
use tracing::{info, warn};

use crate::barrier::{Rendezvous, SyncError};
use crate::workspace::DutWorkspace;

mod autojoin;
mod idle;
mod join;
mod rvr;
mod throughput;

pub(crate) use throughput::run_session;

/// Pause between association attempts.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum TestError {
    #[error("association to '{ssid}' failed after {attempts} attempts")]
    AssociationFailed { ssid: String, attempts: u32 },
    #[error("rendezvous failed: {0}")]
    Sync(#[from] SyncError),
    #[error("traffic session failed: {0}")]
    Traffic(#[from] AdapterError),
    #[error("{failed} of {rounds} rejoin rounds never re-associated")]
    Rejoin { failed: u32, rounds: u32 },
}

/// Everything one strategy invocation may touch.
pub struct TestContext<'a> {
    pub dut: &'a str,
    pub row: &'a TestCaseRow,
    pub remotes: &'a [String],
    pub flags: &'a GlobalFlags,
    pub barrier: &'a Rendezvous,
    pub runner: &'a dyn CommandRunner,
    pub workspace: &'a DutWorkspace,
    /// Runner for controller-local hardware (the attenuator CLI).
    pub local_runner: &'a dyn CommandRunner,
}

impl TestContext<'_> {
    pub fn user(&self) -> &str {
        self.row.user()
    }

    /// DUT-side command logs land in the workspace's common dir.
    pub fn dut_log_dir(&self) -> &Path {
        &self.workspace.common
    }
}

/// One strategy per traffic type. `run` returns `Err` to mark the DUT's
/// test outcome failed; the worker still tears everything down.
pub trait TrafficTest: Send + Sync {
    fn run(&self, ctx: &TestContext<'_>) -> Result<(), TestError>;
}

static JOIN: join::Join = join::Join;
static AUTO_JOIN: autojoin::AutoJoin = autojoin::AutoJoin;
static IDLE: idle::Idle = idle::Idle;
static TCP: throughput::Throughput = throughput::Throughput { udp: false };
static UDP: throughput::Throughput = throughput::Throughput { udp: true };
static RVR: rvr::Rvr = rvr::Rvr;

pub fn strategy_for(traffic: TrafficType) -> &'static dyn TrafficTest {
    match traffic {
        TrafficType::Join => &JOIN,
        TrafficType::AutoJoin => &AUTO_JOIN,
        TrafficType::Idle => &IDLE,
        TrafficType::Tcp => &TCP,
        TrafficType::Udp => &UDP,
        TrafficType::Rvr => &RVR,
    }
}

/// Associate with bounded retries; returns the successful attempt's latency.
pub(crate) fn associate_with_retries(
    ctx: &TestContext<'_>,
    attempts: u32,
) -> Result<Duration, TestError> {
    let ssid = ctx.row.param_or("ap_wifi_ssid", "");
    let password = ctx.row.param_or("ap_wifi_pwd", "");
    let attempts = attempts.max(1);

    for attempt in 1..=attempts {
        let start = Instant::now();
        match wlan::associate(
            ctx.runner,
            ctx.dut,
            ctx.user(),
            ssid,
            password,
            ctx.row.wifi_interface(),
            ctx.dut_log_dir(),
        ) {
            Ok(_) => {
                let latency = start.elapsed();
                info!(dut = ctx.dut, ssid, attempt, ?latency, "association succeeded");
                return Ok(latency);
            }
            Err(e) => {
                warn!(dut = ctx.dut, ssid, attempt, error = %e, "association attempt failed");
                if attempt < attempts {
                    thread::sleep(RETRY_BACKOFF);
                }
            }
        }
    }
    Err(TestError::AssociationFailed {
        ssid: ssid.to_string(),
        attempts,
    })
}
