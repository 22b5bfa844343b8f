//! The per-DUT test-execution worker.
//!
//! One worker owns one DUT for one test-case row and walks a fixed
//! lifecycle: workspace setup, pre-test cleanup, resource acquisition,
//! strategy dispatch, teardown, archival, outcome report. Teardown runs
//! unconditionally in a deterministic order no matter what the strategy
//! did, and every cleanup/acquisition/teardown step is individually
//! best-effort: failures are logged with their severity and the machine
//! moves on. Only workspace creation is fatal to the DUT.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use faraday_common::{ChannelParams, GlobalFlags, TestCaseRow, TrafficType};
use faraday_remote::exec::CommandRunner;
use faraday_remote::{attenuator, diag, firmware, iperf, sniffer, tcpdump, wlan, AdapterError};
use faraday_common::DiagMode;
use tracing::{error, info, warn};

use crate::archive;
use crate::barrier::Rendezvous;
use crate::console;
use crate::pool::{SnifferLease, SnifferPool};
use crate::traffic::{self, TestContext};
use crate::workspace::DutWorkspace;

const STEP_PAUSE: Duration = Duration::from_secs(1);
const WIFI_RESTART_PAUSE: Duration = Duration::from_secs(2);

/// Outcome of one DUT's run, consumed by the driver's summary fold.
#[derive(Debug)]
pub struct WorkerResult {
    pub dut: String,
    pub test: String,
    pub passed: bool,
    pub archive: Option<PathBuf>,
}

/// Resources picked up in the acquisition state; consumed by teardown.
#[derive(Default)]
struct Acquired {
    attn_set: bool,
    sniffers: Vec<(SnifferLease, String)>,
    tcpdump_pcap: Option<String>,
    iperf_daemon: Option<String>,
}

#[derive(Clone)]
pub struct Worker {
    pub dut: String,
    pub row: Arc<TestCaseRow>,
    pub flags: Arc<GlobalFlags>,
    pub channels: Arc<BTreeMap<String, ChannelParams>>,
    pub pool: Arc<SnifferPool>,
    pub barrier: Arc<Rendezvous>,
    pub runner: Arc<dyn CommandRunner>,
    pub local_runner: Arc<dyn CommandRunner>,
}

/// The one policy for non-fatal steps: log with severity, keep going.
fn best_effort<T>(dut: &str, op: &str, result: Result<T, AdapterError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(dut, op, severity = ?e.severity(), error = %e, "step failed, continuing");
            None
        }
    }
}

impl Worker {
    pub fn run(self) -> WorkerResult {
        let span = tracing::info_span!("worker", dut = %self.dut, test = %self.row.name);
        let _guard = span.enter();

        console::step(&format!("📁 [{}] creating log folders", self.dut));
        let workspace = match DutWorkspace::create(
            &self.flags.log_root,
            &self.row.name,
            &self.dut,
            &self.row.remotes,
        ) {
            Ok(ws) => ws,
            Err(e) => {
                // Fatal for this DUT; release the row siblings before bailing.
                error!(dut = %self.dut, error = %e, "workspace creation failed, aborting worker");
                console::error(&format!("[{}] workspace creation failed: {e}", self.dut));
                self.barrier.poison();
                return WorkerResult {
                    dut: self.dut,
                    test: self.row.name.clone(),
                    passed: false,
                    archive: None,
                };
            }
        };

        self.pre_test_cleanup(&workspace);
        let mut acquired = self.acquire(&workspace);

        console::step(&format!(
            "🚀 [{}] running test logic: {}",
            self.dut, self.row.traffic
        ));
        let outcome = {
            let ctx = TestContext {
                dut: &self.dut,
                row: &self.row,
                remotes: &self.row.remotes,
                flags: &self.flags,
                barrier: &self.barrier,
                runner: self.runner.as_ref(),
                workspace: &workspace,
                local_runner: self.local_runner.as_ref(),
            };
            traffic::strategy_for(self.row.traffic).run(&ctx)
        };
        if let Err(e) = &outcome {
            error!(dut = %self.dut, error = %e, "test logic failed");
            console::error(&format!("[{}] test logic failed: {e}", self.dut));
            // Siblings may be parked at a phase this worker will never
            // reach again; fail them fast rather than letting them hang.
            self.barrier.poison();
        }

        console::step(&format!("🧹 [{}] collecting logs and cleaning up", self.dut));
        self.teardown(&workspace, &mut acquired);

        let archive = match archive::archive_workspace(&self.flags.log_root, &self.row.name, &self.dut)
        {
            Ok(path) => Some(path),
            Err(e) => {
                error!(dut = %self.dut, error = %e, "archival failed");
                None
            }
        };

        let passed = outcome.is_ok();
        if passed {
            info!(dut = %self.dut, "test successful");
            console::step(&format!("[{}] ✅ test SUCCESSFUL", self.dut));
        } else {
            error!(dut = %self.dut, "test failed");
            console::step(&format!("[{}] ❌ test FAILED", self.dut));
        }
        WorkerResult {
            dut: self.dut,
            test: self.row.name.clone(),
            passed,
            archive,
        }
    }

    /// State 2: clear remote state so the run starts from a known slate.
    fn pre_test_cleanup(&self, ws: &DutWorkspace) {
        console::step(&format!("🧼 [{}] cleaning DUT state", self.dut));
        let dut = self.dut.as_str();
        let user = self.row.user();
        let runner = self.runner.as_ref();

        best_effort(dut, "erase logs", diag::erase_logs(runner, dut, user, &ws.common));
        thread::sleep(STEP_PAUSE);
        best_effort(dut, "forget networks", wlan::forget_all(runner, dut, user, &ws.common));
        thread::sleep(STEP_PAUSE);
        best_effort(
            dut,
            "clear scan cache",
            wlan::clear_scan_cache(runner, dut, user, self.row.wifi_interface(), &ws.common),
        );
        thread::sleep(STEP_PAUSE);
        best_effort(dut, "wifi off", wlan::wifi_off(runner, dut, user, &ws.common));
        thread::sleep(WIFI_RESTART_PAUSE);
        best_effort(dut, "wifi on", wlan::wifi_on(runner, dut, user, &ws.common));
        thread::sleep(STEP_PAUSE);
        best_effort(dut, "firmware log clean", firmware::clean(runner, dut, user, &ws.common));
    }

    /// State 3: acquisition, in order; each step independently best-effort.
    fn acquire(&self, ws: &DutWorkspace) -> Acquired {
        console::step(&format!(
            "📡 [{}] starting captures and instrumentation",
            self.dut
        ));
        let dut = self.dut.as_str();
        let user = self.row.user();
        let runner = self.runner.as_ref();
        let mut acquired = Acquired::default();

        if self.flags.enable_attenuator {
            let level = self.row.param_num("start_attn_1", 0i32);
            acquired.attn_set = best_effort(
                dut,
                "set initial attenuation",
                attenuator::set_attenuation(self.local_runner.as_ref(), level, &ws.attenuator),
            )
            .is_some();
        } else {
            info!(dut, "attenuator disabled, skipping");
        }

        if self.flags.enable_sniffer {
            for channel in self.row.sniffer_channels() {
                let Some(params) = self.channels.get(&channel) else {
                    error!(dut, channel, "no parameters for capture channel, skipping");
                    continue;
                };
                match self.pool.checkout() {
                    Some(lease) => {
                        let started = best_effort(
                            dut,
                            "sniffer start",
                            sniffer::start(runner, lease.device(), &params.capture_args(), &ws.sniffer),
                        );
                        if let Some(pcap) = started {
                            acquired.sniffers.push((lease, pcap));
                        }
                        // A failed start drops the lease, returning the slot.
                    }
                    None => error!(dut, channel, "no capture device available, skipping"),
                }
            }
        } else {
            info!(dut, "sniffer disabled, skipping");
        }

        if self.flags.enable_tcpdump {
            acquired.tcpdump_pcap = best_effort(
                dut,
                "tcpdump start",
                tcpdump::start(runner, dut, user, self.row.wifi_interface(), &ws.tcpdump),
            );
        } else {
            info!(dut, "tcpdump disabled, skipping");
        }

        self.collect_diag(ws, "initial");

        best_effort(dut, "firmware log start", firmware::start(runner, dut, user, &ws.common));

        if self.row.traffic == TrafficType::Tcp {
            if let Some(first) = self.row.remotes.first() {
                let ok = best_effort(
                    dut,
                    "iperf daemon start",
                    iperf::server_daemon(runner, first, user, ws.remote_dir(first)),
                );
                if ok.is_some() {
                    acquired.iperf_daemon = Some(first.clone());
                }
            }
        }

        acquired
    }

    fn collect_diag(&self, ws: &DutWorkspace, phase: &str) {
        let dut = self.dut.as_str();
        let user = self.row.user();
        let runner = self.runner.as_ref();
        match self.flags.diag_mode {
            DiagMode::Off => info!(dut, phase, "diagnostics disabled, skipping"),
            DiagMode::Sysdiagnose => {
                best_effort(dut, "sysdiagnose", diag::run_sysdiagnose(runner, dut, user, &ws.sysdiag));
            }
            DiagMode::LogArchive => {
                best_effort(dut, "log archive", diag::run_log_archive(runner, dut, user, &ws.sysdiag));
            }
        }
    }

    /// State 5: unconditional teardown, deterministic order, every step
    /// best-effort. Runs whether or not the strategy failed.
    fn teardown(&self, ws: &DutWorkspace, acquired: &mut Acquired) {
        let dut = self.dut.as_str();
        let user = self.row.user();
        let runner = self.runner.as_ref();

        if acquired.tcpdump_pcap.take().is_some() {
            best_effort(dut, "tcpdump stop", tcpdump::stop(runner, dut, user, &ws.tcpdump));
        }

        for (lease, pcap) in acquired.sniffers.drain(..) {
            info!(dut, device = %lease.device().name, pcap, "stopping sniffer");
            best_effort(dut, "sniffer stop", sniffer::stop(runner, lease.device(), &ws.sniffer));
        }

        self.collect_diag(ws, "final");

        // Unconditional: a failed start may still have left partial
        // bundles on the DUT worth pulling.
        best_effort(
            dut,
            "firmware log stop",
            firmware::stop_and_pull(runner, dut, user, &ws.common),
        );

        if acquired.attn_set && self.flags.enable_attenuator {
            best_effort(
                dut,
                "attenuator reset",
                attenuator::set_attenuation(self.local_runner.as_ref(), 0, &ws.attenuator),
            );
        }

        if let Some(host) = acquired.iperf_daemon.take() {
            best_effort(dut, "iperf daemon stop", iperf::stop_server(runner, &host, user, ws.remote_dir(&host)));
        }
    }
}
