//! AutoJoin: repeated Wi-Fi power cycles, timing each rejoin.
//!
//! Each round turns the radio off and on, then polls the link until the
//! DUT has actually re-associated. A round that never re-associates
//! within the window counts as failed; any failed round fails the test.

use std::thread;
use std::time::{Duration, Instant};

use faraday_remote::wlan;
use tracing::{error, info, warn};

use crate::console;

use super::{associate_with_retries, TestContext, TestError, TrafficTest};

/// How long a rejoin may take before the round is declared dead.
const REJOIN_WINDOW: Duration = Duration::from_secs(30);
const REJOIN_POLL: Duration = Duration::from_secs(1);

pub struct AutoJoin;

impl TrafficTest for AutoJoin {
    fn run(&self, ctx: &TestContext<'_>) -> Result<(), TestError> {
        ctx.barrier.wait()?;

        console::step(&format!(
            "[{}] AutoJoin: initial association to '{}'",
            ctx.dut,
            ctx.row.param_or("ap_wifi_ssid", "")
        ));
        associate_with_retries(ctx, 1)?;

        let rounds = ctx.row.param_num("join_attempts", 5u32);
        let interval = Duration::from_secs(ctx.row.param_num("join_on_off_interval", 2u64));
        let mut failed = 0u32;

        for round in 1..=rounds {
            console::step(&format!("[{}] AutoJoin round {round}/{rounds}", ctx.dut));

            if let Err(e) = wlan::wifi_off(ctx.runner, ctx.dut, ctx.user(), ctx.dut_log_dir()) {
                warn!(dut = ctx.dut, round, error = %e, "wifi off failed");
            }
            thread::sleep(interval);
            if let Err(e) = wlan::wifi_on(ctx.runner, ctx.dut, ctx.user(), ctx.dut_log_dir()) {
                warn!(dut = ctx.dut, round, error = %e, "wifi on failed");
            }
            thread::sleep(interval);

            match self.time_rejoin(ctx) {
                Some(latency) => {
                    info!(
                        dut = ctx.dut,
                        round,
                        latency_ms = latency.as_millis() as u64,
                        "rejoin observed"
                    );
                }
                None => {
                    failed += 1;
                    error!(dut = ctx.dut, round, "no rejoin within window");
                }
            }
        }

        if failed > 0 {
            return Err(TestError::Rejoin { failed, rounds });
        }
        info!(dut = ctx.dut, rounds, "autojoin complete");
        Ok(())
    }
}

impl AutoJoin {
    /// Poll the link until it reports associated; `None` when the window
    /// elapses first.
    fn time_rejoin(&self, ctx: &TestContext<'_>) -> Option<Duration> {
        let start = Instant::now();
        while start.elapsed() < REJOIN_WINDOW {
            match wlan::link_status(
                ctx.runner,
                ctx.dut,
                ctx.user(),
                ctx.row.wifi_interface(),
                ctx.dut_log_dir(),
            ) {
                Ok(status) if wlan::is_associated(&status) => return Some(start.elapsed()),
                Ok(_) => {}
                Err(e) => warn!(dut = ctx.dut, error = %e, "link status probe failed"),
            }
            thread::sleep(REJOIN_POLL);
        }
        None
    }
}
