//! Idle: associate, then hold the link with no traffic.

use std::thread;
use std::time::Duration;

use faraday_remote::wlan;
use tracing::{info, warn};

use crate::console;

use super::{associate_with_retries, TestContext, TestError, TrafficTest};

pub struct Idle;

impl TrafficTest for Idle {
    fn run(&self, ctx: &TestContext<'_>) -> Result<(), TestError> {
        ctx.barrier.wait()?;

        let attempts = ctx.row.param_num("join_attempts", 3u32);
        associate_with_retries(ctx, attempts)?;

        if let Err(e) = wlan::disable_lmac_throttling(
            ctx.runner,
            ctx.dut,
            ctx.user(),
            ctx.row.wifi_interface(),
            ctx.dut_log_dir(),
        ) {
            warn!(dut = ctx.dut, error = %e, "lmac throttling disable failed");
        }

        let duration = ctx.row.param_num("test_cycle_count", 30u64);
        console::step(&format!("[{}] idle for {duration}s", ctx.dut));
        info!(dut = ctx.dut, duration, "holding idle link");
        thread::sleep(Duration::from_secs(duration));
        Ok(())
    }
}
