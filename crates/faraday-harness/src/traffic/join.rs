//! Join: one-shot forget-network plus timed association.

use faraday_remote::wlan;
use tracing::{info, warn};

use crate::console;

use super::{associate_with_retries, TestContext, TestError, TrafficTest};

pub struct Join;

impl TrafficTest for Join {
    fn run(&self, ctx: &TestContext<'_>) -> Result<(), TestError> {
        console::step(&format!("[{}] Join: aligning with row siblings", ctx.dut));
        ctx.barrier.wait()?;

        if let Err(e) = wlan::forget_all(ctx.runner, ctx.dut, ctx.user(), ctx.dut_log_dir()) {
            warn!(dut = ctx.dut, error = %e, "forget networks failed, joining anyway");
        }

        let attempts = ctx.row.param_num("join_attempts", 1u32);
        let latency = associate_with_retries(ctx, attempts)?;
        console::info(&format!(
            "[{}] joined '{}' in {:.2}s",
            ctx.dut,
            ctx.row.param_or("ap_wifi_ssid", ""),
            latency.as_secs_f64()
        ));
        info!(dut = ctx.dut, latency_ms = latency.as_millis() as u64, "join complete");
        Ok(())
    }
}
