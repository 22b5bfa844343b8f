//! RvR: rate-vs-range, a throughput sweep over programmed attenuation.
//!
//! At each point: apply the level, rendezvous, run a fixed-duration
//! session, tear the servers down, move on. Traffic failures at one
//! point log and continue; losing a row sibling aborts the sweep. The
//! attenuator always returns to 0 dB at the end.

use faraday_remote::{attenuator, iperf, wlan};
use tracing::{error, info, warn};

use crate::console;

use super::{associate_with_retries, run_session, TestContext, TestError, TrafficTest};

pub struct Rvr;

impl TrafficTest for Rvr {
    fn run(&self, ctx: &TestContext<'_>) -> Result<(), TestError> {
        ctx.barrier.wait()?;

        if let Err(e) = wlan::forget_all(ctx.runner, ctx.dut, ctx.user(), ctx.dut_log_dir()) {
            warn!(dut = ctx.dut, error = %e, "forget networks failed");
        }
        associate_with_retries(ctx, 3)?;

        let start = ctx.row.param_num("start_attn_1", 0i32);
        let stop = ctx.row.param_num("stop_attn_1", 0i32);
        let step = ctx.row.param_num("attn_step_dB", 1i32).max(1);
        let points = sweep_points(start, stop, step);

        let udp = ctx
            .row
            .param_or("rvr_protocol", "TCP")
            .eq_ignore_ascii_case("udp");
        let bandwidth = udp.then(|| ctx.row.param_or("UDPBW", "10M").to_string());
        let port = iperf::port_for(ctx.dut, iperf::RVR_PORT_BASE);
        let secs = ctx.row.param_num("test_cycle_count", 30u32);

        info!(dut = ctx.dut, ?points, port, udp, "starting rvr sweep");
        let mut sweep_result: Result<(), TestError> = Ok(());
        for level in &points {
            console::step(&format!("[{}] RvR point: {level} dB", ctx.dut));
            if ctx.flags.enable_attenuator {
                if let Err(e) =
                    attenuator::set_attenuation(ctx.local_runner, *level, &ctx.workspace.attenuator)
                {
                    warn!(dut = ctx.dut, level, error = %e, "attenuation set failed");
                }
            }

            if let Err(e) = ctx.barrier.wait() {
                sweep_result = Err(e.into());
                break;
            }

            match run_session(ctx, port, secs, bandwidth.as_deref()) {
                Ok(()) => info!(dut = ctx.dut, level, "rvr point complete"),
                // A lost sibling ends the sweep; a failed session is just
                // a bad data point.
                Err(TestError::Sync(e)) => {
                    sweep_result = Err(e.into());
                    break;
                }
                Err(e) => {
                    error!(dut = ctx.dut, level, error = %e, "rvr point failed, continuing");
                }
            }
        }

        if ctx.flags.enable_attenuator {
            match attenuator::set_attenuation(ctx.local_runner, 0, &ctx.workspace.attenuator) {
                Ok(_) => console::step(&format!("[{}] attenuator reset to 0 dB", ctx.dut)),
                Err(e) => error!(dut = ctx.dut, error = %e, "attenuator reset failed"),
            }
        }

        sweep_result?;
        info!(dut = ctx.dut, "rvr sweep complete");
        Ok(())
    }
}

/// Inclusive sweep points: start, start+step, ... up to and including stop.
fn sweep_points(start: i32, stop: i32, step: i32) -> Vec<i32> {
    let mut points = Vec::new();
    let mut level = start;
    while level <= stop {
        points.push(level);
        level += step;
    }
    if points.is_empty() {
        points.push(start);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::sweep_points;

    #[test]
    fn sweep_is_inclusive_of_the_stop_level() {
        assert_eq!(sweep_points(0, 6, 2), vec![0, 2, 4, 6]);
        assert_eq!(sweep_points(0, 5, 2), vec![0, 2, 4]);
        assert_eq!(sweep_points(0, 0, 1), vec![0]);
    }

    #[test]
    fn inverted_range_still_yields_the_start_point() {
        assert_eq!(sweep_points(10, 0, 2), vec![10]);
    }
}
