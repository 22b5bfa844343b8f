//! TCP/UDP throughput via iperf3, in one of three directions.
//!
//! Port assignment is per-DUT (base + trailing octet mod 100) so the
//! DUTs of one row can run sessions concurrently without colliding.

use faraday_remote::{iperf, wlan};
use tracing::{info, warn};

use crate::console;

use super::{associate_with_retries, TestContext, TestError, TrafficTest};
use faraday_common::TrafficDirection;

pub struct Throughput {
    pub udp: bool,
}

impl TrafficTest for Throughput {
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

        let base = if self.udp {
            iperf::UDP_PORT_BASE
        } else {
            iperf::TCP_PORT_BASE
        };
        let port = iperf::port_for(ctx.dut, base);
        let secs = ctx.row.param_num("test_cycle_count", 30u32);
        let bandwidth = self.udp.then(|| ctx.row.param_or("UDPBW", "10M").to_string());

        console::step(&format!(
            "[{}] {} traffic, {:?}, port {port}, {secs}s",
            ctx.dut,
            if self.udp { "UDP" } else { "TCP" },
            ctx.row.direction(),
        ));
        run_session(ctx, port, secs, bandwidth.as_deref())?;
        info!(dut = ctx.dut, port, "throughput session complete");
        Ok(())
    }
}

/// One directional iperf session. Shared with the RvR sweep.
///
/// Phase discipline: downlink and bidirectional runs hold exactly one
/// extra rendezvous between "servers listening" and "clients start", and
/// that phase happens even when server setup failed, so every DUT in the
/// row stays generation-aligned.
pub(crate) fn run_session(
    ctx: &TestContext<'_>,
    port: u16,
    secs: u32,
    udp_bandwidth: Option<&str>,
) -> Result<(), TestError> {
    let user = ctx.user();
    match ctx.row.direction() {
        TrafficDirection::Uplink => {
            // DUT serves; remote peers drive traffic towards it.
            let mut result = match iperf::start_server(ctx.runner, ctx.dut, user, port, ctx.dut_log_dir()) {
                Ok(()) => Ok(()),
                Err(e) => Err(TestError::from(e)),
            };
            if result.is_ok() {
                for remote in ctx.remotes {
                    if let Err(e) = iperf::run_client(
                        ctx.runner,
                        remote,
                        user,
                        ctx.dut,
                        port,
                        secs,
                        udp_bandwidth,
                        false,
                        ctx.workspace.remote_dir(remote),
                    ) {
                        result = Err(e.into());
                        break;
                    }
                }
            }
            if let Err(e) = iperf::stop_server(ctx.runner, ctx.dut, user, ctx.dut_log_dir()) {
                warn!(dut = ctx.dut, error = %e, "iperf server stop failed");
            }
            result
        }
        direction @ (TrafficDirection::Downlink | TrafficDirection::Bidir) => {
            let bidir = direction == TrafficDirection::Bidir;
            let mut started = Vec::new();
            let mut result: Result<(), TestError> = Ok(());
            for remote in ctx.remotes {
                match iperf::start_server(ctx.runner, remote, user, port, ctx.workspace.remote_dir(remote)) {
                    Ok(()) => started.push(remote.as_str()),
                    Err(e) => {
                        result = Err(e.into());
                        break;
                    }
                }
            }

            // Servers confirmed (or not) — align client start across DUTs.
            match ctx.barrier.wait() {
                Ok(_) => {
                    if result.is_ok() {
                        for remote in ctx.remotes {
                            if let Err(e) = iperf::run_client(
                                ctx.runner,
                                ctx.dut,
                                user,
                                remote,
                                port,
                                secs,
                                udp_bandwidth,
                                bidir,
                                ctx.dut_log_dir(),
                            ) {
                                result = Err(e.into());
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    if result.is_ok() {
                        result = Err(e.into());
                    }
                }
            }

            for remote in started {
                if let Err(e) =
                    iperf::stop_server(ctx.runner, remote, user, ctx.workspace.remote_dir(remote))
                {
                    warn!(remote, error = %e, "iperf server stop failed");
                }
            }
            result
        }
    }
}
