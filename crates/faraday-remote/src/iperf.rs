//! iperf3 throughput sessions and per-DUT port assignment.

use std::path::Path;

use tracing::info;

use crate::adapter::{checked, AdapterError};
use crate::exec::{CmdOutput, CommandRunner};

/// Port-range bases, one 100-wide window per traffic type so concurrent
/// rows of different types never contend.
pub const TCP_PORT_BASE: u16 = 5200;
pub const UDP_PORT_BASE: u16 = 5300;
pub const RVR_PORT_BASE: u16 = 5400;

/// Pure per-DUT port assignment: base plus the DUT's trailing address
/// octet mod 100. Two DUTs with different trailing octets (mod 100) never
/// collide within one protocol's window.
pub fn port_for(dut: &str, base: u16) -> u16 {
    let octet = dut
        .rsplit('.')
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);
    base + octet % 100
}

/// Start an iperf3 server pinned to `port`, daemonized.
pub fn start_server(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    port: u16,
    log_dir: &Path,
) -> Result<(), AdapterError> {
    let cmd = format!("iperf3 -s -p {port} -D");
    checked(runner, "iperf server start", host, user, &cmd, log_dir)?;
    info!(host, port, "iperf3 server started");
    Ok(())
}

/// Plain daemonized server on the default port (worker state 3f).
pub fn server_daemon(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    log_dir: &Path,
) -> Result<(), AdapterError> {
    checked(runner, "iperf daemon", host, user, "iperf3 -s -D", log_dir)?;
    info!(host, "iperf3 daemon started");
    Ok(())
}

pub fn stop_server(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    log_dir: &Path,
) -> Result<(), AdapterError> {
    checked(runner, "iperf server stop", host, user, "pkill iperf3", log_dir)?;
    Ok(())
}

/// Blocking client session from `host` towards `target`. The ssh call
/// returns when the session ends, so callers need no extra grace sleeps.
#[allow(clippy::too_many_arguments)]
pub fn run_client(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    target: &str,
    port: u16,
    secs: u32,
    udp_bandwidth: Option<&str>,
    bidir: bool,
    log_dir: &Path,
) -> Result<CmdOutput, AdapterError> {
    let mut cmd = format!("iperf3 -c {target} -p {port} -t {secs}");
    if let Some(bw) = udp_bandwidth {
        cmd.push_str(&format!(" -u -b {bw}"));
    }
    if bidir {
        cmd.push_str(" --bidir");
    }
    let out = checked(runner, "iperf client", host, user, &cmd, log_dir)?;
    info!(host, target, port, secs, "iperf3 client finished");
    Ok(out)
}
