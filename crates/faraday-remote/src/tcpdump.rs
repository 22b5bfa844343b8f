//! Packet-trace capture on the DUT's own traffic interface.

use std::path::Path;

use tracing::info;

use crate::adapter::{checked, AdapterError};
use crate::exec::CommandRunner;

/// Start tcpdump on the DUT; returns the remote pcap path.
pub fn start(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    interface: &str,
    log_dir: &Path,
) -> Result<String, AdapterError> {
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let remote_pcap = format!("/tmp/tcpdump_{ts}.pcap");
    let cmd = format!("nohup tcpdump -i {interface} -w {remote_pcap} > /dev/null 2>&1 &");
    checked(runner, "tcpdump start", host, user, &cmd, log_dir)?;
    info!(host, interface, pcap = %remote_pcap, "tcpdump started");
    Ok(remote_pcap)
}

pub fn stop(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    log_dir: &Path,
) -> Result<(), AdapterError> {
    checked(runner, "tcpdump stop", host, user, "pkill -SIGINT -f tcpdump", log_dir)?;
    info!(host, "tcpdump stopped");
    Ok(())
}
