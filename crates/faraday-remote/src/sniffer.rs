//! Dedicated capture devices parked on fixed Wi-Fi channels.

use std::path::Path;

use faraday_common::SnifferDevice;
use tracing::info;

use crate::adapter::{checked, AdapterError};
use crate::exec::CommandRunner;

/// Start a capture on `device` and return the remote pcap path.
pub fn start(
    runner: &dyn CommandRunner,
    device: &SnifferDevice,
    channel_args: &str,
    log_dir: &Path,
) -> Result<String, AdapterError> {
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let remote_pcap = format!("/tmp/sniffer_{ts}.pcap");
    let cmd = format!(
        "nohup sniffer_tool --iface {} {channel_args} -o {remote_pcap} > /dev/null 2>&1 &",
        device.ifname
    );
    checked(runner, "sniffer start", &device.host, &device.user, &cmd, log_dir)?;
    info!(device = %device.name, host = %device.host, pcap = %remote_pcap, "sniffer started");
    Ok(remote_pcap)
}

/// Stop every capture process on the device; SIGINT lets the tool flush.
pub fn stop(
    runner: &dyn CommandRunner,
    device: &SnifferDevice,
    log_dir: &Path,
) -> Result<(), AdapterError> {
    checked(
        runner,
        "sniffer stop",
        &device.host,
        &device.user,
        "pkill -SIGINT -f sniffer_tool",
        log_dir,
    )?;
    info!(device = %device.name, "sniffer stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingRunner;

    fn device() -> SnifferDevice {
        SnifferDevice {
            name: "sn1".into(),
            host: "10.0.1.20".into(),
            user: "root".into(),
            password: String::new(),
            ifname: "wlan1".into(),
        }
    }

    #[test]
    fn start_targets_the_device_interface() {
        let runner = RecordingRunner::new();
        let pcap = start(&runner, &device(), "--freq 5180 --bw 80 --band 5g", Path::new("/tmp"))
            .unwrap();
        assert!(pcap.starts_with("/tmp/sniffer_"));
        let call = &runner.calls()[0];
        assert_eq!(call.host, "10.0.1.20");
        assert!(call.cmd.contains("--iface wlan1"));
        assert!(call.cmd.contains("--freq 5180"));
    }
}
