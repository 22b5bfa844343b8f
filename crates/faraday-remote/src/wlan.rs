//! Wi-Fi association and radio control on the DUT.

use std::path::Path;

use crate::adapter::{checked, AdapterError};
use crate::exec::{CmdOutput, CommandRunner};

pub fn wifi_on(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    log_dir: &Path,
) -> Result<CmdOutput, AdapterError> {
    checked(runner, "wifi on", host, user, "nmcli radio wifi on", log_dir)
}

pub fn wifi_off(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    log_dir: &Path,
) -> Result<CmdOutput, AdapterError> {
    checked(runner, "wifi off", host, user, "nmcli radio wifi off", log_dir)
}

/// Associate to an AP. nmcli derives the security mode from the scan
/// results, so WPA2/WPA3 rows need no extra arguments.
pub fn associate(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    ssid: &str,
    password: &str,
    interface: &str,
    log_dir: &Path,
) -> Result<CmdOutput, AdapterError> {
    let cmd = format!("nmcli dev wifi connect '{ssid}' password '{password}' ifname {interface}");
    checked(runner, "associate", host, user, &cmd, log_dir)
}

/// Drop every saved network profile on the DUT.
pub fn forget_all(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    log_dir: &Path,
) -> Result<CmdOutput, AdapterError> {
    checked(
        runner,
        "forget networks",
        host,
        user,
        "nmcli connection delete id '*'",
        log_dir,
    )
}

pub fn clear_scan_cache(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    interface: &str,
    log_dir: &Path,
) -> Result<CmdOutput, AdapterError> {
    let cmd = format!("sudo rm -rf /var/lib/wpa_supplicant/{interface}/*");
    checked(runner, "clear scan cache", host, user, &cmd, log_dir)
}

/// Raw `iw` link output; empty when the interface is down.
pub fn link_status(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    interface: &str,
    log_dir: &Path,
) -> Result<String, AdapterError> {
    let cmd = format!("iw dev {interface} link");
    let out = checked(runner, "link status", host, user, &cmd, log_dir)?;
    Ok(out.stdout.trim().to_string())
}

/// `iw` reports "Connected to <bssid>" on an associated link.
pub fn is_associated(status: &str) -> bool {
    status.contains("Connected to")
}

pub fn disable_lmac_throttling(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    interface: &str,
    log_dir: &Path,
) -> Result<CmdOutput, AdapterError> {
    let cmd = format!("sudo iwpriv {interface} set LMAC_EN_CAP=0");
    checked(runner, "disable lmac throttling", host, user, &cmd, log_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingRunner;

    #[test]
    fn associate_builds_the_nmcli_command() {
        let runner = RecordingRunner::new();
        associate(
            &runner,
            "10.0.0.5",
            "root",
            "LabAP",
            "secret",
            "wlan0",
            Path::new("/tmp"),
        )
        .unwrap();
        let calls = runner.calls();
        assert_eq!(
            calls[0].cmd,
            "nmcli dev wifi connect 'LabAP' password 'secret' ifname wlan0"
        );
    }

    #[test]
    fn associated_link_detection() {
        assert!(is_associated("Connected to aa:bb:cc:dd:ee:ff (on wlan0)"));
        assert!(!is_associated("Not connected."));
        assert!(!is_associated(""));
    }
}
