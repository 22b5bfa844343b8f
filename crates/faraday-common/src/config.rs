//! The harness configuration document.
//!
//! One TOML file carries the four logical sections the lab maintains:
//! execution flags, the capture-device pool, per-channel capture tuning,
//! and the test-plan table. Loaded once at startup and shared read-only.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::plan::TestCaseRow;

/// Process-wide feature toggles, shared read-only by all workers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalFlags {
    pub enable_attenuator: bool,
    pub enable_sniffer: bool,
    pub enable_tcpdump: bool,
    pub diag_mode: DiagMode,
    pub log_root: PathBuf,
    /// Upper bound on any single rendezvous phase. Must exceed the longest
    /// traffic run between two phases or healthy rows will poison themselves.
    pub phase_timeout_secs: u64,
}

impl Default for GlobalFlags {
    fn default() -> Self {
        Self {
            enable_attenuator: false,
            enable_sniffer: false,
            enable_tcpdump: false,
            diag_mode: DiagMode::Off,
            log_root: PathBuf::from("logs"),
            phase_timeout_secs: 600,
        }
    }
}

/// Which diagnostic bundle to collect before and after the test body.
/// The two collection variants are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum DiagMode {
    #[default]
    Off,
    Sysdiagnose,
    LogArchive,
}

impl FromStr for DiagMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "off" | "none" => Ok(Self::Off),
            "sysdiagnose" => Ok(Self::Sysdiagnose),
            "logarchive" => Ok(Self::LogArchive),
            other => Err(ConfigError::UnknownDiagMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for DiagMode {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// One capture device in the fixed sniffer pool.
#[derive(Debug, Clone, Deserialize)]
pub struct SnifferDevice {
    pub name: String,
    pub host: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub ifname: String,
}

/// Per-channel capture tuning, keyed by channel label in the config.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelParams {
    pub freq_mhz: u32,
    pub bandwidth_mhz: u32,
    pub band: String,
    #[serde(default)]
    pub passive: bool,
}

impl ChannelParams {
    /// Render the capture-tool argument string for this channel.
    pub fn capture_args(&self) -> String {
        let mut args = format!(
            "--freq {} --bw {} --band {}",
            self.freq_mhz, self.bandwidth_mhz, self.band
        );
        if self.passive {
            args.push_str(" --passive");
        }
        args
    }
}

/// The whole configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub flags: GlobalFlags,
    #[serde(default, rename = "sniffer")]
    pub sniffers: Vec<SnifferDevice>,
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelParams>,
    #[serde(default, rename = "test")]
    pub tests: Vec<TestCaseRow>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject rows that would only fail later inside a worker thread.
    fn validate(&self) -> Result<(), ConfigError> {
        for row in &self.tests {
            if row.skip {
                continue;
            }
            if row.duts.iter().all(|d| d.trim().is_empty()) {
                return Err(ConfigError::EmptyDutList(row.name.clone()));
            }
            if let Some(dir) = row.param("TrafficDirection") {
                dir.parse::<crate::plan::TrafficDirection>()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[flags]
enable_attenuator = true
enable_sniffer = true
diag_mode = "logarchive"
log_root = "run_logs"

[[sniffer]]
name = "sn1"
host = "10.0.1.20"
user = "root"
ifname = "wlan1"

[channels.ch36]
freq_mhz = 5180
bandwidth_mhz = 80
band = "5g"

[channels.ch149]
freq_mhz = 5745
bandwidth_mhz = 80
band = "5g"
passive = true

[[test]]
name = "Join_basic"
traffic = "join"
duts = ["10.0.0.5", "10.0.0.6"]

[test.params]
ap_wifi_ssid = "LabAP"
ap_wifi_pwd = "secret"
"#;

    #[test]
    fn loads_a_full_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(config.flags.enable_attenuator);
        assert_eq!(config.flags.diag_mode, DiagMode::LogArchive);
        assert_eq!(config.sniffers.len(), 1);
        assert_eq!(config.channels["ch36"].freq_mhz, 5180);
        assert_eq!(config.tests.len(), 1);
        assert_eq!(config.tests[0].duts.len(), 2);
        assert_eq!(config.tests[0].param("ap_wifi_ssid"), Some("LabAP"));
    }

    #[test]
    fn unknown_traffic_type_fails_at_load() {
        let doc = r#"
[[test]]
name = "bad"
traffic = "quantum"
duts = ["10.0.0.5"]
"#;
        let err = toml::from_str::<Config>(doc).unwrap_err();
        assert!(err.to_string().contains("unknown traffic type"));
    }

    #[test]
    fn empty_dut_list_is_rejected() {
        let doc = r#"
[[test]]
name = "empty"
traffic = "idle"
duts = []
"#;
        let config: Config = toml::from_str(doc).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyDutList(name)) if name == "empty"
        ));
    }

    #[test]
    fn bad_direction_is_rejected_at_load() {
        let doc = r#"
[[test]]
name = "dir"
traffic = "tcp"
duts = ["10.0.0.5"]

[test.params]
TrafficDirection = "SIDEWAYS"
"#;
        let config: Config = toml::from_str(doc).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownDirection(_))
        ));
    }

    #[test]
    fn passive_channel_renders_capture_args() {
        let ch = ChannelParams {
            freq_mhz: 5745,
            bandwidth_mhz: 80,
            band: "5g".into(),
            passive: true,
        };
        assert_eq!(ch.capture_args(), "--freq 5745 --bw 80 --band 5g --passive");
    }
}
