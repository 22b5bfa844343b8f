//! Test plan rows and the closed traffic-type / direction tags.
//!
//! Traffic types are a closed enum resolved while the plan is loaded, so a
//! typo in the plan fails the run up front instead of blowing up inside a
//! worker thread hours later.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// The traffic-specific test logic selected by a plan row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum TrafficType {
    Join,
    AutoJoin,
    Idle,
    Tcp,
    Udp,
    Rvr,
}

impl FromStr for TrafficType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "join" => Ok(Self::Join),
            "autojoin" => Ok(Self::AutoJoin),
            "idle" => Ok(Self::Idle),
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            "rvr" => Ok(Self::Rvr),
            other => Err(ConfigError::UnknownTrafficType(other.to_string())),
        }
    }
}

impl TryFrom<String> for TrafficType {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for TrafficType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Join => "Join",
            Self::AutoJoin => "AutoJoin",
            Self::Idle => "Idle",
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Rvr => "RvR",
        };
        f.write_str(name)
    }
}

/// Who serves and who drives traffic during a throughput run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrafficDirection {
    /// DUT is the iperf server, remote peers are clients.
    Uplink,
    /// Remote peers serve, DUT is the client.
    #[default]
    Downlink,
    /// Remote peers serve, DUT runs a bidirectional session.
    Bidir,
}

impl FromStr for TrafficDirection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UL" => Ok(Self::Uplink),
            "DL" => Ok(Self::Downlink),
            "BIDIR" => Ok(Self::Bidir),
            other => Err(ConfigError::UnknownDirection(other.to_string())),
        }
    }
}

/// One row of the test plan. Immutable once loaded; each worker reads the
/// row for the DUT it owns and nothing else.
#[derive(Debug, Clone, Deserialize)]
pub struct TestCaseRow {
    pub name: String,
    pub traffic: TrafficType,
    #[serde(default)]
    pub skip: bool,
    pub duts: Vec<String>,
    #[serde(default)]
    pub remotes: Vec<String>,
    /// Free-form named parameters consumed by the traffic strategies
    /// (SSID, password, durations, attenuation range, ...).
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl TestCaseRow {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(|s| s.trim())
    }

    pub fn param_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.param(key).filter(|s| !s.is_empty()).unwrap_or(default)
    }

    /// Numeric parameter with a fallback; unparsable values fall back too.
    pub fn param_num<T: FromStr + Copy>(&self, key: &str, default: T) -> T {
        self.param(key)
            .and_then(|s| s.parse().ok())
            .unwrap_or(default)
    }

    /// The remote user for every SSH command this row issues.
    pub fn user(&self) -> &str {
        self.param_or("User", "root")
    }

    pub fn wifi_interface(&self) -> &str {
        self.param_or("dut_wifi_interface", "wlan0")
    }

    pub fn direction(&self) -> TrafficDirection {
        self.param("TrafficDirection")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Capture channels requested by this row, in pool-assignment order.
    pub fn sniffer_channels(&self) -> Vec<String> {
        self.param("sniffer_channels")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traffic_type_is_case_insensitive() {
        assert_eq!("RVR".parse::<TrafficType>().unwrap(), TrafficType::Rvr);
        assert_eq!("tcp".parse::<TrafficType>().unwrap(), TrafficType::Tcp);
        assert_eq!(
            "AutoJoin".parse::<TrafficType>().unwrap(),
            TrafficType::AutoJoin
        );
    }

    #[test]
    fn unknown_traffic_type_is_rejected() {
        let err = "warp".parse::<TrafficType>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTrafficType(t) if t == "warp"));
    }

    #[test]
    fn direction_defaults_to_downlink() {
        let row = TestCaseRow {
            name: "t".into(),
            traffic: TrafficType::Tcp,
            skip: false,
            duts: vec!["10.0.0.5".into()],
            remotes: vec![],
            params: BTreeMap::new(),
        };
        assert_eq!(row.direction(), TrafficDirection::Downlink);
    }

    #[test]
    fn sniffer_channels_split_and_trim() {
        let mut params = BTreeMap::new();
        params.insert("sniffer_channels".into(), "ch36, ch149 ,".into());
        let row = TestCaseRow {
            name: "t".into(),
            traffic: TrafficType::Join,
            skip: false,
            duts: vec!["d".into()],
            remotes: vec![],
            params,
        };
        assert_eq!(row.sniffer_channels(), vec!["ch36", "ch149"]);
    }
}
