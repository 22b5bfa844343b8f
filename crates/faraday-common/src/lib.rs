//! Shared configuration model for the Faraday Wi-Fi test harness.
//!
//! This crate contains:
//! - **Global flags** — feature toggles and paths shared read-only by every worker
//! - **Test plan rows** — one entry per test case, with traffic type, DUT list and
//!   free-form parameters
//! - **Sniffer pool descriptors** — capture devices and per-channel tuning
//! - **The TOML loader** — validates traffic types and directions at load time so
//!   an unknown tag never reaches dispatch

pub mod config;
pub mod error;
pub mod plan;

pub use config::{ChannelParams, Config, DiagMode, GlobalFlags, SnifferDevice};
pub use error::ConfigError;
pub use plan::{TestCaseRow, TrafficDirection, TrafficType};
