//! Remote command execution and hardware-control adapters.
//!
//! Everything the harness does to a device goes through one seam: the
//! [`exec::CommandRunner`] trait. The production implementations shell out
//! to `ssh`/`scp` (key-based auth assumed) or run locally; tests swap in
//! [`recording::RecordingRunner`] to script results and inspect the exact
//! command transcript.
//!
//! The adapter modules are thin named operations over that seam — one per
//! hardware concern: Wi-Fi association, attenuator, sniffer, tcpdump,
//! firmware logging, diagnostic bundles, iperf throughput.

pub mod adapter;
pub mod attenuator;
pub mod diag;
pub mod exec;
pub mod firmware;
pub mod iperf;
pub mod recording;
pub mod sniffer;
pub mod tcpdump;
pub mod wlan;

pub use adapter::{AdapterError, Severity};
pub use exec::{CmdOutput, CommandRunner, ExecError, LocalRunner, SshRunner};
pub use recording::RecordingRunner;
