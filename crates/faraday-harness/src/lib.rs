//! Per-DUT test-execution core for the Faraday Wi-Fi harness.
//!
//! This crate contains:
//! - **Rendezvous barrier** — multi-party phase alignment with a bounded
//!   wait and group poisoning, so one dead worker never hangs its row
//! - **Sniffer pool** — lease-based checkout of capture devices
//! - **Per-DUT worker** — the seven-state lifecycle with unconditional
//!   teardown and a single best-effort policy for adapter failures
//! - **Traffic strategies** — Join, AutoJoin, Idle, TCP, UDP and RvR
//!   behind one closed-enum dispatch
//! - **Driver** — spawns one thread per DUT per row, joins every handle
//!   and folds the outcomes into a run summary that drives the exit code

pub mod archive;
pub mod barrier;
pub mod console;
pub mod driver;
pub mod pool;
pub mod traffic;
pub mod worker;
pub mod workspace;

pub use barrier::{Rendezvous, SyncError};
pub use driver::{run_plan, DriverError, RunSummary};
pub use pool::{SnifferLease, SnifferPool};
pub use worker::{Worker, WorkerResult};
pub use workspace::DutWorkspace;
