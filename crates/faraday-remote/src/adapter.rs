//! Typed adapter outcomes.
//!
//! Every hardware-control operation returns `Result<_, AdapterError>` with
//! a severity attached, so the worker state machine applies one uniform
//! best-effort policy instead of per-call handling.

use thiserror::Error;

use crate::exec::{CmdOutput, CommandRunner, ExecError};
use std::path::Path;

/// How bad an adapter failure is for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The device said no; the step can be skipped and the run continues.
    Recoverable,
    /// The transport itself is broken; later steps to this host will
    /// almost certainly fail too.
    Fatal,
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{op} on {host}: transport failure: {source}")]
    Transport {
        op: &'static str,
        host: String,
        #[source]
        source: ExecError,
    },
    #[error("{op} on {host} returned status {status}: {stderr}")]
    Failed {
        op: &'static str,
        host: String,
        status: i32,
        stderr: String,
    },
    #[error("{op} on {host} timed out")]
    Timeout { op: &'static str, host: String },
}

impl AdapterError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Transport { .. } => Severity::Fatal,
            Self::Failed { .. } | Self::Timeout { .. } => Severity::Recoverable,
        }
    }
}

/// Run one named operation and fold the result contract:
/// transport error, timeout, or nonzero status all become `AdapterError`.
pub(crate) fn checked(
    runner: &dyn CommandRunner,
    op: &'static str,
    host: &str,
    user: &str,
    cmd: &str,
    log_dir: &Path,
) -> Result<CmdOutput, AdapterError> {
    let out = runner
        .run(host, user, cmd, log_dir)
        .map_err(|source| AdapterError::Transport {
            op,
            host: host.to_string(),
            source,
        })?;
    if out.timed_out {
        return Err(AdapterError::Timeout {
            op,
            host: host.to_string(),
        });
    }
    if out.status != 0 {
        return Err(AdapterError::Failed {
            op,
            host: host.to_string(),
            status: out.status,
            stderr: out.stderr.trim().to_string(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingRunner;

    #[test]
    fn severity_classification() {
        let failed = AdapterError::Failed {
            op: "wifi on",
            host: "h".into(),
            status: 1,
            stderr: String::new(),
        };
        assert_eq!(failed.severity(), Severity::Recoverable);

        let transport = AdapterError::Transport {
            op: "wifi on",
            host: "h".into(),
            source: ExecError::Spawn {
                cmd: "ssh".into(),
                source: std::io::Error::other("boom"),
            },
        };
        assert_eq!(transport.severity(), Severity::Fatal);
    }

    #[test]
    fn checked_maps_nonzero_status() {
        let runner = RecordingRunner::new();
        runner.respond("false-cmd", 2, "", "denied");
        let err = checked(
            &runner,
            "probe",
            "10.0.0.5",
            "root",
            "false-cmd",
            Path::new("/tmp"),
        )
        .unwrap_err();
        assert!(matches!(err, AdapterError::Failed { status: 2, .. }));
    }
}
