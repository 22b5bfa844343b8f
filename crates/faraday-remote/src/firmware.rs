//! Wi-Fi firmware log collection on the DUT.
//!
//! The vendor tooling writes `.logarchive` bundles under a fixed firmware
//! log directory; the stop operation also pulls the bundles back into the
//! DUT's `common/` output dir.

use std::path::Path;

use tracing::{info, warn};

use crate::adapter::{checked, AdapterError};
use crate::exec::CommandRunner;

const FW_LOG_DIR: &str = "/var/log/wifi_fw";

pub fn clean(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    log_dir: &Path,
) -> Result<(), AdapterError> {
    let cmd = format!("rm -rf {FW_LOG_DIR}/*");
    checked(runner, "firmware log clean", host, user, &cmd, log_dir)?;
    Ok(())
}

pub fn start(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    log_dir: &Path,
) -> Result<(), AdapterError> {
    let cmd = format!("log collect --start --output {FW_LOG_DIR}/fw_start.logarchive");
    checked(runner, "firmware log start", host, user, &cmd, log_dir)?;
    info!(host, "firmware logging started");
    Ok(())
}

/// Stop collection and copy the bundles into `local_dir`.
pub fn stop_and_pull(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    local_dir: &Path,
) -> Result<(), AdapterError> {
    let stop_cmd = format!("log collect --stop --output {FW_LOG_DIR}/fw_stop.logarchive");
    checked(runner, "firmware log stop", host, user, &stop_cmd, local_dir)?;

    let glob = format!("{FW_LOG_DIR}/*.logarchive");
    match runner.fetch(host, user, &glob, local_dir) {
        Ok(out) if out.success() => {
            info!(host, dir = %local_dir.display(), "firmware logs pulled");
            Ok(())
        }
        Ok(out) => {
            warn!(host, status = out.status, "firmware log pull returned nonzero");
            Err(AdapterError::Failed {
                op: "firmware log pull",
                host: host.to_string(),
                status: out.status,
                stderr: out.stderr.trim().to_string(),
            })
        }
        Err(source) => Err(AdapterError::Transport {
            op: "firmware log pull",
            host: host.to_string(),
            source,
        }),
    }
}
