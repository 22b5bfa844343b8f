//! Diagnostic-bundle collection on the DUT.
//!
//! Two mutually exclusive variants: a full `sysdiagnose` dump or a plain
//! log archive (remote tar + fetch). Also owns the pre-test log erase.

use std::path::Path;

use tracing::info;

use crate::adapter::{checked, AdapterError};
use crate::exec::{sanitize_host, CommandRunner};

pub fn run_sysdiagnose(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    log_dir: &Path,
) -> Result<(), AdapterError> {
    checked(runner, "sysdiagnose", host, user, "sudo sysdiagnose -f /tmp", log_dir)?;
    info!(host, "sysdiagnose collected");
    Ok(())
}

/// Tar the DUT's system logs remotely and pull the archive back.
pub fn run_log_archive(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    local_dir: &Path,
) -> Result<(), AdapterError> {
    let remote_archive = "/tmp/log_archive.tar.gz";
    let tar_cmd = format!("tar czf {remote_archive} /var/log /Library/Logs");
    checked(runner, "log archive", host, user, &tar_cmd, local_dir)?;

    match runner.fetch(host, user, remote_archive, local_dir) {
        Ok(out) if out.success() => {
            info!(
                host,
                dest = %local_dir.join(format!("{}_logs.tar.gz", sanitize_host(host))).display(),
                "log archive pulled"
            );
            Ok(())
        }
        Ok(out) => Err(AdapterError::Failed {
            op: "log archive pull",
            host: host.to_string(),
            status: out.status,
            stderr: out.stderr.trim().to_string(),
        }),
        Err(source) => Err(AdapterError::Transport {
            op: "log archive pull",
            host: host.to_string(),
            source,
        }),
    }
}

/// Wipe the DUT's system logs before a run.
pub fn erase_logs(
    runner: &dyn CommandRunner,
    host: &str,
    user: &str,
    log_dir: &Path,
) -> Result<(), AdapterError> {
    checked(runner, "erase logs", host, user, "sudo rm -rf /var/log/*", log_dir)?;
    Ok(())
}
