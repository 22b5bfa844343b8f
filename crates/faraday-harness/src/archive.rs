//! End-of-run archival of one DUT's output subtree.

use std::path::{Path, PathBuf};
use std::process::Command;

use faraday_remote::exec::sanitize_host;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to run tar: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("tar exited with status {0}")]
    Status(i32),
}

/// Expected archive location for one DUT's run.
pub fn archive_path(log_root: &Path, test_name: &str, dut: &str) -> PathBuf {
    log_root
        .join(test_name)
        .join(format!("{}.tar.gz", sanitize_host(dut)))
}

/// Compress `<log_root>/<test>/<dut>/` into a sibling `<dut>.tar.gz`.
///
/// The archive is rooted at `log_root` so it only ever contains this
/// DUT's own subtree.
pub fn archive_workspace(
    log_root: &Path,
    test_name: &str,
    dut: &str,
) -> Result<PathBuf, ArchiveError> {
    let tar_path = archive_path(log_root, test_name, dut);
    let subtree = format!("{test_name}/{}", sanitize_host(dut));

    let status = Command::new("tar")
        .arg("czf")
        .arg(&tar_path)
        .arg("-C")
        .arg(log_root)
        .arg(&subtree)
        .status()?;
    if !status.success() {
        return Err(ArchiveError::Status(status.code().unwrap_or(-1)));
    }
    info!(archive = %tar_path.display(), "logs archived");
    Ok(tar_path)
}
