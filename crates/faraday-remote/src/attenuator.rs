//! Programmable RF attenuator control.
//!
//! The attenuator CLI runs on the controller host itself, so callers pass
//! a [`LocalRunner`](crate::exec::LocalRunner) in production. The logical
//! host label keeps the per-host output files grouped.

use std::path::Path;

use tracing::info;

use crate::adapter::{checked, AdapterError};
use crate::exec::{CmdOutput, CommandRunner};

const HOST_LABEL: &str = "attenuator";

pub fn set_attenuation(
    runner: &dyn CommandRunner,
    level_db: i32,
    log_dir: &Path,
) -> Result<CmdOutput, AdapterError> {
    let cmd = format!("attenuator_cli set {level_db}");
    let out = checked(runner, "set attenuation", HOST_LABEL, "root", &cmd, log_dir)?;
    info!(level_db, "attenuator set");
    Ok(out)
}
