use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating the harness configuration.
///
/// Everything here is fatal to the whole run: a plan that fails validation
/// never spawns a single worker thread.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown traffic type '{0}'")]
    UnknownTrafficType(String),
    #[error("unknown traffic direction '{0}' (expected UL, DL or BIDIR)")]
    UnknownDirection(String),
    #[error("unknown diagnostics mode '{0}' (expected sysdiagnose, logarchive or off)")]
    UnknownDiagMode(String),
    #[error("test '{0}' has an empty DUT list")]
    EmptyDutList(String),
}
