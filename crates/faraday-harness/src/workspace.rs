//! Per-DUT output directory tree.
//!
//! Layout: `<log_root>/<test_name>/<dut with dots as underscores>/` with
//! one subdirectory per artifact kind plus one per remote peer. Creation
//! failure is the only fatal-to-DUT error in the worker lifecycle.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use faraday_remote::exec::sanitize_host;

#[derive(Debug, Clone)]
pub struct DutWorkspace {
    pub root: PathBuf,
    pub sniffer: PathBuf,
    pub tcpdump: PathBuf,
    pub sysdiag: PathBuf,
    pub attenuator: PathBuf,
    pub common: PathBuf,
    remote: BTreeMap<String, PathBuf>,
}

impl DutWorkspace {
    pub fn create(
        log_root: &Path,
        test_name: &str,
        dut: &str,
        remotes: &[String],
    ) -> io::Result<Self> {
        let root = log_root.join(test_name).join(sanitize_host(dut));
        let sniffer = root.join("sniffer");
        let tcpdump = root.join("tcpdump");
        let sysdiag = root.join("sysdiag");
        let attenuator = root.join("attenuator");
        let common = root.join("common");
        for dir in [&sniffer, &tcpdump, &sysdiag, &attenuator, &common] {
            fs::create_dir_all(dir)?;
        }

        let mut remote = BTreeMap::new();
        for peer in remotes {
            let dir = root.join("remote").join(sanitize_host(peer));
            fs::create_dir_all(&dir)?;
            remote.insert(peer.clone(), dir);
        }

        Ok(Self {
            root,
            sniffer,
            tcpdump,
            sysdiag,
            attenuator,
            common,
            remote,
        })
    }

    /// Output dir for one remote peer; falls back to `common/` for hosts
    /// that were not in the row's peer list.
    pub fn remote_dir(&self, peer: &str) -> &Path {
        self.remote.get(peer).map(PathBuf::as_path).unwrap_or(&self.common)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_the_full_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = DutWorkspace::create(
            tmp.path(),
            "TCP_DL",
            "10.0.0.5",
            &["10.0.0.100".to_string()],
        )
        .unwrap();

        assert_eq!(ws.root, tmp.path().join("TCP_DL").join("10_0_0_5"));
        for dir in [&ws.sniffer, &ws.tcpdump, &ws.sysdiag, &ws.attenuator, &ws.common] {
            assert!(dir.is_dir());
        }
        assert!(ws.remote_dir("10.0.0.100").is_dir());
        assert!(ws
            .remote_dir("10.0.0.100")
            .ends_with("remote/10_0_0_100"));
    }

    #[test]
    fn unknown_peer_falls_back_to_common() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = DutWorkspace::create(tmp.path(), "t", "10.0.0.5", &[]).unwrap();
        assert_eq!(ws.remote_dir("10.9.9.9"), ws.common.as_path());
    }
}
