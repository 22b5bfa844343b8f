//! The remote command executor.
//!
//! Runs `<command>` on `<host>` as `<user>`, captures stdout/stderr, and
//! persists the raw output into a per-host directory under the caller's
//! log dir. A timeout kills the child and returns a timeout-flagged
//! result rather than an error; callers inspect [`CmdOutput`] and decide.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info};

/// Default per-command deadline, matching the lab's longest remote ops.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of one remote (or local) command.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.status == 0 && !self.timed_out
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn '{cmd}': {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error while capturing output of '{cmd}': {source}")]
    Capture {
        cmd: String,
        #[source]
        source: std::io::Error,
    },
}

/// The single seam between the harness and the outside world.
///
/// `run` never fails on a nonzero exit status — that is part of the
/// result contract. It fails only when the transport itself is broken
/// (spawn failure, output capture failure).
pub trait CommandRunner: Send + Sync {
    fn run_with_timeout(
        &self,
        host: &str,
        user: &str,
        cmd: &str,
        log_dir: &Path,
        timeout: Duration,
    ) -> Result<CmdOutput, ExecError>;

    fn run(&self, host: &str, user: &str, cmd: &str, log_dir: &Path) -> Result<CmdOutput, ExecError> {
        self.run_with_timeout(host, user, cmd, log_dir, DEFAULT_TIMEOUT)
    }

    /// Copy `remote_path` (globs allowed, expanded remotely) into `local_dir`.
    fn fetch(
        &self,
        host: &str,
        user: &str,
        remote_path: &str,
        local_dir: &Path,
    ) -> Result<CmdOutput, ExecError>;
}

/// Hosts become directory names; dots would read as extensions everywhere.
pub fn sanitize_host(host: &str) -> String {
    host.replace('.', "_")
}

fn persist_output(log_dir: &Path, host: &str, out: &CmdOutput) {
    let host_dir = log_dir.join(sanitize_host(host));
    if let Err(e) = fs::create_dir_all(&host_dir) {
        error!(host, error = %e, "cannot create per-host log dir");
        return;
    }
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let _ = fs::write(host_dir.join(format!("{ts}_stdout.txt")), &out.stdout);
    let _ = fs::write(host_dir.join(format!("{ts}_stderr.txt")), &out.stderr);
}

/// Spawn `command`, drain both pipes off-thread, kill at `timeout`.
fn run_child(mut command: Command, display: &str, timeout: Duration) -> Result<CmdOutput, ExecError> {
    command.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = command.spawn().map_err(|source| ExecError::Spawn {
        cmd: display.to_string(),
        source,
    })?;

    let stdout_reader = child.stdout.take().map(spawn_drain);
    let stderr_reader = child.stderr.take().map(spawn_drain);

    let deadline = Instant::now() + timeout;
    let mut timed_out = false;
    let status = loop {
        match child.try_wait().map_err(|source| ExecError::Capture {
            cmd: display.to_string(),
            source,
        })? {
            Some(status) => break status.code().unwrap_or(-1),
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                timed_out = true;
                break -1;
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    let stdout = stdout_reader.map(join_drain).unwrap_or_default();
    let stderr = stderr_reader.map(join_drain).unwrap_or_default();

    Ok(CmdOutput {
        status,
        stdout,
        stderr,
        timed_out,
    })
}

fn spawn_drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        let _ = pipe.read_to_string(&mut buf);
        buf
    })
}

fn join_drain(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

/// Production runner: `ssh user@host "<cmd>"` over pre-authenticated keys.
#[derive(Debug, Default)]
pub struct SshRunner;

impl SshRunner {
    pub fn new() -> Self {
        Self
    }

    /// `-tt` forces a pty, so killing the local client at the deadline
    /// hangs up the remote session and takes its process group with it
    /// instead of orphaning the command on the DUT.
    fn remote_command(user: &str, host: &str, cmd: &str) -> Command {
        let mut command = Command::new("ssh");
        command
            .arg("-tt")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg(format!("{user}@{host}"))
            .arg(cmd);
        command
    }
}

impl CommandRunner for SshRunner {
    fn run_with_timeout(
        &self,
        host: &str,
        user: &str,
        cmd: &str,
        log_dir: &Path,
        timeout: Duration,
    ) -> Result<CmdOutput, ExecError> {
        info!(host, cmd, "ssh exec");
        let command = Self::remote_command(user, host, cmd);
        let out = run_child(command, cmd, timeout)?;
        persist_output(log_dir, host, &out);
        if out.timed_out {
            error!(host, cmd, ?timeout, "ssh command timed out, child killed");
        } else if out.status != 0 {
            error!(host, cmd, status = out.status, "ssh command failed");
        } else {
            debug!(host, cmd, "ssh command succeeded");
        }
        Ok(out)
    }

    fn fetch(
        &self,
        host: &str,
        user: &str,
        remote_path: &str,
        local_dir: &Path,
    ) -> Result<CmdOutput, ExecError> {
        let source = format!("{user}@{host}:{remote_path}");
        info!(host, remote_path, "scp fetch");
        let mut command = Command::new("scp");
        command
            .arg("-o")
            .arg("BatchMode=yes")
            .arg(&source)
            .arg(local_dir);
        run_child(command, &format!("scp {source}"), DEFAULT_TIMEOUT)
    }
}

/// Runs commands on the controller host itself via `sh -c`.
///
/// The attenuator CLI lives on the controller, not on any DUT; the `host`
/// argument is used only for output bookkeeping.
#[derive(Debug, Default)]
pub struct LocalRunner;

impl LocalRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for LocalRunner {
    fn run_with_timeout(
        &self,
        host: &str,
        _user: &str,
        cmd: &str,
        log_dir: &Path,
        timeout: Duration,
    ) -> Result<CmdOutput, ExecError> {
        info!(cmd, "local exec");
        let mut command = Command::new("sh");
        command.arg("-c").arg(cmd);
        let out = run_child(command, cmd, timeout)?;
        persist_output(log_dir, host, &out);
        Ok(out)
    }

    fn fetch(
        &self,
        _host: &str,
        _user: &str,
        remote_path: &str,
        local_dir: &Path,
    ) -> Result<CmdOutput, ExecError> {
        // Local "fetch" is a plain copy.
        let cmd = format!("cp {} {}", remote_path, local_dir.display());
        let mut command = Command::new("sh");
        command.arg("-c").arg(&cmd);
        run_child(command, &cmd, DEFAULT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_host_replaces_dots() {
        assert_eq!(sanitize_host("10.0.0.5"), "10_0_0_5");
        assert_eq!(sanitize_host("dut-lab"), "dut-lab");
    }

    #[test]
    fn local_runner_captures_output_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let runner = LocalRunner::new();
        let out = runner
            .run("local", "nobody", "echo hello", dir.path())
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");

        let host_dir = dir.path().join("local");
        let entries: Vec<_> = std::fs::read_dir(&host_dir).unwrap().collect();
        assert_eq!(entries.len(), 2, "stdout and stderr files");
    }

    #[test]
    fn nonzero_status_is_a_result_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = LocalRunner::new()
            .run("local", "nobody", "exit 3", dir.path())
            .unwrap();
        assert!(!out.success());
        assert_eq!(out.status, 3);
        assert!(!out.timed_out);
    }

    #[test]
    fn ssh_forces_a_pty_so_a_local_kill_reaches_the_remote_group() {
        let command = SshRunner::remote_command("root", "10.0.0.5", "nmcli radio wifi on");
        assert_eq!(command.get_program(), "ssh");
        let args: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args[0], "-tt");
        assert!(args.contains(&"root@10.0.0.5".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("nmcli radio wifi on"));
    }

    #[test]
    fn timeout_kills_the_child_and_flags_the_result() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let out = LocalRunner::new()
            .run_with_timeout(
                "local",
                "nobody",
                "sleep 30",
                dir.path(),
                Duration::from_millis(200),
            )
            .unwrap();
        assert!(out.timed_out);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
