//! Scripted command runner for tests.
//!
//! Records every call and matches commands against scripted rules, so a
//! test suite can force a specific step to fail and then assert on the
//! exact transcript the worker produced. Exported from the library so
//! downstream crates can reuse it in their own integration tests.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::exec::{CmdOutput, CommandRunner, ExecError};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub host: String,
    pub user: String,
    pub cmd: String,
}

struct Rule {
    /// Substring matched against `"<host> <cmd>"`.
    needle: String,
    status: i32,
    stdout: String,
    stderr: String,
    /// `None` = always; `Some(n)` = applies to the next n matches only.
    remaining: Option<usize>,
}

/// A `CommandRunner` that never touches the network.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<RecordedCall>>,
    rules: Mutex<Vec<Rule>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for every command whose `"<host> <cmd>"` string
    /// contains `needle`.
    pub fn respond(&self, needle: &str, status: i32, stdout: &str, stderr: &str) {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.to_string(),
            status,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            remaining: None,
        });
    }

    /// Like [`respond`](Self::respond) but only for the next `times` matches.
    /// Rules are consulted in insertion order, so stack a bounded failure
    /// in front of a permanent success to model flaky association.
    pub fn respond_times(&self, needle: &str, status: i32, stderr: &str, times: usize) {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.to_string(),
            status,
            stdout: String::new(),
            stderr: stderr.to_string(),
            remaining: Some(times),
        });
    }

    /// Shorthand: every matching command fails with status 1.
    pub fn fail_matching(&self, needle: &str) {
        self.respond(needle, 1, "", "scripted failure");
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Transcript as `"<host> <cmd>"` lines, in execution order.
    pub fn transcript(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| format!("{} {}", c.host, c.cmd))
            .collect()
    }

    /// Index of the first transcript entry containing `needle`.
    pub fn position_of(&self, needle: &str) -> Option<usize> {
        self.transcript().iter().position(|l| l.contains(needle))
    }

    /// Number of transcript entries containing `needle`.
    pub fn count_of(&self, needle: &str) -> usize {
        self.transcript()
            .iter()
            .filter(|l| l.contains(needle))
            .count()
    }

    fn scripted(&self, host: &str, cmd: &str) -> CmdOutput {
        let target = format!("{host} {cmd}");
        let mut rules = self.rules.lock().unwrap();
        for rule in rules.iter_mut() {
            if !target.contains(&rule.needle) {
                continue;
            }
            match rule.remaining {
                Some(0) => continue,
                Some(ref mut n) => *n -= 1,
                None => {}
            }
            return CmdOutput {
                status: rule.status,
                stdout: rule.stdout.clone(),
                stderr: rule.stderr.clone(),
                timed_out: false,
            };
        }
        CmdOutput {
            status: 0,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
        }
    }
}

impl CommandRunner for RecordingRunner {
    fn run_with_timeout(
        &self,
        host: &str,
        user: &str,
        cmd: &str,
        _log_dir: &Path,
        _timeout: Duration,
    ) -> Result<CmdOutput, ExecError> {
        self.calls.lock().unwrap().push(RecordedCall {
            host: host.to_string(),
            user: user.to_string(),
            cmd: cmd.to_string(),
        });
        Ok(self.scripted(host, cmd))
    }

    fn fetch(
        &self,
        host: &str,
        user: &str,
        remote_path: &str,
        _local_dir: &Path,
    ) -> Result<CmdOutput, ExecError> {
        let cmd = format!("scp {remote_path}");
        self.calls.lock().unwrap().push(RecordedCall {
            host: host.to_string(),
            user: user.to_string(),
            cmd: cmd.clone(),
        });
        Ok(self.scripted(host, &cmd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_rule_expires() {
        let runner = RecordingRunner::new();
        runner.respond_times("nmcli dev wifi connect", 4, "no ap", 2);
        let dir = Path::new("/tmp");

        let a = runner.run("d", "root", "nmcli dev wifi connect x", dir).unwrap();
        let b = runner.run("d", "root", "nmcli dev wifi connect x", dir).unwrap();
        let c = runner.run("d", "root", "nmcli dev wifi connect x", dir).unwrap();
        assert_eq!((a.status, b.status, c.status), (4, 4, 0));
    }

    #[test]
    fn rules_match_host_and_command() {
        let runner = RecordingRunner::new();
        runner.fail_matching("10.0.0.6 nmcli");
        let dir = Path::new("/tmp");

        let ok = runner.run("10.0.0.5", "root", "nmcli radio wifi on", dir).unwrap();
        let bad = runner.run("10.0.0.6", "root", "nmcli radio wifi on", dir).unwrap();
        assert!(ok.success());
        assert!(!bad.success());
        assert_eq!(runner.calls().len(), 2);
    }
}
