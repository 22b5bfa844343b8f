//! Colored console echo for the lab operator.
//!
//! The structured log file carries the full record; these lines are the
//! human-facing progress feed. Plain ANSI escapes, no crate: the pack
//! only reaches for terminal crates when building full TUIs.

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const ORANGE: &str = "\x1b[38;5;208m";
const RESET: &str = "\x1b[0m";

pub fn info(msg: &str) {
    println!("{GREEN}[INFO]{RESET} {msg}");
}

pub fn warn(msg: &str) {
    println!("{YELLOW}[WARN]{RESET} {msg}");
}

pub fn error(msg: &str) {
    println!("{RED}[ERROR]{RESET} {msg}");
}

pub fn step(msg: &str) {
    println!("{ORANGE}[STEP]{RESET} {msg}");
}
