//! `faraday` command-line entry point.
//!
//! Wires up logging (structured records to a file, colored echo to the
//! console), loads the plan, and hands it to the driver. The exit code
//! reflects the run: non-zero when the plan was empty or any DUT failed.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use faraday_common::Config;
use faraday_harness::{console, driver};
use faraday_remote::exec::{LocalRunner, SshRunner};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "faraday", about = "Wi-Fi lab test orchestration harness")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute the test plan from a configuration file.
    Run {
        /// Path to the TOML configuration.
        #[arg(long, value_name = "FILE")]
        config_path: PathBuf,

        /// Run only the named tests; repeatable. Default is every
        /// non-skipped row.
        #[arg(long = "tests-to-run", value_name = "NAME")]
        tests_to_run: Vec<String>,

        /// Structured log destination.
        #[arg(long, default_value = "faraday.log")]
        log_file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            config_path,
            tests_to_run,
            log_file,
        } => match run(&config_path, &tests_to_run, &log_file) {
            Ok(code) => code,
            Err(e) => {
                console::error(&format!("{e:#}"));
                ExitCode::from(1)
            }
        },
    }
}

fn run(config_path: &PathBuf, filter: &[String], log_file: &PathBuf) -> anyhow::Result<ExitCode> {
    init_logging(log_file)?;

    console::step(&format!("loading configuration from {}", config_path.display()));
    let config = Config::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    console::info(&format!(
        "{} test row(s), {} capture device(s)",
        config.tests.len(),
        config.sniffers.len()
    ));

    let runner = Arc::new(SshRunner::new());
    let local_runner = Arc::new(LocalRunner::new());
    let summary = match driver::run_plan(&config, runner, local_runner, filter) {
        Ok(summary) => summary,
        Err(driver::DriverError::EmptyPlan) => {
            console::error("no runnable tests matched; nothing to do");
            return Ok(ExitCode::from(1));
        }
    };

    if summary.all_passed() {
        console::info(&format!("all {} worker(s) passed", summary.total()));
        Ok(ExitCode::SUCCESS)
    } else {
        console::error(&format!(
            "{} of {} worker(s) failed",
            summary.failed + summary.panicked,
            summary.total()
        ));
        Ok(ExitCode::from(1))
    }
}

/// File-only structured log. The console feed stays human-readable and
/// uncluttered; `RUST_LOG` overrides the default level.
fn init_logging(log_file: &PathBuf) -> anyhow::Result<()> {
    let file = File::create(log_file)
        .with_context(|| format!("creating log file {}", log_file.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .init();
    Ok(())
}
