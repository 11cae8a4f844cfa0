//! Entry point: parse args, load configuration, then run one cycle or the
//! continuous loop. A cycle that panics is logged and retried after a short
//! backoff; only Ctrl-C stops the process.

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use clap::Parser;
use futures::FutureExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lanpulse::config::{Cli, Config};
use lanpulse::scanner::Scanner;

/// Floor on the pause between cycles so a slow cycle cannot cause
/// back-to-back overlap.
const MIN_CYCLE_GAP: Duration = Duration::from_secs(1);
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "lanpulse=debug" } else { "lanpulse=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = Config::load(&cli)?;
    let mut scanner = Scanner::new(config.clone())?;

    if cli.once {
        let report = scanner.run_cycle().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    info!("continuous monitoring every {:?}", config.scan_interval);
    loop {
        let started = Instant::now();
        let outcome = tokio::select! {
            outcome = AssertUnwindSafe(scanner.run_cycle()).catch_unwind() => outcome,
            _ = tokio::signal::ctrl_c() => break,
        };
        let pause = match outcome {
            Ok(_report) => config.scan_interval.saturating_sub(started.elapsed()).max(MIN_CYCLE_GAP),
            Err(_) => {
                error!("scan cycle panicked, backing off");
                ERROR_BACKOFF
            }
        };
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    info!("monitoring stopped");
    Ok(())
}
