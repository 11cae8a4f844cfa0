//! Liveness and latency probing.
//!
//! Liveness uses an in-process ICMP echo (surge-ping) with a short deadline;
//! latency statistics come from the platform `ping` binary, whose summary
//! line carries the aggregate min/avg/max and loss figures.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::timeout;
use tracing::debug;

use crate::types::LatencyResult;

/// Cap on simultaneous liveness probes. Bounds descriptor/port usage, not
/// correctness.
pub const PROBE_CONCURRENCY: usize = 50;

const PROBE_PAYLOAD: [u8; 56] = [0u8; 56];

/// One echo request; true iff a reply arrived before the deadline. Transport
/// errors of any kind (including unreachable) are false, never an error.
pub async fn probe(addr: Ipv4Addr, deadline: Duration) -> bool {
    matches!(
        timeout(deadline, surge_ping::ping(IpAddr::V4(addr), &PROBE_PAYLOAD)).await,
        Ok(Ok(_))
    )
}

/// Probe a whole candidate set with bounded concurrency. The result is
/// numerically sorted regardless of completion order.
pub async fn sweep(addrs: impl Iterator<Item = Ipv4Addr>, deadline: Duration) -> Vec<Ipv4Addr> {
    let mut live: Vec<Ipv4Addr> = stream::iter(addrs)
        .map(|addr| async move { probe(addr, deadline).await.then_some(addr) })
        .buffer_unordered(PROBE_CONCURRENCY)
        .filter_map(|hit| async move { hit })
        .collect()
        .await;
    live.sort_unstable();
    live
}

/// Measures round-trip statistics by running the system echo utility and
/// parsing its summary. Never cached; every call is a fresh measurement.
#[derive(Debug, Clone)]
pub struct LatencyProber {
    command: String,
}

impl Default for LatencyProber {
    fn default() -> Self {
        LatencyProber { command: "ping".to_string() }
    }
}

const MEASURE_TIMEOUT: Duration = Duration::from_secs(10);

impl LatencyProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitute the echo command (tests point this at a stub).
    pub fn with_command(command: impl Into<String>) -> Self {
        LatencyProber { command: command.into() }
    }

    /// Issue `count` echo requests and parse the aggregate statistics.
    /// Any spawn, timeout, or parse failure yields the 100%-loss sentinel.
    pub async fn measure(&self, addr: Ipv4Addr, count: u32) -> LatencyResult {
        let output = timeout(
            MEASURE_TIMEOUT,
            tokio::process::Command::new(&self.command)
                .arg("-c")
                .arg(count.to_string())
                .arg(addr.to_string())
                .output(),
        )
        .await;
        match output {
            Ok(Ok(out)) => parse_ping_output(&String::from_utf8_lossy(&out.stdout)),
            _ => {
                debug!("latency probe failed for {addr}");
                LatencyResult::UNREACHABLE
            }
        }
    }
}

/// Parse an echo-reply summary. Exactly one of two shapes is reported:
/// an explicit "min/avg/max" statistics line (loss = 0), or a bare
/// "% packet loss" line (min = avg = max = 0). Anything else is the
/// unreachable sentinel.
pub fn parse_ping_output(output: &str) -> LatencyResult {
    for line in output.lines() {
        let Some(pos) = line.find("min/avg/max") else { continue };
        let Some(eq) = line[pos..].find('=') else { continue };
        let stats = line[pos + eq + 1..].trim().trim_end_matches("ms").trim();
        let mut fields = stats.split('/');
        let (Some(min), Some(avg), Some(max)) = (
            fields.next().and_then(|v| v.trim().parse::<f64>().ok()),
            fields.next().and_then(|v| v.trim().parse::<f64>().ok()),
            fields.next().and_then(|v| v.trim().parse::<f64>().ok()),
        ) else {
            continue;
        };
        return LatencyResult { min, avg, max, loss: 0.0 };
    }
    for line in output.lines() {
        let Some(pos) = line.find("% packet loss") else { continue };
        let digits: String = line[..pos]
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        if let Ok(loss) = digits.parse::<f64>() {
            return LatencyResult { min: 0.0, avg: 0.0, max: 0.0, loss };
        }
    }
    LatencyResult::UNREACHABLE
}
