//! Delta-based bandwidth computation across scan cycles.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Instant;

use crate::types::Bandwidth;

/// Keeps the previous cycle's cumulative octet totals per address plus one
/// shared previous-cycle timestamp. Owned by the cycle driver; nothing else
/// mutates it.
#[derive(Debug, Default)]
pub struct RateEngine {
    totals: HashMap<Ipv4Addr, (u64, u64)>,
    last_cycle: Option<Instant>,
}

impl RateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one host's current octet totals and get its bandwidth since the
    /// previous cycle, if computable: requires prior state for the address,
    /// a completed previous cycle, and strictly positive elapsed time.
    /// Negative deltas (counter rollover) clamp to zero.
    ///
    /// The stored totals are overwritten unconditionally, even when no
    /// bandwidth could be computed.
    pub fn observe(
        &mut self,
        addr: Ipv4Addr,
        total_in: u64,
        total_out: u64,
        now: Instant,
    ) -> Option<Bandwidth> {
        let rate = match (self.totals.get(&addr), self.last_cycle) {
            (Some(&(prev_in, prev_out)), Some(last)) => {
                let elapsed = now.saturating_duration_since(last).as_secs_f64();
                if elapsed > 0.0 {
                    let in_bps = ((total_in as f64 - prev_in as f64) * 8.0 / elapsed).max(0.0);
                    let out_bps = ((total_out as f64 - prev_out as f64) * 8.0 / elapsed).max(0.0);
                    Some(Bandwidth {
                        in_bps,
                        out_bps,
                        in_mbps: in_bps / 1_000_000.0,
                        out_mbps: out_bps / 1_000_000.0,
                    })
                } else {
                    None
                }
            }
            _ => None,
        };
        self.totals.insert(addr, (total_in, total_out));
        rate
    }

    /// Advance the shared timestamp. Called once per cycle, after every
    /// host's totals have been observed.
    pub fn finish_cycle(&mut self, now: Instant) {
        self.last_cycle = Some(now);
    }
}
