//! Cycle driver: owns the device table and the rate engine, runs one full
//! discover -> collect -> aggregate -> publish pass.

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{self, BandwidthSummary, HostsSummary, InfrastructureSummary};
use crate::collector::{self, COLLECT_CONCURRENCY};
use crate::config::Config;
use crate::probe::{self, LatencyProber};
use crate::publish::Publisher;
use crate::rates::RateEngine;
use crate::subnet;
use crate::types::{DeviceTable, MetricValue};

const LIVENESS_TIMEOUT: Duration = Duration::from_secs(1);

/// What one-shot mode prints and the loop logs.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub devices_found: usize,
    pub bandwidth: BandwidthSummary,
    pub infrastructure: InfrastructureSummary,
    pub hosts: HostsSummary,
    pub alerts: usize,
}

pub struct Scanner {
    config: Config,
    publisher: Publisher,
    prober: LatencyProber,
    devices: DeviceTable,
    rates: RateEngine,
}

impl Scanner {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let publisher = Publisher::new(&config.api_url, &config.api_key)?;
        Ok(Scanner {
            config,
            publisher,
            prober: LatencyProber::new(),
            devices: DeviceTable::new(),
            rates: RateEngine::new(),
        })
    }

    /// One full cycle. Per-host failures are isolated; the only shared
    /// mutations (device table, rate state) happen here on the driver task
    /// as each host's collection resolves.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let prefix = self.config.subnet.unwrap_or_else(subnet::detect_local_subnet);
        info!("scan cycle starting on {prefix}");

        let live = probe::sweep(prefix.hosts(), LIVENESS_TIMEOUT).await;
        info!("liveness sweep found {} hosts", live.len());

        let snmp = self.config.snmp.clone();
        let mut table = DeviceTable::new();
        {
            let mut collections = stream::iter(live)
                .map(|ip| {
                    let snmp = snmp.clone();
                    async move { (ip, collector::collect(ip, &snmp).await) }
                })
                .buffer_unordered(COLLECT_CONCURRENCY);
            while let Some((ip, collected)) = collections.next().await {
                match collected {
                    Some(mut device) => {
                        if let Some(bw) =
                            self.rates.observe(ip, device.total_in, device.total_out, Instant::now())
                        {
                            device
                                .record
                                .metrics
                                .insert("bandwidth".to_string(), MetricValue::Bandwidth(bw));
                        }
                        info!(
                            "collected {ip}: {} ({:?})",
                            device.record.name, device.record.device_type
                        );
                        table.insert(ip, device.record);
                    }
                    None => debug!("no management telemetry from {ip}"),
                }
            }
        }
        // Hosts that stopped answering silently drop out of the table;
        // their rate state is kept in case they come back.
        self.rates.finish_cycle(Instant::now());
        self.devices = table;

        let bandwidth = aggregate::bandwidth_summary(&self.devices);
        let infrastructure =
            aggregate::infrastructure_summary(&self.devices, &self.prober, &prefix).await;
        let gaming =
            aggregate::gaming_summary(&self.devices, &self.prober, &self.config.gaming).await;
        let alerts = aggregate::alerts_summary(&self.devices);
        let hosts = aggregate::hosts_summary(&self.devices, &self.prober).await;

        self.publisher.send("bandwidth", &bandwidth).await;
        self.publisher.send("network-infrastructure", &infrastructure).await;
        self.publisher.send("gaming-devices", &gaming).await;
        self.publisher.send("alerts", &alerts).await;
        self.publisher.send("hosts", &hosts).await;

        info!(
            "scan cycle complete: {} devices, {:.2} Gbps up / {:.2} Gbps down, {} online",
            self.devices.len(),
            bandwidth.upstream_gbps,
            bandwidth.downstream_gbps,
            hosts.online_count
        );

        CycleReport {
            devices_found: self.devices.len(),
            bandwidth,
            infrastructure,
            hosts,
            alerts: alerts.alerts.len(),
        }
    }
}
