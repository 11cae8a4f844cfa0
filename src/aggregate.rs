//! The five publish-ready folds over the device table. Each fold is
//! read-only over the table; latency figures are measured fresh per call.

use serde::Serialize;

use crate::probe::LatencyProber;
use crate::subnet::NetworkPrefix;
use crate::types::{
    DeviceRecord, DeviceStatus, DeviceTable, DeviceType, IfStatus, LatencyResult, MetricValue,
    Vendor,
};

/// Reference uplink capacity the utilization percentage is computed against.
const REFERENCE_CAPACITY_GBPS: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandwidthSummary {
    pub upstream_gbps: f64,
    pub downstream_gbps: f64,
    pub wifi_gbps: f64,
    pub upstream_percent: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfraDevice {
    pub id: String,
    pub ip: String,
    #[serde(rename = "type")]
    pub device_type: &'static str,
    pub status: &'static str,
    pub cpu: i64,
    pub memory: i64,
    pub ports: usize,
    pub vendor: Vendor,
    pub uptime: String,
    pub ping: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfrastructureSummary {
    pub devices: Vec<InfraDevice>,
    pub total_devices: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GamingDevice {
    pub name: String,
    pub ip: String,
    pub count: u32,
    pub ping: f64,
    #[serde(rename = "packetLoss")]
    pub packet_loss: f64,
    pub status: &'static str,
    #[serde(rename = "type")]
    pub device_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GamingSummary {
    pub devices: Vec<GamingDevice>,
    pub total_gaming_devices: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub device: String,
    pub level: &'static str,
    pub msg: String,
    pub time: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertsSummary {
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostRow {
    pub ip: String,
    pub name: String,
    #[serde(rename = "type")]
    pub host_type: &'static str,
    pub vendor: Vendor,
    pub status: DeviceStatus,
    #[serde(rename = "lastSeen")]
    pub last_seen: String,
    pub ping: Option<f64>,
    pub interfaces: usize,
    pub cpu: i64,
    pub memory: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostsSummary {
    pub hosts: Vec<HostRow>,
    pub total_hosts: usize,
    pub online_count: usize,
    pub offline_count: usize,
    pub warning_count: usize,
    pub timestamp: String,
}

/// Sum per-device bandwidth into network totals, with the wifi share taken
/// from access points (or estimated at 40% of downstream when no AP
/// reported traffic).
pub fn bandwidth_summary(devices: &DeviceTable) -> BandwidthSummary {
    let mut downstream = 0.0;
    let mut upstream = 0.0;
    let mut wifi = 0.0;
    for device in devices.values() {
        let Some(bw) = device.metrics.get("bandwidth").and_then(MetricValue::bandwidth) else {
            continue;
        };
        downstream += bw.in_bps;
        upstream += bw.out_bps;
        if device.device_type == DeviceType::AccessPoint {
            wifi += bw.in_bps + bw.out_bps;
        }
    }
    let downstream_gbps = downstream / 1e9;
    let upstream_gbps = upstream / 1e9;
    let wifi_gbps = if wifi > 0.0 { wifi / 1e9 } else { downstream_gbps * 0.4 };
    BandwidthSummary {
        upstream_gbps: round2(upstream_gbps),
        downstream_gbps: round2(downstream_gbps),
        wifi_gbps: round2(wifi_gbps),
        upstream_percent: round1(upstream_gbps / REFERENCE_CAPACITY_GBPS * 100.0),
        timestamp: now_iso(),
    }
}

/// Public infrastructure taxonomy.
pub fn api_device_type(device_type: DeviceType) -> &'static str {
    match device_type {
        DeviceType::AccessPoint => "Access Point",
        DeviceType::Router | DeviceType::Firewall => "Gateway",
        DeviceType::Switch
        | DeviceType::Printer
        | DeviceType::Storage
        | DeviceType::Server
        | DeviceType::Unknown => "Switch",
    }
}

fn infra_status(status: DeviceStatus) -> &'static str {
    match status {
        DeviceStatus::Online => "active",
        DeviceStatus::Warning => "warning",
        DeviceStatus::Offline => "inactive",
    }
}

pub async fn infrastructure_summary(
    devices: &DeviceTable,
    prober: &LatencyProber,
    subnet: &NetworkPrefix,
) -> InfrastructureSummary {
    let mut rows = Vec::with_capacity(devices.len());
    for device in devices.values() {
        let latency = prober.measure(device.ip, 1).await;
        rows.push(InfraDevice {
            id: device.name.clone(),
            ip: device.ip.to_string(),
            device_type: api_device_type(device.device_type),
            status: infra_status(device.status),
            cpu: cpu_metric(device).unwrap_or(0),
            memory: memory_metric(device).unwrap_or(0),
            ports: device.interfaces.iter().filter(|i| i.status == IfStatus::Up).count(),
            vendor: device.vendor,
            uptime: device.uptime.clone().unwrap_or_default(),
            ping: latency.avg,
        });
    }

    if !rows.iter().any(|r| r.device_type == "Gateway") {
        let gateway = subnet.gateway();
        let latency = prober.measure(gateway, 1).await;
        rows.insert(
            0,
            InfraDevice {
                id: "Gateway".to_string(),
                ip: gateway.to_string(),
                device_type: "Gateway",
                status: if latency.loss < 100.0 { "active" } else { "inactive" },
                cpu: 0,
                memory: 0,
                ports: 1,
                vendor: Vendor::Unknown,
                uptime: String::new(),
                ping: latency.avg,
            },
        );
    }

    InfrastructureSummary { total_devices: rows.len(), devices: rows }
}

/// Status for an explicitly configured gaming device (5-probe sample).
fn cluster_status(latency: &LatencyResult) -> &'static str {
    if latency.avg < 20.0 && latency.loss < 1.0 {
        "optimal"
    } else if latency.avg < 50.0 {
        "warning"
    } else {
        "critical"
    }
}

/// Status for a device discovered by name scan (single-probe sample).
fn scan_status(avg: f64) -> &'static str {
    if avg < 20.0 {
        "optimal"
    } else if avg < 50.0 {
        "warning"
    } else {
        "critical"
    }
}

const CONSOLE_TOKENS: &[&str] = &["nintendo", "switch", "playstation", "ps5", "xbox"];

/// Gaming device clusters from configuration.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct GamingClusters {
    #[serde(default)]
    pub switch_cluster: Vec<std::net::Ipv4Addr>,
    #[serde(default)]
    pub ps5_cluster: Vec<std::net::Ipv4Addr>,
}

pub async fn gaming_summary(
    devices: &DeviceTable,
    prober: &LatencyProber,
    clusters: &GamingClusters,
) -> GamingSummary {
    let mut rows = Vec::new();

    for &ip in &clusters.switch_cluster {
        let latency = prober.measure(ip, 5).await;
        rows.push(GamingDevice {
            name: format!("Nintendo Switch ({ip})"),
            ip: ip.to_string(),
            count: 1,
            ping: round1(latency.avg),
            packet_loss: round2(latency.loss),
            status: cluster_status(&latency),
            device_type: "nintendo",
        });
    }
    for &ip in &clusters.ps5_cluster {
        let latency = prober.measure(ip, 5).await;
        rows.push(GamingDevice {
            name: format!("PlayStation 5 ({ip})"),
            ip: ip.to_string(),
            count: 1,
            ping: round1(latency.avg),
            packet_loss: round2(latency.loss),
            status: cluster_status(&latency),
            device_type: "playstation",
        });
    }

    // Consoles that showed up in discovery but are not in the clusters.
    for device in devices.values() {
        let name = device.name.to_lowercase();
        if !CONSOLE_TOKENS.iter().any(|token| name.contains(token)) {
            continue;
        }
        let ip = device.ip.to_string();
        if rows.iter().any(|r| r.ip == ip) {
            continue;
        }
        let latency = prober.measure(device.ip, 1).await;
        let device_type = if name.contains("nintendo") || name.contains("switch") {
            "nintendo"
        } else if name.contains("playstation") || name.contains("ps5") {
            "playstation"
        } else {
            "other"
        };
        rows.push(GamingDevice {
            name: device.name.clone(),
            ip,
            count: 1,
            ping: round1(latency.avg),
            packet_loss: round2(latency.loss),
            status: scan_status(latency.avg),
            device_type,
        });
    }

    GamingSummary { total_gaming_devices: rows.len(), devices: rows }
}

/// Regenerated from scratch every cycle; no cross-cycle deduplication.
pub fn alerts_summary(devices: &DeviceTable) -> AlertsSummary {
    let mut alerts = Vec::new();
    for device in devices.values() {
        if let Some(bw) = device.metrics.get("bandwidth").and_then(MetricValue::bandwidth) {
            if bw.in_mbps > 8000.0 {
                alerts.push(Alert {
                    device: device.name.clone(),
                    level: "warning",
                    msg: format!("High bandwidth: {:.1} Mbps", bw.in_mbps),
                    time: "now",
                });
            }
        }

        let down = device.interfaces.iter().filter(|i| i.status == IfStatus::Down).count();
        if down > 0 && matches!(device.device_type, DeviceType::Switch | DeviceType::Router) {
            alerts.push(Alert {
                device: device.name.clone(),
                level: "info",
                msg: format!("{down} interface(s) down"),
                time: "now",
            });
        }

        if let Some(cpu) = cpu_metric(device) {
            if cpu > 80 {
                alerts.push(Alert {
                    device: device.name.clone(),
                    level: "warning",
                    msg: format!("High CPU load: {cpu}%"),
                    time: "now",
                });
            }
        }
    }
    AlertsSummary { alerts }
}

/// Publish-time health from a fresh probe, independent of the
/// discovery-time record status.
pub fn host_status(latency: &LatencyResult) -> DeviceStatus {
    if latency.loss >= 100.0 {
        DeviceStatus::Offline
    } else if latency.avg > 50.0 || latency.loss > 1.0 {
        DeviceStatus::Warning
    } else {
        DeviceStatus::Online
    }
}

fn host_type(device_type: DeviceType) -> &'static str {
    match device_type {
        DeviceType::AccessPoint => "access_point",
        DeviceType::Router | DeviceType::Firewall => "router",
        DeviceType::Switch => "switch",
        DeviceType::Storage => "storage",
        DeviceType::Server => "server",
        DeviceType::Printer | DeviceType::Unknown => "unknown",
    }
}

pub async fn hosts_summary(devices: &DeviceTable, prober: &LatencyProber) -> HostsSummary {
    let mut hosts = Vec::with_capacity(devices.len());
    // BTreeMap iteration gives numeric address order.
    for device in devices.values() {
        let latency = prober.measure(device.ip, 1).await;
        hosts.push(HostRow {
            ip: device.ip.to_string(),
            name: device.name.clone(),
            host_type: host_type(device.device_type),
            vendor: device.vendor,
            status: host_status(&latency),
            last_seen: device.last_seen.clone(),
            ping: (latency.avg > 0.0).then(|| round1(latency.avg)),
            interfaces: device.interfaces.len(),
            cpu: cpu_metric(device).unwrap_or(0),
            memory: memory_metric(device).unwrap_or(0),
        });
    }
    let count = |status: DeviceStatus| hosts.iter().filter(|h| h.status == status).count();
    HostsSummary {
        total_hosts: hosts.len(),
        online_count: count(DeviceStatus::Online),
        offline_count: count(DeviceStatus::Offline),
        warning_count: count(DeviceStatus::Warning),
        timestamp: now_iso(),
        hosts,
    }
}

fn cpu_metric(device: &DeviceRecord) -> Option<i64> {
    device
        .metrics
        .get("cpuUsage")
        .and_then(MetricValue::as_i64)
        .or_else(|| device.metrics.get("cpuLoad").and_then(MetricValue::as_i64))
}

fn memory_metric(device: &DeviceRecord) -> Option<i64> {
    device.metrics.get("memoryUsed").and_then(MetricValue::as_i64)
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bandwidth, Category, InterfaceSnapshot};
    use std::collections::BTreeMap;
    use std::net::Ipv4Addr;

    fn device(ip: [u8; 4], name: &str, device_type: DeviceType) -> DeviceRecord {
        DeviceRecord {
            ip: Ipv4Addr::from(ip),
            name: name.to_string(),
            description: name.to_string(),
            uptime: Some("12345".to_string()),
            device_type,
            vendor: Vendor::Cisco,
            model: name.to_string(),
            category: Category::Infrastructure,
            status: DeviceStatus::Online,
            last_seen: "2026-01-01T00:00:00+00:00".to_string(),
            interfaces: Vec::new(),
            metrics: BTreeMap::new(),
        }
    }

    fn with_bandwidth(mut record: DeviceRecord, in_bps: f64, out_bps: f64) -> DeviceRecord {
        record.metrics.insert(
            "bandwidth".to_string(),
            MetricValue::Bandwidth(Bandwidth {
                in_bps,
                out_bps,
                in_mbps: in_bps / 1e6,
                out_mbps: out_bps / 1e6,
            }),
        );
        record
    }

    fn iface(status: IfStatus) -> InterfaceSnapshot {
        InterfaceSnapshot {
            index: "1".to_string(),
            name: "eth0".to_string(),
            speed: 0,
            status,
            in_octets: 0,
            out_octets: 0,
        }
    }

    #[test]
    fn bandwidth_sums_and_converts_to_gbps() {
        let mut table = DeviceTable::new();
        table.insert(
            Ipv4Addr::new(10, 0, 0, 1),
            with_bandwidth(device([10, 0, 0, 1], "core", DeviceType::Switch), 2e9, 1e9),
        );
        table.insert(
            Ipv4Addr::new(10, 0, 0, 2),
            with_bandwidth(device([10, 0, 0, 2], "ap", DeviceType::AccessPoint), 5e8, 5e8),
        );
        // No bandwidth metric: ignored.
        table.insert(Ipv4Addr::new(10, 0, 0, 3), device([10, 0, 0, 3], "idle", DeviceType::Server));

        let summary = bandwidth_summary(&table);
        assert_eq!(summary.downstream_gbps, 2.5);
        assert_eq!(summary.upstream_gbps, 1.5);
        // AP in+out.
        assert_eq!(summary.wifi_gbps, 1.0);
        assert_eq!(summary.upstream_percent, 15.0);
    }

    #[test]
    fn wifi_falls_back_to_downstream_share() {
        let mut table = DeviceTable::new();
        table.insert(
            Ipv4Addr::new(10, 0, 0, 1),
            with_bandwidth(device([10, 0, 0, 1], "core", DeviceType::Switch), 10e9, 0.0),
        );
        let summary = bandwidth_summary(&table);
        assert_eq!(summary.wifi_gbps, 4.0);
    }

    #[test]
    fn api_taxonomy_maps_router_and_firewall_to_gateway() {
        assert_eq!(api_device_type(DeviceType::Router), "Gateway");
        assert_eq!(api_device_type(DeviceType::Firewall), "Gateway");
        assert_eq!(api_device_type(DeviceType::AccessPoint), "Access Point");
        assert_eq!(api_device_type(DeviceType::Switch), "Switch");
        assert_eq!(api_device_type(DeviceType::Unknown), "Switch");
    }

    #[test]
    fn host_status_thresholds() {
        let lat = |avg: f64, loss: f64| LatencyResult { min: 0.0, avg, max: avg, loss };
        assert_eq!(host_status(&lat(0.0, 100.0)), DeviceStatus::Offline);
        assert_eq!(host_status(&lat(10.0, 2.0)), DeviceStatus::Warning);
        assert_eq!(host_status(&lat(60.0, 0.0)), DeviceStatus::Warning);
        assert_eq!(host_status(&lat(10.0, 0.0)), DeviceStatus::Online);
    }

    #[test]
    fn gaming_cluster_status_thresholds() {
        let lat = |avg: f64, loss: f64| LatencyResult { min: 0.0, avg, max: avg, loss };
        assert_eq!(cluster_status(&lat(10.0, 0.0)), "optimal");
        assert_eq!(cluster_status(&lat(10.0, 5.0)), "warning");
        assert_eq!(cluster_status(&lat(30.0, 0.0)), "warning");
        assert_eq!(cluster_status(&lat(80.0, 0.0)), "critical");
    }

    #[test]
    fn alerts_cover_bandwidth_interfaces_and_cpu() {
        let mut table = DeviceTable::new();

        // 9 Gbps inbound on a switch with one interface down.
        let mut hot = with_bandwidth(device([10, 0, 0, 1], "core-sw", DeviceType::Switch), 9e9, 0.0);
        hot.interfaces = vec![iface(IfStatus::Up), iface(IfStatus::Down)];
        table.insert(hot.ip, hot);

        // High CPU from a vendor metric, on a server: only the CPU alert.
        let mut busy = device([10, 0, 0, 2], "files", DeviceType::Server);
        busy.metrics.insert("cpuUsage".to_string(), MetricValue::Int(91));
        busy.interfaces = vec![iface(IfStatus::Down)];
        table.insert(busy.ip, busy);

        let alerts = alerts_summary(&table).alerts;
        assert_eq!(alerts.len(), 3);
        assert!(alerts[0].msg.starts_with("High bandwidth: 9000.0"));
        assert_eq!(alerts[0].level, "warning");
        assert_eq!(alerts[1].msg, "1 interface(s) down");
        assert_eq!(alerts[1].level, "info");
        assert_eq!(alerts[2].msg, "High CPU load: 91%");
    }

    #[test]
    fn alerts_read_cpu_load_for_mikrotik_style_metrics() {
        let mut table = DeviceTable::new();
        let mut router = device([10, 0, 0, 1], "rb", DeviceType::Router);
        router.metrics.insert("cpuLoad".to_string(), MetricValue::Text("85".to_string()));
        table.insert(router.ip, router);
        let alerts = alerts_summary(&table).alerts;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].msg, "High CPU load: 85%");
    }

    #[test]
    fn folds_are_idempotent_apart_from_timestamps() {
        let mut table = DeviceTable::new();
        table.insert(
            Ipv4Addr::new(10, 0, 0, 1),
            with_bandwidth(device([10, 0, 0, 1], "core", DeviceType::Switch), 2e9, 1e9),
        );
        let a = bandwidth_summary(&table);
        let b = bandwidth_summary(&table);
        assert_eq!(
            (a.upstream_gbps, a.downstream_gbps, a.wifi_gbps, a.upstream_percent),
            (b.upstream_gbps, b.downstream_gbps, b.wifi_gbps, b.upstream_percent)
        );
        assert_eq!(alerts_summary(&table), alerts_summary(&table));
    }

    #[cfg(unix)]
    mod with_stub_prober {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn stub_prober(dir: &tempfile::TempDir, summary: &str) -> LatencyProber {
            let path = dir.path().join("ping");
            std::fs::write(&path, format!("#!/bin/sh\necho '{summary}'\n")).unwrap();
            let mut perm = std::fs::metadata(&path).unwrap().permissions();
            perm.set_mode(0o755);
            std::fs::set_permissions(&path, perm).unwrap();
            LatencyProber::with_command(path.to_string_lossy().into_owned())
        }

        #[tokio::test]
        async fn hosts_summary_orders_and_counts() {
            let dir = tempfile::tempdir().unwrap();
            let prober = stub_prober(&dir, "rtt min/avg/max/mdev = 0.5/1.0/1.5/0.2 ms");

            let mut table = DeviceTable::new();
            for ip in [[10, 0, 0, 20], [10, 0, 0, 3], [10, 0, 0, 100]] {
                table.insert(Ipv4Addr::from(ip), device(ip, "host", DeviceType::Server));
            }
            let summary = hosts_summary(&table, &prober).await;
            assert_eq!(summary.total_hosts, 3);
            assert_eq!(summary.online_count, 3);
            assert_eq!(summary.offline_count, 0);
            let ips: Vec<&str> = summary.hosts.iter().map(|h| h.ip.as_str()).collect();
            assert_eq!(ips, ["10.0.0.3", "10.0.0.20", "10.0.0.100"]);
            assert_eq!(summary.hosts[0].ping, Some(1.0));
            assert_eq!(summary.hosts[0].host_type, "server");
        }

        #[tokio::test]
        async fn infrastructure_synthesizes_gateway_when_none_found() {
            let dir = tempfile::tempdir().unwrap();
            let prober = stub_prober(&dir, "rtt min/avg/max/mdev = 0.5/1.0/1.5/0.2 ms");

            let mut table = DeviceTable::new();
            table.insert(
                Ipv4Addr::new(192, 168, 1, 10),
                device([192, 168, 1, 10], "core-sw", DeviceType::Switch),
            );
            let subnet: NetworkPrefix = "192.168.1.0/24".parse().unwrap();
            let summary = infrastructure_summary(&table, &prober, &subnet).await;
            assert_eq!(summary.total_devices, 2);
            assert_eq!(summary.devices[0].device_type, "Gateway");
            assert_eq!(summary.devices[0].ip, "192.168.1.1");
            assert_eq!(summary.devices[0].status, "active");
            assert_eq!(summary.devices[1].device_type, "Switch");
            assert_eq!(summary.devices[1].status, "active");
        }

        #[tokio::test]
        async fn gaming_probes_clusters_and_scans_table() {
            let dir = tempfile::tempdir().unwrap();
            let prober = stub_prober(&dir, "rtt min/avg/max/mdev = 5.0/10.0/15.0/1.0 ms");

            let clusters = GamingClusters {
                switch_cluster: vec![Ipv4Addr::new(10, 0, 0, 50)],
                ps5_cluster: vec![Ipv4Addr::new(10, 0, 0, 60)],
            };
            let mut table = DeviceTable::new();
            table.insert(
                Ipv4Addr::new(10, 0, 0, 70),
                device([10, 0, 0, 70], "Xbox Series X", DeviceType::Unknown),
            );
            // Already covered by the cluster list; must not be duplicated.
            table.insert(
                Ipv4Addr::new(10, 0, 0, 50),
                device([10, 0, 0, 50], "Nintendo Switch", DeviceType::Unknown),
            );

            let summary = gaming_summary(&table, &prober, &clusters).await;
            assert_eq!(summary.total_gaming_devices, 3);
            assert_eq!(summary.devices[0].device_type, "nintendo");
            assert_eq!(summary.devices[0].status, "optimal");
            assert_eq!(summary.devices[1].device_type, "playstation");
            let xbox = &summary.devices[2];
            assert_eq!(xbox.device_type, "other");
            assert_eq!(xbox.ping, 10.0);
        }
    }
}
