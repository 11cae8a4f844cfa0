//! Device table model: records, interfaces, metrics, latency results.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use serde::Serialize;

/// Vendor tag derived from the identity string or enterprise OID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    Cisco,
    Ubiquiti,
    Netgear,
    Mikrotik,
    Linux,
    Windows,
    BsdFirewall,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Switch,
    Router,
    AccessPoint,
    Firewall,
    Printer,
    Storage,
    Server,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Infrastructure,
    Server,
    Other,
}

/// The collector only ever assigns `Online`; warning/offline are derived
/// live from latency probes when summaries are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Online,
    Warning,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IfStatus {
    Up,
    Down,
}

/// One row of the interface table, rebuilt from scratch every cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceSnapshot {
    pub index: String,
    pub name: String,
    /// Bits per second; 0 when the agent does not report a speed.
    pub speed: u64,
    pub status: IfStatus,
    pub in_octets: u64,
    pub out_octets: u64,
}

/// Per-device bandwidth figures derived from successive octet totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bandwidth {
    pub in_bps: f64,
    pub out_bps: f64,
    pub in_mbps: f64,
    pub out_mbps: f64,
}

/// Value of one entry in a device's metrics map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Bandwidth(Bandwidth),
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetricValue::Int(v) => Some(*v),
            MetricValue::Float(v) => Some(*v as i64),
            MetricValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
            }
            MetricValue::Bandwidth(_) => None,
        }
    }

    pub fn bandwidth(&self) -> Option<&Bandwidth> {
        match self {
            MetricValue::Bandwidth(bw) => Some(bw),
            _ => None,
        }
    }
}

/// Everything known about one host after a collection pass.
///
/// Records are whole-record replacements: a new cycle builds a fresh record
/// (or none, if the host stopped answering) and the old one is dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRecord {
    pub ip: Ipv4Addr,
    pub name: String,
    pub description: String,
    pub uptime: Option<String>,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub vendor: Vendor,
    /// First 50 characters of the raw description.
    pub model: String,
    pub category: Category,
    pub status: DeviceStatus,
    pub last_seen: String,
    pub interfaces: Vec<InterfaceSnapshot>,
    pub metrics: BTreeMap<String, MetricValue>,
}

/// Keyed by address; `Ipv4Addr`'s ordering is the numeric octet-tuple order,
/// so iteration is already in the required sort order.
pub type DeviceTable = BTreeMap<Ipv4Addr, DeviceRecord>;

/// Round-trip statistics from an echo probe. Recomputed on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyResult {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    /// Packet loss percentage, 0-100.
    pub loss: f64,
}

impl LatencyResult {
    /// Sentinel for transport or parse failure: fully unreachable.
    pub const UNREACHABLE: LatencyResult = LatencyResult {
        min: 0.0,
        avg: 0.0,
        max: 0.0,
        loss: 100.0,
    };
}
