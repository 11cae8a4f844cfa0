//! Per-host telemetry collection: identity scalars, interface table walks,
//! vendor metrics. Each attribute is independently tolerant of failure; a
//! missing description excludes the host from the cycle entirely.

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::ber::{self, Value};
use crate::classify;
use crate::oids;
use crate::snmp::{SnmpClient, SnmpVersion};
use crate::types::{DeviceRecord, DeviceStatus, IfStatus, InterfaceSnapshot, MetricValue};

/// Cap on hosts collected simultaneously. Lower than the liveness cap since
/// each host fans out into a dozen sequential sub-queries.
pub const COLLECT_CONCURRENCY: usize = 10;

/// Transport settings for the management protocol.
#[derive(Debug, Clone)]
pub struct SnmpSettings {
    pub community: String,
    pub version: SnmpVersion,
    pub port: u16,
    pub timeout: Duration,
}

/// A fresh record plus the octet totals the rate engine needs.
#[derive(Debug)]
pub struct CollectedDevice {
    pub record: DeviceRecord,
    pub total_in: u64,
    pub total_out: u64,
}

/// Collect everything one host exposes. `None` when the host yields no
/// description (unsupported or unreachable at the management level, even
/// though it answered liveness).
pub async fn collect(ip: Ipv4Addr, snmp: &SnmpSettings) -> Option<CollectedDevice> {
    let target = SocketAddr::from((ip, snmp.port));
    let client = match SnmpClient::connect(target, &snmp.community, snmp.version, snmp.timeout).await
    {
        Ok(client) => client,
        Err(e) => {
            debug!("snmp socket for {ip} failed: {e}");
            return None;
        }
    };

    let description = client.get(oids::SYS_DESCR).await.and_then(|v| v.as_text())?;
    let enterprise_oid = match client.get(oids::SYS_OBJECT_ID).await {
        Some(Value::Oid(arcs)) => Some(ber::oid_to_string(&arcs)),
        _ => None,
    };
    let name = client
        .get(oids::SYS_NAME)
        .await
        .and_then(|v| v.as_text())
        .unwrap_or_else(|| ip.to_string());
    let uptime = client.get(oids::SYS_UPTIME).await.and_then(|v| v.as_u64()).map(|t| t.to_string());

    let class = classify::classify(Some(&description), enterprise_oid.as_deref());

    let tables = InterfaceTables::walk(&client).await;
    let (interfaces, total_in, total_out) = tables.join();

    let mut metrics = BTreeMap::new();
    for metric in oids::vendor_metrics(class.vendor) {
        if let Some(value) = client.get(metric.oid).await {
            if let Some(metric_value) = metric_value(&value) {
                metrics.insert(metric.name.to_string(), metric_value);
            }
        }
    }

    let record = DeviceRecord {
        ip,
        name,
        description,
        uptime,
        device_type: class.device_type,
        vendor: class.vendor,
        model: class.model,
        category: class.category,
        status: DeviceStatus::Online,
        last_seen: Utc::now().to_rfc3339(),
        interfaces,
        metrics,
    };
    Some(CollectedDevice { record, total_in, total_out })
}

/// The eight walked interface columns, joined on the indexes present in the
/// description column.
#[derive(Debug, Default)]
pub struct InterfaceTables {
    pub descr: BTreeMap<String, Value>,
    pub speed: BTreeMap<String, Value>,
    pub oper_status: BTreeMap<String, Value>,
    pub in_octets: BTreeMap<String, Value>,
    pub out_octets: BTreeMap<String, Value>,
    pub hc_in_octets: BTreeMap<String, Value>,
    pub hc_out_octets: BTreeMap<String, Value>,
    pub high_speed: BTreeMap<String, Value>,
}

impl InterfaceTables {
    pub async fn walk(client: &SnmpClient) -> Self {
        InterfaceTables {
            descr: client.walk(oids::IF_DESCR).await,
            speed: client.walk(oids::IF_SPEED).await,
            oper_status: client.walk(oids::IF_OPER_STATUS).await,
            in_octets: client.walk(oids::IF_IN_OCTETS).await,
            out_octets: client.walk(oids::IF_OUT_OCTETS).await,
            hc_in_octets: client.walk(oids::IF_HC_IN_OCTETS).await,
            hc_out_octets: client.walk(oids::IF_HC_OUT_OCTETS).await,
            high_speed: client.walk(oids::IF_HIGH_SPEED).await,
        }
    }

    /// Build one snapshot per row of the description column. High-capacity
    /// counters are preferred over the 32-bit ones; ifHighSpeed (Mbps) over
    /// the legacy speed column. Only interfaces that are operationally up
    /// contribute to the octet totals.
    pub fn join(&self) -> (Vec<InterfaceSnapshot>, u64, u64) {
        let mut rows: Vec<(&String, &Value)> = self.descr.iter().collect();
        rows.sort_by_key(|(index, _)| index.parse::<u64>().unwrap_or(u64::MAX));

        let mut interfaces = Vec::with_capacity(rows.len());
        let mut total_in = 0u64;
        let mut total_out = 0u64;
        for (index, descr) in rows {
            let in_octets = counter(&self.hc_in_octets, &self.in_octets, index);
            let out_octets = counter(&self.hc_out_octets, &self.out_octets, index);
            let speed = match self.high_speed.get(index).and_then(Value::as_u64) {
                Some(mbps) if mbps > 0 => mbps.saturating_mul(1_000_000),
                _ => self.speed.get(index).and_then(Value::as_u64).unwrap_or(0),
            };
            let status = if self.oper_status.get(index).and_then(Value::as_u64) == Some(1) {
                IfStatus::Up
            } else {
                IfStatus::Down
            };
            if status == IfStatus::Up {
                total_in = total_in.saturating_add(in_octets);
                total_out = total_out.saturating_add(out_octets);
            }
            interfaces.push(InterfaceSnapshot {
                index: index.clone(),
                name: descr.as_text().unwrap_or_default(),
                speed,
                status,
                in_octets,
                out_octets,
            });
        }
        (interfaces, total_in, total_out)
    }
}

fn counter(hc: &BTreeMap<String, Value>, standard: &BTreeMap<String, Value>, index: &str) -> u64 {
    hc.get(index)
        .and_then(Value::as_u64)
        .or_else(|| standard.get(index).and_then(Value::as_u64))
        .unwrap_or(0)
}

fn metric_value(value: &Value) -> Option<MetricValue> {
    match value {
        Value::Integer(v) => Some(MetricValue::Int(*v)),
        Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => {
            Some(MetricValue::Int(i64::from(*v)))
        }
        Value::Counter64(v) => Some(MetricValue::Int(i64::try_from(*v).unwrap_or(i64::MAX))),
        Value::OctetString(_) => value.as_text().map(MetricValue::Text),
        Value::Oid(arcs) => Some(MetricValue::Text(ber::oid_to_string(arcs))),
        Value::IpAddress(octets) => Some(MetricValue::Text(Ipv4Addr::from(*octets).to_string())),
        Value::Opaque(_)
        | Value::Null
        | Value::NoSuchObject
        | Value::NoSuchInstance
        | Value::EndOfMibView => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, Value)]) -> BTreeMap<String, Value> {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn join_prefers_high_capacity_counters_and_high_speed() {
        let tables = InterfaceTables {
            descr: table(&[("1", Value::OctetString(b"eth0".to_vec()))]),
            speed: table(&[("1", Value::Gauge32(100_000_000))]),
            oper_status: table(&[("1", Value::Integer(1))]),
            in_octets: table(&[("1", Value::Counter32(111))]),
            out_octets: table(&[("1", Value::Counter32(222))]),
            hc_in_octets: table(&[("1", Value::Counter64(10_000_000_000))]),
            hc_out_octets: table(&[("1", Value::Counter64(20_000_000_000))]),
            high_speed: table(&[("1", Value::Gauge32(10_000))]),
        };
        let (interfaces, total_in, total_out) = tables.join();
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].in_octets, 10_000_000_000);
        assert_eq!(interfaces[0].out_octets, 20_000_000_000);
        // 10_000 Mbps
        assert_eq!(interfaces[0].speed, 10_000_000_000);
        assert_eq!(interfaces[0].status, IfStatus::Up);
        assert_eq!(total_in, 10_000_000_000);
        assert_eq!(total_out, 20_000_000_000);
    }

    #[test]
    fn join_falls_back_to_legacy_columns() {
        let tables = InterfaceTables {
            descr: table(&[("2", Value::OctetString(b"eth1".to_vec()))]),
            speed: table(&[("2", Value::Gauge32(100_000_000))]),
            oper_status: table(&[("2", Value::Integer(1))]),
            in_octets: table(&[("2", Value::Counter32(111))]),
            out_octets: table(&[("2", Value::Counter32(222))]),
            // Zero ifHighSpeed means "use the legacy speed column".
            high_speed: table(&[("2", Value::Gauge32(0))]),
            ..Default::default()
        };
        let (interfaces, total_in, total_out) = tables.join();
        assert_eq!(interfaces[0].speed, 100_000_000);
        assert_eq!(interfaces[0].in_octets, 111);
        assert_eq!((total_in, total_out), (111, 222));
    }

    #[test]
    fn down_interfaces_are_listed_but_excluded_from_totals() {
        let tables = InterfaceTables {
            descr: table(&[
                ("1", Value::OctetString(b"up0".to_vec())),
                ("2", Value::OctetString(b"down0".to_vec())),
                ("3", Value::OctetString(b"nostatus0".to_vec())),
            ]),
            oper_status: table(&[("1", Value::Integer(1)), ("2", Value::Integer(2))]),
            in_octets: table(&[
                ("1", Value::Counter32(100)),
                ("2", Value::Counter32(1000)),
                ("3", Value::Counter32(10000)),
            ]),
            out_octets: table(&[
                ("1", Value::Counter32(200)),
                ("2", Value::Counter32(2000)),
                ("3", Value::Counter32(20000)),
            ]),
            ..Default::default()
        };
        let (interfaces, total_in, total_out) = tables.join();
        assert_eq!(interfaces.len(), 3);
        assert_eq!(interfaces[0].status, IfStatus::Up);
        assert_eq!(interfaces[1].status, IfStatus::Down);
        // Absent status defaults to down.
        assert_eq!(interfaces[2].status, IfStatus::Down);
        assert_eq!((total_in, total_out), (100, 200));
    }

    #[test]
    fn join_orders_rows_by_numeric_index() {
        let tables = InterfaceTables {
            descr: table(&[
                ("10", Value::OctetString(b"ten".to_vec())),
                ("2", Value::OctetString(b"two".to_vec())),
            ]),
            ..Default::default()
        };
        let (interfaces, _, _) = tables.join();
        assert_eq!(interfaces[0].index, "2");
        assert_eq!(interfaces[1].index, "10");
    }

    #[test]
    fn metric_values_from_snmp_values() {
        assert_eq!(metric_value(&Value::Integer(87)), Some(MetricValue::Int(87)));
        assert_eq!(metric_value(&Value::Gauge32(5)), Some(MetricValue::Int(5)));
        assert_eq!(
            metric_value(&Value::OctetString(b"ap-lobby".to_vec())),
            Some(MetricValue::Text("ap-lobby".into()))
        );
        assert_eq!(metric_value(&Value::OctetString(b"".to_vec())), None);
        assert_eq!(metric_value(&Value::Null), None);
    }
}
