//! The OID table: symbolic names for every object the collector queries.
//! Standard MIB-II identifiers plus per-vendor metric tables. Extending
//! coverage means adding a constant or a table row here, nothing else.

use crate::types::Vendor;

// system group (scalar gets)
pub const SYS_DESCR: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 1, 0];
pub const SYS_OBJECT_ID: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 2, 0];
pub const SYS_UPTIME: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 3, 0];
pub const SYS_NAME: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 5, 0];

// interface table columns (walks), keyed by ifIndex
pub const IF_DESCR: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 2];
pub const IF_SPEED: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 5];
pub const IF_OPER_STATUS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 8];
pub const IF_IN_OCTETS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 10];
pub const IF_IN_ERRORS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 14];
pub const IF_OUT_OCTETS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 16];
pub const IF_OUT_ERRORS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 20];

// high-capacity columns, preferred for >= 1 Gbps interfaces
pub const IF_HC_IN_OCTETS: &[u32] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 6];
pub const IF_HC_OUT_OCTETS: &[u32] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 10];
/// Interface speed in Mbps.
pub const IF_HIGH_SPEED: &[u32] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 15];

/// One vendor-specific scalar metric: the name it is published under and
/// the OID to get.
pub struct VendorMetric {
    pub name: &'static str,
    pub oid: &'static [u32],
}

const CISCO_METRICS: &[VendorMetric] = &[
    VendorMetric { name: "cpuUsage", oid: &[1, 3, 6, 1, 4, 1, 9, 2, 1, 56, 0] },
    VendorMetric { name: "memoryUsed", oid: &[1, 3, 6, 1, 4, 1, 9, 9, 48, 1, 1, 1, 5, 1] },
    VendorMetric { name: "memoryFree", oid: &[1, 3, 6, 1, 4, 1, 9, 9, 48, 1, 1, 1, 6, 1] },
];

const UBIQUITI_METRICS: &[VendorMetric] = &[
    VendorMetric { name: "unifiApName", oid: &[1, 3, 6, 1, 4, 1, 41112, 1, 6, 1, 2, 1, 6] },
    VendorMetric { name: "unifiApClients", oid: &[1, 3, 6, 1, 4, 1, 41112, 1, 6, 1, 2, 1, 8] },
    VendorMetric { name: "unifiApChannel", oid: &[1, 3, 6, 1, 4, 1, 41112, 1, 6, 1, 2, 1, 4] },
];

const NETGEAR_METRICS: &[VendorMetric] = &[
    VendorMetric { name: "switchModel", oid: &[1, 3, 6, 1, 4, 1, 4526, 11, 1, 1, 1, 3, 0] },
    VendorMetric { name: "cpuUsage", oid: &[1, 3, 6, 1, 4, 1, 4526, 11, 1, 1, 4, 9, 0] },
];

// MikroTik exposes these through the standard host-resources tree.
const MIKROTIK_METRICS: &[VendorMetric] = &[
    VendorMetric { name: "cpuLoad", oid: &[1, 3, 6, 1, 2, 1, 25, 3, 3, 1, 2, 1] },
    VendorMetric { name: "totalMemory", oid: &[1, 3, 6, 1, 2, 1, 25, 2, 3, 1, 5, 65536] },
    VendorMetric { name: "usedMemory", oid: &[1, 3, 6, 1, 2, 1, 25, 2, 3, 1, 6, 65536] },
];

/// Vendor-specific metrics to get once a device has been classified.
/// Vendors without a table contribute no metrics.
pub fn vendor_metrics(vendor: Vendor) -> &'static [VendorMetric] {
    match vendor {
        Vendor::Cisco => CISCO_METRICS,
        Vendor::Ubiquiti => UBIQUITI_METRICS,
        Vendor::Netgear => NETGEAR_METRICS,
        Vendor::Mikrotik => MIKROTIK_METRICS,
        Vendor::Linux | Vendor::Windows | Vendor::BsdFirewall | Vendor::Unknown => &[],
    }
}
