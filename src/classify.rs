//! Device classification from identity strings.
//!
//! Matching is case-insensitive substring search over two ordered rule
//! tables, first match wins. New vendors or device types are row additions,
//! not new control flow.

use crate::types::{Category, DeviceType, Vendor};

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub vendor: Vendor,
    pub device_type: DeviceType,
    pub category: Category,
    /// First 50 characters of the raw description; empty when absent.
    pub model: String,
}

struct VendorRule {
    keywords: &'static [&'static str],
    /// Enterprise OID prefix that also identifies the vendor.
    enterprise: Option<&'static str>,
    vendor: Vendor,
}

const VENDOR_RULES: &[VendorRule] = &[
    VendorRule { keywords: &["cisco"], enterprise: Some("1.3.6.1.4.1.9."), vendor: Vendor::Cisco },
    VendorRule {
        keywords: &["ubiquiti", "unifi"],
        enterprise: Some("1.3.6.1.4.1.41112."),
        vendor: Vendor::Ubiquiti,
    },
    VendorRule {
        keywords: &["netgear"],
        enterprise: Some("1.3.6.1.4.1.4526."),
        vendor: Vendor::Netgear,
    },
    VendorRule { keywords: &["mikrotik", "routeros"], enterprise: None, vendor: Vendor::Mikrotik },
    VendorRule { keywords: &["linux"], enterprise: None, vendor: Vendor::Linux },
    VendorRule { keywords: &["windows"], enterprise: None, vendor: Vendor::Windows },
    VendorRule {
        keywords: &["freebsd", "pfsense", "opnsense"],
        enterprise: None,
        vendor: Vendor::BsdFirewall,
    },
];

struct TypeRule {
    keywords: &'static [&'static str],
    device_type: DeviceType,
    category: Category,
}

const TYPE_RULES: &[TypeRule] = &[
    TypeRule {
        keywords: &["switch", "switching"],
        device_type: DeviceType::Switch,
        category: Category::Infrastructure,
    },
    TypeRule {
        keywords: &["router", "routing", "gateway"],
        device_type: DeviceType::Router,
        category: Category::Infrastructure,
    },
    TypeRule {
        keywords: &["access point", "wireless", "wifi", "ap", "unifi"],
        device_type: DeviceType::AccessPoint,
        category: Category::Infrastructure,
    },
    TypeRule {
        keywords: &["firewall", "pfsense", "opnsense", "fortigate"],
        device_type: DeviceType::Firewall,
        category: Category::Infrastructure,
    },
    TypeRule {
        keywords: &["printer", "print"],
        device_type: DeviceType::Printer,
        category: Category::Other,
    },
    TypeRule {
        keywords: &["nas", "storage", "synology", "qnap"],
        device_type: DeviceType::Storage,
        category: Category::Server,
    },
];

/// Classify a device from its free-text description and enterprise OID.
/// Pure: identical inputs always yield identical results.
pub fn classify(description: Option<&str>, enterprise_oid: Option<&str>) -> Classification {
    let description = description.unwrap_or("");
    let lower = description.to_lowercase();
    let oid = enterprise_oid.unwrap_or("");

    let vendor = VENDOR_RULES
        .iter()
        .find(|r| {
            r.keywords.iter().any(|k| lower.contains(k))
                || r.enterprise.is_some_and(|p| oid.starts_with(p))
        })
        .map(|r| r.vendor)
        .unwrap_or(Vendor::Unknown);

    let (device_type, category) = TYPE_RULES
        .iter()
        .find(|r| r.keywords.iter().any(|k| lower.contains(k)))
        .map(|r| (r.device_type, r.category))
        .unwrap_or_else(|| {
            if lower.contains("linux") || lower.contains("windows") {
                (DeviceType::Server, Category::Server)
            } else {
                (DeviceType::Unknown, Category::Other)
            }
        });

    Classification { vendor, device_type, category, model: description.chars().take(50).collect() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cisco_switch_from_description() {
        let c = classify(Some("Cisco IOS Software, Catalyst Switch"), None);
        assert_eq!(c.vendor, Vendor::Cisco);
        assert_eq!(c.device_type, DeviceType::Switch);
        assert_eq!(c.category, Category::Infrastructure);
    }

    #[test]
    fn vendor_from_enterprise_prefix_alone() {
        let c = classify(Some("L2 Managed Switch"), Some("1.3.6.1.4.1.4526.100.2.1"));
        assert_eq!(c.vendor, Vendor::Netgear);
        let c = classify(Some(""), Some("1.3.6.1.4.1.9.1.1208"));
        assert_eq!(c.vendor, Vendor::Cisco);
    }

    #[test]
    fn priority_order_is_deterministic() {
        // Switch keywords are checked before router keywords.
        let c = classify(Some("Combined switch and router appliance"), None);
        assert_eq!(c.device_type, DeviceType::Switch);
        // Same inputs, same output.
        let again = classify(Some("Combined switch and router appliance"), None);
        assert_eq!(c, again);
    }

    #[test]
    fn linux_without_type_keywords_is_a_server() {
        let c = classify(Some("Linux debian 6.1.0 x86_64"), None);
        assert_eq!(c.vendor, Vendor::Linux);
        assert_eq!(c.device_type, DeviceType::Server);
        assert_eq!(c.category, Category::Server);
    }

    #[test]
    fn unknown_when_nothing_matches() {
        let c = classify(Some("mystery box"), None);
        assert_eq!(c.vendor, Vendor::Unknown);
        assert_eq!(c.device_type, DeviceType::Unknown);
        assert_eq!(c.category, Category::Other);
    }

    #[test]
    fn model_is_first_fifty_chars_of_raw_description() {
        let long = "X".repeat(80);
        assert_eq!(classify(Some(&long), None).model.len(), 50);
        assert_eq!(classify(None, None).model, "");
        // Case is preserved even though matching lower-cases.
        assert_eq!(classify(Some("MikroTik RouterOS"), None).model, "MikroTik RouterOS");
    }
}
