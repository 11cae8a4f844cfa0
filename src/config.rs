//! Layered configuration: built-in defaults, then environment, then an
//! optional JSON config file, then CLI flags, in increasing precedence.
//! Malformed input fails fast at startup; the scan loop never starts.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Deserialize;

use crate::aggregate::GamingClusters;
use crate::collector::SnmpSettings;
use crate::snmp::SnmpVersion;
use crate::subnet::NetworkPrefix;

pub const ENV_API_URL: &str = "LANPULSE_API_URL";
pub const ENV_API_KEY: &str = "LANPULSE_API_KEY";

const DEFAULT_API_URL: &str = "http://127.0.0.1:54321/functions/v1";
const DEFAULT_COMMUNITY: &str = "public";
const DEFAULT_INTERVAL_SECS: u64 = 30;
const DEFAULT_TIMEOUT_SECS: u64 = 2;
const DEFAULT_SNMP_PORT: u16 = 161;

#[derive(Parser, Debug, Default)]
#[command(name = "lanpulse", version, about = "LAN discovery and SNMP telemetry poller")]
pub struct Cli {
    /// Network prefix to scan, e.g. 192.168.1.0/24 (auto-detected when omitted)
    #[arg(long)]
    pub subnet: Option<String>,

    /// SNMP community string
    #[arg(long)]
    pub community: Option<String>,

    /// Seconds between scan cycles
    #[arg(long)]
    pub interval: Option<u64>,

    /// Run exactly one cycle and print the report as JSON
    #[arg(long)]
    pub once: bool,

    /// Base URL of the ingestion API
    #[arg(long)]
    pub api_url: Option<String>,

    /// API key sent as bearer token and apikey header
    #[arg(long)]
    pub api_key: Option<String>,

    /// Path to a JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Recognized keys of the JSON config file. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api_url: Option<String>,
    api_key: Option<String>,
    snmp_community: Option<String>,
    snmp_version: Option<u8>,
    snmp_port: Option<u16>,
    scan_interval: Option<u64>,
    timeout: Option<u64>,
    subnet: Option<String>,
    gaming_devices: Option<GamingClusters>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_key: String,
    pub snmp: SnmpSettings,
    pub scan_interval: Duration,
    pub subnet: Option<NetworkPrefix>,
    pub gaming: GamingClusters,
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Config> {
        // Defaults.
        let mut api_url = DEFAULT_API_URL.to_string();
        let mut api_key = String::new();
        let mut community = DEFAULT_COMMUNITY.to_string();
        let mut version: u8 = 2;
        let mut port = DEFAULT_SNMP_PORT;
        let mut interval = DEFAULT_INTERVAL_SECS;
        let mut timeout = DEFAULT_TIMEOUT_SECS;
        let mut subnet: Option<String> = None;
        let mut gaming = GamingClusters::default();

        // Environment.
        if let Ok(v) = std::env::var(ENV_API_URL) {
            api_url = v;
        }
        if let Ok(v) = std::env::var(ENV_API_KEY) {
            api_key = v;
        }

        // Config file.
        if let Some(path) = &cli.config {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            let file: FileConfig = serde_json::from_str(&raw)
                .with_context(|| format!("parsing config file {}", path.display()))?;
            if let Some(v) = file.api_url {
                api_url = v;
            }
            if let Some(v) = file.api_key {
                api_key = v;
            }
            if let Some(v) = file.snmp_community {
                community = v;
            }
            if let Some(v) = file.snmp_version {
                version = v;
            }
            if let Some(v) = file.snmp_port {
                port = v;
            }
            if let Some(v) = file.scan_interval {
                interval = v;
            }
            if let Some(v) = file.timeout {
                timeout = v;
            }
            if let Some(v) = file.subnet {
                subnet = Some(v);
            }
            if let Some(v) = file.gaming_devices {
                gaming = v;
            }
        }

        // CLI flags win.
        if let Some(v) = &cli.api_url {
            api_url = v.clone();
        }
        if let Some(v) = &cli.api_key {
            api_key = v.clone();
        }
        if let Some(v) = &cli.community {
            community = v.clone();
        }
        if let Some(v) = cli.interval {
            interval = v;
        }
        if let Some(v) = &cli.subnet {
            subnet = Some(v.clone());
        }

        let version = match version {
            1 => SnmpVersion::V1,
            2 => SnmpVersion::V2c,
            other => bail!("snmp_version must be 1 or 2, got {other}"),
        };
        let subnet = subnet
            .map(|s| s.parse::<NetworkPrefix>())
            .transpose()
            .context("invalid subnet")?;

        Ok(Config {
            api_url,
            api_key,
            snmp: SnmpSettings {
                community,
                version,
                port,
                timeout: Duration::from_secs(timeout),
            },
            scan_interval: Duration::from_secs(interval),
            subnet,
            gaming,
        })
    }
}
