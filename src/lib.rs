//! lanpulse: LAN discovery and SNMP telemetry polling engine.
//!
//! One scan cycle enumerates a network prefix, probes the candidates for
//! liveness, collects identity and interface counters from each live host
//! over SNMP, derives bandwidth from the previous cycle's counters, and
//! folds the resulting device table into publish-ready summaries.

pub mod aggregate;
pub mod ber;
pub mod classify;
pub mod collector;
pub mod config;
pub mod oids;
pub mod probe;
pub mod publish;
pub mod rates;
pub mod scanner;
pub mod snmp;
pub mod subnet;
pub mod types;
