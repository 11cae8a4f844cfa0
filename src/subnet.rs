//! Network prefix parsing and host enumeration.

use std::fmt;
use std::net::{Ipv4Addr, UdpSocket};
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrefixError {
    #[error("invalid network prefix {0:?}: expected A.B.C.D/N with N in 0..=32")]
    InvalidPrefix(String),
}

/// An IPv4 network in CIDR notation, e.g. `192.168.1.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkPrefix {
    network: u32,
    prefix_len: u8,
}

impl FromStr for NetworkPrefix {
    type Err = PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PrefixError::InvalidPrefix(s.to_string());
        let (addr, len) = s.split_once('/').ok_or_else(err)?;
        let addr: Ipv4Addr = addr.parse().map_err(|_| err())?;
        let prefix_len: u8 = len.parse().map_err(|_| err())?;
        if prefix_len > 32 {
            return Err(err());
        }
        let mask = (!0u32).checked_shl(u32::from(32 - prefix_len)).unwrap_or(0);
        Ok(NetworkPrefix {
            network: u32::from(addr) & mask,
            prefix_len,
        })
    }
}

impl fmt::Display for NetworkPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", Ipv4Addr::from(self.network), self.prefix_len)
    }
}

impl NetworkPrefix {
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.network)
    }

    /// Conventional gateway address: the network with the host part forced to 1.
    pub fn gateway(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.network | 1)
    }

    /// Number of usable host addresses (network and broadcast excluded).
    /// Zero for /31 and /32.
    pub fn host_count(&self) -> u64 {
        (1u64 << (32 - self.prefix_len)).saturating_sub(2)
    }

    /// Usable host addresses, ascending from network+1.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        let base = self.network;
        (1..=self.host_count()).map(move |i| Ipv4Addr::from(base.wrapping_add(i as u32)))
    }
}

const FALLBACK_SUBNET: NetworkPrefix = NetworkPrefix {
    // 192.168.1.0/24
    network: u32::from_be_bytes([192, 168, 1, 0]),
    prefix_len: 24,
};

/// Guess the local /24 by reading the source address a UDP socket would use
/// toward a public host (no packet is sent). Falls back to 192.168.1.0/24.
pub fn detect_local_subnet() -> NetworkPrefix {
    match local_source_addr() {
        Some(ip) => {
            let o = ip.octets();
            NetworkPrefix {
                network: u32::from_be_bytes([o[0], o[1], o[2], 0]),
                prefix_len: 24,
            }
        }
        None => {
            warn!("could not detect local network, falling back to {FALLBACK_SUBNET}");
            FALLBACK_SUBNET
        }
    }
}

fn local_source_addr() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    match socket.local_addr().ok()? {
        std::net::SocketAddr::V4(v4) => Some(*v4.ip()),
        _ => None,
    }
}
