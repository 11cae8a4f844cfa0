//! Community-authenticated SNMP v1/v2c client: scalar GET and GETNEXT
//! table-walks over UDP, one retry, per-request timeout. Every failure mode
//! resolves to "no data" -- callers never see a transport error.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::{timeout, Instant};
use tracing::trace;

use crate::ber::{self, Message, Value, TAG_GET_NEXT_REQUEST, TAG_GET_REQUEST, TAG_GET_RESPONSE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnmpVersion {
    V1,
    V2c,
}

impl SnmpVersion {
    fn wire(self) -> i64 {
        match self {
            SnmpVersion::V1 => 0,
            SnmpVersion::V2c => 1,
        }
    }
}

const RETRIES: u32 = 1;
// Backstop against agents with broken GETNEXT ordering.
const MAX_WALK_ROWS: usize = 4096;

static NEXT_REQUEST_ID: AtomicI32 = AtomicI32::new(1);

pub struct SnmpClient {
    socket: UdpSocket,
    community: String,
    version: SnmpVersion,
    timeout: Duration,
}

impl SnmpClient {
    pub async fn connect(
        target: SocketAddr,
        community: &str,
        version: SnmpVersion,
        timeout: Duration,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(target).await?;
        Ok(SnmpClient { socket, community: community.to_string(), version, timeout })
    }

    /// Scalar GET. `None` on timeout, agent error, or an empty-ish value.
    pub async fn get(&self, oid: &[u32]) -> Option<Value> {
        let (_oid, value) = self.request(TAG_GET_REQUEST, oid).await?;
        match value {
            Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => None,
            value => Some(value),
        }
    }

    /// GETNEXT walk over one table column. Rows are keyed by the trailing
    /// component of each returned OID. Errors end the walk; whatever was
    /// retrieved so far is returned.
    pub async fn walk(&self, base: &[u32]) -> BTreeMap<String, Value> {
        let mut rows = BTreeMap::new();
        let mut cursor = base.to_vec();
        while rows.len() < MAX_WALK_ROWS {
            let Some((oid, value)) = self.request(TAG_GET_NEXT_REQUEST, &cursor).await else {
                break;
            };
            if oid == cursor || !oid.starts_with(base) {
                break;
            }
            if matches!(value, Value::EndOfMibView) {
                break;
            }
            if let Some(index) = oid.last() {
                rows.insert(index.to_string(), value);
            }
            cursor = oid;
        }
        rows
    }

    async fn request(&self, pdu_type: u8, oid: &[u32]) -> Option<(Vec<u32>, Value)> {
        let request_id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        let packet = ber::encode(&Message {
            version: self.version.wire(),
            community: self.community.clone().into_bytes(),
            pdu_type,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds: vec![(oid.to_vec(), Value::Null)],
        });

        let mut buf = vec![0u8; 4096];
        for attempt in 0..=RETRIES {
            if self.socket.send(&packet).await.is_err() {
                continue;
            }
            let deadline = Instant::now() + self.timeout;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    trace!(attempt, "snmp request timed out");
                    break;
                }
                let n = match timeout(remaining, self.socket.recv(&mut buf)).await {
                    Ok(Ok(n)) => n,
                    Ok(Err(_)) | Err(_) => {
                        trace!(attempt, "snmp receive failed");
                        break;
                    }
                };
                let Ok(reply) = ber::decode(&buf[..n]) else {
                    continue;
                };
                // Stale or foreign replies keep the deadline running.
                if reply.pdu_type != TAG_GET_RESPONSE || reply.request_id != request_id {
                    continue;
                }
                if reply.error_status != 0 {
                    return None;
                }
                return reply.varbinds.into_iter().next();
            }
        }
        None
    }
}
