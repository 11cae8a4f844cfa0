//! BER codec for the SNMP v1/v2c message subset the collector speaks:
//! GET / GETNEXT requests out, GET-RESPONSE in. Definite lengths only,
//! single varbind per request, any number per response.

use thiserror::Error;

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;
pub const TAG_IP_ADDRESS: u8 = 0x40;
pub const TAG_COUNTER32: u8 = 0x41;
pub const TAG_GAUGE32: u8 = 0x42;
pub const TAG_TIMETICKS: u8 = 0x43;
pub const TAG_OPAQUE: u8 = 0x44;
pub const TAG_COUNTER64: u8 = 0x46;
pub const TAG_NO_SUCH_OBJECT: u8 = 0x80;
pub const TAG_NO_SUCH_INSTANCE: u8 = 0x81;
pub const TAG_END_OF_MIB_VIEW: u8 = 0x82;
pub const TAG_GET_REQUEST: u8 = 0xA0;
pub const TAG_GET_NEXT_REQUEST: u8 = 0xA1;
pub const TAG_GET_RESPONSE: u8 = 0xA2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BerError {
    #[error("truncated message")]
    Truncated,
    #[error("unexpected tag {0:#04x}")]
    UnexpectedTag(u8),
    #[error("unsupported length encoding")]
    BadLength,
    #[error("integer out of range")]
    IntegerRange,
    #[error("invalid object identifier")]
    InvalidOid,
}

/// A decoded SNMP variable binding value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    OctetString(Vec<u8>),
    Oid(Vec<u32>),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Opaque(Vec<u8>),
    Counter64(u64),
    Null,
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl Value {
    /// Numeric view used for counters, speeds and status codes.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Integer(v) if *v >= 0 => Some(*v as u64),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(u64::from(*v)),
            Value::Counter64(v) => Some(*v),
            _ => None,
        }
    }

    /// Textual view of an octet string; trimmed, `None` when empty.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::OctetString(bytes) => {
                let text = String::from_utf8_lossy(bytes).trim().to_string();
                (!text.is_empty()).then_some(text)
            }
            _ => None,
        }
    }
}

pub fn oid_to_string(arcs: &[u32]) -> String {
    arcs.iter().map(u32::to_string).collect::<Vec<_>>().join(".")
}

/// One SNMP message, request or response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Wire value: 0 for v1, 1 for v2c.
    pub version: i64,
    pub community: Vec<u8>,
    pub pdu_type: u8,
    pub request_id: i32,
    pub error_status: i64,
    pub error_index: i64,
    pub varbinds: Vec<(Vec<u32>, Value)>,
}

// ---------- encoding ----------

fn push_len(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let mut tmp = [0u8; 8];
    let mut n = 0;
    let mut v = len;
    while v > 0 {
        tmp[n] = (v & 0xff) as u8;
        v >>= 8;
        n += 1;
    }
    out.push(0x80 | n as u8);
    for i in (0..n).rev() {
        out.push(tmp[i]);
    }
}

fn push_tlv(out: &mut Vec<u8>, tag: u8, content: &[u8]) {
    out.push(tag);
    push_len(out, content.len());
    out.extend_from_slice(content);
}

/// Minimal two's-complement encoding.
fn encode_integer(v: i64) -> Vec<u8> {
    let bytes = v.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let cur = bytes[start];
        let next_high = bytes[start + 1] & 0x80;
        if (cur == 0x00 && next_high == 0) || (cur == 0xff && next_high != 0) {
            start += 1;
        } else {
            break;
        }
    }
    bytes[start..].to_vec()
}

/// Unsigned counters: minimal bytes, zero-padded when the high bit is set.
fn encode_unsigned(v: u64) -> Vec<u8> {
    let bytes = v.to_be_bytes();
    let mut start = 0;
    while start < 7 && bytes[start] == 0 {
        start += 1;
    }
    let mut out = Vec::with_capacity(9);
    if bytes[start] & 0x80 != 0 {
        out.push(0);
    }
    out.extend_from_slice(&bytes[start..]);
    out
}

fn push_subid(out: &mut Vec<u8>, mut v: u32) {
    let mut tmp = [0u8; 5];
    let mut n = 0;
    loop {
        tmp[n] = (v & 0x7f) as u8;
        v >>= 7;
        n += 1;
        if v == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let mut b = tmp[i];
        if i != 0 {
            b |= 0x80;
        }
        out.push(b);
    }
}

fn encode_oid(arcs: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    let first = arcs.first().copied().unwrap_or(0);
    let second = arcs.get(1).copied().unwrap_or(0);
    push_subid(&mut out, first * 40 + second);
    if arcs.len() > 2 {
        for &arc in &arcs[2..] {
            push_subid(&mut out, arc);
        }
    }
    out
}

fn push_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(v) => push_tlv(out, TAG_INTEGER, &encode_integer(*v)),
        Value::OctetString(b) => push_tlv(out, TAG_OCTET_STRING, b),
        Value::Oid(arcs) => push_tlv(out, TAG_OID, &encode_oid(arcs)),
        Value::IpAddress(octets) => push_tlv(out, TAG_IP_ADDRESS, octets),
        Value::Counter32(v) => push_tlv(out, TAG_COUNTER32, &encode_unsigned(u64::from(*v))),
        Value::Gauge32(v) => push_tlv(out, TAG_GAUGE32, &encode_unsigned(u64::from(*v))),
        Value::TimeTicks(v) => push_tlv(out, TAG_TIMETICKS, &encode_unsigned(u64::from(*v))),
        Value::Opaque(b) => push_tlv(out, TAG_OPAQUE, b),
        Value::Counter64(v) => push_tlv(out, TAG_COUNTER64, &encode_unsigned(*v)),
        Value::Null => push_tlv(out, TAG_NULL, &[]),
        Value::NoSuchObject => push_tlv(out, TAG_NO_SUCH_OBJECT, &[]),
        Value::NoSuchInstance => push_tlv(out, TAG_NO_SUCH_INSTANCE, &[]),
        Value::EndOfMibView => push_tlv(out, TAG_END_OF_MIB_VIEW, &[]),
    }
}

pub fn encode(msg: &Message) -> Vec<u8> {
    let mut varbinds = Vec::new();
    for (oid, value) in &msg.varbinds {
        let mut vb = Vec::new();
        push_tlv(&mut vb, TAG_OID, &encode_oid(oid));
        push_value(&mut vb, value);
        push_tlv(&mut varbinds, TAG_SEQUENCE, &vb);
    }
    let mut pdu = Vec::new();
    push_tlv(&mut pdu, TAG_INTEGER, &encode_integer(i64::from(msg.request_id)));
    push_tlv(&mut pdu, TAG_INTEGER, &encode_integer(msg.error_status));
    push_tlv(&mut pdu, TAG_INTEGER, &encode_integer(msg.error_index));
    push_tlv(&mut pdu, TAG_SEQUENCE, &varbinds);
    let mut body = Vec::new();
    push_tlv(&mut body, TAG_INTEGER, &encode_integer(msg.version));
    push_tlv(&mut body, TAG_OCTET_STRING, &msg.community);
    push_tlv(&mut body, msg.pdu_type, &pdu);
    let mut out = Vec::new();
    push_tlv(&mut out, TAG_SEQUENCE, &body);
    out
}

// ---------- decoding ----------

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn byte(&mut self) -> Result<u8, BerError> {
        let b = *self.buf.get(self.pos).ok_or(BerError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], BerError> {
        if self.remaining() < n {
            return Err(BerError::Truncated);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn length(&mut self) -> Result<usize, BerError> {
        let b = self.byte()?;
        if b & 0x80 == 0 {
            return Ok(b as usize);
        }
        let n = (b & 0x7f) as usize;
        if n == 0 || n > 4 {
            return Err(BerError::BadLength);
        }
        let mut len = 0usize;
        for _ in 0..n {
            len = (len << 8) | self.byte()? as usize;
        }
        Ok(len)
    }

    fn tlv(&mut self) -> Result<(u8, &'a [u8]), BerError> {
        let tag = self.byte()?;
        let len = self.length()?;
        Ok((tag, self.take(len)?))
    }

    fn expect(&mut self, tag: u8) -> Result<&'a [u8], BerError> {
        let (t, content) = self.tlv()?;
        if t != tag {
            return Err(BerError::UnexpectedTag(t));
        }
        Ok(content)
    }
}

fn decode_integer(content: &[u8]) -> Result<i64, BerError> {
    if content.is_empty() || content.len() > 8 {
        return Err(BerError::IntegerRange);
    }
    let mut v: i64 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    for &b in content {
        v = (v << 8) | i64::from(b);
    }
    Ok(v)
}

fn decode_unsigned(content: &[u8]) -> Result<u64, BerError> {
    let mut s = content;
    while s.len() > 1 && s[0] == 0 {
        s = &s[1..];
    }
    if s.is_empty() || s.len() > 8 {
        return Err(BerError::IntegerRange);
    }
    let mut v = 0u64;
    for &b in s {
        v = (v << 8) | u64::from(b);
    }
    Ok(v)
}

fn decode_u32(content: &[u8]) -> Result<u32, BerError> {
    u32::try_from(decode_unsigned(content)?).map_err(|_| BerError::IntegerRange)
}

fn decode_oid(content: &[u8]) -> Result<Vec<u32>, BerError> {
    if content.is_empty() {
        return Err(BerError::InvalidOid);
    }
    let mut arcs = Vec::new();
    let mut cur: u32 = 0;
    let mut first = true;
    let mut in_subid = false;
    for &b in content {
        if cur & 0xfe00_0000 != 0 {
            return Err(BerError::InvalidOid);
        }
        cur = (cur << 7) | u32::from(b & 0x7f);
        in_subid = b & 0x80 != 0;
        if !in_subid {
            if first {
                let head = if cur < 40 {
                    0
                } else if cur < 80 {
                    1
                } else {
                    2
                };
                arcs.push(head);
                arcs.push(cur - head * 40);
                first = false;
            } else {
                arcs.push(cur);
            }
            cur = 0;
        }
    }
    if in_subid {
        return Err(BerError::InvalidOid);
    }
    Ok(arcs)
}

fn decode_value(tag: u8, content: &[u8]) -> Result<Value, BerError> {
    match tag {
        TAG_INTEGER => Ok(Value::Integer(decode_integer(content)?)),
        TAG_OCTET_STRING => Ok(Value::OctetString(content.to_vec())),
        TAG_NULL => Ok(Value::Null),
        TAG_OID => Ok(Value::Oid(decode_oid(content)?)),
        TAG_IP_ADDRESS => {
            let octets: [u8; 4] = content.try_into().map_err(|_| BerError::IntegerRange)?;
            Ok(Value::IpAddress(octets))
        }
        TAG_COUNTER32 => Ok(Value::Counter32(decode_u32(content)?)),
        TAG_GAUGE32 => Ok(Value::Gauge32(decode_u32(content)?)),
        TAG_TIMETICKS => Ok(Value::TimeTicks(decode_u32(content)?)),
        TAG_OPAQUE => Ok(Value::Opaque(content.to_vec())),
        TAG_COUNTER64 => Ok(Value::Counter64(decode_unsigned(content)?)),
        TAG_NO_SUCH_OBJECT => Ok(Value::NoSuchObject),
        TAG_NO_SUCH_INSTANCE => Ok(Value::NoSuchInstance),
        TAG_END_OF_MIB_VIEW => Ok(Value::EndOfMibView),
        other => Err(BerError::UnexpectedTag(other)),
    }
}

pub fn decode(buf: &[u8]) -> Result<Message, BerError> {
    let mut outer = Reader::new(buf);
    let body = outer.expect(TAG_SEQUENCE)?;

    let mut msg = Reader::new(body);
    let version = decode_integer(msg.expect(TAG_INTEGER)?)?;
    let community = msg.expect(TAG_OCTET_STRING)?.to_vec();
    let (pdu_type, pdu) = msg.tlv()?;
    if !(0xA0..=0xA5).contains(&pdu_type) {
        return Err(BerError::UnexpectedTag(pdu_type));
    }

    let mut pdu = Reader::new(pdu);
    let request_id = i32::try_from(decode_integer(pdu.expect(TAG_INTEGER)?)?)
        .map_err(|_| BerError::IntegerRange)?;
    let error_status = decode_integer(pdu.expect(TAG_INTEGER)?)?;
    let error_index = decode_integer(pdu.expect(TAG_INTEGER)?)?;

    let mut list = Reader::new(pdu.expect(TAG_SEQUENCE)?);
    let mut varbinds = Vec::new();
    while list.remaining() > 0 {
        let mut vb = Reader::new(list.expect(TAG_SEQUENCE)?);
        let oid = decode_oid(vb.expect(TAG_OID)?)?;
        let (tag, content) = vb.tlv()?;
        varbinds.push((oid, decode_value(tag, content)?));
    }

    Ok(Message { version, community, pdu_type, request_id, error_status, error_index, varbinds })
}
