//! Packet queues and their property TLVs.
//!
//! A queue structure has an 8-byte fixed part in 1.0 and a 16-byte part
//! from 1.2 on (adding the port and widening the pad). Its properties are
//! classic TLVs: `(property: u16, length: u16, 4 pad)` headers with rate
//! payloads padded to 8. Unknown property types decode opaquely.

use crate::{
    buffer::{Reader, Writer},
    errors::{ProtocolError, Result},
    tlv,
    types::{PortNumber, QueueId},
    version::ProtocolVersion,
};

const QUEUE_PROP_HEADER_LEN: usize = 8; // type, length, 4 pad

const QP_MIN_RATE: u16 = 1;
const QP_MAX_RATE: u16 = 2;
const QP_EXPERIMENTER: u16 = 0xffff;

/// A queue property. Rates are in 1/10 of a percent; values above 1000
/// disable the bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueProperty {
    /// Guaranteed minimum rate
    MinRate(u16),
    /// Maximum rate (1.2+)
    MaxRate(u16),
    /// Experimenter-defined property
    Experimenter {
        /// Experimenter id
        id: u32,
        /// Raw payload
        data: Vec<u8>,
    },
    /// A property this codec does not model, kept byte-for-byte
    Unknown {
        /// Wire property code
        property: u16,
        /// Raw payload (after the 8-byte property header)
        payload: Vec<u8>,
    },
}

/// One packet queue attached to a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketQueue {
    /// Queue id
    pub queue_id: QueueId,
    /// The port this queue is attached to; on the wire only from 1.2
    pub port: Option<PortNumber>,
    /// Properties
    pub properties: Vec<QueueProperty>,
}

impl PacketQueue {
    fn fixed_len(pv: ProtocolVersion) -> usize {
        if pv >= ProtocolVersion::V12 {
            16
        } else {
            8
        }
    }

    /// Encoded length for `pv`.
    #[must_use]
    pub fn encoded_len(&self, pv: ProtocolVersion) -> usize {
        Self::fixed_len(pv)
            + self.properties.iter().map(|p| property_len(p)).sum::<usize>()
    }
}

fn property_len(p: &QueueProperty) -> usize {
    match p {
        QueueProperty::MinRate(_) | QueueProperty::MaxRate(_) => 16,
        QueueProperty::Experimenter { data, .. } => {
            tlv::padded_len(QUEUE_PROP_HEADER_LEN + 8 + data.len())
        }
        QueueProperty::Unknown { payload, .. } => {
            tlv::padded_len(QUEUE_PROP_HEADER_LEN + payload.len())
        }
    }
}

/// Parse queues until the reader reaches `target`.
///
/// # Errors
///
/// Decode errors on malformed queue or property structures.
pub fn parse_queue_list(
    target: usize,
    r: &mut Reader<'_>,
    pv: ProtocolVersion,
) -> Result<Vec<PacketQueue>> {
    let mut queues = Vec::new();
    while r.position() < target {
        queues.push(parse_queue(r, pv)?);
    }
    if r.position() != target {
        return Err(ProtocolError::Malformed {
            context: "queue list",
            offset: r.position(),
            detail: format!("overran container by {}", r.position() - target),
        });
    }
    Ok(queues)
}

fn parse_queue(r: &mut Reader<'_>, pv: ProtocolVersion) -> Result<PacketQueue> {
    let start = r.position();
    let queue_id = QueueId(r.read_u32()?);
    let port = if pv >= ProtocolVersion::V12 { Some(PortNumber(r.read_u32()?)) } else { None };
    let declared = usize::from(r.read_u16()?);
    r.skip(if pv >= ProtocolVersion::V12 { 6 } else { 2 })?;
    if declared < PacketQueue::fixed_len(pv) {
        return Err(ProtocolError::Malformed {
            context: "packet queue",
            offset: start,
            detail: format!("declared length {declared} below fixed part"),
        });
    }

    let target = start + declared;
    let mut properties = Vec::new();
    while r.position() < target {
        properties.push(parse_property(r)?);
    }
    if r.position() != target {
        return Err(ProtocolError::Malformed {
            context: "packet queue",
            offset: r.position(),
            detail: format!("properties overran queue by {}", r.position() - target),
        });
    }
    Ok(PacketQueue { queue_id, port, properties })
}

fn parse_property(r: &mut Reader<'_>) -> Result<QueueProperty> {
    let start = r.position();
    let property = r.read_u16()?;
    let declared = usize::from(r.read_u16()?);
    r.skip(4)?;
    tlv::payload_len(r, "queue property", declared, QUEUE_PROP_HEADER_LEN)?;

    let prop = match property {
        QP_MIN_RATE | QP_MAX_RATE => {
            let rate = r.read_u16()?;
            r.skip(6)?;
            if property == QP_MIN_RATE {
                QueueProperty::MinRate(rate)
            } else {
                QueueProperty::MaxRate(rate)
            }
        }
        QP_EXPERIMENTER => {
            let data_len = declared.checked_sub(QUEUE_PROP_HEADER_LEN + 8).ok_or(
                ProtocolError::Malformed {
                    context: "queue property",
                    offset: start,
                    detail: format!("experimenter property length {declared} too short"),
                },
            )?;
            let id = r.read_u32()?;
            r.skip(4)?;
            let data = r.read_bytes(data_len)?.to_vec();
            QueueProperty::Experimenter { id, data }
        }
        _ => {
            let payload = r.read_bytes(declared - QUEUE_PROP_HEADER_LEN)?.to_vec();
            QueueProperty::Unknown { property, payload }
        }
    };
    tlv::finish_padded(r, start, declared)?;
    Ok(prop)
}

/// Encode a list of queues.
///
/// # Errors
///
/// Version mismatch if a 1.2+ max-rate property is encoded for an earlier
/// revision.
pub fn encode_queue_list(w: &mut Writer, queues: &[PacketQueue], pv: ProtocolVersion) -> Result<()> {
    for q in queues {
        encode_queue(w, q, pv)?;
    }
    Ok(())
}

fn encode_queue(w: &mut Writer, q: &PacketQueue, pv: ProtocolVersion) -> Result<()> {
    w.put_u32(q.queue_id.0);
    if pv >= ProtocolVersion::V12 {
        w.put_u32(q.port.unwrap_or(PortNumber::ANY).0);
    }
    w.put_u16(q.encoded_len(pv) as u16);
    w.put_zeros(if pv >= ProtocolVersion::V12 { 6 } else { 2 });
    for p in &q.properties {
        encode_property(w, p, pv)?;
    }
    Ok(())
}

fn encode_property(w: &mut Writer, p: &QueueProperty, pv: ProtocolVersion) -> Result<()> {
    match p {
        QueueProperty::MinRate(rate) | QueueProperty::MaxRate(rate) => {
            let code = if matches!(p, QueueProperty::MinRate(_)) { QP_MIN_RATE } else { QP_MAX_RATE };
            if code == QP_MAX_RATE && pv < ProtocolVersion::V12 {
                return Err(ProtocolError::VersionMismatch {
                    version: pv,
                    item: "max-rate queue property".to_string(),
                });
            }
            w.put_u16(code);
            w.put_u16(16);
            w.put_zeros(4);
            w.put_u16(*rate);
            w.put_zeros(6);
        }
        QueueProperty::Experimenter { id, data } => {
            let unpadded = QUEUE_PROP_HEADER_LEN + 8 + data.len();
            w.put_u16(QP_EXPERIMENTER);
            w.put_u16(unpadded as u16);
            w.put_zeros(4);
            w.put_u32(*id);
            w.put_zeros(4);
            w.put_slice(data);
            tlv::write_pad8(w, unpadded);
        }
        QueueProperty::Unknown { property, payload } => {
            let unpadded = QUEUE_PROP_HEADER_LEN + payload.len();
            w.put_u16(*property);
            w.put_u16(unpadded as u16);
            w.put_zeros(4);
            w.put_slice(payload);
            tlv::write_pad8(w, unpadded);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_round_trips_v10_and_v13() {
        for pv in [ProtocolVersion::V10, ProtocolVersion::V13] {
            let queues = vec![PacketQueue {
                queue_id: QueueId(1),
                port: (pv >= ProtocolVersion::V12).then_some(PortNumber(3)),
                properties: vec![QueueProperty::MinRate(100)],
            }];
            let mut w = Writer::new();
            encode_queue_list(&mut w, &queues, pv).unwrap();
            let bytes = w.into_vec();
            let mut r = Reader::new(&bytes);
            assert_eq!(parse_queue_list(bytes.len(), &mut r, pv).unwrap(), queues);
        }
    }

    #[test]
    fn unknown_property_kept_opaque() {
        let q = PacketQueue {
            queue_id: QueueId(9),
            port: Some(PortNumber(1)),
            properties: vec![QueueProperty::Unknown { property: 7, payload: vec![0xAA; 3] }],
        };
        let pv = ProtocolVersion::V13;
        let mut w = Writer::new();
        encode_queue_list(&mut w, &[q.clone()], pv).unwrap();
        let bytes = w.into_vec();
        let mut r = Reader::new(&bytes);
        assert_eq!(parse_queue_list(bytes.len(), &mut r, pv).unwrap(), vec![q]);
    }

    #[test]
    fn max_rate_needs_12() {
        let mut w = Writer::new();
        let q = PacketQueue {
            queue_id: QueueId(1),
            port: None,
            properties: vec![QueueProperty::MaxRate(500)],
        };
        assert!(encode_queue_list(&mut w, &[q], ProtocolVersion::V10).unwrap_err().is_version_error());
    }
}
