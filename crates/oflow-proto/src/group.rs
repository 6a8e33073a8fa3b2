//! Group buckets (1.1+).

use crate::{
    actions::{encode_action_list, parse_action_list, Action},
    buffer::{Reader, Writer},
    errors::{ProtocolError, Result},
    types::{GroupId, PortNumber},
    version::ProtocolVersion,
};

const BUCKET_FIXED_LEN: usize = 16;

/// One bucket in a group: a weighted action list with liveness watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    /// Relative weight (select groups only)
    pub weight: u16,
    /// Port whose liveness governs this bucket (fast-failover groups)
    pub watch_port: PortNumber,
    /// Group whose liveness governs this bucket (fast-failover groups)
    pub watch_group: GroupId,
    /// Actions applied to packets processed by this bucket
    pub actions: Vec<Action>,
}

impl Bucket {
    /// Encoded length, header included.
    ///
    /// # Errors
    ///
    /// Version mismatch if a nested action cannot be expressed in `pv`.
    pub fn encoded_len(&self, pv: ProtocolVersion) -> Result<usize> {
        let mut len = BUCKET_FIXED_LEN;
        for a in &self.actions {
            len += a.encoded_len(pv)?;
        }
        Ok(len)
    }
}

/// Parse buckets until the reader reaches `target`.
///
/// # Errors
///
/// Version mismatch below 1.1; decode errors on malformed buckets.
pub fn parse_bucket_list(
    target: usize,
    r: &mut Reader<'_>,
    pv: ProtocolVersion,
) -> Result<Vec<Bucket>> {
    if pv < ProtocolVersion::V11 {
        return Err(ProtocolError::VersionMismatch {
            version: pv,
            item: "group buckets".to_string(),
        });
    }
    let mut buckets = Vec::new();
    while r.position() < target {
        buckets.push(parse_bucket(r, pv)?);
    }
    if r.position() != target {
        return Err(ProtocolError::Malformed {
            context: "bucket list",
            offset: r.position(),
            detail: format!("overran container by {}", r.position() - target),
        });
    }
    Ok(buckets)
}

fn parse_bucket(r: &mut Reader<'_>, pv: ProtocolVersion) -> Result<Bucket> {
    let start = r.position();
    let declared = usize::from(r.read_u16()?);
    if declared < BUCKET_FIXED_LEN {
        return Err(ProtocolError::Malformed {
            context: "bucket",
            offset: start,
            detail: format!("declared length {declared} below fixed part"),
        });
    }
    let weight = r.read_u16()?;
    let watch_port = PortNumber(r.read_u32()?);
    let watch_group = GroupId(r.read_u32()?);
    r.skip(4)?;
    let actions = parse_action_list(start + declared, r, pv)?;
    Ok(Bucket { weight, watch_port, watch_group, actions })
}

/// Encode a list of buckets.
///
/// # Errors
///
/// Version mismatch below 1.1 or for inexpressible nested actions.
pub fn encode_bucket_list(w: &mut Writer, buckets: &[Bucket], pv: ProtocolVersion) -> Result<()> {
    if pv < ProtocolVersion::V11 {
        return Err(ProtocolError::VersionMismatch {
            version: pv,
            item: "group buckets".to_string(),
        });
    }
    for b in buckets {
        w.put_u16(b.encoded_len(pv)? as u16);
        w.put_u16(b.weight);
        w.put_u32(b.watch_port.0);
        w.put_u32(b.watch_group.0);
        w.put_zeros(4);
        encode_action_list(w, &b.actions, pv)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_round_trip() {
        let buckets = vec![
            Bucket {
                weight: 10,
                watch_port: PortNumber::ANY,
                watch_group: GroupId::ANY,
                actions: vec![Action::Output { port: PortNumber(1), max_len: 0 }],
            },
            Bucket {
                weight: 20,
                watch_port: PortNumber(2),
                watch_group: GroupId(7),
                actions: vec![Action::DecNwTtl, Action::Output { port: PortNumber(2), max_len: 0 }],
            },
        ];
        let mut w = Writer::new();
        encode_bucket_list(&mut w, &buckets, ProtocolVersion::V13).unwrap();
        let bytes = w.into_vec();
        let mut r = Reader::new(&bytes);
        assert_eq!(parse_bucket_list(bytes.len(), &mut r, ProtocolVersion::V13).unwrap(), buckets);
    }

    #[test]
    fn buckets_rejected_for_10() {
        let mut w = Writer::new();
        assert!(encode_bucket_list(&mut w, &[], ProtocolVersion::V10).unwrap_err().is_version_error());
    }
}
