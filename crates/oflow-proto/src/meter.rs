//! Meter bands (1.3).

use crate::{
    buffer::{Reader, Writer},
    errors::{ProtocolError, Result},
    tlv,
    version::ProtocolVersion,
};

const BAND_HEADER_LEN: usize = 4; // type + length
const BAND_FIXED_LEN: usize = 16;

const MBT_DROP: u16 = 1;
const MBT_DSCP_REMARK: u16 = 2;
const MBT_EXPERIMENTER: u16 = 0xffff;

/// One meter band: a rate threshold and what happens past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterBand {
    /// Rate threshold (kbps or packets per second, per the meter's flags)
    pub rate: u32,
    /// Burst size
    pub burst_size: u32,
    /// What the band does to excess packets
    pub kind: MeterBandKind,
}

/// The band-type-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeterBandKind {
    /// Drop excess packets
    Drop,
    /// Increase the DSCP drop precedence of excess packets
    DscpRemark {
        /// Amount to add to the drop precedence
        prec_level: u8,
    },
    /// Experimenter-defined band
    Experimenter {
        /// Experimenter id
        id: u32,
    },
}

impl MeterBand {
    fn encoded_len(&self) -> usize {
        BAND_FIXED_LEN
    }
}

/// Parse meter bands until the reader reaches `target`.
///
/// # Errors
///
/// Version mismatch below 1.3; decode errors on malformed bands.
pub fn parse_meter_band_list(
    target: usize,
    r: &mut Reader<'_>,
    pv: ProtocolVersion,
) -> Result<Vec<MeterBand>> {
    if pv < ProtocolVersion::V13 {
        return Err(ProtocolError::VersionMismatch {
            version: pv,
            item: "meter bands".to_string(),
        });
    }
    let mut bands = Vec::new();
    while r.position() < target {
        bands.push(parse_band(r)?);
    }
    if r.position() != target {
        return Err(ProtocolError::Malformed {
            context: "meter band list",
            offset: r.position(),
            detail: format!("overran container by {}", r.position() - target),
        });
    }
    Ok(bands)
}

fn parse_band(r: &mut Reader<'_>) -> Result<MeterBand> {
    let start = r.position();
    let code = r.read_u16()?;
    let declared = usize::from(r.read_u16()?);
    tlv::payload_len(r, "meter band", declared, BAND_HEADER_LEN)?;
    if declared < BAND_FIXED_LEN {
        return Err(ProtocolError::Malformed {
            context: "meter band",
            offset: start,
            detail: format!("declared length {declared} below fixed part"),
        });
    }
    let rate = r.read_u32()?;
    let burst_size = r.read_u32()?;
    let kind = match code {
        MBT_DROP => {
            r.skip(4)?;
            MeterBandKind::Drop
        }
        MBT_DSCP_REMARK => {
            let prec_level = r.read_u8()?;
            r.skip(3)?;
            MeterBandKind::DscpRemark { prec_level }
        }
        MBT_EXPERIMENTER => MeterBandKind::Experimenter { id: r.read_u32()? },
        other => {
            return Err(ProtocolError::Malformed {
                context: "meter band",
                offset: start,
                detail: format!("unknown band type {other}"),
            })
        }
    };
    r.seek(start + declared);
    Ok(MeterBand { rate, burst_size, kind })
}

/// Encode a list of meter bands.
///
/// # Errors
///
/// Version mismatch below 1.3.
pub fn encode_meter_band_list(
    w: &mut Writer,
    bands: &[MeterBand],
    pv: ProtocolVersion,
) -> Result<()> {
    if pv < ProtocolVersion::V13 {
        return Err(ProtocolError::VersionMismatch {
            version: pv,
            item: "meter bands".to_string(),
        });
    }
    for b in bands {
        let code = match b.kind {
            MeterBandKind::Drop => MBT_DROP,
            MeterBandKind::DscpRemark { .. } => MBT_DSCP_REMARK,
            MeterBandKind::Experimenter { .. } => MBT_EXPERIMENTER,
        };
        w.put_u16(code);
        w.put_u16(b.encoded_len() as u16);
        w.put_u32(b.rate);
        w.put_u32(b.burst_size);
        match b.kind {
            MeterBandKind::Drop => w.put_zeros(4),
            MeterBandKind::DscpRemark { prec_level } => {
                w.put_u8(prec_level);
                w.put_zeros(3);
            }
            MeterBandKind::Experimenter { id } => w.put_u32(id),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_round_trip() {
        let bands = vec![
            MeterBand { rate: 1000, burst_size: 64, kind: MeterBandKind::Drop },
            MeterBand { rate: 500, burst_size: 32, kind: MeterBandKind::DscpRemark { prec_level: 1 } },
            MeterBand { rate: 100, burst_size: 0, kind: MeterBandKind::Experimenter { id: 0x1234 } },
        ];
        let mut w = Writer::new();
        encode_meter_band_list(&mut w, &bands, ProtocolVersion::V13).unwrap();
        let bytes = w.into_vec();
        assert_eq!(bytes.len(), 48);
        let mut r = Reader::new(&bytes);
        assert_eq!(parse_meter_band_list(bytes.len(), &mut r, ProtocolVersion::V13).unwrap(), bands);
    }

    #[test]
    fn bands_need_13() {
        let mut w = Writer::new();
        let err = encode_meter_band_list(&mut w, &[], ProtocolVersion::V12).unwrap_err();
        assert!(err.is_version_error());
    }

    #[test]
    fn unknown_band_type_is_decode_error() {
        let mut bytes = vec![0x00, 0x09, 0x00, 0x10];
        bytes.extend_from_slice(&[0; 12]);
        let mut r = Reader::new(&bytes);
        assert!(parse_meter_band_list(16, &mut r, ProtocolVersion::V13).unwrap_err().is_decode_error());
    }
}
