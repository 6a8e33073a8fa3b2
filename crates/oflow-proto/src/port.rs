//! Port description structure.
//!
//! Two fixed layouts: 48 bytes in 1.0 (u16 port numbers, no speed fields)
//! and 64 bytes from 1.1 on (u32 port numbers, current/max speed). The
//! 1.0 state word additionally packs a two-bit STP state code at bits 8-9,
//! which is carried here as a separate optional field rather than a flag.

use crate::{
    buffer::{Reader, Writer},
    errors::{ProtocolError, Result},
    flags::{PortConfig, PortFeature, PortState},
    types::{MacAddress, PortNumber},
    version::{CodecConfig, ProtocolVersion},
};

/// Encoded port length for 1.0.
pub const PORT_LEN_V10: usize = 48;
/// Encoded port length for 1.1+.
pub const PORT_LEN: usize = 64;

const PORT_NAME_LEN: usize = 16;
const STP_STATE_SHIFT: u32 = 8;
const STP_STATE_MASK: u32 = 0x3 << STP_STATE_SHIFT;

/// 802.1d spanning-tree port state (1.0 only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StpState {
    /// Not learning or relaying frames
    Listen,
    /// Learning but not relaying
    Learn,
    /// Learning and relaying
    Forward,
    /// Not part of the spanning tree
    Block,
}

impl StpState {
    fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Listen,
            1 => Self::Learn,
            2 => Self::Forward,
            _ => Self::Block,
        }
    }

    fn code(self) -> u32 {
        match self {
            Self::Listen => 0,
            Self::Learn => 1,
            Self::Forward => 2,
            Self::Block => 3,
        }
    }
}

/// Description of one switch port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    /// Port number
    pub port_no: PortNumber,
    /// Hardware address
    pub hw_addr: MacAddress,
    /// Human-readable name (at most 15 bytes on the wire)
    pub name: String,
    /// Administrative configuration
    pub config: PortConfig,
    /// Link state
    pub state: PortState,
    /// STP state, present only when decoded from a 1.0 port; ignored when
    /// encoding for 1.1+
    pub stp_state: Option<StpState>,
    /// Current features
    pub curr: PortFeature,
    /// Features being advertised
    pub advertised: PortFeature,
    /// Features supported
    pub supported: PortFeature,
    /// Features advertised by peer
    pub peer: PortFeature,
    /// Current bitrate in kbps, 1.1+ only; ignored when encoding for 1.0
    pub curr_speed: Option<u32>,
    /// Maximum bitrate in kbps, 1.1+ only; ignored when encoding for 1.0
    pub max_speed: Option<u32>,
}

/// Encoded port length for `pv`.
#[must_use]
pub fn port_len(pv: ProtocolVersion) -> usize {
    if pv == ProtocolVersion::V10 {
        PORT_LEN_V10
    } else {
        PORT_LEN
    }
}

/// Parse one port description.
///
/// # Errors
///
/// Decode errors on truncated input; version mismatch under strict parsing
/// for undefined state/config/feature bits.
pub fn parse_port(r: &mut Reader<'_>, pv: ProtocolVersion, cfg: CodecConfig) -> Result<Port> {
    let port_no = if pv == ProtocolVersion::V10 {
        PortNumber::from_v10(r.read_u16()?)
    } else {
        let n = PortNumber(r.read_u32()?);
        r.skip(4)?;
        n
    };
    let hw_addr = r.read_mac()?;
    if pv > ProtocolVersion::V10 {
        r.skip(2)?;
    }
    let name = r.read_fixed_string(PORT_NAME_LEN)?;
    let config = PortConfig::decode_bitmap(r.read_u32()?, pv, cfg)?;

    let state_bits = r.read_u32()?;
    let (state_bits, stp_state) = if pv == ProtocolVersion::V10 {
        let stp = StpState::from_code((state_bits & STP_STATE_MASK) >> STP_STATE_SHIFT);
        (state_bits & !STP_STATE_MASK, Some(stp))
    } else {
        (state_bits, None)
    };
    let state = PortState::decode_bitmap(state_bits, pv, cfg)?;

    let curr = PortFeature::decode_bitmap(r.read_u32()?, pv, cfg)?;
    let advertised = PortFeature::decode_bitmap(r.read_u32()?, pv, cfg)?;
    let supported = PortFeature::decode_bitmap(r.read_u32()?, pv, cfg)?;
    let peer = PortFeature::decode_bitmap(r.read_u32()?, pv, cfg)?;
    let (curr_speed, max_speed) = if pv > ProtocolVersion::V10 {
        (Some(r.read_u32()?), Some(r.read_u32()?))
    } else {
        (None, None)
    };

    Ok(Port {
        port_no,
        hw_addr,
        name,
        config,
        state,
        stp_state,
        curr,
        advertised,
        supported,
        peer,
        curr_speed,
        max_speed,
    })
}

/// Parse ports until the reader reaches `target`.
///
/// # Errors
///
/// As [`parse_port`]; the list must land exactly on `target`.
pub fn parse_port_list(
    target: usize,
    r: &mut Reader<'_>,
    pv: ProtocolVersion,
    cfg: CodecConfig,
) -> Result<Vec<Port>> {
    let mut ports = Vec::new();
    while r.position() < target {
        ports.push(parse_port(r, pv, cfg)?);
    }
    if r.position() != target {
        return Err(ProtocolError::Malformed {
            context: "port list",
            offset: r.position(),
            detail: format!("overran container by {}", r.position() - target),
        });
    }
    Ok(ports)
}

/// Encode one port description.
///
/// # Errors
///
/// Version mismatch if the port number or a flag set cannot be expressed
/// in `pv`.
pub fn encode_port(w: &mut Writer, p: &Port, pv: ProtocolVersion) -> Result<()> {
    if pv == ProtocolVersion::V10 {
        w.put_u16(p.port_no.to_v10()?);
    } else {
        w.put_u32(p.port_no.0);
        w.put_zeros(4);
    }
    w.put_mac(p.hw_addr);
    if pv > ProtocolVersion::V10 {
        w.put_zeros(2);
    }
    w.put_fixed_string(&p.name, PORT_NAME_LEN);
    w.put_u32(p.config.encode_bitmap(pv)?);

    let mut state_bits = p.state.encode_bitmap(pv)?;
    if pv == ProtocolVersion::V10 {
        state_bits |= p.stp_state.unwrap_or(StpState::Listen).code() << STP_STATE_SHIFT;
    }
    w.put_u32(state_bits);

    w.put_u32(p.curr.encode_bitmap(pv)?);
    w.put_u32(p.advertised.encode_bitmap(pv)?);
    w.put_u32(p.supported.encode_bitmap(pv)?);
    w.put_u32(p.peer.encode_bitmap(pv)?);
    if pv > ProtocolVersion::V10 {
        w.put_u32(p.curr_speed.unwrap_or(0));
        w.put_u32(p.max_speed.unwrap_or(0));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{VersionSet, ALL_VERSIONS};

    fn cfg() -> CodecConfig {
        CodecConfig { strict: false, supported: VersionSet::of(&ALL_VERSIONS) }
    }

    fn sample(pv: ProtocolVersion) -> Port {
        let v10 = pv == ProtocolVersion::V10;
        Port {
            port_no: PortNumber(4),
            hw_addr: MacAddress([0, 0x11, 0x22, 0x33, 0x44, 0x55]),
            name: "eth4".to_string(),
            config: PortConfig::NO_PACKET_IN,
            state: PortState::LINK_DOWN,
            stp_state: v10.then_some(StpState::Forward),
            curr: PortFeature::RATE_1GB_FD | PortFeature::COPPER,
            advertised: PortFeature::RATE_1GB_FD,
            supported: PortFeature::RATE_1GB_FD | PortFeature::RATE_10GB_FD,
            peer: PortFeature::empty(),
            curr_speed: (!v10).then_some(1_000_000),
            max_speed: (!v10).then_some(10_000_000),
        }
    }

    #[test]
    fn port_round_trips_both_layouts() {
        for pv in [ProtocolVersion::V10, ProtocolVersion::V13] {
            let port = sample(pv);
            let mut w = Writer::new();
            encode_port(&mut w, &port, pv).unwrap();
            let bytes = w.into_vec();
            assert_eq!(bytes.len(), port_len(pv));
            let mut r = Reader::new(&bytes);
            assert_eq!(parse_port(&mut r, pv, cfg()).unwrap(), port);
        }
    }

    #[test]
    fn port_list_round_trips() {
        let pv = ProtocolVersion::V13;
        let ports = vec![sample(pv), { Port { port_no: PortNumber(5), ..sample(pv) } }];
        let mut w = Writer::new();
        for p in &ports {
            encode_port(&mut w, p, pv).unwrap();
        }
        let bytes = w.into_vec();
        let mut r = Reader::new(&bytes);
        assert_eq!(parse_port_list(bytes.len(), &mut r, pv, cfg()).unwrap(), ports);
    }

    #[test]
    fn v10_stp_state_survives() {
        let pv = ProtocolVersion::V10;
        let mut port = sample(pv);
        port.stp_state = Some(StpState::Block);
        let mut w = Writer::new();
        encode_port(&mut w, &port, pv).unwrap();
        let bytes = w.into_vec();
        let mut r = Reader::new(&bytes);
        let parsed = parse_port(&mut r, pv, cfg()).unwrap();
        assert_eq!(parsed.stp_state, Some(StpState::Block));
        assert_eq!(parsed.state, PortState::LINK_DOWN);
    }

    #[test]
    fn strict_rejects_stray_state_bits_on_13() {
        let pv = ProtocolVersion::V13;
        let mut w = Writer::new();
        encode_port(&mut w, &sample(pv), pv).unwrap();
        let mut bytes = w.into_vec();
        // state word sits after port_no(4)+pad(4)+mac(6)+pad(2)+name(16)+config(4)
        bytes[36 + 3] |= 0x80; // set an undefined state bit
        let strict = CodecConfig { strict: true, ..cfg() };
        let mut r = Reader::new(&bytes);
        assert!(parse_port(&mut r, pv, strict).unwrap_err().is_version_error());
        let mut r = Reader::new(&bytes);
        assert!(parse_port(&mut r, pv, cfg()).is_ok());
    }
}
