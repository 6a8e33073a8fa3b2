//! Match structures: the OXM TLV match (1.2+) and the 1.0 fixed layout.
//!
//! Internally there is a single model: a [`Match`] is a list of
//! [`MatchField`]s, and a field that would be wildcarded is simply absent.
//! The 1.2+ codec reads and writes OXM TLV entries directly. The 1.0 codec
//! translates between this model and the fixed 40-byte structure: on decode
//! each non-wildcarded field is fabricated into the corresponding OXM-style
//! field, and on encode the wildcards bitmap is regenerated from the fields
//! that are absent. The 1.0 IPv4 prefix-length wildcards become ordinary
//! address masks.
//!
//! Unknown OXM classes and field codes decode opaquely, preserving forward
//! compatibility; experimenter fields keep their raw payloads.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::{
    buffer::{Reader, Writer},
    errors::{ProtocolError, Result},
    tlv,
    types::{MacAddress, PortNumber},
    version::ProtocolVersion,
};

/// The OXM class for basic (ONF-defined) match fields.
pub const OXM_CLASS_BASIC: u16 = 0x8000;
/// The OXM class for experimenter match fields.
pub const OXM_CLASS_EXPERIMENTER: u16 = 0xffff;

/// Match structure type codes (1.2+ header). STANDARD survives only as the
/// deprecated 1.1 structure, which this codec does not emit.
const MATCH_TYPE_OXM: u16 = 1;

const MATCH_HEADER_LEN: usize = 4;
const FIELD_HEADER_LEN: usize = 4;

/// 1.0 wildcard bit assignments.
mod wild {
    pub const IN_PORT: u32 = 1 << 0;
    pub const DL_VLAN: u32 = 1 << 1;
    pub const DL_SRC: u32 = 1 << 2;
    pub const DL_DST: u32 = 1 << 3;
    pub const DL_TYPE: u32 = 1 << 4;
    pub const NW_PROTO: u32 = 1 << 5;
    pub const TP_SRC: u32 = 1 << 6;
    pub const TP_DST: u32 = 1 << 7;
    pub const NW_SRC_SHIFT: u32 = 8;
    pub const NW_DST_SHIFT: u32 = 14;
    pub const NW_MASK: u32 = 0x3f;
    pub const DL_VLAN_PCP: u32 = 1 << 20;
    pub const NW_TOS: u32 = 1 << 21;
    pub const ALL: u32 = (1 << 22) - 1;
}

/// Basic OXM field codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub enum OxmBasicFieldType {
    InPort,
    InPhyPort,
    Metadata,
    EthDst,
    EthSrc,
    EthType,
    VlanVid,
    VlanPcp,
    IpDscp,
    IpEcn,
    IpProto,
    Ipv4Src,
    Ipv4Dst,
    TcpSrc,
    TcpDst,
    UdpSrc,
    UdpDst,
    Icmpv4Type,
    Icmpv4Code,
    ArpOp,
    ArpSpa,
    ArpTpa,
    Ipv6Src,
    Ipv6Dst,
    MplsLabel,
    TunnelId,
}

impl OxmBasicFieldType {
    /// The wire field code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::InPort => 0,
            Self::InPhyPort => 1,
            Self::Metadata => 2,
            Self::EthDst => 3,
            Self::EthSrc => 4,
            Self::EthType => 5,
            Self::VlanVid => 6,
            Self::VlanPcp => 7,
            Self::IpDscp => 8,
            Self::IpEcn => 9,
            Self::IpProto => 10,
            Self::Ipv4Src => 11,
            Self::Ipv4Dst => 12,
            Self::TcpSrc => 13,
            Self::TcpDst => 14,
            Self::UdpSrc => 15,
            Self::UdpDst => 16,
            Self::Icmpv4Type => 19,
            Self::Icmpv4Code => 20,
            Self::ArpOp => 21,
            Self::ArpSpa => 22,
            Self::ArpTpa => 23,
            Self::Ipv6Src => 26,
            Self::Ipv6Dst => 27,
            Self::MplsLabel => 34,
            Self::TunnelId => 38,
        }
    }

    /// Decode a wire field code; `None` for codes this codec treats opaquely.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        use OxmBasicFieldType::*;
        Some(match code {
            0 => InPort,
            1 => InPhyPort,
            2 => Metadata,
            3 => EthDst,
            4 => EthSrc,
            5 => EthType,
            6 => VlanVid,
            7 => VlanPcp,
            8 => IpDscp,
            9 => IpEcn,
            10 => IpProto,
            11 => Ipv4Src,
            12 => Ipv4Dst,
            13 => TcpSrc,
            14 => TcpDst,
            15 => UdpSrc,
            16 => UdpDst,
            19 => Icmpv4Type,
            20 => Icmpv4Code,
            21 => ArpOp,
            22 => ArpSpa,
            23 => ArpTpa,
            26 => Ipv6Src,
            27 => Ipv6Dst,
            34 => MplsLabel,
            38 => TunnelId,
            _ => return None,
        })
    }
}

/// One match field. Maskable fields carry `Option<mask>`; a field that is
/// not present in a match is simply not in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum MatchField {
    InPort(PortNumber),
    InPhyPort(PortNumber),
    Metadata { value: u64, mask: Option<u64> },
    EthDst { addr: MacAddress, mask: Option<MacAddress> },
    EthSrc { addr: MacAddress, mask: Option<MacAddress> },
    EthType(u16),
    /// Raw wire value, including the 1.2+ PRESENT bit (0x1000) where set.
    VlanVid { vid: u16, mask: Option<u16> },
    VlanPcp(u8),
    IpDscp(u8),
    IpEcn(u8),
    IpProto(u8),
    Ipv4Src { addr: Ipv4Addr, mask: Option<Ipv4Addr> },
    Ipv4Dst { addr: Ipv4Addr, mask: Option<Ipv4Addr> },
    TcpSrc(u16),
    TcpDst(u16),
    UdpSrc(u16),
    UdpDst(u16),
    Icmpv4Type(u8),
    Icmpv4Code(u8),
    ArpOp(u16),
    ArpSpa { addr: Ipv4Addr, mask: Option<Ipv4Addr> },
    ArpTpa { addr: Ipv4Addr, mask: Option<Ipv4Addr> },
    Ipv6Src { addr: Ipv6Addr, mask: Option<Ipv6Addr> },
    Ipv6Dst { addr: Ipv6Addr, mask: Option<Ipv6Addr> },
    MplsLabel(u32),
    TunnelId { value: u64, mask: Option<u64> },
    /// Experimenter-class field: the 4-byte experimenter id leads the payload.
    Experimenter { field: u8, experimenter: u32, payload: Vec<u8> },
    /// A field this codec does not model; kept byte-for-byte.
    Unknown { class: u16, field: u8, has_mask: bool, payload: Vec<u8> },
}

impl MatchField {
    /// The basic field type, when this is a modeled basic field.
    #[must_use]
    pub fn basic_type(&self) -> Option<OxmBasicFieldType> {
        use MatchField::*;
        Some(match self {
            InPort(_) => OxmBasicFieldType::InPort,
            InPhyPort(_) => OxmBasicFieldType::InPhyPort,
            Metadata { .. } => OxmBasicFieldType::Metadata,
            EthDst { .. } => OxmBasicFieldType::EthDst,
            EthSrc { .. } => OxmBasicFieldType::EthSrc,
            EthType(_) => OxmBasicFieldType::EthType,
            VlanVid { .. } => OxmBasicFieldType::VlanVid,
            VlanPcp(_) => OxmBasicFieldType::VlanPcp,
            IpDscp(_) => OxmBasicFieldType::IpDscp,
            IpEcn(_) => OxmBasicFieldType::IpEcn,
            IpProto(_) => OxmBasicFieldType::IpProto,
            Ipv4Src { .. } => OxmBasicFieldType::Ipv4Src,
            Ipv4Dst { .. } => OxmBasicFieldType::Ipv4Dst,
            TcpSrc(_) => OxmBasicFieldType::TcpSrc,
            TcpDst(_) => OxmBasicFieldType::TcpDst,
            UdpSrc(_) => OxmBasicFieldType::UdpSrc,
            UdpDst(_) => OxmBasicFieldType::UdpDst,
            Icmpv4Type(_) => OxmBasicFieldType::Icmpv4Type,
            Icmpv4Code(_) => OxmBasicFieldType::Icmpv4Code,
            ArpOp(_) => OxmBasicFieldType::ArpOp,
            ArpSpa { .. } => OxmBasicFieldType::ArpSpa,
            ArpTpa { .. } => OxmBasicFieldType::ArpTpa,
            Ipv6Src { .. } => OxmBasicFieldType::Ipv6Src,
            Ipv6Dst { .. } => OxmBasicFieldType::Ipv6Dst,
            MplsLabel(_) => OxmBasicFieldType::MplsLabel,
            TunnelId { .. } => OxmBasicFieldType::TunnelId,
            Experimenter { .. } | Unknown { .. } => return None,
        })
    }

    /// True when a mask accompanies the value.
    #[must_use]
    pub fn has_mask(&self) -> bool {
        use MatchField::*;
        match self {
            Metadata { mask, .. } | TunnelId { mask, .. } => mask.is_some(),
            EthDst { mask, .. } | EthSrc { mask, .. } => mask.is_some(),
            VlanVid { mask, .. } => mask.is_some(),
            Ipv4Src { mask, .. } | Ipv4Dst { mask, .. } | ArpSpa { mask, .. }
            | ArpTpa { mask, .. } => mask.is_some(),
            Ipv6Src { mask, .. } | Ipv6Dst { mask, .. } => mask.is_some(),
            Unknown { has_mask, .. } => *has_mask,
            _ => false,
        }
    }

    /// Encoded payload length (value plus mask, excluding the 4-byte header).
    #[must_use]
    pub fn payload_len(&self) -> usize {
        use MatchField::*;
        let base = match self {
            InPort(_) | InPhyPort(_) | MplsLabel(_) => 4,
            Metadata { .. } | TunnelId { .. } => 8,
            EthDst { .. } | EthSrc { .. } => 6,
            EthType(_) | VlanVid { .. } | TcpSrc(_) | TcpDst(_) | UdpSrc(_) | UdpDst(_)
            | ArpOp(_) => 2,
            VlanPcp(_) | IpDscp(_) | IpEcn(_) | IpProto(_) | Icmpv4Type(_) | Icmpv4Code(_) => 1,
            Ipv4Src { .. } | Ipv4Dst { .. } | ArpSpa { .. } | ArpTpa { .. } => 4,
            Ipv6Src { .. } | Ipv6Dst { .. } => 16,
            Experimenter { payload, .. } => return payload.len() + 4,
            Unknown { payload, .. } => return payload.len(),
        };
        if self.has_mask() {
            base * 2
        } else {
            base
        }
    }

    fn wire_class(&self) -> u16 {
        match self {
            Self::Experimenter { .. } => OXM_CLASS_EXPERIMENTER,
            Self::Unknown { class, .. } => *class,
            _ => OXM_CLASS_BASIC,
        }
    }

    fn wire_field_code(&self) -> u8 {
        match self {
            Self::Experimenter { field, .. } | Self::Unknown { field, .. } => *field,
            other => other.basic_type().map_or(0, OxmBasicFieldType::code),
        }
    }

    /// Write the field as an OXM TLV entry (header plus payload, no padding).
    pub(crate) fn encode(&self, w: &mut Writer) {
        use MatchField::*;
        w.put_u16(self.wire_class());
        w.put_u8(self.wire_field_code() << 1 | u8::from(self.has_mask()));
        w.put_u8(self.payload_len() as u8);
        match self {
            InPort(p) | InPhyPort(p) => w.put_u32(p.0),
            Metadata { value, mask } | TunnelId { value, mask } => {
                w.put_u64(*value);
                if let Some(m) = mask {
                    w.put_u64(*m);
                }
            }
            EthDst { addr, mask } | EthSrc { addr, mask } => {
                w.put_mac(*addr);
                if let Some(m) = mask {
                    w.put_mac(*m);
                }
            }
            EthType(v) | ArpOp(v) | TcpSrc(v) | TcpDst(v) | UdpSrc(v) | UdpDst(v) => {
                w.put_u16(*v);
            }
            VlanVid { vid, mask } => {
                w.put_u16(*vid);
                if let Some(m) = mask {
                    w.put_u16(*m);
                }
            }
            VlanPcp(v) | IpDscp(v) | IpEcn(v) | IpProto(v) | Icmpv4Type(v) | Icmpv4Code(v) => {
                w.put_u8(*v);
            }
            Ipv4Src { addr, mask } | Ipv4Dst { addr, mask } | ArpSpa { addr, mask }
            | ArpTpa { addr, mask } => {
                w.put_ipv4(*addr);
                if let Some(m) = mask {
                    w.put_ipv4(*m);
                }
            }
            Ipv6Src { addr, mask } | Ipv6Dst { addr, mask } => {
                w.put_ipv6(*addr);
                if let Some(m) = mask {
                    w.put_ipv6(*m);
                }
            }
            MplsLabel(v) => w.put_u32(*v),
            Experimenter { experimenter, payload, .. } => {
                w.put_u32(*experimenter);
                w.put_slice(payload);
            }
            Unknown { payload, .. } => w.put_slice(payload),
        }
    }

    /// Decode one OXM TLV entry (header already positioned at `r`).
    pub(crate) fn decode(r: &mut Reader<'_>) -> Result<Self> {
        use MatchField::*;
        let class = r.read_u16()?;
        let byte = r.read_u8()?;
        let field = byte >> 1;
        let has_mask = byte & 1 != 0;
        let len = usize::from(r.read_u8()?);
        let len = tlv::payload_len(r, "oxm entry", len, 0)?;

        if class == OXM_CLASS_EXPERIMENTER {
            if len < 4 {
                return Err(ProtocolError::Malformed {
                    context: "oxm entry",
                    offset: r.position(),
                    detail: format!("experimenter field payload {len} below id size"),
                });
            }
            let experimenter = r.read_u32()?;
            let payload = r.read_bytes(len - 4)?.to_vec();
            return Ok(Experimenter { field, experimenter, payload });
        }
        let basic = (class == OXM_CLASS_BASIC).then(|| OxmBasicFieldType::from_code(field)).flatten();
        let Some(basic) = basic else {
            let payload = r.read_bytes(len)?.to_vec();
            return Ok(Unknown { class, field, has_mask, payload });
        };

        let value_len = if has_mask { len / 2 } else { len };
        let check = |expected: usize| -> Result<()> {
            if value_len == expected {
                Ok(())
            } else {
                Err(ProtocolError::Malformed {
                    context: "oxm entry",
                    offset: r.position(),
                    detail: format!("field {basic:?}: value length {value_len}, expected {expected}"),
                })
            }
        };

        Ok(match basic {
            OxmBasicFieldType::InPort => {
                check(4)?;
                InPort(PortNumber(r.read_u32()?))
            }
            OxmBasicFieldType::InPhyPort => {
                check(4)?;
                InPhyPort(PortNumber(r.read_u32()?))
            }
            OxmBasicFieldType::Metadata => {
                check(8)?;
                let value = r.read_u64()?;
                let mask = if has_mask { Some(r.read_u64()?) } else { None };
                Metadata { value, mask }
            }
            OxmBasicFieldType::EthDst => {
                check(6)?;
                let addr = r.read_mac()?;
                let mask = if has_mask { Some(r.read_mac()?) } else { None };
                EthDst { addr, mask }
            }
            OxmBasicFieldType::EthSrc => {
                check(6)?;
                let addr = r.read_mac()?;
                let mask = if has_mask { Some(r.read_mac()?) } else { None };
                EthSrc { addr, mask }
            }
            OxmBasicFieldType::EthType => {
                check(2)?;
                EthType(r.read_u16()?)
            }
            OxmBasicFieldType::VlanVid => {
                check(2)?;
                let vid = r.read_u16()?;
                let mask = if has_mask { Some(r.read_u16()?) } else { None };
                VlanVid { vid, mask }
            }
            OxmBasicFieldType::VlanPcp => {
                check(1)?;
                VlanPcp(r.read_u8()?)
            }
            OxmBasicFieldType::IpDscp => {
                check(1)?;
                IpDscp(r.read_u8()?)
            }
            OxmBasicFieldType::IpEcn => {
                check(1)?;
                IpEcn(r.read_u8()?)
            }
            OxmBasicFieldType::IpProto => {
                check(1)?;
                IpProto(r.read_u8()?)
            }
            OxmBasicFieldType::Ipv4Src => {
                check(4)?;
                let addr = r.read_ipv4()?;
                let mask = if has_mask { Some(r.read_ipv4()?) } else { None };
                Ipv4Src { addr, mask }
            }
            OxmBasicFieldType::Ipv4Dst => {
                check(4)?;
                let addr = r.read_ipv4()?;
                let mask = if has_mask { Some(r.read_ipv4()?) } else { None };
                Ipv4Dst { addr, mask }
            }
            OxmBasicFieldType::TcpSrc => {
                check(2)?;
                TcpSrc(r.read_u16()?)
            }
            OxmBasicFieldType::TcpDst => {
                check(2)?;
                TcpDst(r.read_u16()?)
            }
            OxmBasicFieldType::UdpSrc => {
                check(2)?;
                UdpSrc(r.read_u16()?)
            }
            OxmBasicFieldType::UdpDst => {
                check(2)?;
                UdpDst(r.read_u16()?)
            }
            OxmBasicFieldType::Icmpv4Type => {
                check(1)?;
                Icmpv4Type(r.read_u8()?)
            }
            OxmBasicFieldType::Icmpv4Code => {
                check(1)?;
                Icmpv4Code(r.read_u8()?)
            }
            OxmBasicFieldType::ArpOp => {
                check(2)?;
                ArpOp(r.read_u16()?)
            }
            OxmBasicFieldType::ArpSpa => {
                check(4)?;
                let addr = r.read_ipv4()?;
                let mask = if has_mask { Some(r.read_ipv4()?) } else { None };
                ArpSpa { addr, mask }
            }
            OxmBasicFieldType::ArpTpa => {
                check(4)?;
                let addr = r.read_ipv4()?;
                let mask = if has_mask { Some(r.read_ipv4()?) } else { None };
                ArpTpa { addr, mask }
            }
            OxmBasicFieldType::Ipv6Src => {
                check(16)?;
                let addr = r.read_ipv6()?;
                let mask = if has_mask { Some(r.read_ipv6()?) } else { None };
                Ipv6Src { addr, mask }
            }
            OxmBasicFieldType::Ipv6Dst => {
                check(16)?;
                let addr = r.read_ipv6()?;
                let mask = if has_mask { Some(r.read_ipv6()?) } else { None };
                Ipv6Dst { addr, mask }
            }
            OxmBasicFieldType::MplsLabel => {
                check(4)?;
                MplsLabel(r.read_u32()?)
            }
            OxmBasicFieldType::TunnelId => {
                check(8)?;
                let value = r.read_u64()?;
                let mask = if has_mask { Some(r.read_u64()?) } else { None };
                TunnelId { value, mask }
            }
        })
    }
}

/// A match: the set of fields a flow entry (or packet-in context) matches on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Match {
    /// The present (non-wildcarded) fields, in wire order.
    pub fields: Vec<MatchField>,
}

impl Match {
    /// A match with no fields: matches everything.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Look up a field by basic type.
    #[must_use]
    pub fn field(&self, ft: OxmBasicFieldType) -> Option<&MatchField> {
        self.fields.iter().find(|f| f.basic_type() == Some(ft))
    }

    /// Encoded length on the wire for `pv`, including padding.
    #[must_use]
    pub fn encoded_len(&self, pv: ProtocolVersion) -> usize {
        if pv == ProtocolVersion::V10 {
            return 40;
        }
        let unpadded = MATCH_HEADER_LEN
            + self.fields.iter().map(|f| FIELD_HEADER_LEN + f.payload_len()).sum::<usize>();
        tlv::padded_len(unpadded)
    }
}

/// Parse a match structure for `pv`, consuming its padding.
///
/// # Errors
///
/// Decode errors for malformed entries; version mismatch for the
/// 1.1 standard match, which this codec does not carry.
pub fn parse_match(r: &mut Reader<'_>, pv: ProtocolVersion) -> Result<Match> {
    match pv {
        ProtocolVersion::V10 => parse_match_v10(r),
        ProtocolVersion::V11 => Err(ProtocolError::VersionMismatch {
            version: pv,
            item: "standard match structure".to_string(),
        }),
        _ => parse_match_oxm(r),
    }
}

/// Encode a match structure for `pv`, including padding.
///
/// # Errors
///
/// Version mismatch if a field cannot be represented in `pv`.
pub fn encode_match(w: &mut Writer, m: &Match, pv: ProtocolVersion) -> Result<()> {
    match pv {
        ProtocolVersion::V10 => encode_match_v10(w, m),
        ProtocolVersion::V11 => Err(ProtocolError::VersionMismatch {
            version: pv,
            item: "standard match structure".to_string(),
        }),
        _ => {
            encode_match_oxm(w, m);
            Ok(())
        }
    }
}

fn parse_match_oxm(r: &mut Reader<'_>) -> Result<Match> {
    let start = r.position();
    let match_type = r.read_u16()?;
    if match_type != MATCH_TYPE_OXM {
        return Err(ProtocolError::Malformed {
            context: "match",
            offset: start,
            detail: format!("match type {match_type}, expected OXM (1)"),
        });
    }
    let declared = usize::from(r.read_u16()?);
    tlv::payload_len(r, "match", declared, MATCH_HEADER_LEN)?;

    let target = start + declared;
    let mut fields = Vec::new();
    while r.position() < target {
        fields.push(MatchField::decode(r)?);
    }
    if r.position() != target {
        return Err(ProtocolError::Malformed {
            context: "match",
            offset: r.position(),
            detail: format!("oxm entries overran declared length by {}", r.position() - target),
        });
    }
    tlv::finish_padded(r, start, declared)?;
    Ok(Match { fields })
}

fn encode_match_oxm(w: &mut Writer, m: &Match) {
    let start = w.len();
    w.put_u16(MATCH_TYPE_OXM);
    w.put_u16(0); // length patched below
    for f in &m.fields {
        f.encode(w);
    }
    let unpadded = w.len() - start;
    w.patch_u16_at(start + 2, unpadded as u16);
    tlv::write_pad8(w, unpadded);
}

fn prefix_to_mask(wild_bits: u32) -> Option<Ipv4Addr> {
    // 6-bit count of wildcarded low bits; >= 32 means fully wild
    match wild_bits {
        0 => None, // exact match, no mask needed
        1..=31 => Some(Ipv4Addr::from(u32::MAX << wild_bits)),
        _ => Some(Ipv4Addr::from(0u32)), // fully wild; field will be omitted
    }
}

fn mask_to_prefix_wild_bits(mask: Option<Ipv4Addr>, pv: ProtocolVersion) -> Result<u32> {
    let Some(mask) = mask else { return Ok(0) };
    let bits = u32::from(mask);
    let wild = bits.trailing_zeros();
    // 1.0 can only express prefix masks
    if bits != 0 && bits != u32::MAX << wild {
        return Err(ProtocolError::VersionMismatch {
            version: pv,
            item: format!("non-prefix IPv4 mask {mask}"),
        });
    }
    Ok(if bits == 0 { 32 } else { wild })
}

fn parse_match_v10(r: &mut Reader<'_>) -> Result<Match> {
    use MatchField::*;
    let wildcards = r.read_u32()?;
    let in_port = r.read_u16()?;
    let dl_src = r.read_mac()?;
    let dl_dst = r.read_mac()?;
    let dl_vlan = r.read_u16()?;
    let dl_vlan_pcp = r.read_u8()?;
    r.skip(1)?;
    let dl_type = r.read_u16()?;
    let nw_tos = r.read_u8()?;
    let nw_proto = r.read_u8()?;
    r.skip(2)?;
    let nw_src = r.read_ipv4()?;
    let nw_dst = r.read_ipv4()?;
    let tp_src = r.read_u16()?;
    let tp_dst = r.read_u16()?;

    let is_wild = |bit: u32| wildcards & bit != 0;
    let is_arp = dl_type == 0x0806;
    let mut fields = Vec::new();
    if !is_wild(wild::IN_PORT) {
        fields.push(InPort(PortNumber::from_v10(in_port)));
    }
    if !is_wild(wild::DL_SRC) {
        fields.push(EthSrc { addr: dl_src, mask: None });
    }
    if !is_wild(wild::DL_DST) {
        fields.push(EthDst { addr: dl_dst, mask: None });
    }
    if !is_wild(wild::DL_VLAN) {
        fields.push(VlanVid { vid: dl_vlan, mask: None });
    }
    if !is_wild(wild::DL_VLAN_PCP) {
        fields.push(VlanPcp(dl_vlan_pcp));
    }
    if !is_wild(wild::DL_TYPE) {
        fields.push(EthType(dl_type));
    }
    if !is_wild(wild::NW_TOS) {
        fields.push(IpDscp(nw_tos >> 2));
    }
    if !is_wild(wild::NW_PROTO) {
        if is_arp {
            fields.push(ArpOp(u16::from(nw_proto)));
        } else {
            fields.push(IpProto(nw_proto));
        }
    }
    let src_wild = (wildcards >> wild::NW_SRC_SHIFT) & wild::NW_MASK;
    if src_wild < 32 {
        let mask = prefix_to_mask(src_wild);
        if is_arp {
            fields.push(ArpSpa { addr: nw_src, mask });
        } else {
            fields.push(Ipv4Src { addr: nw_src, mask });
        }
    }
    let dst_wild = (wildcards >> wild::NW_DST_SHIFT) & wild::NW_MASK;
    if dst_wild < 32 {
        let mask = prefix_to_mask(dst_wild);
        if is_arp {
            fields.push(ArpTpa { addr: nw_dst, mask });
        } else {
            fields.push(Ipv4Dst { addr: nw_dst, mask });
        }
    }
    if !is_wild(wild::TP_SRC) {
        fields.push(match nw_proto {
            6 => TcpSrc(tp_src),
            17 => UdpSrc(tp_src),
            1 => Icmpv4Type(tp_src as u8),
            _ => TcpSrc(tp_src),
        });
    }
    if !is_wild(wild::TP_DST) {
        fields.push(match nw_proto {
            6 => TcpDst(tp_dst),
            17 => UdpDst(tp_dst),
            1 => Icmpv4Code(tp_dst as u8),
            _ => TcpDst(tp_dst),
        });
    }
    Ok(Match { fields })
}

fn encode_match_v10(w: &mut Writer, m: &Match) -> Result<()> {
    use MatchField::*;
    let pv = ProtocolVersion::V10;
    let mut wildcards = wild::ALL;
    let mut in_port = 0u16;
    let mut dl_src = MacAddress::default();
    let mut dl_dst = MacAddress::default();
    let mut dl_vlan = 0u16;
    let mut dl_vlan_pcp = 0u8;
    let mut dl_type = 0u16;
    let mut nw_tos = 0u8;
    let mut nw_proto = 0u8;
    let mut nw_src = Ipv4Addr::from(0u32);
    let mut nw_dst = Ipv4Addr::from(0u32);
    let mut tp_src = 0u16;
    let mut tp_dst = 0u16;

    fn clear(bit: u32, wildcards: &mut u32) {
        *wildcards &= !bit;
    }
    for f in &m.fields {
        match f {
            InPort(p) => {
                in_port = p.to_v10()?;
                clear(wild::IN_PORT, &mut wildcards);
            }
            EthSrc { addr, mask: None } => {
                dl_src = *addr;
                clear(wild::DL_SRC, &mut wildcards);
            }
            EthDst { addr, mask: None } => {
                dl_dst = *addr;
                clear(wild::DL_DST, &mut wildcards);
            }
            VlanVid { vid, mask: None } => {
                dl_vlan = *vid;
                clear(wild::DL_VLAN, &mut wildcards);
            }
            VlanPcp(v) => {
                dl_vlan_pcp = *v;
                clear(wild::DL_VLAN_PCP, &mut wildcards);
            }
            EthType(v) => {
                dl_type = *v;
                clear(wild::DL_TYPE, &mut wildcards);
            }
            IpDscp(v) => {
                nw_tos = v << 2;
                clear(wild::NW_TOS, &mut wildcards);
            }
            IpProto(v) => {
                nw_proto = *v;
                clear(wild::NW_PROTO, &mut wildcards);
            }
            ArpOp(v) => {
                nw_proto = *v as u8;
                clear(wild::NW_PROTO, &mut wildcards);
            }
            Ipv4Src { addr, mask } | ArpSpa { addr, mask } => {
                nw_src = *addr;
                let bits = mask_to_prefix_wild_bits(*mask, pv)?;
                wildcards = (wildcards & !(wild::NW_MASK << wild::NW_SRC_SHIFT))
                    | (bits << wild::NW_SRC_SHIFT);
            }
            Ipv4Dst { addr, mask } | ArpTpa { addr, mask } => {
                nw_dst = *addr;
                let bits = mask_to_prefix_wild_bits(*mask, pv)?;
                wildcards = (wildcards & !(wild::NW_MASK << wild::NW_DST_SHIFT))
                    | (bits << wild::NW_DST_SHIFT);
            }
            TcpSrc(v) | UdpSrc(v) => {
                tp_src = *v;
                clear(wild::TP_SRC, &mut wildcards);
            }
            TcpDst(v) | UdpDst(v) => {
                tp_dst = *v;
                clear(wild::TP_DST, &mut wildcards);
            }
            Icmpv4Type(v) => {
                tp_src = u16::from(*v);
                clear(wild::TP_SRC, &mut wildcards);
            }
            Icmpv4Code(v) => {
                tp_dst = u16::from(*v);
                clear(wild::TP_DST, &mut wildcards);
            }
            other => {
                return Err(ProtocolError::VersionMismatch {
                    version: pv,
                    item: format!("match field {other:?}"),
                })
            }
        }
    }

    w.put_u32(wildcards);
    w.put_u16(in_port);
    w.put_mac(dl_src);
    w.put_mac(dl_dst);
    w.put_u16(dl_vlan);
    w.put_u8(dl_vlan_pcp);
    w.put_zeros(1);
    w.put_u16(dl_type);
    w.put_u8(nw_tos);
    w.put_u8(nw_proto);
    w.put_zeros(2);
    w.put_ipv4(nw_src);
    w.put_ipv4(nw_dst);
    w.put_u16(tp_src);
    w.put_u16(tp_dst);
    Ok(())
}
