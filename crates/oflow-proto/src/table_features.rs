//! Table-feature properties (1.3): the recursive TLV-of-TLV family.
//!
//! Each property is a `(type: u16, length: u16)` TLV padded to 8 bytes.
//! The interesting ones nest further self-describing lists: bare 4-byte
//! instruction or action headers, OXM field headers, or experimenter
//! sub-entries carrying their own ids and payloads - each level applying
//! the padding rule independently.
//!
//! Unknown property types decode opaquely so that features from newer
//! revisions survive a round trip.

use crate::{
    actions::ActionType,
    buffer::{Reader, Writer},
    errors::{ProtocolError, Result},
    instructions::InstructionType,
    match_field::{OxmBasicFieldType, OXM_CLASS_BASIC, OXM_CLASS_EXPERIMENTER},
    tlv,
    types::TableId,
    version::ProtocolVersion,
};

const PROP_HEADER_LEN: usize = 4;
const SUB_HEADER_LEN: usize = 4;
const EXPERIMENTER_CODE: u16 = 0xffff;

const TFPT_INSTRUCTIONS: u16 = 0;
const TFPT_INSTRUCTIONS_MISS: u16 = 1;
const TFPT_NEXT_TABLES: u16 = 2;
const TFPT_NEXT_TABLES_MISS: u16 = 3;
const TFPT_WRITE_ACTIONS: u16 = 4;
const TFPT_WRITE_ACTIONS_MISS: u16 = 5;
const TFPT_APPLY_ACTIONS: u16 = 6;
const TFPT_APPLY_ACTIONS_MISS: u16 = 7;
const TFPT_MATCH: u16 = 8;
const TFPT_WILDCARDS: u16 = 10;
const TFPT_WRITE_SETFIELD: u16 = 12;
const TFPT_WRITE_SETFIELD_MISS: u16 = 13;
const TFPT_APPLY_SETFIELD: u16 = 14;
const TFPT_APPLY_SETFIELD_MISS: u16 = 15;
const TFPT_EXPERIMENTER: u16 = 0xFFFE;
const TFPT_EXPERIMENTER_MISS: u16 = 0xFFFF;

/// An experimenter sub-entry inside an instruction or action support list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimenterEntry {
    /// Experimenter id
    pub id: u32,
    /// Raw bytes after the id
    pub data: Vec<u8>,
}

/// A bare OXM field header inside a set-field/match property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OxmHeader {
    /// A basic field and whether a mask is supported for it
    Basic {
        /// The field
        field: OxmBasicFieldType,
        /// Mask support
        has_mask: bool,
    },
    /// An experimenter field header (the id is the 4-byte payload)
    Experimenter {
        /// Field code within the experimenter class
        field: u8,
        /// Mask support
        has_mask: bool,
        /// Experimenter id
        experimenter: u32,
    },
    /// A header this codec does not model, kept byte-for-byte
    Unknown {
        /// OXM class
        class: u16,
        /// Field code
        field: u8,
        /// Mask bit
        has_mask: bool,
        /// Declared payload length (header lists carry no payload bytes)
        length: u8,
    },
}

/// Which action-set a supported-actions property describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPropKind {
    /// WRITE_ACTIONS
    Write,
    /// APPLY_ACTIONS
    Apply,
}

/// Which field list an OXM property describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OxmPropKind {
    /// Fields the table can match on
    Match,
    /// Fields the table can wildcard
    Wildcards,
    /// Fields WRITE_ACTIONS set-field can touch
    WriteSetField,
    /// Fields APPLY_ACTIONS set-field can touch
    ApplySetField,
}

/// One table-feature property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableFeatureProp {
    /// Supported instructions
    Instructions {
        /// Applies to the table-miss flow when true
        miss: bool,
        /// Supported instruction types
        supported: Vec<InstructionType>,
        /// Experimenter instruction entries
        experimenters: Vec<ExperimenterEntry>,
    },
    /// Tables reachable from this one
    NextTables {
        /// Applies to the table-miss flow when true
        miss: bool,
        /// Reachable table ids
        tables: Vec<TableId>,
    },
    /// Supported actions
    Actions {
        /// WRITE_ACTIONS or APPLY_ACTIONS
        kind: ActionPropKind,
        /// Applies to the table-miss flow when true
        miss: bool,
        /// Supported action types
        supported: Vec<ActionType>,
        /// Experimenter action entries
        experimenters: Vec<ExperimenterEntry>,
    },
    /// Supported match/set fields
    Oxm {
        /// Which field list this is
        kind: OxmPropKind,
        /// Applies to the table-miss flow when true (never for
        /// Match/Wildcards, which have no miss variants)
        miss: bool,
        /// Field headers
        fields: Vec<OxmHeader>,
    },
    /// Experimenter property
    Experimenter {
        /// Applies to the table-miss flow when true
        miss: bool,
        /// Experimenter id
        experimenter: u32,
        /// Experimenter-defined subtype
        exp_type: u32,
        /// Raw payload
        data: Vec<u8>,
    },
    /// A property type this codec does not model, kept byte-for-byte
    Unknown {
        /// Wire property type
        code: u16,
        /// Raw payload
        payload: Vec<u8>,
    },
}

impl TableFeatureProp {
    fn wire_code(&self) -> u16 {
        match self {
            Self::Instructions { miss: false, .. } => TFPT_INSTRUCTIONS,
            Self::Instructions { miss: true, .. } => TFPT_INSTRUCTIONS_MISS,
            Self::NextTables { miss: false, .. } => TFPT_NEXT_TABLES,
            Self::NextTables { miss: true, .. } => TFPT_NEXT_TABLES_MISS,
            Self::Actions { kind: ActionPropKind::Write, miss: false, .. } => TFPT_WRITE_ACTIONS,
            Self::Actions { kind: ActionPropKind::Write, miss: true, .. } => {
                TFPT_WRITE_ACTIONS_MISS
            }
            Self::Actions { kind: ActionPropKind::Apply, miss: false, .. } => TFPT_APPLY_ACTIONS,
            Self::Actions { kind: ActionPropKind::Apply, miss: true, .. } => {
                TFPT_APPLY_ACTIONS_MISS
            }
            Self::Oxm { kind: OxmPropKind::Match, .. } => TFPT_MATCH,
            Self::Oxm { kind: OxmPropKind::Wildcards, .. } => TFPT_WILDCARDS,
            Self::Oxm { kind: OxmPropKind::WriteSetField, miss: false, .. } => TFPT_WRITE_SETFIELD,
            Self::Oxm { kind: OxmPropKind::WriteSetField, miss: true, .. } => {
                TFPT_WRITE_SETFIELD_MISS
            }
            Self::Oxm { kind: OxmPropKind::ApplySetField, miss: false, .. } => TFPT_APPLY_SETFIELD,
            Self::Oxm { kind: OxmPropKind::ApplySetField, miss: true, .. } => {
                TFPT_APPLY_SETFIELD_MISS
            }
            Self::Experimenter { miss: false, .. } => TFPT_EXPERIMENTER,
            Self::Experimenter { miss: true, .. } => TFPT_EXPERIMENTER_MISS,
            Self::Unknown { code, .. } => *code,
        }
    }

    /// Unpadded encoded length, header included.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        PROP_HEADER_LEN
            + match self {
                Self::Instructions { supported, experimenters, .. } => {
                    supported.len() * SUB_HEADER_LEN
                        + experimenters
                            .iter()
                            .map(|e| SUB_HEADER_LEN + 4 + e.data.len())
                            .sum::<usize>()
                }
                Self::NextTables { tables, .. } => tables.len(),
                Self::Actions { supported, experimenters, .. } => {
                    supported.len() * SUB_HEADER_LEN
                        + experimenters
                            .iter()
                            .map(|e| SUB_HEADER_LEN + 4 + e.data.len())
                            .sum::<usize>()
                }
                Self::Oxm { fields, .. } => fields
                    .iter()
                    .map(|f| match f {
                        OxmHeader::Experimenter { .. } => SUB_HEADER_LEN + 4,
                        _ => SUB_HEADER_LEN,
                    })
                    .sum::<usize>(),
                Self::Experimenter { data, .. } => 8 + data.len(),
                Self::Unknown { payload, .. } => payload.len(),
            }
    }
}

/// Parse table-feature properties until the reader reaches `target`.
///
/// # Errors
///
/// Version mismatch below 1.3; decode errors when the properties do not
/// exactly fill the container.
pub fn parse_prop_list(
    target: usize,
    r: &mut Reader<'_>,
    pv: ProtocolVersion,
) -> Result<Vec<TableFeatureProp>> {
    if pv < ProtocolVersion::V13 {
        return Err(ProtocolError::VersionMismatch {
            version: pv,
            item: "table-feature properties".to_string(),
        });
    }
    let mut props = Vec::new();
    while r.position() < target {
        props.push(parse_prop(r)?);
    }
    if r.position() != target {
        return Err(ProtocolError::Malformed {
            context: "table-feature property list",
            offset: r.position(),
            detail: format!("overran container by {}", r.position() - target),
        });
    }
    Ok(props)
}

fn parse_prop(r: &mut Reader<'_>) -> Result<TableFeatureProp> {
    let start = r.position();
    let code = r.read_u16()?;
    let declared = usize::from(r.read_u16()?);
    let body = tlv::payload_len(r, "table-feature property", declared, PROP_HEADER_LEN)?;
    let body_end = r.position() + body;

    let prop = match code {
        TFPT_INSTRUCTIONS | TFPT_INSTRUCTIONS_MISS => {
            let (supported, experimenters) = parse_sub_headers(r, body_end, |c| {
                InstructionType::from_code(c)
            })?;
            TableFeatureProp::Instructions {
                miss: code == TFPT_INSTRUCTIONS_MISS,
                supported,
                experimenters,
            }
        }
        TFPT_NEXT_TABLES | TFPT_NEXT_TABLES_MISS => {
            let mut tables = Vec::with_capacity(body);
            while r.position() < body_end {
                tables.push(TableId(r.read_u8()?));
            }
            TableFeatureProp::NextTables { miss: code == TFPT_NEXT_TABLES_MISS, tables }
        }
        TFPT_WRITE_ACTIONS | TFPT_WRITE_ACTIONS_MISS | TFPT_APPLY_ACTIONS
        | TFPT_APPLY_ACTIONS_MISS => {
            let (supported, experimenters) =
                parse_sub_headers(r, body_end, |c| ActionType::from_code(c))?;
            let kind = if code == TFPT_WRITE_ACTIONS || code == TFPT_WRITE_ACTIONS_MISS {
                ActionPropKind::Write
            } else {
                ActionPropKind::Apply
            };
            let miss = code == TFPT_WRITE_ACTIONS_MISS || code == TFPT_APPLY_ACTIONS_MISS;
            TableFeatureProp::Actions { kind, miss, supported, experimenters }
        }
        TFPT_MATCH | TFPT_WILDCARDS | TFPT_WRITE_SETFIELD | TFPT_WRITE_SETFIELD_MISS
        | TFPT_APPLY_SETFIELD | TFPT_APPLY_SETFIELD_MISS => {
            let mut fields = Vec::new();
            while r.position() < body_end {
                fields.push(parse_oxm_header(r)?);
            }
            let (kind, miss) = match code {
                TFPT_MATCH => (OxmPropKind::Match, false),
                TFPT_WILDCARDS => (OxmPropKind::Wildcards, false),
                TFPT_WRITE_SETFIELD => (OxmPropKind::WriteSetField, false),
                TFPT_WRITE_SETFIELD_MISS => (OxmPropKind::WriteSetField, true),
                TFPT_APPLY_SETFIELD => (OxmPropKind::ApplySetField, false),
                _ => (OxmPropKind::ApplySetField, true),
            };
            TableFeatureProp::Oxm { kind, miss, fields }
        }
        TFPT_EXPERIMENTER | TFPT_EXPERIMENTER_MISS => {
            if body < 8 {
                return Err(ProtocolError::Malformed {
                    context: "table-feature property",
                    offset: start,
                    detail: format!("experimenter property payload {body} below id+type"),
                });
            }
            let experimenter = r.read_u32()?;
            let exp_type = r.read_u32()?;
            let data = r.read_bytes(body - 8)?.to_vec();
            TableFeatureProp::Experimenter {
                miss: code == TFPT_EXPERIMENTER_MISS,
                experimenter,
                exp_type,
                data,
            }
        }
        _ => TableFeatureProp::Unknown { code, payload: r.read_bytes(body)?.to_vec() },
    };
    if r.position() != body_end {
        return Err(ProtocolError::Malformed {
            context: "table-feature property",
            offset: r.position(),
            detail: "sub-entries did not fill the declared length".to_string(),
        });
    }
    tlv::finish_padded(r, start, declared)?;
    Ok(prop)
}

/// Parse a run of bare `(type, length)` sub-headers, collecting modeled
/// types and experimenter entries.
fn parse_sub_headers<T>(
    r: &mut Reader<'_>,
    body_end: usize,
    decode: impl Fn(u16) -> Option<T>,
) -> Result<(Vec<T>, Vec<ExperimenterEntry>)> {
    let mut supported = Vec::new();
    let mut experimenters = Vec::new();
    while r.position() < body_end {
        let at = r.position();
        let code = r.read_u16()?;
        let declared = usize::from(r.read_u16()?);
        let body = tlv::payload_len(r, "support-list entry", declared, SUB_HEADER_LEN)?;
        if code == EXPERIMENTER_CODE {
            if body < 4 {
                return Err(ProtocolError::Malformed {
                    context: "support-list entry",
                    offset: at,
                    detail: format!("experimenter entry payload {body} below id size"),
                });
            }
            let id = r.read_u32()?;
            let data = r.read_bytes(body - 4)?.to_vec();
            experimenters.push(ExperimenterEntry { id, data });
        } else {
            let Some(t) = decode(code) else {
                return Err(ProtocolError::Malformed {
                    context: "support-list entry",
                    offset: at,
                    detail: format!("unknown support-list type {code}"),
                });
            };
            // a bare header; skip any payload a newer revision might add
            r.skip(body)?;
            supported.push(t);
        }
    }
    Ok((supported, experimenters))
}

fn parse_oxm_header(r: &mut Reader<'_>) -> Result<OxmHeader> {
    let class = r.read_u16()?;
    let byte = r.read_u8()?;
    let field = byte >> 1;
    let has_mask = byte & 1 != 0;
    let length = r.read_u8()?;
    if class == OXM_CLASS_EXPERIMENTER {
        return Ok(OxmHeader::Experimenter { field, has_mask, experimenter: r.read_u32()? });
    }
    if class == OXM_CLASS_BASIC {
        if let Some(ft) = OxmBasicFieldType::from_code(field) {
            return Ok(OxmHeader::Basic { field: ft, has_mask });
        }
    }
    Ok(OxmHeader::Unknown { class, field, has_mask, length })
}

/// Encode a list of table-feature properties.
///
/// # Errors
///
/// Version mismatch below 1.3, or for a miss variant of a property that
/// has none.
pub fn encode_prop_list(
    w: &mut Writer,
    props: &[TableFeatureProp],
    pv: ProtocolVersion,
) -> Result<()> {
    if pv < ProtocolVersion::V13 {
        return Err(ProtocolError::VersionMismatch {
            version: pv,
            item: "table-feature properties".to_string(),
        });
    }
    for p in props {
        encode_prop(w, p)?;
    }
    Ok(())
}

fn encode_prop(w: &mut Writer, p: &TableFeatureProp) -> Result<()> {
    if let TableFeatureProp::Oxm {
        kind: OxmPropKind::Match | OxmPropKind::Wildcards,
        miss: true,
        ..
    } = p
    {
        return Err(ProtocolError::Incomplete("match/wildcards properties have no miss variant"));
    }
    let unpadded = p.encoded_len();
    w.put_u16(p.wire_code());
    w.put_u16(unpadded as u16);
    match p {
        TableFeatureProp::Instructions { supported, experimenters, .. } => {
            for t in supported {
                w.put_u16(t.code());
                w.put_u16(SUB_HEADER_LEN as u16);
            }
            encode_experimenter_entries(w, experimenters);
        }
        TableFeatureProp::NextTables { tables, .. } => {
            for t in tables {
                w.put_u8(t.0);
            }
        }
        TableFeatureProp::Actions { supported, experimenters, .. } => {
            for t in supported {
                w.put_u16(t.code());
                w.put_u16(SUB_HEADER_LEN as u16);
            }
            encode_experimenter_entries(w, experimenters);
        }
        TableFeatureProp::Oxm { fields, .. } => {
            for f in fields {
                match f {
                    OxmHeader::Basic { field, has_mask } => {
                        w.put_u16(OXM_CLASS_BASIC);
                        w.put_u8(field.code() << 1 | u8::from(*has_mask));
                        w.put_u8(0);
                    }
                    OxmHeader::Experimenter { field, has_mask, experimenter } => {
                        w.put_u16(OXM_CLASS_EXPERIMENTER);
                        w.put_u8(field << 1 | u8::from(*has_mask));
                        w.put_u8(4);
                        w.put_u32(*experimenter);
                    }
                    OxmHeader::Unknown { class, field, has_mask, length } => {
                        w.put_u16(*class);
                        w.put_u8(field << 1 | u8::from(*has_mask));
                        w.put_u8(*length);
                    }
                }
            }
        }
        TableFeatureProp::Experimenter { experimenter, exp_type, data, .. } => {
            w.put_u32(*experimenter);
            w.put_u32(*exp_type);
            w.put_slice(data);
        }
        TableFeatureProp::Unknown { payload, .. } => w.put_slice(payload),
    }
    tlv::write_pad8(w, unpadded);
    Ok(())
}

fn encode_experimenter_entries(w: &mut Writer, entries: &[ExperimenterEntry]) {
    for e in entries {
        w.put_u16(EXPERIMENTER_CODE);
        w.put_u16((SUB_HEADER_LEN + 4 + e.data.len()) as u16);
        w.put_u32(e.id);
        w.put_slice(&e.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(props: Vec<TableFeatureProp>) -> Vec<TableFeatureProp> {
        let mut w = Writer::new();
        encode_prop_list(&mut w, &props, ProtocolVersion::V13).unwrap();
        let bytes = w.into_vec();
        assert_eq!(bytes.len() % 8, 0);
        let mut r = Reader::new(&bytes);
        parse_prop_list(bytes.len(), &mut r, ProtocolVersion::V13).unwrap()
    }

    #[test]
    fn instruction_prop_round_trips() {
        let props = vec![TableFeatureProp::Instructions {
            miss: false,
            supported: vec![
                InstructionType::GotoTable,
                InstructionType::ApplyActions,
                InstructionType::Meter,
            ],
            experimenters: vec![],
        }];
        assert_eq!(round_trip(props.clone()), props);
    }

    #[test]
    fn nested_experimenter_entries_round_trip() {
        // two nesting levels: property TLV -> instruction headers -> an
        // experimenter sub-entry with its own payload
        let props = vec![TableFeatureProp::Instructions {
            miss: true,
            supported: vec![InstructionType::WriteActions],
            experimenters: vec![ExperimenterEntry { id: 0x00a0_b0c0, data: vec![9, 9] }],
        }];
        assert_eq!(round_trip(props.clone()), props);
    }

    #[test]
    fn oxm_prop_round_trips() {
        let props = vec![TableFeatureProp::Oxm {
            kind: OxmPropKind::Match,
            miss: false,
            fields: vec![
                OxmHeader::Basic { field: OxmBasicFieldType::InPort, has_mask: false },
                OxmHeader::Basic { field: OxmBasicFieldType::EthDst, has_mask: true },
                OxmHeader::Experimenter { field: 3, has_mask: false, experimenter: 0x5555 },
            ],
        }];
        assert_eq!(round_trip(props.clone()), props);
    }

    #[test]
    fn next_tables_and_experimenter_props_round_trip() {
        let props = vec![
            TableFeatureProp::NextTables {
                miss: false,
                tables: vec![TableId(1), TableId(2), TableId(3)],
            },
            TableFeatureProp::Experimenter {
                miss: false,
                experimenter: 0x0001_0203,
                exp_type: 7,
                data: vec![1, 2, 3, 4, 5],
            },
        ];
        assert_eq!(round_trip(props.clone()), props);
    }

    #[test]
    fn unknown_prop_type_kept_opaque() {
        let props =
            vec![TableFeatureProp::Unknown { code: 11, payload: vec![0xde, 0xad, 0xbe] }];
        assert_eq!(round_trip(props.clone()), props);
    }

    #[test]
    fn props_gated_to_13() {
        let bytes = [0u8; 8];
        let mut r = Reader::new(&bytes);
        assert!(parse_prop_list(8, &mut r, ProtocolVersion::V12).unwrap_err().is_version_error());
    }

    #[test]
    fn padding_excluded_from_declared_length() {
        let props = vec![TableFeatureProp::NextTables { miss: false, tables: vec![TableId(5)] }];
        let mut w = Writer::new();
        encode_prop_list(&mut w, &props, ProtocolVersion::V13).unwrap();
        let bytes = w.into_vec();
        // declared length 5 (header + one table id), wire length 8
        assert_eq!(&bytes[..4], &[0x00, 0x02, 0x00, 0x05]);
        assert_eq!(bytes.len(), 8);
    }
}
