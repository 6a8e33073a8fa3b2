//! Flow instruction structures (1.1+).
//!
//! Instructions self-header with `(type: u16, length: u16)` like actions.
//! The three action-carrying kinds nest an action list that runs to the end
//! of the instruction's declared length.

use crate::{
    actions::{encode_action_list, parse_action_list, Action},
    buffer::{Reader, Writer},
    errors::{ProtocolError, Result},
    tlv,
    types::TableId,
    version::ProtocolVersion,
};

const INSTR_HEADER_LEN: usize = 4;

const IT_GOTO_TABLE: u16 = 1;
const IT_WRITE_METADATA: u16 = 2;
const IT_WRITE_ACTIONS: u16 = 3;
const IT_APPLY_ACTIONS: u16 = 4;
const IT_CLEAR_ACTIONS: u16 = 5;
const IT_METER: u16 = 6;
const IT_EXPERIMENTER: u16 = 0xffff;

/// Instruction type codes, used where lists of *supported* instructions
/// travel as bare 4-byte headers (table-feature properties).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub enum InstructionType {
    GotoTable,
    WriteMetadata,
    WriteActions,
    ApplyActions,
    ClearActions,
    Meter,
}

impl InstructionType {
    /// The wire code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::GotoTable => IT_GOTO_TABLE,
            Self::WriteMetadata => IT_WRITE_METADATA,
            Self::WriteActions => IT_WRITE_ACTIONS,
            Self::ApplyActions => IT_APPLY_ACTIONS,
            Self::ClearActions => IT_CLEAR_ACTIONS,
            Self::Meter => IT_METER,
        }
    }

    /// Decode a wire code; `None` for unknown codes.
    #[must_use]
    pub const fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            IT_GOTO_TABLE => Self::GotoTable,
            IT_WRITE_METADATA => Self::WriteMetadata,
            IT_WRITE_ACTIONS => Self::WriteActions,
            IT_APPLY_ACTIONS => Self::ApplyActions,
            IT_CLEAR_ACTIONS => Self::ClearActions,
            IT_METER => Self::Meter,
            _ => return None,
        })
    }
}

/// One flow instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Continue processing at another table
    GotoTable(TableId),
    /// Write masked metadata into the pipeline
    WriteMetadata {
        /// Metadata value
        metadata: u64,
        /// Which bits to write
        mask: u64,
    },
    /// Merge actions into the action set
    WriteActions(Vec<Action>),
    /// Apply actions immediately
    ApplyActions(Vec<Action>),
    /// Clear the action set
    ClearActions,
    /// Apply a meter (1.3)
    Meter(u32),
    /// Experimenter-defined instruction
    Experimenter {
        /// Experimenter id
        id: u32,
        /// Raw payload
        data: Vec<u8>,
    },
}

impl Instruction {
    /// Encoded length for `pv`, header included.
    ///
    /// # Errors
    ///
    /// Version mismatch if a nested action cannot be expressed in `pv`.
    pub fn encoded_len(&self, pv: ProtocolVersion) -> Result<usize> {
        Ok(match self {
            Self::GotoTable(_) | Self::ClearActions | Self::Meter(_) => 8,
            Self::WriteMetadata { .. } => 24,
            Self::WriteActions(actions) | Self::ApplyActions(actions) => {
                let mut len = 8;
                for a in actions {
                    len += a.encoded_len(pv)?;
                }
                len
            }
            Self::Experimenter { data, .. } => tlv::padded_len(INSTR_HEADER_LEN + 4 + data.len()),
        })
    }
}

/// Parse instructions until the reader reaches `target`.
///
/// # Errors
///
/// Version mismatch below 1.1; decode errors on malformed entries.
pub fn parse_instruction_list(
    target: usize,
    r: &mut Reader<'_>,
    pv: ProtocolVersion,
) -> Result<Vec<Instruction>> {
    if pv < ProtocolVersion::V11 {
        return Err(ProtocolError::VersionMismatch {
            version: pv,
            item: "instruction list".to_string(),
        });
    }
    let mut instructions = Vec::new();
    while r.position() < target {
        instructions.push(parse_instruction(r, pv)?);
    }
    if r.position() != target {
        return Err(ProtocolError::Malformed {
            context: "instruction list",
            offset: r.position(),
            detail: format!("overran container by {}", r.position() - target),
        });
    }
    Ok(instructions)
}

fn parse_instruction(r: &mut Reader<'_>, pv: ProtocolVersion) -> Result<Instruction> {
    let start = r.position();
    let code = r.read_u16()?;
    let declared = usize::from(r.read_u16()?);
    tlv::payload_len(r, "instruction", declared, INSTR_HEADER_LEN)?;
    let target = start + declared;

    let instr = match code {
        IT_GOTO_TABLE => {
            let table = TableId(r.read_u8()?);
            r.skip(3)?;
            Instruction::GotoTable(table)
        }
        IT_WRITE_METADATA => {
            r.skip(4)?;
            let metadata = r.read_u64()?;
            let mask = r.read_u64()?;
            Instruction::WriteMetadata { metadata, mask }
        }
        IT_WRITE_ACTIONS | IT_APPLY_ACTIONS | IT_CLEAR_ACTIONS => {
            r.skip(4)?;
            let actions = parse_action_list(target, r, pv)?;
            match code {
                IT_WRITE_ACTIONS => Instruction::WriteActions(actions),
                IT_APPLY_ACTIONS => Instruction::ApplyActions(actions),
                _ => {
                    if !actions.is_empty() {
                        return Err(ProtocolError::Malformed {
                            context: "instruction",
                            offset: start,
                            detail: "clear-actions carries an action list".to_string(),
                        });
                    }
                    Instruction::ClearActions
                }
            }
        }
        IT_METER => {
            if pv < ProtocolVersion::V13 {
                return Err(ProtocolError::VersionMismatch {
                    version: pv,
                    item: "meter instruction".to_string(),
                });
            }
            Instruction::Meter(r.read_u32()?)
        }
        IT_EXPERIMENTER => {
            let data_len =
                declared.checked_sub(INSTR_HEADER_LEN + 4).ok_or(ProtocolError::Malformed {
                    context: "instruction",
                    offset: start,
                    detail: format!("experimenter instruction length {declared} too short"),
                })?;
            let id = r.read_u32()?;
            let data = r.read_bytes(data_len)?.to_vec();
            Instruction::Experimenter { id, data }
        }
        other => {
            return Err(ProtocolError::Malformed {
                context: "instruction",
                offset: start,
                detail: format!("unknown instruction type {other}"),
            })
        }
    };
    r.seek(target);
    Ok(instr)
}

/// Encode a list of instructions.
///
/// # Errors
///
/// Version mismatch below 1.1 or for nested content the revision cannot
/// express.
pub fn encode_instruction_list(
    w: &mut Writer,
    instructions: &[Instruction],
    pv: ProtocolVersion,
) -> Result<()> {
    if pv < ProtocolVersion::V11 {
        return Err(ProtocolError::VersionMismatch {
            version: pv,
            item: "instruction list".to_string(),
        });
    }
    for i in instructions {
        encode_instruction(w, i, pv)?;
    }
    Ok(())
}

fn encode_instruction(w: &mut Writer, i: &Instruction, pv: ProtocolVersion) -> Result<()> {
    let len = i.encoded_len(pv)?;
    match i {
        Instruction::GotoTable(table) => {
            put_header(w, IT_GOTO_TABLE, len);
            w.put_u8(table.0);
            w.put_zeros(3);
        }
        Instruction::WriteMetadata { metadata, mask } => {
            put_header(w, IT_WRITE_METADATA, len);
            w.put_zeros(4);
            w.put_u64(*metadata);
            w.put_u64(*mask);
        }
        Instruction::WriteActions(actions) => {
            put_header(w, IT_WRITE_ACTIONS, len);
            w.put_zeros(4);
            encode_action_list(w, actions, pv)?;
        }
        Instruction::ApplyActions(actions) => {
            put_header(w, IT_APPLY_ACTIONS, len);
            w.put_zeros(4);
            encode_action_list(w, actions, pv)?;
        }
        Instruction::ClearActions => {
            put_header(w, IT_CLEAR_ACTIONS, len);
            w.put_zeros(4);
        }
        Instruction::Meter(meter) => {
            if pv < ProtocolVersion::V13 {
                return Err(ProtocolError::VersionMismatch {
                    version: pv,
                    item: "meter instruction".to_string(),
                });
            }
            put_header(w, IT_METER, len);
            w.put_u32(*meter);
        }
        Instruction::Experimenter { id, data } => {
            put_header(w, IT_EXPERIMENTER, len);
            w.put_u32(*id);
            w.put_slice(data);
            tlv::write_pad8(w, INSTR_HEADER_LEN + 4 + data.len());
        }
    }
    Ok(())
}

fn put_header(w: &mut Writer, code: u16, len: usize) {
    w.put_u16(code);
    w.put_u16(len as u16);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PortNumber;

    #[test]
    fn instructions_round_trip() {
        let instructions = vec![
            Instruction::GotoTable(TableId(2)),
            Instruction::WriteMetadata { metadata: 0xfeed, mask: 0xffff },
            Instruction::ApplyActions(vec![
                Action::Output { port: PortNumber(1), max_len: 0 },
                Action::DecNwTtl,
            ]),
            Instruction::ClearActions,
            Instruction::Meter(5),
        ];
        let mut w = Writer::new();
        encode_instruction_list(&mut w, &instructions, ProtocolVersion::V13).unwrap();
        let bytes = w.into_vec();
        let mut r = Reader::new(&bytes);
        let parsed = parse_instruction_list(bytes.len(), &mut r, ProtocolVersion::V13).unwrap();
        assert_eq!(parsed, instructions);
    }

    #[test]
    fn meter_gated_to_13() {
        let mut w = Writer::new();
        let err = encode_instruction_list(&mut w, &[Instruction::Meter(1)], ProtocolVersion::V12)
            .unwrap_err();
        assert!(err.is_version_error());
    }

    #[test]
    fn no_instructions_before_11() {
        let bytes = [0u8; 8];
        let mut r = Reader::new(&bytes);
        let err = parse_instruction_list(8, &mut r, ProtocolVersion::V10).unwrap_err();
        assert!(err.is_version_error());
    }

    #[test]
    fn unknown_instruction_type_is_decode_error() {
        let bytes = [0x00, 0x09, 0x00, 0x08, 0, 0, 0, 0];
        let mut r = Reader::new(&bytes);
        let err = parse_instruction_list(8, &mut r, ProtocolVersion::V13).unwrap_err();
        assert!(err.is_decode_error());
    }
}
