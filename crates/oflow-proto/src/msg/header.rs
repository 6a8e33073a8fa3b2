//! The 8-byte frame header and the per-version message type tables.
//!
//! Every message leads with `version:8, type:8, length:16, xid:32`
//! (big-endian). The header is a zero-copy structure: fields are raw byte
//! arrays, so any 8-byte pattern is a valid in-memory header and casting
//! from untrusted input cannot misbehave; validation of the version and
//! type bytes happens in the accessors.
//!
//! Type codes renumber between 1.0 and 1.1: 1.0 has no GROUP_MOD or
//! TABLE_MOD, so everything from PORT_MOD up shifts, and the multipart
//! pair travels as STATS_REQUEST/STATS_REPLY.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    buffer::{Reader, Writer},
    errors::{ProtocolError, Result},
    version::ProtocolVersion,
};

/// Length of the frame header.
pub const HEADER_LEN: usize = 8;

/// Byte offset of the length field within the header.
pub const HEADER_LEN_FIELD_OFFSET: usize = 2;

/// Message kinds, independent of wire numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum MessageType {
    Hello,
    Error,
    EchoRequest,
    EchoReply,
    Experimenter,
    FeaturesRequest,
    FeaturesReply,
    GetConfigRequest,
    GetConfigReply,
    SetConfig,
    PacketIn,
    FlowRemoved,
    PortStatus,
    PacketOut,
    FlowMod,
    GroupMod,
    PortMod,
    TableMod,
    MultipartRequest,
    MultipartReply,
    BarrierRequest,
    BarrierReply,
    QueueGetConfigRequest,
    QueueGetConfigReply,
    RoleRequest,
    RoleReply,
    GetAsyncRequest,
    GetAsyncReply,
    SetAsync,
    MeterMod,
}

impl MessageType {
    /// The wire code for this type in `pv`.
    ///
    /// # Errors
    ///
    /// Version mismatch for kinds the revision does not define.
    pub fn wire_code(self, pv: ProtocolVersion) -> Result<u8> {
        use MessageType::*;
        let shared = match self {
            Hello => 0,
            Error => 1,
            EchoRequest => 2,
            EchoReply => 3,
            Experimenter => 4,
            FeaturesRequest => 5,
            FeaturesReply => 6,
            GetConfigRequest => 7,
            GetConfigReply => 8,
            SetConfig => 9,
            PacketIn => 10,
            FlowRemoved => 11,
            PortStatus => 12,
            PacketOut => 13,
            FlowMod => 14,
            other => {
                return if pv == ProtocolVersion::V10 {
                    match other {
                        PortMod => Ok(15),
                        MultipartRequest => Ok(16),
                        MultipartReply => Ok(17),
                        BarrierRequest => Ok(18),
                        BarrierReply => Ok(19),
                        QueueGetConfigRequest => Ok(20),
                        QueueGetConfigReply => Ok(21),
                        _ => Err(ProtocolError::VersionMismatch {
                            version: pv,
                            item: format!("message type {other:?}"),
                        }),
                    }
                } else {
                    match other {
                        GroupMod => Ok(15),
                        PortMod => Ok(16),
                        TableMod => Ok(17),
                        MultipartRequest => Ok(18),
                        MultipartReply => Ok(19),
                        BarrierRequest => Ok(20),
                        BarrierReply => Ok(21),
                        QueueGetConfigRequest => Ok(22),
                        QueueGetConfigReply => Ok(23),
                        RoleRequest | RoleReply if pv < ProtocolVersion::V12 => {
                            Err(ProtocolError::VersionMismatch {
                                version: pv,
                                item: format!("message type {other:?}"),
                            })
                        }
                        RoleRequest => Ok(24),
                        RoleReply => Ok(25),
                        GetAsyncRequest | GetAsyncReply | SetAsync | MeterMod
                            if pv < ProtocolVersion::V13 =>
                        {
                            Err(ProtocolError::VersionMismatch {
                                version: pv,
                                item: format!("message type {other:?}"),
                            })
                        }
                        GetAsyncRequest => Ok(26),
                        GetAsyncReply => Ok(27),
                        SetAsync => Ok(28),
                        MeterMod => Ok(29),
                        _ => unreachable!("shared codes handled above"),
                    }
                };
            }
        };
        Ok(shared)
    }

    /// Decode a wire type code for `pv`.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownType`] for codes the revision does not define.
    pub fn from_wire(code: u8, pv: ProtocolVersion) -> Result<Self> {
        use MessageType::*;
        let t = match code {
            0 => Hello,
            1 => Error,
            2 => EchoRequest,
            3 => EchoReply,
            4 => Experimenter,
            5 => FeaturesRequest,
            6 => FeaturesReply,
            7 => GetConfigRequest,
            8 => GetConfigReply,
            9 => SetConfig,
            10 => PacketIn,
            11 => FlowRemoved,
            12 => PortStatus,
            13 => PacketOut,
            14 => FlowMod,
            _ if pv == ProtocolVersion::V10 => match code {
                15 => PortMod,
                16 => MultipartRequest,
                17 => MultipartReply,
                18 => BarrierRequest,
                19 => BarrierReply,
                20 => QueueGetConfigRequest,
                21 => QueueGetConfigReply,
                _ => return Err(ProtocolError::UnknownType { version: pv, code }),
            },
            _ => match code {
                15 => GroupMod,
                16 => PortMod,
                17 => TableMod,
                18 => MultipartRequest,
                19 => MultipartReply,
                20 => BarrierRequest,
                21 => BarrierReply,
                22 => QueueGetConfigRequest,
                23 => QueueGetConfigReply,
                24 if pv >= ProtocolVersion::V12 => RoleRequest,
                25 if pv >= ProtocolVersion::V12 => RoleReply,
                26 if pv >= ProtocolVersion::V13 => GetAsyncRequest,
                27 if pv >= ProtocolVersion::V13 => GetAsyncReply,
                28 if pv >= ProtocolVersion::V13 => SetAsync,
                29 if pv >= ProtocolVersion::V13 => MeterMod,
                _ => return Err(ProtocolError::UnknownType { version: pv, code }),
            },
        };
        Ok(t)
    }
}

/// The raw frame header. Fields are byte arrays to keep every bit pattern
/// valid for the zero-copy cast; use the accessors for typed views.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct Header {
    version: u8,
    msg_type: u8,
    length: [u8; 2],
    xid: [u8; 4],
}

impl Header {
    /// Build a header from typed parts.
    ///
    /// # Errors
    ///
    /// Version mismatch if `msg_type` has no code in `pv`.
    pub fn new(pv: ProtocolVersion, msg_type: MessageType, length: u16, xid: u32) -> Result<Self> {
        Ok(Self {
            version: pv.wire_byte(),
            msg_type: msg_type.wire_code(pv)?,
            length: length.to_be_bytes(),
            xid: xid.to_be_bytes(),
        })
    }

    /// Read a header off the reader (zero-copy cast of the next 8 bytes).
    ///
    /// # Errors
    ///
    /// Buffer underflow with fewer than 8 readable bytes.
    pub fn parse(r: &mut Reader<'_>) -> Result<Self> {
        let offset = r.position();
        let bytes = r.read_bytes(HEADER_LEN)?;
        Header::read_from_bytes(bytes).map_err(|_| ProtocolError::BufferUnderflow {
            offset,
            needed: HEADER_LEN,
            available: bytes.len(),
        })
    }

    /// Write the header.
    pub fn encode(&self, w: &mut Writer) {
        w.put_slice(self.as_bytes());
    }

    /// The raw version byte.
    #[must_use]
    pub fn version_byte(&self) -> u8 {
        self.version
    }

    /// The decoded protocol version.
    ///
    /// # Errors
    ///
    /// Unknown-version decode error for undefined version bytes.
    pub fn version(&self) -> Result<ProtocolVersion> {
        ProtocolVersion::from_wire(self.version, 0)
    }

    /// The raw type code.
    #[must_use]
    pub fn type_code(&self) -> u8 {
        self.msg_type
    }

    /// The decoded message type.
    ///
    /// # Errors
    ///
    /// Unknown-version or unknown-type decode errors.
    pub fn message_type(&self) -> Result<MessageType> {
        MessageType::from_wire(self.msg_type, self.version()?)
    }

    /// Total message length, header included.
    #[must_use]
    pub fn length(&self) -> u16 {
        u16::from_be_bytes(self.length)
    }

    /// The transaction id.
    #[must_use]
    pub fn xid(&self) -> u32 {
        u32::from_be_bytes(self.xid)
    }

    pub(crate) fn set_xid(&mut self, xid: u32) {
        self.xid = xid.to_be_bytes();
    }

    pub(crate) fn set_length(&mut self, length: u16) {
        self.length = length.to_be_bytes();
    }
}

impl std::fmt::Debug for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Header")
            .field("version", &format_args!("{:#04x}", self.version))
            .field("type", &self.msg_type)
            .field("length", &self.length())
            .field("xid", &self.xid())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        // any 8 bytes are a structurally valid header; parsing and
        // re-encoding must be byte identity regardless of field values
        #[test]
        fn raw_header_bytes_round_trip(bytes in prop::array::uniform8(any::<u8>())) {
            let mut r = Reader::new(&bytes);
            let h = Header::parse(&mut r).unwrap();
            prop_assert_eq!(r.position(), HEADER_LEN);
            let mut w = Writer::new();
            h.encode(&mut w);
            prop_assert_eq!(w.into_vec(), bytes.to_vec());
            prop_assert_eq!(h.length(), u16::from_be_bytes([bytes[2], bytes[3]]));
            prop_assert_eq!(h.xid(), u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]));
        }
    }

    #[test]
    fn header_round_trips() {
        let h = Header::new(ProtocolVersion::V13, MessageType::FlowMod, 56, 0xABCD).unwrap();
        let mut w = Writer::new();
        h.encode(&mut w);
        let bytes = w.into_vec();
        assert_eq!(bytes, vec![0x04, 14, 0, 56, 0, 0, 0xAB, 0xCD]);
        let mut r = Reader::new(&bytes);
        let parsed = Header::parse(&mut r).unwrap();
        assert_eq!(parsed, h);
        assert_eq!(parsed.version().unwrap(), ProtocolVersion::V13);
        assert_eq!(parsed.message_type().unwrap(), MessageType::FlowMod);
    }

    #[test]
    fn type_codes_renumber_between_10_and_13() {
        let pairs = [
            (MessageType::PortMod, 15u8, 16u8),
            (MessageType::MultipartRequest, 16, 18),
            (MessageType::BarrierRequest, 18, 20),
            (MessageType::QueueGetConfigReply, 21, 23),
        ];
        for (t, v10, v13) in pairs {
            assert_eq!(t.wire_code(ProtocolVersion::V10).unwrap(), v10);
            assert_eq!(t.wire_code(ProtocolVersion::V13).unwrap(), v13);
            assert_eq!(MessageType::from_wire(v10, ProtocolVersion::V10).unwrap(), t);
            assert_eq!(MessageType::from_wire(v13, ProtocolVersion::V13).unwrap(), t);
        }
    }

    #[test]
    fn version_gated_types() {
        assert!(MessageType::GroupMod.wire_code(ProtocolVersion::V10).is_err());
        assert!(MessageType::RoleRequest.wire_code(ProtocolVersion::V11).is_err());
        assert!(MessageType::MeterMod.wire_code(ProtocolVersion::V12).is_err());
        assert!(MessageType::MeterMod.wire_code(ProtocolVersion::V13).is_ok());
        assert!(matches!(
            MessageType::from_wire(29, ProtocolVersion::V12),
            Err(ProtocolError::UnknownType { .. })
        ));
        assert!(matches!(
            MessageType::from_wire(22, ProtocolVersion::V10),
            Err(ProtocolError::UnknownType { .. })
        ));
    }

    #[test]
    fn round_trip_every_type_per_version() {
        use crate::version::ALL_VERSIONS;
        for pv in ALL_VERSIONS {
            for code in 0..=29u8 {
                if let Ok(t) = MessageType::from_wire(code, pv) {
                    assert_eq!(t.wire_code(pv).unwrap(), code);
                }
            }
        }
    }
}
