//! Identifier newtypes shared across structures and messages.
//!
//! Reserved values follow the 1.3 numbering; the 1.0 u16 port space is
//! mapped into the u32 space on decode and back on encode, so the rest of
//! the crate deals in one representation.

use std::fmt;

use crate::errors::{ProtocolError, Result};

/// A 48-bit Ethernet MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// The broadcast address ff:ff:ff:ff:ff:ff.
    pub const BROADCAST: Self = Self([0xff; 6]);
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", b[0], b[1], b[2], b[3], b[4], b[5])
    }
}

/// A datapath identifier: 16 bits of implementer-defined data plus a MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DataPathId(pub u64);

impl fmt::Display for DataPathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.to_be_bytes();
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

/// An OpenFlow port number, including the reserved logical ports.
///
/// Stored in the 1.1+ u32 numbering; 1.0's u16 reserved codes
/// (0xff00..=0xffff) map onto 0xffffff00..=0xffffffff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortNumber(pub u32);

impl PortNumber {
    /// Highest usable physical port.
    pub const MAX: Self = Self(0xffff_ff00);
    /// Send the packet out the port it arrived on.
    pub const IN_PORT: Self = Self(0xffff_fff8);
    /// Submit to the flow table (packet-out only).
    pub const TABLE: Self = Self(0xffff_fff9);
    /// Forward using non-OpenFlow pipeline.
    pub const NORMAL: Self = Self(0xffff_fffa);
    /// Flood within the spanning tree.
    pub const FLOOD: Self = Self(0xffff_fffb);
    /// All ports except input.
    pub const ALL: Self = Self(0xffff_fffc);
    /// Send to controller.
    pub const CONTROLLER: Self = Self(0xffff_fffd);
    /// Local openflow "port".
    pub const LOCAL: Self = Self(0xffff_fffe);
    /// Wildcard / "no port" (1.0 calls this NONE).
    pub const ANY: Self = Self(0xffff_ffff);

    /// Widen a 1.0 u16 port code into the u32 numbering.
    #[must_use]
    pub fn from_v10(raw: u16) -> Self {
        if raw >= 0xff00 {
            Self(0xffff_0000 | u32::from(raw))
        } else {
            Self(u32::from(raw))
        }
    }

    /// Narrow into the 1.0 u16 numbering.
    ///
    /// # Errors
    ///
    /// Version mismatch if the value has no u16 representation.
    pub fn to_v10(self) -> Result<u16> {
        if self.0 >= 0xffff_ff00 {
            Ok((self.0 & 0xffff) as u16)
        } else if self.0 <= 0xfeff {
            Ok(self.0 as u16)
        } else {
            Err(ProtocolError::VersionMismatch {
                version: crate::version::ProtocolVersion::V10,
                item: format!("port number {:#010x}", self.0),
            })
        }
    }
}

impl fmt::Display for PortNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::IN_PORT => f.write_str("IN_PORT"),
            Self::TABLE => f.write_str("TABLE"),
            Self::NORMAL => f.write_str("NORMAL"),
            Self::FLOOD => f.write_str("FLOOD"),
            Self::ALL => f.write_str("ALL"),
            Self::CONTROLLER => f.write_str("CONTROLLER"),
            Self::LOCAL => f.write_str("LOCAL"),
            Self::ANY => f.write_str("ANY"),
            Self(n) => write!(f, "{n}"),
        }
    }
}

/// A flow table identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableId(pub u8);

impl TableId {
    /// Last usable table.
    pub const MAX: Self = Self(0xfe);
    /// Wildcard: all tables.
    pub const ALL: Self = Self(0xff);
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ALL {
            f.write_str("ALL")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A group identifier (1.1+).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub u32);

impl GroupId {
    /// Last usable group.
    pub const MAX: Self = Self(0xffff_ff00);
    /// All groups (group-mod delete, stats).
    pub const ALL: Self = Self(0xffff_fffc);
    /// Wildcard for flow stats.
    pub const ANY: Self = Self(0xffff_ffff);
}

/// A queue identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueId(pub u32);

impl QueueId {
    /// Wildcard: all queues.
    pub const ALL: Self = Self(0xffff_ffff);
}

/// A meter identifier (1.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeterId(pub u32);

impl MeterId {
    /// Last usable flow meter.
    pub const MAX: Self = Self(0xffff_0000);
    /// Virtual meter for the slow datapath.
    pub const SLOWPATH: Self = Self(0xffff_fffd);
    /// Virtual meter governing the controller connection.
    pub const CONTROLLER: Self = Self(0xffff_fffe);
    /// Wildcard: all meters.
    pub const ALL: Self = Self(0xffff_ffff);
}

/// A packet buffer id; `NO_BUFFER` means the full frame rides in the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

impl BufferId {
    /// No buffering at the switch.
    pub const NO_BUFFER: Self = Self(0xffff_ffff);

    /// True unless this is the NO_BUFFER sentinel.
    #[must_use]
    pub fn is_buffered(self) -> bool {
        self != Self::NO_BUFFER
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn every_u16_port_survives_the_v10_mapping(raw in any::<u16>()) {
            prop_assert_eq!(PortNumber::from_v10(raw).to_v10().unwrap(), raw);
        }
    }

    #[test]
    fn v10_port_mapping_round_trips() {
        for raw in [5u16, 0xfeff, 0xff00, 0xfff8, 0xffff] {
            let wide = PortNumber::from_v10(raw);
            assert_eq!(wide.to_v10().unwrap(), raw);
        }
        assert_eq!(PortNumber::from_v10(0xfffd), PortNumber::CONTROLLER);
        assert_eq!(PortNumber::from_v10(0xffff), PortNumber::ANY);
    }

    #[test]
    fn unmappable_port_rejected_for_v10() {
        assert!(PortNumber(0x0001_0000).to_v10().is_err());
    }

    #[test]
    fn display_forms() {
        assert_eq!(PortNumber::FLOOD.to_string(), "FLOOD");
        assert_eq!(PortNumber(7).to_string(), "7");
        assert_eq!(MacAddress([0, 1, 2, 0xa, 0xb, 0xc]).to_string(), "00:01:02:0a:0b:0c");
        assert_eq!(DataPathId(0x0000_0000_0000_00ff).to_string(), "00:00:00:00:00:00:00:ff");
        assert_eq!(TableId::ALL.to_string(), "ALL");
    }
}
