//! Wire flag sets and their per-version bit assignments.
//!
//! Each `bitflags` struct here is the *logical* flag set; the accompanying
//! table records which wire bit (if any) carries each flag in each protocol
//! revision. Revisions disagree more than one would hope: 1.0 spends bit 3
//! of the capability bitmap on STP support where 1.1+ spend it on group
//! stats, and the port-feature media bits shifted by four when the 40GB+
//! rates were inserted.
//!
//! Translation goes through [`crate::bitmap`]; see that module for the
//! strict/lenient decode policy.

use bitflags::bitflags;

use crate::{
    bitmap::{row, BitRow},
    errors::Result,
    version::{CodecConfig, ProtocolVersion},
};

const fn all4(bit: u32) -> [Option<u32>; 4] {
    [Some(bit), Some(bit), Some(bit), Some(bit)]
}

const fn only10(bit: u32) -> [Option<u32>; 4] {
    [Some(bit), None, None, None]
}

const fn from11(bit: u32) -> [Option<u32>; 4] {
    [None, Some(bit), Some(bit), Some(bit)]
}

const fn from12(bit: u32) -> [Option<u32>; 4] {
    [None, None, Some(bit), Some(bit)]
}

const fn only13(bit: u32) -> [Option<u32>; 4] {
    [None, None, None, Some(bit)]
}

macro_rules! versioned_bitmap {
    ($ty:ident, $table:ident, $what:literal) => {
        impl $ty {
            /// Encode this flag set as the wire bitmap for `pv`.
            ///
            /// # Errors
            ///
            /// Version mismatch if any contained flag has no bit in `pv`.
            pub fn encode_bitmap(self, pv: ProtocolVersion) -> Result<u32> {
                crate::bitmap::encode_bitmap($table, self, pv, $what)
            }

            /// Decode a wire bitmap under the given parsing policy.
            ///
            /// # Errors
            ///
            /// Version mismatch under strict parsing if any set bit is not
            /// defined for `pv`.
            pub fn decode_bitmap(bits: u32, pv: ProtocolVersion, cfg: CodecConfig) -> Result<Self> {
                crate::bitmap::decode_bitmap($table, bits, pv, cfg, $what)
            }
        }
    };
}

bitflags! {
    /// Datapath capabilities advertised in a features reply.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capability: u32 {
        /// Flow statistics
        const FLOW_STATS = 1 << 0;
        /// Table statistics
        const TABLE_STATS = 1 << 1;
        /// Port statistics
        const PORT_STATS = 1 << 2;
        /// Group statistics (1.1+)
        const GROUP_STATS = 1 << 3;
        /// Can reassemble IP fragments
        const IP_REASM = 1 << 5;
        /// Queue statistics
        const QUEUE_STATS = 1 << 6;
        /// Match IP addresses in ARP packets (dropped in 1.2)
        const ARP_MATCH_IP = 1 << 7;
        /// Switch will block looping ports (1.2+)
        const PORT_BLOCKED = 1 << 8;
        /// 802.1d spanning tree (1.0 only)
        const STP = 1 << 16;
    }
}

const CAPABILITY_TABLE: &[BitRow<Capability>] = &[
    row(Capability::FLOW_STATS, all4(1 << 0)),
    row(Capability::TABLE_STATS, all4(1 << 1)),
    row(Capability::PORT_STATS, all4(1 << 2)),
    row(Capability::GROUP_STATS, from11(1 << 3)),
    row(Capability::IP_REASM, all4(1 << 5)),
    row(Capability::QUEUE_STATS, all4(1 << 6)),
    row(Capability::ARP_MATCH_IP, [Some(1 << 7), Some(1 << 7), None, None]),
    row(Capability::PORT_BLOCKED, from12(1 << 8)),
    row(Capability::STP, only10(1 << 3)),
];

versioned_bitmap!(Capability, CAPABILITY_TABLE, "capability");

bitflags! {
    /// Actions supported by a 1.0 datapath (features reply, 1.0 only).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SupportedAction: u32 {
        /// Output to switch port
        const OUTPUT = 1 << 0;
        /// Set the 802.1q VLAN id
        const SET_VLAN_VID = 1 << 1;
        /// Set the 802.1q priority
        const SET_VLAN_PCP = 1 << 2;
        /// Strip the 802.1q header
        const STRIP_VLAN = 1 << 3;
        /// Set ethernet source address
        const SET_DL_SRC = 1 << 4;
        /// Set ethernet destination address
        const SET_DL_DST = 1 << 5;
        /// Set IP source address
        const SET_NW_SRC = 1 << 6;
        /// Set IP destination address
        const SET_NW_DST = 1 << 7;
        /// Set IP type of service
        const SET_NW_TOS = 1 << 8;
        /// Set TCP/UDP source port
        const SET_TP_SRC = 1 << 9;
        /// Set TCP/UDP destination port
        const SET_TP_DST = 1 << 10;
        /// Output to queue
        const ENQUEUE = 1 << 11;
        /// Vendor-defined action
        const VENDOR = 1 << 12;
    }
}

const SUPPORTED_ACTION_TABLE: &[BitRow<SupportedAction>] = &[
    row(SupportedAction::OUTPUT, only10(1 << 0)),
    row(SupportedAction::SET_VLAN_VID, only10(1 << 1)),
    row(SupportedAction::SET_VLAN_PCP, only10(1 << 2)),
    row(SupportedAction::STRIP_VLAN, only10(1 << 3)),
    row(SupportedAction::SET_DL_SRC, only10(1 << 4)),
    row(SupportedAction::SET_DL_DST, only10(1 << 5)),
    row(SupportedAction::SET_NW_SRC, only10(1 << 6)),
    row(SupportedAction::SET_NW_DST, only10(1 << 7)),
    row(SupportedAction::SET_NW_TOS, only10(1 << 8)),
    row(SupportedAction::SET_TP_SRC, only10(1 << 9)),
    row(SupportedAction::SET_TP_DST, only10(1 << 10)),
    row(SupportedAction::ENQUEUE, only10(1 << 11)),
    row(SupportedAction::VENDOR, only10(1 << 12)),
];

versioned_bitmap!(SupportedAction, SUPPORTED_ACTION_TABLE, "supported-action");

bitflags! {
    /// Switch-config fragment handling flags. `FRAG_NORMAL` is the zero
    /// value, not a flag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConfigFlag: u32 {
        /// Drop fragments
        const FRAG_DROP = 1 << 0;
        /// Reassemble (if IP_REASM capable)
        const FRAG_REASM = 1 << 1;
        /// Send packets with invalid TTL to the controller (1.1/1.2 only;
        /// moved to the async-config machinery in 1.3)
        const INV_TTL_TO_CONTROLLER = 1 << 2;
    }
}

const CONFIG_FLAG_TABLE: &[BitRow<ConfigFlag>] = &[
    row(ConfigFlag::FRAG_DROP, all4(1 << 0)),
    row(ConfigFlag::FRAG_REASM, all4(1 << 1)),
    row(ConfigFlag::INV_TTL_TO_CONTROLLER, [None, Some(1 << 2), Some(1 << 2), None]),
];

versioned_bitmap!(ConfigFlag, CONFIG_FLAG_TABLE, "switch-config");

bitflags! {
    /// Flow-mod flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FlowModFlag: u32 {
        /// Send a flow-removed message when the flow expires or is deleted
        const SEND_FLOW_REM = 1 << 0;
        /// Check for overlapping entries first
        const CHECK_OVERLAP = 1 << 1;
        /// Reset flow packet and byte counts (1.2+)
        const RESET_COUNTS = 1 << 2;
        /// Don't keep track of packet count (1.3)
        const NO_PKT_COUNTS = 1 << 3;
        /// Don't keep track of byte count (1.3)
        const NO_BYT_COUNTS = 1 << 4;
        /// Emergency flow table entry (1.0 only)
        const EMERG = 1 << 16;
    }
}

const FLOW_MOD_FLAG_TABLE: &[BitRow<FlowModFlag>] = &[
    row(FlowModFlag::SEND_FLOW_REM, all4(1 << 0)),
    row(FlowModFlag::CHECK_OVERLAP, all4(1 << 1)),
    row(FlowModFlag::RESET_COUNTS, from12(1 << 2)),
    row(FlowModFlag::NO_PKT_COUNTS, only13(1 << 3)),
    row(FlowModFlag::NO_BYT_COUNTS, only13(1 << 4)),
    row(FlowModFlag::EMERG, only10(1 << 2)),
];

versioned_bitmap!(FlowModFlag, FLOW_MOD_FLAG_TABLE, "flow-mod");

bitflags! {
    /// Port administrative configuration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PortConfig: u32 {
        /// Port is administratively down
        const PORT_DOWN = 1 << 0;
        /// Disable 802.1d spanning tree on this port (1.0 only)
        const NO_STP = 1 << 1;
        /// Drop all packets received by this port
        const NO_RECV = 1 << 2;
        /// Drop received 802.1d STP packets (1.0 only)
        const NO_RECV_STP = 1 << 3;
        /// Do not include this port when flooding (1.0 only)
        const NO_FLOOD = 1 << 4;
        /// Drop packets forwarded to this port
        const NO_FWD = 1 << 5;
        /// Do not send packet-in messages for this port
        const NO_PACKET_IN = 1 << 6;
    }
}

const PORT_CONFIG_TABLE: &[BitRow<PortConfig>] = &[
    row(PortConfig::PORT_DOWN, all4(1 << 0)),
    row(PortConfig::NO_STP, only10(1 << 1)),
    row(PortConfig::NO_RECV, all4(1 << 2)),
    row(PortConfig::NO_RECV_STP, only10(1 << 3)),
    row(PortConfig::NO_FLOOD, only10(1 << 4)),
    row(PortConfig::NO_FWD, all4(1 << 5)),
    row(PortConfig::NO_PACKET_IN, all4(1 << 6)),
];

versioned_bitmap!(PortConfig, PORT_CONFIG_TABLE, "port-config");

bitflags! {
    /// Current (read-only) port state. 1.0 additionally carries a two-bit
    /// STP state code at bits 8-9, handled by the port codec rather than
    /// this table.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PortState: u32 {
        /// No physical link present
        const LINK_DOWN = 1 << 0;
        /// Port is blocked by an external mechanism (1.1+)
        const BLOCKED = 1 << 1;
        /// Live for fast-failover purposes (1.1+)
        const LIVE = 1 << 2;
    }
}

const PORT_STATE_TABLE: &[BitRow<PortState>] = &[
    row(PortState::LINK_DOWN, all4(1 << 0)),
    row(PortState::BLOCKED, from11(1 << 1)),
    row(PortState::LIVE, from11(1 << 2)),
];

versioned_bitmap!(PortState, PORT_STATE_TABLE, "port-state");

bitflags! {
    /// Port features (current/advertised/supported/peer). The media and
    /// negotiation bits sit four positions lower in 1.0, which lacks the
    /// 40GB+ rates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PortFeature: u32 {
        /// 10 Mb half-duplex
        const RATE_10MB_HD = 1 << 0;
        /// 10 Mb full-duplex
        const RATE_10MB_FD = 1 << 1;
        /// 100 Mb half-duplex
        const RATE_100MB_HD = 1 << 2;
        /// 100 Mb full-duplex
        const RATE_100MB_FD = 1 << 3;
        /// 1 Gb half-duplex
        const RATE_1GB_HD = 1 << 4;
        /// 1 Gb full-duplex
        const RATE_1GB_FD = 1 << 5;
        /// 10 Gb full-duplex
        const RATE_10GB_FD = 1 << 6;
        /// 40 Gb full-duplex (1.1+)
        const RATE_40GB_FD = 1 << 7;
        /// 100 Gb full-duplex (1.1+)
        const RATE_100GB_FD = 1 << 8;
        /// 1 Tb full-duplex (1.1+)
        const RATE_1TB_FD = 1 << 9;
        /// Some other rate (1.1+)
        const RATE_OTHER = 1 << 10;
        /// Copper medium
        const COPPER = 1 << 11;
        /// Fiber medium
        const FIBER = 1 << 12;
        /// Auto-negotiation
        const AUTONEG = 1 << 13;
        /// Pause
        const PAUSE = 1 << 14;
        /// Asymmetric pause
        const PAUSE_ASYM = 1 << 15;
    }
}

const PORT_FEATURE_TABLE: &[BitRow<PortFeature>] = &[
    row(PortFeature::RATE_10MB_HD, all4(1 << 0)),
    row(PortFeature::RATE_10MB_FD, all4(1 << 1)),
    row(PortFeature::RATE_100MB_HD, all4(1 << 2)),
    row(PortFeature::RATE_100MB_FD, all4(1 << 3)),
    row(PortFeature::RATE_1GB_HD, all4(1 << 4)),
    row(PortFeature::RATE_1GB_FD, all4(1 << 5)),
    row(PortFeature::RATE_10GB_FD, all4(1 << 6)),
    row(PortFeature::RATE_40GB_FD, from11(1 << 7)),
    row(PortFeature::RATE_100GB_FD, from11(1 << 8)),
    row(PortFeature::RATE_1TB_FD, from11(1 << 9)),
    row(PortFeature::RATE_OTHER, from11(1 << 10)),
    row(PortFeature::COPPER, [Some(1 << 7), Some(1 << 11), Some(1 << 11), Some(1 << 11)]),
    row(PortFeature::FIBER, [Some(1 << 8), Some(1 << 12), Some(1 << 12), Some(1 << 12)]),
    row(PortFeature::AUTONEG, [Some(1 << 9), Some(1 << 13), Some(1 << 13), Some(1 << 13)]),
    row(PortFeature::PAUSE, [Some(1 << 10), Some(1 << 14), Some(1 << 14), Some(1 << 14)]),
    row(PortFeature::PAUSE_ASYM, [Some(1 << 11), Some(1 << 15), Some(1 << 15), Some(1 << 15)]),
];

versioned_bitmap!(PortFeature, PORT_FEATURE_TABLE, "port-feature");

bitflags! {
    /// Table-mod config. Defined in 1.1/1.2 for table-miss behavior; in 1.3
    /// the field is deprecated and carries no flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TableConfig: u32 {
        /// Send to next table on miss (controller is the zero default)
        const MISS_CONTINUE = 1 << 0;
        /// Drop on miss
        const MISS_DROP = 1 << 1;
    }
}

const TABLE_CONFIG_TABLE: &[BitRow<TableConfig>] = &[
    row(TableConfig::MISS_CONTINUE, [None, Some(1 << 0), Some(1 << 0), None]),
    row(TableConfig::MISS_DROP, [None, Some(1 << 1), Some(1 << 1), None]),
];

versioned_bitmap!(TableConfig, TABLE_CONFIG_TABLE, "table-config");

bitflags! {
    /// Meter-mod flags (1.3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MeterFlag: u32 {
        /// Rate in kilobits per second
        const KBPS = 1 << 0;
        /// Rate in packets per second
        const PKTPS = 1 << 1;
        /// Do burst size
        const BURST = 1 << 2;
        /// Collect statistics
        const STATS = 1 << 3;
    }
}

const METER_FLAG_TABLE: &[BitRow<MeterFlag>] = &[
    row(MeterFlag::KBPS, only13(1 << 0)),
    row(MeterFlag::PKTPS, only13(1 << 1)),
    row(MeterFlag::BURST, only13(1 << 2)),
    row(MeterFlag::STATS, only13(1 << 3)),
];

versioned_bitmap!(MeterFlag, METER_FLAG_TABLE, "meter");

bitflags! {
    /// Multipart request flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MultipartRequestFlag: u32 {
        /// More requests to follow (1.1+; a 1.0 stats request has no flags)
        const REQUEST_MORE = 1 << 0;
    }
}

const MP_REQUEST_FLAG_TABLE: &[BitRow<MultipartRequestFlag>] =
    &[row(MultipartRequestFlag::REQUEST_MORE, from11(1 << 0))];

versioned_bitmap!(MultipartRequestFlag, MP_REQUEST_FLAG_TABLE, "multipart-request");

bitflags! {
    /// Multipart reply flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MultipartReplyFlag: u32 {
        /// More replies to follow
        const REPLY_MORE = 1 << 0;
    }
}

const MP_REPLY_FLAG_TABLE: &[BitRow<MultipartReplyFlag>] =
    &[row(MultipartReplyFlag::REPLY_MORE, all4(1 << 0))];

versioned_bitmap!(MultipartReplyFlag, MP_REPLY_FLAG_TABLE, "multipart-reply");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{VersionSet, ALL_VERSIONS};

    fn lenient() -> CodecConfig {
        CodecConfig { strict: false, supported: VersionSet::of(&ALL_VERSIONS) }
    }

    fn strict() -> CodecConfig {
        CodecConfig { strict: true, supported: VersionSet::of(&ALL_VERSIONS) }
    }

    #[test]
    fn capability_bit3_depends_on_version() {
        // STP in 1.0, GROUP_STATS in 1.3 - same wire bit
        let v10 = Capability::decode_bitmap(1 << 3, ProtocolVersion::V10, lenient()).unwrap();
        assert_eq!(v10, Capability::STP);
        let v13 = Capability::decode_bitmap(1 << 3, ProtocolVersion::V13, lenient()).unwrap();
        assert_eq!(v13, Capability::GROUP_STATS);

        assert_eq!(Capability::STP.encode_bitmap(ProtocolVersion::V10).unwrap(), 1 << 3);
        assert!(Capability::STP.encode_bitmap(ProtocolVersion::V13).is_err());
    }

    #[test]
    fn port_feature_media_bits_shift() {
        assert_eq!(PortFeature::COPPER.encode_bitmap(ProtocolVersion::V10).unwrap(), 1 << 7);
        assert_eq!(PortFeature::COPPER.encode_bitmap(ProtocolVersion::V13).unwrap(), 1 << 11);
        assert!(PortFeature::RATE_40GB_FD.encode_bitmap(ProtocolVersion::V10).is_err());
    }

    #[test]
    fn flag_sets_round_trip_on_every_defining_version() {
        for pv in ALL_VERSIONS {
            let flags = FlowModFlag::SEND_FLOW_REM | FlowModFlag::CHECK_OVERLAP;
            let bits = flags.encode_bitmap(pv).unwrap();
            assert_eq!(FlowModFlag::decode_bitmap(bits, pv, lenient()).unwrap(), flags);
        }
    }

    #[test]
    fn strict_names_offending_bitmap() {
        // RESET_COUNTS' wire bit means EMERG in 1.0; bit 9 means nothing
        let bits = (1 << 2) | (1 << 9);
        let err = FlowModFlag::decode_bitmap(bits, ProtocolVersion::V11, strict()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("flow-mod bitmap"), "message was: {msg}");
        assert!(msg.contains("not valid for version 1.1"), "message was: {msg}");
    }

    #[test]
    fn lenient_keeps_recognized_bits_only() {
        let bits = (1 << 0) | (1 << 9);
        let flags = FlowModFlag::decode_bitmap(bits, ProtocolVersion::V13, lenient()).unwrap();
        assert_eq!(flags, FlowModFlag::SEND_FLOW_REM);
    }

    #[test]
    fn request_more_not_defined_for_10() {
        let err = MultipartRequestFlag::REQUEST_MORE.encode_bitmap(ProtocolVersion::V10);
        assert!(err.is_err());
        let ok = MultipartReplyFlag::REPLY_MORE.encode_bitmap(ProtocolVersion::V10).unwrap();
        assert_eq!(ok, 1);
    }
}
