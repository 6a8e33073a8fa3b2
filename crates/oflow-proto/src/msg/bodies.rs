//! Message body structures.
//!
//! These are the *mutable phase* of a message's lifecycle: plain structs
//! with public fields, populated freely, then consumed by value when the
//! message is sealed (see [`super::Message::seal`]). Fields that exist only
//! from some revision onward are `Option`s - absent, not zero-sentinels -
//! and the documented defaults apply when encoding an `Option` the target
//! revision requires.

use crate::{
    actions::Action,
    flags::{
        Capability, ConfigFlag, FlowModFlag, MeterFlag, PortConfig, PortFeature, SupportedAction,
        TableConfig,
    },
    group::Bucket,
    hello_elem::HelloElement,
    instructions::Instruction,
    match_field::Match,
    meter::MeterBand,
    msg::codes::{
        ControllerRole, ErrorType, FlowModCommand, FlowRemovedReason, GroupModCommand, GroupType,
        MeterModCommand, PacketInReason, PortReason,
    },
    msg::multipart::{MultipartRequest, MultipartReply},
    msg::MessageType,
    port::Port,
    types::{BufferId, DataPathId, GroupId, MacAddress, MeterId, PortNumber, TableId},
};

/// Hello: version negotiation, optionally with elements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hello {
    /// Hello elements (the version bitmap, in practice)
    pub elements: Vec<HelloElement>,
}

/// Error: the peer rejected something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorMsg {
    /// A standard typed error
    Standard {
        /// Error category
        err_type: ErrorType,
        /// Category-specific code (kept raw; code tables vary per type
        /// and revision)
        code: u16,
        /// At least 64 bytes of the offending request
        data: Vec<u8>,
    },
    /// An experimenter error (1.2+)
    Experimenter {
        /// Experimenter-defined type
        exp_type: u16,
        /// Experimenter id
        experimenter: u32,
        /// Experimenter-defined data
        data: Vec<u8>,
    },
}

impl ErrorMsg {
    /// For HELLO_FAILED errors the data is a NUL-terminated ASCII
    /// explanation; extract it when present.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Standard { err_type: ErrorType::HelloFailed, data, .. } => {
                let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
                Some(String::from_utf8_lossy(&data[..end]).into_owned())
            }
            _ => None,
        }
    }
}

/// Echo request/reply payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Echo {
    /// Opaque data, echoed back verbatim
    pub data: Vec<u8>,
}

/// Experimenter (VENDOR in 1.0) message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Experimenter {
    /// Experimenter id
    pub experimenter: u32,
    /// Experimenter-defined type; not on the 1.0 wire
    pub exp_type: Option<u32>,
    /// Experimenter-defined payload
    pub data: Vec<u8>,
}

/// Features reply: the switch describes itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturesReply {
    /// Datapath id
    pub datapath_id: DataPathId,
    /// Packets the switch can buffer
    pub num_buffers: u32,
    /// Number of flow tables
    pub num_tables: u8,
    /// Auxiliary connection id; 1.3 only
    pub aux_id: Option<u8>,
    /// Capability bitmap
    pub capabilities: Capability,
    /// Supported actions; 1.0 only
    pub supported_actions: Option<SupportedAction>,
    /// Port descriptions; on the wire through 1.2 (1.3 moved them to the
    /// port-desc multipart)
    pub ports: Vec<Port>,
}

/// Switch configuration (get-config reply and set-config).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SwitchConfig {
    /// Fragment handling flags
    pub flags: ConfigFlag,
    /// Bytes of each packet sent to the controller on table miss
    pub miss_send_len: u16,
}

/// Packet-in: a packet arrived at the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketIn {
    /// Buffer id at the switch, or NO_BUFFER
    pub buffer_id: BufferId,
    /// Full length of the original frame
    pub total_len: u16,
    /// Ingress port. On the 1.3 wire this is derived from the match's
    /// IN_PORT field rather than a dedicated field.
    pub in_port: Option<PortNumber>,
    /// Physical ingress port (1.3; defaults to `in_port` when the match
    /// omits IN_PHY_PORT)
    pub in_phy_port: Option<PortNumber>,
    /// Why the packet came to the controller
    pub reason: PacketInReason,
    /// Table that sent the packet; 1.3 only
    pub table_id: Option<TableId>,
    /// Cookie of the triggering flow; 1.3 only
    pub cookie: Option<u64>,
    /// Packet metadata match; 1.3 only
    pub match_fields: Option<Match>,
    /// Frame bytes
    pub data: Vec<u8>,
}

/// Packet-out: the controller injects a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketOut {
    /// Switch buffer to release, or NO_BUFFER when `data` carries the frame
    pub buffer_id: BufferId,
    /// Ingress port for action processing
    pub in_port: PortNumber,
    /// Actions applied to the packet
    pub actions: Vec<Action>,
    /// Frame bytes (only when not buffered)
    pub data: Vec<u8>,
}

/// Flow-mod: modify the flow tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowMod {
    /// Opaque controller cookie
    pub cookie: u64,
    /// Cookie mask for modify/delete matching; 1.1+ (encoded as 0 when
    /// absent)
    pub cookie_mask: Option<u64>,
    /// Target table; 1.1+ (encoded as table 0 when absent)
    pub table_id: Option<TableId>,
    /// What to do
    pub command: FlowModCommand,
    /// Idle timeout in seconds (0 = permanent)
    pub idle_timeout: u16,
    /// Hard timeout in seconds (0 = permanent)
    pub hard_timeout: u16,
    /// Priority within the table
    pub priority: u16,
    /// Buffered packet to apply the flow to, or NO_BUFFER
    pub buffer_id: BufferId,
    /// Output-port filter for delete commands
    pub out_port: PortNumber,
    /// Output-group filter for delete commands; 1.1+ (encoded as ANY when
    /// absent)
    pub out_group: Option<GroupId>,
    /// Flow-mod flags
    pub flags: FlowModFlag,
    /// The match
    pub match_fields: Match,
    /// Actions; the 1.0 representation
    pub actions: Vec<Action>,
    /// Instructions; the 1.1+ representation
    pub instructions: Vec<Instruction>,
}

/// Flow-removed: a flow expired or was deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRemoved {
    /// The flow's cookie
    pub cookie: u64,
    /// The flow's priority
    pub priority: u16,
    /// Why it went away
    pub reason: FlowRemovedReason,
    /// Table it lived in; 1.3 only
    pub table_id: Option<TableId>,
    /// Seconds the flow was installed
    pub duration_sec: u32,
    /// Sub-second remainder, in nanoseconds
    pub duration_nsec: u32,
    /// The flow's idle timeout
    pub idle_timeout: u16,
    /// The flow's hard timeout; 1.3 only
    pub hard_timeout: Option<u16>,
    /// Packets matched
    pub packet_count: u64,
    /// Bytes matched
    pub byte_count: u64,
    /// The flow's match
    pub match_fields: Match,
}

/// Port-status: a port appeared, disappeared or changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortStatus {
    /// What happened
    pub reason: PortReason,
    /// The port as it now stands
    pub desc: Port,
}

/// Port-mod: change a port's administrative state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMod {
    /// The port to modify
    pub port_no: PortNumber,
    /// Its hardware address (sanity check against stale port numbers)
    pub hw_addr: MacAddress,
    /// New config bits
    pub config: PortConfig,
    /// Which config bits to change
    pub mask: PortConfig,
    /// Features to advertise (empty = no change)
    pub advertise: PortFeature,
}

/// Table-mod (1.1+): configure table-miss behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMod {
    /// Target table (ALL for every table)
    pub table_id: TableId,
    /// Config flags (deprecated and empty in 1.3)
    pub config: TableConfig,
}

/// Group-mod (1.1+): modify the group table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMod {
    /// What to do
    pub command: GroupModCommand,
    /// The group type
    pub group_type: GroupType,
    /// The group
    pub group_id: GroupId,
    /// Action buckets
    pub buckets: Vec<Bucket>,
}

/// Meter-mod (1.3): modify the meter table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterMod {
    /// What to do
    pub command: MeterModCommand,
    /// Rate unit and statistics flags
    pub flags: MeterFlag,
    /// The meter
    pub meter_id: MeterId,
    /// Rate bands
    pub bands: Vec<MeterBand>,
}

/// Role request/reply (1.2+).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    /// The role being requested or reported
    pub role: ControllerRole,
    /// Master election generation
    pub generation_id: u64,
}

/// Asynchronous-message configuration (1.3). Each pair is
/// `[master-or-equal mask, slave mask]`; bits index the corresponding
/// reason codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AsyncConfig {
    /// Packet-in reason masks
    pub packet_in_mask: [u32; 2],
    /// Port-status reason masks
    pub port_status_mask: [u32; 2],
    /// Flow-removed reason masks
    pub flow_removed_mask: [u32; 2],
}

/// Queue-get-config request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueGetConfigRequest {
    /// Port to query (ALL/ANY for every port)
    pub port: PortNumber,
}

/// Queue-get-config reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueGetConfigReply {
    /// The queried port
    pub port: PortNumber,
    /// Its queues
    pub queues: Vec<crate::queue::PacketQueue>,
}

/// A message body: the tagged variant over every message kind.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Body {
    Hello(Hello),
    Error(ErrorMsg),
    EchoRequest(Echo),
    EchoReply(Echo),
    Experimenter(Experimenter),
    FeaturesRequest,
    FeaturesReply(FeaturesReply),
    GetConfigRequest,
    GetConfigReply(SwitchConfig),
    SetConfig(SwitchConfig),
    PacketIn(PacketIn),
    FlowRemoved(FlowRemoved),
    PortStatus(PortStatus),
    PacketOut(PacketOut),
    FlowMod(FlowMod),
    GroupMod(GroupMod),
    PortMod(PortMod),
    TableMod(TableMod),
    MultipartRequest(MultipartRequest),
    MultipartReply(MultipartReply),
    BarrierRequest,
    BarrierReply,
    QueueGetConfigRequest(QueueGetConfigRequest),
    QueueGetConfigReply(QueueGetConfigReply),
    RoleRequest(Role),
    RoleReply(Role),
    GetAsyncRequest,
    GetAsyncReply(AsyncConfig),
    SetAsync(AsyncConfig),
    MeterMod(MeterMod),
}

impl Body {
    /// The message type this body belongs to.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Hello(_) => MessageType::Hello,
            Self::Error(_) => MessageType::Error,
            Self::EchoRequest(_) => MessageType::EchoRequest,
            Self::EchoReply(_) => MessageType::EchoReply,
            Self::Experimenter(_) => MessageType::Experimenter,
            Self::FeaturesRequest => MessageType::FeaturesRequest,
            Self::FeaturesReply(_) => MessageType::FeaturesReply,
            Self::GetConfigRequest => MessageType::GetConfigRequest,
            Self::GetConfigReply(_) => MessageType::GetConfigReply,
            Self::SetConfig(_) => MessageType::SetConfig,
            Self::PacketIn(_) => MessageType::PacketIn,
            Self::FlowRemoved(_) => MessageType::FlowRemoved,
            Self::PortStatus(_) => MessageType::PortStatus,
            Self::PacketOut(_) => MessageType::PacketOut,
            Self::FlowMod(_) => MessageType::FlowMod,
            Self::GroupMod(_) => MessageType::GroupMod,
            Self::PortMod(_) => MessageType::PortMod,
            Self::TableMod(_) => MessageType::TableMod,
            Self::MultipartRequest(_) => MessageType::MultipartRequest,
            Self::MultipartReply(_) => MessageType::MultipartReply,
            Self::BarrierRequest => MessageType::BarrierRequest,
            Self::BarrierReply => MessageType::BarrierReply,
            Self::QueueGetConfigRequest(_) => MessageType::QueueGetConfigRequest,
            Self::QueueGetConfigReply(_) => MessageType::QueueGetConfigReply,
            Self::RoleRequest(_) => MessageType::RoleRequest,
            Self::RoleReply(_) => MessageType::RoleReply,
            Self::GetAsyncRequest => MessageType::GetAsyncRequest,
            Self::GetAsyncReply(_) => MessageType::GetAsyncReply,
            Self::SetAsync(_) => MessageType::SetAsync,
            Self::MeterMod(_) => MessageType::MeterMod,
        }
    }
}
