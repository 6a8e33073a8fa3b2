//! Multipart (stats) request and reply bodies.
//!
//! One logical multipart exchange may span several frames: replies carry a
//! REPLY_MORE flag and array-typed bodies compose across frames via
//! [`MultipartReply::append_from`].
//!
//! Array replies are parsed best-effort: if one element is malformed, the
//! elements decoded before it are preserved and the failure cause is
//! captured on the reply (`defect`) instead of discarding the whole frame.
//! Callers that want strictness can treat a defective reply as an error
//! themselves.

use crate::{
    actions::{encode_action_list, parse_action_list, Action},
    buffer::{Reader, Writer},
    errors::{ProtocolError, Result},
    flags::{MeterFlag, MultipartReplyFlag, MultipartRequestFlag},
    group::{encode_bucket_list, parse_bucket_list, Bucket},
    instructions::{encode_instruction_list, parse_instruction_list, Instruction},
    match_field::{encode_match, parse_match, Match},
    meter::{encode_meter_band_list, parse_meter_band_list, MeterBand},
    msg::codes::{GroupType, MultipartType},
    port::{encode_port, parse_port, Port},
    table_features::{encode_prop_list, parse_prop_list, TableFeatureProp},
    types::{GroupId, MeterId, PortNumber, QueueId, TableId},
    version::{CodecConfig, ProtocolVersion},
};

use crate::flags::FlowModFlag;

const DESC_STR_LEN: usize = 256;
const SERIAL_NUM_LEN: usize = 32;
const TABLE_NAME_LEN: usize = 32;

/// Switch description strings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescStats {
    /// Manufacturer
    pub mfr_desc: String,
    /// Hardware revision
    pub hw_desc: String,
    /// Software revision
    pub sw_desc: String,
    /// Serial number
    pub serial_num: String,
    /// Human-readable datapath description
    pub dp_desc: String,
}

/// Filter for flow and aggregate stats requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStatsRequest {
    /// Restrict to one table (ALL for all tables)
    pub table_id: TableId,
    /// Restrict to flows forwarding to this port (ANY to skip)
    pub out_port: PortNumber,
    /// Restrict to flows forwarding to this group; 1.1+ (encoded as ANY
    /// when absent)
    pub out_group: Option<GroupId>,
    /// Cookie filter; 1.1+ (encoded as 0 when absent)
    pub cookie: u64,
    /// Cookie mask; 1.1+ (encoded as 0 when absent)
    pub cookie_mask: u64,
    /// Match filter
    pub match_fields: Match,
}

/// Stats for one flow entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStatsEntry {
    /// Table the flow lives in
    pub table_id: TableId,
    /// Seconds installed
    pub duration_sec: u32,
    /// Nanosecond remainder
    pub duration_nsec: u32,
    /// Priority
    pub priority: u16,
    /// Idle timeout
    pub idle_timeout: u16,
    /// Hard timeout
    pub hard_timeout: u16,
    /// Flow-mod flags; 1.3 only
    pub flags: Option<FlowModFlag>,
    /// Cookie
    pub cookie: u64,
    /// Packets matched
    pub packet_count: u64,
    /// Bytes matched
    pub byte_count: u64,
    /// The match
    pub match_fields: Match,
    /// Actions (1.0 representation)
    pub actions: Vec<Action>,
    /// Instructions (1.1+ representation)
    pub instructions: Vec<Instruction>,
}

/// Aggregate counters over a flow filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregateStats {
    /// Packets matched
    pub packet_count: u64,
    /// Bytes matched
    pub byte_count: u64,
    /// Number of flows
    pub flow_count: u32,
}

/// Stats for one flow table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatsEntry {
    /// The table
    pub table_id: TableId,
    /// Table name; on the wire only in 1.0
    pub name: Option<String>,
    /// Raw 1.0 wildcards bitmap; on the wire only in 1.0
    pub wildcards: Option<u32>,
    /// Maximum entries; on the wire only in 1.0
    pub max_entries: Option<u32>,
    /// Active entries
    pub active_count: u32,
    /// Lookups
    pub lookup_count: u64,
    /// Lookups that hit
    pub matched_count: u64,
}

/// Counters for one port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortStatsEntry {
    /// The port
    pub port_no: PortNumber,
    /// Received packets
    pub rx_packets: u64,
    /// Transmitted packets
    pub tx_packets: u64,
    /// Received bytes
    pub rx_bytes: u64,
    /// Transmitted bytes
    pub tx_bytes: u64,
    /// Packets dropped on receive
    pub rx_dropped: u64,
    /// Packets dropped on transmit
    pub tx_dropped: u64,
    /// Receive errors
    pub rx_errors: u64,
    /// Transmit errors
    pub tx_errors: u64,
    /// Frame alignment errors
    pub rx_frame_err: u64,
    /// Receive overruns
    pub rx_over_err: u64,
    /// CRC errors
    pub rx_crc_err: u64,
    /// Collisions
    pub collisions: u64,
    /// Seconds the port has been up; 1.3 only
    pub duration_sec: Option<u32>,
    /// Nanosecond remainder; 1.3 only
    pub duration_nsec: Option<u32>,
}

/// Counters for one queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStatsEntry {
    /// The port the queue hangs off
    pub port_no: PortNumber,
    /// The queue
    pub queue_id: QueueId,
    /// Transmitted bytes
    pub tx_bytes: u64,
    /// Transmitted packets
    pub tx_packets: u64,
    /// Transmit errors
    pub tx_errors: u64,
    /// Seconds alive; 1.3 only
    pub duration_sec: Option<u32>,
    /// Nanosecond remainder; 1.3 only
    pub duration_nsec: Option<u32>,
}

/// Per-bucket packet/byte counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BucketCounter {
    /// Packets processed
    pub packet_count: u64,
    /// Bytes processed
    pub byte_count: u64,
}

/// Counters for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStatsEntry {
    /// The group
    pub group_id: GroupId,
    /// Flows directly referencing the group
    pub ref_count: u32,
    /// Packets processed
    pub packet_count: u64,
    /// Bytes processed
    pub byte_count: u64,
    /// Seconds alive; 1.3 only
    pub duration_sec: Option<u32>,
    /// Nanosecond remainder; 1.3 only
    pub duration_nsec: Option<u32>,
    /// Per-bucket counters
    pub bucket_stats: Vec<BucketCounter>,
}

/// Definition of one group (group-desc reply).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDescEntry {
    /// The group type
    pub group_type: GroupType,
    /// The group
    pub group_id: GroupId,
    /// Its buckets
    pub buckets: Vec<Bucket>,
}

/// Group capabilities (group-features reply, 1.2+). Bitmap fields are kept
/// raw; their bit meanings index [`GroupType`] and action type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupFeatures {
    /// Supported group types (bitmap over group type codes)
    pub types: u32,
    /// Capability bitmap
    pub capabilities: u32,
    /// Maximum groups per type
    pub max_groups: [u32; 4],
    /// Supported actions per type (bitmaps over action type codes)
    pub actions: [u32; 4],
}

/// Counters for one meter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterStatsEntry {
    /// The meter
    pub meter_id: MeterId,
    /// Flows bound to the meter
    pub flow_count: u32,
    /// Packets metered
    pub packet_in_count: u64,
    /// Bytes metered
    pub byte_in_count: u64,
    /// Seconds alive
    pub duration_sec: u32,
    /// Nanosecond remainder
    pub duration_nsec: u32,
    /// Per-band packet/byte counters
    pub band_stats: Vec<BucketCounter>,
}

/// Configuration of one meter (meter-config reply).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterConfigEntry {
    /// The meter's flags
    pub flags: MeterFlag,
    /// The meter
    pub meter_id: MeterId,
    /// Its bands
    pub bands: Vec<MeterBand>,
}

/// Meter capabilities (meter-features reply).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeterFeatures {
    /// Maximum number of meters
    pub max_meter: u32,
    /// Supported band types (bitmap over band type codes)
    pub band_types: u32,
    /// Capability bitmap (mirrors the meter flag bits)
    pub capabilities: u32,
    /// Maximum bands per meter
    pub max_bands: u8,
    /// Maximum color value
    pub max_color: u8,
}

/// One table's features (table-features request and reply element).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFeaturesEntry {
    /// The table
    pub table_id: TableId,
    /// Table name
    pub name: String,
    /// Metadata bits the table can match
    pub metadata_match: u64,
    /// Metadata bits the table can write
    pub metadata_write: u64,
    /// Config (deprecated in 1.3; kept raw)
    pub config: u32,
    /// Maximum entries
    pub max_entries: u32,
    /// The property TLVs
    pub properties: Vec<TableFeatureProp>,
}

/// Multipart request body, by type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartRequestBody {
    /// Switch description (empty request)
    Desc,
    /// Per-flow stats
    Flow(FlowStatsRequest),
    /// Aggregate stats
    Aggregate(FlowStatsRequest),
    /// Table stats (empty request)
    Table,
    /// Port counters
    PortStats {
        /// Port to query (ANY for all)
        port: PortNumber,
    },
    /// Queue counters
    Queue {
        /// Port to query (ANY for all)
        port: PortNumber,
        /// Queue to query (ALL for all)
        queue_id: QueueId,
    },
    /// Group counters (1.1+)
    Group {
        /// Group to query (ALL for all)
        group_id: GroupId,
    },
    /// Group definitions (empty request, 1.1+)
    GroupDesc,
    /// Group capabilities (empty request, 1.2+)
    GroupFeatures,
    /// Meter counters (1.3)
    Meter {
        /// Meter to query (ALL for all)
        meter_id: MeterId,
    },
    /// Meter configuration (1.3)
    MeterConfig {
        /// Meter to query (ALL for all)
        meter_id: MeterId,
    },
    /// Meter capabilities (empty request, 1.3)
    MeterFeatures,
    /// Table features; an empty list queries, a non-empty list configures
    /// (1.3)
    TableFeatures(Vec<TableFeaturesEntry>),
    /// Port descriptions (empty request, 1.3)
    PortDesc,
    /// Experimenter-defined
    Experimenter {
        /// Experimenter id
        experimenter: u32,
        /// Experimenter subtype; not on the 1.0 wire
        exp_type: Option<u32>,
        /// Raw payload
        data: Vec<u8>,
    },
}

impl MultipartRequestBody {
    /// The multipart type of this body.
    #[must_use]
    pub fn mp_type(&self) -> MultipartType {
        match self {
            Self::Desc => MultipartType::Desc,
            Self::Flow(_) => MultipartType::Flow,
            Self::Aggregate(_) => MultipartType::Aggregate,
            Self::Table => MultipartType::Table,
            Self::PortStats { .. } => MultipartType::PortStats,
            Self::Queue { .. } => MultipartType::Queue,
            Self::Group { .. } => MultipartType::Group,
            Self::GroupDesc => MultipartType::GroupDesc,
            Self::GroupFeatures => MultipartType::GroupFeatures,
            Self::Meter { .. } => MultipartType::Meter,
            Self::MeterConfig { .. } => MultipartType::MeterConfig,
            Self::MeterFeatures => MultipartType::MeterFeatures,
            Self::TableFeatures(_) => MultipartType::TableFeatures,
            Self::PortDesc => MultipartType::PortDesc,
            Self::Experimenter { .. } => MultipartType::Experimenter,
        }
    }
}

/// Multipart reply body, by type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartReplyBody {
    /// Switch description
    Desc(DescStats),
    /// Per-flow stats
    Flow(Vec<FlowStatsEntry>),
    /// Aggregate stats
    Aggregate(AggregateStats),
    /// Table stats
    Table(Vec<TableStatsEntry>),
    /// Port counters
    PortStats(Vec<PortStatsEntry>),
    /// Queue counters
    Queue(Vec<QueueStatsEntry>),
    /// Group counters (1.1+)
    Group(Vec<GroupStatsEntry>),
    /// Group definitions (1.1+)
    GroupDesc(Vec<GroupDescEntry>),
    /// Group capabilities (1.2+)
    GroupFeatures(GroupFeatures),
    /// Meter counters (1.3)
    Meter(Vec<MeterStatsEntry>),
    /// Meter configuration (1.3)
    MeterConfig(Vec<MeterConfigEntry>),
    /// Meter capabilities (1.3)
    MeterFeatures(MeterFeatures),
    /// Table features (1.3)
    TableFeatures(Vec<TableFeaturesEntry>),
    /// Port descriptions (1.3)
    PortDesc(Vec<Port>),
    /// Experimenter-defined
    Experimenter {
        /// Experimenter id
        experimenter: u32,
        /// Experimenter subtype; not on the 1.0 wire
        exp_type: Option<u32>,
        /// Raw payload
        data: Vec<u8>,
    },
}

impl MultipartReplyBody {
    /// The multipart type of this body.
    #[must_use]
    pub fn mp_type(&self) -> MultipartType {
        match self {
            Self::Desc(_) => MultipartType::Desc,
            Self::Flow(_) => MultipartType::Flow,
            Self::Aggregate(_) => MultipartType::Aggregate,
            Self::Table(_) => MultipartType::Table,
            Self::PortStats(_) => MultipartType::PortStats,
            Self::Queue(_) => MultipartType::Queue,
            Self::Group(_) => MultipartType::Group,
            Self::GroupDesc(_) => MultipartType::GroupDesc,
            Self::GroupFeatures(_) => MultipartType::GroupFeatures,
            Self::Meter(_) => MultipartType::Meter,
            Self::MeterConfig(_) => MultipartType::MeterConfig,
            Self::MeterFeatures(_) => MultipartType::MeterFeatures,
            Self::TableFeatures(_) => MultipartType::TableFeatures,
            Self::PortDesc(_) => MultipartType::PortDesc,
            Self::Experimenter { .. } => MultipartType::Experimenter,
        }
    }

    /// True for array-typed bodies, whose element lists may span frames.
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Self::Flow(_)
                | Self::Table(_)
                | Self::PortStats(_)
                | Self::Queue(_)
                | Self::Group(_)
                | Self::GroupDesc(_)
                | Self::Meter(_)
                | Self::MeterConfig(_)
                | Self::TableFeatures(_)
                | Self::PortDesc(_)
        )
    }
}

/// A multipart request message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartRequest {
    /// Request flags (REQUEST_MORE)
    pub flags: MultipartRequestFlag,
    /// The typed body
    pub body: MultipartRequestBody,
}

/// A multipart reply message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartReply {
    /// Reply flags (REPLY_MORE)
    pub flags: MultipartReplyFlag,
    /// The typed body
    pub body: MultipartReplyBody,
    /// Failure captured while decoding a trailing array element; earlier
    /// elements are intact in `body`
    pub defect: Option<Box<ProtocolError>>,
}

impl MultipartReply {
    /// Whether more reply frames follow this one.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.flags.contains(MultipartReplyFlag::REPLY_MORE)
    }

    /// Fold a continuation frame's elements into this reply, composing one
    /// logical element list. Flags (and any captured defect) of the
    /// continuation replace this reply's.
    ///
    /// # Errors
    ///
    /// Version mismatch never arises here; a type mismatch or a non-array
    /// body yields [`ProtocolError::UnsupportedOperation`].
    pub fn append_from(&mut self, next: MultipartReply) -> Result<()> {
        use MultipartReplyBody as B;
        if !self.body.is_array() {
            return Err(ProtocolError::UnsupportedOperation(
                "multipart accumulation on a non-array body",
            ));
        }
        match (&mut self.body, next.body) {
            (B::Flow(a), B::Flow(b)) => a.extend(b),
            (B::Table(a), B::Table(b)) => a.extend(b),
            (B::PortStats(a), B::PortStats(b)) => a.extend(b),
            (B::Queue(a), B::Queue(b)) => a.extend(b),
            (B::Group(a), B::Group(b)) => a.extend(b),
            (B::GroupDesc(a), B::GroupDesc(b)) => a.extend(b),
            (B::Meter(a), B::Meter(b)) => a.extend(b),
            (B::MeterConfig(a), B::MeterConfig(b)) => a.extend(b),
            (B::TableFeatures(a), B::TableFeatures(b)) => a.extend(b),
            (B::PortDesc(a), B::PortDesc(b)) => a.extend(b),
            _ => {
                return Err(ProtocolError::UnsupportedOperation(
                    "multipart accumulation across different body types",
                ))
            }
        }
        self.flags = next.flags;
        if next.defect.is_some() {
            self.defect = next.defect;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------- parsing

/// Parse array elements until `target`, best-effort: a failing element
/// terminates the loop, preserving earlier elements and the cause.
fn parse_array<T>(
    target: usize,
    r: &mut Reader<'_>,
    mut element: impl FnMut(&mut Reader<'_>) -> Result<T>,
) -> (Vec<T>, Option<Box<ProtocolError>>) {
    let mut items = Vec::new();
    while r.position() < target {
        match element(r) {
            Ok(item) => {
                items.push(item);
                if r.position() > target {
                    return (
                        items,
                        Some(Box::new(ProtocolError::Malformed {
                            context: "multipart array",
                            offset: r.position(),
                            detail: format!("element overran body by {}", r.position() - target),
                        })),
                    );
                }
            }
            Err(e) => return (items, Some(Box::new(e))),
        }
    }
    (items, None)
}

/// Parse a multipart request body of the given type, consuming through
/// `target`.
pub(crate) fn parse_request_body(
    mp_type: MultipartType,
    target: usize,
    r: &mut Reader<'_>,
    pv: ProtocolVersion,
    _cfg: CodecConfig,
) -> Result<MultipartRequestBody> {
    use MultipartRequestBody as B;
    Ok(match mp_type {
        MultipartType::Desc => B::Desc,
        MultipartType::Table => B::Table,
        MultipartType::GroupDesc => B::GroupDesc,
        MultipartType::GroupFeatures => B::GroupFeatures,
        MultipartType::MeterFeatures => B::MeterFeatures,
        MultipartType::PortDesc => B::PortDesc,
        MultipartType::Flow => B::Flow(parse_flow_stats_request(r, pv)?),
        MultipartType::Aggregate => B::Aggregate(parse_flow_stats_request(r, pv)?),
        MultipartType::PortStats => {
            let port = if pv == ProtocolVersion::V10 {
                let p = PortNumber::from_v10(r.read_u16()?);
                r.skip(6)?;
                p
            } else {
                let p = PortNumber(r.read_u32()?);
                r.skip(4)?;
                p
            };
            B::PortStats { port }
        }
        MultipartType::Queue => {
            let port = if pv == ProtocolVersion::V10 {
                let p = PortNumber::from_v10(r.read_u16()?);
                r.skip(2)?;
                p
            } else {
                PortNumber(r.read_u32()?)
            };
            B::Queue { port, queue_id: QueueId(r.read_u32()?) }
        }
        MultipartType::Group => {
            let group_id = GroupId(r.read_u32()?);
            r.skip(4)?;
            B::Group { group_id }
        }
        MultipartType::Meter | MultipartType::MeterConfig => {
            let meter_id = MeterId(r.read_u32()?);
            r.skip(4)?;
            if mp_type == MultipartType::Meter {
                B::Meter { meter_id }
            } else {
                B::MeterConfig { meter_id }
            }
        }
        MultipartType::TableFeatures => {
            let mut entries = Vec::new();
            while r.position() < target {
                entries.push(parse_table_features_entry(r, pv)?);
            }
            B::TableFeatures(entries)
        }
        MultipartType::Experimenter => {
            let (experimenter, exp_type, data) = parse_experimenter_body(target, r, pv)?;
            B::Experimenter { experimenter, exp_type, data }
        }
    })
}

/// Parse a multipart reply body; array bodies are best-effort (see module
/// docs).
pub(crate) fn parse_reply_body(
    mp_type: MultipartType,
    target: usize,
    r: &mut Reader<'_>,
    pv: ProtocolVersion,
    cfg: CodecConfig,
) -> Result<(MultipartReplyBody, Option<Box<ProtocolError>>)> {
    use MultipartReplyBody as B;
    let mut defect = None;
    let body = match mp_type {
        MultipartType::Desc => B::Desc(DescStats {
            mfr_desc: r.read_fixed_string(DESC_STR_LEN)?,
            hw_desc: r.read_fixed_string(DESC_STR_LEN)?,
            sw_desc: r.read_fixed_string(DESC_STR_LEN)?,
            serial_num: r.read_fixed_string(SERIAL_NUM_LEN)?,
            dp_desc: r.read_fixed_string(DESC_STR_LEN)?,
        }),
        MultipartType::Flow => {
            let (items, d) = parse_array(target, r, |r| parse_flow_stats_entry(r, pv, cfg));
            defect = d;
            B::Flow(items)
        }
        MultipartType::Aggregate => {
            let packet_count = r.read_u64()?;
            let byte_count = r.read_u64()?;
            let flow_count = r.read_u32()?;
            r.skip(4)?;
            B::Aggregate(AggregateStats { packet_count, byte_count, flow_count })
        }
        MultipartType::Table => {
            let (items, d) = parse_array(target, r, |r| parse_table_stats_entry(r, pv));
            defect = d;
            B::Table(items)
        }
        MultipartType::PortStats => {
            let (items, d) = parse_array(target, r, |r| parse_port_stats_entry(r, pv));
            defect = d;
            B::PortStats(items)
        }
        MultipartType::Queue => {
            let (items, d) = parse_array(target, r, |r| parse_queue_stats_entry(r, pv));
            defect = d;
            B::Queue(items)
        }
        MultipartType::Group => {
            let (items, d) = parse_array(target, r, |r| parse_group_stats_entry(r, pv));
            defect = d;
            B::Group(items)
        }
        MultipartType::GroupDesc => {
            let (items, d) = parse_array(target, r, |r| parse_group_desc_entry(r, pv));
            defect = d;
            B::GroupDesc(items)
        }
        MultipartType::GroupFeatures => {
            let types = r.read_u32()?;
            let capabilities = r.read_u32()?;
            let mut max_groups = [0u32; 4];
            for g in &mut max_groups {
                *g = r.read_u32()?;
            }
            let mut actions = [0u32; 4];
            for a in &mut actions {
                *a = r.read_u32()?;
            }
            B::GroupFeatures(GroupFeatures { types, capabilities, max_groups, actions })
        }
        MultipartType::Meter => {
            let (items, d) = parse_array(target, r, |r| parse_meter_stats_entry(r));
            defect = d;
            B::Meter(items)
        }
        MultipartType::MeterConfig => {
            let (items, d) = parse_array(target, r, |r| parse_meter_config_entry(r, pv, cfg));
            defect = d;
            B::MeterConfig(items)
        }
        MultipartType::MeterFeatures => {
            let max_meter = r.read_u32()?;
            let band_types = r.read_u32()?;
            let capabilities = r.read_u32()?;
            let max_bands = r.read_u8()?;
            let max_color = r.read_u8()?;
            r.skip(2)?;
            B::MeterFeatures(MeterFeatures {
                max_meter,
                band_types,
                capabilities,
                max_bands,
                max_color,
            })
        }
        MultipartType::TableFeatures => {
            let (items, d) = parse_array(target, r, |r| parse_table_features_entry(r, pv));
            defect = d;
            B::TableFeatures(items)
        }
        MultipartType::PortDesc => {
            let (items, d) = parse_array(target, r, |r| parse_port(r, pv, cfg));
            defect = d;
            B::PortDesc(items)
        }
        MultipartType::Experimenter => {
            let (experimenter, exp_type, data) = parse_experimenter_body(target, r, pv)?;
            B::Experimenter { experimenter, exp_type, data }
        }
    };
    Ok((body, defect))
}

fn parse_experimenter_body(
    target: usize,
    r: &mut Reader<'_>,
    pv: ProtocolVersion,
) -> Result<(u32, Option<u32>, Vec<u8>)> {
    let experimenter = r.read_u32()?;
    let exp_type = if pv > ProtocolVersion::V10 { Some(r.read_u32()?) } else { None };
    let data = r.read_bytes(target.saturating_sub(r.position()))?.to_vec();
    Ok((experimenter, exp_type, data))
}

fn parse_flow_stats_request(r: &mut Reader<'_>, pv: ProtocolVersion) -> Result<FlowStatsRequest> {
    if pv == ProtocolVersion::V10 {
        let match_fields = parse_match(r, pv)?;
        let table_id = TableId(r.read_u8()?);
        r.skip(1)?;
        let out_port = PortNumber::from_v10(r.read_u16()?);
        Ok(FlowStatsRequest {
            table_id,
            out_port,
            out_group: None,
            cookie: 0,
            cookie_mask: 0,
            match_fields,
        })
    } else {
        let table_id = TableId(r.read_u8()?);
        r.skip(3)?;
        let out_port = PortNumber(r.read_u32()?);
        let out_group = Some(GroupId(r.read_u32()?));
        r.skip(4)?;
        let cookie = r.read_u64()?;
        let cookie_mask = r.read_u64()?;
        let match_fields = parse_match(r, pv)?;
        Ok(FlowStatsRequest { table_id, out_port, out_group, cookie, cookie_mask, match_fields })
    }
}

fn parse_flow_stats_entry(
    r: &mut Reader<'_>,
    pv: ProtocolVersion,
    cfg: CodecConfig,
) -> Result<FlowStatsEntry> {
    let start = r.position();
    let declared = usize::from(r.read_u16()?);
    let end = start + declared;
    let table_id = TableId(r.read_u8()?);
    r.skip(1)?;
    if pv == ProtocolVersion::V10 {
        let match_fields = parse_match(r, pv)?;
        let duration_sec = r.read_u32()?;
        let duration_nsec = r.read_u32()?;
        let priority = r.read_u16()?;
        let idle_timeout = r.read_u16()?;
        let hard_timeout = r.read_u16()?;
        r.skip(6)?;
        let cookie = r.read_u64()?;
        let packet_count = r.read_u64()?;
        let byte_count = r.read_u64()?;
        let actions = parse_action_list(end, r, pv)?;
        Ok(FlowStatsEntry {
            table_id,
            duration_sec,
            duration_nsec,
            priority,
            idle_timeout,
            hard_timeout,
            flags: None,
            cookie,
            packet_count,
            byte_count,
            match_fields,
            actions,
            instructions: Vec::new(),
        })
    } else {
        let duration_sec = r.read_u32()?;
        let duration_nsec = r.read_u32()?;
        let priority = r.read_u16()?;
        let idle_timeout = r.read_u16()?;
        let hard_timeout = r.read_u16()?;
        let flags = if pv >= ProtocolVersion::V13 {
            let f = FlowModFlag::decode_bitmap(r.read_u16()?.into(), pv, cfg)?;
            r.skip(4)?;
            Some(f)
        } else {
            r.skip(6)?;
            None
        };
        let cookie = r.read_u64()?;
        let packet_count = r.read_u64()?;
        let byte_count = r.read_u64()?;
        let match_fields = parse_match(r, pv)?;
        let instructions = parse_instruction_list(end, r, pv)?;
        Ok(FlowStatsEntry {
            table_id,
            duration_sec,
            duration_nsec,
            priority,
            idle_timeout,
            hard_timeout,
            flags,
            cookie,
            packet_count,
            byte_count,
            match_fields,
            actions: Vec::new(),
            instructions,
        })
    }
}

fn parse_table_stats_entry(r: &mut Reader<'_>, pv: ProtocolVersion) -> Result<TableStatsEntry> {
    let table_id = TableId(r.read_u8()?);
    r.skip(3)?;
    if pv == ProtocolVersion::V10 {
        let name = r.read_fixed_string(TABLE_NAME_LEN)?;
        let wildcards = r.read_u32()?;
        let max_entries = r.read_u32()?;
        let active_count = r.read_u32()?;
        let lookup_count = r.read_u64()?;
        let matched_count = r.read_u64()?;
        Ok(TableStatsEntry {
            table_id,
            name: Some(name),
            wildcards: Some(wildcards),
            max_entries: Some(max_entries),
            active_count,
            lookup_count,
            matched_count,
        })
    } else {
        let active_count = r.read_u32()?;
        let lookup_count = r.read_u64()?;
        let matched_count = r.read_u64()?;
        Ok(TableStatsEntry {
            table_id,
            name: None,
            wildcards: None,
            max_entries: None,
            active_count,
            lookup_count,
            matched_count,
        })
    }
}

fn parse_port_stats_entry(r: &mut Reader<'_>, pv: ProtocolVersion) -> Result<PortStatsEntry> {
    let port_no = if pv == ProtocolVersion::V10 {
        let p = PortNumber::from_v10(r.read_u16()?);
        r.skip(6)?;
        p
    } else {
        let p = PortNumber(r.read_u32()?);
        r.skip(4)?;
        p
    };
    let mut counters = [0u64; 12];
    for c in &mut counters {
        *c = r.read_u64()?;
    }
    let (duration_sec, duration_nsec) = if pv >= ProtocolVersion::V13 {
        (Some(r.read_u32()?), Some(r.read_u32()?))
    } else {
        (None, None)
    };
    Ok(PortStatsEntry {
        port_no,
        rx_packets: counters[0],
        tx_packets: counters[1],
        rx_bytes: counters[2],
        tx_bytes: counters[3],
        rx_dropped: counters[4],
        tx_dropped: counters[5],
        rx_errors: counters[6],
        tx_errors: counters[7],
        rx_frame_err: counters[8],
        rx_over_err: counters[9],
        rx_crc_err: counters[10],
        collisions: counters[11],
        duration_sec,
        duration_nsec,
    })
}

fn parse_queue_stats_entry(r: &mut Reader<'_>, pv: ProtocolVersion) -> Result<QueueStatsEntry> {
    let port_no = if pv == ProtocolVersion::V10 {
        let p = PortNumber::from_v10(r.read_u16()?);
        r.skip(2)?;
        p
    } else {
        PortNumber(r.read_u32()?)
    };
    let queue_id = QueueId(r.read_u32()?);
    let tx_bytes = r.read_u64()?;
    let tx_packets = r.read_u64()?;
    let tx_errors = r.read_u64()?;
    let (duration_sec, duration_nsec) = if pv >= ProtocolVersion::V13 {
        (Some(r.read_u32()?), Some(r.read_u32()?))
    } else {
        (None, None)
    };
    Ok(QueueStatsEntry {
        port_no,
        queue_id,
        tx_bytes,
        tx_packets,
        tx_errors,
        duration_sec,
        duration_nsec,
    })
}

fn parse_group_stats_entry(r: &mut Reader<'_>, pv: ProtocolVersion) -> Result<GroupStatsEntry> {
    let start = r.position();
    let declared = usize::from(r.read_u16()?);
    let end = start + declared;
    r.skip(2)?;
    let group_id = GroupId(r.read_u32()?);
    let ref_count = r.read_u32()?;
    r.skip(4)?;
    let packet_count = r.read_u64()?;
    let byte_count = r.read_u64()?;
    let (duration_sec, duration_nsec) = if pv >= ProtocolVersion::V13 {
        (Some(r.read_u32()?), Some(r.read_u32()?))
    } else {
        (None, None)
    };
    let mut bucket_stats = Vec::new();
    while r.position() < end {
        bucket_stats
            .push(BucketCounter { packet_count: r.read_u64()?, byte_count: r.read_u64()? });
    }
    Ok(GroupStatsEntry {
        group_id,
        ref_count,
        packet_count,
        byte_count,
        duration_sec,
        duration_nsec,
        bucket_stats,
    })
}

fn parse_group_desc_entry(r: &mut Reader<'_>, pv: ProtocolVersion) -> Result<GroupDescEntry> {
    let start = r.position();
    let declared = usize::from(r.read_u16()?);
    let group_type = GroupType::decode(r.read_u8()?.into(), pv)?;
    r.skip(1)?;
    let group_id = GroupId(r.read_u32()?);
    let buckets = parse_bucket_list(start + declared, r, pv)?;
    Ok(GroupDescEntry { group_type, group_id, buckets })
}

fn parse_meter_stats_entry(r: &mut Reader<'_>) -> Result<MeterStatsEntry> {
    let start = r.position();
    let meter_id = MeterId(r.read_u32()?);
    let declared = usize::from(r.read_u16()?);
    let end = start + declared;
    r.skip(6)?;
    let flow_count = r.read_u32()?;
    let packet_in_count = r.read_u64()?;
    let byte_in_count = r.read_u64()?;
    let duration_sec = r.read_u32()?;
    let duration_nsec = r.read_u32()?;
    let mut band_stats = Vec::new();
    while r.position() < end {
        band_stats.push(BucketCounter { packet_count: r.read_u64()?, byte_count: r.read_u64()? });
    }
    Ok(MeterStatsEntry {
        meter_id,
        flow_count,
        packet_in_count,
        byte_in_count,
        duration_sec,
        duration_nsec,
        band_stats,
    })
}

fn parse_meter_config_entry(
    r: &mut Reader<'_>,
    pv: ProtocolVersion,
    cfg: CodecConfig,
) -> Result<MeterConfigEntry> {
    let start = r.position();
    let declared = usize::from(r.read_u16()?);
    let flags = MeterFlag::decode_bitmap(r.read_u16()?.into(), pv, cfg)?;
    let meter_id = MeterId(r.read_u32()?);
    let bands = parse_meter_band_list(start + declared, r, pv)?;
    Ok(MeterConfigEntry { flags, meter_id, bands })
}

fn parse_table_features_entry(
    r: &mut Reader<'_>,
    pv: ProtocolVersion,
) -> Result<TableFeaturesEntry> {
    let start = r.position();
    let declared = usize::from(r.read_u16()?);
    let table_id = TableId(r.read_u8()?);
    r.skip(5)?;
    let name = r.read_fixed_string(TABLE_NAME_LEN)?;
    let metadata_match = r.read_u64()?;
    let metadata_write = r.read_u64()?;
    let config = r.read_u32()?;
    let max_entries = r.read_u32()?;
    let properties = parse_prop_list(start + declared, r, pv)?;
    Ok(TableFeaturesEntry {
        table_id,
        name,
        metadata_match,
        metadata_write,
        config,
        max_entries,
        properties,
    })
}

// --------------------------------------------------------------- encoding

/// Encode a multipart request body.
///
/// # Errors
///
/// Version mismatch for bodies (or nested structures) the revision cannot
/// express.
pub(crate) fn encode_request_body(
    w: &mut Writer,
    body: &MultipartRequestBody,
    pv: ProtocolVersion,
) -> Result<()> {
    use MultipartRequestBody as B;
    match body {
        B::Desc | B::Table | B::GroupDesc | B::GroupFeatures | B::MeterFeatures | B::PortDesc => {}
        B::Flow(req) | B::Aggregate(req) => encode_flow_stats_request(w, req, pv)?,
        B::PortStats { port } => {
            if pv == ProtocolVersion::V10 {
                w.put_u16(port.to_v10()?);
                w.put_zeros(6);
            } else {
                w.put_u32(port.0);
                w.put_zeros(4);
            }
        }
        B::Queue { port, queue_id } => {
            if pv == ProtocolVersion::V10 {
                w.put_u16(port.to_v10()?);
                w.put_zeros(2);
            } else {
                w.put_u32(port.0);
            }
            w.put_u32(queue_id.0);
        }
        B::Group { group_id } => {
            w.put_u32(group_id.0);
            w.put_zeros(4);
        }
        B::Meter { meter_id } | B::MeterConfig { meter_id } => {
            w.put_u32(meter_id.0);
            w.put_zeros(4);
        }
        B::TableFeatures(entries) => {
            for e in entries {
                encode_table_features_entry(w, e, pv)?;
            }
        }
        B::Experimenter { experimenter, exp_type, data } => {
            encode_experimenter_body(w, *experimenter, *exp_type, data, pv)?;
        }
    }
    Ok(())
}

/// Encode a multipart reply body.
///
/// # Errors
///
/// Version mismatch for bodies (or nested structures) the revision cannot
/// express.
pub(crate) fn encode_reply_body(
    w: &mut Writer,
    body: &MultipartReplyBody,
    pv: ProtocolVersion,
) -> Result<()> {
    use MultipartReplyBody as B;
    match body {
        B::Desc(d) => {
            w.put_fixed_string(&d.mfr_desc, DESC_STR_LEN);
            w.put_fixed_string(&d.hw_desc, DESC_STR_LEN);
            w.put_fixed_string(&d.sw_desc, DESC_STR_LEN);
            w.put_fixed_string(&d.serial_num, SERIAL_NUM_LEN);
            w.put_fixed_string(&d.dp_desc, DESC_STR_LEN);
        }
        B::Flow(entries) => {
            for e in entries {
                encode_flow_stats_entry(w, e, pv)?;
            }
        }
        B::Aggregate(a) => {
            w.put_u64(a.packet_count);
            w.put_u64(a.byte_count);
            w.put_u32(a.flow_count);
            w.put_zeros(4);
        }
        B::Table(entries) => {
            for e in entries {
                encode_table_stats_entry(w, e, pv)?;
            }
        }
        B::PortStats(entries) => {
            for e in entries {
                encode_port_stats_entry(w, e, pv)?;
            }
        }
        B::Queue(entries) => {
            for e in entries {
                encode_queue_stats_entry(w, e, pv)?;
            }
        }
        B::Group(entries) => {
            for e in entries {
                encode_group_stats_entry(w, e, pv);
            }
        }
        B::GroupDesc(entries) => {
            for e in entries {
                encode_group_desc_entry(w, e, pv)?;
            }
        }
        B::GroupFeatures(f) => {
            w.put_u32(f.types);
            w.put_u32(f.capabilities);
            for g in f.max_groups {
                w.put_u32(g);
            }
            for a in f.actions {
                w.put_u32(a);
            }
        }
        B::Meter(entries) => {
            for e in entries {
                encode_meter_stats_entry(w, e);
            }
        }
        B::MeterConfig(entries) => {
            for e in entries {
                encode_meter_config_entry(w, e, pv)?;
            }
        }
        B::MeterFeatures(f) => {
            w.put_u32(f.max_meter);
            w.put_u32(f.band_types);
            w.put_u32(f.capabilities);
            w.put_u8(f.max_bands);
            w.put_u8(f.max_color);
            w.put_zeros(2);
        }
        B::TableFeatures(entries) => {
            for e in entries {
                encode_table_features_entry(w, e, pv)?;
            }
        }
        B::PortDesc(ports) => {
            for p in ports {
                encode_port(w, p, pv)?;
            }
        }
        B::Experimenter { experimenter, exp_type, data } => {
            encode_experimenter_body(w, *experimenter, *exp_type, data, pv)?;
        }
    }
    Ok(())
}

fn encode_experimenter_body(
    w: &mut Writer,
    experimenter: u32,
    exp_type: Option<u32>,
    data: &[u8],
    pv: ProtocolVersion,
) -> Result<()> {
    w.put_u32(experimenter);
    if pv > ProtocolVersion::V10 {
        w.put_u32(exp_type.ok_or(ProtocolError::Incomplete(
            "experimenter multipart body needs exp_type from 1.1 on",
        ))?);
    }
    w.put_slice(data);
    Ok(())
}

fn encode_flow_stats_request(
    w: &mut Writer,
    req: &FlowStatsRequest,
    pv: ProtocolVersion,
) -> Result<()> {
    if pv == ProtocolVersion::V10 {
        encode_match(w, &req.match_fields, pv)?;
        w.put_u8(req.table_id.0);
        w.put_zeros(1);
        w.put_u16(req.out_port.to_v10()?);
    } else {
        w.put_u8(req.table_id.0);
        w.put_zeros(3);
        w.put_u32(req.out_port.0);
        w.put_u32(req.out_group.unwrap_or(GroupId::ANY).0);
        w.put_zeros(4);
        w.put_u64(req.cookie);
        w.put_u64(req.cookie_mask);
        encode_match(w, &req.match_fields, pv)?;
    }
    Ok(())
}

fn encode_flow_stats_entry(w: &mut Writer, e: &FlowStatsEntry, pv: ProtocolVersion) -> Result<()> {
    let len_at = w.len();
    w.put_u16(0); // entry length patched below
    w.put_u8(e.table_id.0);
    w.put_zeros(1);
    if pv == ProtocolVersion::V10 {
        encode_match(w, &e.match_fields, pv)?;
        w.put_u32(e.duration_sec);
        w.put_u32(e.duration_nsec);
        w.put_u16(e.priority);
        w.put_u16(e.idle_timeout);
        w.put_u16(e.hard_timeout);
        w.put_zeros(6);
        w.put_u64(e.cookie);
        w.put_u64(e.packet_count);
        w.put_u64(e.byte_count);
        encode_action_list(w, &e.actions, pv)?;
    } else {
        w.put_u32(e.duration_sec);
        w.put_u32(e.duration_nsec);
        w.put_u16(e.priority);
        w.put_u16(e.idle_timeout);
        w.put_u16(e.hard_timeout);
        if pv >= ProtocolVersion::V13 {
            w.put_u16(e.flags.unwrap_or_default().encode_bitmap(pv)? as u16);
            w.put_zeros(4);
        } else {
            w.put_zeros(6);
        }
        w.put_u64(e.cookie);
        w.put_u64(e.packet_count);
        w.put_u64(e.byte_count);
        encode_match(w, &e.match_fields, pv)?;
        encode_instruction_list(w, &e.instructions, pv)?;
    }
    let len = w.len() - len_at;
    w.patch_u16_at(len_at, len as u16);
    Ok(())
}

fn encode_table_stats_entry(w: &mut Writer, e: &TableStatsEntry, pv: ProtocolVersion) -> Result<()> {
    w.put_u8(e.table_id.0);
    w.put_zeros(3);
    if pv == ProtocolVersion::V10 {
        w.put_fixed_string(e.name.as_deref().unwrap_or(""), TABLE_NAME_LEN);
        w.put_u32(e.wildcards.unwrap_or(0));
        w.put_u32(e.max_entries.unwrap_or(0));
        w.put_u32(e.active_count);
        w.put_u64(e.lookup_count);
        w.put_u64(e.matched_count);
    } else {
        w.put_u32(e.active_count);
        w.put_u64(e.lookup_count);
        w.put_u64(e.matched_count);
    }
    Ok(())
}

fn encode_port_stats_entry(w: &mut Writer, e: &PortStatsEntry, pv: ProtocolVersion) -> Result<()> {
    if pv == ProtocolVersion::V10 {
        w.put_u16(e.port_no.to_v10()?);
        w.put_zeros(6);
    } else {
        w.put_u32(e.port_no.0);
        w.put_zeros(4);
    }
    for c in [
        e.rx_packets,
        e.tx_packets,
        e.rx_bytes,
        e.tx_bytes,
        e.rx_dropped,
        e.tx_dropped,
        e.rx_errors,
        e.tx_errors,
        e.rx_frame_err,
        e.rx_over_err,
        e.rx_crc_err,
        e.collisions,
    ] {
        w.put_u64(c);
    }
    if pv >= ProtocolVersion::V13 {
        w.put_u32(e.duration_sec.unwrap_or(0));
        w.put_u32(e.duration_nsec.unwrap_or(0));
    }
    Ok(())
}

fn encode_queue_stats_entry(w: &mut Writer, e: &QueueStatsEntry, pv: ProtocolVersion) -> Result<()> {
    if pv == ProtocolVersion::V10 {
        w.put_u16(e.port_no.to_v10()?);
        w.put_zeros(2);
    } else {
        w.put_u32(e.port_no.0);
    }
    w.put_u32(e.queue_id.0);
    w.put_u64(e.tx_bytes);
    w.put_u64(e.tx_packets);
    w.put_u64(e.tx_errors);
    if pv >= ProtocolVersion::V13 {
        w.put_u32(e.duration_sec.unwrap_or(0));
        w.put_u32(e.duration_nsec.unwrap_or(0));
    }
    Ok(())
}

fn encode_group_stats_entry(w: &mut Writer, e: &GroupStatsEntry, pv: ProtocolVersion) {
    let len_at = w.len();
    w.put_u16(0);
    w.put_zeros(2);
    w.put_u32(e.group_id.0);
    w.put_u32(e.ref_count);
    w.put_zeros(4);
    w.put_u64(e.packet_count);
    w.put_u64(e.byte_count);
    if pv >= ProtocolVersion::V13 {
        w.put_u32(e.duration_sec.unwrap_or(0));
        w.put_u32(e.duration_nsec.unwrap_or(0));
    }
    for b in &e.bucket_stats {
        w.put_u64(b.packet_count);
        w.put_u64(b.byte_count);
    }
    let len = w.len() - len_at;
    w.patch_u16_at(len_at, len as u16);
}

fn encode_group_desc_entry(w: &mut Writer, e: &GroupDescEntry, pv: ProtocolVersion) -> Result<()> {
    let len_at = w.len();
    w.put_u16(0);
    w.put_u8(e.group_type.wire_code(pv)? as u8);
    w.put_zeros(1);
    w.put_u32(e.group_id.0);
    encode_bucket_list(w, &e.buckets, pv)?;
    let len = w.len() - len_at;
    w.patch_u16_at(len_at, len as u16);
    Ok(())
}

fn encode_meter_stats_entry(w: &mut Writer, e: &MeterStatsEntry) {
    let len_at = w.len();
    w.put_u32(e.meter_id.0);
    w.put_u16(0); // length patched below
    w.put_zeros(6);
    w.put_u32(e.flow_count);
    w.put_u64(e.packet_in_count);
    w.put_u64(e.byte_in_count);
    w.put_u32(e.duration_sec);
    w.put_u32(e.duration_nsec);
    for b in &e.band_stats {
        w.put_u64(b.packet_count);
        w.put_u64(b.byte_count);
    }
    let len = w.len() - len_at;
    w.patch_u16_at(len_at + 4, len as u16);
}

fn encode_meter_config_entry(
    w: &mut Writer,
    e: &MeterConfigEntry,
    pv: ProtocolVersion,
) -> Result<()> {
    let len_at = w.len();
    w.put_u16(0);
    w.put_u16(e.flags.encode_bitmap(pv)? as u16);
    w.put_u32(e.meter_id.0);
    encode_meter_band_list(w, &e.bands, pv)?;
    let len = w.len() - len_at;
    w.patch_u16_at(len_at, len as u16);
    Ok(())
}

fn encode_table_features_entry(
    w: &mut Writer,
    e: &TableFeaturesEntry,
    pv: ProtocolVersion,
) -> Result<()> {
    let len_at = w.len();
    w.put_u16(0);
    w.put_u8(e.table_id.0);
    w.put_zeros(5);
    w.put_fixed_string(&e.name, TABLE_NAME_LEN);
    w.put_u64(e.metadata_match);
    w.put_u64(e.metadata_write);
    w.put_u32(e.config);
    w.put_u32(e.max_entries);
    encode_prop_list(w, &e.properties, pv)?;
    let len = w.len() - len_at;
    w.patch_u16_at(len_at, len as u16);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{VersionSet, ALL_VERSIONS};

    fn cfg() -> CodecConfig {
        CodecConfig { strict: false, supported: VersionSet::of(&ALL_VERSIONS) }
    }

    fn reply_round_trip(body: &MultipartReplyBody, pv: ProtocolVersion) -> MultipartReplyBody {
        let mut w = Writer::new();
        encode_reply_body(&mut w, body, pv).unwrap();
        let bytes = w.into_vec();
        let mut r = Reader::new(&bytes);
        let (parsed, defect) =
            parse_reply_body(body.mp_type(), bytes.len(), &mut r, pv, cfg()).unwrap();
        assert!(defect.is_none(), "unexpected defect: {defect:?}");
        parsed
    }

    #[test]
    fn desc_reply_round_trips() {
        let body = MultipartReplyBody::Desc(DescStats {
            mfr_desc: "Acme Switchworks".into(),
            hw_desc: "AS-9000".into(),
            sw_desc: "9.1.2".into(),
            serial_num: "SN0001".into(),
            dp_desc: "lab fabric".into(),
        });
        assert_eq!(reply_round_trip(&body, ProtocolVersion::V13), body);
    }

    #[test]
    fn flow_stats_reply_round_trips_v13() {
        let body = MultipartReplyBody::Flow(vec![FlowStatsEntry {
            table_id: TableId(0),
            duration_sec: 100,
            duration_nsec: 5,
            priority: 1000,
            idle_timeout: 60,
            hard_timeout: 0,
            flags: Some(FlowModFlag::SEND_FLOW_REM),
            cookie: 0xfeed,
            packet_count: 42,
            byte_count: 4200,
            match_fields: Match {
                fields: vec![crate::match_field::MatchField::InPort(PortNumber(1))],
            },
            actions: Vec::new(),
            instructions: vec![Instruction::ApplyActions(vec![Action::Output {
                port: PortNumber(2),
                max_len: 0,
            }])],
        }]);
        assert_eq!(reply_round_trip(&body, ProtocolVersion::V13), body);
    }

    #[test]
    fn flow_stats_reply_round_trips_v10() {
        let body = MultipartReplyBody::Flow(vec![FlowStatsEntry {
            table_id: TableId(0),
            duration_sec: 1,
            duration_nsec: 2,
            priority: 10,
            idle_timeout: 0,
            hard_timeout: 0,
            flags: None,
            cookie: 7,
            packet_count: 1,
            byte_count: 60,
            match_fields: Match::any(),
            actions: vec![Action::Output { port: PortNumber(3), max_len: 0xffff }],
            instructions: Vec::new(),
        }]);
        assert_eq!(reply_round_trip(&body, ProtocolVersion::V10), body);
    }

    #[test]
    fn port_stats_layouts_differ() {
        let entry = PortStatsEntry {
            port_no: PortNumber(7),
            rx_packets: 1,
            tx_packets: 2,
            rx_bytes: 3,
            tx_bytes: 4,
            rx_dropped: 0,
            tx_dropped: 0,
            rx_errors: 0,
            tx_errors: 0,
            rx_frame_err: 0,
            rx_over_err: 0,
            rx_crc_err: 0,
            collisions: 0,
            duration_sec: None,
            duration_nsec: None,
        };
        let mut w = Writer::new();
        encode_port_stats_entry(&mut w, &entry, ProtocolVersion::V10).unwrap();
        assert_eq!(w.len(), 104);

        let mut entry13 = entry.clone();
        entry13.duration_sec = Some(9);
        entry13.duration_nsec = Some(1);
        let mut w = Writer::new();
        encode_port_stats_entry(&mut w, &entry13, ProtocolVersion::V13).unwrap();
        assert_eq!(w.len(), 112);

        let body = MultipartReplyBody::PortStats(vec![entry13]);
        assert_eq!(reply_round_trip(&body, ProtocolVersion::V13), body);
    }

    #[test]
    fn group_stats_round_trip_with_buckets() {
        let body = MultipartReplyBody::Group(vec![GroupStatsEntry {
            group_id: GroupId(4),
            ref_count: 2,
            packet_count: 10,
            byte_count: 1000,
            duration_sec: Some(5),
            duration_nsec: Some(0),
            bucket_stats: vec![
                BucketCounter { packet_count: 6, byte_count: 600 },
                BucketCounter { packet_count: 4, byte_count: 400 },
            ],
        }]);
        assert_eq!(reply_round_trip(&body, ProtocolVersion::V13), body);
    }

    #[test]
    fn meter_bodies_round_trip() {
        let config = MultipartReplyBody::MeterConfig(vec![MeterConfigEntry {
            flags: MeterFlag::KBPS | MeterFlag::BURST,
            meter_id: MeterId(2),
            bands: vec![crate::meter::MeterBand {
                rate: 1000,
                burst_size: 128,
                kind: crate::meter::MeterBandKind::Drop,
            }],
        }]);
        assert_eq!(reply_round_trip(&config, ProtocolVersion::V13), config);

        let stats = MultipartReplyBody::Meter(vec![MeterStatsEntry {
            meter_id: MeterId(2),
            flow_count: 1,
            packet_in_count: 5,
            byte_in_count: 500,
            duration_sec: 60,
            duration_nsec: 0,
            band_stats: vec![BucketCounter { packet_count: 1, byte_count: 100 }],
        }]);
        assert_eq!(reply_round_trip(&stats, ProtocolVersion::V13), stats);
    }

    #[test]
    fn table_features_entry_round_trips() {
        let body = MultipartReplyBody::TableFeatures(vec![TableFeaturesEntry {
            table_id: TableId(0),
            name: "ingress".into(),
            metadata_match: u64::MAX,
            metadata_write: 0,
            config: 0,
            max_entries: 1024,
            properties: vec![TableFeatureProp::NextTables {
                miss: false,
                tables: vec![TableId(1)],
            }],
        }]);
        assert_eq!(reply_round_trip(&body, ProtocolVersion::V13), body);
    }

    #[test]
    fn defective_trailing_element_preserves_earlier_ones() {
        let good = MultipartReplyBody::PortDesc(vec![]);
        let mut w = Writer::new();
        // one valid 64-byte port, then garbage that claims to be a port but
        // is truncated
        let port = Port {
            port_no: PortNumber(1),
            hw_addr: crate::types::MacAddress([0; 6]),
            name: "p1".into(),
            config: crate::flags::PortConfig::empty(),
            state: crate::flags::PortState::empty(),
            stp_state: None,
            curr: crate::flags::PortFeature::empty(),
            advertised: crate::flags::PortFeature::empty(),
            supported: crate::flags::PortFeature::empty(),
            peer: crate::flags::PortFeature::empty(),
            curr_speed: Some(0),
            max_speed: Some(0),
        };
        encode_port(&mut w, &port, ProtocolVersion::V13).unwrap();
        w.put_zeros(10); // half a port
        let bytes = w.into_vec();
        let mut r = Reader::new(&bytes);
        let (parsed, defect) =
            parse_reply_body(good.mp_type(), bytes.len(), &mut r, ProtocolVersion::V13, cfg())
                .unwrap();
        match parsed {
            MultipartReplyBody::PortDesc(ports) => {
                assert_eq!(ports.len(), 1);
                assert_eq!(ports[0], port);
            }
            other => panic!("unexpected body {other:?}"),
        }
        assert!(matches!(*defect.unwrap(), ProtocolError::BufferUnderflow { .. }));
    }

    #[test]
    fn accumulation_composes_element_lists() {
        let mut first = MultipartReply {
            flags: MultipartReplyFlag::REPLY_MORE,
            body: MultipartReplyBody::PortDesc(vec![]),
            defect: None,
        };
        let second = MultipartReply {
            flags: MultipartReplyFlag::empty(),
            body: MultipartReplyBody::PortDesc(vec![]),
            defect: None,
        };
        first.append_from(second).unwrap();
        assert!(!first.has_more());

        let bad = MultipartReply {
            flags: MultipartReplyFlag::empty(),
            body: MultipartReplyBody::Aggregate(AggregateStats::default()),
            defect: None,
        };
        let mut agg = bad.clone();
        assert!(matches!(
            agg.append_from(bad).unwrap_err(),
            ProtocolError::UnsupportedOperation(_)
        ));
    }

    #[test]
    fn request_bodies_round_trip() {
        for (pv, body) in [
            (ProtocolVersion::V13, MultipartRequestBody::Desc),
            (
                ProtocolVersion::V13,
                MultipartRequestBody::Flow(FlowStatsRequest {
                    table_id: TableId::ALL,
                    out_port: PortNumber::ANY,
                    out_group: Some(GroupId::ANY),
                    cookie: 0,
                    cookie_mask: 0,
                    match_fields: Match::any(),
                }),
            ),
            (
                ProtocolVersion::V10,
                MultipartRequestBody::Flow(FlowStatsRequest {
                    table_id: TableId::ALL,
                    out_port: PortNumber::ANY,
                    out_group: None,
                    cookie: 0,
                    cookie_mask: 0,
                    match_fields: Match::any(),
                }),
            ),
            (ProtocolVersion::V13, MultipartRequestBody::PortStats { port: PortNumber::ANY }),
            (
                ProtocolVersion::V13,
                MultipartRequestBody::Queue { port: PortNumber(1), queue_id: QueueId::ALL },
            ),
            (ProtocolVersion::V13, MultipartRequestBody::Group { group_id: GroupId::ALL }),
            (ProtocolVersion::V13, MultipartRequestBody::MeterConfig { meter_id: MeterId::ALL }),
            (ProtocolVersion::V13, MultipartRequestBody::TableFeatures(vec![])),
            (
                ProtocolVersion::V13,
                MultipartRequestBody::Experimenter {
                    experimenter: 0x1234,
                    exp_type: Some(1),
                    data: vec![1, 2],
                },
            ),
        ] {
            let mut w = Writer::new();
            encode_request_body(&mut w, &body, pv).unwrap();
            let bytes = w.into_vec();
            let mut r = Reader::new(&bytes);
            let parsed =
                parse_request_body(body.mp_type(), bytes.len(), &mut r, pv, cfg()).unwrap();
            assert_eq!(parsed, body, "for version {pv}");
            assert_eq!(r.position(), bytes.len(), "body fully consumed for {pv}");
        }
    }
}
