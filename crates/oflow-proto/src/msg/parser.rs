//! Frame parsing and type dispatch.
//!
//! [`parse_message`] consumes exactly one frame from the reader. The
//! critical invariant is resynchronization: once a full frame is buffered,
//! the cursor always ends up at `frame start + declared length` - on
//! success, on malformed bodies, and on unrecognized versions alike (the
//! header's length field is trusted even when the body is not) - so a
//! stream of messages sharing one buffer survives a bad frame in the
//! middle.
//!
//! Underrun is not failure: with less than a full header, or less than the
//! declared frame length, buffered, the entry points return `Ok(None)` and
//! leave the reader untouched so the caller can wait for more input.

use tracing::warn;

use crate::{
    buffer::Reader,
    errors::{ProtocolError, Result},
    hello_elem,
    match_field::{parse_match, MatchField},
    msg::{
        bodies::*,
        codes::{
            ControllerRole, ErrorType, FlowModCommand, FlowRemovedReason, GroupModCommand,
            GroupType, MeterModCommand, MultipartType, PacketInReason, PortReason,
        },
        header::{Header, MessageType, HEADER_LEN, HEADER_LEN_FIELD_OFFSET},
        multipart::{self, MultipartReply, MultipartRequest},
        Message,
    },
    port::{parse_port, parse_port_list},
    queue::parse_queue_list,
    types::{BufferId, DataPathId, GroupId, MeterId, PortNumber, TableId},
    version::{CodecConfig, ProtocolVersion},
};
use crate::{
    actions::parse_action_list,
    flags::{
        Capability, ConfigFlag, FlowModFlag, MeterFlag, MultipartReplyFlag, MultipartRequestFlag,
        PortConfig, PortFeature, SupportedAction, TableConfig,
    },
    group::parse_bucket_list,
    instructions::parse_instruction_list,
    meter::parse_meter_band_list,
};

/// Parse one message under the process-wide policy defaults.
///
/// Returns `Ok(None)` when the buffer does not yet hold a complete frame.
///
/// # Errors
///
/// See [`parse_message_with`].
pub fn parse_message(r: &mut Reader<'_>) -> Result<Option<Message>> {
    parse_message_with(r, CodecConfig::default())
}

/// Parse one message under an explicit policy.
///
/// Returns `Ok(None)` on header or body underrun. Once a full frame is
/// buffered, the cursor is advanced to the frame boundary whether or not
/// parsing succeeds.
///
/// # Errors
///
/// - [`ProtocolError::VersionNotSupported`] for recognized versions outside
///   the supported set (HELLO and ERROR are always parsed);
/// - [`ProtocolError::ParseFailed`] wrapping the underlying cause for
///   malformed frames, carrying byte offsets and the partially decoded
///   header.
pub fn parse_message_with(r: &mut Reader<'_>, cfg: CodecConfig) -> Result<Option<Message>> {
    if r.remaining() < HEADER_LEN {
        return Ok(None);
    }
    let Some(declared) = r.peek_u16_at(HEADER_LEN_FIELD_OFFSET) else {
        return Ok(None);
    };
    let declared = usize::from(declared);
    if r.remaining() < declared {
        return Ok(None);
    }
    parse_frame(r, declared, cfg).map(Some)
}

/// Parse one message and correlate it against `request`: the reply must be
/// the same protocol version and carry the request's xid.
///
/// # Errors
///
/// As [`parse_message_with`], plus a version-mismatch when the versions
/// differ and [`ProtocolError::BadXid`] when the correlation fails.
pub fn parse_message_expecting(
    r: &mut Reader<'_>,
    request: &Message,
    cfg: CodecConfig,
) -> Result<Option<Message>> {
    let Some(reply) = parse_message_with(r, cfg)? else {
        return Ok(None);
    };
    if reply.version() != request.version() {
        return Err(ProtocolError::VersionMismatch {
            version: reply.version(),
            item: format!("reply version (request was {})", request.version()),
        });
    }
    if reply.xid() != request.xid() {
        return Err(ProtocolError::BadXid(format!(
            "reply xid {:#010x} does not match request xid {:#010x}",
            reply.xid(),
            request.xid()
        )));
    }
    Ok(Some(reply))
}

fn parse_frame(r: &mut Reader<'_>, declared: usize, cfg: CodecConfig) -> Result<Message> {
    let start = r.position();
    let target = start + declared;
    r.mark_frame(start, target);

    let mut header_seen = None;
    let result = parse_frame_inner(r, target, cfg, &mut header_seen);

    // resynchronize: the declared length is trusted even when the body is
    // not, so the next message in the buffer stays reachable
    if r.position() < target {
        warn!(
            start,
            target,
            read = r.position() - start,
            skipped = target - r.position(),
            "message parse stopped short of the frame boundary; resynchronizing"
        );
        r.seek(target.min(r.limit()));
    } else if r.position() > target && declared >= HEADER_LEN {
        // a body that read past its declared end; clamp back so the next
        // frame stays correctly framed (a declared length below the header
        // size is left alone: the cursor must keep moving forward)
        warn!(
            start,
            target,
            overrun = r.position() - target,
            "message parse overran the frame boundary; resynchronizing"
        );
        r.seek(target);
    }

    match result {
        Ok(msg) => Ok(msg),
        Err(e @ ProtocolError::VersionNotSupported(_)) => {
            warn!(header = ?header_seen, "dropping message in unsupported protocol version");
            Err(e)
        }
        Err(source) => {
            warn!(header = ?header_seen, error = %source, "failed to parse message");
            Err(ProtocolError::ParseFailed {
                start,
                offset: r.position(),
                header: header_seen,
                source: Box::new(source),
            })
        }
    }
}

fn parse_frame_inner(
    r: &mut Reader<'_>,
    target: usize,
    cfg: CodecConfig,
    header_seen: &mut Option<Header>,
) -> Result<Message> {
    let header = Header::parse(r)?;
    *header_seen = Some(header);

    if usize::from(header.length()) < HEADER_LEN {
        return Err(ProtocolError::Malformed {
            context: "frame header",
            offset: r.frame_start(),
            detail: format!("declared length {} below the 8-byte header", header.length()),
        });
    }

    let pv = header.version()?;
    let msg_type = header.message_type()?;

    // HELLO and ERROR must parse in every recognized version, or version
    // negotiation could never happen
    if !matches!(msg_type, MessageType::Hello | MessageType::Error)
        && !cfg.supported.contains(pv)
    {
        return Err(ProtocolError::VersionNotSupported(pv));
    }

    let body = parse_body(msg_type, r, pv, target, cfg)?;
    Ok(Message::from_parts(header, body))
}

fn unsupported_layout(pv: ProtocolVersion, what: &str) -> ProtocolError {
    ProtocolError::VersionMismatch { version: pv, item: what.to_string() }
}

#[allow(clippy::too_many_lines)]
fn parse_body(
    msg_type: MessageType,
    r: &mut Reader<'_>,
    pv: ProtocolVersion,
    target: usize,
    cfg: CodecConfig,
) -> Result<Body> {
    Ok(match msg_type {
        MessageType::Hello => {
            Body::Hello(Hello { elements: hello_elem::parse_element_list(target, r)? })
        }
        MessageType::Error => Body::Error(parse_error_body(r, pv, target)?),
        MessageType::EchoRequest => {
            Body::EchoRequest(Echo { data: r.read_bytes(target.saturating_sub(r.position()))?.to_vec() })
        }
        MessageType::EchoReply => {
            Body::EchoReply(Echo { data: r.read_bytes(target.saturating_sub(r.position()))?.to_vec() })
        }
        MessageType::Experimenter => {
            let experimenter = r.read_u32()?;
            let exp_type = if pv > ProtocolVersion::V10 { Some(r.read_u32()?) } else { None };
            let data = r.read_bytes(target.saturating_sub(r.position()))?.to_vec();
            Body::Experimenter(Experimenter { experimenter, exp_type, data })
        }
        MessageType::FeaturesRequest => Body::FeaturesRequest,
        MessageType::FeaturesReply => {
            let datapath_id = DataPathId(r.read_u64()?);
            let num_buffers = r.read_u32()?;
            let num_tables = r.read_u8()?;
            let aux_id = if pv >= ProtocolVersion::V13 {
                let aux = r.read_u8()?;
                r.skip(2)?;
                Some(aux)
            } else {
                r.skip(3)?;
                None
            };
            let capabilities = Capability::decode_bitmap(r.read_u32()?, pv, cfg)?;
            let supported_actions = if pv == ProtocolVersion::V10 {
                Some(SupportedAction::decode_bitmap(r.read_u32()?, pv, cfg)?)
            } else {
                r.skip(4)?; // reserved
                None
            };
            let ports = if pv <= ProtocolVersion::V12 {
                parse_port_list(target, r, pv, cfg)?
            } else {
                Vec::new()
            };
            Body::FeaturesReply(FeaturesReply {
                datapath_id,
                num_buffers,
                num_tables,
                aux_id,
                capabilities,
                supported_actions,
                ports,
            })
        }
        MessageType::GetConfigRequest => Body::GetConfigRequest,
        MessageType::GetConfigReply => Body::GetConfigReply(parse_switch_config(r, pv, cfg)?),
        MessageType::SetConfig => Body::SetConfig(parse_switch_config(r, pv, cfg)?),
        MessageType::PacketIn => Body::PacketIn(parse_packet_in(r, pv, target)?),
        MessageType::FlowRemoved => Body::FlowRemoved(parse_flow_removed(r, pv)?),
        MessageType::PortStatus => {
            let reason = PortReason::decode(r.read_u8()?.into(), pv)?;
            r.skip(7)?;
            Body::PortStatus(PortStatus { reason, desc: parse_port(r, pv, cfg)? })
        }
        MessageType::PacketOut => {
            let buffer_id = BufferId(r.read_u32()?);
            let in_port = if pv == ProtocolVersion::V10 {
                PortNumber::from_v10(r.read_u16()?)
            } else {
                PortNumber(r.read_u32()?)
            };
            let actions_len = usize::from(r.read_u16()?);
            if pv > ProtocolVersion::V10 {
                r.skip(6)?;
            }
            let actions = parse_action_list(r.position() + actions_len, r, pv)?;
            let data = r.read_bytes(target.saturating_sub(r.position()))?.to_vec();
            Body::PacketOut(PacketOut { buffer_id, in_port, actions, data })
        }
        MessageType::FlowMod => Body::FlowMod(parse_flow_mod(r, pv, target, cfg)?),
        MessageType::GroupMod => {
            let command = GroupModCommand::decode(r.read_u16()?, pv)?;
            let group_type = GroupType::decode(r.read_u8()?.into(), pv)?;
            r.skip(1)?;
            let group_id = GroupId(r.read_u32()?);
            let buckets = parse_bucket_list(target, r, pv)?;
            Body::GroupMod(GroupMod { command, group_type, group_id, buckets })
        }
        MessageType::PortMod => {
            let (port_no, hw_addr) = if pv == ProtocolVersion::V10 {
                (PortNumber::from_v10(r.read_u16()?), r.read_mac()?)
            } else {
                let p = PortNumber(r.read_u32()?);
                r.skip(4)?;
                let mac = r.read_mac()?;
                r.skip(2)?;
                (p, mac)
            };
            let config = PortConfig::decode_bitmap(r.read_u32()?, pv, cfg)?;
            let mask = PortConfig::decode_bitmap(r.read_u32()?, pv, cfg)?;
            let advertise = PortFeature::decode_bitmap(r.read_u32()?, pv, cfg)?;
            r.skip(4)?;
            Body::PortMod(PortMod { port_no, hw_addr, config, mask, advertise })
        }
        MessageType::TableMod => {
            if pv < ProtocolVersion::V11 {
                return Err(unsupported_layout(pv, "table-mod message"));
            }
            let table_id = TableId(r.read_u8()?);
            r.skip(3)?;
            let config = TableConfig::decode_bitmap(r.read_u32()?, pv, cfg)?;
            Body::TableMod(TableMod { table_id, config })
        }
        MessageType::MultipartRequest => {
            let mp_type = MultipartType::decode(r.read_u16()?, pv)?;
            let flags =
                MultipartRequestFlag::decode_bitmap(r.read_u16()?.into(), pv, cfg)?;
            if pv == ProtocolVersion::V13 {
                r.skip(4)?;
            }
            let body = multipart::parse_request_body(mp_type, target, r, pv, cfg)?;
            Body::MultipartRequest(MultipartRequest { flags, body })
        }
        MessageType::MultipartReply => {
            let mp_type = MultipartType::decode(r.read_u16()?, pv)?;
            let flags = MultipartReplyFlag::decode_bitmap(r.read_u16()?.into(), pv, cfg)?;
            if pv == ProtocolVersion::V13 {
                r.skip(4)?;
            }
            let (body, defect) = multipart::parse_reply_body(mp_type, target, r, pv, cfg)?;
            Body::MultipartReply(MultipartReply { flags, body, defect })
        }
        MessageType::BarrierRequest => Body::BarrierRequest,
        MessageType::BarrierReply => Body::BarrierReply,
        MessageType::QueueGetConfigRequest => {
            let port = if pv == ProtocolVersion::V10 {
                let p = PortNumber::from_v10(r.read_u16()?);
                r.skip(2)?;
                p
            } else {
                let p = PortNumber(r.read_u32()?);
                r.skip(4)?;
                p
            };
            Body::QueueGetConfigRequest(QueueGetConfigRequest { port })
        }
        MessageType::QueueGetConfigReply => {
            let port = if pv == ProtocolVersion::V10 {
                let p = PortNumber::from_v10(r.read_u16()?);
                r.skip(6)?;
                p
            } else {
                let p = PortNumber(r.read_u32()?);
                r.skip(4)?;
                p
            };
            let queues = parse_queue_list(target, r, pv)?;
            Body::QueueGetConfigReply(QueueGetConfigReply { port, queues })
        }
        MessageType::RoleRequest | MessageType::RoleReply => {
            let role = ControllerRole::decode(r.read_u32()?, pv)?;
            r.skip(4)?;
            let generation_id = r.read_u64()?;
            let body = Role { role, generation_id };
            if msg_type == MessageType::RoleRequest {
                Body::RoleRequest(body)
            } else {
                Body::RoleReply(body)
            }
        }
        MessageType::GetAsyncRequest => Body::GetAsyncRequest,
        MessageType::GetAsyncReply | MessageType::SetAsync => {
            let mut masks = [0u32; 6];
            for m in &mut masks {
                *m = r.read_u32()?;
            }
            let config = AsyncConfig {
                packet_in_mask: [masks[0], masks[1]],
                port_status_mask: [masks[2], masks[3]],
                flow_removed_mask: [masks[4], masks[5]],
            };
            if msg_type == MessageType::GetAsyncReply {
                Body::GetAsyncReply(config)
            } else {
                Body::SetAsync(config)
            }
        }
        MessageType::MeterMod => {
            let command = MeterModCommand::decode(r.read_u16()?, pv)?;
            let flags = MeterFlag::decode_bitmap(r.read_u16()?.into(), pv, cfg)?;
            let meter_id = MeterId(r.read_u32()?);
            let bands = parse_meter_band_list(target, r, pv)?;
            Body::MeterMod(MeterMod { command, flags, meter_id, bands })
        }
    })
}

fn parse_error_body(r: &mut Reader<'_>, pv: ProtocolVersion, target: usize) -> Result<ErrorMsg> {
    let err_type = ErrorType::decode(r.read_u16()?, pv)?;
    if err_type == ErrorType::Experimenter {
        let exp_type = r.read_u16()?;
        let experimenter = r.read_u32()?;
        let data = r.read_bytes(target.saturating_sub(r.position()))?.to_vec();
        return Ok(ErrorMsg::Experimenter { exp_type, experimenter, data });
    }
    let code = r.read_u16()?;
    let data = r.read_bytes(target.saturating_sub(r.position()))?.to_vec();
    Ok(ErrorMsg::Standard { err_type, code, data })
}

fn parse_switch_config(
    r: &mut Reader<'_>,
    pv: ProtocolVersion,
    cfg: CodecConfig,
) -> Result<SwitchConfig> {
    let flags = ConfigFlag::decode_bitmap(r.read_u16()?.into(), pv, cfg)?;
    let miss_send_len = r.read_u16()?;
    Ok(SwitchConfig { flags, miss_send_len })
}

fn parse_packet_in(r: &mut Reader<'_>, pv: ProtocolVersion, target: usize) -> Result<PacketIn> {
    let buffer_id = BufferId(r.read_u32()?);
    let total_len = r.read_u16()?;
    match pv {
        ProtocolVersion::V10 => {
            let in_port = PortNumber::from_v10(r.read_u16()?);
            let reason = PacketInReason::decode(r.read_u8()?.into(), pv)?;
            r.skip(1)?;
            let data = r.read_bytes(target.saturating_sub(r.position()))?.to_vec();
            Ok(PacketIn {
                buffer_id,
                total_len,
                in_port: Some(in_port),
                in_phy_port: None,
                reason,
                table_id: None,
                cookie: None,
                match_fields: None,
                data,
            })
        }
        ProtocolVersion::V12 | ProtocolVersion::V13 => {
            let reason = PacketInReason::decode(r.read_u8()?.into(), pv)?;
            let table_id = TableId(r.read_u8()?);
            let cookie = if pv >= ProtocolVersion::V13 { Some(r.read_u64()?) } else { None };
            let match_fields = parse_match(r, pv)?;
            // the ingress ports ride inside the match
            let mut in_port = None;
            let mut in_phy_port = None;
            for f in &match_fields.fields {
                match f {
                    MatchField::InPort(p) => in_port = Some(*p),
                    MatchField::InPhyPort(p) => in_phy_port = Some(*p),
                    _ => {}
                }
            }
            // an omitted physical port means "same as in_port"
            if in_phy_port.is_none() {
                in_phy_port = in_port;
            }
            r.skip(2)?;
            let data = r.read_bytes(target.saturating_sub(r.position()))?.to_vec();
            Ok(PacketIn {
                buffer_id,
                total_len,
                in_port,
                in_phy_port,
                reason,
                table_id: Some(table_id),
                cookie,
                match_fields: Some(match_fields),
                data,
            })
        }
        _ => Err(unsupported_layout(pv, "packet-in body")),
    }
}

fn parse_flow_removed(r: &mut Reader<'_>, pv: ProtocolVersion) -> Result<FlowRemoved> {
    match pv {
        ProtocolVersion::V10 => {
            let match_fields = parse_match(r, pv)?;
            let cookie = r.read_u64()?;
            let priority = r.read_u16()?;
            let reason = FlowRemovedReason::decode(r.read_u8()?.into(), pv)?;
            r.skip(1)?;
            let duration_sec = r.read_u32()?;
            let duration_nsec = r.read_u32()?;
            let idle_timeout = r.read_u16()?;
            r.skip(2)?;
            let packet_count = r.read_u64()?;
            let byte_count = r.read_u64()?;
            Ok(FlowRemoved {
                cookie,
                priority,
                reason,
                table_id: None,
                duration_sec,
                duration_nsec,
                idle_timeout,
                hard_timeout: None,
                packet_count,
                byte_count,
                match_fields,
            })
        }
        ProtocolVersion::V13 => {
            let cookie = r.read_u64()?;
            let priority = r.read_u16()?;
            let reason = FlowRemovedReason::decode(r.read_u8()?.into(), pv)?;
            let table_id = TableId(r.read_u8()?);
            let duration_sec = r.read_u32()?;
            let duration_nsec = r.read_u32()?;
            let idle_timeout = r.read_u16()?;
            let hard_timeout = r.read_u16()?;
            let packet_count = r.read_u64()?;
            let byte_count = r.read_u64()?;
            let match_fields = parse_match(r, pv)?;
            Ok(FlowRemoved {
                cookie,
                priority,
                reason,
                table_id: Some(table_id),
                duration_sec,
                duration_nsec,
                idle_timeout,
                hard_timeout: Some(hard_timeout),
                packet_count,
                byte_count,
                match_fields,
            })
        }
        _ => Err(unsupported_layout(pv, "flow-removed body")),
    }
}

fn parse_flow_mod(
    r: &mut Reader<'_>,
    pv: ProtocolVersion,
    target: usize,
    cfg: CodecConfig,
) -> Result<FlowMod> {
    if pv == ProtocolVersion::V10 {
        let match_fields = parse_match(r, pv)?;
        let cookie = r.read_u64()?;
        let command = FlowModCommand::decode(r.read_u16()?, pv)?;
        let idle_timeout = r.read_u16()?;
        let hard_timeout = r.read_u16()?;
        let priority = r.read_u16()?;
        let buffer_id = BufferId(r.read_u32()?);
        let out_port = PortNumber::from_v10(r.read_u16()?);
        let flags = FlowModFlag::decode_bitmap(r.read_u16()?.into(), pv, cfg)?;
        let actions = parse_action_list(target, r, pv)?;
        Ok(FlowMod {
            cookie,
            cookie_mask: None,
            table_id: None,
            command,
            idle_timeout,
            hard_timeout,
            priority,
            buffer_id,
            out_port,
            out_group: None,
            flags,
            match_fields,
            actions,
            instructions: Vec::new(),
        })
    } else {
        let cookie = r.read_u64()?;
        let cookie_mask = r.read_u64()?;
        let table_id = TableId(r.read_u8()?);
        let command = FlowModCommand::decode(r.read_u8()?.into(), pv)?;
        let idle_timeout = r.read_u16()?;
        let hard_timeout = r.read_u16()?;
        let priority = r.read_u16()?;
        let buffer_id = BufferId(r.read_u32()?);
        let out_port = PortNumber(r.read_u32()?);
        let out_group = GroupId(r.read_u32()?);
        let flags = FlowModFlag::decode_bitmap(r.read_u16()?.into(), pv, cfg)?;
        r.skip(2)?;
        let match_fields = parse_match(r, pv)?;
        let instructions = parse_instruction_list(target, r, pv)?;
        Ok(FlowMod {
            cookie,
            cookie_mask: Some(cookie_mask),
            table_id: Some(table_id),
            command,
            idle_timeout,
            hard_timeout,
            priority,
            buffer_id,
            out_port,
            out_group: Some(out_group),
            flags,
            match_fields,
            actions: Vec::new(),
            instructions,
        })
    }
}
