//! Message encoding.
//!
//! Encoding is the strict mirror of the parser: for every supported
//! (version, kind) pair, `parse(encode(m)) == m` field-for-field and
//! `encode(parse(bytes)) == bytes` byte-for-byte. Sealing a message runs
//! the same body encoder once to validate the body and compute the header
//! length, so a sealed message cannot fail to encode.

use crate::{
    actions::encode_action_list,
    buffer::Writer,
    errors::{ProtocolError, Result},
    group::encode_bucket_list,
    hello_elem::encode_element_list,
    instructions::encode_instruction_list,
    match_field::encode_match,
    meter::encode_meter_band_list,
    msg::{
        bodies::*,
        codes::ErrorType,
        header::HEADER_LEN,
        multipart::{encode_reply_body, encode_request_body},
        Message,
    },
    port::encode_port,
    queue::encode_queue_list,
    types::GroupId,
    version::ProtocolVersion,
};

/// Encode a sealed message into a fresh byte vector.
///
/// # Errors
///
/// Sealing already validated the body, so failures here indicate a body
/// mutated through a patch into an inexpressible state - not expected in
/// practice.
pub fn encode_message(msg: &Message) -> Result<Vec<u8>> {
    let mut w = Writer::with_capacity(usize::from(msg.length()));
    encode_message_into(msg, &mut w)?;
    Ok(w.into_vec())
}

/// Encode a sealed message onto an existing writer (for batching several
/// messages into one buffer).
///
/// The header's length field is recomputed from the bytes actually
/// written, so a message parsed from a frame with trailing slack re-encodes
/// as a self-consistent (shorter) frame rather than a corrupt one.
///
/// # Errors
///
/// As [`encode_message`].
pub fn encode_message_into(msg: &Message, w: &mut Writer) -> Result<()> {
    let start = w.len();
    msg.header().encode(w);
    encode_body(w, msg.version(), msg.body())?;
    let total = w.len() - start;
    if total > usize::from(u16::MAX) {
        return Err(ProtocolError::Incomplete("encoded message exceeds the 16-bit length field"));
    }
    w.patch_u16_at(start + 2, total as u16);
    Ok(())
}

/// Encode just the body of a message; used by sealing to measure and
/// validate.
#[allow(clippy::too_many_lines)]
pub(crate) fn encode_body(w: &mut Writer, pv: ProtocolVersion, body: &Body) -> Result<()> {
    match body {
        Body::Hello(h) => encode_element_list(w, &h.elements),
        Body::Error(e) => encode_error_body(w, pv, e)?,
        Body::EchoRequest(e) | Body::EchoReply(e) => w.put_slice(&e.data),
        Body::Experimenter(e) => {
            w.put_u32(e.experimenter);
            if pv > ProtocolVersion::V10 {
                w.put_u32(e.exp_type.ok_or(ProtocolError::Incomplete(
                    "experimenter message needs exp_type from 1.1 on",
                ))?);
            }
            w.put_slice(&e.data);
        }
        Body::FeaturesRequest
        | Body::GetConfigRequest
        | Body::BarrierRequest
        | Body::BarrierReply
        | Body::GetAsyncRequest => {}
        Body::FeaturesReply(f) => {
            w.put_u64(f.datapath_id.0);
            w.put_u32(f.num_buffers);
            w.put_u8(f.num_tables);
            if pv >= ProtocolVersion::V13 {
                w.put_u8(f.aux_id.unwrap_or(0));
                w.put_zeros(2);
            } else {
                w.put_zeros(3);
            }
            w.put_u32(f.capabilities.encode_bitmap(pv)?);
            if pv == ProtocolVersion::V10 {
                w.put_u32(f.supported_actions.unwrap_or_default().encode_bitmap(pv)?);
            } else {
                w.put_zeros(4);
            }
            if pv <= ProtocolVersion::V12 {
                for p in &f.ports {
                    encode_port(w, p, pv)?;
                }
            } else if !f.ports.is_empty() {
                return Err(ProtocolError::VersionMismatch {
                    version: pv,
                    item: "port list in features reply (1.3 moved it to port-desc)".to_string(),
                });
            }
        }
        Body::GetConfigReply(c) | Body::SetConfig(c) => {
            w.put_u16(c.flags.encode_bitmap(pv)? as u16);
            w.put_u16(c.miss_send_len);
        }
        Body::PacketIn(p) => encode_packet_in(w, pv, p)?,
        Body::FlowRemoved(f) => encode_flow_removed(w, pv, f)?,
        Body::PortStatus(p) => {
            w.put_u8(p.reason.wire_code(pv)? as u8);
            w.put_zeros(7);
            encode_port(w, &p.desc, pv)?;
        }
        Body::PacketOut(p) => {
            w.put_u32(p.buffer_id.0);
            if pv == ProtocolVersion::V10 {
                w.put_u16(p.in_port.to_v10()?);
            } else {
                w.put_u32(p.in_port.0);
            }
            let mut actions = Writer::new();
            encode_action_list(&mut actions, &p.actions, pv)?;
            w.put_u16(actions.len() as u16);
            if pv > ProtocolVersion::V10 {
                w.put_zeros(6);
            }
            w.put_slice(&actions.into_vec());
            w.put_slice(&p.data);
        }
        Body::FlowMod(f) => encode_flow_mod(w, pv, f)?,
        Body::GroupMod(g) => {
            w.put_u16(g.command.wire_code(pv)?);
            w.put_u8(g.group_type.wire_code(pv)? as u8);
            w.put_zeros(1);
            w.put_u32(g.group_id.0);
            encode_bucket_list(w, &g.buckets, pv)?;
        }
        Body::PortMod(p) => {
            if pv == ProtocolVersion::V10 {
                w.put_u16(p.port_no.to_v10()?);
                w.put_mac(p.hw_addr);
            } else {
                w.put_u32(p.port_no.0);
                w.put_zeros(4);
                w.put_mac(p.hw_addr);
                w.put_zeros(2);
            }
            w.put_u32(p.config.encode_bitmap(pv)?);
            w.put_u32(p.mask.encode_bitmap(pv)?);
            w.put_u32(p.advertise.encode_bitmap(pv)?);
            w.put_zeros(4);
        }
        Body::TableMod(t) => {
            if pv < ProtocolVersion::V11 {
                return Err(ProtocolError::VersionMismatch {
                    version: pv,
                    item: "table-mod message".to_string(),
                });
            }
            w.put_u8(t.table_id.0);
            w.put_zeros(3);
            w.put_u32(t.config.encode_bitmap(pv)?);
        }
        Body::MultipartRequest(m) => {
            w.put_u16(m.body.mp_type().wire_code(pv)?);
            w.put_u16(m.flags.encode_bitmap(pv)? as u16);
            if pv == ProtocolVersion::V13 {
                w.put_zeros(4);
            }
            encode_request_body(w, &m.body, pv)?;
        }
        Body::MultipartReply(m) => {
            w.put_u16(m.body.mp_type().wire_code(pv)?);
            w.put_u16(m.flags.encode_bitmap(pv)? as u16);
            if pv == ProtocolVersion::V13 {
                w.put_zeros(4);
            }
            encode_reply_body(w, &m.body, pv)?;
        }
        Body::QueueGetConfigRequest(q) => {
            if pv == ProtocolVersion::V10 {
                w.put_u16(q.port.to_v10()?);
                w.put_zeros(2);
            } else {
                w.put_u32(q.port.0);
                w.put_zeros(4);
            }
        }
        Body::QueueGetConfigReply(q) => {
            if pv == ProtocolVersion::V10 {
                w.put_u16(q.port.to_v10()?);
                w.put_zeros(6);
            } else {
                w.put_u32(q.port.0);
                w.put_zeros(4);
            }
            encode_queue_list(w, &q.queues, pv)?;
        }
        Body::RoleRequest(role) | Body::RoleReply(role) => {
            w.put_u32(role.role.wire_code(pv)?);
            w.put_zeros(4);
            w.put_u64(role.generation_id);
        }
        Body::GetAsyncReply(a) | Body::SetAsync(a) => {
            if pv < ProtocolVersion::V13 {
                return Err(ProtocolError::VersionMismatch {
                    version: pv,
                    item: "async-config message".to_string(),
                });
            }
            for m in [
                a.packet_in_mask[0],
                a.packet_in_mask[1],
                a.port_status_mask[0],
                a.port_status_mask[1],
                a.flow_removed_mask[0],
                a.flow_removed_mask[1],
            ] {
                w.put_u32(m);
            }
        }
        Body::MeterMod(m) => {
            w.put_u16(m.command.wire_code(pv)?);
            w.put_u16(m.flags.encode_bitmap(pv)? as u16);
            w.put_u32(m.meter_id.0);
            encode_meter_band_list(w, &m.bands, pv)?;
        }
    }
    Ok(())
}

/// Measure (and validate) a body's encoded length for `pv`.
///
/// # Errors
///
/// Any error the body encoder raises; the spec for those lives on
/// [`Message::seal`](crate::msg::Message::seal).
pub(crate) fn body_len(pv: ProtocolVersion, body: &Body) -> Result<usize> {
    let mut scratch = Writer::new();
    encode_body(&mut scratch, pv, body)?;
    let total = HEADER_LEN + scratch.len();
    if total > usize::from(u16::MAX) {
        return Err(ProtocolError::Incomplete("encoded message exceeds the 16-bit length field"));
    }
    Ok(scratch.len())
}

fn encode_error_body(w: &mut Writer, pv: ProtocolVersion, e: &ErrorMsg) -> Result<()> {
    match e {
        ErrorMsg::Standard { err_type, code, data } => {
            if *err_type == ErrorType::Experimenter {
                return Err(ProtocolError::Incomplete(
                    "experimenter errors use the experimenter variant",
                ));
            }
            w.put_u16(err_type.wire_code(pv)?);
            w.put_u16(*code);
            w.put_slice(data);
        }
        ErrorMsg::Experimenter { exp_type, experimenter, data } => {
            w.put_u16(ErrorType::Experimenter.wire_code(pv)?);
            w.put_u16(*exp_type);
            w.put_u32(*experimenter);
            w.put_slice(data);
        }
    }
    Ok(())
}

fn encode_packet_in(w: &mut Writer, pv: ProtocolVersion, p: &PacketIn) -> Result<()> {
    w.put_u32(p.buffer_id.0);
    w.put_u16(p.total_len);
    match pv {
        ProtocolVersion::V10 => {
            let in_port =
                p.in_port.ok_or(ProtocolError::Incomplete("1.0 packet-in needs in_port"))?;
            w.put_u16(in_port.to_v10()?);
            w.put_u8(p.reason.wire_code(pv)? as u8);
            w.put_zeros(1);
            w.put_slice(&p.data);
            Ok(())
        }
        ProtocolVersion::V12 | ProtocolVersion::V13 => {
            w.put_u8(p.reason.wire_code(pv)? as u8);
            w.put_u8(
                p.table_id.ok_or(ProtocolError::Incomplete("1.2+ packet-in needs table_id"))?.0,
            );
            if pv >= ProtocolVersion::V13 {
                w.put_u64(
                    p.cookie.ok_or(ProtocolError::Incomplete("1.3 packet-in needs cookie"))?,
                );
            }
            let m = p
                .match_fields
                .as_ref()
                .ok_or(ProtocolError::Incomplete("1.2+ packet-in needs a match"))?;
            encode_match(w, m, pv)?;
            w.put_zeros(2);
            w.put_slice(&p.data);
            Ok(())
        }
        _ => Err(ProtocolError::VersionMismatch {
            version: pv,
            item: "packet-in body".to_string(),
        }),
    }
}

fn encode_flow_removed(w: &mut Writer, pv: ProtocolVersion, f: &FlowRemoved) -> Result<()> {
    match pv {
        ProtocolVersion::V10 => {
            encode_match(w, &f.match_fields, pv)?;
            w.put_u64(f.cookie);
            w.put_u16(f.priority);
            w.put_u8(f.reason.wire_code(pv)? as u8);
            w.put_zeros(1);
            w.put_u32(f.duration_sec);
            w.put_u32(f.duration_nsec);
            w.put_u16(f.idle_timeout);
            w.put_zeros(2);
            w.put_u64(f.packet_count);
            w.put_u64(f.byte_count);
            Ok(())
        }
        ProtocolVersion::V13 => {
            w.put_u64(f.cookie);
            w.put_u16(f.priority);
            w.put_u8(f.reason.wire_code(pv)? as u8);
            w.put_u8(
                f.table_id.ok_or(ProtocolError::Incomplete("1.3 flow-removed needs table_id"))?.0,
            );
            w.put_u32(f.duration_sec);
            w.put_u32(f.duration_nsec);
            w.put_u16(f.idle_timeout);
            w.put_u16(
                f.hard_timeout
                    .ok_or(ProtocolError::Incomplete("1.3 flow-removed needs hard_timeout"))?,
            );
            w.put_u64(f.packet_count);
            w.put_u64(f.byte_count);
            encode_match(w, &f.match_fields, pv)
        }
        _ => Err(ProtocolError::VersionMismatch {
            version: pv,
            item: "flow-removed body".to_string(),
        }),
    }
}

fn encode_flow_mod(w: &mut Writer, pv: ProtocolVersion, f: &FlowMod) -> Result<()> {
    if pv == ProtocolVersion::V10 {
        if !f.instructions.is_empty() {
            return Err(ProtocolError::VersionMismatch {
                version: pv,
                item: "instructions in a 1.0 flow-mod".to_string(),
            });
        }
        encode_match(w, &f.match_fields, pv)?;
        w.put_u64(f.cookie);
        w.put_u16(f.command.wire_code(pv)?);
        w.put_u16(f.idle_timeout);
        w.put_u16(f.hard_timeout);
        w.put_u16(f.priority);
        w.put_u32(f.buffer_id.0);
        w.put_u16(f.out_port.to_v10()?);
        w.put_u16(f.flags.encode_bitmap(pv)? as u16);
        encode_action_list(w, &f.actions, pv)
    } else {
        if !f.actions.is_empty() {
            return Err(ProtocolError::VersionMismatch {
                version: pv,
                item: "bare action list in a 1.1+ flow-mod (use instructions)".to_string(),
            });
        }
        w.put_u64(f.cookie);
        w.put_u64(f.cookie_mask.unwrap_or(0));
        w.put_u8(f.table_id.unwrap_or(crate::types::TableId(0)).0);
        w.put_u8(f.command.wire_code(pv)? as u8);
        w.put_u16(f.idle_timeout);
        w.put_u16(f.hard_timeout);
        w.put_u16(f.priority);
        w.put_u32(f.buffer_id.0);
        w.put_u32(f.out_port.0);
        w.put_u32(f.out_group.unwrap_or(GroupId::ANY).0);
        w.put_u16(f.flags.encode_bitmap(pv)? as u16);
        w.put_zeros(2);
        encode_match(w, &f.match_fields, pv)?;
        encode_instruction_list(w, &f.instructions, pv)
    }
}
