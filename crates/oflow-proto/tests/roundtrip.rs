//! Whole-message round trips: `parse(encode(m)) == m` field-for-field and
//! `encode(parse(bytes)) == bytes` byte-for-byte, per (version, kind).

use std::net::Ipv4Addr;

use oflow_proto::{
    actions::Action,
    buffer::Reader,
    encode_message,
    flags::{Capability, ConfigFlag, FlowModFlag, MeterFlag, PortConfig, PortFeature, PortState},
    group::Bucket,
    hello_elem::HelloElement,
    instructions::Instruction,
    match_field::{Match, MatchField},
    meter::{MeterBand, MeterBandKind},
    msg::{
        factory, multipart::*, AsyncConfig, Body, ControllerRole, Draft, Echo, ErrorMsg,
        ErrorType, Experimenter, FeaturesReply, FlowMod, FlowModCommand, FlowRemoved,
        FlowRemovedReason, GroupMod, GroupModCommand, GroupType, Hello, Message, MeterMod,
        MeterModCommand, PacketIn, PacketInReason, PacketOut, PortMod, PortReason, PortStatus,
        QueueGetConfigReply, QueueGetConfigRequest, Role, SwitchConfig, TableMod,
    },
    parse_message,
    port::{Port, StpState},
    queue::{PacketQueue, QueueProperty},
    types::*,
    version::{ProtocolVersion, VersionSet},
    Header,
};

fn round_trip(msg: &Message) {
    let bytes = encode_message(msg).expect("sealed message must encode");
    assert_eq!(bytes.len(), usize::from(msg.length()), "header length must match encoding");
    let mut r = Reader::new(&bytes);
    let parsed = parse_message(&mut r)
        .expect("round-trip parse failed")
        .expect("full frame must not underrun");
    assert_eq!(&parsed, msg);
    assert_eq!(r.position(), bytes.len(), "cursor must land on the frame boundary");

    // and the other direction: re-encoding the parse is byte-identical
    let re = encode_message(&parsed).unwrap();
    assert_eq!(re, bytes);
}

fn sample_port(pv: ProtocolVersion) -> Port {
    let v10 = pv == ProtocolVersion::V10;
    Port {
        port_no: PortNumber(1),
        hw_addr: MacAddress([0x02, 0, 0, 0, 0, 0x01]),
        name: "eth1".into(),
        config: PortConfig::empty(),
        state: PortState::LINK_DOWN,
        stp_state: v10.then_some(StpState::Listen),
        curr: PortFeature::RATE_1GB_FD | PortFeature::COPPER,
        advertised: PortFeature::empty(),
        supported: PortFeature::RATE_1GB_FD,
        peer: PortFeature::empty(),
        curr_speed: (!v10).then_some(1_000_000),
        max_speed: (!v10).then_some(1_000_000),
    }
}

#[test]
fn hello_both_versions() {
    for pv in [ProtocolVersion::V10, ProtocolVersion::V13] {
        round_trip(
            &Message::seal(
                pv,
                Body::Hello(Hello {
                    elements: vec![HelloElement::VersionBitmap(VersionSet::of(&[
                        ProtocolVersion::V10,
                        ProtocolVersion::V13,
                    ]))],
                }),
            )
            .unwrap(),
        );
    }
}

#[test]
fn error_messages() {
    round_trip(
        &Message::seal(
            ProtocolVersion::V13,
            Body::Error(ErrorMsg::Standard {
                err_type: ErrorType::BadRequest,
                code: 5,
                data: vec![0xde, 0xad, 0xbe, 0xef],
            }),
        )
        .unwrap(),
    );
    round_trip(
        &Message::seal(
            ProtocolVersion::V13,
            Body::Error(ErrorMsg::Experimenter {
                exp_type: 17,
                experimenter: 0x00cafe00,
                data: vec![1, 2, 3],
            }),
        )
        .unwrap(),
    );
    // HELLO_FAILED carries readable text
    let hf = Message::seal(
        ProtocolVersion::V10,
        Body::Error(ErrorMsg::Standard {
            err_type: ErrorType::HelloFailed,
            code: 0,
            data: b"versions incompatible\0".to_vec(),
        }),
    )
    .unwrap();
    round_trip(&hf);
    match hf.body() {
        Body::Error(e) => assert_eq!(e.error_message().unwrap(), "versions incompatible"),
        _ => unreachable!(),
    }
}

#[test]
fn echo_and_barrier_and_empty_bodies() {
    for pv in [ProtocolVersion::V10, ProtocolVersion::V13] {
        round_trip(&Message::seal(pv, Body::EchoRequest(Echo { data: vec![1, 2, 3] })).unwrap());
        round_trip(&Message::seal(pv, Body::EchoReply(Echo::default())).unwrap());
        round_trip(&Message::seal(pv, Body::FeaturesRequest).unwrap());
        round_trip(&Message::seal(pv, Body::GetConfigRequest).unwrap());
        round_trip(&Message::seal(pv, Body::BarrierRequest).unwrap());
        round_trip(&Message::seal(pv, Body::BarrierReply).unwrap());
    }
    round_trip(&Message::seal(ProtocolVersion::V13, Body::GetAsyncRequest).unwrap());
}

#[test]
fn experimenter_messages() {
    round_trip(
        &Message::seal(
            ProtocolVersion::V10,
            Body::Experimenter(Experimenter {
                experimenter: 0x2320,
                exp_type: None,
                data: vec![9, 9, 9],
            }),
        )
        .unwrap(),
    );
    round_trip(
        &Message::seal(
            ProtocolVersion::V13,
            Body::Experimenter(Experimenter {
                experimenter: 0x2320,
                exp_type: Some(12),
                data: vec![],
            }),
        )
        .unwrap(),
    );
}

#[test]
fn features_reply_layouts() {
    round_trip(
        &Message::seal(
            ProtocolVersion::V10,
            Body::FeaturesReply(FeaturesReply {
                datapath_id: DataPathId(0x0000_0000_0000_00fe),
                num_buffers: 256,
                num_tables: 2,
                aux_id: None,
                capabilities: Capability::FLOW_STATS | Capability::STP,
                supported_actions: Some(
                    oflow_proto::flags::SupportedAction::OUTPUT
                        | oflow_proto::flags::SupportedAction::ENQUEUE,
                ),
                ports: vec![sample_port(ProtocolVersion::V10)],
            }),
        )
        .unwrap(),
    );
    round_trip(
        &Message::seal(
            ProtocolVersion::V13,
            Body::FeaturesReply(FeaturesReply {
                datapath_id: DataPathId(1),
                num_buffers: 0,
                num_tables: 254,
                aux_id: Some(0),
                capabilities: Capability::FLOW_STATS | Capability::GROUP_STATS,
                supported_actions: None,
                ports: vec![],
            }),
        )
        .unwrap(),
    );
}

#[test]
fn switch_config() {
    for pv in [ProtocolVersion::V10, ProtocolVersion::V13] {
        round_trip(
            &Message::seal(
                pv,
                Body::SetConfig(SwitchConfig {
                    flags: ConfigFlag::FRAG_DROP,
                    miss_send_len: 128,
                }),
            )
            .unwrap(),
        );
        round_trip(&Message::seal(pv, Body::GetConfigReply(SwitchConfig::default())).unwrap());
    }
}

#[test]
fn packet_in_layouts() {
    round_trip(
        &Message::seal(
            ProtocolVersion::V10,
            Body::PacketIn(PacketIn {
                buffer_id: BufferId(77),
                total_len: 60,
                in_port: Some(PortNumber(2)),
                in_phy_port: None,
                reason: PacketInReason::NoMatch,
                table_id: None,
                cookie: None,
                match_fields: None,
                data: vec![0xAA; 16],
            }),
        )
        .unwrap(),
    );
    // 1.3 derives the ports from the match
    round_trip(
        &Message::seal(
            ProtocolVersion::V13,
            Body::PacketIn(PacketIn {
                buffer_id: BufferId::NO_BUFFER,
                total_len: 42,
                in_port: Some(PortNumber(7)),
                in_phy_port: Some(PortNumber(7)),
                reason: PacketInReason::Action,
                table_id: Some(TableId(1)),
                cookie: Some(0xfeed_f00d),
                match_fields: Some(Match {
                    fields: vec![MatchField::InPort(PortNumber(7))],
                }),
                data: vec![1, 2, 3, 4],
            }),
        )
        .unwrap(),
    );
}

#[test]
fn packet_out_layouts() {
    for pv in [ProtocolVersion::V10, ProtocolVersion::V13] {
        round_trip(
            &Message::seal(
                pv,
                Body::PacketOut(PacketOut {
                    buffer_id: BufferId::NO_BUFFER,
                    in_port: PortNumber::CONTROLLER,
                    actions: vec![Action::Output { port: PortNumber::FLOOD, max_len: 0 }],
                    data: vec![0x55; 14],
                }),
            )
            .unwrap(),
        );
    }
}

#[test]
fn flow_mod_layouts() {
    round_trip(
        &Message::seal(
            ProtocolVersion::V10,
            Body::FlowMod(FlowMod {
                cookie: 42,
                cookie_mask: None,
                table_id: None,
                command: FlowModCommand::Add,
                idle_timeout: 60,
                hard_timeout: 0,
                priority: 32768,
                buffer_id: BufferId::NO_BUFFER,
                out_port: PortNumber::ANY,
                out_group: None,
                flags: FlowModFlag::SEND_FLOW_REM,
                match_fields: Match {
                    fields: vec![
                        MatchField::InPort(PortNumber(1)),
                        MatchField::EthType(0x0800),
                        MatchField::Ipv4Dst {
                            addr: Ipv4Addr::new(10, 0, 0, 1),
                            mask: None,
                        },
                    ],
                },
                actions: vec![Action::Output { port: PortNumber(2), max_len: 0 }],
                instructions: vec![],
            }),
        )
        .unwrap(),
    );
    round_trip(
        &Message::seal(
            ProtocolVersion::V13,
            Body::FlowMod(FlowMod {
                cookie: 42,
                cookie_mask: Some(0xffff),
                table_id: Some(TableId(3)),
                command: FlowModCommand::ModifyStrict,
                idle_timeout: 0,
                hard_timeout: 300,
                priority: 1,
                buffer_id: BufferId(9),
                out_port: PortNumber::ANY,
                out_group: Some(GroupId::ANY),
                flags: FlowModFlag::SEND_FLOW_REM | FlowModFlag::RESET_COUNTS,
                match_fields: Match {
                    fields: vec![MatchField::Metadata { value: 7, mask: Some(0xff) }],
                },
                actions: vec![],
                instructions: vec![
                    Instruction::ApplyActions(vec![Action::Group(GroupId(4))]),
                    Instruction::GotoTable(TableId(4)),
                ],
            }),
        )
        .unwrap(),
    );
}

#[test]
fn flow_removed_layouts() {
    round_trip(
        &Message::seal(
            ProtocolVersion::V10,
            Body::FlowRemoved(FlowRemoved {
                cookie: 1,
                priority: 100,
                reason: FlowRemovedReason::IdleTimeout,
                table_id: None,
                duration_sec: 30,
                duration_nsec: 500,
                idle_timeout: 10,
                hard_timeout: None,
                packet_count: 12,
                byte_count: 720,
                match_fields: Match::any(),
            }),
        )
        .unwrap(),
    );
    round_trip(
        &Message::seal(
            ProtocolVersion::V13,
            Body::FlowRemoved(FlowRemoved {
                cookie: 1,
                priority: 100,
                reason: FlowRemovedReason::HardTimeout,
                table_id: Some(TableId(0)),
                duration_sec: 30,
                duration_nsec: 500,
                idle_timeout: 10,
                hard_timeout: Some(30),
                packet_count: 12,
                byte_count: 720,
                match_fields: Match {
                    fields: vec![MatchField::EthSrc {
                        addr: MacAddress([2, 0, 0, 0, 0, 9]),
                        mask: None,
                    }],
                },
            }),
        )
        .unwrap(),
    );
}

#[test]
fn port_messages() {
    for pv in [ProtocolVersion::V10, ProtocolVersion::V13] {
        round_trip(
            &Message::seal(
                pv,
                Body::PortStatus(PortStatus { reason: PortReason::Modify, desc: sample_port(pv) }),
            )
            .unwrap(),
        );
        round_trip(
            &Message::seal(
                pv,
                Body::PortMod(PortMod {
                    port_no: PortNumber(3),
                    hw_addr: MacAddress([2, 0, 0, 0, 0, 3]),
                    config: PortConfig::PORT_DOWN,
                    mask: PortConfig::PORT_DOWN,
                    advertise: PortFeature::empty(),
                }),
            )
            .unwrap(),
        );
    }
}

#[test]
fn group_and_meter_and_table_mods() {
    round_trip(
        &Message::seal(
            ProtocolVersion::V13,
            Body::GroupMod(GroupMod {
                command: GroupModCommand::Add,
                group_type: GroupType::Select,
                group_id: GroupId(10),
                buckets: vec![Bucket {
                    weight: 1,
                    watch_port: PortNumber::ANY,
                    watch_group: GroupId::ANY,
                    actions: vec![Action::Output { port: PortNumber(1), max_len: 0 }],
                }],
            }),
        )
        .unwrap(),
    );
    round_trip(
        &Message::seal(
            ProtocolVersion::V13,
            Body::MeterMod(MeterMod {
                command: MeterModCommand::Add,
                flags: MeterFlag::KBPS | MeterFlag::BURST,
                meter_id: MeterId(5),
                bands: vec![MeterBand { rate: 10_000, burst_size: 512, kind: MeterBandKind::Drop }],
            }),
        )
        .unwrap(),
    );
    round_trip(
        &Message::seal(
            ProtocolVersion::V13,
            Body::TableMod(TableMod {
                table_id: TableId::ALL,
                config: oflow_proto::flags::TableConfig::empty(),
            }),
        )
        .unwrap(),
    );
}

#[test]
fn role_and_async_config() {
    round_trip(
        &Message::seal(
            ProtocolVersion::V13,
            Body::RoleRequest(Role { role: ControllerRole::Master, generation_id: 9 }),
        )
        .unwrap(),
    );
    round_trip(
        &Message::seal(
            ProtocolVersion::V13,
            Body::SetAsync(AsyncConfig {
                packet_in_mask: [0b11, 0b01],
                port_status_mask: [0b111, 0b111],
                flow_removed_mask: [0b1111, 0b0000],
            }),
        )
        .unwrap(),
    );
}

#[test]
fn queue_get_config() {
    for pv in [ProtocolVersion::V10, ProtocolVersion::V13] {
        round_trip(
            &Message::seal(
                pv,
                Body::QueueGetConfigRequest(QueueGetConfigRequest { port: PortNumber(4) }),
            )
            .unwrap(),
        );
        round_trip(
            &Message::seal(
                pv,
                Body::QueueGetConfigReply(QueueGetConfigReply {
                    port: PortNumber(4),
                    queues: vec![PacketQueue {
                        queue_id: QueueId(1),
                        port: (pv >= ProtocolVersion::V12).then_some(PortNumber(4)),
                        properties: vec![QueueProperty::MinRate(300)],
                    }],
                }),
            )
            .unwrap(),
        );
    }
}

#[test]
fn multipart_messages() {
    round_trip(
        &Message::seal(
            ProtocolVersion::V13,
            Body::MultipartRequest(MultipartRequest {
                flags: oflow_proto::flags::MultipartRequestFlag::empty(),
                body: MultipartRequestBody::PortStats { port: PortNumber::ANY },
            }),
        )
        .unwrap(),
    );
    round_trip(
        &Message::seal(
            ProtocolVersion::V13,
            Body::MultipartReply(MultipartReply {
                flags: oflow_proto::flags::MultipartReplyFlag::REPLY_MORE,
                body: MultipartReplyBody::PortDesc(vec![sample_port(ProtocolVersion::V13)]),
                defect: None,
            }),
        )
        .unwrap(),
    );
    // 1.0 stats pair (12-byte multipart header, no pad)
    round_trip(
        &Message::seal(
            ProtocolVersion::V10,
            Body::MultipartRequest(MultipartRequest {
                flags: oflow_proto::flags::MultipartRequestFlag::empty(),
                body: MultipartRequestBody::Desc,
            }),
        )
        .unwrap(),
    );
    round_trip(
        &Message::seal(
            ProtocolVersion::V10,
            Body::MultipartReply(MultipartReply {
                flags: oflow_proto::flags::MultipartReplyFlag::empty(),
                body: MultipartReplyBody::Desc(DescStats {
                    mfr_desc: "Acme".into(),
                    hw_desc: "HW".into(),
                    sw_desc: "SW".into(),
                    serial_num: "1".into(),
                    dp_desc: "dp".into(),
                }),
                defect: None,
            }),
        )
        .unwrap(),
    );
}

#[test]
fn copies_preserve_bytes() {
    let msg = Message::seal(
        ProtocolVersion::V13,
        Body::EchoRequest(Echo { data: vec![1, 2, 3, 4, 5] }),
    )
    .unwrap();
    let exact = factory::exact_copy(&msg);
    assert_eq!(encode_message(&exact).unwrap(), encode_message(&msg).unwrap());

    let fresh = factory::copy(&msg);
    let a = encode_message(&msg).unwrap();
    let b = encode_message(&fresh).unwrap();
    // identical except the xid word
    assert_eq!(a[..4], b[..4]);
    assert_eq!(a[8..], b[8..]);
    assert_ne!(a[4..8], b[4..8]);
}

#[test]
fn pinned_xid_survives_round_trip() {
    let msg = Draft::new(ProtocolVersion::V13, Body::BarrierRequest).with_xid(0x1234_5678).seal().unwrap();
    let bytes = encode_message(&msg).unwrap();
    let mut r = Reader::new(&bytes);
    let parsed = parse_message(&mut r).unwrap().unwrap();
    assert_eq!(parsed.xid(), 0x1234_5678);
    assert_eq!(parsed.header(), &Header::new(ProtocolVersion::V13, oflow_proto::MessageType::BarrierRequest, 8, 0x1234_5678).unwrap());
}
