//! The process-wide parsing policy: strict/lenient divergence and the
//! supported-version set. Everything that flips a global here restores the
//! prior value before returning, and lives in one test to keep the flips
//! off other tests' threads.

use oflow_proto::{
    buffer::Reader,
    encode_message,
    flags::ConfigFlag,
    is_strict_parsing,
    msg::{Body, Draft, Message, SwitchConfig},
    parse_message, parse_message_with, set_strict_parsing, set_supported_versions,
    supported_versions,
    version::{CodecConfig, ProtocolVersion, VersionSet, ALL_VERSIONS},
    ProtocolError,
};

fn set_config_msg() -> Vec<u8> {
    let msg = Draft::new(
        ProtocolVersion::V13,
        Body::SetConfig(SwitchConfig { flags: ConfigFlag::FRAG_DROP, miss_send_len: 0x80 }),
    )
    .with_xid(5)
    .seal()
    .unwrap();
    encode_message(&msg).unwrap()
}

#[test]
fn global_policy_switches() {
    let prior_strict = is_strict_parsing();
    let prior_versions = supported_versions();

    // --- strict/lenient divergence -------------------------------------
    // a switch-config whose flags word has one recognized bit (FRAG_DROP)
    // and one bit no 1.3 revision defines
    let mut bytes = set_config_msg();
    bytes[9] |= 0x80; // flags field low byte: set undefined bit 7

    set_strict_parsing(false);
    let mut r = Reader::new(&bytes);
    let msg = parse_message(&mut r).unwrap().unwrap();
    match msg.body() {
        Body::SetConfig(c) => assert_eq!(c.flags, ConfigFlag::FRAG_DROP),
        other => panic!("unexpected body {other:?}"),
    }

    set_strict_parsing(true);
    let mut r = Reader::new(&bytes);
    let err = parse_message(&mut r).unwrap_err();
    let text = err.to_string();
    assert!(err.is_version_error() || err.is_decode_error());
    assert!(text.contains("0x00000081"), "offending bitmap must be named: {text}");
    assert!(text.contains("0x00000080"), "unmapped bits must be named: {text}");
    // strict failures still resynchronize
    assert_eq!(r.position(), bytes.len());

    // an explicit config overrides the global without touching it
    let mut r = Reader::new(&bytes);
    let lenient_cfg =
        CodecConfig { strict: false, supported: VersionSet::of(&ALL_VERSIONS) };
    assert!(parse_message_with(&mut r, lenient_cfg).unwrap().is_some());
    assert!(is_strict_parsing(), "explicit override must not flip the global");

    set_strict_parsing(prior_strict);

    // --- supported-version set ------------------------------------------
    let v11_barrier = [0x02u8, 20, 0x00, 0x08, 0x00, 0x00, 0x00, 0x09];
    let mut r = Reader::new(&v11_barrier);
    assert_eq!(
        parse_message(&mut r).unwrap_err(),
        ProtocolError::VersionNotSupported(ProtocolVersion::V11)
    );

    set_supported_versions(VersionSet::of(&ALL_VERSIONS));
    let mut r = Reader::new(&v11_barrier);
    assert!(parse_message(&mut r).unwrap().is_some());

    // sealing honors the set as well
    set_supported_versions(VersionSet::of(&[ProtocolVersion::V13]));
    assert_eq!(
        Message::seal(ProtocolVersion::V10, Body::BarrierRequest).unwrap_err(),
        ProtocolError::VersionNotSupported(ProtocolVersion::V10)
    );

    set_supported_versions(prior_versions);
    assert_eq!(supported_versions(), prior_versions);
}
