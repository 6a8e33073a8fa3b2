//! # oflow-proto: OpenFlow wire codec
//!
//! Bit-exact encoding and decoding of the OpenFlow switch-control protocol
//! across revisions 1.0 through 1.3. This crate is the codec only: it
//! turns bytes into typed messages and back, and deliberately performs no
//! I/O, connection handling, or control-plane logic.
//!
//! ## Layout
//!
//! - [`buffer`]: the position-tracked reader/writer a whole parse (or a
//!   whole stream) shares.
//! - [`flags`]: per-revision flag/bit translation tables over the crate's
//!   internal bitmap engine.
//! - [`tlv`] and the structure modules ([`match_field`], [`actions`],
//!   [`instructions`], [`port`], [`queue`], [`group`], [`meter`],
//!   [`hello_elem`], [`table_features`]): the nested, length-delimited
//!   structures message bodies are made of.
//! - [`msg`]: bodies, the frame header, the parser/dispatcher, the
//!   encoder, and the factory (xids, copies, patches).
//!
//! ## Parsing model
//!
//! Hand [`msg::parse_message`] a [`buffer::Reader`] over your receive
//! buffer. `Ok(None)` means "wait for more bytes". A decode error still
//! advances the cursor to the failed frame's declared boundary, so the
//! next message in the same buffer parses normally - one malformed frame
//! never takes down the stream.
//!
//! ## Policy
//!
//! Two process-wide switches, both overridable per call through
//! [`version::CodecConfig`]: the supported-version set (default
//! {1.0, 1.3}) and strict/lenient treatment of bitmap bits a revision does
//! not define (default lenient).
//!
//! ## Messages are drafts, then sealed
//!
//! Bodies are plain structs with public fields; sealing
//! ([`msg::Message::seal`]) consumes the body, validates it against the
//! target version, stamps a transaction id, and yields an immutable
//! [`msg::Message`]. Mutation after sealing is a compile error, not a
//! runtime check.

pub mod actions;
pub(crate) mod bitmap;
pub mod buffer;
pub mod errors;
pub mod flags;
pub mod group;
pub mod hello_elem;
pub mod instructions;
pub mod match_field;
pub mod meter;
pub mod msg;
pub mod port;
pub mod queue;
pub mod table_features;
pub mod tlv;
pub mod types;
pub mod version;

pub use errors::{ProtocolError, Result};
pub use msg::{
    encode_message, parse_message, parse_message_expecting, parse_message_with, Body, Draft,
    Header, Message, MessageType,
};
pub use version::{
    is_strict_parsing, set_strict_parsing, set_supported_versions, supported_versions,
    CodecConfig, ProtocolVersion, VersionSet,
};
