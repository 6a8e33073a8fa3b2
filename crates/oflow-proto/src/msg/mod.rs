//! Messages: the sealed frame type and its mutable draft phase.
//!
//! A message exists in exactly one of two phases. The mutable phase is a
//! [`Draft`]: a protocol version, an optional pinned xid, and a [`Body`]
//! whose fields are freely settable. Sealing consumes the draft by value,
//! validates the body against the version (running the real body encoder
//! once), computes the header, and stamps the xid - producing an immutable
//! [`Message`] that is safe to share and cannot fail to encode. There is no
//! way back except an explicit draft-producing copy, so "mutate after
//! seal" is a compile error rather than a runtime one. The single
//! exception is the narrow patch API on [`factory`], which can rewrite one
//! fixed-width field in place.

mod bodies;
mod codes;
mod encode;
pub mod factory;
mod header;
pub mod multipart;
mod parser;

pub use bodies::{
    AsyncConfig, Body, Echo, ErrorMsg, Experimenter, FeaturesReply, FlowMod, FlowRemoved,
    GroupMod, Hello, MeterMod, PacketIn, PacketOut, PortMod, PortStatus, QueueGetConfigReply,
    QueueGetConfigRequest, Role, SwitchConfig, TableMod,
};
pub use codes::{
    ControllerRole, ErrorType, FlowModCommand, FlowRemovedReason, GroupModCommand, GroupType,
    MeterModCommand, MultipartType, PacketInReason, PortReason,
};
pub use encode::{encode_message, encode_message_into};
pub use header::{Header, MessageType, HEADER_LEN};
pub use multipart::{
    MultipartReply, MultipartReplyBody, MultipartRequest, MultipartRequestBody,
};
pub use parser::{parse_message, parse_message_expecting, parse_message_with};

use crate::{
    errors::{ProtocolError, Result},
    version::{check_version_supported, ProtocolVersion},
};

/// The mutable phase of a message.
#[derive(Debug, Clone)]
pub struct Draft {
    /// Target protocol version; field validity is judged against this
    pub version: ProtocolVersion,
    /// Pinned transaction id; `None` takes the next free xid at seal time
    pub xid: Option<u32>,
    /// The body under construction
    pub body: Body,
}

impl Draft {
    /// Start a draft for `version`.
    #[must_use]
    pub fn new(version: ProtocolVersion, body: Body) -> Self {
        Self { version, xid: None, body }
    }

    /// Pin the xid instead of taking a fresh one at seal time.
    #[must_use]
    pub fn with_xid(mut self, xid: u32) -> Self {
        self.xid = Some(xid);
        self
    }

    /// Seal the draft into an immutable message.
    ///
    /// # Errors
    ///
    /// - version-not-supported when the deployment does not create
    ///   messages for this version (HELLO and ERROR are exempt);
    /// - version-mismatch when a populated field has no encoding in the
    ///   target version;
    /// - incomplete when a field the version requires is absent;
    /// - a bad-xid error for a pinned xid of zero.
    pub fn seal(self) -> Result<Message> {
        let msg_type = self.body.message_type();
        if !matches!(msg_type, MessageType::Hello | MessageType::Error) {
            check_version_supported(self.version)?;
        }
        if self.xid == Some(0) {
            return Err(ProtocolError::BadXid("xid 0 is reserved for unassigned".to_string()));
        }
        let body_len = encode::body_len(self.version, &self.body)?;
        let xid = self.xid.unwrap_or_else(factory::next_xid);
        let header =
            Header::new(self.version, msg_type, (HEADER_LEN + body_len) as u16, xid)?;
        Ok(Message { header, body: self.body })
    }
}

/// A sealed, immutable message: one complete wire frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    header: Header,
    body: Body,
}

impl Message {
    /// Seal a body for `version` with a freshly assigned xid.
    ///
    /// # Errors
    ///
    /// See [`Draft::seal`].
    pub fn seal(version: ProtocolVersion, body: Body) -> Result<Self> {
        Draft::new(version, body).seal()
    }

    /// Seal a body as a response to `request`: same version, same xid.
    ///
    /// # Errors
    ///
    /// See [`Draft::seal`].
    pub fn seal_response(request: &Message, body: Body) -> Result<Self> {
        Draft::new(request.version(), body).with_xid(request.xid()).seal()
    }

    pub(crate) fn from_parts(header: Header, body: Body) -> Self {
        Self { header, body }
    }

    /// The frame header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The protocol version.
    ///
    /// # Panics
    ///
    /// Never: sealed and parsed messages always carry a valid version byte.
    #[must_use]
    pub fn version(&self) -> ProtocolVersion {
        self.header.version().expect("sealed message carries a valid version")
    }

    /// The message type.
    ///
    /// # Panics
    ///
    /// Never: sealed and parsed messages always carry a valid type code.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.header.message_type().expect("sealed message carries a valid type")
    }

    /// Total encoded length (header included).
    #[must_use]
    pub fn length(&self) -> u16 {
        self.header.length()
    }

    /// The transaction id.
    #[must_use]
    pub fn xid(&self) -> u32 {
        self.header.xid()
    }

    /// The body.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// A draft copy that will take a fresh xid when sealed.
    #[must_use]
    pub fn to_draft(&self) -> Draft {
        Draft::new(self.version(), self.body.clone())
    }

    /// A draft copy pinned to this message's xid.
    #[must_use]
    pub fn to_exact_draft(&self) -> Draft {
        Draft::new(self.version(), self.body.clone()).with_xid(self.xid())
    }

    pub(crate) fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub(crate) fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::ProtocolVersion;

    #[test]
    fn seal_assigns_header_and_xid() {
        let msg = Message::seal(ProtocolVersion::V13, Body::Hello(Hello::default())).unwrap();
        assert_eq!(msg.version(), ProtocolVersion::V13);
        assert_eq!(msg.message_type(), MessageType::Hello);
        assert_eq!(msg.length(), 8);
        assert_ne!(msg.xid(), 0);
    }

    #[test]
    fn seal_response_copies_version_and_xid() {
        let req = Message::seal(ProtocolVersion::V13, Body::EchoRequest(Echo::default())).unwrap();
        let reply = Message::seal_response(&req, Body::EchoReply(Echo::default())).unwrap();
        assert_eq!(reply.version(), req.version());
        assert_eq!(reply.xid(), req.xid());
    }

    #[test]
    fn zero_xid_rejected() {
        let err = Draft::new(ProtocolVersion::V13, Body::BarrierRequest)
            .with_xid(0)
            .seal()
            .unwrap_err();
        assert!(matches!(err, ProtocolError::BadXid(_)));
    }

    #[test]
    fn seal_respects_supported_versions() {
        // 1.1 is outside the default supported set
        let err =
            Message::seal(ProtocolVersion::V11, Body::BarrierRequest).unwrap_err();
        assert_eq!(err, ProtocolError::VersionNotSupported(ProtocolVersion::V11));
        // ...but HELLO is exempt, for negotiation
        assert!(Message::seal(ProtocolVersion::V11, Body::Hello(Hello::default())).is_ok());
    }

    #[test]
    fn seal_validates_body_against_version() {
        let body = Body::MeterMod(MeterMod {
            command: MeterModCommand::Add,
            flags: crate::flags::MeterFlag::KBPS,
            meter_id: crate::types::MeterId(1),
            bands: vec![],
        });
        // MeterMod does not exist in 1.0
        let err = Message::seal(ProtocolVersion::V10, body).unwrap_err();
        assert!(err.is_version_error());
    }

    #[test]
    fn drafts_are_the_only_way_back() {
        let msg = Message::seal(ProtocolVersion::V13, Body::BarrierRequest).unwrap();
        let exact = msg.to_exact_draft().seal().unwrap();
        assert_eq!(exact.xid(), msg.xid());
        let fresh = msg.to_draft().seal().unwrap();
        assert_ne!(fresh.xid(), msg.xid());
    }
}
