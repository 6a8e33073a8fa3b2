//! Error types for the oflow codec.
//!
//! The taxonomy distinguishes failure classes that upstream policy treats
//! differently:
//!
//! - buffer underflow and malformed input are *decode* errors: the peer sent
//!   bytes we cannot interpret, and the stream has already been resynchronized
//!   to the next frame boundary by the time the error surfaces;
//! - a version mismatch means a syntactically valid value is not defined for
//!   the message's protocol version (a per-field protocol violation);
//! - version-not-supported is a negotiation-time concern: the deployment does
//!   not speak the peer's (otherwise recognized) protocol revision at all.
//!
//! Note that "not enough bytes buffered yet" is *not* an error anywhere in
//! this crate: the stream entry point reports it as `Ok(None)`.

use thiserror::Error;

use crate::{msg::Header, version::ProtocolVersion};

/// Protocol-level errors raised while decoding, sealing or encoding messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A bounded read ran past the reader's limit.
    #[error("buffer underflow at offset {offset}: needed {needed} bytes, {available} available")]
    BufferUnderflow {
        /// Absolute offset of the failed read
        offset: usize,
        /// Bytes the read required
        needed: usize,
        /// Bytes remaining before the limit
        available: usize,
    },

    /// The version byte is not one of the defined protocol constants.
    #[error("unrecognized protocol version byte {byte:#04x} at offset {offset}")]
    UnknownVersion {
        /// The offending wire byte
        byte: u8,
        /// Absolute offset of the version byte
        offset: usize,
    },

    /// A recognized protocol version that this deployment does not speak.
    #[error("protocol version {0} is not in the supported-version set")]
    VersionNotSupported(ProtocolVersion),

    /// The header type code is not defined for the message's version.
    #[error("unknown message type code {code} for version {version}")]
    UnknownType {
        /// Protocol version from the frame header
        version: ProtocolVersion,
        /// The offending type code
        code: u8,
    },

    /// A structure field or length could not be interpreted.
    #[error("malformed {context} at offset {offset}: {detail}")]
    Malformed {
        /// Which structure was being decoded
        context: &'static str,
        /// Absolute offset where decoding gave up
        offset: usize,
        /// What was wrong
        detail: String,
    },

    /// A syntactically valid value that the message's version does not define.
    #[error("{item} is not valid for version {version}")]
    VersionMismatch {
        /// The message's protocol version
        version: ProtocolVersion,
        /// Description of the offending value (flag, bitmap, field, type code)
        item: String,
    },

    /// Body decoding failed; the cursor has been advanced to the frame
    /// boundary so the caller may continue with the next message.
    #[error("message parse failed at offset {offset} (frame starts at {start}): {source}")]
    ParseFailed {
        /// Offset where the frame began
        start: usize,
        /// Offset at which the failure was detected
        offset: usize,
        /// The frame header, if it was decoded before the failure
        header: Option<Header>,
        /// Underlying failure
        source: Box<ProtocolError>,
    },

    /// Sealing or encoding was attempted on an insufficiently populated body.
    #[error("incomplete message: {0}")]
    Incomplete(&'static str),

    /// An in-place patch on a sealed message was rejected.
    #[error("patch rejected: {0}")]
    InvalidPatch(&'static str),

    /// An operation was applied to a message kind that does not support it
    /// (e.g. multipart accumulation on a non-array body).
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// A correlation identifier violated its invariants (e.g. the reserved
    /// zero xid, or a reply whose xid does not match the request).
    #[error("transaction id error: {0}")]
    BadXid(String),
}

impl ProtocolError {
    /// True for errors in the *decode* class: the peer's bytes were
    /// malformed, as opposed to valid-but-inappropriate for the version.
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        match self {
            Self::BufferUnderflow { .. }
            | Self::UnknownVersion { .. }
            | Self::UnknownType { .. }
            | Self::Malformed { .. } => true,
            Self::ParseFailed { source, .. } => source.is_decode_error(),
            _ => false,
        }
    }

    /// True if the error concerns protocol-version applicability rather
    /// than byte-level syntax.
    #[must_use]
    pub fn is_version_error(&self) -> bool {
        match self {
            Self::VersionNotSupported(_) | Self::VersionMismatch { .. } => true,
            Self::ParseFailed { source, .. } => source.is_version_error(),
            _ => false,
        }
    }
}

/// Convenient Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
