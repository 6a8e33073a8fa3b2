//! Shared helpers for length-delimited, 8-byte-padded TLV structures.
//!
//! Several structure families (table-feature properties, queue properties,
//! match-field entries, hello elements) share the same framing discipline:
//! a small type/length header, a payload of exactly `length - header` bytes,
//! and zero padding up to the next 8-byte boundary. The declared length
//! always *excludes* the padding.
//!
//! Decoders are handed their exact payload span; afterwards the caller
//! re-seeks to the padded boundary regardless of how many bytes the decoder
//! actually consumed, so one property that under- or over-reads cannot skew
//! the framing of its siblings.

use crate::{
    buffer::{Reader, Writer},
    errors::{ProtocolError, Result},
};

/// Number of zero bytes needed after `len` payload bytes to land on an
/// 8-byte boundary.
#[must_use]
pub const fn pad8(len: usize) -> usize {
    (8 - len % 8) % 8
}

/// `len` rounded up to the next 8-byte boundary.
#[must_use]
pub const fn padded_len(len: usize) -> usize {
    len + pad8(len)
}

/// Re-seek `r` to the 8-aligned end of a structure that started at
/// `start` with declared (unpadded) length `len`, consuming the padding
/// and anything a misbehaving sub-decoder left unread.
///
/// # Errors
///
/// Underflow if the buffer ends before the padded boundary.
pub fn finish_padded(r: &mut Reader<'_>, start: usize, len: usize) -> Result<()> {
    let end = start + padded_len(len);
    if end > r.limit() {
        return Err(ProtocolError::BufferUnderflow {
            offset: r.position(),
            needed: end - r.position(),
            available: r.remaining(),
        });
    }
    r.seek(end);
    Ok(())
}

/// Write the zero padding that follows a structure of unpadded length `len`.
pub fn write_pad8(w: &mut Writer, len: usize) {
    w.put_zeros(pad8(len));
}

/// Validate a TLV's declared length against its header size and the
/// remaining buffer, returning the payload length.
///
/// # Errors
///
/// Malformed if `declared < header_len`; underflow if the payload runs past
/// the reader's limit.
pub fn payload_len(
    r: &Reader<'_>,
    context: &'static str,
    declared: usize,
    header_len: usize,
) -> Result<usize> {
    if declared < header_len {
        return Err(ProtocolError::Malformed {
            context,
            offset: r.position(),
            detail: format!("declared length {declared} below header size {header_len}"),
        });
    }
    let body = declared - header_len;
    if body > r.remaining() {
        return Err(ProtocolError::BufferUnderflow {
            offset: r.position(),
            needed: body,
            available: r.remaining(),
        });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_amounts() {
        assert_eq!(pad8(0), 0);
        assert_eq!(pad8(4), 4);
        assert_eq!(pad8(8), 0);
        assert_eq!(pad8(9), 7);
        assert_eq!(padded_len(12), 16);
    }

    #[test]
    fn finish_padded_reseeks_past_sloppy_decoder() {
        let buf = [0u8; 24];
        let mut r = Reader::new(&buf);
        // property starts at 0 with declared length 10; a decoder consumed
        // only 6 bytes of it
        r.seek(6);
        finish_padded(&mut r, 0, 10).unwrap();
        assert_eq!(r.position(), 16);
    }

    #[test]
    fn finish_padded_checks_limit() {
        let buf = [0u8; 10];
        let mut r = Reader::new(&buf);
        assert!(finish_padded(&mut r, 0, 10).is_err());
    }

    #[test]
    fn declared_length_validated() {
        let buf = [0u8; 4];
        let r = Reader::new(&buf);
        assert!(payload_len(&r, "prop", 2, 4).is_err());
        assert!(payload_len(&r, "prop", 16, 4).is_err());
        assert_eq!(payload_len(&r, "prop", 8, 4).unwrap(), 4);
    }
}
