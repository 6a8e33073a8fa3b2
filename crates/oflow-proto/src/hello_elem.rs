//! Hello elements.
//!
//! A hello message may carry a list of elements, each padded to 8 bytes.
//! Only VERSIONBITMAP (type 1) is defined by the protocol; anything else
//! decodes opaquely. The bitmap assigns one bit per protocol revision,
//! indexed by the revision's ordinal (1.0 is bit 0), so a sender
//! advertising {1.0, 1.2} sets bits 0 and 2 of the first 32-bit word.

use crate::{
    buffer::{Reader, Writer},
    errors::{ProtocolError, Result},
    tlv,
    version::{ProtocolVersion, VersionSet, ALL_VERSIONS},
};

const ELEM_HEADER_LEN: usize = 4;
const HET_VERSION_BITMAP: u16 = 1;

/// One hello element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelloElement {
    /// The sender's supported-version bitmap.
    VersionBitmap(VersionSet),
    /// An element this codec does not model, kept byte-for-byte.
    Unknown {
        /// Wire element type
        elem_type: u16,
        /// Raw payload
        payload: Vec<u8>,
    },
}

impl HelloElement {
    /// Unpadded encoded length, header included.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            // one 32-bit word covers every revision this codec speaks
            Self::VersionBitmap(_) => ELEM_HEADER_LEN + 4,
            Self::Unknown { payload, .. } => ELEM_HEADER_LEN + payload.len(),
        }
    }
}

/// Parse hello elements until the reader reaches `target` (the end of the
/// hello frame). Elements were introduced in 1.3, but a hello's version
/// byte advertises the sender's *highest* version, so the element list is
/// parsed for any version rather than gated.
///
/// # Errors
///
/// Decode errors on malformed element lengths.
pub fn parse_element_list(target: usize, r: &mut Reader<'_>) -> Result<Vec<HelloElement>> {
    let mut elements = Vec::new();
    while r.position() < target {
        elements.push(parse_element(r)?);
    }
    Ok(elements)
}

fn parse_element(r: &mut Reader<'_>) -> Result<HelloElement> {
    let start = r.position();
    let elem_type = r.read_u16()?;
    let declared = usize::from(r.read_u16()?);
    let body = tlv::payload_len(r, "hello element", declared, ELEM_HEADER_LEN)?;

    let elem = if elem_type == HET_VERSION_BITMAP {
        if body % 4 != 0 {
            return Err(ProtocolError::Malformed {
                context: "hello element",
                offset: start,
                detail: format!("version bitmap payload {body} is not word-aligned"),
            });
        }
        let mut set = VersionSet::EMPTY;
        for word in 0..body / 4 {
            let bits = r.read_u32()?;
            if word > 0 {
                continue; // bits beyond the revisions we model
            }
            for v in ALL_VERSIONS {
                if bits & (1 << v.ordinal()) != 0 {
                    set.insert(v);
                }
            }
        }
        HelloElement::VersionBitmap(set)
    } else {
        HelloElement::Unknown { elem_type, payload: r.read_bytes(body)?.to_vec() }
    };
    tlv::finish_padded(r, start, declared)?;
    Ok(elem)
}

/// Encode a list of hello elements, padding each to 8 bytes.
pub fn encode_element_list(w: &mut Writer, elements: &[HelloElement]) {
    for e in elements {
        let unpadded = e.encoded_len();
        match e {
            HelloElement::VersionBitmap(set) => {
                w.put_u16(HET_VERSION_BITMAP);
                w.put_u16(unpadded as u16);
                let mut bits = 0u32;
                for v in set.iter() {
                    bits |= 1 << v.ordinal();
                }
                w.put_u32(bits);
            }
            HelloElement::Unknown { elem_type, payload } => {
                w.put_u16(*elem_type);
                w.put_u16(unpadded as u16);
                w.put_slice(payload);
            }
        }
        tlv::write_pad8(w, unpadded);
    }
}

/// The version set advertised by an element list, if a bitmap is present.
#[must_use]
pub fn advertised_versions(elements: &[HelloElement]) -> Option<VersionSet> {
    elements.iter().find_map(|e| match e {
        HelloElement::VersionBitmap(set) => Some(*set),
        HelloElement::Unknown { .. } => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_bitmap_uses_ordinal_bits() {
        let set = VersionSet::of(&[ProtocolVersion::V10, ProtocolVersion::V12]);
        let mut w = Writer::new();
        encode_element_list(&mut w, &[HelloElement::VersionBitmap(set)]);
        let bytes = w.into_vec();
        // type=1, length=8, bitmap with bits 0 and 2
        assert_eq!(bytes, vec![0x00, 0x01, 0x00, 0x08, 0x00, 0x00, 0x00, 0b0000_0101]);
    }

    #[test]
    fn element_list_round_trips() {
        let elements = vec![
            HelloElement::VersionBitmap(VersionSet::of(&[ProtocolVersion::V13])),
            HelloElement::Unknown { elem_type: 0x7f, payload: vec![1, 2, 3] },
        ];
        let mut w = Writer::new();
        encode_element_list(&mut w, &elements);
        let bytes = w.into_vec();
        assert_eq!(bytes.len() % 8, 0);
        let mut r = Reader::new(&bytes);
        assert_eq!(parse_element_list(bytes.len(), &mut r).unwrap(), elements);
    }

    #[test]
    fn advertised_versions_found() {
        let set = VersionSet::of(&[ProtocolVersion::V10, ProtocolVersion::V13]);
        let elements = vec![HelloElement::VersionBitmap(set)];
        assert_eq!(advertised_versions(&elements), Some(set));
        assert_eq!(advertised_versions(&[]), None);
    }
}
