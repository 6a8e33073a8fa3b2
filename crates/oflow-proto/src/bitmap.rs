//! Generic engine for per-version flag/bitmap translation.
//!
//! Wire bitmaps assign different bits to the same logical flag across
//! protocol revisions, and revisions omit or add flags. Each flag type in
//! [`crate::flags`] carries a table of rows mapping its logical flag to the
//! wire bit (if any) in each revision; this module implements the two
//! directions over such tables.
//!
//! Encoding a flag with no wire bit in the target revision is always a
//! version-mismatch error. Decoding honors the strict/lenient policy: under
//! strict parsing, set bits that map to no flag fail (naming the offending
//! bitmap); under lenient parsing they are dropped.

use bitflags::Flags;

use crate::{
    errors::{ProtocolError, Result},
    version::{CodecConfig, ProtocolVersion},
};

/// One logical flag and its wire bit per revision, indexed by
/// [`ProtocolVersion::ordinal`]. `None` means the revision omits the flag.
pub(crate) struct BitRow<F> {
    pub flag: F,
    pub bits: [Option<u32>; 4],
}

/// Shorthand for table literals.
pub(crate) const fn row<F>(flag: F, bits: [Option<u32>; 4]) -> BitRow<F> {
    BitRow { flag, bits }
}

/// Translate a flag set into the revision's wire bitmap.
pub(crate) fn encode_bitmap<F>(
    table: &[BitRow<F>],
    flags: F,
    pv: ProtocolVersion,
    what: &'static str,
) -> Result<u32>
where
    F: Flags + Copy + std::fmt::Debug,
{
    let mut out = 0u32;
    for r in table {
        if !flags.contains(r.flag) {
            continue;
        }
        match r.bits[pv.ordinal()] {
            Some(bit) => out |= bit,
            None => {
                return Err(ProtocolError::VersionMismatch {
                    version: pv,
                    item: format!("{what} flag {:?}", r.flag),
                })
            }
        }
    }
    Ok(out)
}

/// Translate a wire bitmap into the logical flag set for the revision.
pub(crate) fn decode_bitmap<F>(
    table: &[BitRow<F>],
    bits: u32,
    pv: ProtocolVersion,
    cfg: CodecConfig,
    what: &'static str,
) -> Result<F>
where
    F: Flags + Copy,
{
    let mut flags = F::empty();
    let mut known = 0u32;
    for r in table {
        if let Some(bit) = r.bits[pv.ordinal()] {
            known |= bit;
            if bits & bit != 0 {
                flags.insert(r.flag);
            }
        }
    }
    let unknown = bits & !known;
    if unknown != 0 && cfg.strict {
        return Err(ProtocolError::VersionMismatch {
            version: pv,
            item: format!("{what} bitmap {bits:#010x} (unmapped bits {unknown:#010x})"),
        });
    }
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionSet;

    bitflags::bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        struct Demo: u32 {
            const A = 1 << 0;
            const B = 1 << 1;
        }
    }

    // A present everywhere at bit 0; B only in 1.3, at bit 4.
    const TABLE: &[BitRow<Demo>] = &[
        row(Demo::A, [Some(1 << 0), Some(1 << 0), Some(1 << 0), Some(1 << 0)]),
        row(Demo::B, [None, None, None, Some(1 << 4)]),
    ];

    fn lenient() -> CodecConfig {
        CodecConfig { strict: false, supported: VersionSet::of(&crate::version::ALL_VERSIONS) }
    }

    fn strict() -> CodecConfig {
        CodecConfig { strict: true, ..lenient() }
    }

    #[test]
    fn encode_respects_version_table() {
        let bits =
            encode_bitmap(TABLE, Demo::A | Demo::B, ProtocolVersion::V13, "demo").unwrap();
        assert_eq!(bits, 0b1_0001);

        let err = encode_bitmap(TABLE, Demo::B, ProtocolVersion::V10, "demo").unwrap_err();
        assert!(matches!(err, ProtocolError::VersionMismatch { version: ProtocolVersion::V10, .. }));
    }

    #[test]
    fn decode_round_trips() {
        for pv in [ProtocolVersion::V10, ProtocolVersion::V13] {
            let flags = Demo::A;
            let bits = encode_bitmap(TABLE, flags, pv, "demo").unwrap();
            assert_eq!(decode_bitmap(TABLE, bits, pv, lenient(), "demo").unwrap(), flags);
        }
    }

    #[test]
    fn strict_rejects_unmapped_bits() {
        // bit 4 is B's position in 1.3 but means nothing in 1.0
        let bits = 0b1_0001;
        let err = decode_bitmap(TABLE, bits, ProtocolVersion::V10, strict(), "demo").unwrap_err();
        match err {
            ProtocolError::VersionMismatch { item, .. } => {
                assert!(item.contains("0x00000011"), "item was: {item}");
                assert!(item.contains("0x00000010"), "item was: {item}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn lenient_drops_unmapped_bits() {
        let flags = decode_bitmap(TABLE, 0b1_0001, ProtocolVersion::V10, lenient(), "demo").unwrap();
        assert_eq!(flags, Demo::A);
    }
}
