//! Protocol revisions and the process-wide parsing policy.
//!
//! Most field-presence decisions in this codec are gated on "at least
//! version X" comparisons, so [`ProtocolVersion`] is totally ordered.
//!
//! Two pieces of deployment policy live here as process-wide defaults with
//! per-call overrides (see [`CodecConfig`]):
//!
//! - the **supported-version set**: frames in a recognized-but-unsupported
//!   revision fail with a distinct signal so the upper layer can choose
//!   between log-and-drop and fail-connection;
//! - the **strict/lenient switch**: whether bitmap bits that the revision
//!   does not define are fatal or silently ignored.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::errors::{ProtocolError, Result};

/// An OpenFlow protocol revision.
///
/// Ordered by revision, so `pv >= ProtocolVersion::V12` reads as
/// "at least 1.2".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtocolVersion {
    /// OpenFlow 1.0 (wire byte 0x01)
    V10,
    /// OpenFlow 1.1 (wire byte 0x02)
    V11,
    /// OpenFlow 1.2 (wire byte 0x03)
    V12,
    /// OpenFlow 1.3 (wire byte 0x04)
    V13,
}

/// All revisions this codec has layouts for, in order.
pub const ALL_VERSIONS: [ProtocolVersion; 4] =
    [ProtocolVersion::V10, ProtocolVersion::V11, ProtocolVersion::V12, ProtocolVersion::V13];

impl ProtocolVersion {
    /// The fixed wire byte for this revision.
    #[must_use]
    pub const fn wire_byte(self) -> u8 {
        match self {
            Self::V10 => 0x01,
            Self::V11 => 0x02,
            Self::V12 => 0x03,
            Self::V13 => 0x04,
        }
    }

    /// Zero-based ordinal (1.0 is 0). Used to index per-version tables and
    /// as the bit position in hello version bitmaps.
    #[must_use]
    pub const fn ordinal(self) -> usize {
        match self {
            Self::V10 => 0,
            Self::V11 => 1,
            Self::V12 => 2,
            Self::V13 => 3,
        }
    }

    /// Decode a wire version byte.
    ///
    /// # Errors
    ///
    /// Any byte outside the defined constants is a hard decode failure;
    /// `offset` is carried for diagnostics.
    pub fn from_wire(byte: u8, offset: usize) -> Result<Self> {
        match byte {
            0x01 => Ok(Self::V10),
            0x02 => Ok(Self::V11),
            0x03 => Ok(Self::V12),
            0x04 => Ok(Self::V13),
            _ => Err(ProtocolError::UnknownVersion { byte, offset }),
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::V10 => "1.0",
            Self::V11 => "1.1",
            Self::V12 => "1.2",
            Self::V13 => "1.3",
        };
        f.write_str(s)
    }
}

/// A small set of protocol revisions, stored as a bitmask over ordinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionSet(u8);

impl VersionSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Build a set from a slice of versions.
    #[must_use]
    pub fn of(versions: &[ProtocolVersion]) -> Self {
        let mut mask = 0u8;
        for v in versions {
            mask |= 1 << v.ordinal();
        }
        Self(mask)
    }

    /// Membership test.
    #[must_use]
    pub fn contains(self, v: ProtocolVersion) -> bool {
        self.0 & (1 << v.ordinal()) != 0
    }

    /// Add a version to the set.
    pub fn insert(&mut self, v: ProtocolVersion) {
        self.0 |= 1 << v.ordinal();
    }

    /// Iterate members in revision order.
    pub fn iter(self) -> impl Iterator<Item = ProtocolVersion> {
        ALL_VERSIONS.into_iter().filter(move |v| self.contains(*v))
    }

    /// The highest member, if the set is non-empty.
    #[must_use]
    pub fn highest(self) -> Option<ProtocolVersion> {
        ALL_VERSIONS.into_iter().rev().find(|v| self.contains(*v))
    }

    const fn to_bits(self) -> u8 {
        self.0
    }

    const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0f)
    }
}

impl fmt::Display for VersionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        write!(f, "{{")?;
        for v in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
            first = false;
        }
        write!(f, "}}")
    }
}

// Process-wide policy defaults. Readers snapshot these at parse entry; the
// switches are not meant to be flipped while parses are in flight.
static STRICT_PARSING: AtomicBool = AtomicBool::new(false);
static SUPPORTED_VERSIONS: AtomicU8 = AtomicU8::new(
    1 << ProtocolVersion::V10.ordinal() | 1 << ProtocolVersion::V13.ordinal(),
);

/// Set message parsing to strict or lenient, process-wide.
///
/// In strict mode bitmap bits and reserved fields that the revision does not
/// define cause a version-mismatch error; in lenient mode they are ignored.
pub fn set_strict_parsing(strict: bool) {
    STRICT_PARSING.store(strict, Ordering::Relaxed);
    tracing::info!(strict, "strict message parsing {}", if strict { "ON" } else { "OFF" });
}

/// Current state of the strict/lenient switch.
#[must_use]
pub fn is_strict_parsing() -> bool {
    STRICT_PARSING.load(Ordering::Relaxed)
}

/// Replace the process-wide supported-version set.
pub fn set_supported_versions(set: VersionSet) {
    SUPPORTED_VERSIONS.store(set.to_bits(), Ordering::Relaxed);
    tracing::info!(%set, "supported protocol versions changed");
}

/// The process-wide supported-version set (defaults to {1.0, 1.3}).
#[must_use]
pub fn supported_versions() -> VersionSet {
    VersionSet::from_bits(SUPPORTED_VERSIONS.load(Ordering::Relaxed))
}

/// Returns an error unless `v` is in the process-wide supported set.
///
/// # Errors
///
/// [`ProtocolError::VersionNotSupported`] when the deployment does not
/// speak `v`.
pub fn check_version_supported(v: ProtocolVersion) -> Result<()> {
    if supported_versions().contains(v) {
        Ok(())
    } else {
        Err(ProtocolError::VersionNotSupported(v))
    }
}

/// Snapshot of the parsing policy, threadable through parse entry points.
///
/// `CodecConfig::default()` captures the process-wide switches at call time,
/// preserving the global-default-with-override semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Fail on bitmap bits the revision does not define.
    pub strict: bool,
    /// Versions this deployment speaks.
    pub supported: VersionSet,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self { strict: is_strict_parsing(), supported: supported_versions() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_revisions() {
        assert!(ProtocolVersion::V10 < ProtocolVersion::V11);
        assert!(ProtocolVersion::V13 >= ProtocolVersion::V12);
    }

    #[test]
    fn wire_round_trip() {
        for v in ALL_VERSIONS {
            assert_eq!(ProtocolVersion::from_wire(v.wire_byte(), 0).unwrap(), v);
        }
    }

    #[test]
    fn unknown_wire_byte_rejected() {
        let err = ProtocolVersion::from_wire(0x05, 3).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownVersion { byte: 0x05, offset: 3 });
    }

    #[test]
    fn version_set_membership() {
        let set = VersionSet::of(&[ProtocolVersion::V10, ProtocolVersion::V12]);
        assert!(set.contains(ProtocolVersion::V10));
        assert!(!set.contains(ProtocolVersion::V11));
        assert_eq!(set.highest(), Some(ProtocolVersion::V12));
        assert_eq!(set.to_string(), "{1.0, 1.2}");
    }

    #[test]
    fn default_supported_set() {
        let set = supported_versions();
        assert!(set.contains(ProtocolVersion::V10));
        assert!(!set.contains(ProtocolVersion::V11));
        assert!(!set.contains(ProtocolVersion::V12));
        assert!(set.contains(ProtocolVersion::V13));
    }
}
