//! Code-valued (non-bitmap) enums used by message bodies.
//!
//! These decode through per-version lookups with the same version-mismatch
//! discipline as the bitmap tables: a code that is syntactically fine but
//! undefined for the revision is a version-mismatch error, distinct from a
//! malformed-input error.

use crate::{
    errors::{ProtocolError, Result},
    version::ProtocolVersion,
};

fn unknown_code(version: ProtocolVersion, what: &str, code: u32) -> ProtocolError {
    ProtocolError::VersionMismatch { version, item: format!("{what} code {code}") }
}

/// High-level error categories carried in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ErrorType {
    HelloFailed,
    BadRequest,
    BadAction,
    BadInstruction,
    BadMatch,
    FlowModFailed,
    GroupModFailed,
    PortModFailed,
    TableModFailed,
    QueueOpFailed,
    SwitchConfigFailed,
    RoleRequestFailed,
    MeterModFailed,
    TableFeaturesFailed,
    Experimenter,
}

impl ErrorType {
    /// The wire code in `pv`.
    ///
    /// # Errors
    ///
    /// Version mismatch for types the revision does not define.
    pub fn wire_code(self, pv: ProtocolVersion) -> Result<u16> {
        use ErrorType::*;
        let v10 = pv == ProtocolVersion::V10;
        Ok(match self {
            HelloFailed => 0,
            BadRequest => 1,
            BadAction => 2,
            FlowModFailed if v10 => 3,
            PortModFailed if v10 => 4,
            QueueOpFailed if v10 => 5,
            other if v10 => {
                return Err(ProtocolError::VersionMismatch {
                    version: pv,
                    item: format!("error type {other:?}"),
                })
            }
            BadInstruction => 3,
            BadMatch => 4,
            FlowModFailed => 5,
            GroupModFailed => 6,
            PortModFailed => 7,
            TableModFailed => 8,
            QueueOpFailed => 9,
            SwitchConfigFailed => 10,
            RoleRequestFailed if pv >= ProtocolVersion::V12 => 11,
            MeterModFailed if pv >= ProtocolVersion::V13 => 12,
            TableFeaturesFailed if pv >= ProtocolVersion::V13 => 13,
            Experimenter if pv >= ProtocolVersion::V12 => 0xffff,
            other => {
                return Err(ProtocolError::VersionMismatch {
                    version: pv,
                    item: format!("error type {other:?}"),
                })
            }
        })
    }

    /// Decode a wire code for `pv`.
    ///
    /// # Errors
    ///
    /// Version mismatch for undefined codes.
    pub fn decode(code: u16, pv: ProtocolVersion) -> Result<Self> {
        use ErrorType::*;
        let t = if pv == ProtocolVersion::V10 {
            match code {
                0 => HelloFailed,
                1 => BadRequest,
                2 => BadAction,
                3 => FlowModFailed,
                4 => PortModFailed,
                5 => QueueOpFailed,
                _ => return Err(unknown_code(pv, "error type", code.into())),
            }
        } else {
            match code {
                0 => HelloFailed,
                1 => BadRequest,
                2 => BadAction,
                3 => BadInstruction,
                4 => BadMatch,
                5 => FlowModFailed,
                6 => GroupModFailed,
                7 => PortModFailed,
                8 => TableModFailed,
                9 => QueueOpFailed,
                10 => SwitchConfigFailed,
                11 if pv >= ProtocolVersion::V12 => RoleRequestFailed,
                12 if pv >= ProtocolVersion::V13 => MeterModFailed,
                13 if pv >= ProtocolVersion::V13 => TableFeaturesFailed,
                0xffff if pv >= ProtocolVersion::V12 => Experimenter,
                _ => return Err(unknown_code(pv, "error type", code.into())),
            }
        };
        Ok(t)
    }
}

macro_rules! simple_code_enum {
    (
        $(#[$meta:meta])*
        $name:ident : $wire:ty, $what:literal {
            $($variant:ident = $code:expr $(, min $min:ident)? ;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            /// The wire code in `pv`.
            ///
            /// # Errors
            ///
            /// Version mismatch for variants the revision does not define.
            pub fn wire_code(self, pv: ProtocolVersion) -> Result<$wire> {
                match self {
                    $(Self::$variant => {
                        $(if pv < ProtocolVersion::$min {
                            return Err(ProtocolError::VersionMismatch {
                                version: pv,
                                item: format!(concat!($what, " {:?}"), self),
                            });
                        })?
                        Ok($code)
                    })+
                }
            }

            /// Decode a wire code for `pv`.
            ///
            /// # Errors
            ///
            /// Version mismatch for undefined codes.
            pub fn decode(code: $wire, pv: ProtocolVersion) -> Result<Self> {
                $(
                    if code == $code {
                        $(if pv < ProtocolVersion::$min {
                            return Err(unknown_code(pv, $what, code.into()));
                        })?
                        return Ok(Self::$variant);
                    }
                )+
                Err(unknown_code(pv, $what, code.into()))
            }
        }
    };
}

simple_code_enum! {
    /// Flow-mod commands. (u16 on the 1.0 wire, u8 thereafter; width is
    /// handled by the body codec.)
    FlowModCommand : u16, "flow-mod command" {
        Add = 0;
        Modify = 1;
        ModifyStrict = 2;
        Delete = 3;
        DeleteStrict = 4;
    }
}

simple_code_enum! {
    /// Group-mod commands (1.1+).
    GroupModCommand : u16, "group-mod command" {
        Add = 0, min V11;
        Modify = 1, min V11;
        Delete = 2, min V11;
    }
}

simple_code_enum! {
    /// Group types (1.1+).
    GroupType : u16, "group type" {
        All = 0, min V11;
        Select = 1, min V11;
        Indirect = 2, min V11;
        FastFailover = 3, min V11;
    }
}

simple_code_enum! {
    /// Meter-mod commands (1.3).
    MeterModCommand : u16, "meter-mod command" {
        Add = 0, min V13;
        Modify = 1, min V13;
        Delete = 2, min V13;
    }
}

simple_code_enum! {
    /// Why a packet was sent to the controller.
    PacketInReason : u16, "packet-in reason" {
        NoMatch = 0;
        Action = 1;
        InvalidTtl = 2, min V12;
    }
}

simple_code_enum! {
    /// Why a flow was removed.
    FlowRemovedReason : u16, "flow-removed reason" {
        IdleTimeout = 0;
        HardTimeout = 1;
        Delete = 2;
        GroupDelete = 3, min V11;
    }
}

simple_code_enum! {
    /// What changed about a port.
    PortReason : u16, "port-status reason" {
        Add = 0;
        Delete = 1;
        Modify = 2;
    }
}

simple_code_enum! {
    /// Controller roles (1.2+).
    ControllerRole : u32, "controller role" {
        NoChange = 0, min V12;
        Equal = 1, min V12;
        Master = 2, min V12;
        Slave = 3, min V12;
    }
}

simple_code_enum! {
    /// Multipart (stats) body types.
    MultipartType : u16, "multipart type" {
        Desc = 0;
        Flow = 1;
        Aggregate = 2;
        Table = 3;
        PortStats = 4;
        Queue = 5;
        Group = 6, min V11;
        GroupDesc = 7, min V11;
        GroupFeatures = 8, min V12;
        Meter = 9, min V13;
        MeterConfig = 10, min V13;
        MeterFeatures = 11, min V13;
        TableFeatures = 12, min V13;
        PortDesc = 13, min V13;
        Experimenter = 0xffff;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_type_codes_shift_between_versions() {
        assert_eq!(ErrorType::FlowModFailed.wire_code(ProtocolVersion::V10).unwrap(), 3);
        assert_eq!(ErrorType::FlowModFailed.wire_code(ProtocolVersion::V13).unwrap(), 5);
        assert_eq!(ErrorType::decode(3, ProtocolVersion::V10).unwrap(), ErrorType::FlowModFailed);
        assert_eq!(ErrorType::decode(3, ProtocolVersion::V13).unwrap(), ErrorType::BadInstruction);
        assert!(ErrorType::MeterModFailed.wire_code(ProtocolVersion::V12).is_err());
    }

    #[test]
    fn version_gates_apply() {
        assert!(PacketInReason::decode(2, ProtocolVersion::V10).is_err());
        assert!(PacketInReason::decode(2, ProtocolVersion::V13).is_ok());
        assert!(MultipartType::decode(12, ProtocolVersion::V12).is_err());
        assert!(ControllerRole::decode(2, ProtocolVersion::V11).is_err());
    }

    #[test]
    fn codes_round_trip() {
        for pv in crate::version::ALL_VERSIONS {
            for cmd in [
                FlowModCommand::Add,
                FlowModCommand::Modify,
                FlowModCommand::ModifyStrict,
                FlowModCommand::Delete,
                FlowModCommand::DeleteStrict,
            ] {
                let code = cmd.wire_code(pv).unwrap();
                assert_eq!(FlowModCommand::decode(code, pv).unwrap(), cmd);
            }
        }
    }
}
